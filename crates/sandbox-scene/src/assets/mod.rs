//! Asset acquisition: identifiers in, drawables (or failures) out.

mod file;
mod loader;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;

use sandbox_engine::device::ImageData;

use crate::error::AssetLoadFailure;

pub use file::{decode_image, FileAssetSource};
pub use loader::{AssetLoader, AssetOutcome, AssetResult};

/// A decoded, non-empty image shared between the asset result and the scene
/// graph.
pub type Drawable = Arc<ImageData>;

/// Identifier of one asset, e.g. a path relative to the asset root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where asset bytes come from.
///
/// `Ok(None)` means the source produced nothing usable (an empty result),
/// which the loader records as [`AssetLoadFailure::Empty`].
pub trait AssetSource {
    fn load(
        &self,
        id: &ResourceId,
    ) -> impl Future<Output = Result<Option<ImageData>, AssetLoadFailure>>;
}
