//! Slot sandbox scene layer: mounts a rendering surface into a host
//! container, loads the scene's assets, builds the scene graph and tears all
//! of it down again on unmount.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use sandbox_scene::prelude::*;
//!
//! let config = SceneConfig::horse_race();
//! let controller = LifecycleController::new(
//!     renderer_factory,
//!     FileAssetSource::new(&config.assets.base_dir),
//!     config.mount_spec(|label| log::info!("{label} clicked")),
//! );
//!
//! // Host mount hook (drive the future on a single-threaded executor):
//! let report = controller.on_mount(Some(container)).await?;
//!
//! // Host unmount hook, safe at any point of the mount above:
//! controller.on_unmount();
//! ```
//!
//! Flow: container → [`SceneSurface`](surface::SceneSurface) →
//! [`AssetLoader`](assets::AssetLoader) → [`SceneBuilder`](builder::SceneBuilder)
//! → scene graph → screen.

pub mod assets;
pub mod builder;
pub mod config;
pub mod error;
pub mod graph;
pub mod host;
pub mod lifecycle;
pub mod selection;
pub mod surface;
pub mod testing;

/// The types a host needs to mount a scene.
pub mod prelude {
    pub use crate::assets::{
        AssetLoader, AssetOutcome, AssetResult, AssetSource, Drawable, FileAssetSource, ResourceId,
    };
    pub use crate::builder::{ButtonSpec, LayoutSpec, SceneBuilder};
    pub use crate::config::SceneConfig;
    pub use crate::error::{
        AssetLoadFailure, InitError, InsufficientAssetsError, SceneError, SurfaceError,
    };
    pub use crate::graph::{ButtonStyle, Cursor, SceneNode};
    pub use crate::host::{Container, ResizeSubscription};
    pub use crate::lifecycle::{LifecycleController, MountReport, MountSpec};
    pub use crate::selection::{play_button, selection_buttons, Choice, Horse, Selection};
    pub use crate::surface::{SceneSurface, SurfaceState};

    pub use sandbox_engine::coords::{Rect, Size, Vec2};
    pub use sandbox_engine::device::{BackgroundMode, DrawItem, SurfaceConfig};
    pub use sandbox_engine::paint::Color;
}
