//! Errors surfaced to the host.
//!
//! Per-identifier [`AssetLoadFailure`]s are recorded and never escalate on
//! their own; everything folded into [`SceneError`] aborts the mount.

use thiserror::Error;

use crate::surface::SurfaceState;

/// Surface initialization failed. Fatal to the mount; never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("no container to mount the scene into")]
    MissingContainer,

    #[error("renderer could not be created: {0}")]
    Renderer(String),

    #[error("surface cannot be initialized from state {0:?}")]
    InvalidState(SurfaceState),

    #[error("surface was destroyed while initializing")]
    Cancelled,
}

/// Why a single identifier did not resolve to a drawable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetLoadFailure {
    #[error("asset resolved to an empty image")]
    Empty,

    #[error("unsupported asset: {0}")]
    Unsupported(String),

    #[error("asset load failed: {0}")]
    Failed(String),
}

/// Fewer usable assets resolved than the layout needs.
///
/// `got` counts resolved assets within the layout's slots, and is zero when
/// the background did not resolve.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("scene needs {required} resolved assets, got {got}")]
pub struct InsufficientAssetsError {
    pub required: usize,
    pub got: usize,
}

/// An operation on a [`SceneSurface`](crate::surface::SceneSurface) that the
/// current state does not allow, or that the renderer rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("surface is not ready (state {0:?})")]
    NotReady(SurfaceState),

    #[error("texture upload failed: {0}")]
    Upload(String),

    #[error("frame failed: {0}")]
    Render(String),
}

/// Everything that can abort [`LifecycleController::on_mount`].
///
/// [`LifecycleController::on_mount`]: crate::lifecycle::LifecycleController::on_mount
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    InsufficientAssets(#[from] InsufficientAssetsError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("mount cancelled by unmount")]
    Cancelled,

    #[error("scene is already mounted; unmount it first")]
    AlreadyMounted,
}

impl SceneError {
    /// `true` for the outcome of an unmount racing the mount, which hosts
    /// usually ignore.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SceneError::Cancelled | SceneError::Init(InitError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_assets_message_names_both_counts() {
        let err = InsufficientAssetsError { required: 5, got: 3 };
        assert_eq!(err.to_string(), "scene needs 5 resolved assets, got 3");
    }

    #[test]
    fn init_errors_convert_transparently() {
        let err: SceneError = InitError::MissingContainer.into();
        assert_eq!(err.to_string(), "no container to mount the scene into");
        assert!(!err.is_cancelled());
        assert!(SceneError::from(InitError::Cancelled).is_cancelled());
    }
}
