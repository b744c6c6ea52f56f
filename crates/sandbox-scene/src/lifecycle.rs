//! Host-facing mount/unmount contract.

use std::cell::RefCell;
use std::rc::Rc;

use sandbox_engine::device::{RendererFactory, SurfaceConfig};

use crate::assets::{AssetLoader, AssetSource, ResourceId};
use crate::builder::{ButtonSpec, SceneBuilder};
use crate::error::{AssetLoadFailure, InitError, SceneError};
use crate::host::Container;
use crate::surface::{SceneSurface, SurfaceState};

/// What to mount.
#[derive(Debug, Clone, Default)]
pub struct MountSpec {
    /// Background first, then one per sprite slot.
    pub identifiers: Vec<ResourceId>,
    pub surface: SurfaceConfig,
    pub builder: SceneBuilder,
}

impl MountSpec {
    pub fn with_buttons(mut self, buttons: impl IntoIterator<Item = ButtonSpec>) -> Self {
        self.builder = self.builder.with_buttons(buttons);
        self
    }
}

/// Outcome of a successful mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountReport {
    pub nodes: usize,
    /// Identifiers that failed without aborting the mount.
    pub failures: Vec<(ResourceId, AssetLoadFailure)>,
}

/// Drives one scene through the host's mount and unmount hooks.
///
/// `on_mount` runs surface init, view attach, the asset batch, the build
/// and the append, strictly in that order. `on_unmount` destroys the
/// surface whatever the mount's progress; a suspended mount observes it on
/// resumption and stops with [`SceneError::Cancelled`].
pub struct LifecycleController<F: RendererFactory, S> {
    factory: F,
    loader: AssetLoader<S>,
    spec: MountSpec,
    current: RefCell<Option<SceneSurface<F::Renderer>>>,
}

impl<F, S> LifecycleController<F, S>
where
    F: RendererFactory,
    F::Renderer: 'static,
    S: AssetSource,
{
    pub fn new(factory: F, source: S, spec: MountSpec) -> Self {
        Self {
            factory,
            loader: AssetLoader::new(source),
            spec,
            current: RefCell::new(None),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// The surface of the current (or last) mount.
    pub fn surface(&self) -> Option<SceneSurface<F::Renderer>> {
        self.current.borrow().clone()
    }

    /// `true` between the start of a mount and its unmount.
    pub fn is_mounted(&self) -> bool {
        self.current.borrow().as_ref().is_some_and(|s| s.state() != SurfaceState::Destroyed)
    }

    /// Mounts the scene into `container`.
    ///
    /// Fails with [`SceneError::AlreadyMounted`] if the previous mount was
    /// not unmounted. Any failing step aborts the rest; the surface stays
    /// destroyable and no partial scene is attached.
    pub async fn on_mount(&self, container: Option<Rc<dyn Container>>) -> Result<MountReport, SceneError> {
        let surface = {
            let mut current = self.current.borrow_mut();
            if current.as_ref().is_some_and(|s| s.state() != SurfaceState::Destroyed) {
                log::error!("on_mount called twice without on_unmount");
                return Err(SceneError::AlreadyMounted);
            }
            let surface = SceneSurface::new();
            *current = Some(surface.clone());
            surface
        };

        log::info!("mounting scene ({} assets)", self.spec.identifiers.len());
        match self.mount(&surface, container).await {
            Ok(report) => {
                log::info!(
                    "scene mounted: {} nodes, {} asset failures",
                    report.nodes,
                    report.failures.len()
                );
                Ok(report)
            }
            Err(err) if err.is_cancelled() => {
                log::debug!("mount abandoned: {err}");
                Err(SceneError::Cancelled)
            }
            Err(err) => {
                log::error!("mount failed: {err}");
                Err(err)
            }
        }
    }

    async fn mount(
        &self,
        surface: &SceneSurface<F::Renderer>,
        container: Option<Rc<dyn Container>>,
    ) -> Result<MountReport, SceneError> {
        surface
            .init(container, &self.factory, &self.spec.surface)
            .await
            .map_err(|e| match e {
                InitError::Cancelled => SceneError::Cancelled,
                other => SceneError::Init(other),
            })?;
        surface.attach()?;

        let assets = self.loader.load_all(&self.spec.identifiers).await;
        if !surface.is_ready() {
            return Err(SceneError::Cancelled);
        }

        let failures = assets.failures();
        let nodes = self.spec.builder.build(surface, assets)?;
        let nodes = surface.append(nodes)?;
        Ok(MountReport { nodes, failures })
    }

    /// Destroys the current surface. Safe at any time, any number of times.
    pub fn on_unmount(&self) {
        let surface = self.current.borrow().clone();
        match surface {
            Some(surface) => surface.destroy(),
            None => log::debug!("on_unmount before any mount"),
        }
    }
}
