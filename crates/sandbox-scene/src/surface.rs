//! The rendering surface of one mount.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use sandbox_engine::coords::{Size, Vec2};
use sandbox_engine::device::{Renderer, RendererFactory, SurfaceConfig, TextureId, ViewId};

use crate::error::{InitError, SurfaceError};
use crate::graph::{Cursor, SceneGraph, SceneNode};
use crate::host::{Container, ResizeSubscription};

/// Lifecycle of a [`SceneSurface`]. `Destroyed` is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SurfaceState {
    Uninitialized,
    Initializing,
    Ready,
    Destroyed,
}

struct Inner<R> {
    state: SurfaceState,
    renderer: Option<R>,
    container: Option<Rc<dyn Container>>,
    attached: Option<ViewId>,
    subscription: Option<ResizeSubscription>,
    graph: SceneGraph,
    size: Size,
}

impl<R: Renderer> Inner<R> {
    fn require_ready(&self) -> Result<(), SurfaceError> {
        match self.state {
            SurfaceState::Ready => Ok(()),
            other => Err(SurfaceError::NotReady(other)),
        }
    }

    fn apply_resize(&mut self, size: Size) {
        if self.state != SurfaceState::Ready {
            return;
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(size);
            self.size = size;
            log::debug!("surface resized to {}x{}", size.width, size.height);
        }
    }
}

/// Owns the renderer, the scene graph and the container bindings of one
/// mount.
///
/// A cheap handle: clones share the same surface. Every resumption of
/// [`init`](Self::init) checks the state before any side effect, so
/// [`destroy`](Self::destroy) may be called at any point.
pub struct SceneSurface<R> {
    inner: Rc<RefCell<Inner<R>>>,
}

impl<R> Clone for SceneSurface<R> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<R: Renderer + 'static> Default for SceneSurface<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Renderer + 'static> SceneSurface<R> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: SurfaceState::Uninitialized,
                renderer: None,
                container: None,
                attached: None,
                subscription: None,
                graph: SceneGraph::default(),
                size: Size::default(),
            })),
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.inner.borrow().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SurfaceState::Ready
    }

    /// Logical size the renderer was last sized to.
    pub fn size(&self) -> Size {
        self.inner.borrow().size
    }

    /// The renderer's view, once ready.
    pub fn view(&self) -> Option<ViewId> {
        self.inner.borrow().renderer.as_ref().map(Renderer::view)
    }

    pub fn is_attached(&self) -> bool {
        self.inner.borrow().attached.is_some()
    }

    pub fn has_resize_observer(&self) -> bool {
        self.inner.borrow().subscription.as_ref().is_some_and(ResizeSubscription::is_active)
    }

    pub fn node_count(&self) -> usize {
        self.inner.borrow().graph.len()
    }

    /// Clones of the current nodes, in z order.
    pub fn nodes(&self) -> Vec<SceneNode> {
        self.inner.borrow().graph.nodes().cloned().collect()
    }

    /// Creates the renderer at the container's current size.
    ///
    /// Suspends while the renderer is created. If [`destroy`](Self::destroy)
    /// runs meanwhile, the new renderer is destroyed on resumption and
    /// nothing is registered. On failure the surface stays
    /// `Uninitialized`.
    pub async fn init<F>(
        &self,
        container: Option<Rc<dyn Container>>,
        factory: &F,
        config: &SurfaceConfig,
    ) -> Result<(), InitError>
    where
        F: RendererFactory<Renderer = R>,
    {
        let (container, size) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != SurfaceState::Uninitialized {
                return Err(InitError::InvalidState(inner.state));
            }
            let Some(container) = container else {
                return Err(InitError::MissingContainer);
            };
            let size = container.measure();
            inner.state = SurfaceState::Initializing;
            inner.container = Some(container.clone());
            inner.size = size;
            (container, size)
        };

        log::debug!("creating renderer at {}x{}", size.width, size.height);
        let created = factory.create(size, config).await;

        {
            let mut inner = self.inner.borrow_mut();
            if inner.state != SurfaceState::Initializing {
                if let Ok(mut renderer) = created {
                    renderer.destroy();
                }
                log::debug!("surface destroyed during init; dropping late renderer");
                return Err(InitError::Cancelled);
            }

            let mut renderer = match created {
                Ok(r) => r,
                Err(e) => {
                    inner.state = SurfaceState::Uninitialized;
                    inner.container = None;
                    return Err(InitError::Renderer(format!("{e:#}")));
                }
            };

            // The container may have changed size while the renderer was created.
            let current = container.measure();
            if renderer.size() != current {
                renderer.resize(current);
            }
            inner.size = current;
            inner.renderer = Some(renderer);
            inner.state = SurfaceState::Ready;
        }

        let weak: Weak<RefCell<Inner<R>>> = Rc::downgrade(&self.inner);
        let subscription = ResizeSubscription::observe(
            container,
            Box::new(move |size| {
                let Some(inner) = weak.upgrade() else { return };
                match inner.try_borrow_mut() {
                    Ok(mut inner) => inner.apply_resize(size),
                    Err(_) => log::warn!("resize notification re-entered the surface; dropped"),
                };
            }),
        );
        self.inner.borrow_mut().subscription = Some(subscription);

        log::info!("surface ready");
        Ok(())
    }

    /// Mounts the renderer's view under the container. Repeated calls return
    /// the already attached view.
    pub fn attach(&self) -> Result<ViewId, SurfaceError> {
        let (container, view) = {
            let inner = self.inner.borrow();
            inner.require_ready()?;
            if let Some(view) = inner.attached {
                return Ok(view);
            }
            match (&inner.container, &inner.renderer) {
                (Some(c), Some(r)) => (c.clone(), r.view()),
                _ => return Err(SurfaceError::NotReady(inner.state)),
            }
        };

        container.attach(view);
        self.inner.borrow_mut().attached = Some(view);
        log::debug!("view {view:?} attached");
        Ok(view)
    }

    /// Resizes the renderer to exactly `size`.
    pub fn resize(&self, size: Size) -> Result<(), SurfaceError> {
        let mut inner = self.inner.borrow_mut();
        inner.require_ready()?;
        inner.apply_resize(size);
        Ok(())
    }

    /// Uploads the nodes' images and appends the nodes in order.
    ///
    /// All or nothing: if any upload fails, textures uploaded by this call
    /// are released and the graph is left untouched.
    pub fn append(&self, nodes: Vec<SceneNode>) -> Result<usize, SurfaceError> {
        let mut guard = self.inner.borrow_mut();
        guard.require_ready()?;
        let inner = &mut *guard;
        let Some(renderer) = inner.renderer.as_mut() else {
            return Err(SurfaceError::NotReady(inner.state));
        };

        let mut placed: Vec<(SceneNode, Option<TextureId>)> = Vec::with_capacity(nodes.len());
        for node in nodes {
            let texture = match node.drawable() {
                Some(image) => match renderer.upload(image) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        for texture in placed.iter().filter_map(|(_, t)| *t) {
                            renderer.release(texture);
                        }
                        return Err(SurfaceError::Upload(format!("{e:#}")));
                    }
                },
                None => None,
            };
            placed.push((node, texture));
        }

        let count = placed.len();
        for (node, texture) in placed {
            inner.graph.push(node, texture);
        }
        log::debug!("appended {count} nodes");
        Ok(count)
    }

    /// Draws the current graph.
    pub fn render(&self) -> Result<(), SurfaceError> {
        let mut guard = self.inner.borrow_mut();
        guard.require_ready()?;
        let inner = &mut *guard;
        let items = inner.graph.draw_items();
        match inner.renderer.as_mut() {
            Some(renderer) => renderer.render(&items).map_err(|e| SurfaceError::Render(format!("{e:#}"))),
            None => Err(SurfaceError::NotReady(inner.state)),
        }
    }

    /// Updates hover state and returns the cursor to show.
    pub fn pointer_moved(&self, pos: Vec2) -> Cursor {
        let mut inner = self.inner.borrow_mut();
        if inner.state != SurfaceState::Ready {
            return Cursor::Default;
        }
        inner.graph.pointer_moved(pos)
    }

    pub fn pointer_down(&self, pos: Vec2) -> bool {
        let mut inner = self.inner.borrow_mut();
        inner.state == SurfaceState::Ready && inner.graph.pointer_down(pos)
    }

    /// Completes a tap; returns `true` if a button was activated.
    ///
    /// The handler runs after the surface is released, so it may call any
    /// surface or controller method, including teardown.
    pub fn pointer_up(&self, pos: Vec2) -> bool {
        let handler = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != SurfaceState::Ready {
                return false;
            }
            inner.graph.pointer_up(pos)
        };
        match handler {
            Some(on_activate) => {
                on_activate();
                true
            }
            None => false,
        }
    }

    pub fn pointer_left(&self) {
        self.inner.borrow_mut().graph.pointer_left();
    }

    /// Tears the surface down. Safe from any state, any number of times.
    ///
    /// Disposes the resize observer, releases every texture, detaches the
    /// view and destroys the renderer. Never fails.
    pub fn destroy(&self) {
        let (subscription, renderer, container, attached, textures, previous) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state == SurfaceState::Destroyed {
                return;
            }
            let previous = inner.state;
            inner.state = SurfaceState::Destroyed;
            let textures = inner.graph.clear();
            (
                inner.subscription.take(),
                inner.renderer.take(),
                inner.container.take(),
                inner.attached.take(),
                textures,
                previous,
            )
        };

        if let Some(mut subscription) = subscription {
            subscription.dispose();
        }

        if let Some(mut renderer) = renderer {
            for texture in textures {
                renderer.release(texture);
            }
            if let (Some(container), Some(view)) = (container.as_ref(), attached) {
                container.detach(view);
            }
            renderer.destroy();
        }

        log::info!("surface destroyed (was {previous:?})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{HeadlessContainer, HeadlessRenderer, HeadlessRendererFactory};
    use futures::executor::block_on;
    use sandbox_engine::device::ImageData;
    use std::sync::Arc;

    fn ready_surface(
        factory: &HeadlessRendererFactory,
        container: &Rc<HeadlessContainer>,
    ) -> SceneSurface<HeadlessRenderer> {
        let surface = SceneSurface::new();
        block_on(surface.init(Some(container.clone()), factory, &SurfaceConfig::default()))
            .expect("init");
        surface
    }

    fn sprite() -> SceneNode {
        SceneNode::Sprite(crate::graph::SpriteNode {
            slot: 0,
            drawable: Arc::new(ImageData::solid(4, 4, [255; 4]).expect("non-empty")),
            position: Vec2::new(10.0, 10.0),
            scale: 1.0,
        })
    }

    #[test]
    fn init_without_container_stays_uninitialized() {
        let surface = SceneSurface::<HeadlessRenderer>::new();
        let err = block_on(surface.init(None, &HeadlessRendererFactory::new(), &SurfaceConfig::default()));
        assert_eq!(err, Err(InitError::MissingContainer));
        assert_eq!(surface.state(), SurfaceState::Uninitialized);
    }

    #[test]
    fn renderer_failure_stays_uninitialized() {
        let factory = HeadlessRendererFactory::failing("no adapter");
        let container = HeadlessContainer::new(Size::new(800.0, 600.0));
        let surface = SceneSurface::new();

        let err = block_on(surface.init(Some(container.clone()), &factory, &SurfaceConfig::default()))
            .expect_err("must fail");

        assert!(matches!(err, InitError::Renderer(ref m) if m.contains("no adapter")));
        assert_eq!(surface.state(), SurfaceState::Uninitialized);
        assert_eq!(container.observer_count(), 0);
    }

    #[test]
    fn init_sizes_to_the_container_and_observes_resizes() {
        let factory = HeadlessRendererFactory::new();
        let container = HeadlessContainer::new(Size::new(800.0, 600.0));
        let surface = ready_surface(&factory, &container);

        assert!(surface.is_ready());
        assert_eq!(surface.size(), Size::new(800.0, 600.0));
        assert!(surface.has_resize_observer());

        container.set_size(Size::new(1024.0, 300.0));
        assert_eq!(surface.size(), Size::new(1024.0, 300.0));
        assert_eq!(factory.record().last_size(), Some(Size::new(1024.0, 300.0)));
    }

    #[test]
    fn second_init_is_rejected() {
        let factory = HeadlessRendererFactory::new();
        let container = HeadlessContainer::new(Size::new(10.0, 10.0));
        let surface = ready_surface(&factory, &container);

        let err = block_on(surface.init(Some(container.clone()), &factory, &SurfaceConfig::default()));
        assert_eq!(err, Err(InitError::InvalidState(SurfaceState::Ready)));
    }

    #[test]
    fn explicit_and_observed_resizes_last_write_wins() {
        let factory = HeadlessRendererFactory::new();
        let container = HeadlessContainer::new(Size::new(100.0, 100.0));
        let surface = ready_surface(&factory, &container);

        container.set_size(Size::new(200.0, 200.0));
        surface.resize(Size::new(300.0, 150.0)).expect("ready");
        assert_eq!(surface.size(), Size::new(300.0, 150.0));

        container.set_size(Size::new(50.0, 60.0));
        assert_eq!(surface.size(), Size::new(50.0, 60.0));
    }

    #[test]
    fn operations_before_init_are_rejected() {
        let surface = SceneSurface::<HeadlessRenderer>::new();
        assert_eq!(surface.attach(), Err(SurfaceError::NotReady(SurfaceState::Uninitialized)));
        assert_eq!(
            surface.resize(Size::new(1.0, 1.0)),
            Err(SurfaceError::NotReady(SurfaceState::Uninitialized))
        );
        assert_eq!(surface.render(), Err(SurfaceError::NotReady(SurfaceState::Uninitialized)));
        assert_eq!(surface.pointer_moved(Vec2::zero()), Cursor::Default);
    }

    #[test]
    fn attach_is_idempotent() {
        let factory = HeadlessRendererFactory::new();
        let container = HeadlessContainer::new(Size::new(10.0, 10.0));
        let surface = ready_surface(&factory, &container);

        assert!(!surface.is_attached());
        let first = surface.attach().expect("attach");
        let second = surface.attach().expect("attach");
        assert_eq!(first, second);
        assert!(surface.is_attached());
        assert_eq!(surface.view(), Some(first));
        assert_eq!(container.attached_views(), vec![first]);
    }

    #[test]
    fn failed_upload_appends_nothing() {
        let factory = HeadlessRendererFactory::new();
        let container = HeadlessContainer::new(Size::new(10.0, 10.0));
        let surface = ready_surface(&factory, &container);
        factory.record().fail_uploads_after(1);

        let err = surface.append(vec![sprite(), sprite()]).expect_err("second upload fails");
        assert!(matches!(err, SurfaceError::Upload(_)));
        assert_eq!(surface.node_count(), 0);
        assert_eq!(factory.record().live_textures(), 0);
    }

    #[test]
    fn destroy_releases_everything_and_is_idempotent() {
        let factory = HeadlessRendererFactory::new();
        let container = HeadlessContainer::new(Size::new(10.0, 10.0));
        let surface = ready_surface(&factory, &container);
        surface.attach().expect("attach");
        surface.append(vec![sprite(), sprite()]).expect("append");
        assert_eq!(factory.record().live_textures(), 2);

        surface.destroy();
        surface.destroy();

        assert_eq!(surface.state(), SurfaceState::Destroyed);
        assert_eq!(surface.node_count(), 0);
        assert!(!surface.has_resize_observer());
        assert_eq!(factory.record().live_textures(), 0);
        assert_eq!(factory.record().destroyed(), 1);
        assert_eq!(container.observer_count(), 0);
        assert!(container.attached_views().is_empty());

        container.set_size(Size::new(99.0, 99.0));
        assert_eq!(surface.size(), Size::new(10.0, 10.0));
        assert!(surface.render().is_err());
    }

    #[test]
    fn destroy_before_init_is_terminal() {
        let surface = SceneSurface::<HeadlessRenderer>::new();
        surface.destroy();
        assert_eq!(surface.state(), SurfaceState::Destroyed);

        let container = HeadlessContainer::new(Size::new(10.0, 10.0));
        let err = block_on(surface.init(Some(container), &HeadlessRendererFactory::new(), &SurfaceConfig::default()));
        assert_eq!(err, Err(InitError::InvalidState(SurfaceState::Destroyed)));
    }

    #[test]
    fn render_hands_the_graph_to_the_renderer() {
        let factory = HeadlessRendererFactory::new();
        let container = HeadlessContainer::new(Size::new(10.0, 10.0));
        let surface = ready_surface(&factory, &container);
        surface.append(vec![sprite()]).expect("append");

        surface.render().expect("frame");
        assert_eq!(factory.record().frames(), 1);
        assert_eq!(factory.record().last_frame_len(), 1);
    }
}
