use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use sandbox_engine::coords::Size;
use sandbox_engine::device::ViewId;
use sandbox_scene::host::{Container, ObserverId, ResizeCallback};

type SharedCallback = Rc<RefCell<ResizeCallback>>;

/// The window's client area as a scene container.
///
/// The wgpu view already presents into the window, so attaching only records
/// which view is mounted.
pub struct WindowContainer {
    window: Arc<Window>,
    size: Cell<Size>,
    mounted: Cell<Option<ViewId>>,
    observers: RefCell<Vec<(ObserverId, SharedCallback)>>,
    next_observer: Cell<u64>,
}

impl WindowContainer {
    pub fn new(window: Arc<Window>) -> Rc<Self> {
        let size = logical_size(&window, window.inner_size());
        Rc::new(Self {
            window,
            size: Cell::new(size),
            mounted: Cell::new(None),
            observers: RefCell::default(),
            next_observer: Cell::new(1),
        })
    }

    /// Records a new client size and notifies observers.
    pub fn resized(&self, physical: PhysicalSize<u32>) {
        let size = logical_size(&self.window, physical);
        if size == self.size.get() {
            return;
        }
        self.size.set(size);

        let observers: Vec<SharedCallback> =
            self.observers.borrow().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in observers {
            (callback.borrow_mut())(size);
        }
    }
}

impl Container for WindowContainer {
    fn measure(&self) -> Size {
        self.size.get()
    }

    fn attach(&self, view: ViewId) {
        log::debug!("view {view:?} mounted in window {:?}", self.window.id());
        self.mounted.set(Some(view));
        self.window.request_redraw();
    }

    fn detach(&self, view: ViewId) {
        if self.mounted.get() == Some(view) {
            self.mounted.set(None);
            log::debug!("view {view:?} unmounted");
        }
    }

    fn observe_resize(&self, callback: ResizeCallback) -> ObserverId {
        let id = ObserverId(self.next_observer.get());
        self.next_observer.set(id.0 + 1);
        self.observers.borrow_mut().push((id, Rc::new(RefCell::new(callback))));
        id
    }

    fn unobserve_resize(&self, id: ObserverId) {
        self.observers.borrow_mut().retain(|(o, _)| *o != id);
    }
}

pub fn logical_size(window: &Window, physical: PhysicalSize<u32>) -> Size {
    let logical = physical.to_logical::<f32>(window.scale_factor());
    Size::new(logical.width, logical.height)
}
