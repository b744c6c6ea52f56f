//! The host container seam.

use std::rc::Rc;

use sandbox_engine::coords::Size;
use sandbox_engine::device::ViewId;

/// Token for one registered resize observer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

pub type ResizeCallback = Box<dyn FnMut(Size)>;

/// Host UI element a scene mounts into.
///
/// Hosts must not hold internal borrows while invoking resize callbacks; a
/// callback may call back into [`Container::unobserve_resize`].
pub trait Container {
    /// Current measured size in logical pixels.
    fn measure(&self) -> Size;

    /// Mounts `view` as a child of this container.
    fn attach(&self, view: ViewId);

    /// Unmounts `view`. Unknown views are ignored.
    fn detach(&self, view: ViewId);

    /// Registers `callback` for every future size change.
    fn observe_resize(&self, callback: ResizeCallback) -> ObserverId;

    /// Removes an observer. Unknown ids are ignored.
    fn unobserve_resize(&self, id: ObserverId);
}

/// A registered resize observer.
///
/// Disposed explicitly by surface teardown; dropping it disposes as well, so
/// no exit path leaves the observer behind.
pub struct ResizeSubscription {
    container: Rc<dyn Container>,
    id: Option<ObserverId>,
}

impl ResizeSubscription {
    pub fn observe(container: Rc<dyn Container>, callback: ResizeCallback) -> Self {
        let id = container.observe_resize(callback);
        log::debug!("resize observer {id:?} registered");
        Self { container, id: Some(id) }
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    /// Unregisters the observer. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if let Some(id) = self.id.take() {
            self.container.unobserve_resize(id);
            log::debug!("resize observer {id:?} disposed");
        }
    }
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ResizeSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResizeSubscription").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HeadlessContainer;

    #[test]
    fn dispose_is_idempotent() {
        let container = HeadlessContainer::new(Size::new(100.0, 100.0));
        let mut sub = ResizeSubscription::observe(container.clone(), Box::new(|_| {}));
        assert_eq!(container.observer_count(), 1);

        sub.dispose();
        sub.dispose();
        assert!(!sub.is_active());
        assert_eq!(container.observer_count(), 0);
    }

    #[test]
    fn drop_unregisters() {
        let container = HeadlessContainer::new(Size::new(100.0, 100.0));
        {
            let _sub = ResizeSubscription::observe(container.clone(), Box::new(|_| {}));
            assert_eq!(container.observer_count(), 1);
        }
        assert_eq!(container.observer_count(), 0);
    }
}
