//! Headless collaborators for driving a mount without a window or GPU.
//!
//! Used by this crate's tests and available to hosts for their own.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use anyhow::{anyhow, Result};
use futures::channel::oneshot;

use sandbox_engine::coords::Size;
use sandbox_engine::device::{
    DrawItem, ImageData, Renderer, RendererFactory, SurfaceConfig, TextureId, ViewId,
};

use crate::assets::{AssetSource, ResourceId};
use crate::error::AssetLoadFailure;
use crate::host::{Container, ObserverId, ResizeCallback};

type SharedCallback = Rc<RefCell<ResizeCallback>>;

/// A container with a settable size that records attached views and
/// registered observers.
pub struct HeadlessContainer {
    size: Cell<Size>,
    attached: RefCell<Vec<ViewId>>,
    observers: RefCell<Vec<(ObserverId, SharedCallback)>>,
    next_observer: Cell<u64>,
}

impl HeadlessContainer {
    pub fn new(size: Size) -> Rc<Self> {
        Rc::new(Self {
            size: Cell::new(size),
            attached: RefCell::default(),
            observers: RefCell::default(),
            next_observer: Cell::new(1),
        })
    }

    /// Changes the measured size and notifies every observer.
    pub fn set_size(&self, size: Size) {
        self.size.set(size);
        let observers: Vec<SharedCallback> =
            self.observers.borrow().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in observers {
            (callback.borrow_mut())(size);
        }
    }

    pub fn attached_views(&self) -> Vec<ViewId> {
        self.attached.borrow().clone()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }
}

impl Container for HeadlessContainer {
    fn measure(&self) -> Size {
        self.size.get()
    }

    fn attach(&self, view: ViewId) {
        self.attached.borrow_mut().push(view);
    }

    fn detach(&self, view: ViewId) {
        self.attached.borrow_mut().retain(|v| *v != view);
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

#[derive(Default)]
struct RecordState {
    created: usize,
    destroyed: usize,
    live: HashSet<TextureId>,
    uploads: usize,
    fail_uploads_after: Option<usize>,
    sizes: Vec<Size>,
    frames: Vec<Vec<DrawItem>>,
}

/// Shared view into every renderer a [`HeadlessRendererFactory`] created.
///
/// Outlives the renderers, so tests can inspect what teardown left behind.
#[derive(Clone, Default)]
pub struct RendererRecord(Rc<RefCell<RecordState>>);

impl RendererRecord {
    pub fn created(&self) -> usize {
        self.0.borrow().created
    }

    pub fn destroyed(&self) -> usize {
        self.0.borrow().destroyed
    }

    /// Textures uploaded and not yet released.
    pub fn live_textures(&self) -> usize {
        self.0.borrow().live.len()
    }

    pub fn uploads(&self) -> usize {
        self.0.borrow().uploads
    }

    /// Makes every upload after the first `n` fail.
    pub fn fail_uploads_after(&self, n: usize) {
        let mut state = self.0.borrow_mut();
        state.fail_uploads_after = Some(state.uploads + n);
    }

    /// Most recent size a renderer was resized to.
    pub fn last_size(&self) -> Option<Size> {
        self.0.borrow().sizes.last().copied()
    }

    pub fn frames(&self) -> usize {
        self.0.borrow().frames.len()
    }

    pub fn last_frame_len(&self) -> usize {
        self.0.borrow().frames.last().map_or(0, Vec::len)
    }

    /// Items of the most recent frame, empty before the first.
    pub fn last_frame(&self) -> Vec<DrawItem> {
        self.0.borrow().frames.last().cloned().unwrap_or_default()
    }
}

/// In-memory [`Renderer`].
pub struct HeadlessRenderer {
    view: ViewId,
    size: Size,
    next_texture: u64,
    owned: HashSet<TextureId>,
    destroyed: bool,
    record: RendererRecord,
}

impl Renderer for HeadlessRenderer {
    fn view(&self) -> ViewId {
        self.view
    }

    fn size(&self) -> Size {
        self.size
    }

    fn resize(&mut self, size: Size) {
        self.size = size;
        self.record.0.borrow_mut().sizes.push(size);
    }

    fn upload(&mut self, _image: &ImageData) -> Result<TextureId> {
        if self.destroyed {
            return Err(anyhow!("renderer has been destroyed"));
        }
        let mut state = self.record.0.borrow_mut();
        let limit = state.fail_uploads_after;
        if limit.is_some_and(|n| state.uploads >= n) {
            return Err(anyhow!("out of texture memory"));
        }
        state.uploads += 1;
        self.next_texture += 1;
        let id = TextureId(self.view.0 << 32 | self.next_texture);
        state.live.insert(id);
        self.owned.insert(id);
        Ok(id)
    }

    fn release(&mut self, texture: TextureId) {
        if self.owned.remove(&texture) {
            self.record.0.borrow_mut().live.remove(&texture);
        }
    }

    fn live_textures(&self) -> usize {
        self.owned.len()
    }

    fn render(&mut self, items: &[DrawItem]) -> Result<()> {
        if self.destroyed {
            return Err(anyhow!("renderer has been destroyed"));
        }
        self.record.0.borrow_mut().frames.push(items.to_vec());
        Ok(())
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let mut state = self.record.0.borrow_mut();
        for texture in self.owned.drain() {
            state.live.remove(&texture);
        }
        state.destroyed += 1;
    }
}

/// Creates [`HeadlessRenderer`]s, optionally failing or suspending until
/// released.
#[derive(Default)]
pub struct HeadlessRendererFactory {
    record: RendererRecord,
    failure: Option<String>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl HeadlessRendererFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every creation fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self { failure: Some(message.to_owned()), ..Self::default() }
    }

    /// The next creation suspends until the returned sender fires (or is
    /// dropped).
    pub fn gated() -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { gate: RefCell::new(Some(rx)), ..Self::default() }, tx)
    }

    pub fn record(&self) -> RendererRecord {
        self.record.clone()
    }
}

impl RendererFactory for HeadlessRendererFactory {
    type Renderer = HeadlessRenderer;

    async fn create(&self, size: Size, _config: &SurfaceConfig) -> Result<HeadlessRenderer> {
        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            // A dropped sender releases the gate as well.
            let _ = gate.await;
        }
        if let Some(message) = &self.failure {
            return Err(anyhow!("{message}"));
        }

        let mut state = self.record.0.borrow_mut();
        state.created += 1;
        Ok(HeadlessRenderer {
            view: ViewId(state.created as u64),
            size,
            next_texture: 0,
            owned: HashSet::new(),
            destroyed: false,
            record: self.record.clone(),
        })
    }
}

enum Entry {
    Image(ImageData),
    Empty,
    Fail(AssetLoadFailure),
}

/// An [`AssetSource`] over images held in memory.
///
/// Unknown identifiers fail as not found. Every request is recorded.
#[derive(Default)]
pub struct MemoryAssetSource {
    entries: HashMap<ResourceId, Entry>,
    gates: RefCell<HashMap<ResourceId, oneshot::Receiver<()>>>,
    requests: RefCell<Vec<ResourceId>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A solid `width` x `height` image.
    pub fn with_image(mut self, id: &str, width: u32, height: u32) -> Self {
        if let Some(image) = ImageData::solid(width, height, [255, 255, 255, 255]) {
            self.entries.insert(id.into(), Entry::Image(image));
        }
        self
    }

    pub fn with_empty(mut self, id: &str) -> Self {
        self.entries.insert(id.into(), Entry::Empty);
        self
    }

    pub fn with_failure(mut self, id: &str, failure: AssetLoadFailure) -> Self {
        self.entries.insert(id.into(), Entry::Fail(failure));
        self
    }

    /// Suspends loads of `id` until the returned sender fires (or is
    /// dropped).
    pub fn gate(&self, id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().insert(id.into(), rx);
        tx
    }

    /// Identifiers requested so far, in request order.
    pub fn requests(&self) -> Vec<ResourceId> {
        self.requests.borrow().clone()
    }
}

impl AssetSource for MemoryAssetSource {
    async fn load(&self, id: &ResourceId) -> Result<Option<ImageData>, AssetLoadFailure> {
        self.requests.borrow_mut().push(id.clone());
        let gate = self.gates.borrow_mut().remove(id);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match self.entries.get(id) {
            Some(Entry::Image(image)) => Ok(Some(image.clone())),
            Some(Entry::Empty) => Ok(None),
            Some(Entry::Fail(failure)) => Err(failure.clone()),
            None => Err(AssetLoadFailure::Failed(format!("`{id}` not found"))),
        }
    }
}
