use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::window::Window;

use crate::coords::Size;
use crate::render::{RenderCtx, RenderTarget, SpriteRenderer};

use super::{
    BackgroundMode, DrawItem, Gpu, GpuInit, ImageData, Renderer, RendererFactory, SurfaceConfig,
    SurfaceErrorAction, TextureId, ViewId,
};

static NEXT_VIEW: AtomicU64 = AtomicU64::new(1);

/// Creates [`WgpuRenderer`]s presenting into a winit window.
pub struct WgpuRendererFactory {
    window: Arc<Window>,
    init: GpuInit,
    font: Option<Vec<u8>>,
}

impl WgpuRendererFactory {
    pub fn new(window: Arc<Window>, init: GpuInit) -> Self {
        Self { window, init, font: None }
    }

    /// Font for text items (TrueType/OpenType bytes).
    pub fn with_font(mut self, bytes: Vec<u8>) -> Self {
        self.font = Some(bytes);
        self
    }
}

impl RendererFactory for WgpuRendererFactory {
    type Renderer = WgpuRenderer;

    async fn create(&self, size: Size, config: &SurfaceConfig) -> Result<WgpuRenderer> {
        anyhow::ensure!(
            size.is_valid(),
            "container has no drawable area ({}x{})",
            size.width,
            size.height
        );
        let physical = to_physical(&self.window, size);
        let init = self.init.clone().for_surface(config);

        let gpu = Gpu::new(self.window.clone(), physical, init)
            .await
            .context("renderer initialization failed")?;

        let info = gpu.adapter_info();
        log::info!(
            "wgpu renderer ready: {} ({:?}), {}x{} px, format {:?}",
            info.name,
            info.backend,
            physical.width,
            physical.height,
            gpu.surface_format(),
        );

        let mut sprites = SpriteRenderer::new(
            gpu.device(),
            gpu.queue(),
            gpu.surface_format(),
            config.antialias,
        );
        match &self.font {
            Some(bytes) => {
                if let Err(e) = sprites.set_font(bytes) {
                    log::warn!("{e}; text will not be drawn");
                }
            }
            None => log::warn!("no font configured; text will not be drawn"),
        }

        Ok(WgpuRenderer {
            window: self.window.clone(),
            gpu: Some(gpu),
            sprites: Some(sprites),
            background: config.background,
            size,
            view: ViewId(NEXT_VIEW.fetch_add(1, Ordering::Relaxed)),
        })
    }
}

/// [`Renderer`] backed by wgpu, drawing into a window surface.
///
/// After [`Renderer::destroy`] the GPU objects are gone; every other call
/// becomes a no-op (or an error for `upload`/`render`).
pub struct WgpuRenderer {
    window: Arc<Window>,
    gpu: Option<Gpu>,
    sprites: Option<SpriteRenderer>,
    background: BackgroundMode,
    size: Size,
    view: ViewId,
}

impl Renderer for WgpuRenderer {
    fn view(&self) -> ViewId {
        self.view
    }

    fn size(&self) -> Size {
        self.size
    }

    fn resize(&mut self, size: Size) {
        self.size = size;
        let physical = to_physical(&self.window, size);
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(physical);
        }
    }

    fn upload(&mut self, image: &ImageData) -> Result<TextureId> {
        let (Some(gpu), Some(sprites)) = (self.gpu.as_ref(), self.sprites.as_mut()) else {
            anyhow::bail!("renderer has been destroyed");
        };
        sprites.upload(gpu.device(), gpu.queue(), image)
    }

    fn release(&mut self, texture: TextureId) {
        if let Some(sprites) = self.sprites.as_mut() {
            if !sprites.release(texture) {
                log::debug!("release of unknown {texture:?} ignored");
            }
        }
    }

    fn live_textures(&self) -> usize {
        self.sprites.as_ref().map_or(0, SpriteRenderer::len)
    }

    fn render(&mut self, items: &[DrawItem]) -> Result<()> {
        let (Some(gpu), Some(sprites)) = (self.gpu.as_mut(), self.sprites.as_mut()) else {
            anyhow::bail!("renderer has been destroyed");
        };

        let physical = gpu.size();
        if physical.width == 0 || physical.height == 0 {
            return Ok(());
        }

        let mut frame = match gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return match gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => Err(anyhow::anyhow!("surface lost: out of memory")),
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(()),
                };
            }
        };

        // Clear pass, dropped before the encoder is borrowed again.
        {
            let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sandbox clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background.clear_color().to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        {
            let ctx = RenderCtx::new(gpu.device(), gpu.queue(), self.size);
            let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
            sprites.render(&ctx, &mut target, items);
        }

        self.window.pre_present_notify();
        gpu.submit(frame);
        Ok(())
    }

    fn destroy(&mut self) {
        // Textures first, then the device that owns them.
        if let Some(mut sprites) = self.sprites.take() {
            sprites.clear();
        }
        if self.gpu.take().is_some() {
            log::debug!("wgpu renderer {:?} destroyed", self.view);
        }
    }
}

fn to_physical(window: &Window, size: Size) -> PhysicalSize<u32> {
    let logical = LogicalSize::new(size.width as f64, size.height as f64);
    logical.to_physical(window.scale_factor())
}
