//! Renderer seam + the wgpu implementation behind it.
//!
//! `backend` defines what the scene layer needs from a renderer (create,
//! resize, upload/release textures, draw, destroy). `gpu` and `renderer`
//! implement it on top of wgpu:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain) for a winit window
//! - uploading decoded images as textures and drawing the frame

mod backend;
mod gpu;
mod init;
mod renderer;
mod surface;

pub use backend::{
    BackgroundMode, DrawItem, ImageData, Renderer, RendererFactory, SurfaceConfig, TextureId,
    ViewId,
};
pub use gpu::{Gpu, GpuFrame, SurfaceErrorAction};
pub use init::GpuInit;
pub use renderer::{WgpuRenderer, WgpuRendererFactory};
