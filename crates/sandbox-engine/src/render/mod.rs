//! GPU rendering subsystem.
//!
//! Consumes frames of [`DrawItem`](crate::device::DrawItem)s and issues wgpu
//! commands. The renderer owns its own GPU resources (pipeline, buffers,
//! textures, glyph atlas).
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - Vertex shader converts to NDC using a viewport uniform.

mod common;
mod ctx;
mod glyphs;
mod sprite;

pub use ctx::{RenderCtx, RenderTarget};
pub use sprite::SpriteRenderer;
