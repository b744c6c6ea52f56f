//! Coordinate and geometry types shared by the renderer and the scene layer.
//!
//! Canonical CPU space:
//! - Logical pixels (device-independent)
//! - Origin top-left
//! - +X right, +Y down
//!
//! The renderer converts to NDC in its vertex shader using a viewport uniform.

mod rect;
mod size;
mod vec2;

pub use rect::Rect;
pub use size::Size;
pub use vec2::Vec2;
