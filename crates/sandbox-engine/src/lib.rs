//! Slot sandbox engine crate.
//!
//! Owns the platform + GPU pieces used by the scene layer: geometry and color
//! types, logger setup, label fonts, the renderer seam, and its wgpu
//! implementation.

pub mod coords;
pub mod device;
pub mod logging;
pub mod paint;
pub mod render;
pub mod text;
