//! Paint model shared between the scene layer and the renderer.
//!
//! Colors are linear premultiplied RGBA. Geometry types live in `coords`.

pub mod color;

pub use color::{Color, ParseColorError};
