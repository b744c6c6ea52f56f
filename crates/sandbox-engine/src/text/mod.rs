//! Font loading and single-line label layout on top of `fontdue`.

mod font_system;

pub use font_system::{load_system_font, FontId, FontLoadError, FontSystem, PlacedGlyph};
