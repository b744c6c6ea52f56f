use std::fmt;

use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};

use crate::coords::{Rect, Vec2};

/// Error returned by [`FontSystem::load_font`].
#[derive(Debug, Clone)]
pub struct FontLoadError(pub String);

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font load error: {}", self.0)
    }
}

impl std::error::Error for FontLoadError {}

/// Opaque handle to a font loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// One laid-out glyph in logical pixels, ready to rasterize and place.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlacedGlyph {
    /// Identifies the rasterized bitmap (font, glyph, pixel size).
    pub key: GlyphRasterConfig,
    pub rect: Rect,
}

/// Owns the fonts used for labels.
///
/// Fonts are immutable after loading. Layout is single-line; labels are short.
pub struct FontSystem {
    fonts: Vec<fontdue::Font>,
}

impl FontSystem {
    pub fn new() -> Self {
        Self { fonts: Vec::new() }
    }

    /// Parses and stores a TrueType or OpenType font from raw bytes.
    pub fn load_font(&mut self, bytes: &[u8]) -> Result<FontId, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;
        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        Ok(id)
    }

    pub(crate) fn get(&self, id: FontId) -> Option<&fontdue::Font> {
        self.fonts.get(id.0)
    }

    /// Bounding box of `text` at `size` px, as `(width, height)`.
    #[must_use]
    pub fn measure_text(&self, text: &str, id: FontId, size: f32) -> Vec2 {
        let Some(font) = self.get(id) else {
            return Vec2::new(0.0, size * 1.2);
        };
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.append(&[font], &TextStyle::new(text, size, 0));

        // Pen position after each glyph, not the bitmap edge, so trailing
        // bearings count toward the width.
        let w = layout
            .glyphs()
            .iter()
            .map(|g| {
                let m = font.metrics_indexed(g.key.glyph_index, size);
                (g.x - m.xmin as f32 + m.advance_width).max(0.0)
            })
            .fold(0.0f32, f32::max);
        let h = layout.height().max(size);
        Vec2::new(w, h)
    }

    /// Lays `text` out on one line centered in `rect`.
    ///
    /// Whitespace and zero-area glyphs are omitted. Unknown fonts lay out
    /// nothing.
    pub fn layout_centered(&self, text: &str, id: FontId, size: f32, rect: Rect) -> Vec<PlacedGlyph> {
        let Some(font) = self.get(id) else {
            return Vec::new();
        };
        let extent = self.measure_text(text, id, size);
        let origin = rect.center() - extent * 0.5;

        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings { x: origin.x, y: origin.y, ..LayoutSettings::default() });
        layout.append(&[font], &TextStyle::new(text, size, 0));

        layout
            .glyphs()
            .iter()
            .filter(|g| g.char_data.rasterize() && g.width > 0 && g.height > 0)
            .map(|g| PlacedGlyph {
                key: g.key,
                rect: Rect::new(g.x, g.y, g.width as f32, g.height as f32),
            })
            .collect()
    }

    /// Coverage bitmap for a glyph produced by [`layout_centered`].
    ///
    /// [`layout_centered`]: FontSystem::layout_centered
    pub fn rasterize(&self, id: FontId, key: GlyphRasterConfig) -> Option<(u32, u32, Vec<u8>)> {
        let font = self.get(id)?;
        let (metrics, bitmap) = font.rasterize_config(key);
        if metrics.width == 0 || metrics.height == 0 {
            return None;
        }
        Some((metrics.width as u32, metrics.height as u32, bitmap))
    }
}

impl Default for FontSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Well-known locations of a sans-serif system font.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Bytes of the first system font found, if any.
pub fn load_system_font() -> Option<Vec<u8>> {
    SYSTEM_FONTS.iter().find_map(|p| std::fs::read(p).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_not_a_font() {
        let mut fonts = FontSystem::new();
        let err = fonts.load_font(b"definitely not a font").expect_err("garbage");
        assert!(err.to_string().starts_with("font load error"));
    }

    #[test]
    fn unknown_font_lays_out_nothing() {
        let fonts = FontSystem::new();
        let rect = Rect::new(0.0, 0.0, 120.0, 40.0);
        assert!(fonts.layout_centered("Spin", FontId(3), 16.0, rect).is_empty());
        assert_eq!(fonts.measure_text("Spin", FontId(3), 16.0), Vec2::new(0.0, 16.0 * 1.2));
    }

    // Runs only where a system font is installed.
    #[test]
    fn label_is_centered_in_its_rect() {
        let Some(bytes) = load_system_font() else { return };
        let mut fonts = FontSystem::new();
        let id = fonts.load_font(&bytes).expect("system font parses");

        let rect = Rect::new(60.0, 60.0, 120.0, 40.0);
        let glyphs = fonts.layout_centered("Spin", id, 16.0, rect);
        assert_eq!(glyphs.len(), 4);

        let left = glyphs.iter().map(|g| g.rect.origin.x).fold(f32::MAX, f32::min);
        let right = glyphs.iter().map(|g| g.rect.origin.x + g.rect.size.x).fold(f32::MIN, f32::max);
        let mid = (left + right) * 0.5;
        assert!((mid - rect.center().x).abs() < 4.0, "label midpoint {mid}");
        assert!(glyphs.iter().all(|g| rect.contains(g.rect.origin)));
    }
}
