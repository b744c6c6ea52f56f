use std::fmt;
use std::future::Future;

use anyhow::Result;

use crate::coords::{Rect, Size, Vec2};
use crate::paint::Color;

/// Opaque handle to a texture owned by a [`Renderer`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Opaque handle to the drawable view a renderer presents into.
///
/// This is the node a host container mounts (a window surface, a canvas
/// element, an offscreen target in tests).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ViewId(pub u64);

/// How the surface is cleared before each frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BackgroundMode {
    /// Clear to a solid color.
    Opaque(Color),
    /// Clear to zero alpha so whatever sits behind the view shows through.
    Transparent,
}

impl BackgroundMode {
    #[inline]
    pub fn clear_color(self) -> Color {
        match self {
            BackgroundMode::Opaque(c) => c,
            BackgroundMode::Transparent => Color::transparent(),
        }
    }
}

/// Renderer creation parameters chosen by the scene host.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    pub background: BackgroundMode,
    /// Smooth (linear) texture sampling when `true`, nearest otherwise.
    pub antialias: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            background: BackgroundMode::Opaque(Color::from_rgb_hex(0x0c0c0c)),
            antialias: true,
        }
    }
}

/// Decoded straight-alpha RGBA8 image, ready for upload.
///
/// Construction guarantees a non-empty image whose pixel buffer matches its
/// dimensions.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageData {
    /// Returns `None` for zero-sized images or a buffer of the wrong length.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if width == 0 || height == 0 || pixels.len() != expected {
            return None;
        }
        Some(Self { width, height, pixels })
    }

    /// Single-color image, handy for placeholders and tests.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Option<Self> {
        let pixels = rgba.repeat((width as usize).saturating_mul(height as usize));
        Self::new(width, height, pixels)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Natural size in logical pixels (one texel per logical pixel).
    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// One entry of a frame, in paint order (later items draw on top).
#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem {
    Image { texture: TextureId, rect: Rect },
    Fill { rect: Rect, color: Color },
    /// One line of text centered in `rect`, `size` px tall.
    Text { text: String, rect: Rect, color: Color, size: f32 },
}

impl DrawItem {
    /// The text of a [`DrawItem::Text`].
    pub fn text(&self) -> Option<&str> {
        match self {
            DrawItem::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// A live rendering surface.
///
/// All sizes are logical pixels. Implementations own every texture they hand
/// out until it is released or the renderer is destroyed.
pub trait Renderer {
    /// The view to mount under the host container.
    fn view(&self) -> ViewId;

    fn size(&self) -> Size;

    /// Resizes the drawable to exactly `size`; no aspect correction.
    fn resize(&mut self, size: Size);

    fn upload(&mut self, image: &ImageData) -> Result<TextureId>;

    /// Releases a texture. Unknown ids are ignored.
    fn release(&mut self, texture: TextureId);

    /// Number of textures currently held.
    fn live_textures(&self) -> usize;

    fn render(&mut self, items: &[DrawItem]) -> Result<()>;

    /// Releases every remaining GPU resource. Calling it again is a no-op.
    fn destroy(&mut self);
}

/// Creates renderers bound to a host target.
///
/// Creation is the one asynchronous step of surface initialization
/// (adapter/device acquisition under wgpu).
pub trait RendererFactory {
    type Renderer: Renderer;

    fn create(
        &self,
        size: Size,
        config: &SurfaceConfig,
    ) -> impl Future<Output = Result<Self::Renderer>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_rejects_empty_and_mismatched_buffers() {
        assert!(ImageData::new(0, 4, vec![]).is_none());
        assert!(ImageData::new(2, 2, vec![0; 15]).is_none());
        assert!(ImageData::new(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn solid_image_has_matching_size() {
        let img = ImageData::solid(3, 2, [255, 0, 0, 255]).unwrap();
        assert_eq!(img.pixels().len(), 24);
        assert_eq!(img.size(), Vec2::new(3.0, 2.0));
    }

    #[test]
    fn transparent_background_clears_to_zero_alpha() {
        assert_eq!(BackgroundMode::Transparent.clear_color().a, 0.0);
    }
}
