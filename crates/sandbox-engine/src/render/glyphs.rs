use std::collections::HashMap;

use fontdue::layout::GlyphRasterConfig;

use crate::text::{FontId, FontSystem};

use super::sprite::{create_texture, write_texels, SpriteTexture};

const ATLAS_SIZE: u32 = 1024;
const GLYPH_PADDING: u32 = 1;

#[derive(Debug, Copy, Clone, PartialEq)]
pub(super) struct GlyphUv {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

/// Shelf-packed glyph cache in one RGBA texture.
///
/// Glyphs are stored as white texels with coverage in alpha, so the sprite
/// pipeline draws them tinted like any other quad. Entries live as long as
/// the atlas; once it is full, new glyphs are dropped with a warning.
pub(super) struct GlyphAtlas {
    page: SpriteTexture,
    cache: HashMap<GlyphRasterConfig, GlyphUv>,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
    full: bool,
}

impl GlyphAtlas {
    pub(super) fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, sampler: &wgpu::Sampler) -> Self {
        let page = create_texture(
            device,
            layout,
            sampler,
            (ATLAS_SIZE, ATLAS_SIZE),
            wgpu::TextureFormat::Rgba8Unorm,
            "sandbox glyph atlas",
        );
        Self {
            page,
            cache: HashMap::new(),
            cursor_x: GLYPH_PADDING,
            cursor_y: GLYPH_PADDING,
            row_height: 0,
            full: false,
        }
    }

    pub(super) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.page.bind_group
    }

    /// Atlas coordinates of `key`, rasterizing it on first use.
    pub(super) fn glyph(
        &mut self,
        queue: &wgpu::Queue,
        fonts: &FontSystem,
        font: FontId,
        key: GlyphRasterConfig,
    ) -> Option<GlyphUv> {
        if let Some(uv) = self.cache.get(&key) {
            return Some(*uv);
        }
        let (w, h, coverage) = fonts.rasterize(font, key)?;
        let uv = self.place(queue, w, h, &coverage)?;
        self.cache.insert(key, uv);
        Some(uv)
    }

    fn place(&mut self, queue: &wgpu::Queue, w: u32, h: u32, coverage: &[u8]) -> Option<GlyphUv> {
        if self.full {
            return None;
        }

        if self.cursor_x + w + GLYPH_PADDING > ATLAS_SIZE {
            self.cursor_y += self.row_height + GLYPH_PADDING;
            self.cursor_x = GLYPH_PADDING;
            self.row_height = 0;
        }
        if self.cursor_y + h + GLYPH_PADDING > ATLAS_SIZE {
            log::warn!("glyph atlas is full ({ATLAS_SIZE}x{ATLAS_SIZE}); further glyphs are not drawn");
            self.full = true;
            return None;
        }

        let (x, y) = (self.cursor_x, self.cursor_y);
        let texels: Vec<u8> = coverage.iter().flat_map(|&a| [255, 255, 255, a]).collect();
        write_texels(queue, &self.page.texture, (x, y), (w, h), &texels);

        self.cursor_x += w + GLYPH_PADDING;
        self.row_height = self.row_height.max(h);

        let size = ATLAS_SIZE as f32;
        Some(GlyphUv {
            min: [x as f32 / size, y as f32 / size],
            max: [(x + w) as f32 / size, (y + h) as f32 / size],
        })
    }
}

impl Drop for GlyphAtlas {
    fn drop(&mut self) {
        self.page.texture.destroy();
    }
}
