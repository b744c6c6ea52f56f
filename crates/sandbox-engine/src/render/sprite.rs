use std::collections::HashMap;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::coords::Rect;
use crate::device::{DrawItem, ImageData, TextureId};
use crate::paint::Color;
use crate::text::{FontId, FontLoadError, FontSystem};

use super::common::{premul_alpha_blend, QuadVertex, ViewportUniform, QUAD_INDICES, QUAD_VERTICES};
use super::glyphs::{GlyphAtlas, GlyphUv};
use super::{RenderCtx, RenderTarget};

pub(super) struct SpriteTexture {
    pub texture: wgpu::Texture,
    pub bind_group: wgpu::BindGroup,
}

/// Which texture an instance samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Binding {
    White,
    Texture(TextureId),
    Glyphs,
}

/// Textured-quad renderer for scene frames.
///
/// Owns every texture it uploads; a texture lives until [`release`] or
/// [`clear`]. Fills are drawn with a built-in 1x1 white texture tinted by the
/// fill color, and text with glyphs from an atlas, so a whole frame goes
/// through one pipeline in paint order.
///
/// [`release`]: SpriteRenderer::release
/// [`clear`]: SpriteRenderer::clear
pub struct SpriteRenderer {
    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    viewport_ubo: wgpu::Buffer,
    viewport_bind_group: wgpu::BindGroup,

    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,

    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,

    white: SpriteTexture,
    textures: HashMap<TextureId, SpriteTexture>,
    next_id: u64,

    fonts: FontSystem,
    font: Option<FontId>,
    atlas: Option<GlyphAtlas>,

    warned_unknown_texture: bool,
    warned_missing_font: bool,
}

impl SpriteRenderer {
    /// Builds the pipeline for `surface_format`.
    ///
    /// `smooth` selects linear filtering; otherwise sampling is nearest.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        smooth: bool,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sandbox sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let viewport_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sandbox sprite viewport bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: ViewportUniform::min_binding_size(),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sandbox sprite texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sandbox sprite pipeline layout"),
            bind_group_layouts: &[&viewport_layout, &texture_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sandbox sprite pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), SpriteInstance::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let filter = if smooth {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sandbox sprite sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let viewport_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sandbox sprite viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let viewport_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sandbox sprite viewport bind group"),
            layout: &viewport_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_ubo.as_entire_binding(),
            }],
        });

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sandbox sprite quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sandbox sprite quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let white = create_texture(
            device,
            &texture_layout,
            &sampler,
            (1, 1),
            wgpu::TextureFormat::Rgba8UnormSrgb,
            "sandbox white texture",
        );
        write_texels(queue, &white.texture, (0, 0), (1, 1), &[255u8; 4]);

        Self {
            pipeline,
            texture_layout,
            sampler,
            viewport_ubo,
            viewport_bind_group,
            quad_vbo,
            quad_ibo,
            instance_vbo: None,
            instance_capacity: 0,
            white,
            textures: HashMap::new(),
            next_id: 1,
            fonts: FontSystem::new(),
            font: None,
            atlas: None,
            warned_unknown_texture: false,
            warned_missing_font: false,
        }
    }

    /// Sets the font used for [`DrawItem::Text`]. Without one, text items are
    /// skipped.
    pub fn set_font(&mut self, bytes: &[u8]) -> Result<(), FontLoadError> {
        self.font = Some(self.fonts.load_font(bytes)?);
        Ok(())
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Uploads `image` as a new sRGB texture.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &ImageData,
    ) -> Result<TextureId> {
        let max = device.limits().max_texture_dimension_2d;
        anyhow::ensure!(
            image.width() <= max && image.height() <= max,
            "image {}x{} exceeds the device texture limit of {max}",
            image.width(),
            image.height(),
        );

        let id = TextureId(self.next_id);
        self.next_id += 1;

        let label = format!("sandbox sprite texture #{}", id.0);
        let entry = create_texture(
            device,
            &self.texture_layout,
            &self.sampler,
            (image.width(), image.height()),
            wgpu::TextureFormat::Rgba8UnormSrgb,
            &label,
        );
        write_texels(queue, &entry.texture, (0, 0), (image.width(), image.height()), image.pixels());
        self.textures.insert(id, entry);
        Ok(id)
    }

    /// Destroys the texture behind `id`. Returns `false` for unknown ids.
    pub fn release(&mut self, id: TextureId) -> bool {
        match self.textures.remove(&id) {
            Some(entry) => {
                entry.texture.destroy();
                true
            }
            None => false,
        }
    }

    /// Number of uploaded textures still alive (the built-in white texture
    /// is not counted).
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Destroys every uploaded texture.
    pub fn clear(&mut self) {
        for (_, entry) in self.textures.drain() {
            entry.texture.destroy();
        }
    }

    /// Draws `items` in order on top of whatever `target` already holds.
    ///
    /// Images referencing unknown textures are skipped (one-time debug
    /// message), as is text while no font is set (one-time warning).
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, items: &[DrawItem]) {
        let mut instances: Vec<(SpriteInstance, Binding)> = Vec::with_capacity(items.len());

        for item in items {
            match item {
                &DrawItem::Image { texture, rect } => {
                    if !self.textures.contains_key(&texture) {
                        if !self.warned_unknown_texture {
                            log::debug!("SpriteRenderer: draw references unknown {texture:?}; skipped");
                            self.warned_unknown_texture = true;
                        }
                        continue;
                    }
                    let r = rect.normalized();
                    if r.is_empty() {
                        continue;
                    }
                    instances.push((SpriteInstance::new(r, Color::WHITE), Binding::Texture(texture)));
                }
                &DrawItem::Fill { rect, color } => {
                    let r = rect.normalized();
                    if r.is_empty() {
                        continue;
                    }
                    instances.push((SpriteInstance::new(r, color), Binding::White));
                }
                DrawItem::Text { text, rect, color, size } => {
                    let Some(font) = self.font else {
                        if !self.warned_missing_font {
                            log::warn!("SpriteRenderer: no font set; text `{text}` not drawn");
                            self.warned_missing_font = true;
                        }
                        continue;
                    };
                    let atlas = self
                        .atlas
                        .get_or_insert_with(|| GlyphAtlas::new(ctx.device, &self.texture_layout, &self.sampler));
                    for glyph in self.fonts.layout_centered(text, font, *size, *rect) {
                        let Some(uv) = atlas.glyph(ctx.queue, &self.fonts, font, glyph.key) else {
                            continue;
                        };
                        instances.push((SpriteInstance::glyph(glyph.rect, uv, *color), Binding::Glyphs));
                    }
                }
            }
        }

        if instances.is_empty() {
            return;
        }

        // Mutating methods must happen before borrowing buffers immutably.
        self.write_viewport_uniform(ctx);
        self.ensure_instance_capacity(ctx, instances.len());

        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return };
        let raw: Vec<SpriteInstance> = instances.iter().map(|(inst, _)| *inst).collect();
        ctx.queue.write_buffer(instance_vbo, 0, bytemuck::cast_slice(&raw));

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sandbox sprite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.viewport_bind_group, &[]);
        rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);

        // One instanced call per consecutive run of the same texture; paint
        // order is preserved.
        let mut i = 0usize;
        while i < instances.len() {
            let key = instances[i].1;
            let mut j = i + 1;
            while j < instances.len() && instances[j].1 == key {
                j += 1;
            }

            let bind_group = match key {
                Binding::Texture(id) => self.textures.get(&id).map(|t| &t.bind_group),
                Binding::White => Some(&self.white.bind_group),
                Binding::Glyphs => self.atlas.as_ref().map(GlyphAtlas::bind_group),
            };
            if let Some(bind_group) = bind_group {
                rpass.set_bind_group(1, bind_group, &[]);
                rpass.draw_indexed(0..6, 0, i as u32..j as u32);
            }
            i = j;
        }
    }

    fn write_viewport_uniform(&self, ctx: &RenderCtx<'_>) {
        let u = ViewportUniform {
            viewport: [ctx.viewport.width.max(1.0), ctx.viewport.height.max(1.0)],
            _pad: [0.0; 2],
        };
        ctx.queue.write_buffer(&self.viewport_ubo, 0, bytemuck::bytes_of(&u));
    }

    fn ensure_instance_capacity(&mut self, ctx: &RenderCtx<'_>, required_instances: usize) {
        if required_instances <= self.instance_capacity && self.instance_vbo.is_some() {
            return;
        }

        let new_cap = required_instances.next_power_of_two().max(64);
        let new_size = (new_cap * std::mem::size_of::<SpriteInstance>()) as u64;

        self.instance_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sandbox sprite instance vbo"),
            size: new_size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
    }
}

impl Drop for SpriteRenderer {
    fn drop(&mut self) {
        self.clear();
        self.white.texture.destroy();
    }
}

pub(super) fn create_texture(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    (width, height): (u32, u32),
    format: wgpu::TextureFormat,
    label: &str,
) -> SpriteTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    SpriteTexture { texture, bind_group }
}

/// Writes a `width` x `height` block of RGBA8 texels at `(x, y)`.
pub(super) fn write_texels(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    (x, y): (u32, u32),
    (width, height): (u32, u32),
    texels: &[u8],
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x, y, z: 0 },
            aspect: wgpu::TextureAspect::All,
        },
        texels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SpriteInstance {
    origin: [f32; 2],
    size: [f32; 2],
    uv_min: [f32; 2],
    uv_max: [f32; 2],
    tint: [f32; 4],
}

impl SpriteInstance {
    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        1 => Float32x2, // origin
        2 => Float32x2, // size
        3 => Float32x2, // uv_min
        4 => Float32x2, // uv_max
        5 => Float32x4  // tint (premultiplied)
    ];

    /// Quad sampling the whole texture.
    fn new(rect: Rect, tint: Color) -> Self {
        Self::glyph(rect, GlyphUv { min: [0.0, 0.0], max: [1.0, 1.0] }, tint)
    }

    fn glyph(rect: Rect, uv: GlyphUv, tint: Color) -> Self {
        Self {
            origin: [rect.origin.x, rect.origin.y],
            size: [rect.size.x, rect.size.y],
            uv_min: uv.min,
            uv_max: uv.max,
            tint: tint.to_array(),
        }
    }

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}
