//! Turns settled assets into the static scene graph.

use std::rc::Rc;

use serde::Deserialize;

use sandbox_engine::coords::{Rect, Size, Vec2};
use sandbox_engine::device::Renderer;
use sandbox_engine::paint::Color;

use crate::assets::AssetResult;
use crate::error::{InsufficientAssetsError, SceneError};
use crate::graph::{ActivateFn, BackgroundNode, ButtonNode, ButtonStyle, SceneNode, SpriteNode, StyleFn};
use crate::surface::SceneSurface;

/// Where the foreground sprites go.
///
/// Asset 0 is the background; assets `1..=foreground_count` fill sprite
/// slots `0..foreground_count`. Slot `i` is centered at
/// `(cx, cy - anchor_offset - i * spacing)`, so later slots stack upward.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutSpec {
    pub foreground_count: usize,
    /// Assets that must resolve for the scene to build, background included.
    /// `None` requires all `1 + foreground_count`; lower values opt into a
    /// partial scene.
    ///
    /// The background is always one of the required assets. When it fails
    /// nothing counts and the build reports `got = 0`.
    pub minimum: Option<usize>,
    pub sprite_scale: f32,
    pub anchor_offset: f32,
    pub spacing: f32,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            foreground_count: 4,
            minimum: None,
            sprite_scale: 0.6,
            anchor_offset: 160.0,
            spacing: 40.0,
        }
    }
}

impl LayoutSpec {
    /// Background plus every sprite slot.
    pub fn slot_count(&self) -> usize {
        1 + self.foreground_count
    }

    /// Resolved assets the build requires: the background plus
    /// `required_assets() - 1` sprites.
    pub fn required_assets(&self) -> usize {
        self.minimum.unwrap_or(self.slot_count()).clamp(1, self.slot_count())
    }

    pub fn sprite_position(&self, center: Vec2, slot: usize) -> Vec2 {
        Vec2::new(center.x, center.y - self.anchor_offset - slot as f32 * self.spacing)
    }
}

/// Declarative description of a clickable control.
#[derive(Clone)]
pub struct ButtonSpec {
    pub label: String,
    /// Top-left corner.
    pub position: Vec2,
    pub size: Vec2,
    pub label_size: f32,
    pub style: StyleFn,
    pub on_activate: ActivateFn,
}

impl ButtonSpec {
    pub const DEFAULT_SIZE: Vec2 = Vec2::new(120.0, 40.0);
    pub const LABEL_SIZE: f32 = 16.0;

    pub fn new(label: impl Into<String>, position: Vec2, on_activate: impl Fn() + 'static) -> Self {
        Self {
            label: label.into(),
            position,
            size: Self::DEFAULT_SIZE,
            label_size: Self::LABEL_SIZE,
            style: Rc::new(ButtonStyle::default),
            on_activate: Rc::new(on_activate),
        }
    }

    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    /// A fixed look with `fill` behind the default white label.
    pub fn with_fill(self, fill: Color) -> Self {
        let style = ButtonStyle::filled(fill);
        self.with_style(move || style)
    }

    /// A look computed on every frame, e.g. from a host-owned selection.
    pub fn with_style(mut self, style: impl Fn() -> ButtonStyle + 'static) -> Self {
        self.style = Rc::new(style);
        self
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }
}

impl std::fmt::Debug for ButtonSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ButtonSpec")
            .field("label", &self.label)
            .field("position", &self.position)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneBuilder {
    layout: LayoutSpec,
    buttons: Vec<ButtonSpec>,
}

impl SceneBuilder {
    pub fn new(layout: LayoutSpec) -> Self {
        Self { layout, buttons: Vec::new() }
    }

    pub fn with_buttons(mut self, buttons: impl IntoIterator<Item = ButtonSpec>) -> Self {
        self.buttons.extend(buttons);
        self
    }

    /// Builds the scene for a ready surface, consuming the assets.
    pub fn build<R: Renderer + 'static>(
        &self,
        surface: &SceneSurface<R>,
        assets: AssetResult,
    ) -> Result<Vec<SceneNode>, SceneError> {
        if !surface.is_ready() {
            return Err(crate::error::SurfaceError::NotReady(surface.state()).into());
        }
        self.build_for_size(surface.size(), assets)
    }

    /// Builds the scene for a surface of `size`.
    ///
    /// Order: background, sprites in slot order, then buttons. Fails with
    /// [`InsufficientAssetsError`] when fewer than
    /// [`LayoutSpec::required_assets`] usable assets resolved; see
    /// [`LayoutSpec::minimum`] for how the background counts.
    pub fn build_for_size(&self, size: Size, assets: AssetResult) -> Result<Vec<SceneNode>, SceneError> {
        let slots = self.layout.slot_count();
        let required = self.layout.required_assets();
        let background = assets.get(0).and_then(|o| o.drawable());
        let got = match background {
            Some(_) => assets.iter().take(slots).filter(|o| o.result.is_ok()).count(),
            None => {
                if let Some(outcome) = assets.get(0) {
                    log::warn!("background `{}` did not resolve; no asset is usable", outcome.id);
                }
                0
            }
        };
        let Some(background) = background.filter(|_| got >= required) else {
            return Err(InsufficientAssetsError { required, got }.into());
        };
        if assets.len() > slots {
            log::debug!("{} assets beyond the layout's {slots} slots ignored", assets.len() - slots);
        }

        let center = size.center();
        let mut nodes = Vec::with_capacity(slots + self.buttons.len());
        nodes.push(SceneNode::Background(BackgroundNode {
            drawable: background.clone(),
            position: center,
        }));

        for slot in 0..self.layout.foreground_count {
            let Some(outcome) = assets.get(slot + 1) else { break };
            match outcome.drawable() {
                Some(drawable) => nodes.push(SceneNode::Sprite(SpriteNode {
                    slot,
                    drawable: drawable.clone(),
                    position: self.layout.sprite_position(center, slot),
                    scale: self.layout.sprite_scale,
                })),
                None => log::warn!("sprite slot {slot} (`{}`) left empty", outcome.id),
            }
        }

        nodes.extend(self.buttons.iter().map(|b| {
            SceneNode::Button(ButtonNode {
                label: b.label.clone(),
                bounds: b.bounds(),
                label_size: b.label_size,
                style: b.style.clone(),
                on_activate: b.on_activate.clone(),
            })
        }));

        log::debug!("built {} nodes for {}x{}", nodes.len(), size.width, size.height);
        Ok(nodes)
    }
}
