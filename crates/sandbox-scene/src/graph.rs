//! Scene nodes and the per-surface scene graph.

use std::fmt;
use std::rc::Rc;

use sandbox_engine::coords::{Rect, Vec2};
use sandbox_engine::device::{DrawItem, TextureId};
use sandbox_engine::paint::Color;

use crate::assets::Drawable;

/// Activation handler of a button.
pub type ActivateFn = Rc<dyn Fn()>;

/// Current look of a button.
///
/// Evaluated on every frame and pointer event, so it can follow host-owned
/// state. It runs while the surface is borrowed and must not call back into
/// the surface.
pub type StyleFn = Rc<dyn Fn() -> ButtonStyle>;

/// Cursor affordance requested by the scene for the current pointer position.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
    /// Over a disabled button.
    NotAllowed,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Border {
    pub color: Color,
    pub width: f32,
}

/// How a button is drawn, and whether it reacts to taps.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ButtonStyle {
    pub fill: Color,
    pub border: Option<Border>,
    pub label_color: Color,
    pub enabled: bool,
}

impl ButtonStyle {
    pub const FILL: u32 = 0x2d9cdb;

    /// Enabled, borderless, white label.
    pub fn filled(fill: Color) -> Self {
        Self { fill, border: None, label_color: Color::WHITE, enabled: true }
    }

    pub fn with_border(mut self, color: Color, width: f32) -> Self {
        self.border = Some(Border { color, width });
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl Default for ButtonStyle {
    fn default() -> Self {
        Self::filled(Color::from_rgb_hex(Self::FILL))
    }
}

/// Full-surface backdrop, centered on the surface.
#[derive(Debug, Clone)]
pub struct BackgroundNode {
    pub drawable: Drawable,
    pub position: Vec2,
}

/// One sprite of the foreground layer.
#[derive(Debug, Clone)]
pub struct SpriteNode {
    /// Declared slot in the layer (0 = lowest).
    pub slot: usize,
    pub drawable: Drawable,
    /// Center of the sprite.
    pub position: Vec2,
    pub scale: f32,
}

/// A clickable labeled region.
#[derive(Clone)]
pub struct ButtonNode {
    pub label: String,
    pub bounds: Rect,
    /// Label height in px; the label is centered in `bounds`.
    pub label_size: f32,
    pub style: StyleFn,
    pub on_activate: ActivateFn,
}

impl ButtonNode {
    pub fn style(&self) -> ButtonStyle {
        (self.style)()
    }

    /// Border, face and label, in paint order.
    fn push_draw_items(&self, out: &mut Vec<DrawItem>) {
        let style = self.style();
        let face = match style.border {
            Some(border) => {
                out.push(DrawItem::Fill { rect: self.bounds, color: border.color });
                self.bounds.inset(border.width)
            }
            None => self.bounds,
        };
        out.push(DrawItem::Fill { rect: face, color: style.fill });
        if !self.label.is_empty() {
            out.push(DrawItem::Text {
                text: self.label.clone(),
                rect: self.bounds,
                color: style.label_color,
                size: self.label_size,
            });
        }
    }
}

impl fmt::Debug for ButtonNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonNode")
            .field("label", &self.label)
            .field("bounds", &self.bounds)
            .field("style", &self.style())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum SceneNode {
    Background(BackgroundNode),
    Sprite(SpriteNode),
    Button(ButtonNode),
}

impl SceneNode {
    /// Screen-space bounds in logical pixels.
    pub fn bounds(&self) -> Rect {
        match self {
            SceneNode::Background(n) => Rect::from_center_size(n.position, n.drawable.size()),
            SceneNode::Sprite(n) => Rect::from_center_size(n.position, n.drawable.size() * n.scale),
            SceneNode::Button(n) => n.bounds,
        }
    }

    /// The image this node draws, if any.
    pub fn drawable(&self) -> Option<&Drawable> {
        match self {
            SceneNode::Background(n) => Some(&n.drawable),
            SceneNode::Sprite(n) => Some(&n.drawable),
            SceneNode::Button(_) => None,
        }
    }

    pub fn as_button(&self) -> Option<&ButtonNode> {
        match self {
            SceneNode::Button(b) => Some(b),
            _ => None,
        }
    }
}

struct Placed {
    node: SceneNode,
    texture: Option<TextureId>,
}

/// Nodes owned by one surface, in z order (insertion order), plus pointer
/// state for the interactive ones.
#[derive(Default)]
pub struct SceneGraph {
    nodes: Vec<Placed>,
    hovered: Option<usize>,
    pressed: Option<usize>,
}

impl SceneGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter().map(|p| &p.node)
    }

    pub(crate) fn push(&mut self, node: SceneNode, texture: Option<TextureId>) {
        self.nodes.push(Placed { node, texture });
    }

    /// Empties the graph, handing back every texture it referenced.
    pub(crate) fn clear(&mut self) -> Vec<TextureId> {
        self.hovered = None;
        self.pressed = None;
        self.nodes.drain(..).filter_map(|p| p.texture).collect()
    }

    /// Draw list in paint order. Buttons contribute their border, face and
    /// label.
    pub fn draw_items(&self) -> Vec<DrawItem> {
        let mut items = Vec::with_capacity(self.nodes.len());
        for placed in &self.nodes {
            match (&placed.node, placed.texture) {
                (SceneNode::Button(b), _) => b.push_draw_items(&mut items),
                (node, Some(texture)) => items.push(DrawItem::Image { texture, rect: node.bounds() }),
                (_, None) => {}
            }
        }
        items
    }

    /// Topmost button under `pos`.
    pub fn hit_test(&self, pos: Vec2) -> Option<usize> {
        self.nodes
            .iter()
            .rposition(|p| p.node.as_button().is_some_and(|b| b.bounds.contains(pos)))
    }

    pub fn pointer_moved(&mut self, pos: Vec2) -> Cursor {
        self.hovered = self.hit_test(pos);
        match self.hovered().and_then(SceneNode::as_button) {
            Some(b) if b.style().enabled => Cursor::Pointer,
            Some(_) => Cursor::NotAllowed,
            None => Cursor::Default,
        }
    }

    /// Returns `true` when a button took the press. Disabled buttons take
    /// presses too, so nothing beneath them reacts.
    pub fn pointer_down(&mut self, pos: Vec2) -> bool {
        self.pressed = self.hit_test(pos);
        self.pressed.is_some()
    }

    /// Completes a tap. Returns the handler to invoke when the release lands
    /// on the button that took the press.
    pub fn pointer_up(&mut self, pos: Vec2) -> Option<ActivateFn> {
        let pressed = self.pressed.take()?;
        if self.hit_test(pos) != Some(pressed) {
            return None;
        }
        let button = self.nodes.get(pressed)?.node.as_button()?;
        if !button.style().enabled {
            log::debug!("button `{}` is disabled", button.label);
            return None;
        }
        log::debug!("button `{}` activated", button.label);
        Some(button.on_activate.clone())
    }

    pub fn pointer_left(&mut self) {
        self.hovered = None;
        self.pressed = None;
    }

    pub fn hovered(&self) -> Option<&SceneNode> {
        self.hovered.and_then(|i| self.nodes.get(i)).map(|p| &p.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandbox_engine::device::ImageData;
    use std::cell::Cell;
    use std::sync::Arc;

    fn styled(label: &str, bounds: Rect, style: StyleFn, hits: Rc<Cell<u32>>) -> SceneNode {
        SceneNode::Button(ButtonNode {
            label: label.into(),
            bounds,
            label_size: 16.0,
            style,
            on_activate: Rc::new(move || hits.set(hits.get() + 1)),
        })
    }

    fn button(label: &str, bounds: Rect, hits: Rc<Cell<u32>>) -> SceneNode {
        styled(label, bounds, Rc::new(ButtonStyle::default), hits)
    }

    fn sprite(slot: usize, position: Vec2) -> SceneNode {
        let drawable = Arc::new(ImageData::solid(10, 20, [255; 4]).expect("non-empty"));
        SceneNode::Sprite(SpriteNode { slot, drawable, position, scale: 0.5 })
    }

    #[test]
    fn sprite_bounds_are_scaled_around_the_center() {
        let r = sprite(0, Vec2::new(100.0, 100.0)).bounds();
        assert_eq!(r, Rect::new(97.5, 95.0, 5.0, 10.0));
    }

    #[test]
    fn hover_shows_pointer_only_over_buttons() {
        let mut g = SceneGraph::default();
        g.push(sprite(0, Vec2::new(50.0, 50.0)), Some(TextureId(1)));
        g.push(button("Spin", Rect::new(0.0, 0.0, 20.0, 20.0), Rc::default()), None);

        assert_eq!(g.pointer_moved(Vec2::new(10.0, 10.0)), Cursor::Pointer);
        assert_eq!(g.pointer_moved(Vec2::new(50.0, 50.0)), Cursor::Default);
        assert!(g.hovered().is_none());
    }

    #[test]
    fn tap_activates_exactly_once() {
        let hits = Rc::new(Cell::new(0));
        let mut g = SceneGraph::default();
        g.push(button("Spin", Rect::new(0.0, 0.0, 20.0, 20.0), hits.clone()), None);

        assert!(g.pointer_down(Vec2::new(5.0, 5.0)));
        if let Some(f) = g.pointer_up(Vec2::new(6.0, 6.0)) {
            f();
        }
        assert!(g.pointer_up(Vec2::new(6.0, 6.0)).is_none());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn release_outside_the_pressed_button_cancels() {
        let mut g = SceneGraph::default();
        g.push(button("Spin", Rect::new(0.0, 0.0, 20.0, 20.0), Rc::default()), None);

        g.pointer_down(Vec2::new(5.0, 5.0));
        assert!(g.pointer_up(Vec2::new(50.0, 50.0)).is_none());
    }

    #[test]
    fn topmost_overlapping_button_wins() {
        let under = Rc::new(Cell::new(0));
        let over = Rc::new(Cell::new(0));
        let mut g = SceneGraph::default();
        g.push(button("under", Rect::new(0.0, 0.0, 40.0, 40.0), under.clone()), None);
        g.push(button("over", Rect::new(10.0, 10.0, 40.0, 40.0), over.clone()), None);

        g.pointer_down(Vec2::new(20.0, 20.0));
        if let Some(f) = g.pointer_up(Vec2::new(20.0, 20.0)) {
            f();
        }
        assert_eq!((under.get(), over.get()), (0, 1));
    }

    #[test]
    fn draw_items_follow_insertion_order() {
        let mut g = SceneGraph::default();
        g.push(sprite(0, Vec2::new(50.0, 50.0)), Some(TextureId(7)));
        g.push(button("Spin", Rect::new(0.0, 0.0, 20.0, 20.0), Rc::default()), None);

        let items = g.draw_items();
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], DrawItem::Image { texture: TextureId(7), .. }));
        assert!(matches!(items[1], DrawItem::Fill { .. }));
        assert_eq!(items[2].text(), Some("Spin"));
    }

    #[test]
    fn label_is_drawn_over_the_face_in_the_label_color() {
        let bounds = Rect::new(60.0, 60.0, 120.0, 40.0);
        let mut g = SceneGraph::default();
        g.push(button("Autoplay", bounds, Rc::default()), None);

        assert_eq!(
            g.draw_items(),
            vec![
                DrawItem::Fill { rect: bounds, color: Color::from_rgb_hex(ButtonStyle::FILL) },
                DrawItem::Text { text: "Autoplay".into(), rect: bounds, color: Color::WHITE, size: 16.0 },
            ]
        );
    }

    #[test]
    fn style_is_read_each_frame() {
        let gold = Color::from_rgb_hex(0xffd700);
        let highlighted = Rc::new(Cell::new(false));
        let flag = highlighted.clone();
        let style: StyleFn = Rc::new(move || {
            let base = ButtonStyle::default();
            if flag.get() { base.with_border(gold, 2.0) } else { base }
        });
        let bounds = Rect::new(0.0, 0.0, 120.0, 40.0);
        let mut g = SceneGraph::default();
        g.push(styled("White", bounds, style, Rc::default()), None);

        assert_eq!(g.draw_items().len(), 2);
        highlighted.set(true);
        let items = g.draw_items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], DrawItem::Fill { rect: bounds, color: gold });
        assert_eq!(items[1], DrawItem::Fill { rect: Rect::new(2.0, 2.0, 116.0, 36.0), color: Color::from_rgb_hex(ButtonStyle::FILL) });
    }

    #[test]
    fn disabled_button_blocks_the_tap_and_shows_not_allowed() {
        let under = Rc::new(Cell::new(0));
        let over = Rc::new(Cell::new(0));
        let bounds = Rect::new(0.0, 0.0, 40.0, 40.0);
        let mut g = SceneGraph::default();
        g.push(button("under", bounds, under.clone()), None);
        g.push(styled("Play", bounds, Rc::new(|| ButtonStyle::default().disabled()), over.clone()), None);

        assert_eq!(g.pointer_moved(Vec2::new(5.0, 5.0)), Cursor::NotAllowed);
        assert!(g.pointer_down(Vec2::new(5.0, 5.0)));
        assert!(g.pointer_up(Vec2::new(5.0, 5.0)).is_none());
        assert_eq!((under.get(), over.get()), (0, 0));
    }

    #[test]
    fn clear_returns_every_texture() {
        let mut g = SceneGraph::default();
        g.push(sprite(0, Vec2::zero()), Some(TextureId(1)));
        g.push(sprite(1, Vec2::zero()), Some(TextureId(2)));
        g.push(button("b", Rect::new(0.0, 0.0, 1.0, 1.0), Rc::default()), None);

        assert_eq!(g.clear(), vec![TextureId(1), TextureId(2)]);
        assert!(g.is_empty());
    }
}
