use super::Vec2;

/// Axis-aligned rectangle in logical pixels (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    /// Rectangle of `size` whose center sits at `center`.
    #[inline]
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        Self {
            origin: center - size * 0.5,
            size,
        }
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Normalizes the rectangle so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let mut x = self.origin.x;
        let mut y = self.origin.y;
        let mut w = self.size.x;
        let mut h = self.size.y;

        if w < 0.0 {
            x += w;
            w = -w;
        }
        if h < 0.0 {
            y += h;
            h = -h;
        }

        Rect::new(x, y, w, h)
    }

    /// Shrinks every edge by `amount`, keeping the center. Never goes below
    /// zero size.
    #[inline]
    pub fn inset(self, amount: f32) -> Self {
        let r = self.normalized();
        let w = (r.size.x - 2.0 * amount).max(0.0);
        let h = (r.size.y - 2.0 * amount).max(0.0);
        Rect::from_center_size(r.center(), Vec2::new(w, h))
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        let r = self.normalized();
        p.x >= r.origin.x
            && p.y >= r.origin.y
            && p.x < (r.origin.x + r.size.x)
            && p.y < (r.origin.y + r.size.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button() -> Rect {
        Rect::new(60.0, 60.0, 120.0, 40.0)
    }

    #[test]
    fn hit_region_is_half_open() {
        assert!(button().contains(Vec2::new(60.0, 60.0)));
        assert!(button().contains(Vec2::new(179.9, 99.9)));
        assert!(!button().contains(Vec2::new(180.0, 80.0)));
        assert!(!button().contains(Vec2::new(100.0, 100.0)));
        assert!(!button().contains(Vec2::new(59.0, 80.0)));
    }

    #[test]
    fn negative_extents_normalize_before_containment() {
        let flipped = Rect::new(180.0, 100.0, -120.0, -40.0);
        assert_eq!(flipped.normalized(), button());
        assert!(flipped.contains(Vec2::new(100.0, 80.0)));
    }

    #[test]
    fn centered_rect_keeps_its_center() {
        let sprite = Rect::from_center_size(Vec2::new(400.0, 140.0), Vec2::new(60.0, 36.0));
        assert_eq!(sprite, Rect::new(370.0, 122.0, 60.0, 36.0));
        assert_eq!(sprite.center(), Vec2::new(400.0, 140.0));
    }

    #[test]
    fn border_inset_shrinks_every_edge() {
        assert_eq!(button().inset(2.0), Rect::new(62.0, 62.0, 116.0, 36.0));
        assert!(button().inset(30.0).is_empty());
        assert_eq!(button().inset(30.0).center(), button().center());
    }

    #[test]
    fn zero_extent_is_empty() {
        assert!(Rect::new(0.0, 0.0, 0.0, 5.0).is_empty());
        assert!(Rect::new(0.0, 0.0, 5.0, 0.0).is_empty());
        assert!(!button().is_empty());
    }
}
