use super::Vec2;

/// Surface or container size in logical pixels.
///
/// This is the unit the scene layer lays out in; renderers convert to
/// physical pixels with the window scale factor.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Center point of a surface of this size.
    #[inline]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_half_extent() {
        assert_eq!(Size::new(800.0, 600.0).center(), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn zero_or_nan_is_invalid() {
        assert!(!Size::new(0.0, 10.0).is_valid());
        assert!(!Size::new(10.0, f32::NAN).is_valid());
        assert!(Size::new(1.0, 1.0).is_valid());
    }
}
