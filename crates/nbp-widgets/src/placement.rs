#![forbid(unsafe_code)]

//! Anchored placement for floating content.
//!
//! Content is centered horizontally on its anchor and placed above it. When
//! there is not enough room above, placement flips below; when neither side
//! fits, the side with more room wins. Horizontal position is clamped so the
//! content never leaves the viewport (minus a margin).

use nbp_core::{Point, Rect, Size};

/// Which side of the anchor the content ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Above,
    Below,
}

impl Placement {
    fn flip(self) -> Self {
        match self {
            Self::Above => Self::Below,
            Self::Below => Self::Above,
        }
    }
}

/// Placement parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchored {
    /// Distance between anchor and content.
    pub gap: f64,
    /// Minimum distance from the viewport edges.
    pub margin: f64,
}

impl Default for Anchored {
    fn default() -> Self {
        Self {
            gap: 6.0,
            margin: 8.0,
        }
    }
}

impl Anchored {
    pub const fn new(gap: f64, margin: f64) -> Self {
        Self { gap, margin }
    }

    /// Top-left corner for content of `size` anchored to `anchor`.
    pub fn place(&self, anchor: Rect, size: Size, viewport: Rect) -> (Point, Placement) {
        let placement = self.resolve(anchor, size, viewport);
        let top = match placement {
            Placement::Above => anchor.top - self.gap - size.height,
            Placement::Below => anchor.bottom() + self.gap,
        };
        let left = self.clamp_x(anchor.center_x() - size.width / 2.0, size.width, viewport);
        (Point::new(left, top), placement)
    }

    fn resolve(&self, anchor: Rect, size: Size, viewport: Rect) -> Placement {
        let needed = size.height + self.gap;
        let primary = Placement::Above;
        let available = self.available(primary, anchor, viewport);
        if available >= needed {
            return primary;
        }
        let flipped = primary.flip();
        let flipped_available = self.available(flipped, anchor, viewport);
        if flipped_available >= needed || flipped_available > available {
            flipped
        } else {
            primary
        }
    }

    fn available(&self, placement: Placement, anchor: Rect, viewport: Rect) -> f64 {
        let space = match placement {
            Placement::Above => anchor.top - viewport.top,
            Placement::Below => viewport.bottom() - anchor.bottom(),
        };
        (space - self.margin).max(0.0)
    }

    fn clamp_x(&self, left: f64, width: f64, viewport: Rect) -> f64 {
        let min = viewport.left + self.margin;
        let max = viewport.right() - self.margin - width;
        if max < min {
            // Wider than the viewport: pin to the left edge.
            return min;
        }
        left.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 800.0, 600.0)
    }

    #[test]
    fn centered_above() {
        let anchor = Rect::new(300.0, 300.0, 40.0, 20.0);
        let (at, placement) = Anchored::default().place(anchor, Size::new(100.0, 50.0), viewport());
        assert_eq!(placement, Placement::Above);
        assert_eq!(at, Point::new(270.0, 244.0));
    }

    #[test]
    fn flips_below_near_top() {
        let anchor = Rect::new(300.0, 20.0, 40.0, 20.0);
        let (at, placement) = Anchored::default().place(anchor, Size::new(100.0, 50.0), viewport());
        assert_eq!(placement, Placement::Below);
        assert_eq!(at.top, 46.0);
    }

    #[test]
    fn clamps_at_left_edge() {
        let anchor = Rect::new(0.0, 300.0, 20.0, 20.0);
        let (at, _) = Anchored::default().place(anchor, Size::new(100.0, 50.0), viewport());
        assert_eq!(at.left, 8.0);
    }

    #[test]
    fn clamps_at_right_edge() {
        let anchor = Rect::new(790.0, 300.0, 10.0, 20.0);
        let (at, _) = Anchored::default().place(anchor, Size::new(100.0, 50.0), viewport());
        assert_eq!(at.left, 692.0);
    }

    #[test]
    fn oversized_content_pins_left() {
        let anchor = Rect::new(400.0, 300.0, 10.0, 20.0);
        let (at, _) = Anchored::default().place(anchor, Size::new(2000.0, 50.0), viewport());
        assert_eq!(at.left, 8.0);
    }

    #[test]
    fn neither_side_fits_picks_larger() {
        let tall = Size::new(50.0, 500.0);
        let low_anchor = Rect::new(300.0, 400.0, 10.0, 20.0);
        let (_, placement) = Anchored::default().place(low_anchor, tall, viewport());
        assert_eq!(placement, Placement::Above);
        let high_anchor = Rect::new(300.0, 100.0, 10.0, 20.0);
        let (_, placement) = Anchored::default().place(high_anchor, tall, viewport());
        assert_eq!(placement, Placement::Below);
    }
}
