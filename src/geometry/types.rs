use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height of either a layout box or a camera texture
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when both dimensions are finite and strictly positive
    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width as f64, height as f64)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A point or displacement
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl Offset {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

/// Axis-aligned rectangle.
///
/// The same type is used for widget-space rectangles (layout units) and for
/// texture-space percentage rectangles (fractions of the texture size).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    /// The whole texture, as a percentage rectangle
    pub const FULL: Rect = Rect {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    pub fn from_ltrb(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_ltwh(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::from_ltrb(left, top, left + width, top + height)
    }

    /// Rectangle covering a box of `size` anchored at the origin
    pub fn from_size(size: Size) -> Self {
        Self::from_ltwh(0.0, 0.0, size.width, size.height)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Ordered and finite; a zero-area rectangle is still valid
    pub fn is_valid(&self) -> bool {
        [self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite())
            && self.left <= self.right
            && self.top <= self.bottom
    }

    /// Zero area rectangles never produce detections
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Equality of the underlying bit patterns of all four edges
    pub fn bitwise_eq(&self, other: &Rect) -> bool {
        self.left.to_bits() == other.left.to_bits()
            && self.top.to_bits() == other.top.to_bits()
            && self.right.to_bits() == other.right.to_bits()
            && self.bottom.to_bits() == other.bottom.to_bits()
    }

    /// Clamp every edge into `[0, 1]`
    pub fn clamp_unit(&self) -> Rect {
        Rect::from_ltrb(
            self.left.clamp(0.0, 1.0),
            self.top.clamp(0.0, 1.0),
            self.right.clamp(0.0, 1.0),
            self.bottom.clamp(0.0, 1.0),
        )
    }
}

impl From<[f64; 4]> for Rect {
    fn from([left, top, right, bottom]: [f64; 4]) -> Self {
        Self::from_ltrb(left, top, right, bottom)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}, {:.4}, {:.4}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}
