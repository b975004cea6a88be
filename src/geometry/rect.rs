//! Integer screen geometry.
//!
//! Rectangles are half-open: `right` and `bottom` are exclusive, so a
//! `Rect` is empty as soon as either extent collapses to zero.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Axis-aligned rectangle with exclusive right/bottom edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle anchored at the origin.
    pub const fn sized(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    #[inline]
    pub fn area(&self) -> i32 {
        self.width() * self.height()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// True if `other` lies completely inside `self`.
    #[inline]
    pub fn contains(&self, other: &Rect) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }

    #[inline]
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    /// Grow `self` to the bounding box of both rectangles.
    pub fn extend(&mut self, other: &Rect) {
        self.left = self.left.min(other.left);
        self.top = self.top.min(other.top);
        self.right = self.right.max(other.right);
        self.bottom = self.bottom.max(other.bottom);
    }

    /// Intersect in place. A disjoint clip leaves an empty (but not
    /// necessarily zero) rectangle, same as the legacy renderer.
    pub fn clip(&mut self, other: &Rect) {
        self.left = self.left.max(other.left);
        self.top = self.top.max(other.top);
        self.right = self.right.min(other.right).max(self.left);
        self.bottom = self.bottom.min(other.bottom).max(self.top);
    }

    /// Intersection; empty zero rectangle when the two do not meet.
    pub fn intersection(&self, other: &Rect) -> Rect {
        if !self.intersects(other) {
            return Rect::default();
        }
        Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        )
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.left += dx;
        self.right += dx;
        self.top += dy;
        self.bottom += dy;
    }

    pub fn translated(mut self, dx: i32, dy: i32) -> Rect {
        self.translate(dx, dy);
        self
    }

    pub fn move_to(&mut self, x: i32, y: i32) {
        let (w, h) = (self.width(), self.height());
        *self = Rect::new(x, y, x + w, y + h);
    }
}

/// Exact rational used for coordinate-system conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    pub num: i32,
    pub den: i32,
}

impl Default for Ratio {
    fn default() -> Self {
        Self::ONE
    }
}

impl Ratio {
    pub const ONE: Ratio = Ratio { num: 1, den: 1 };

    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    #[inline]
    pub fn is_one(&self) -> bool {
        self.num == self.den
    }

    /// `value * ratio`, truncated toward zero.
    #[inline]
    pub fn apply(&self, value: i32) -> i32 {
        ((value as i64 * self.num as i64) / self.den as i64) as i32
    }

    /// Inverse mapping, used to go from screen back to script space.
    #[inline]
    pub fn invert(&self, value: i32) -> i32 {
        ((value as i64 * self.den as i64) / self.num as i64) as i32
    }

    pub fn mul(&self, other: Ratio) -> Ratio {
        Ratio::new(self.num * other.num, self.den * other.den)
    }
}

/// Multiply and round up any remainder.
pub fn mulru(value: i32, ratio: Ratio) -> i32 {
    let scaled = value as i64 * ratio.num as i64;
    let mut out = (scaled / ratio.den as i64) as i32;
    if scaled % ratio.den as i64 != 0 {
        out += 1;
    }
    out
}

/// Scale a rectangle, rounding up. The last included pixel is scaled and
/// `extra` added back, which is how plane rectangles grow to screen size.
pub fn mulru_rect(rect: &mut Rect, rx: Ratio, ry: Ratio, extra: i32) {
    rect.left = mulru(rect.left, rx);
    rect.top = mulru(rect.top, ry);
    rect.right = mulru(rect.right - 1, rx) + extra;
    rect.bottom = mulru(rect.bottom - 1, ry) + extra;
}

/// Scale a rectangle, truncating. Inclusive edges are scaled then re-opened.
pub fn mulinc(rect: &mut Rect, rx: Ratio, ry: Ratio) {
    rect.left = rx.apply(rect.left);
    rect.top = ry.apply(rect.top);
    rect.right = rx.apply(rect.right - 1) + 1;
    rect.bottom = ry.apply(rect.bottom - 1) + 1;
}
