#![forbid(unsafe_code)]

//! Geometric primitives in floating-point pixels.
//!
//! Scene coordinates are viewport-relative with the origin at top-left, the
//! same space a bounding client rect lives in.

use std::ops::{Add, Sub};

/// A 2D displacement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl Offset {
    pub const ZERO: Self = Self { dx: 0.0, dy: 0.0 };

    #[inline]
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Linear interpolation; `t` is not clamped so overshooting eases carry through.
    #[inline]
    #[must_use]
    pub fn lerp(self, to: Self, t: f64) -> Self {
        Self {
            dx: self.dx + (to.dx - self.dx) * t,
            dy: self.dy + (to.dy - self.dy) * t,
        }
    }
}

impl Add for Offset {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.dx + rhs.dx, self.dy + rhs.dy)
    }
}

impl Sub for Offset {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.dx - rhs.dx, self.dy - rhs.dy)
    }
}

/// Edge insets, e.g. an element's computed padding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Insets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Insets {
    #[inline]
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    #[inline]
    pub const fn uniform(v: f64) -> Self {
        Self::new(v, v, v, v)
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Displacement that moves this rect's top-left corner onto `point`.
    #[inline]
    #[must_use]
    pub fn offset_to(&self, point: (f64, f64)) -> Offset {
        Offset::new(point.0 - self.x, point.1 - self.y)
    }

    /// Top-left corner of the content box once `padding` is removed.
    #[inline]
    #[must_use]
    pub fn content_origin(&self, padding: Insets) -> (f64, f64) {
        (self.x + padding.left, self.y + padding.top)
    }

    #[inline]
    #[must_use]
    pub fn translate(&self, by: Offset) -> Self {
        Self::new(self.x + by.dx, self.y + by.dy, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_to_padded_origin() {
        let ghost = Rect::new(10.0, 100.0, 200.0, 50.0);
        let crumb = Rect::new(40.0, 8.0, 120.0, 32.0);
        let delta = ghost.offset_to(crumb.content_origin(Insets::uniform(8.0)));
        assert_eq!(delta, Offset::new(38.0, -84.0));
    }

    #[test]
    fn lerp_extrapolates() {
        let a = Offset::ZERO;
        let b = Offset::new(10.0, -10.0);
        assert_eq!(a.lerp(b, 0.5), Offset::new(5.0, -5.0));
        assert_eq!(a.lerp(b, 1.5), Offset::new(15.0, -15.0));
    }

    #[test]
    fn empty_rects() {
        assert!(Rect::default().is_empty());
        assert!(!Rect::new(0.0, 0.0, 1.0, 1.0).is_empty());
        assert_eq!(Rect::new(1.0, 2.0, 3.0, 4.0).right(), 4.0);
        assert_eq!(Rect::new(1.0, 2.0, 3.0, 4.0).bottom(), 6.0);
    }
}
