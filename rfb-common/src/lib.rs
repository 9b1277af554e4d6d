//! Common types and utilities for RFB protocol implementation.
//!
//! This crate provides shared geometry used across the VNC client:
//! - [`Rect`] - Rectangle with wire-sized (u16) position and dimensions

/// A rectangle defined by top-left position and dimensions.
///
/// Coordinates use the RFB wire width (16-bit unsigned), so every rectangle
/// a server can describe is representable without conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the right edge (x + width), widened so it cannot overflow.
    pub const fn right(&self) -> u32 {
        self.x as u32 + self.width as u32
    }

    /// Get the bottom edge (y + height), widened so it cannot overflow.
    pub const fn bottom(&self) -> u32 {
        self.y as u32 + self.height as u32
    }

    /// Get the area of the rectangle in pixels.
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when the rectangle covers no pixels.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clip this rectangle to a `width` x `height` surface anchored at the origin.
    ///
    /// The left edge is clamped to the surface width, columns stop at the
    /// right surface edge and rows stop at the bottom surface edge. The result
    /// keeps the original top-left row offset so callers can index the source
    /// payload with `row - self.y`.
    pub fn clip_to(&self, width: u16, height: u16) -> Rect {
        let left = self.x.min(width);
        let right = self.right().min(width as u32) as u16;
        let top = self.y.min(height);
        let bottom = self.bottom().min(height as u32) as u16;
        Rect {
            x: left,
            y: top,
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        }
    }
}
