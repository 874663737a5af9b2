//! Integer screen geometry shared by the capture, selection and window modules.
//!
//! Coordinates are virtual-desktop pixels: the origin is the top-left of the
//! primary monitor, so monitors placed to the left or above have negative
//! coordinates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// An axis-aligned rectangle in screen coordinates.
///
/// Width and height are unsigned, so a rectangle can never be inverted. A
/// rectangle with zero area means "no selection".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds the rectangle spanned by two corners given in any order.
    ///
    /// The origin is the component-wise minimum of both points and the size is
    /// the absolute difference, so dragging in any direction yields the same
    /// rectangle.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: a.x.abs_diff(b.x),
            height: a.y.abs_diff(b.y),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Overlap of two rectangles, or `None` when they do not share any pixel.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= i64::from(left) || bottom <= i64::from(top) {
            return None;
        }

        Some(Rect {
            x: left,
            y: top,
            width: (right - i64::from(left)) as u32,
            height: (bottom - i64::from(top)) as u32,
        })
    }

    /// Moves the rectangle so that `origin` becomes (0, 0).
    pub const fn relative_to(&self, origin: Point) -> Rect {
        Rect {
            x: self.x - origin.x,
            y: self.y - origin.y,
            width: self.width,
            height: self.height,
        }
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect {
            x: left,
            y: top,
            width: (right - i64::from(left)) as u32,
            height: (bottom - i64::from(top)) as u32,
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Parses `X,Y,W,H` as used on the command line.
impl FromStr for Rect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("expected X,Y,WIDTH,HEIGHT but got '{s}'"));
        }

        let x = parts[0]
            .parse::<i32>()
            .map_err(|e| format!("invalid x '{}': {e}", parts[0]))?;
        let y = parts[1]
            .parse::<i32>()
            .map_err(|e| format!("invalid y '{}': {e}", parts[1]))?;
        let width = parts[2]
            .parse::<u32>()
            .map_err(|e| format!("invalid width '{}': {e}", parts[2]))?;
        let height = parts[3]
            .parse::<u32>()
            .map_err(|e| format!("invalid height '{}': {e}", parts[3]))?;

        Ok(Rect::new(x, y, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_normalizes_every_drag_direction() {
        let anchor = Point::new(100, 50);
        let expected = Rect::new(60, 20, 40, 30);

        let releases = [
            Point::new(60, 20), // up-left
            Point::new(140, 20),
            Point::new(60, 80),
            Point::new(140, 80),
        ];

        assert_eq!(Rect::from_corners(anchor, releases[0]), expected);
        assert_eq!(Rect::from_corners(anchor, releases[1]), Rect::new(100, 20, 40, 30));
        assert_eq!(Rect::from_corners(anchor, releases[2]), Rect::new(60, 50, 40, 30));
        assert_eq!(Rect::from_corners(anchor, releases[3]), Rect::new(100, 50, 40, 30));
    }

    #[test]
    fn from_corners_handles_negative_coordinates() {
        let rect = Rect::from_corners(Point::new(-1920, -10), Point::new(-1800, 90));
        assert_eq!(rect, Rect::new(-1920, -10, 120, 100));
    }

    #[test]
    fn zero_width_or_height_is_empty() {
        assert!(Rect::new(5, 5, 0, 10).is_empty());
        assert!(Rect::new(5, 5, 10, 0).is_empty());
        assert!(!Rect::new(5, 5, 1, 1).is_empty());
    }

    #[test]
    fn intersect_clamps_to_overlap() {
        let screen = Rect::new(0, 0, 1920, 1080);
        let partial = Rect::new(1800, 1000, 300, 300);
        assert_eq!(
            screen.intersect(&partial),
            Some(Rect::new(1800, 1000, 120, 80))
        );
    }

    #[test]
    fn intersect_of_disjoint_rects_is_none() {
        let screen = Rect::new(0, 0, 100, 100);
        assert_eq!(screen.intersect(&Rect::new(100, 0, 10, 10)), None);
        assert_eq!(screen.intersect(&Rect::new(-20, -20, 10, 10)), None);
    }

    #[test]
    fn union_spans_both_monitors() {
        let primary = Rect::new(0, 0, 1920, 1080);
        let left = Rect::new(-1280, 100, 1280, 1024);
        assert_eq!(primary.union(&left), Rect::new(-1280, 0, 3200, 1124));
    }

    #[test]
    fn parse_rect_from_cli_text() {
        assert_eq!("10, 20,30,40".parse::<Rect>(), Ok(Rect::new(10, 20, 30, 40)));
        assert!("10,20,30".parse::<Rect>().is_err());
        assert!("10,20,-3,40".parse::<Rect>().is_err());
    }
}
