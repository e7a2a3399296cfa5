//! Integer 2D geometry: points, sizes and half-open rectangles.
//!
//! Coordinates follow the raster convention: `x` is the column, `y` is the
//! row, and canonical iteration order is row-major (`y` outer, `x` inner).

use std::fmt;

/// A cell position in global domain coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point2D {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Point2D {
    /// Create a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point2D) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// Translate by `(dx, dy)`.
    pub fn offset(&self, dx: i32, dy: i32) -> Point2D {
        Point2D::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Width and height of a rectangular region, in cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size2D {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl Size2D {
    /// Create a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of cells.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// `true` if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned rectangle: `origin` inclusive, `origin + size` exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Top-left corner (inclusive).
    pub origin: Point2D,
    /// Extent in cells.
    pub size: Size2D,
}

impl Rect {
    /// Create a rectangle from its origin and size.
    pub const fn new(origin: Point2D, size: Size2D) -> Self {
        Self { origin, size }
    }

    /// Rectangle anchored at `(0, 0)`.
    pub const fn from_size(size: Size2D) -> Self {
        Self {
            origin: Point2D::new(0, 0),
            size,
        }
    }

    /// Build from inclusive-min / exclusive-max corners.
    ///
    /// Returns `None` when the corners describe an empty rectangle.
    pub fn from_corners(min: Point2D, max_exclusive: Point2D) -> Option<Rect> {
        if max_exclusive.x <= min.x || max_exclusive.y <= min.y {
            return None;
        }
        Some(Rect::new(
            min,
            Size2D::new(
                (max_exclusive.x - min.x) as u32,
                (max_exclusive.y - min.y) as u32,
            ),
        ))
    }

    /// First column past the right edge.
    pub fn right(&self) -> i32 {
        self.origin.x + self.size.width as i32
    }

    /// First row past the bottom edge.
    pub fn bottom(&self) -> i32 {
        self.origin.y + self.size.height as i32
    }

    /// Number of cells.
    pub fn area(&self) -> usize {
        self.size.area()
    }

    /// `true` if the rectangle covers no cell.
    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Whether `p` lies inside.
    pub fn contains(&self, p: &Point2D) -> bool {
        p.x >= self.origin.x && p.x < self.right() && p.y >= self.origin.y && p.y < self.bottom()
    }

    /// Whether `other` lies entirely inside.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.is_empty()
            || (other.origin.x >= self.origin.x
                && other.origin.y >= self.origin.y
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    /// Overlap of two rectangles, or `None` if they are disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min = Point2D::new(
            self.origin.x.max(other.origin.x),
            self.origin.y.max(other.origin.y),
        );
        let max = Point2D::new(
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        );
        Rect::from_corners(min, max)
    }

    /// Grow by `margin` cells on every side.
    pub fn expand(&self, margin: u32) -> Rect {
        let m = margin as i32;
        Rect::new(
            self.origin.offset(-m, -m),
            Size2D::new(
                self.size.width + 2 * margin,
                self.size.height + 2 * margin,
            ),
        )
    }

    /// Row-major offset of `p` relative to the origin, if inside.
    pub fn local_index(&self, p: &Point2D) -> Option<usize> {
        if !self.contains(p) {
            return None;
        }
        let lx = (p.x - self.origin.x) as usize;
        let ly = (p.y - self.origin.y) as usize;
        Some(ly * self.size.width as usize + lx)
    }

    /// Inverse of [`local_index`](Self::local_index).
    pub fn point_at(&self, index: usize) -> Option<Point2D> {
        if index >= self.area() {
            return None;
        }
        let w = self.size.width as usize;
        Some(Point2D::new(
            self.origin.x + (index % w) as i32,
            self.origin.y + (index / w) as i32,
        ))
    }

    /// Iterate every cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Point2D> {
        let rect = *self;
        (rect.origin.y..rect.bottom())
            .flat_map(move |y| (rect.origin.x..rect.right()).map(move |x| Point2D::new(x, y)))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) x [{}, {})",
            self.origin.x,
            self.right(),
            self.origin.y,
            self.bottom()
        )
    }
}
