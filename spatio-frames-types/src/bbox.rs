use geo::{Distance, Euclidean, Point, Rect};
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned bounding box.
///
/// Represents a rectangular area defined by minimum and maximum coordinates.
/// This is a wrapper around `geo::Rect` with the overlap and distance
/// operations that partition placement and the global index rely on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2D {
    /// The underlying geometric rectangle
    pub rect: Rect,
}

impl BoundingBox2D {
    /// Create a new bounding box from minimum and maximum coordinates.
    ///
    /// # Arguments
    ///
    /// * `min_x` - Minimum x coordinate
    /// * `min_y` - Minimum y coordinate
    /// * `max_x` - Maximum x coordinate
    /// * `max_y` - Maximum y coordinate
    ///
    /// # Examples
    ///
    /// ```
    /// use spatio_frames_types::bbox::BoundingBox2D;
    ///
    /// let bbox = BoundingBox2D::new(-74.0, 40.7, -73.9, 40.8);
    /// assert_eq!(bbox.min_x(), -74.0);
    /// ```
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            rect: Rect::new(
                geo::coord! { x: min_x, y: min_y },
                geo::coord! { x: max_x, y: max_y },
            ),
        }
    }

    /// Create a degenerate bounding box covering a single point.
    pub fn from_point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// Get the minimum x coordinate.
    pub fn min_x(&self) -> f64 {
        self.rect.min().x
    }

    /// Get the minimum y coordinate.
    pub fn min_y(&self) -> f64 {
        self.rect.min().y
    }

    /// Get the maximum x coordinate.
    pub fn max_x(&self) -> f64 {
        self.rect.max().x
    }

    /// Get the maximum y coordinate.
    pub fn max_y(&self) -> f64 {
        self.rect.max().y
    }

    /// Get the width of the bounding box.
    pub fn width(&self) -> f64 {
        self.max_x() - self.min_x()
    }

    /// Get the height of the bounding box.
    pub fn height(&self) -> f64 {
        self.max_y() - self.min_y()
    }

    /// Get the area of the bounding box.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// The four corners, counter-clockwise from `(min_x, min_y)`.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x(), self.min_y()),
            Point::new(self.max_x(), self.min_y()),
            Point::new(self.max_x(), self.max_y()),
            Point::new(self.min_x(), self.max_y()),
        ]
    }

    /// Strict overlap test.
    ///
    /// Both boxes must share interior area along each axis: boxes that only
    /// touch along an edge or at a corner do not overlap.
    ///
    /// ```
    /// use spatio_frames_types::bbox::BoundingBox2D;
    ///
    /// let a = BoundingBox2D::new(0.0, 0.0, 10.0, 10.0);
    /// let corner = BoundingBox2D::new(10.0, 10.0, 20.0, 20.0);
    /// assert!(!a.overlaps(&corner));
    /// ```
    pub fn overlaps(&self, other: &BoundingBox2D) -> bool {
        self.max_x() > other.min_x()
            && other.max_x() > self.min_x()
            && self.max_y() > other.min_y()
            && other.max_y() > self.min_y()
    }

    /// Minimum Euclidean distance from this box to a point, zero when the
    /// point lies inside.
    pub fn distance_to_point(&self, x: f64, y: f64) -> f64 {
        let dx = if x < self.min_x() {
            self.min_x() - x
        } else if x > self.max_x() {
            x - self.max_x()
        } else {
            0.0
        };
        let dy = if y < self.min_y() {
            self.min_y() - y
        } else if y > self.max_y() {
            y - self.max_y()
        } else {
            0.0
        };
        dx.hypot(dy)
    }

    /// Smallest corner-to-corner distance between two boxes.
    ///
    /// Compares every corner of `self` with every corner of `other`. This is
    /// an approximation of the true box-to-box distance (overlapping boxes are
    /// not necessarily at distance zero) and is symmetric. NaN when either
    /// box has a NaN coordinate.
    ///
    /// Measuring from the corners of one box to the area of the other would
    /// be closer to the true distance but depends on argument order. On
    /// uniform grids both give the same placements; on grids of unequal
    /// cells the corner pairs can pick a different nearest cell.
    pub fn corner_distance(&self, other: &BoundingBox2D) -> f64 {
        if self.has_nan() || other.has_nan() {
            return f64::NAN;
        }

        let mut min_distance = f64::MAX;
        for a in self.corners() {
            for b in other.corners() {
                let dist = Euclidean.distance(a, b);
                if dist < min_distance {
                    min_distance = dist;
                }
            }
        }
        min_distance
    }

    /// Smallest box enclosing both `self` and `other`.
    pub fn union(&self, other: &BoundingBox2D) -> Self {
        Self::new(
            self.min_x().min(other.min_x()),
            self.min_y().min(other.min_y()),
            self.max_x().max(other.max_x()),
            self.max_y().max(other.max_y()),
        )
    }

    /// Square window of half-side `half_extent` centred on `(x, y)`.
    pub fn around(x: f64, y: f64, half_extent: f64) -> Self {
        Self::new(
            x - half_extent,
            y - half_extent,
            x + half_extent,
            y + half_extent,
        )
    }

    /// True when any coordinate is NaN.
    pub fn has_nan(&self) -> bool {
        [self.min_x(), self.min_y(), self.max_x(), self.max_y()]
            .iter()
            .any(|v| v.is_nan())
    }

    /// True when every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        [self.min_x(), self.min_y(), self.max_x(), self.max_y()]
            .iter()
            .all(|v| v.is_finite())
    }
}
