use crate::micro_index::MicroIndex;
use spatio_frames_types::{BoundingBox2D, Cell};

/// Anything the global index can store and query.
///
/// Only the bounding rectangle is required; intersection uses the strict
/// overlap predicate and distance is measured from a point to the rectangle.
pub trait Shape {
    fn mbr(&self) -> BoundingBox2D;

    fn intersects(&self, query: &BoundingBox2D) -> bool {
        self.mbr().overlaps(query)
    }

    /// Euclidean distance from `(x, y)` to the shape, zero inside it.
    fn distance_to(&self, x: f64, y: f64) -> f64 {
        self.mbr().distance_to_point(x, y)
    }
}

impl Shape for BoundingBox2D {
    fn mbr(&self) -> BoundingBox2D {
        *self
    }
}

impl Shape for Cell {
    fn mbr(&self) -> BoundingBox2D {
        self.bbox
    }
}

impl Shape for MicroIndex {
    fn mbr(&self) -> BoundingBox2D {
        self.bbox
    }
}

impl<S: Shape + ?Sized> Shape for &S {
    fn mbr(&self) -> BoundingBox2D {
        (**self).mbr()
    }

    fn intersects(&self, query: &BoundingBox2D) -> bool {
        (**self).intersects(query)
    }

    fn distance_to(&self, x: f64, y: f64) -> f64 {
        (**self).distance_to(x, y)
    }
}
