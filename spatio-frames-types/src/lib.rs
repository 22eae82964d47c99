//! # spatio-frames-types
//!
//! Plain geometric types shared by the `spatio-frames` partition index.
//!
//! - **`BoundingBox2D`**: an axis-aligned rectangle over `geo::Rect` with the
//!   strict-overlap and corner-distance helpers used by frame placement
//! - **`Cell`**: one rectangle of a fixed spatial grid, tagged with its
//!   position in the grid array
//!
//! ## Examples
//!
//! ```rust
//! use spatio_frames_types::bbox::BoundingBox2D;
//! use spatio_frames_types::cell::Cell;
//!
//! let cell = Cell::new(0, BoundingBox2D::new(0.0, 0.0, 10.0, 10.0));
//! let probe = BoundingBox2D::new(5.0, 5.0, 6.0, 6.0);
//! assert!(cell.bbox.overlaps(&probe));
//! ```

pub mod bbox;
pub mod cell;

pub use bbox::BoundingBox2D;
pub use cell::Cell;
