//! Two-level spatial partition index: micro-indexes placed into frames, and
//! a flat global index for range, kNN and join queries.
//!
//! ```rust
//! use spatio_frames::{
//!     BoundingBox2D, Cell, DataRef, FrameLocator, GlobalIndex, LocatorConfig, MicroIndex,
//!     PolicyKind, assemble_frames,
//! };
//!
//! let grid = Cell::uniform_grid(BoundingBox2D::new(-180.0, -90.0, 180.0, 90.0), 6, 3);
//! let config = LocatorConfig::default()
//!     .with_policy(PolicyKind::SpatialRoundRobin)
//!     .with_num_frames(4);
//! let locator = FrameLocator::from_config(&grid, &config)?;
//!
//! let micro_indexes: Vec<MicroIndex> = grid
//!     .iter()
//!     .map(|cell| MicroIndex::new(cell.index, cell.bbox, DataRef::new(0, 0)))
//!     .collect();
//! let frames = assemble_frames(&locator, micro_indexes.clone(), &config)?;
//! assert_eq!(frames.len(), 4);
//!
//! let mut index = GlobalIndex::new();
//! index.bulk_load(&micro_indexes);
//! let nearest = index.knn(2.0, 48.8, 1)?;
//! assert_eq!(nearest[0].1, 0.0);
//! # Ok::<(), spatio_frames::FrameError>(())
//! ```

pub mod codec;
pub mod config;
pub mod discovery;
pub mod error;
#[cfg(feature = "geojson")]
pub mod export;
pub mod frame;
pub mod frame_key;
pub mod global_index;
pub mod locator;
pub mod micro_index;
pub mod partitioner;

pub use codec::{BinaryRecord, TextCursor, TextRecord};
pub use config::{Config, DiscoveryConfig, LocatorConfig};
pub use discovery::{Partition, discover_global_index};
pub use error::{FrameError, Result};
pub use frame::Frame;
pub use frame_key::FrameKey;
pub use global_index::{
    GlobalIndex, JoinKernel, PlaneSweepJoin, RTreeJoin, Shape, spatial_join,
};
pub use locator::{
    FrameLocator, LocatorBuilder, PlacementPolicy, PolicyKind, PublishedLocator, load_locator,
    publish_locator,
};
pub use micro_index::{DataRef, MicroIndex};
pub use partitioner::{FramePartitioner, RoutingMode, assemble_frames};

#[cfg(feature = "geojson")]
pub use export::{partitions_to_feature_collection, partitions_to_geojson};

pub use spatio_frames_types::{BoundingBox2D, Cell};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{FrameError, Result};

    pub use crate::{BoundingBox2D, Cell};

    pub use crate::{Config, LocatorConfig, PlacementPolicy, PolicyKind};

    pub use crate::{DataRef, Frame, FrameKey, FrameLocator, MicroIndex};

    pub use crate::{GlobalIndex, PlaneSweepJoin, Shape};

    pub use crate::{BinaryRecord, TextRecord};
}
