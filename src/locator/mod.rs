//! Frame locator: computes and serves the `cell -> frame` placement.
//!
//! ```rust
//! use spatio_frames::{BoundingBox2D, Cell, FrameLocator, PlacementPolicy};
//!
//! let grid = Cell::uniform_grid(BoundingBox2D::new(0.0, 0.0, 4.0, 4.0), 4, 4);
//! let locator = FrameLocator::builder()
//!     .grid(grid)
//!     .num_frames(4)
//!     .policy(PlacementPolicy::SpatialBurst { burst_factor: 2 })
//!     .build()?;
//!
//! let key = locator
//!     .overlap_partitions(&BoundingBox2D::new(0.2, 0.2, 0.4, 0.4))
//!     .expect("inside the grid");
//! assert_eq!(key.index_id, 0);
//! # Ok::<(), spatio_frames::FrameError>(())
//! ```

pub mod artifact;
pub mod distance;
pub mod policy;

pub use artifact::{PublishedLocator, load_locator, publish_locator};
pub use policy::{PlacementPolicy, PolicyKind};

use crate::config::LocatorConfig;
use crate::error::{FrameError, Result};
use crate::frame_key::FrameKey;
use smallvec::SmallVec;
use spatio_frames_types::{BoundingBox2D, Cell};

/// A grid together with its computed placement table.
///
/// The placement is computed once at construction; the locator is read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLocator {
    grid: Vec<Cell>,
    placement: Vec<u32>,
    num_frames: u32,
    policy: PlacementPolicy,
}

impl FrameLocator {
    /// Copy `grid` and place its cells into `num_frames` frames.
    pub fn new(grid: &[Cell], num_frames: u32, policy: PlacementPolicy) -> Result<Self> {
        let placement = policy.compute_placement(grid, num_frames)?;
        Ok(Self {
            grid: grid.to_vec(),
            placement,
            num_frames,
            policy,
        })
    }

    pub fn from_config(grid: &[Cell], config: &LocatorConfig) -> Result<Self> {
        config.validate()?;
        Self::new(grid, config.frames_for(grid.len()), config.placement_policy())
    }

    pub fn builder() -> LocatorBuilder {
        LocatorBuilder::new()
    }

    /// Rebuild a locator from an already computed table, checking that the
    /// table covers every cell with an in-range frame.
    pub(crate) fn from_parts(
        grid: Vec<Cell>,
        placement: Vec<u32>,
        num_frames: u32,
        policy: PlacementPolicy,
    ) -> Result<Self> {
        if grid.is_empty() || num_frames == 0 {
            return Err(FrameError::MalformedIndexFile(
                "placement must cover at least one cell and one frame".into(),
            ));
        }
        if grid.len() != placement.len() {
            return Err(FrameError::MalformedIndexFile(format!(
                "placement covers {} cells, grid has {}",
                placement.len(),
                grid.len()
            )));
        }
        if let Some((cell, frame)) = placement
            .iter()
            .enumerate()
            .find(|&(_, &frame)| frame >= num_frames)
        {
            return Err(FrameError::MalformedIndexFile(format!(
                "cell {} placed in frame {} of {}",
                cell, frame, num_frames
            )));
        }

        Ok(Self {
            grid,
            placement,
            num_frames,
            policy,
        })
    }

    /// First cell strictly overlapping `bbox`, keyed by its frame.
    pub fn overlap_partitions(&self, bbox: &BoundingBox2D) -> Option<FrameKey> {
        self.grid
            .iter()
            .position(|cell| cell.bbox.overlaps(bbox))
            .map(|i| self.key_of(i))
    }

    /// Hand every cell strictly overlapping `bbox` to `collect`, in grid
    /// order. Returns the number of matches.
    pub fn overlap_partitions_with<F>(&self, bbox: &BoundingBox2D, mut collect: F) -> usize
    where
        F: FnMut(FrameKey),
    {
        let mut matches = 0;
        for (i, cell) in self.grid.iter().enumerate() {
            if cell.bbox.overlaps(bbox) {
                collect(self.key_of(i));
                matches += 1;
            }
        }
        matches
    }

    /// All cells strictly overlapping `bbox`.
    pub fn overlapping_keys(&self, bbox: &BoundingBox2D) -> SmallVec<[FrameKey; 4]> {
        let mut keys = SmallVec::new();
        self.overlap_partitions_with(bbox, |key| keys.push(key));
        keys
    }

    /// Copy of the cell at `cell_index`.
    pub fn partition(&self, cell_index: usize) -> Option<Cell> {
        self.grid.get(cell_index).copied()
    }

    /// Number of frames the grid was placed into.
    pub fn partition_count(&self) -> u32 {
        self.num_frames
    }

    pub fn grid(&self) -> &[Cell] {
        &self.grid
    }

    pub fn grid_len(&self) -> usize {
        self.grid.len()
    }

    /// The placement table, indexed by cell position.
    pub fn placement(&self) -> &[u32] {
        &self.placement
    }

    pub fn policy(&self) -> PlacementPolicy {
        self.policy
    }

    pub fn frame_of(&self, cell_index: usize) -> Option<u32> {
        self.placement.get(cell_index).copied()
    }

    /// Cell positions placed in `frame_id`, ascending.
    pub fn cells_of_frame(&self, frame_id: u32) -> Vec<usize> {
        self.placement
            .iter()
            .enumerate()
            .filter(|&(_, &frame)| frame == frame_id)
            .map(|(cell, _)| cell)
            .collect()
    }

    fn key_of(&self, cell_index: usize) -> FrameKey {
        FrameKey::new(self.placement[cell_index], cell_index as u32)
    }
}

/// Builder for [`FrameLocator`].
#[derive(Debug, Default)]
pub struct LocatorBuilder {
    grid: Vec<Cell>,
    num_frames: Option<u32>,
    policy: PlacementPolicy,
}

impl LocatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(mut self, grid: Vec<Cell>) -> Self {
        self.grid = grid;
        self
    }

    /// Frame count; defaults to one frame per cell.
    pub fn num_frames(mut self, num_frames: u32) -> Self {
        self.num_frames = Some(num_frames);
        self
    }

    pub fn policy(mut self, policy: PlacementPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<FrameLocator> {
        let num_frames = match self.num_frames {
            Some(n) => n,
            None => u32::try_from(self.grid.len()).map_err(|_| {
                FrameError::InvalidConfiguration(format!(
                    "grid of {} cells exceeds the addressable cell range",
                    self.grid.len()
                ))
            })?,
        };

        let placement = self.policy.compute_placement(&self.grid, num_frames)?;
        Ok(FrameLocator {
            grid: self.grid,
            placement,
            num_frames,
            policy: self.policy,
        })
    }
}
