//! Placement policies: how grid cells are spread over frames.
//!
//! | Policy | Rule |
//! |---|---|
//! | `OneToOne` | cell `i` goes to frame `i`; needs one frame per cell |
//! | `RoundRobin` | cell `i` goes to frame `i mod frames` |
//! | `MaxDistance` | each cell joins the frame whose closest member is farthest away |
//! | `SpatialRoundRobin` | nearest-neighbour chain from cell 0, dealt one cell per frame |
//! | `SpatialBurst` | nearest-neighbour chain, dealt `burst_factor` cells per frame |

use super::distance::{max_distance_index, min_distance_cell, min_distance_to_members};
use crate::error::{FrameError, Result};
use serde::{Deserialize, Serialize};
use spatio_frames_types::Cell;

/// Policy identity without parameters, as stored in configs and artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PolicyKind {
    OneToOne = 0x00,
    #[default]
    RoundRobin = 0x01,
    MaxDistance = 0x02,
    SpatialRoundRobin = 0x03,
    SpatialBurst = 0x04,
}

impl PolicyKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(PolicyKind::OneToOne),
            0x01 => Some(PolicyKind::RoundRobin),
            0x02 => Some(PolicyKind::MaxDistance),
            0x03 => Some(PolicyKind::SpatialRoundRobin),
            0x04 => Some(PolicyKind::SpatialBurst),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::OneToOne => "one_to_one",
            PolicyKind::RoundRobin => "round_robin",
            PolicyKind::MaxDistance => "max_distance",
            PolicyKind::SpatialRoundRobin => "spatial_round_robin",
            PolicyKind::SpatialBurst => "spatial_burst",
        }
    }
}

/// A placement policy with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicy {
    OneToOne,
    #[default]
    RoundRobin,
    MaxDistance,
    SpatialRoundRobin,
    SpatialBurst { burst_factor: u32 },
}

impl PlacementPolicy {
    pub const DEFAULT_BURST_FACTOR: u32 = 3;

    /// Build a policy from its kind; `burst_factor` only matters for
    /// `SpatialBurst`.
    pub fn from_kind(kind: PolicyKind, burst_factor: u32) -> Self {
        match kind {
            PolicyKind::OneToOne => PlacementPolicy::OneToOne,
            PolicyKind::RoundRobin => PlacementPolicy::RoundRobin,
            PolicyKind::MaxDistance => PlacementPolicy::MaxDistance,
            PolicyKind::SpatialRoundRobin => PlacementPolicy::SpatialRoundRobin,
            PolicyKind::SpatialBurst => PlacementPolicy::SpatialBurst { burst_factor },
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            PlacementPolicy::OneToOne => PolicyKind::OneToOne,
            PlacementPolicy::RoundRobin => PolicyKind::RoundRobin,
            PlacementPolicy::MaxDistance => PolicyKind::MaxDistance,
            PlacementPolicy::SpatialRoundRobin => PolicyKind::SpatialRoundRobin,
            PlacementPolicy::SpatialBurst { .. } => PolicyKind::SpatialBurst,
        }
    }

    /// Burst factor carried by the policy, zero for policies without one.
    pub fn burst_factor(&self) -> u32 {
        match self {
            PlacementPolicy::SpatialBurst { burst_factor } => *burst_factor,
            _ => 0,
        }
    }

    /// Assign every cell of `grid` to a frame in `0..num_frames`.
    ///
    /// The returned table is indexed by cell position. Fails with
    /// `InvalidConfiguration` when the grid is empty or the frame count does
    /// not suit the policy; no partial table is ever returned.
    pub fn compute_placement(&self, grid: &[Cell], num_frames: u32) -> Result<Vec<u32>> {
        self.check_preconditions(grid.len(), num_frames)?;
        let frames = num_frames as usize;

        let table = match self {
            PlacementPolicy::OneToOne => (0..grid.len()).map(|i| i as u32).collect(),
            PlacementPolicy::RoundRobin => round_robin(grid.len(), frames),
            PlacementPolicy::MaxDistance => max_distance(grid, frames),
            PlacementPolicy::SpatialRoundRobin => chained(grid, frames, 1),
            PlacementPolicy::SpatialBurst { burst_factor } => {
                chained(grid, frames, *burst_factor as usize)
            }
        };

        log::debug!(
            "Placed {} cells into {} frames with {} policy",
            grid.len(),
            num_frames,
            self.kind().name()
        );

        Ok(table)
    }

    fn check_preconditions(&self, grid_len: usize, num_frames: u32) -> Result<()> {
        if grid_len == 0 {
            return Err(FrameError::InvalidConfiguration(
                "cannot place an empty grid".into(),
            ));
        }

        if num_frames == 0 {
            return Err(FrameError::InvalidConfiguration(
                "number of frames must be greater than zero".into(),
            ));
        }

        if u32::try_from(grid_len).is_err() {
            return Err(FrameError::InvalidConfiguration(format!(
                "grid of {} cells exceeds the addressable cell range",
                grid_len
            )));
        }

        match self {
            PlacementPolicy::OneToOne if num_frames as usize != grid_len => {
                Err(FrameError::InvalidConfiguration(format!(
                    "one-to-one placement needs exactly {} frames, got {}",
                    grid_len, num_frames
                )))
            }
            PlacementPolicy::SpatialBurst { burst_factor: 0 } => Err(
                FrameError::InvalidConfiguration("burst factor must be greater than zero".into()),
            ),
            _ if num_frames as usize > grid_len => Err(FrameError::InvalidConfiguration(format!(
                "{} frames requested for a grid of {} cells",
                num_frames, grid_len
            ))),
            _ => Ok(()),
        }
    }
}

fn round_robin(grid_len: usize, frames: usize) -> Vec<u32> {
    (0..grid_len).map(|i| (i % frames) as u32).collect()
}

/// Greedy dispersion: frames are seeded with the first `frames` cells, then
/// every remaining cell joins the frame whose nearest member is farthest.
fn max_distance(grid: &[Cell], frames: usize) -> Vec<u32> {
    let mut members: Vec<Vec<usize>> = (0..frames).map(|frame| vec![frame]).collect();
    let mut distances = vec![0.0; frames];

    for cell_id in frames..grid.len() {
        for (frame, cells) in members.iter().enumerate() {
            distances[frame] = min_distance_to_members(grid, cells, &grid[cell_id]);
        }
        let target = max_distance_index(&distances).unwrap_or(0);
        members[target].push(cell_id);
    }

    let mut table = vec![0u32; grid.len()];
    for (frame, cells) in members.iter().enumerate() {
        for &cell_id in cells {
            table[cell_id] = frame as u32;
        }
    }
    table
}

/// Nearest-neighbour chain starting at cell 0. The `p`-th cell of the chain
/// goes to frame `(p / run_length) mod frames`. Cells the chain cannot reach
/// are dealt round-robin afterwards, starting at the frame after the last
/// one used.
fn chained(grid: &[Cell], frames: usize, run_length: usize) -> Vec<u32> {
    let mut table = vec![0u32; grid.len()];
    let mut unassigned: Vec<Option<Cell>> = grid.iter().copied().map(Some).collect();

    unassigned[0] = None;
    let mut previous = 0;
    let mut position = 1;

    while let Some(next) = min_distance_cell(&grid[previous], &unassigned) {
        table[next] = ((position / run_length) % frames) as u32;
        unassigned[next] = None;
        previous = next;
        position += 1;
    }

    let mut frame = ((position - 1) / run_length + 1) % frames;
    for (cell_id, remaining) in unassigned.iter().enumerate() {
        if remaining.is_some() {
            log::debug!(
                "Cell {} is unreachable by the chain, dealing to frame {}",
                cell_id,
                frame
            );
            table[cell_id] = frame as u32;
            frame = (frame + 1) % frames;
        }
    }

    table
}
