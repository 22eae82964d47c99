//! Routing of frame keys to execution partitions, and assembly of frames
//! from a computed placement.

use crate::config::LocatorConfig;
use crate::error::{FrameError, Result};
use crate::frame::Frame;
use crate::frame_key::FrameKey;
use crate::locator::FrameLocator;
use crate::micro_index::MicroIndex;
use serde::{Deserialize, Serialize};

/// What to do with a frame id that has no matching partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Out-of-range frame ids are rejected.
    #[default]
    Strict,
    /// Frame ids are reduced modulo the partition count.
    Modulo,
}

/// Sends every key of a frame to the same partition.
///
/// The destination is the key's `frame_id`; the `index_id` never takes part,
/// so all micro-indexes of one frame are processed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePartitioner {
    num_partitions: usize,
    mode: RoutingMode,
}

impl FramePartitioner {
    pub fn new(num_partitions: usize) -> Result<Self> {
        if num_partitions == 0 {
            return Err(FrameError::InvalidConfiguration(
                "partitioner needs at least one partition".into(),
            ));
        }
        Ok(Self {
            num_partitions,
            mode: RoutingMode::default(),
        })
    }

    /// One partition per frame of `locator`.
    pub fn for_locator(locator: &FrameLocator) -> Self {
        Self {
            num_partitions: locator.partition_count() as usize,
            mode: RoutingMode::Strict,
        }
    }

    pub fn with_mode(mut self, mode: RoutingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    pub fn partition_for(&self, key: &FrameKey) -> Result<usize> {
        let frame = key.frame_id as usize;
        match self.mode {
            RoutingMode::Modulo => Ok(frame % self.num_partitions),
            RoutingMode::Strict if frame < self.num_partitions => Ok(frame),
            RoutingMode::Strict => Err(FrameError::InvalidInput(format!(
                "key {} routes to partition {} of {}",
                key, frame, self.num_partitions
            ))),
        }
    }

    /// Bucket `keys` by partition. Keys inside a bucket are grouped by frame
    /// and keep their relative input order within a frame.
    pub fn route<I>(&self, keys: I) -> Result<Vec<Vec<FrameKey>>>
    where
        I: IntoIterator<Item = FrameKey>,
    {
        let mut buckets = vec![Vec::new(); self.num_partitions];
        for key in keys {
            let partition = self.partition_for(&key)?;
            buckets[partition].push(key);
        }
        for bucket in &mut buckets {
            bucket.sort_by(FrameKey::cmp_frame);
        }
        Ok(buckets)
    }
}

/// Group `micro_indexes` into the frames their cells were placed in.
///
/// Returns one frame per frame id of the locator, in id order, named with
/// [`LocatorConfig::frame_filename`]. A micro-index whose id is not a cell
/// of the locator's grid is rejected.
pub fn assemble_frames<I>(
    locator: &FrameLocator,
    micro_indexes: I,
    config: &LocatorConfig,
) -> Result<Vec<Frame>>
where
    I: IntoIterator<Item = MicroIndex>,
{
    let mut frames: Vec<Frame> = (0..locator.partition_count())
        .map(|id| Frame::new(id, config.frame_filename(id), std::iter::empty()))
        .collect();

    for index in micro_indexes {
        let frame_id = locator.frame_of(index.index_id as usize).ok_or_else(|| {
            FrameError::InvalidInput(format!(
                "micro-index {} has no cell in a grid of {}",
                index.index_id,
                locator.grid_len()
            ))
        })?;

        if let Some(previous) = frames[frame_id as usize].insert(index) {
            log::warn!(
                "Micro-index {} was supplied twice, keeping the later one",
                previous.index_id
            );
        }
    }

    Ok(frames)
}
