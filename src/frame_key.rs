//! Composite `(frame, micro-index)` keys.

use crate::codec::{BinaryRecord, read_u32};
use crate::error::Result;
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Routes a matched partition to the frame that owns it.
///
/// Ordered by `frame_id`, then `index_id`. The binary form is two big-endian
/// `u32` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameKey {
    pub frame_id: u32,
    pub index_id: u32,
}

impl FrameKey {
    pub const ENCODED_LEN: usize = 8;

    pub fn new(frame_id: u32, index_id: u32) -> Self {
        Self { frame_id, index_id }
    }

    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    pub fn index_id(&self) -> u32 {
        self.index_id
    }

    /// Compare by frame only, so that all keys of a frame group together.
    pub fn cmp_frame(&self, other: &FrameKey) -> Ordering {
        self.frame_id.cmp(&other.frame_id)
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.frame_id, self.index_id)
    }
}

impl BinaryRecord for FrameKey {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        buf.put_u32(self.frame_id);
        buf.put_u32(self.index_id);
        Ok(())
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let frame_id = read_u32(buf, "frame key frame id")?;
        let index_id = read_u32(buf, "frame key index id")?;
        Ok(FrameKey::new(frame_id, index_id))
    }
}
