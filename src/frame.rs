//! Frames: named groups of micro-indexes sharing one physical file.

use crate::codec::{
    BinaryRecord, TextCursor, TextRecord, check_text_field, read_u32, read_utf, write_field,
    write_utf,
};
use crate::error::{FrameError, Result};
use crate::micro_index::MicroIndex;
use bytes::{Buf, BufMut};
use rustc_hash::FxHashMap;
use std::hash::{Hash, Hasher};

/// A named group of micro-indexes stored in one file.
///
/// Every micro-index is keyed by its own `index_id`. Two frames are equal,
/// and hash alike, when their filenames match; the frame id does not take
/// part in the comparison.
#[derive(Debug, Clone)]
pub struct Frame {
    frame_id: u32,
    filename: String,
    indexes: FxHashMap<u32, MicroIndex>,
}

impl Frame {
    /// Create a frame owning `indexes`. A later micro-index replaces an
    /// earlier one with the same id.
    pub fn new(
        frame_id: u32,
        filename: impl Into<String>,
        indexes: impl IntoIterator<Item = MicroIndex>,
    ) -> Self {
        let mut frame = Self {
            frame_id,
            filename: filename.into(),
            indexes: FxHashMap::default(),
        };
        for index in indexes {
            frame.insert(index);
        }
        frame
    }

    /// Same id and filename as `other`, without its micro-indexes.
    pub fn empty_like(other: &Frame) -> Self {
        Self {
            frame_id: other.frame_id,
            filename: other.filename.clone(),
            indexes: FxHashMap::default(),
        }
    }

    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn set_frame_id(&mut self, frame_id: u32) {
        self.frame_id = frame_id;
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = filename.into();
    }

    /// Insert a micro-index under its own id, returning the one it replaced.
    pub fn insert(&mut self, index: MicroIndex) -> Option<MicroIndex> {
        self.indexes.insert(index.index_id, index)
    }

    /// Look up a micro-index. `None` is the normal answer for ids owned by
    /// another frame.
    pub fn index(&self, index_id: u32) -> Option<&MicroIndex> {
        self.indexes.get(&index_id)
    }

    /// All micro-indexes, in no particular order.
    pub fn indexes(&self) -> impl Iterator<Item = &MicroIndex> {
        self.indexes.values()
    }

    /// Micro-indexes ordered by id; the order used by both encodings.
    pub fn sorted_indexes(&self) -> Vec<&MicroIndex> {
        let mut sorted: Vec<&MicroIndex> = self.indexes.values().collect();
        sorted.sort_unstable_by_key(|index| index.index_id);
        sorted
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// One-line tab separated summary: tag, id, micro-index count, filename.
    pub fn summary(&self) -> String {
        format!(
            "MiFrame:\t{}\t{}\t{}",
            self.frame_id,
            self.indexes.len(),
            self.filename
        )
    }

    fn encoded_count(&self) -> Result<u32> {
        u32::try_from(self.indexes.len()).map_err(|_| {
            FrameError::InvalidInput(format!(
                "frame {} holds too many micro-indexes to encode",
                self.frame_id
            ))
        })
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.filename == other.filename
    }
}

impl Eq for Frame {}

impl Hash for Frame {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.filename.hash(state);
    }
}

impl BinaryRecord for Frame {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let count = self.encoded_count()?;
        buf.put_u32(self.frame_id);
        write_utf(buf, &self.filename)?;
        buf.put_u32(count);
        for index in self.sorted_indexes() {
            index.encode(buf)?;
        }
        Ok(())
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let frame_id = read_u32(buf, "frame id")?;
        let filename = read_utf(buf, "frame filename")?;
        let count = read_u32(buf, "frame micro-index count")?;

        let mut frame = Frame::new(frame_id, filename, std::iter::empty());
        for _ in 0..count {
            let index = MicroIndex::decode(buf)?;
            if frame.insert(index).is_some() {
                return Err(FrameError::MalformedIndexFile(format!(
                    "frame {} repeats a micro-index id",
                    frame_id
                )));
            }
        }
        Ok(frame)
    }
}

impl TextRecord for Frame {
    fn write_text(&self, out: &mut String) -> Result<()> {
        check_text_field("frame filename", &self.filename)?;
        write_field(out, self.frame_id);
        write_field(out, &self.filename);
        write_field(out, self.encoded_count()?);
        for index in self.sorted_indexes() {
            index.write_text(out)?;
        }
        Ok(())
    }

    fn read_text(cursor: &mut TextCursor<'_>) -> Result<Self> {
        let frame_id = cursor.parse_field("frame id")?;
        let filename = cursor.next_field("frame filename")?.to_string();
        let count: u32 = cursor.parse_field("frame micro-index count")?;

        let mut frame = Frame::new(frame_id, filename, std::iter::empty());
        for _ in 0..count {
            let index = MicroIndex::read_text(cursor)?;
            if frame.insert(index).is_some() {
                return Err(FrameError::MalformedIndexFile(format!(
                    "frame {} repeats a micro-index id",
                    frame_id
                )));
            }
        }
        Ok(frame)
    }
}
