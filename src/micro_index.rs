//! Micro-index records: the fine-grained spatial partitions grouped into frames.

use crate::codec::{BinaryRecord, TextCursor, TextRecord, read_f64, read_u32, read_u64, write_field};
use crate::error::{FrameError, Result};
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use spatio_frames_types::BoundingBox2D;

/// Byte range of a micro-index's records inside its frame's file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DataRef {
    pub offset: u64,
    pub length: u64,
}

impl DataRef {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// First byte past the end of the range.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

/// A single spatial partition: identity, extent and data location.
///
/// `index_id` is stable within the owning frame and is the index of the grid
/// cell the partition was built for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroIndex {
    pub index_id: u32,
    pub bbox: BoundingBox2D,
    pub location: DataRef,
}

impl MicroIndex {
    pub fn new(index_id: u32, bbox: BoundingBox2D, location: DataRef) -> Self {
        Self {
            index_id,
            bbox,
            location,
        }
    }

    pub fn index_id(&self) -> u32 {
        self.index_id
    }

    pub fn bbox(&self) -> &BoundingBox2D {
        &self.bbox
    }
}

impl BinaryRecord for MicroIndex {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        buf.put_u32(self.index_id);
        buf.put_f64(self.bbox.min_x());
        buf.put_f64(self.bbox.min_y());
        buf.put_f64(self.bbox.max_x());
        buf.put_f64(self.bbox.max_y());
        buf.put_u64(self.location.offset);
        buf.put_u64(self.location.length);
        Ok(())
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let index_id = read_u32(buf, "micro-index id")?;
        let x1 = read_f64(buf, "micro-index x1")?;
        let y1 = read_f64(buf, "micro-index y1")?;
        let x2 = read_f64(buf, "micro-index x2")?;
        let y2 = read_f64(buf, "micro-index y2")?;
        let offset = read_u64(buf, "micro-index offset")?;
        let length = read_u64(buf, "micro-index length")?;

        Ok(MicroIndex::new(
            index_id,
            BoundingBox2D::new(x1, y1, x2, y2),
            DataRef::new(offset, length),
        ))
    }
}

impl TextRecord for MicroIndex {
    fn write_text(&self, out: &mut String) -> Result<()> {
        write_field(out, self.index_id);
        write_field(out, self.bbox.min_x());
        write_field(out, self.bbox.min_y());
        write_field(out, self.bbox.max_x());
        write_field(out, self.bbox.max_y());
        write_field(out, self.location.offset);
        write_field(out, self.location.length);
        Ok(())
    }

    fn read_text(cursor: &mut TextCursor<'_>) -> Result<Self> {
        let index_id = cursor.parse_field("micro-index id")?;
        let x1: f64 = cursor.parse_field("micro-index x1")?;
        let y1: f64 = cursor.parse_field("micro-index y1")?;
        let x2: f64 = cursor.parse_field("micro-index x2")?;
        let y2: f64 = cursor.parse_field("micro-index y2")?;
        let offset = cursor.parse_field("micro-index offset")?;
        let length = cursor.parse_field("micro-index length")?;

        if [x1, y1, x2, y2].iter().any(|v| v.is_nan()) {
            return Err(FrameError::MalformedIndexFile(format!(
                "micro-index {} has a NaN coordinate",
                index_id
            )));
        }

        Ok(MicroIndex::new(
            index_id,
            BoundingBox2D::new(x1, y1, x2, y2),
            DataRef::new(offset, length),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MicroIndex {
        MicroIndex::new(
            42,
            BoundingBox2D::new(-74.25, 40.5, -73.7, 40.9),
            DataRef::new(4096, 1024),
        )
    }

    #[test]
    fn test_binary_layout_size() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(bytes.len(), 4 + 4 * 8 + 8 + 8);
        assert_eq!(&bytes[..4], &42u32.to_be_bytes());
    }

    #[test]
    fn test_binary_truncated() {
        let bytes = sample().to_bytes().unwrap();
        let err = MicroIndex::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, FrameError::MalformedIndexFile(_)));
    }

    #[test]
    fn test_text_form() {
        let text = sample().to_text().unwrap();
        assert_eq!(text, ",42,-74.25,40.5,-73.7,40.9,4096,1024");
        assert_eq!(MicroIndex::from_text(&text).unwrap(), sample());
    }

    #[test]
    fn test_text_rejects_nan() {
        assert!(MicroIndex::from_text(",1,NaN,0,1,1,0,0").is_err());
    }

    #[test]
    fn test_data_ref_end() {
        assert_eq!(DataRef::new(10, 5).end(), 15);
        assert_eq!(DataRef::new(u64::MAX, 5).end(), u64::MAX);
    }
}
