//! Placement artifact: the binary form of a [`FrameLocator`] and the side
//! file it is published to, so that workers rebuild the exact same table
//! without recomputing it.
//!
//! Layout (big-endian):
//!
//! ```text
//! magic "MIFL" | version u8 | policy tag u8 | burst u32 | frames u32 | cells u32
//! cells x (min_x f64 | min_y f64 | max_x f64 | max_y f64 | frame u32)
//! ```

use super::{FrameLocator, PlacementPolicy, PolicyKind};
use crate::codec::{BinaryRecord, read_f64, read_u8, read_u32};
use crate::error::{FrameError, Result};
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use spatio_frames_types::{BoundingBox2D, Cell};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"MIFL";
const VERSION: u8 = 1;
const CELL_RECORD_LEN: usize = 4 * 8 + 4;
const SIDE_FILE_RANGE: u128 = 1_000_000;
const MAX_PUBLISH_ATTEMPTS: usize = 64;

/// Reference to a published placement, as handed to workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedLocator {
    pub policy: PolicyKind,
    /// Side file name, relative to the publish directory
    pub file: String,
}

impl PublishedLocator {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl BinaryRecord for FrameLocator {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let cells = u32::try_from(self.grid.len()).map_err(|_| {
            FrameError::InvalidInput(format!("{} cells cannot be encoded", self.grid.len()))
        })?;

        buf.put_slice(MAGIC);
        buf.put_u8(VERSION);
        buf.put_u8(self.policy.kind().tag());
        buf.put_u32(self.policy.burst_factor());
        buf.put_u32(self.num_frames);
        buf.put_u32(cells);

        for (cell, &frame) in self.grid.iter().zip(&self.placement) {
            buf.put_f64(cell.bbox.min_x());
            buf.put_f64(cell.bbox.min_y());
            buf.put_f64(cell.bbox.max_x());
            buf.put_f64(cell.bbox.max_y());
            buf.put_u32(frame);
        }
        Ok(())
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < MAGIC.len() {
            return Err(FrameError::truncated("placement header", MAGIC.len(), buf.remaining()));
        }
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(FrameError::MalformedIndexFile(
                "not a placement artifact".into(),
            ));
        }

        let version = read_u8(buf, "placement version")?;
        if version != VERSION {
            return Err(FrameError::MalformedIndexFile(format!(
                "unsupported placement version {}",
                version
            )));
        }

        let tag = read_u8(buf, "policy tag")?;
        let kind = PolicyKind::from_tag(tag).ok_or_else(|| {
            FrameError::MalformedIndexFile(format!("unknown policy tag {:#04x}", tag))
        })?;
        let burst_factor = read_u32(buf, "burst factor")?;
        let num_frames = read_u32(buf, "frame count")?;
        let cells = read_u32(buf, "cell count")? as usize;

        // Refuse counts the remaining bytes cannot possibly hold.
        let needed = cells.saturating_mul(CELL_RECORD_LEN);
        if buf.remaining() < needed {
            return Err(FrameError::truncated("placement cells", needed, buf.remaining()));
        }

        let mut grid = Vec::with_capacity(cells);
        let mut placement = Vec::with_capacity(cells);
        for index in 0..cells {
            let min_x = read_f64(buf, "cell min_x")?;
            let min_y = read_f64(buf, "cell min_y")?;
            let max_x = read_f64(buf, "cell max_x")?;
            let max_y = read_f64(buf, "cell max_y")?;
            grid.push(Cell::new(
                index as u32,
                BoundingBox2D::new(min_x, min_y, max_x, max_y),
            ));
            placement.push(read_u32(buf, "cell frame")?);
        }

        FrameLocator::from_parts(
            grid,
            placement,
            num_frames,
            PlacementPolicy::from_kind(kind, burst_factor),
        )
    }
}

/// Write `locator` to a fresh `cells_<n>.partitions` file under `dir`.
///
/// `n` is drawn at random; names already taken are retried.
pub fn publish_locator(locator: &FrameLocator, dir: impl AsRef<Path>) -> Result<PublishedLocator> {
    let dir = dir.as_ref();
    let bytes = locator.to_bytes()?;

    for _ in 0..MAX_PUBLISH_ATTEMPTS {
        let n = uuid::Uuid::new_v4().as_u128() % SIDE_FILE_RANGE;
        let name = format!("cells_{}.partitions", n);
        let path = dir.join(&name);

        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                log::debug!("Side file {} already exists, retrying", path.display());
                continue;
            }
            Err(err) => return Err(FrameError::storage(path, err)),
        };

        write_side_file(file, &bytes).map_err(|err| FrameError::storage(&path, err))?;
        log::debug!(
            "Published {} placement of {} cells to {}",
            locator.policy().kind().name(),
            locator.grid_len(),
            path.display()
        );

        return Ok(PublishedLocator {
            policy: locator.policy().kind(),
            file: name,
        });
    }

    Err(FrameError::storage(
        dir,
        std::io::Error::new(
            ErrorKind::AlreadyExists,
            "no free side file name after repeated attempts",
        ),
    ))
}

fn write_side_file(file: File, bytes: &[u8]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

/// Rebuild the locator published as `published` under `dir`.
pub fn load_locator(dir: impl AsRef<Path>, published: &PublishedLocator) -> Result<FrameLocator> {
    let path = dir.as_ref().join(&published.file);
    let bytes = std::fs::read(&path).map_err(|err| FrameError::storage(&path, err))?;
    let locator = FrameLocator::from_bytes(&bytes)?;

    if locator.policy().kind() != published.policy {
        return Err(FrameError::MalformedIndexFile(format!(
            "{} holds a {} placement, expected {}",
            path.display(),
            locator.policy().kind().name(),
            published.policy.name()
        )));
    }
    Ok(locator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn locator() -> FrameLocator {
        let grid = Cell::uniform_grid(BoundingBox2D::new(-10.0, -10.0, 10.0, 10.0), 3, 3);
        FrameLocator::new(&grid, 2, PlacementPolicy::SpatialBurst { burst_factor: 2 }).unwrap()
    }

    #[test]
    fn test_artifact_layout() {
        let bytes = locator().to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"MIFL");
        assert_eq!(bytes[4], VERSION);
        assert_eq!(bytes[5], PolicyKind::SpatialBurst.tag());
        assert_eq!(bytes.len(), 4 + 2 + 12 + 9 * CELL_RECORD_LEN);
    }

    #[test]
    fn test_artifact_decodes_same_table() {
        let original = locator();
        let decoded = FrameLocator::from_bytes(&original.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_artifact_rejects_corruption() {
        let bytes = locator().to_bytes().unwrap().to_vec();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            FrameLocator::from_bytes(&bad_magic),
            Err(FrameError::MalformedIndexFile(_))
        ));

        let mut bad_tag = bytes.clone();
        bad_tag[5] = 0x42;
        assert!(FrameLocator::from_bytes(&bad_tag).is_err());

        let truncated = &bytes[..bytes.len() - 3];
        assert!(FrameLocator::from_bytes(truncated).is_err());

        // frame id of the last cell pushed past the frame count
        let mut bad_frame = bytes.clone();
        let last = bad_frame.len() - 4;
        bad_frame[last..].copy_from_slice(&9u32.to_be_bytes());
        assert!(FrameLocator::from_bytes(&bad_frame).is_err());
    }

    #[test]
    fn test_publish_and_load() {
        let dir = TempDir::new().unwrap();
        let original = locator();

        let published = publish_locator(&original, dir.path()).unwrap();
        assert!(published.file.starts_with("cells_"));
        assert!(published.file.ends_with(".partitions"));
        assert_eq!(published.policy, PolicyKind::SpatialBurst);

        let json = published.to_json().unwrap();
        let reference = PublishedLocator::from_json(&json).unwrap();
        let loaded = load_locator(dir.path(), &reference).unwrap();
        assert_eq!(loaded.placement(), original.placement());
    }

    #[test]
    fn test_publish_twice_uses_distinct_files() {
        let dir = TempDir::new().unwrap();
        let a = publish_locator(&locator(), dir.path()).unwrap();
        let b = publish_locator(&locator(), dir.path()).unwrap();
        assert_ne!(a.file, b.file);
    }

    #[test]
    fn test_load_checks_policy() {
        let dir = TempDir::new().unwrap();
        let mut published = publish_locator(&locator(), dir.path()).unwrap();
        published.policy = PolicyKind::RoundRobin;
        assert!(matches!(
            load_locator(dir.path(), &published),
            Err(FrameError::MalformedIndexFile(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let published = PublishedLocator {
            policy: PolicyKind::RoundRobin,
            file: "cells_1.partitions".into(),
        };
        let err = load_locator(dir.path(), &published).unwrap_err();
        assert!(err.is_io());
    }
}
