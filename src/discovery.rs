//! Finding the global index of a partitioned directory.
//!
//! Two layouts are recognised:
//!
//! - a single master file (name starting with the configured prefix) holding
//!   one text-encoded frame per line;
//! - a directory where most files follow the MODIS tile naming convention
//!   (`...hHHvVV....hdf`, `.jpg` or `.xml`), indexed on the fly from the tile
//!   coordinates in each name.

use crate::codec::{BinaryRecord, TextRecord, read_f64, read_utf, write_utf};
use crate::config::DiscoveryConfig;
use crate::error::{FrameError, Result};
use crate::frame::Frame;
use crate::frame_key::FrameKey;
use crate::global_index::{GlobalIndex, Shape};
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use spatio_frames_types::BoundingBox2D;
use std::path::Path;

const TILE_EXTENSIONS: &[&str] = &["hdf", "jpg", "xml"];
const TILE_COLUMNS: u32 = 36;
const TILE_DEGREES: f64 = 10.0;

/// One partition of a discovered index: where its records live and what
/// area they cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Owning frame and cell of the partition
    pub key: FrameKey,
    pub filename: String,
    pub mbr: BoundingBox2D,
}

impl Partition {
    pub fn new(key: FrameKey, filename: impl Into<String>, mbr: BoundingBox2D) -> Self {
        Self {
            key,
            filename: filename.into(),
            mbr,
        }
    }

    pub fn cell_id(&self) -> u32 {
        self.key.index_id
    }

    pub fn frame_id(&self) -> u32 {
        self.key.frame_id
    }
}

impl Shape for Partition {
    fn mbr(&self) -> BoundingBox2D {
        self.mbr
    }
}

impl BinaryRecord for Partition {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.key.encode(buf)?;
        write_utf(buf, &self.filename)?;
        buf.put_f64(self.mbr.min_x());
        buf.put_f64(self.mbr.min_y());
        buf.put_f64(self.mbr.max_x());
        buf.put_f64(self.mbr.max_y());
        Ok(())
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let key = FrameKey::decode(buf)?;
        let filename = read_utf(buf, "partition filename")?;
        let min_x = read_f64(buf, "partition min_x")?;
        let min_y = read_f64(buf, "partition min_y")?;
        let max_x = read_f64(buf, "partition max_x")?;
        let max_y = read_f64(buf, "partition max_y")?;
        Ok(Partition::new(
            key,
            filename,
            BoundingBox2D::new(min_x, min_y, max_x, max_y),
        ))
    }
}

/// Look for a global index in `dir`.
///
/// Returns `Ok(None)` when the directory holds neither a master file nor a
/// tile collection, and also when it cannot be read: storage failures are
/// logged, not returned. A corrupt master file, or more than one, is an
/// error.
pub fn discover_global_index(
    dir: impl AsRef<Path>,
    config: &DiscoveryConfig,
) -> Result<Option<GlobalIndex<Partition>>> {
    config.validate()?;
    let dir = dir.as_ref();

    match discover(dir, config) {
        Err(err) if err.is_io() => {
            log::warn!(
                "Error retrieving global index of '{}': {}",
                dir.display(),
                err
            );
            Ok(None)
        }
        other => other,
    }
}

fn discover(dir: &Path, config: &DiscoveryConfig) -> Result<Option<GlobalIndex<Partition>>> {
    let listing = list_files(dir)?;
    let names = &listing.files;

    let mut master: Option<&str> = None;
    let mut tile_files = 0;
    for name in names {
        if name.starts_with(config.master_prefix.as_str()) {
            if let Some(first) = master {
                return Err(FrameError::MalformedIndexFile(format!(
                    "found more than one master file in '{}': '{}' and '{}'",
                    dir.display(),
                    first,
                    name
                )));
            }
            master = Some(name.as_str());
        } else if is_tile_file(name) {
            tile_files += 1;
        }
    }

    if let Some(master) = master {
        log::debug!("Loading global index of '{}' from {}", dir.display(), master);
        return load_master(&dir.join(master), master, config).map(Some);
    }

    // The majority is taken over every entry, indexable or not.
    if tile_files > listing.entries / 2 {
        log::debug!(
            "Indexing '{}' from tile names ({} of {} entries)",
            dir.display(),
            tile_files,
            listing.entries
        );
        return Ok(Some(tile_index(names)));
    }

    log::debug!("No global index in '{}'", dir.display());
    Ok(None)
}

/// Directory listing used by discovery.
#[derive(Debug, Default)]
struct Listing {
    /// Names of the regular files with UTF-8 names, sorted
    files: Vec<String>,
    /// Every entry of the directory, including the ones left out of `files`
    entries: usize,
}

/// List `dir`, sorted so discovery does not depend on listing order.
/// Subdirectories and non UTF-8 names count as entries but never become
/// partitions.
fn list_files(dir: &Path) -> Result<Listing> {
    let read_dir = std::fs::read_dir(dir).map_err(|err| FrameError::storage(dir, err))?;

    let mut listing = Listing::default();
    for entry in read_dir {
        let entry = entry.map_err(|err| FrameError::storage(dir, err))?;
        listing.entries += 1;

        let file_type = entry
            .file_type()
            .map_err(|err| FrameError::storage(entry.path(), err))?;
        if file_type.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => listing.files.push(name),
            Err(name) => log::debug!("Skipping non UTF-8 file name {:?}", name),
        }
    }

    listing.files.sort_unstable();
    Ok(listing)
}

/// Parse a master file: every non-empty line is one text-encoded frame, and
/// every micro-index of every frame becomes a partition.
fn load_master(path: &Path, name: &str, config: &DiscoveryConfig) -> Result<GlobalIndex<Partition>> {
    let bytes = std::fs::read(path).map_err(|err| FrameError::storage(path, err))?;
    let text = String::from_utf8(bytes).map_err(|err| {
        FrameError::MalformedIndexFile(format!(
            "{} is not valid UTF-8: {}",
            path.display(),
            err.utf8_error()
        ))
    })?;

    let mut partitions = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let frame = Frame::from_text(line).map_err(|err| match err {
            FrameError::MalformedIndexFile(reason) => FrameError::MalformedIndexFile(format!(
                "{} line {}: {}",
                path.display(),
                line_no + 1,
                reason
            )),
            other => other,
        })?;

        for index in frame.sorted_indexes() {
            partitions.push(Partition::new(
                FrameKey::new(frame.frame_id(), index.index_id),
                frame.filename(),
                index.bbox,
            ));
        }
    }

    let extension = name.rsplit('.').next().unwrap_or(name);
    let mut index = GlobalIndex::from_shapes(partitions);
    index.set_compact(config.is_compact(extension));
    index.set_replicated(config.is_replicated(extension));
    Ok(index)
}

/// Horizontal and vertical tile numbers of the last `hHHvVV` marker in
/// `name`, ignoring case.
fn find_tile(name: &str) -> Option<(u32, u32)> {
    let bytes = name.as_bytes();
    if bytes.len() < 6 {
        return None;
    }

    (0..=bytes.len() - 6).rev().find_map(|start| {
        let w = &bytes[start..start + 6];
        let digits = |a: u8, b: u8| {
            (a.is_ascii_digit() && b.is_ascii_digit())
                .then(|| u32::from((a - b'0') * 10 + (b - b'0')))
        };
        if w[0].eq_ignore_ascii_case(&b'h') && w[3].eq_ignore_ascii_case(&b'v') {
            Some((digits(w[1], w[2])?, digits(w[4], w[5])?))
        } else {
            None
        }
    })
}

/// A tile file has a tile marker before one of the tile extensions.
fn is_tile_file(name: &str) -> bool {
    let Some((stem, extension)) = name.rsplit_once('.') else {
        return false;
    };
    TILE_EXTENSIONS
        .iter()
        .any(|ext| extension.eq_ignore_ascii_case(ext))
        && find_tile(stem).is_some()
}

/// Longitude/latitude box of MODIS sinusoidal tile `(h, v)`.
fn tile_bounds(h: u32, v: u32) -> BoundingBox2D {
    let x1 = h as f64 * TILE_DEGREES - 180.0;
    let x2 = x1 + TILE_DEGREES;
    let y2 = (18.0 - v as f64) * TILE_DEGREES - 90.0;
    let y1 = y2 - TILE_DEGREES;

    let to_lon = |x: f64, y: f64| x / y.to_radians().cos();
    let lon1 = to_lon(x1, y1).min(to_lon(x1, y2));
    let lon2 = to_lon(x2, y1).max(to_lon(x2, y2));

    BoundingBox2D::new(
        lon1.clamp(-180.0, 180.0),
        y1,
        lon2.clamp(-180.0, 180.0),
        y2,
    )
}

/// One partition per file; files without a tile marker cover the world.
fn tile_index(names: &[String]) -> GlobalIndex<Partition> {
    let count = names.len() as u32;
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let i = i as u32;
            match find_tile(name) {
                Some((h, v)) => Partition::new(
                    FrameKey::new(i, v * TILE_COLUMNS + h),
                    name.as_str(),
                    tile_bounds(h, v),
                ),
                None => Partition::new(
                    FrameKey::new(i, count + i),
                    name.as_str(),
                    BoundingBox2D::new(-180.0, -90.0, 180.0, 90.0),
                ),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tile() {
        assert_eq!(find_tile("MOD11A1.A2014001.h12v04.005.hdf"), Some((12, 4)));
        assert_eq!(find_tile("H08V05.JPG"), Some((8, 5)));
        assert_eq!(find_tile("h01v02_h03v04.xml"), Some((3, 4)));
        assert_eq!(find_tile("hxxv04.hdf"), None);
        assert_eq!(find_tile("h1v1"), None);
    }

    #[test]
    fn test_is_tile_file() {
        assert!(is_tile_file("MOD11A1.A2014001.h12v04.005.hdf"));
        assert!(is_tile_file("browse.H12V04.JPG"));
        assert!(!is_tile_file("MOD11A1.h12v04.tif"));
        assert!(!is_tile_file("readme.txt"));
        assert!(!is_tile_file("h12v04"));
    }

    #[test]
    fn test_tile_bounds_on_equator() {
        // h18v08 spans 0..10 east, 0..10 north
        let bbox = tile_bounds(18, 8);
        assert_eq!(bbox.min_x(), 0.0);
        assert_eq!(bbox.min_y(), 0.0);
        assert_eq!(bbox.max_y(), 10.0);
        assert!((bbox.max_x() - 10.0 / 10f64.to_radians().cos()).abs() < 1e-9);
    }

    #[test]
    fn test_tile_bounds_clamped_near_pole() {
        let bbox = tile_bounds(0, 0);
        assert_eq!(bbox.min_x(), -180.0);
        assert_eq!(bbox.max_y(), 90.0);
        assert!(bbox.is_finite());
    }

    #[test]
    fn test_partition_binary() {
        let partition = Partition::new(
            FrameKey::new(2, 77),
            "part-00002",
            BoundingBox2D::new(1.0, 2.0, 3.0, 4.0),
        );
        let bytes = partition.to_bytes().unwrap();
        assert_eq!(bytes.len(), 8 + 2 + 10 + 32);
        assert_eq!(Partition::from_bytes(&bytes).unwrap(), partition);
        assert_eq!(partition.cell_id(), 77);
        assert_eq!(partition.frame_id(), 2);
    }
}
