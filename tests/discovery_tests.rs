use spatio_frames::prelude::*;
use spatio_frames::{DiscoveryConfig, discover_global_index};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write_master(dir: &Path, name: &str, frames: &[Frame]) {
    let mut text = String::new();
    for frame in frames {
        text.push_str(&frame.to_text().unwrap());
        text.push('\n');
    }
    fs::write(dir.join(name), text).unwrap();
}

fn frames() -> Vec<Frame> {
    let micro = |id: u32, x: f64| {
        MicroIndex::new(
            id,
            BoundingBox2D::new(x, 0.0, x + 1.0, 1.0),
            DataRef::new(0, 10),
        )
    };
    vec![
        Frame::new(0, "part-00000", [micro(0, 0.0), micro(2, 2.0)]),
        Frame::new(1, "part-00001", [micro(1, 1.0), micro(3, 3.0)]),
    ]
}

#[test]
fn test_master_file_loads_partitions() {
    init_logging();
    let dir = TempDir::new().unwrap();
    write_master(dir.path(), "_master.rtree", &frames());
    fs::write(dir.path().join("part-00000"), b"data").unwrap();
    fs::write(dir.path().join("part-00001"), b"data").unwrap();

    let index = discover_global_index(dir.path(), &DiscoveryConfig::default())
        .unwrap()
        .expect("master file present");

    assert_eq!(index.len(), 4);
    assert!(index.is_compact());
    assert!(!index.is_replicated());

    let keys: Vec<FrameKey> = index.iter().map(|p| p.key).collect();
    assert_eq!(
        keys,
        vec![
            FrameKey::new(0, 0),
            FrameKey::new(0, 2),
            FrameKey::new(1, 1),
            FrameKey::new(1, 3),
        ]
    );

    let hits = index.range(&BoundingBox2D::new(1.5, 0.2, 2.5, 0.8));
    let files: Vec<&str> = hits.iter().map(|p| p.filename.as_str()).collect();
    assert_eq!(files, vec!["part-00000", "part-00001"]);
}

#[test]
fn test_master_extension_sets_flags() {
    let dir = TempDir::new().unwrap();
    write_master(dir.path(), "_master.grid", &frames());
    let index = discover_global_index(dir.path(), &DiscoveryConfig::default())
        .unwrap()
        .unwrap();
    assert!(!index.is_compact());
    assert!(index.is_replicated());

    let dir = TempDir::new().unwrap();
    write_master(dir.path(), "_master.str+", &frames());
    let index = discover_global_index(dir.path(), &DiscoveryConfig::default())
        .unwrap()
        .unwrap();
    assert!(index.is_compact());
    assert!(index.is_replicated());
}

#[test]
fn test_blank_lines_in_master_are_skipped() {
    let dir = TempDir::new().unwrap();
    let text = format!("\n{}\r\n\n", frames()[0].to_text().unwrap());
    fs::write(dir.path().join("_master.heap"), text).unwrap();

    let index = discover_global_index(dir.path(), &DiscoveryConfig::default())
        .unwrap()
        .unwrap();
    assert_eq!(index.len(), 2);
}

#[test]
fn test_two_master_files_rejected() {
    let dir = TempDir::new().unwrap();
    write_master(dir.path(), "_master.rtree", &frames());
    write_master(dir.path(), "_master.grid", &frames());

    let err = discover_global_index(dir.path(), &DiscoveryConfig::default()).unwrap_err();
    assert!(matches!(err, FrameError::MalformedIndexFile(_)));
}

#[test]
fn test_corrupt_master_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("_master.rtree"), ",0,part-00000,3,1\n").unwrap();

    let err = discover_global_index(dir.path(), &DiscoveryConfig::default()).unwrap_err();
    assert!(matches!(err, FrameError::MalformedIndexFile(_)));
}

/// A master file that is not UTF-8 is corrupt, not a missing index.
#[test]
fn test_non_utf8_master_rejected() {
    init_logging();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("_master.rtree"), [b',', 0xff, 0xfe, b'\n']).unwrap();

    let err = discover_global_index(dir.path(), &DiscoveryConfig::default()).unwrap_err();
    assert!(matches!(err, FrameError::MalformedIndexFile(_)));
    assert!(!err.is_io());
}

#[test]
fn test_custom_master_prefix() {
    let dir = TempDir::new().unwrap();
    write_master(dir.path(), "_index.rtree", &frames());

    assert!(
        discover_global_index(dir.path(), &DiscoveryConfig::default())
            .unwrap()
            .is_none()
    );

    let config = DiscoveryConfig::default().with_master_prefix("_index");
    let index = discover_global_index(dir.path(), &config).unwrap().unwrap();
    assert_eq!(index.len(), 4);
}

#[test]
fn test_tile_directory_indexed_from_names() {
    init_logging();
    let dir = TempDir::new().unwrap();
    for name in [
        "MOD11A1.A2014001.h18v08.005.hdf",
        "MOD11A1.A2014001.h19v08.005.hdf",
        "MOD11A1.A2014001.h18v08.005.hdf.xml",
        "README",
    ] {
        fs::write(dir.path().join(name), b"").unwrap();
    }

    let index = discover_global_index(dir.path(), &DiscoveryConfig::default())
        .unwrap()
        .expect("tile collection");
    assert_eq!(index.len(), 4);

    let by_name = |name: &str| {
        index
            .iter()
            .find(|p| p.filename == name)
            .unwrap_or_else(|| panic!("{} not indexed", name))
    };

    let tile = by_name("MOD11A1.A2014001.h18v08.005.hdf");
    assert_eq!(tile.cell_id(), 8 * 36 + 18);
    assert_eq!(tile.mbr.min_x(), 0.0);
    assert_eq!(tile.mbr.min_y(), 0.0);
    assert_eq!(tile.mbr.max_y(), 10.0);

    let east = by_name("MOD11A1.A2014001.h19v08.005.hdf");
    assert_eq!(east.cell_id(), 8 * 36 + 19);
    assert!(east.mbr.min_x() >= 10.0);

    let readme = by_name("README");
    assert_eq!(readme.mbr, BoundingBox2D::new(-180.0, -90.0, 180.0, 90.0));
    assert!(readme.cell_id() >= 4);

    let hits = index.range_count(&BoundingBox2D::new(1.0, 1.0, 2.0, 2.0));
    assert_eq!(hits, 3);
}

#[test]
fn test_mostly_unrelated_files_have_no_index() {
    let dir = TempDir::new().unwrap();
    for name in ["h18v08.hdf", "notes.txt", "data.csv", "image.png"] {
        fs::write(dir.path().join(name), b"").unwrap();
    }
    assert!(
        discover_global_index(dir.path(), &DiscoveryConfig::default())
            .unwrap()
            .is_none()
    );
}

/// Subdirectories count against the tile majority but are never indexed.
#[test]
fn test_subdirectories_count_toward_tile_majority() {
    let dir = TempDir::new().unwrap();
    for name in ["h18v08.hdf", "h19v08.hdf"] {
        fs::write(dir.path().join(name), b"").unwrap();
    }
    fs::create_dir(dir.path().join("h20v08.hdf")).unwrap();
    fs::create_dir(dir.path().join("logs")).unwrap();

    // Two tile files out of four entries is not a majority.
    assert!(
        discover_global_index(dir.path(), &DiscoveryConfig::default())
            .unwrap()
            .is_none()
    );

    fs::write(dir.path().join("h21v08.hdf"), b"").unwrap();
    let index = discover_global_index(dir.path(), &DiscoveryConfig::default())
        .unwrap()
        .expect("three tile files out of five entries");
    let names: Vec<&str> = index.iter().map(|p| p.filename.as_str()).collect();
    assert_eq!(names, vec!["h18v08.hdf", "h19v08.hdf", "h21v08.hdf"]);
}

#[test]
fn test_missing_directory_is_not_an_error() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist");
    assert!(
        discover_global_index(&missing, &DiscoveryConfig::default())
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let config = DiscoveryConfig::default().with_master_prefix("");
    assert!(matches!(
        discover_global_index(dir.path(), &config),
        Err(FrameError::InvalidConfiguration(_))
    ));
}
