//! GeoJSON export of partition boundaries.

use crate::discovery::Partition;
use crate::error::{FrameError, Result};
use crate::global_index::GlobalIndex;
use geo::Polygon;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::Map;
use spatio_frames_types::BoundingBox2D;

fn rectangle(bbox: &BoundingBox2D) -> Geometry {
    let polygon: Polygon = bbox.rect.to_polygon();
    let exterior: Vec<Vec<f64>> = polygon
        .exterior()
        .coords()
        .map(|coord| vec![coord.x, coord.y])
        .collect();
    Geometry::new(Value::Polygon(vec![exterior]))
}

/// One polygon feature per partition with `cell_id`, `frame_id` and
/// `filename` properties.
pub fn partitions_to_feature_collection(index: &GlobalIndex<Partition>) -> FeatureCollection {
    let features = index
        .iter()
        .map(|partition| {
            let mut props = Map::new();
            props.insert("cell_id".to_string(), partition.cell_id().into());
            props.insert("frame_id".to_string(), partition.frame_id().into());
            props.insert("filename".to_string(), partition.filename.clone().into());

            Feature {
                bbox: None,
                geometry: Some(rectangle(&partition.mbr)),
                id: None,
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn partitions_to_geojson(index: &GlobalIndex<Partition>) -> Result<String> {
    let collection = partitions_to_feature_collection(index);
    serde_json::to_string(&collection).map_err(|e| {
        FrameError::Serialization(format!("Failed to serialize feature collection: {}", e))
    })
}
