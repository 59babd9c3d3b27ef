/// Assembly of output features from reconstructed geometries
///
/// Each minor version becomes one GeoJSON Feature carrying its validity
/// interval, version metadata and, depending on [`OutputConfig`], the
/// attribute diffs and full attribute snapshot of its major version.

use super::record::FeatureRecord;
use super::topology::encode_topology;
pub use crate::config::{OutputConfig, WriteMode};
use crate::history::{
    Attributes, AttributeDiff, FeatureKind, FeatureMajorVersion, Geometry, HistoricalGeometries,
    MinorVersionGeometry, TagDiffAccumulator,
};
use crate::{Result, WaybackError};
use serde_json::{json, Map, Value};
use tracing::warn;

/// Serialized output of one record.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderedRecord {
    /// Output lines, without trailing newlines.
    pub lines: Vec<String>,
    pub geometry_count: u64,
    pub every_geometry_bytes: u64,
    pub history_object_bytes: u64,
    pub topology_bytes: u64,
    pub encoding_failures: u64,
}

/// Build the GeoJSON features for every reconstructed version of `record`.
pub fn version_features(
    record: &FeatureRecord,
    geometries: &HistoricalGeometries,
    config: &OutputConfig,
) -> Vec<Value> {
    let polygonal = record.kind() == Some(FeatureKind::Line) && record.is_polygonal();
    let mut tags = TagDiffAccumulator::new();
    let mut features = Vec::new();

    for major in &record.history {
        tags.advance(major);
        let Some(entries) = geometries.get(&major.version) else {
            continue;
        };
        for entry in entries {
            features.push(version_feature(
                record.id,
                major,
                entry,
                tags.current(),
                polygonal,
                config,
            ));
        }
    }

    features
}

fn version_feature(
    id: i64,
    major: &FeatureMajorVersion,
    entry: &MinorVersionGeometry,
    tags: &Attributes,
    polygonal: bool,
    config: &OutputConfig,
) -> Value {
    let mut properties = Map::new();
    properties.insert("@validSince".to_string(), json!(entry.valid_since));
    properties.insert(
        "@validUntil".to_string(),
        entry.valid_until.map_or(Value::Null, Value::from),
    );

    if !config.geometry_only {
        properties.insert("@id".to_string(), json!(id));
        properties.insert("@version".to_string(), json!(entry.major_version));
        properties.insert("@minorVersion".to_string(), json!(entry.minor_version));
        properties.insert("@changeset".to_string(), json!(entry.changeset));
        properties.insert("@user".to_string(), json!(entry.user));
        properties.insert("@uid".to_string(), json!(entry.uid));

        let full_properties = if entry.minor_version == 0 {
            if config.include_diffs_on_major_versions {
                insert_diffs(&mut properties, &major.diffs);
            }
            config.include_full_properties_on_major_versions
        } else {
            config.include_full_properties_on_minor_versions
        };

        if full_properties {
            for (key, value) in tags {
                properties.insert(key.clone(), Value::String(value.clone()));
            }
        }
    }

    json!({
        "type": "Feature",
        "geometry": output_geometry(&entry.geometry, polygonal),
        "properties": properties,
    })
}

/// Line versions of area features are wrapped into a single-ring polygon.
fn output_geometry(geometry: &Geometry, polygonal: bool) -> Value {
    match geometry.line_coordinates() {
        Some(ring) if polygonal => json!({ "type": "Polygon", "coordinates": [ring] }),
        _ => geometry.to_geojson(),
    }
}

fn insert_diffs(properties: &mut Map<String, Value>, diffs: &[AttributeDiff]) {
    let mut added = Map::new();
    let mut modified = Map::new();
    let mut deleted = Vec::new();

    for diff in diffs {
        match diff {
            AttributeDiff::Added { key, value } => {
                added.insert(key.clone(), json!(value));
            }
            AttributeDiff::Modified { key, old, new } => {
                modified.insert(key.clone(), json!([old, new]));
            }
            AttributeDiff::Deleted { key } => deleted.push(json!(key)),
        }
    }

    if !added.is_empty() {
        properties.insert("aA".to_string(), Value::Object(added));
    }
    if !modified.is_empty() {
        properties.insert("aM".to_string(), Value::Object(modified));
    }
    if !deleted.is_empty() {
        properties.insert("aD".to_string(), Value::Array(deleted));
    }
}

/// Serialize the features of one record according to the write mode.
pub fn render_record(
    record: &FeatureRecord,
    geometries: &HistoricalGeometries,
    config: &OutputConfig,
) -> RenderedRecord {
    let features = version_features(record, geometries, config);
    let mut rendered = RenderedRecord {
        geometry_count: features.len() as u64,
        ..Default::default()
    };

    match config.write_mode {
        WriteMode::EveryGeometry => {
            for feature in &features {
                let line = feature.to_string();
                rendered.every_geometry_bytes += line.len() as u64 + 1;
                rendered.lines.push(line);
            }
        }
        WriteMode::HistoryObject => {
            let line = Value::Array(features).to_string();
            rendered.history_object_bytes += line.len() as u64 + 1;
            rendered.lines.push(line);
        }
        WriteMode::Topology => match topology_feature(record, &features, config) {
            Ok(line) => {
                rendered.topology_bytes += line.len() as u64 + 1;
                rendered.lines.push(line);
            }
            Err(e) => {
                warn!(id = record.id, error = %e, "failed to encode history topology");
                rendered.encoding_failures += 1;
            }
        },
    }

    rendered
}

/// The record's head feature with its version history attached as a
/// topology under `@history`.
fn topology_feature(
    record: &FeatureRecord,
    features: &[Value],
    config: &OutputConfig,
) -> Result<String> {
    let topology = encode_topology(features)?;
    let history = serde_json::to_value(&topology)
        .map_err(|e| WaybackError::Serialization(e.to_string()))?;

    let mut properties = Map::new();
    if !config.geometry_only {
        properties.insert("@id".to_string(), json!(record.id));
        if let Some(osm_type) = &record.osm_type {
            properties.insert("@type".to_string(), json!(osm_type));
        }
    }
    properties.insert("@history".to_string(), history);

    let feature = json!({
        "type": "Feature",
        "geometry": record.head_geometry,
        "properties": properties,
    });
    Ok(feature.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Position;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn record(osm_type: &str, head: Value) -> FeatureRecord {
        FeatureRecord {
            id: 42,
            osm_type: Some(osm_type.to_string()),
            history: vec![
                FeatureMajorVersion::new(1, 100, 10)
                    .with_user("alice", 1)
                    .with_diff(AttributeDiff::Added {
                        key: "highway".to_string(),
                        value: "path".to_string(),
                    }),
                FeatureMajorVersion::new(2, 500, 20)
                    .with_user("bob", 2)
                    .with_diff(AttributeDiff::Modified {
                        key: "highway".to_string(),
                        old: "path".to_string(),
                        new: "track".to_string(),
                    }),
            ],
            timelines: Some(Default::default()),
            head_geometry: head,
        }
    }

    fn entry(major: u32, minor: u32, since: i64, until: Option<i64>) -> MinorVersionGeometry {
        MinorVersionGeometry {
            major_version: major,
            minor_version: minor,
            geometry: Geometry::LineString(vec![
                Position::new(0.0, 0.0),
                Position::new(1.0, 0.0),
                Position::new(0.0, 0.0),
            ]),
            valid_since: since,
            valid_until: until,
            changeset: since,
            user: format!("user{}", since),
            uid: since,
        }
    }

    fn geometries() -> HistoricalGeometries {
        let mut geometries = BTreeMap::new();
        geometries.insert(1, vec![entry(1, 0, 100, Some(300)), entry(1, 1, 300, Some(500))]);
        geometries.insert(2, vec![entry(2, 0, 500, None)]);
        geometries
    }

    #[test]
    fn test_version_metadata_and_tags() {
        let record = record("way", json!({"type": "LineString"}));
        let features = version_features(&record, &geometries(), &OutputConfig::default());

        assert_eq!(features.len(), 3);
        let first = &features[0]["properties"];
        assert_eq!(first["@id"], json!(42));
        assert_eq!(first["@version"], json!(1));
        assert_eq!(first["@minorVersion"], json!(0));
        assert_eq!(first["@validSince"], json!(100));
        assert_eq!(first["@validUntil"], json!(300));
        assert_eq!(first["highway"], json!("path"));
        assert!(first.get("aA").is_none());

        // Minor versions carry the tags of their major version
        assert_eq!(features[1]["properties"]["highway"], json!("path"));
        assert_eq!(features[1]["properties"]["@changeset"], json!(300));

        let last = &features[2]["properties"];
        assert_eq!(last["highway"], json!("track"));
        assert_eq!(last["@validUntil"], Value::Null);
        assert_eq!(features[2]["geometry"]["type"], json!("LineString"));
    }

    #[test]
    fn test_diffs_only_on_first_minor() {
        let record = record("way", json!({"type": "LineString"}));
        let config = OutputConfig {
            include_diffs_on_major_versions: true,
            include_full_properties_on_minor_versions: false,
            ..Default::default()
        };
        let features = version_features(&record, &geometries(), &config);

        assert_eq!(features[0]["properties"]["aA"], json!({"highway": "path"}));
        assert!(features[1]["properties"].get("aA").is_none());
        assert!(features[1]["properties"].get("highway").is_none());
        assert_eq!(
            features[2]["properties"]["aM"],
            json!({"highway": ["path", "track"]})
        );
    }

    #[test]
    fn test_geometry_only() {
        let record = record("way", json!({"type": "LineString"}));
        let config = OutputConfig {
            geometry_only: true,
            ..Default::default()
        };
        let features = version_features(&record, &geometries(), &config);

        let properties = features[0]["properties"].as_object().unwrap();
        let mut keys: Vec<_> = properties.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["@validSince", "@validUntil"]);
    }

    #[test]
    fn test_polygon_wrapping() {
        let record = record("way", json!({"type": "Polygon", "coordinates": []}));
        let features = version_features(&record, &geometries(), &OutputConfig::default());

        assert_eq!(features[0]["geometry"]["type"], json!("Polygon"));
        assert_eq!(
            features[0]["geometry"]["coordinates"],
            json!([[[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]])
        );
    }

    #[test]
    fn test_write_modes() {
        let record = record("way", json!({"type": "LineString"}));

        let every = render_record(&record, &geometries(), &OutputConfig::default());
        assert_eq!(every.lines.len(), 3);
        assert_eq!(every.geometry_count, 3);
        let expected: u64 = every.lines.iter().map(|l| l.len() as u64 + 1).sum();
        assert_eq!(every.every_geometry_bytes, expected);
        assert_eq!(every.history_object_bytes, 0);
        assert_eq!(every.encoding_failures, 0);

        let config = OutputConfig {
            write_mode: WriteMode::HistoryObject,
            ..Default::default()
        };
        let object = render_record(&record, &geometries(), &config);
        assert_eq!(object.lines.len(), 1);
        assert_eq!(object.geometry_count, 3);
        let parsed: Value = serde_json::from_str(&object.lines[0]).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(3));
        assert_eq!(object.every_geometry_bytes, 0);

        let config = OutputConfig {
            write_mode: WriteMode::Topology,
            ..Default::default()
        };
        let topology = render_record(&record, &geometries(), &config);
        assert_eq!(topology.lines.len(), 1);
        assert_eq!(topology.geometry_count, 3);
        assert_eq!(topology.topology_bytes, topology.lines[0].len() as u64 + 1);
        assert_eq!(topology.encoding_failures, 0);

        let parsed: Value = serde_json::from_str(&topology.lines[0]).unwrap();
        assert_eq!(parsed["properties"]["@id"], json!(42));
        let history = &parsed["properties"]["@history"];
        assert_eq!(history["type"], json!("Topology"));
        assert_eq!(history["arcs"].as_array().map(Vec::len), Some(3));
        assert_eq!(history["objects"]["2"]["properties"]["highway"], json!("track"));
        assert_eq!(history["objects"]["0"]["arcs"], json!([0]));
    }

    #[test]
    fn test_topology_encoding_failure_is_counted() {
        // A composite head geometry whose coordinates are not positions
        let record = record(
            "relation",
            json!({"type": "Polygon", "coordinates": [[["a", "b"]]]}),
        );
        let mut geometries = BTreeMap::new();
        let mut broken = entry(1, 0, 100, None);
        broken.geometry = Geometry::Raw(record.head_geometry.clone());
        geometries.insert(1, vec![broken]);

        let config = OutputConfig {
            write_mode: WriteMode::Topology,
            ..Default::default()
        };
        let rendered = render_record(&record, &geometries, &config);
        assert!(rendered.lines.is_empty());
        assert_eq!(rendered.encoding_failures, 1);
        assert_eq!(rendered.topology_bytes, 0);
        assert_eq!(rendered.geometry_count, 1);

        // The same record still renders in the plain GeoJSON modes
        let every = render_record(&record, &geometries, &OutputConfig::default());
        assert_eq!(every.lines.len(), 1);
        assert_eq!(every.encoding_failures, 0);
    }
}
