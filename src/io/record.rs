/// Decoding of history-enriched GeoJSON feature lines
///
/// Every input line is one GeoJSON Feature. Features carrying an `@history`
/// property are decoded into a [`FeatureRecord`]; anything else is handed
/// back untouched so the pipeline can pass it through.

use crate::history::{
    AttributeDiff, FeatureKind, FeatureMajorVersion, PointId, PointTimelines, PointVersion,
    Position, Timestamp, UserId,
};
use crate::{Result, WaybackError};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    geometry: Value,
    #[serde(default)]
    properties: Option<RawProperties>,
    #[serde(rename = "nodeLocations", default)]
    node_locations: Option<HashMap<String, RawPointHistory>>,
}

#[derive(Debug, Deserialize)]
struct RawProperties {
    #[serde(rename = "@id", default)]
    id: Option<i64>,
    #[serde(rename = "@type", default)]
    osm_type: Option<String>,
    #[serde(rename = "@history", default)]
    history: Option<Vec<RawHistoryEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawHistoryEntry {
    i: u32,
    t: Timestamp,
    c: i64,
    #[serde(default)]
    h: String,
    #[serde(default)]
    u: UserId,
    #[serde(default)]
    n: Option<Vec<PointId>>,
    #[serde(default)]
    p: Option<Position>,
    #[serde(rename = "aA", default)]
    added: Option<IndexMap<String, String>>,
    #[serde(rename = "aM", default)]
    modified: Option<IndexMap<String, (String, String)>>,
    #[serde(rename = "aD", default)]
    deleted: Option<IndexMap<String, Value>>,
}

/// A point timeline, keyed by changeset or given as a plain list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPointHistory {
    ByChangeset(BTreeMap<String, PointVersion>),
    List(Vec<PointVersion>),
}

impl RawPointHistory {
    fn into_timeline(self) -> Vec<PointVersion> {
        let mut versions: Vec<PointVersion> = match self {
            RawPointHistory::ByChangeset(map) => map.into_values().collect(),
            RawPointHistory::List(list) => list,
        };
        versions.sort_by_key(|v| (v.timestamp, v.changeset));
        versions
    }
}

impl RawHistoryEntry {
    fn into_major_version(self) -> FeatureMajorVersion {
        let mut version = FeatureMajorVersion::new(self.i, self.t, self.c).with_user(self.h, self.u);
        version.point_refs = self.n;
        version.position = self.p;

        for (key, value) in self.added.into_iter().flatten() {
            version.diffs.push(AttributeDiff::Added { key, value });
        }
        for (key, (old, new)) in self.modified.into_iter().flatten() {
            version.diffs.push(AttributeDiff::Modified { key, old, new });
        }
        for key in self.deleted.into_iter().flatten().map(|(key, _)| key) {
            version.diffs.push(AttributeDiff::Deleted { key });
        }
        version
    }
}

/// A decoded feature together with everything its builder needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub id: i64,
    /// Raw `@type` property (`node`, `way`, `relation`).
    pub osm_type: Option<String>,
    pub history: Vec<FeatureMajorVersion>,
    /// Point timelines from `nodeLocations`, present for line features.
    pub timelines: Option<PointTimelines>,
    /// Geometry of the current version.
    pub head_geometry: Value,
}

impl FeatureRecord {
    /// Which history builder applies, if any.
    pub fn kind(&self) -> Option<FeatureKind> {
        match self.osm_type.as_deref() {
            Some("node") => Some(FeatureKind::Point),
            _ if self.timelines.is_some() => Some(FeatureKind::Line),
            Some("relation") => Some(FeatureKind::Composite),
            _ => None,
        }
    }

    /// GeoJSON type of the current geometry.
    pub fn head_geometry_type(&self) -> Option<&str> {
        self.head_geometry.get("type").and_then(Value::as_str)
    }

    /// Whether line versions should be emitted as polygons.
    pub fn is_polygonal(&self) -> bool {
        matches!(
            self.head_geometry_type(),
            Some("Polygon") | Some("MultiPolygon")
        )
    }
}

/// Outcome of decoding one line.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedLine {
    Feature(FeatureRecord),
    /// Valid feature without `@history`; written out unchanged.
    NoHistory,
}

/// Decode one input line.
pub fn decode_record(line: &str) -> Result<DecodedLine> {
    let raw: RawFeature = serde_json::from_str(line)
        .map_err(|e| WaybackError::Parse(format!("Invalid feature record: {}", e)))?;

    let Some(properties) = raw.properties else {
        return Ok(DecodedLine::NoHistory);
    };
    let Some(entries) = properties.history else {
        return Ok(DecodedLine::NoHistory);
    };

    let id = properties
        .id
        .ok_or_else(|| WaybackError::Parse("Feature with history has no @id".to_string()))?;

    let mut history: Vec<FeatureMajorVersion> =
        entries.into_iter().map(RawHistoryEntry::into_major_version).collect();
    history.sort_by_key(|v| v.version);

    let timelines = raw
        .node_locations
        .map(|locations| {
            locations
                .into_iter()
                .map(|(point, timeline)| {
                    let point: PointId = point.parse().map_err(|_| {
                        WaybackError::Parse(format!("Invalid point id in nodeLocations: {}", point))
                    })?;
                    Ok((point, timeline.into_timeline()))
                })
                .collect::<Result<PointTimelines>>()
        })
        .transpose()?;

    Ok(DecodedLine::Feature(FeatureRecord {
        id,
        osm_type: properties.osm_type,
        history,
        timelines,
        head_geometry: raw.geometry,
    }))
}
