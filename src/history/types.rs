/// Core types for feature histories and reconstructed geometries

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Seconds since the Unix epoch.
pub type Timestamp = i64;
pub type ChangesetId = i64;
pub type PointId = i64;
pub type UserId = i64;

/// A (lon, lat) coordinate pair.
///
/// Serializes as a two-element array, matching GeoJSON positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position(pub f64, pub f64);

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self(lon, lat)
    }

    pub fn lon(&self) -> f64 {
        self.0
    }

    pub fn lat(&self) -> f64 {
        self.1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// One recorded state of a point.
///
/// A version without a position is a deletion or redaction: it still belongs
/// to the point's history but never contributes geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointVersion {
    #[serde(rename = "t")]
    pub timestamp: Timestamp,
    #[serde(rename = "c")]
    pub changeset: ChangesetId,
    #[serde(rename = "h", default)]
    pub user: String,
    #[serde(rename = "u", default)]
    pub uid: UserId,
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl PointVersion {
    pub fn new(timestamp: Timestamp, changeset: ChangesetId, position: Option<Position>) -> Self {
        Self {
            timestamp,
            changeset,
            user: String::new(),
            uid: 0,
            position,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>, uid: UserId) -> Self {
        self.user = user.into();
        self.uid = uid;
        self
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }
}

/// Point id -> every known version of that point, in no particular order.
pub type PointTimelines = HashMap<PointId, Vec<PointVersion>>;

/// A single attribute change carried by a major version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeDiff {
    Added { key: String, value: String },
    Modified { key: String, old: String, new: String },
    Deleted { key: String },
}

impl AttributeDiff {
    pub fn key(&self) -> &str {
        match self {
            AttributeDiff::Added { key, .. }
            | AttributeDiff::Modified { key, .. }
            | AttributeDiff::Deleted { key } => key,
        }
    }
}

/// An explicit edit of a feature: its own entry in the changelog.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMajorVersion {
    pub version: u32,
    pub timestamp: Timestamp,
    pub changeset: ChangesetId,
    pub user: String,
    pub uid: UserId,
    /// Ordered point references (line features). `None` when the version is deleted.
    pub point_refs: Option<Vec<PointId>>,
    /// Own coordinate (point features). `None` when the version is deleted.
    pub position: Option<Position>,
    pub diffs: Vec<AttributeDiff>,
}

impl FeatureMajorVersion {
    pub fn new(version: u32, timestamp: Timestamp, changeset: ChangesetId) -> Self {
        Self {
            version,
            timestamp,
            changeset,
            user: String::new(),
            uid: 0,
            point_refs: None,
            position: None,
            diffs: Vec::new(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>, uid: UserId) -> Self {
        self.user = user.into();
        self.uid = uid;
        self
    }

    pub fn with_point_refs(mut self, refs: Vec<PointId>) -> Self {
        self.point_refs = Some(refs);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_diff(mut self, diff: AttributeDiff) -> Self {
        self.diffs.push(diff);
        self
    }

    /// Point references, if this version has anything to draw.
    pub fn drawable_refs(&self) -> Option<&[PointId]> {
        self.point_refs
            .as_deref()
            .filter(|refs| !refs.is_empty())
    }
}

/// Which reconstructor a feature record is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Point,
    Line,
    Composite,
}

/// Half-open interval `[since, until)`; `None` means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidityWindow {
    pub since: Option<Timestamp>,
    pub until: Option<Timestamp>,
}

impl ValidityWindow {
    pub fn new(since: Option<Timestamp>, until: Option<Timestamp>) -> Self {
        Self { since, until }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        self.since.map_or(true, |s| t >= s) && self.until.map_or(true, |u| t < u)
    }
}

impl fmt::Display for ValidityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let since = self.since.map_or_else(|| "-inf".to_string(), |s| s.to_string());
        let until = self.until.map_or_else(|| "+inf".to_string(), |u| u.to_string());
        write!(f, "[{}, {})", since, until)
    }
}

/// Geometry of one reconstructed version.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    /// Head geometry passed through untouched (composite placeholder).
    Raw(Value),
}

impl Geometry {
    pub fn type_name(&self) -> &str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Raw(value) => value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("Unknown"),
        }
    }

    /// Line coordinates, when this is a line.
    pub fn line_coordinates(&self) -> Option<&[Position]> {
        match self {
            Geometry::LineString(coords) => Some(coords),
            _ => None,
        }
    }

    pub fn to_geojson(&self) -> Value {
        match self {
            Geometry::Point(p) => json!({ "type": "Point", "coordinates": p }),
            Geometry::LineString(coords) => json!({ "type": "LineString", "coordinates": coords }),
            Geometry::Raw(value) => value.clone(),
        }
    }
}

/// One entry of a major version's geometry chain. Minor 0 is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct MinorVersionGeometry {
    pub major_version: u32,
    pub minor_version: u32,
    pub geometry: Geometry,
    pub valid_since: Timestamp,
    pub valid_until: Option<Timestamp>,
    pub changeset: ChangesetId,
    pub user: String,
    pub uid: UserId,
}

/// Major version number -> ordered minor versions.
pub type HistoricalGeometries = BTreeMap<u32, Vec<MinorVersionGeometry>>;
