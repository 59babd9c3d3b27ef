//! Historical geometry reconstruction.
//!
//! For every major version of a feature, derives the baseline geometry and the
//! minor versions caused by edits to referenced points. Pure computation: all
//! inputs are borrowed, nothing is cached across calls.
//!
//! # Modules
//!
//! - [`resolver`]: per-point candidate selection for a validity window
//! - [`line`]: line windows from point timelines, changeset grouping
//! - [`assembler`]: major-version windows and validity chaining
//! - [`point`]: single-point features
//! - [`composite`]: head-geometry placeholder for relations

pub mod assembler;
pub mod composite;
pub mod error;
pub mod line;
pub mod point;
pub mod resolver;

pub use composite::CompositeHistoryBuilder;
pub use error::ReconstructionError;
pub use line::{LineHistoryBuilder, LineHistoryReconstructor, LineWindow, MinorVersionCandidate};
pub use point::PointHistoryBuilder;
pub use resolver::{Candidate, PointVersionResolver};

use crate::history::{
    FeatureKind, FeatureMajorVersion, HistoricalGeometries, PointTimelines, Timestamp,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Clock skew tolerated between a feature edit and a point edit of the same action.
pub const CHANGESET_GRACE: Timestamp = 60;

/// Point edits closer together than this collapse into one minor version.
pub const MINOR_MERGE_WINDOW: Timestamp = 60;

/// Result of reconstructing one feature.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reconstruction {
    pub geometries: HistoricalGeometries,
    /// Major versions whose window could not be resolved, by version number.
    pub unresolved: BTreeMap<u32, ReconstructionError>,
}

impl Reconstruction {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Total number of minor-version geometries across all major versions.
    pub fn geometry_count(&self) -> usize {
        self.geometries.values().map(Vec::len).sum()
    }

    /// The geometries, or the first failure if any major version is unresolved.
    pub fn into_complete(self) -> Result<HistoricalGeometries, ReconstructionError> {
        match self.unresolved.into_values().next() {
            Some(err) => Err(err),
            None => Ok(self.geometries),
        }
    }
}

/// Common interface of the per-kind history builders.
pub trait GeometryHistoryBuilder {
    fn kind(&self) -> FeatureKind;

    fn build(&self) -> Reconstruction;
}

/// Reconstruct a single-point feature from its own version records.
pub fn reconstruct_point(history: &[FeatureMajorVersion]) -> HistoricalGeometries {
    PointHistoryBuilder::new(history).build().geometries
}

/// Reconstruct a line feature; failed windows are reported in `unresolved`.
pub fn reconstruct_line(
    timelines: &PointTimelines,
    history: &[FeatureMajorVersion],
) -> Reconstruction {
    LineHistoryBuilder::new(timelines, history).build()
}

/// Assign `current_geometry` to every major version of a composite feature.
pub fn reconstruct_composite(
    history: &[FeatureMajorVersion],
    current_geometry: &Value,
) -> HistoricalGeometries {
    CompositeHistoryBuilder::new(history, current_geometry)
        .build()
        .geometries
}
