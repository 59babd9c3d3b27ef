//! Error types for geometry reconstruction.

use crate::history::PointId;
use thiserror::Error;

/// Failure to reconstruct one major-version window of a line feature.
///
/// A line cannot have a missing vertex, so any of these fails the whole window.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconstructionError {
    /// The record carries no history at all for a referenced point.
    #[error("no history recorded for point {point}")]
    MissingTimeline { point: PointId },

    /// The point's history has no position-bearing version usable for the window.
    #[error("point {point} has no resolvable position (likely redacted)")]
    UnresolvablePoint { point: PointId },
}

impl ReconstructionError {
    pub fn point(&self) -> PointId {
        match self {
            ReconstructionError::MissingTimeline { point }
            | ReconstructionError::UnresolvablePoint { point } => *point,
        }
    }
}
