/// History builder for single-point features
///
/// A point's geometry is carried on its own version records, so every major
/// version maps to exactly one geometry and there are no minor versions.

use super::assembler::{assemble, WindowGeometry};
use super::{GeometryHistoryBuilder, Reconstruction};
use crate::history::{FeatureKind, FeatureMajorVersion, Geometry};

pub struct PointHistoryBuilder<'a> {
    history: &'a [FeatureMajorVersion],
}

impl<'a> PointHistoryBuilder<'a> {
    pub fn new(history: &'a [FeatureMajorVersion]) -> Self {
        Self { history }
    }
}

impl GeometryHistoryBuilder for PointHistoryBuilder<'_> {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Point
    }

    fn build(&self) -> Reconstruction {
        assemble(self.history, |major| {
            // Deleted versions carry no position and are skipped
            let position = major.version.position?;
            Some(Ok(WindowGeometry::fixed(Geometry::Point(position))))
        })
    }
}
