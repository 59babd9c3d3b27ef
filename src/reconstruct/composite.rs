/// Placeholder history builder for composite (relation) features
///
/// Member histories are not replayed: every major version is assigned the
/// feature's current head geometry. This keeps one output entry per major
/// version for downstream consumers without claiming historical accuracy.

use super::assembler::{assemble, WindowGeometry};
use super::{GeometryHistoryBuilder, Reconstruction};
use crate::history::{FeatureKind, FeatureMajorVersion, Geometry};
use serde_json::Value;

pub struct CompositeHistoryBuilder<'a> {
    history: &'a [FeatureMajorVersion],
    current_geometry: &'a Value,
}

impl<'a> CompositeHistoryBuilder<'a> {
    pub fn new(history: &'a [FeatureMajorVersion], current_geometry: &'a Value) -> Self {
        Self {
            history,
            current_geometry,
        }
    }
}

impl GeometryHistoryBuilder for CompositeHistoryBuilder<'_> {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Composite
    }

    fn build(&self) -> Reconstruction {
        assemble(self.history, |_| {
            Some(Ok(WindowGeometry::fixed(Geometry::Raw(
                self.current_geometry.clone(),
            ))))
        })
    }
}
