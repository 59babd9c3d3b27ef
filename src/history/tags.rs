/// Running attribute snapshots folded from per-version diffs

use super::types::{AttributeDiff, FeatureMajorVersion};
use indexmap::IndexMap;

/// Full attribute set of a feature at one major version, in insertion order.
pub type Attributes = IndexMap<String, String>;

/// Apply one version's diffs to `base`: additions, then modifications, then deletions.
pub fn apply(mut base: Attributes, version: &FeatureMajorVersion) -> Attributes {
    for diff in &version.diffs {
        if let AttributeDiff::Added { key, value } = diff {
            base.insert(key.clone(), value.clone());
        }
    }
    for diff in &version.diffs {
        if let AttributeDiff::Modified { key, new, .. } = diff {
            base.insert(key.clone(), new.clone());
        }
    }
    for diff in &version.diffs {
        if let AttributeDiff::Deleted { key } = diff {
            base.shift_remove(key);
        }
    }
    base
}

/// Folds diffs across a feature's major versions in ascending order.
#[derive(Debug, Default, Clone)]
pub struct TagDiffAccumulator {
    current: Attributes,
}

impl TagDiffAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to `version` and return the resulting snapshot.
    pub fn advance(&mut self, version: &FeatureMajorVersion) -> &Attributes {
        let base = std::mem::take(&mut self.current);
        self.current = apply(base, version);
        &self.current
    }

    pub fn current(&self) -> &Attributes {
        &self.current
    }
}
