/// Per-point candidate selection for a validity window
///
/// Given every known version of one point, picks the position snapshots that
/// can be in force while a major version of the referencing feature is valid.

use super::CHANGESET_GRACE;
use crate::history::{ChangesetId, PointVersion, Position, Timestamp, ValidityWindow};

/// A position-bearing point version selected for a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate<'a> {
    pub version: &'a PointVersion,
    pub position: Position,
}

impl<'a> Candidate<'a> {
    fn from_version(version: &'a PointVersion) -> Option<Self> {
        version.position.map(|position| Self { version, position })
    }

    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.version.timestamp
    }

    #[inline]
    pub fn changeset(&self) -> ChangesetId {
        self.version.changeset
    }
}

/// Stateless resolver; identical inputs always produce identical candidates.
pub struct PointVersionResolver;

impl PointVersionResolver {
    /// Resolve the chronologically ordered candidates of one point for `window`.
    ///
    /// `pinned` is the changeset of the major version being reconstructed:
    /// versions from that changeset are kept regardless of their timestamp.
    /// Returns `None` when the point has no usable geometry for the window.
    /// A returned list is never empty.
    pub fn resolve<'a>(
        timeline: &'a [PointVersion],
        window: ValidityWindow,
        pinned: ChangesetId,
    ) -> Option<Vec<Candidate<'a>>> {
        let mut versions: Vec<Candidate<'a>> = timeline
            .iter()
            .filter_map(Candidate::from_version)
            .collect();
        versions.sort_by_key(|c| (c.timestamp(), c.changeset()));

        match versions.len() {
            0 => return None,
            1 => return Some(versions),
            _ => {}
        }

        let earliest = versions[0];
        let mut prev_candidate = None;

        let mut candidates = match window.since {
            Some(since) => {
                let (mut in_window, before): (Vec<Candidate<'a>>, Vec<Candidate<'a>>) = versions
                    .into_iter()
                    .partition(|c| c.changeset() == pinned || c.timestamp() >= since);
                prev_candidate = before.last().copied();

                if in_window.is_empty() {
                    return prev_candidate.map(|c| vec![c]);
                }

                // Keep the boundary state when the window opens well after the last change
                if let Some(prev) = prev_candidate {
                    if in_window[0].timestamp() > since + CHANGESET_GRACE {
                        in_window.insert(0, prev);
                    }
                }
                in_window
            }
            None => versions,
        };

        if let Some(until) = window.until {
            candidates.retain(|c| c.timestamp() < until || c.changeset() == pinned);

            if candidates.is_empty() {
                // Likely a later deletion that is not part of this history
                let fallback = match window.since {
                    Some(_) => prev_candidate,
                    None => Some(earliest),
                };
                return fallback.map(|c| vec![c]);
            }
        }

        candidates.dedup_by(|later, earlier| later.position == earlier.position);
        Some(candidates)
    }
}
