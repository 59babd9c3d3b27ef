/// Line history reconstruction from referenced point timelines
///
/// A line's shape changes whenever one of its points moves, even if the line
/// itself was not edited. For each major-version window this module resolves
/// every referenced point, groups the candidate point edits by changeset and
/// emits one minor version per surviving changeset.

use super::assembler::{assemble, GeometryChange, MajorWindow, WindowGeometry};
use super::resolver::{Candidate, PointVersionResolver};
use super::{GeometryHistoryBuilder, Reconstruction, ReconstructionError, MINOR_MERGE_WINDOW};
use crate::history::{
    ChangesetId, FeatureKind, FeatureMajorVersion, Geometry, PointId, PointTimelines, Position,
    Timestamp, UserId, ValidityWindow,
};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// A geometry change inferred from point edits inside one window.
#[derive(Debug, Clone, PartialEq)]
pub struct MinorVersionCandidate {
    /// 1-based position within the window.
    pub minor_version: u32,
    pub changeset: ChangesetId,
    pub valid_since: Timestamp,
    pub user: String,
    pub uid: UserId,
    pub coordinates: Vec<Position>,
}

impl MinorVersionCandidate {
    fn into_change(self) -> GeometryChange {
        GeometryChange {
            changeset: self.changeset,
            valid_since: self.valid_since,
            user: self.user,
            uid: self.uid,
            geometry: Geometry::LineString(self.coordinates),
        }
    }
}

/// Baseline and minor versions of one major-version window.
#[derive(Debug, Clone, PartialEq)]
pub struct LineWindow {
    pub baseline: Vec<Position>,
    pub minors: Vec<MinorVersionCandidate>,
}

/// Time span and author of one changeset's point edits.
#[derive(Debug, Clone)]
struct ChangesetSpan<'a> {
    min_t: Timestamp,
    max_t: Timestamp,
    user: &'a str,
    uid: UserId,
}

impl<'a> ChangesetSpan<'a> {
    fn new(candidate: &Candidate<'a>) -> Self {
        Self {
            min_t: candidate.timestamp(),
            max_t: candidate.timestamp(),
            user: &candidate.version.user,
            uid: candidate.version.uid,
        }
    }

    fn include(&mut self, t: Timestamp) {
        self.min_t = self.min_t.min(t);
        self.max_t = self.max_t.max(t);
    }
}

/// Resolves line windows against the point timelines of one record.
pub struct LineHistoryReconstructor<'a> {
    timelines: &'a PointTimelines,
}

impl<'a> LineHistoryReconstructor<'a> {
    pub fn new(timelines: &'a PointTimelines) -> Self {
        Self { timelines }
    }

    /// Reconstruct the baseline and minor versions for one major-version window.
    pub fn reconstruct_window(
        &self,
        point_refs: &[PointId],
        window: ValidityWindow,
        major_changeset: ChangesetId,
    ) -> Result<LineWindow, ReconstructionError> {
        let mut candidates: Vec<Vec<Candidate<'a>>> = Vec::with_capacity(point_refs.len());

        for &point in point_refs {
            let timeline = self
                .timelines
                .get(&point)
                .ok_or(ReconstructionError::MissingTimeline { point })?;
            let resolved = PointVersionResolver::resolve(timeline, window, major_changeset)
                .ok_or(ReconstructionError::UnresolvablePoint { point })?;
            trace!(point, candidates = resolved.len(), "resolved point");
            candidates.push(resolved);
        }

        // Resolver output is never empty
        let baseline: Vec<Position> = candidates.iter().map(|c| c[0].position).collect();

        if candidates.iter().all(|c| c.len() <= 1) {
            return Ok(LineWindow {
                baseline,
                minors: Vec::new(),
            });
        }

        let changesets = minor_changesets(&candidates, window, major_changeset);
        debug!(
            window = %window,
            points = point_refs.len(),
            minors = changesets.len(),
            "detected minor changesets"
        );

        let minors = changesets
            .into_iter()
            .enumerate()
            .map(|(idx, (changeset, span))| MinorVersionCandidate {
                minor_version: idx as u32 + 1,
                changeset,
                valid_since: span.max_t,
                user: span.user.to_string(),
                uid: span.uid,
                coordinates: candidates
                    .iter()
                    .map(|point| position_at(point, changeset, span.max_t))
                    .collect(),
            })
            .collect();

        Ok(LineWindow { baseline, minors })
    }
}

/// Changesets that produce a visible change inside the window, in ascending time.
///
/// Only points with more than one candidate contribute. A single-candidate
/// point is fixed for the whole window, so its changeset never opens a minor
/// version even when it falls inside the window.
fn minor_changesets<'a>(
    candidates: &[Vec<Candidate<'a>>],
    window: ValidityWindow,
    major_changeset: ChangesetId,
) -> Vec<(ChangesetId, ChangesetSpan<'a>)> {
    // Ordered map keeps grouping independent of hash iteration order
    let mut spans: BTreeMap<ChangesetId, ChangesetSpan<'a>> = BTreeMap::new();
    for point in candidates.iter().filter(|c| c.len() > 1) {
        for candidate in point {
            spans
                .entry(candidate.changeset())
                .and_modify(|span| span.include(candidate.timestamp()))
                .or_insert_with(|| ChangesetSpan::new(candidate));
        }
    }

    // The major version's own edits are already the baseline
    spans.remove(&major_changeset);
    if let Some(since) = window.since {
        spans.retain(|_, span| span.max_t >= since);
    }

    let mut ordered: Vec<(ChangesetId, ChangesetSpan<'a>)> = spans.into_iter().collect();
    ordered.sort_by_key(|(id, span)| (span.max_t, *id));

    let mut survivors: Vec<(ChangesetId, ChangesetSpan<'a>)> = Vec::with_capacity(ordered.len());
    for (id, span) in ordered {
        let collapse = survivors
            .last()
            .map_or(false, |(_, prev)| span.max_t - prev.max_t < MINOR_MERGE_WINDOW);
        if collapse {
            if let Some((prev_id, prev)) = survivors.pop() {
                trace!(
                    collapsed = prev_id,
                    into = id,
                    span_start = prev.min_t.min(span.min_t),
                    "merging near-simultaneous changesets"
                );
            }
        }
        survivors.push((id, span));
    }

    survivors
}

/// Best-known position of one point when `changeset` closed at `max_t`.
fn position_at(candidates: &[Candidate<'_>], changeset: ChangesetId, max_t: Timestamp) -> Position {
    if candidates.len() == 1 {
        return candidates[0].position;
    }
    if let Some(own) = candidates.iter().find(|c| c.changeset() == changeset) {
        return own.position;
    }
    candidates
        .iter()
        .take_while(|c| c.timestamp() <= max_t)
        .last()
        .unwrap_or(&candidates[0])
        .position
}

/// History builder for line and area features.
pub struct LineHistoryBuilder<'a> {
    history: &'a [FeatureMajorVersion],
    reconstructor: LineHistoryReconstructor<'a>,
}

impl<'a> LineHistoryBuilder<'a> {
    pub fn new(timelines: &'a PointTimelines, history: &'a [FeatureMajorVersion]) -> Self {
        Self {
            history,
            reconstructor: LineHistoryReconstructor::new(timelines),
        }
    }

    fn build_window(&self, major: &MajorWindow<'_>) -> Option<Result<WindowGeometry, ReconstructionError>> {
        let refs = major.version.drawable_refs()?;
        let result = self
            .reconstructor
            .reconstruct_window(refs, major.window, major.version.changeset)
            .map(|line| WindowGeometry {
                baseline: Geometry::LineString(line.baseline),
                changes: line
                    .minors
                    .into_iter()
                    .map(MinorVersionCandidate::into_change)
                    .collect(),
            });
        Some(result)
    }
}

impl GeometryHistoryBuilder for LineHistoryBuilder<'_> {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Line
    }

    fn build(&self) -> Reconstruction {
        assemble(self.history, |major| self.build_window(major))
    }
}
