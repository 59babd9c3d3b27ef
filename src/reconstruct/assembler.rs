/// Major-version assembly shared by every history builder
///
/// Computes each major version's validity window, invokes the builder for it
/// and stitches the resulting baseline and minor changes into a gap-free
/// validity chain.

use super::{Reconstruction, ReconstructionError, CHANGESET_GRACE};
use crate::history::{
    ChangesetId, FeatureMajorVersion, Geometry, MinorVersionGeometry, Timestamp, UserId,
    ValidityWindow,
};
use crate::utils::format::format_timestamp;
use tracing::{debug, warn};

/// One major version together with the window its geometry is resolved in.
#[derive(Debug, Clone, Copy)]
pub struct MajorWindow<'h> {
    pub version: &'h FeatureMajorVersion,
    /// Resolution window: unbounded start for the first version, grace-trimmed end.
    pub window: ValidityWindow,
    /// True timestamp of the following major version.
    pub next_timestamp: Option<Timestamp>,
}

/// Windows for every major version, in history order.
pub fn major_windows(history: &[FeatureMajorVersion]) -> impl Iterator<Item = MajorWindow<'_>> {
    history.iter().enumerate().map(move |(i, version)| {
        let next_timestamp = history.get(i + 1).map(|next| next.timestamp);
        let since = (i > 0).then_some(version.timestamp);
        let until = next_timestamp.map(|t| t - CHANGESET_GRACE);

        MajorWindow {
            version,
            window: ValidityWindow::new(since, until),
            next_timestamp,
        }
    })
}

/// A geometry change detected inside a major version's window.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryChange {
    pub changeset: ChangesetId,
    pub valid_since: Timestamp,
    pub user: String,
    pub uid: UserId,
    pub geometry: Geometry,
}

/// Builder output for one window: the baseline plus changes in ascending time.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowGeometry {
    pub baseline: Geometry,
    pub changes: Vec<GeometryChange>,
}

impl WindowGeometry {
    /// A geometry that stays fixed for the whole window.
    pub fn fixed(geometry: Geometry) -> Self {
        Self {
            baseline: geometry,
            changes: Vec::new(),
        }
    }
}

/// Turn a window's baseline and changes into chained minor versions.
///
/// Changes that do not start after the major version itself are folded into
/// the baseline, so `valid_since` never decreases along the chain.
pub fn chain(major: &MajorWindow<'_>, built: WindowGeometry) -> Vec<MinorVersionGeometry> {
    let version = major.version;

    let mut baseline = built.baseline;
    let mut changes = Vec::with_capacity(built.changes.len());
    for change in built.changes {
        if change.valid_since <= version.timestamp {
            baseline = change.geometry;
        } else {
            changes.push(change);
        }
    }

    let boundaries: Vec<Timestamp> = changes.iter().map(|c| c.valid_since).collect();
    let mut entries = Vec::with_capacity(changes.len() + 1);

    entries.push(MinorVersionGeometry {
        major_version: version.version,
        minor_version: 0,
        geometry: baseline,
        valid_since: version.timestamp,
        valid_until: boundaries.first().copied().or(major.next_timestamp),
        changeset: version.changeset,
        user: version.user.clone(),
        uid: version.uid,
    });

    for (k, change) in changes.into_iter().enumerate() {
        entries.push(MinorVersionGeometry {
            major_version: version.version,
            minor_version: k as u32 + 1,
            geometry: change.geometry,
            valid_since: change.valid_since,
            valid_until: boundaries.get(k + 1).copied().or(major.next_timestamp),
            changeset: change.changeset,
            user: change.user,
            uid: change.uid,
        });
    }

    entries
}

/// Run `build` for every major version and collect the chained results.
///
/// `build` returns `None` for versions with nothing to draw, which are skipped.
/// A failed window is recorded and assembly continues with the next version.
pub fn assemble<F>(history: &[FeatureMajorVersion], mut build: F) -> Reconstruction
where
    F: FnMut(&MajorWindow<'_>) -> Option<Result<WindowGeometry, ReconstructionError>>,
{
    let mut reconstruction = Reconstruction::default();

    for major in major_windows(history) {
        let number = major.version.version;
        debug!(
            version = number,
            changeset = major.version.changeset,
            window = %major.window,
            timestamp = %format_timestamp(major.version.timestamp),
            "building major version"
        );

        match build(&major) {
            None => debug!(version = number, "no geometry input, skipping"),
            Some(Ok(geometry)) => {
                reconstruction
                    .geometries
                    .insert(number, chain(&major, geometry));
            }
            Some(Err(err)) => {
                warn!(
                    version = number,
                    changeset = major.version.changeset,
                    error = %err,
                    "major version could not be reconstructed"
                );
                reconstruction.unresolved.insert(number, err);
            }
        }
    }

    reconstruction
}
