/// Property tests over randomly generated line histories
use proptest::prelude::*;
use wayback::history::{
    FeatureMajorVersion, HistoricalGeometries, PointId, PointTimelines, PointVersion, Position,
    ValidityWindow,
};
use wayback::reconstruct::{PointVersionResolver, CHANGESET_GRACE};
use wayback::{reconstruct_line, ProcessingStats};

fn point_version() -> impl Strategy<Value = PointVersion> {
    (0i64..5_000, 1i64..20, prop::option::weighted(0.9, (0i32..4, 0i32..4))).prop_map(
        |(t, c, position)| {
            PointVersion::new(
                t,
                c,
                position.map(|(x, y)| Position::new(x as f64, y as f64)),
            )
            .with_user(format!("u{}", c), c)
        },
    )
}

fn timeline() -> impl Strategy<Value = Vec<PointVersion>> {
    prop::collection::vec(point_version(), 1..5).prop_map(|mut versions| {
        versions.sort_by_key(|v| (v.timestamp, v.changeset));
        versions.dedup_by_key(|v| (v.timestamp, v.changeset));
        versions
    })
}

fn line_history() -> impl Strategy<Value = (PointTimelines, Vec<FeatureMajorVersion>)> {
    let timelines = prop::collection::vec(timeline(), 1..5);
    let majors = prop::collection::vec((1i64..2_000, 1i64..20, prop::collection::vec(0usize..5, 2..6)), 1..4);

    (timelines, majors).prop_map(|(timelines, majors)| {
        let points = timelines.len();
        let timelines: PointTimelines = timelines
            .into_iter()
            .enumerate()
            .map(|(id, timeline)| (id as PointId, timeline))
            .collect();

        let mut t = 0;
        let history = majors
            .into_iter()
            .enumerate()
            .map(|(i, (gap, c, refs))| {
                t += gap;
                FeatureMajorVersion::new(i as u32 + 1, t, c)
                    .with_point_refs(refs.into_iter().map(|r| (r % points) as PointId).collect())
            })
            .collect();

        (timelines, history)
    })
}

fn check_chains(
    geometries: &HistoricalGeometries,
    history: &[FeatureMajorVersion],
) -> Result<(), TestCaseError> {
    for (idx, major) in history.iter().enumerate() {
        let Some(entries) = geometries.get(&major.version) else {
            continue;
        };
        let next = history.get(idx + 1).map(|v| v.timestamp);
        let refs = major.point_refs.as_ref().map_or(0, Vec::len);

        prop_assert!(!entries.is_empty());
        prop_assert_eq!(entries[0].valid_since, major.timestamp);
        prop_assert_eq!(entries[0].changeset, major.changeset);

        for (k, entry) in entries.iter().enumerate() {
            prop_assert_eq!(entry.minor_version as usize, k);
            prop_assert_eq!(entry.geometry.line_coordinates().map(|c| c.len()), Some(refs));
            if let Some(until) = entry.valid_until {
                prop_assert!(entry.valid_since <= until);
            }
        }
        for pair in entries.windows(2) {
            prop_assert_eq!(pair[0].valid_until, Some(pair[1].valid_since));
            prop_assert_ne!(pair[0].changeset, pair[1].changeset);
        }
        prop_assert_eq!(entries.last().and_then(|e| e.valid_until), next);
    }
    Ok(())
}

proptest! {
    #[test]
    fn property_validity_chains_are_gap_free((timelines, history) in line_history()) {
        let reconstruction = reconstruct_line(&timelines, &history);
        check_chains(&reconstruction.geometries, &history)?;

        // Every major version is either reconstructed or reported
        for major in &history {
            let reconstructed = reconstruction.geometries.contains_key(&major.version);
            let unresolved = reconstruction.unresolved.contains_key(&major.version);
            prop_assert!(reconstructed != unresolved);
        }
    }

    #[test]
    fn property_reconstruction_ignores_timeline_order((timelines, history) in line_history()) {
        let reversed: PointTimelines = timelines
            .iter()
            .map(|(id, versions)| (*id, versions.iter().rev().cloned().collect()))
            .collect();

        prop_assert_eq!(
            reconstruct_line(&timelines, &history),
            reconstruct_line(&reversed, &history)
        );
    }

    #[test]
    fn property_resolver_output_is_chronological_and_deduplicated(
        versions in timeline(),
        since in prop::option::of(0i64..5_000),
        length in 0i64..3_000,
        pinned in 1i64..20,
    ) {
        let window = ValidityWindow::new(since, since.map(|s| s + CHANGESET_GRACE + length));
        let has_position = versions.iter().any(|v| v.position.is_some());

        match PointVersionResolver::resolve(&versions, window, pinned) {
            // Without an explicit start, a positioned point always resolves
            None => prop_assert!(!has_position || since.is_some()),
            Some(candidates) => {
                prop_assert!(!candidates.is_empty());
                for pair in candidates.windows(2) {
                    prop_assert!(pair[0].timestamp() <= pair[1].timestamp());
                    prop_assert_ne!(pair[0].position, pair[1].position);
                }
            }
        }
    }

    #[test]
    fn property_stats_merge_is_commutative(
        a in prop::array::uniform10(0u64..1_000),
        b in prop::array::uniform10(0u64..1_000),
    ) {
        let stats = |v: [u64; 10]| ProcessingStats {
            lines_processed: v[0],
            no_history: v[1],
            parse_errors: v[2],
            builders_undefined: v[3],
            unresolved_versions: v[4],
            total_geometries: v[5],
            encoding_failures: v[6],
            every_geometry_bytes: v[7],
            history_object_bytes: v[8],
            topology_bytes: v[9],
        };

        prop_assert_eq!(stats(a).merge(stats(b)), stats(b).merge(stats(a)));
        prop_assert_eq!(stats(a).merge(ProcessingStats::default()), stats(a));
    }
}
