//! Property-based tests for listener aggregation
//!
//! Validates aggregation invariants:
//! - A lone in-range listener hears the source exactly where it is
//! - Mirrored listeners centre the pan
//! - Listener order does not matter
//! - Walking a listener towards a source never makes it quieter
//! - Sources out of everyone's range render at or beyond the limit
//! - No listeners means no change
//!
//! These properties must hold for all listener layouts.

use glam::Vec3;
use proptest::prelude::*;
use splitear_audio::{aggregate_offset, compute_rendered_position, DistanceLimit};
use splitear_core::Pose;

const LIMIT: f32 = 20.0;
const EPS: f32 = 1e-3;

fn limit() -> DistanceLimit {
    DistanceLimit::new(LIMIT).expect("valid limit")
}

fn coord() -> impl Strategy<Value = f32> {
    -60.0f32..60.0
}

fn point() -> impl Strategy<Value = Vec3> {
    (coord(), coord(), coord()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn pose() -> impl Strategy<Value = Pose> {
    (point(), -std::f32::consts::PI..std::f32::consts::PI)
        .prop_map(|(position, yaw)| Pose::facing_yaw(position, yaw))
}

proptest! {
    /// Property: one listener inside the limit keeps its own local offset
    #[test]
    fn single_listener_reduction(
        listener in pose(),
        direction in point(),
        distance in 0.5f32..(LIMIT - 0.5),
    ) {
        prop_assume!(direction.length() > 0.1);
        let source = listener.position + direction.normalize() * distance;

        let offset = aggregate_offset(&[listener], source, limit()).expect("one listener");
        let expected = listener.to_local(source);

        prop_assert!(
            (offset - expected).length() < EPS,
            "offset {:?} differs from local offset {:?}", offset, expected
        );
    }

    /// Property: listeners mirrored across the source's X plane centre the pan,
    /// including when they sit level with it and their contributions cancel
    #[test]
    fn mirrored_listeners_pan_to_centre(
        source in point(),
        half_gap in 0.5f32..12.0,
        depth in prop_oneof![Just(0.0f32), 0.5f32..10.0],
        height in prop_oneof![Just(0.0f32), -2.0f32..-0.25, 0.25f32..2.0],
    ) {
        let left = Pose::at(source + Vec3::new(-half_gap, height, -depth));
        let right = Pose::at(source + Vec3::new(half_gap, height, -depth));

        let offset = aggregate_offset(&[left, right], source, limit()).expect("two listeners");
        let swapped = aggregate_offset(&[right, left], source, limit()).expect("two listeners");

        prop_assert!(
            offset.x.abs() < EPS * offset.length().max(1.0),
            "pan not centred: {:?}", offset
        );
        prop_assert_eq!(offset, swapped);
    }

    /// Property: listener order never changes where a source is rendered
    #[test]
    fn listener_order_is_irrelevant(
        source in point(),
        listeners in prop::collection::vec(pose(), 1..5),
        anchor in point(),
    ) {
        let mut reversed = listeners.clone();
        reversed.reverse();

        let forward = compute_rendered_position(&listeners, source, limit(), anchor);
        let backward = compute_rendered_position(&reversed, source, limit(), anchor);

        prop_assert!(
            (forward - backward).length() < EPS * (forward - anchor).length().max(1.0),
            "order changed the result: {:?} vs {:?}", forward, backward
        );
    }

    /// Property: moving one listener strictly closer never increases the output distance
    #[test]
    fn closer_listener_is_never_quieter(
        source in point(),
        mover in pose(),
        others in prop::collection::vec(pose(), 0..4),
        fraction in 0.05f32..0.95,
    ) {
        let closer = Pose {
            position: source + (mover.position - source) * fraction,
            ..mover
        };

        let mut before = vec![mover];
        before.extend(others.iter().copied());
        let mut after = vec![closer];
        after.extend(others.iter().copied());

        let far = aggregate_offset(&before, source, limit()).expect("listeners").length();
        let near = aggregate_offset(&after, source, limit()).expect("listeners").length();

        prop_assert!(near <= far + EPS, "moved closer but distance grew: {} -> {}", far, near);
    }

    /// Property: a source out of every listener's range renders at or beyond the limit
    #[test]
    fn out_of_range_source_stays_inaudible(
        source in point(),
        directions in prop::collection::vec(point(), 1..5),
        extra in 0.1f32..40.0,
        anchor in point(),
    ) {
        prop_assume!(directions.iter().all(|d| d.length() > 0.1));
        let listeners: Vec<Pose> = directions
            .iter()
            .map(|d| Pose::at(source + d.normalize() * (LIMIT + extra)))
            .collect();

        let rendered = compute_rendered_position(&listeners, source, limit(), anchor);

        prop_assert!(rendered.is_finite());
        prop_assert!(
            (rendered - anchor).length() >= LIMIT - EPS,
            "rendered {:?} is audible from {:?}", rendered, anchor
        );
    }

    /// Property: with no listeners the nominal position comes back untouched
    #[test]
    fn no_listeners_is_passthrough(source in point(), anchor in point()) {
        prop_assert_eq!(compute_rendered_position(&[], source, limit(), anchor), source);
    }

    /// Property: the output distance is the closest listener's distance while anyone is in range
    #[test]
    fn distance_follows_closest_listener(
        source in point(),
        listeners in prop::collection::vec(pose(), 1..5),
    ) {
        let closest = listeners
            .iter()
            .map(|l| l.position.distance(source))
            .fold(f32::INFINITY, f32::min);
        prop_assume!(closest < LIMIT);

        let offset = aggregate_offset(&listeners, source, limit()).expect("listeners");

        prop_assert!(
            (offset.length() - closest).abs() < EPS * closest.max(1.0),
            "offset length {} != closest distance {}", offset.length(), closest
        );
    }
}
