//! Folding several virtual listeners into one physical listener.
//!
//! The host mixer only knows a single listener, parked at a fixed anchor. To
//! make one source sound right for every virtual listener at once, the source
//! is re-placed around that anchor each tick:
//!
//! - its *direction* is a proximity-weighted blend of where the source sits in
//!   each listener's local frame, so panning reflects a consensus biased
//!   towards whoever is closest;
//! - its *distance* is the distance to the closest listener, so walking any
//!   listener towards a source always makes it louder in the shared mix.

use glam::Vec3;
use splitear_core::{Pose, FORWARD};

use crate::DistanceLimit;

/// Blended directions shorter than this fraction of the closest distance are
/// treated as cancelled.
const CANCELLATION_TOLERANCE: f32 = 1e-4;

/// Absolute position to render a source at, given every listener's pose.
///
/// Returns `source` unchanged when `listeners` is empty. Otherwise the result
/// is `anchor` plus the offset from [`aggregate_offset`].
pub fn compute_rendered_position(
    listeners: &[Pose],
    source: Vec3,
    distance_limit: DistanceLimit,
    anchor: Vec3,
) -> Vec3 {
    match aggregate_offset(listeners, source, distance_limit) {
        Some(offset) => anchor + offset,
        None => source,
    }
}

/// Offset from the physical listener that best represents `source` for all
/// `listeners`, or `None` when there are no listeners.
///
/// Each listener contributes its local-frame offset to the source, weighted by
/// `(L² - d²)`, and only while it is inside the limit `L`. The blended
/// direction is rescaled to the closest listener's distance.
///
/// Degenerate blends (contributions cancelling out, or nobody in range) fall
/// back to [`FORWARD`], which keeps mirrored listeners centred and does not
/// depend on listener order:
/// - closest listener beyond the limit: scaled to the limit, which the linear
///   rolloff renders silent;
/// - otherwise: scaled to the closest listener's distance.
pub fn aggregate_offset(
    listeners: &[Pose],
    source: Vec3,
    distance_limit: DistanceLimit,
) -> Option<Vec3> {
    if listeners.is_empty() {
        return None;
    }
    let limit_sq = distance_limit.squared();

    let mut closest_sq = f32::INFINITY;
    let mut weighted = Vec3::ZERO;
    let mut weight_sum = 0.0f32;

    for listener in listeners {
        let local = listener.to_local(source);
        let dist_sq = local.length_squared();
        closest_sq = closest_sq.min(dist_sq);

        let headroom = limit_sq - dist_sq;
        let weight = headroom / limit_sq;
        if weight > 0.0 {
            weighted += local * headroom;
            weight_sum += weight;
        }
    }

    let direction = if weight_sum == 0.0 {
        weighted
    } else {
        weighted / weight_sum
    };

    let closest = closest_sq.sqrt();
    // Rounding residue from mirrored listeners counts as a full cancellation.
    let cancelled = direction.length() <= closest * CANCELLATION_TOLERANCE;
    let offset = match direction.try_normalize() {
        Some(unit) if !cancelled => unit * closest,
        _ if closest_sq > limit_sq => FORWARD * distance_limit.get(),
        _ => FORWARD * closest,
    };
    Some(offset)
}
