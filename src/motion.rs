//! Scripted listener motion for headless scenes.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use splitear_core::{Pose, SimTick};
use std::f32::consts::TAU;

/// How a listener moves through a scene, sampled once per tick.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Motion {
    /// Stand still, turned `yaw_degrees` to the right of +Z.
    Static {
        position: [f32; 3],
        #[serde(default)]
        yaw_degrees: f32,
    },
    /// Circle `center` on the horizontal plane, always facing it.
    Orbit {
        center: [f32; 3],
        radius: f32,
        period_ticks: u64,
        #[serde(default)]
        phase_degrees: f32,
    },
    /// Walk back and forth between two points, facing the way of travel.
    Patrol {
        from: [f32; 3],
        to: [f32; 3],
        period_ticks: u64,
    },
}

impl Motion {
    /// Pose at `tick`. Deterministic for a given tick.
    pub fn pose_at(&self, tick: SimTick) -> Pose {
        match self {
            Motion::Static {
                position,
                yaw_degrees,
            } => Pose::facing_yaw(Vec3::from(*position), yaw_degrees.to_radians()),
            Motion::Orbit {
                center,
                radius,
                period_ticks,
                phase_degrees,
            } => {
                let center = Vec3::from(*center);
                let angle = phase_degrees.to_radians() + TAU * cycle_fraction(tick, *period_ticks);
                let position = center + Vec3::new(angle.sin(), 0.0, angle.cos()) * *radius;
                Pose::looking_at(position, center)
            }
            Motion::Patrol {
                from,
                to,
                period_ticks,
            } => {
                let (from, to) = (Vec3::from(*from), Vec3::from(*to));
                let t = cycle_fraction(tick, *period_ticks);
                let (along, heading) = if t < 0.5 {
                    (t * 2.0, to - from)
                } else {
                    (2.0 - t * 2.0, from - to)
                };
                let position = from.lerp(to, along);
                Pose::looking_at(position, position + heading)
            }
        }
    }
}

/// Fraction of the way through a `period_ticks` cycle, in `[0, 1)`.
fn cycle_fraction(tick: SimTick, period_ticks: u64) -> f32 {
    let period = period_ticks.max(1);
    (tick.0 % period) as f32 / period as f32
}
