//! Listener poses and the workspace axis convention.
//!
//! Left-handed axes: an identity orientation faces `+Z`, with `+Y` up and `+X`
//! to the right. Positive yaw turns right, about `+Y`.

use glam::{Quat, Vec3};

/// Direction an unrotated pose faces.
pub const FORWARD: Vec3 = Vec3::Z;

/// Up axis shared by every pose.
pub const UP: Vec3 = Vec3::Y;

/// Right-hand side of an unrotated pose.
pub const RIGHT: Vec3 = Vec3::X;

/// Position and orientation of a point of hearing.
///
/// `orientation` is expected to be a unit quaternion. Constructors in this
/// module always produce one; [`Pose::new`] normalizes whatever it is given.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// World-space position.
    pub position: Vec3,
    /// World-space rotation applied to [`FORWARD`]. Should be unit length;
    /// [`Pose::to_local`] normalizes it before use.
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    /// Pose at the origin facing [`FORWARD`].
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// Create a pose, normalizing the orientation.
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation: orientation.normalize(),
        }
    }

    /// Unrotated pose at `position`.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Pose at `position` turned `yaw` radians about [`UP`].
    pub fn facing_yaw(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            orientation: Quat::from_rotation_y(yaw),
        }
    }

    /// Yaw-only pose at `position` facing `target`.
    ///
    /// Falls back to the identity orientation when `target` is directly above,
    /// below, or on top of `position`.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let delta = target - position;
        if delta.x == 0.0 && delta.z == 0.0 {
            return Self::at(position);
        }
        Self::facing_yaw(position, delta.x.atan2(delta.z))
    }

    /// World-space direction this pose faces.
    pub fn forward(&self) -> Vec3 {
        self.orientation * FORWARD
    }

    /// Express `world_point` relative to this pose, in its local frame.
    pub fn to_local(&self, world_point: Vec3) -> Vec3 {
        self.orientation.normalize().inverse() * (world_point - self.position)
    }
}
