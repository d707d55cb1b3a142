#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod pose;

use serde::{Deserialize, Serialize};

pub use pose::{Pose, FORWARD, RIGHT, UP};

/// Simulation rate in ticks per second.
pub const TICKS_PER_SECOND: u64 = 20;

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }

    /// Elapsed simulated time since [`SimTick::ZERO`], in seconds.
    pub fn seconds(self) -> f32 {
        self.0 as f32 / TICKS_PER_SECOND as f32
    }
}
