//! Volume controls for environmental playback.

use serde::{Deserialize, Serialize};

/// Volume settings applied on top of distance rolloff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Master volume (0.0 to 1.0)
    pub master: f32,
    /// Environmental sources volume (0.0 to 1.0)
    pub ambient: f32,
    /// Whether audio is muted
    pub muted: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master: 1.0,
            ambient: 0.7,
            muted: false,
        }
    }
}

impl AudioSettings {
    /// Create new audio settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the effective ambient volume (master * ambient).
    pub fn effective_ambient_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master * self.ambient
        }
    }

    /// Toggle mute state.
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Set master volume (clamped to 0.0-1.0).
    pub fn set_master(&mut self, volume: f32) {
        self.master = volume.clamp(0.0, 1.0);
    }

    /// Set ambient volume (clamped to 0.0-1.0).
    pub fn set_ambient(&mut self, volume: f32) {
        self.ambient = volume.clamp(0.0, 1.0);
    }
}
