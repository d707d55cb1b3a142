//! The seam between the aggregator and whatever actually plays sound.

use anyhow::Result;
use glam::Vec3;

use crate::SourceHandle;

/// Playback capabilities the per-tick driver needs from an audio engine.
///
/// Implementations own distance attenuation and panning; the driver only
/// tells them where each source should be heard from.
pub trait SpatialPlayback {
    /// Whether `source` is currently producing sound.
    fn is_playing(&self, source: SourceHandle) -> bool;

    /// Start looping playback of `source` at its last written position.
    fn play(&mut self, source: SourceHandle) -> Result<()>;

    /// Move `source` to `position`, relative to the physical listener anchor.
    fn set_position(&mut self, source: SourceHandle, position: Vec3);
}

/// Linear rolloff: full volume at the listener, silent at `max_distance`.
pub fn linear_rolloff_gain(distance: f32, max_distance: f32) -> f32 {
    if max_distance <= 0.0 || distance >= max_distance {
        return 0.0;
    }
    (1.0 - distance / max_distance).clamp(0.0, 1.0)
}
