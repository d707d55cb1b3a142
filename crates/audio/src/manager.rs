//! Playback manager for environmental sources.

use crate::{linear_rolloff_gain, AudioSettings, DistanceLimit, SourceHandle, SpatialPlayback};
use anyhow::{Context, Result};
use glam::Vec3;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Distance from the anchor at which backend emitters are placed.
///
/// Emitters only carry direction; loudness comes from the linear rolloff gain.
const EMITTER_RADIUS: f32 = 1.0;

/// Half the distance between the physical listener's ears.
#[cfg_attr(not(feature = "rodio_backend"), allow(dead_code))]
const EAR_OFFSET: f32 = 0.1;

#[cfg(feature = "rodio_backend")]
mod backend {
    use super::*;
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Source, SpatialSink};
    use std::io::Cursor;

    /// Audio data for a loaded clip.
    pub struct SoundData {
        /// Raw encoded audio bytes
        pub data: Vec<u8>,
    }

    /// Backend state for rodio audio.
    pub struct BackendState {
        /// Output stream (must be kept alive)
        _stream: OutputStream,
        /// Stream handle for creating sinks
        stream_handle: OutputStreamHandle,
        /// One looping sink per started source
        sinks: HashMap<SourceHandle, SpatialSink>,
    }

    impl BackendState {
        pub fn new() -> Result<Self> {
            let (stream, stream_handle) =
                OutputStream::try_default().context("Failed to create audio output stream")?;

            Ok(Self {
                _stream: stream,
                stream_handle,
                sinks: HashMap::new(),
            })
        }

        pub fn start_loop(
            &mut self,
            source: SourceHandle,
            data: &SoundData,
            emitter: Vec3,
            anchor: Vec3,
            volume: f32,
        ) -> Result<()> {
            let cursor = Cursor::new(data.data.clone());
            let decoder = Decoder::new(cursor).context("Failed to decode audio")?;

            let left_ear = anchor - Vec3::X * EAR_OFFSET;
            let right_ear = anchor + Vec3::X * EAR_OFFSET;
            let sink = SpatialSink::try_new(
                &self.stream_handle,
                emitter.to_array(),
                left_ear.to_array(),
                right_ear.to_array(),
            )
            .context("Failed to create spatial sink")?;
            sink.set_volume(volume);
            sink.append(decoder.repeat_infinite());

            if let Some(previous) = self.sinks.insert(source, sink) {
                previous.stop();
            }
            Ok(())
        }

        pub fn set_emitter(&self, source: SourceHandle, emitter: Vec3, volume: f32) {
            if let Some(sink) = self.sinks.get(&source) {
                sink.set_emitter_position(emitter.to_array());
                sink.set_volume(volume);
            }
        }

        pub fn is_playing(&self, source: SourceHandle) -> bool {
            self.sinks
                .get(&source)
                .map(|s| !s.empty() && !s.is_paused())
                .unwrap_or(false)
        }

        pub fn update(&mut self) {
            self.sinks.retain(|_, s| !s.empty());
        }

        pub fn stop_all(&mut self) {
            for (_, sink) in self.sinks.drain() {
                sink.stop();
            }
        }
    }
}

#[cfg(not(feature = "rodio_backend"))]
mod backend {
    use super::*;
    use std::collections::HashSet;

    /// Audio data for a loaded clip (stub).
    #[allow(dead_code)]
    pub struct SoundData {
        /// Raw encoded audio bytes (unused in stub mode)
        pub data: Vec<u8>,
    }

    /// Backend stub when rodio is not available. Only remembers what was started.
    pub struct BackendState {
        started: HashSet<SourceHandle>,
    }

    impl BackendState {
        pub fn new() -> Result<Self> {
            debug!("Audio backend: stub (no rodio)");
            Ok(Self {
                started: HashSet::new(),
            })
        }

        pub fn start_loop(
            &mut self,
            source: SourceHandle,
            _data: &SoundData,
            _emitter: Vec3,
            _anchor: Vec3,
            _volume: f32,
        ) -> Result<()> {
            self.started.insert(source);
            Ok(())
        }

        pub fn set_emitter(&self, _source: SourceHandle, _emitter: Vec3, _volume: f32) {}

        pub fn is_playing(&self, source: SourceHandle) -> bool {
            self.started.contains(&source)
        }

        pub fn update(&mut self) {}

        pub fn stop_all(&mut self) {
            self.started.clear();
        }
    }
}

use backend::{BackendState, SoundData};

#[derive(Debug, Clone, Copy)]
struct Voice {
    position: Vec3,
    playing: bool,
}

/// Plays environmental sources for the single physical listener.
///
/// Implements [`SpatialPlayback`]: positions written by the aggregator become
/// a linear rolloff gain (times the effective ambient volume) and a direction
/// around the anchor. Uses rodio when the `rodio_backend` feature is enabled.
pub struct PlaybackManager {
    /// Backend state
    backend: Option<BackendState>,
    /// Current audio settings
    settings: AudioSettings,
    /// Loaded clips, keyed by the source they loop for
    clips: HashMap<SourceHandle, Arc<SoundData>>,
    /// Last known position and state of every source seen
    voices: HashMap<SourceHandle, Voice>,
    /// Physical listener position
    anchor: Vec3,
    /// Rolloff radius
    distance_limit: DistanceLimit,
}

impl PlaybackManager {
    /// Create a playback manager for a physical listener at `anchor`.
    ///
    /// Initializes the audio output device.
    /// Falls back to a stub if audio initialization fails.
    pub fn new(anchor: Vec3, distance_limit: DistanceLimit) -> Self {
        let backend = match BackendState::new() {
            Ok(b) => {
                debug!("Playback manager initialized");
                Some(b)
            }
            Err(e) => {
                tracing::warn!("Failed to initialize audio: {:#}. Using stub.", e);
                None
            }
        };

        Self {
            backend,
            ..Self::stub(anchor, distance_limit)
        }
    }

    /// Create a stub manager that tracks voices but never touches a device.
    ///
    /// Useful for testing or headless operation.
    pub fn stub(anchor: Vec3, distance_limit: DistanceLimit) -> Self {
        Self {
            backend: None,
            settings: AudioSettings::default(),
            clips: HashMap::new(),
            voices: HashMap::new(),
            anchor,
            distance_limit,
        }
    }

    /// Check if audio playback is available.
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Get the current audio settings.
    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    /// Get mutable access to audio settings. Applied on the next [`Self::update`].
    pub fn settings_mut(&mut self) -> &mut AudioSettings {
        &mut self.settings
    }

    /// Replace audio settings and apply them to every playing voice.
    pub fn update_settings(&mut self, settings: AudioSettings) {
        self.settings = settings;
        self.refresh_voices();
    }

    /// Load the clip `source` loops.
    pub fn load_clip(&mut self, source: SourceHandle, data: Vec<u8>) {
        self.clips.insert(source, Arc::new(SoundData { data }));
        debug!("Loaded clip for {}", source);
    }

    /// Read a clip from disk and load it for `source`.
    pub fn load_clip_from_path(&mut self, source: SourceHandle, path: &Path) -> Result<()> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read clip {}", path.display()))?;
        self.load_clip(source, data);
        Ok(())
    }

    /// Whether a clip is loaded for `source`.
    pub fn has_clip(&self, source: SourceHandle) -> bool {
        self.clips.contains_key(&source)
    }

    /// Last position written for `source`.
    pub fn voice_position(&self, source: SourceHandle) -> Option<Vec3> {
        self.voices.get(&source).map(|v| v.position)
    }

    /// Volume `source` plays at, or `None` if it was never positioned.
    pub fn voice_gain(&self, source: SourceHandle) -> Option<f32> {
        self.voice_position(source).map(|p| self.gain_at(p))
    }

    /// Volume a source at `position` plays at.
    pub fn gain_at(&self, position: Vec3) -> f32 {
        let distance = position.distance(self.anchor);
        linear_rolloff_gain(distance, self.distance_limit.get())
            * self.settings.effective_ambient_volume()
    }

    fn emitter_for(&self, position: Vec3) -> Vec3 {
        self.anchor + (position - self.anchor).normalize_or_zero() * EMITTER_RADIUS
    }

    fn refresh_voices(&self) {
        if let Some(backend) = &self.backend {
            for (&source, voice) in &self.voices {
                if voice.playing {
                    backend.set_emitter(
                        source,
                        self.emitter_for(voice.position),
                        self.gain_at(voice.position),
                    );
                }
            }
        }
    }

    /// Update playback state (call once per frame).
    ///
    /// Applies settings changes and notices voices the backend dropped, so the
    /// aggregator restarts them.
    pub fn update(&mut self) {
        if let Some(backend) = &mut self.backend {
            backend.update();
            for (source, voice) in self.voices.iter_mut() {
                if voice.playing && self.clips.contains_key(source) && !backend.is_playing(*source)
                {
                    debug!("Voice {} stopped unexpectedly", source);
                    voice.playing = false;
                }
            }
        }
        self.refresh_voices();
    }

    /// Get the number of playing voices.
    pub fn active_voice_count(&self) -> usize {
        self.voices.values().filter(|v| v.playing).count()
    }

    /// Stop every voice.
    pub fn stop_all(&mut self) {
        if let Some(backend) = &mut self.backend {
            backend.stop_all();
        }
        for voice in self.voices.values_mut() {
            voice.playing = false;
        }
    }
}

impl SpatialPlayback for PlaybackManager {
    fn is_playing(&self, source: SourceHandle) -> bool {
        self.voices.get(&source).is_some_and(|v| v.playing)
    }

    fn play(&mut self, source: SourceHandle) -> Result<()> {
        let position = self.voice_position(source).unwrap_or(self.anchor);
        let emitter = self.emitter_for(position);
        let gain = self.gain_at(position);

        match (self.backend.as_mut(), self.clips.get(&source)) {
            (Some(backend), Some(clip)) => {
                backend
                    .start_loop(source, clip, emitter, self.anchor, gain)
                    .with_context(|| format!("Failed to start {}", source))?;
            }
            (_, None) => debug!("No clip loaded for {}", source),
            (None, Some(_)) => {}
        }

        self.voices
            .entry(source)
            .and_modify(|v| v.playing = true)
            .or_insert(Voice {
                position,
                playing: true,
            });
        Ok(())
    }

    fn set_position(&mut self, source: SourceHandle, position: Vec3) {
        let voice = self.voices.entry(source).or_insert(Voice {
            position,
            playing: false,
        });
        voice.position = position;

        if voice.playing {
            if let Some(backend) = &self.backend {
                backend.set_emitter(source, self.emitter_for(position), self.gain_at(position));
            }
        }
    }
}

impl std::fmt::Debug for PlaybackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackManager")
            .field("available", &self.is_available())
            .field("settings", &self.settings)
            .field("clips", &self.clips.len())
            .field("voices", &self.voices.len())
            .field("anchor", &self.anchor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AggregatorBuilder, AggregatorConfig, ListenerAggregator};
    use splitear_core::Pose;

    fn limit() -> DistanceLimit {
        DistanceLimit::new(10.0).expect("valid limit")
    }

    fn scene() -> (ListenerAggregator, SourceHandle) {
        let mut builder = AggregatorBuilder::new(AggregatorConfig::new(10.0));
        let fire = builder.register_source("fire", Vec3::ZERO);
        (builder.build().expect("valid aggregator"), fire)
    }

    #[test]
    fn test_stub_manager() {
        let manager = PlaybackManager::stub(Vec3::ZERO, limit());
        assert!(!manager.is_available());
        assert_eq!(manager.active_voice_count(), 0);
    }

    #[test]
    fn test_settings_update() {
        let mut manager = PlaybackManager::stub(Vec3::ZERO, limit());
        manager.settings_mut().set_master(0.5);
        assert_eq!(manager.settings().master, 0.5);
    }

    #[test]
    fn test_gain_uses_linear_rolloff_and_settings() {
        let mut manager = PlaybackManager::stub(Vec3::new(0.0, 5.0, 0.0), limit());
        manager.update_settings(AudioSettings {
            master: 1.0,
            ambient: 0.5,
            muted: false,
        });
        let gain = manager.gain_at(Vec3::new(0.0, 5.0, 4.0));
        assert!((gain - 0.3).abs() < 1e-5);
        assert_eq!(manager.gain_at(Vec3::new(0.0, 5.0, 12.0)), 0.0);
    }

    #[test]
    fn test_aggregator_drives_voices() {
        let (mut aggregator, fire) = scene();
        let mut manager = PlaybackManager::stub(Vec3::ZERO, limit());
        manager.load_clip(fire, vec![0; 16]);
        assert!(manager.has_clip(fire));

        aggregator.tick(&[], &mut manager);
        assert!(!manager.is_playing(fire));
        assert_eq!(manager.voice_position(fire), Some(Vec3::ZERO));

        let listeners = [Pose::at(Vec3::new(0.0, 0.0, -5.0))];
        let summary = aggregator.tick(&listeners, &mut manager);
        manager.update();

        assert_eq!(summary.started, 1);
        assert!(manager.is_playing(fire));
        assert_eq!(manager.active_voice_count(), 1);
        let position = manager.voice_position(fire).expect("positioned");
        assert!((position - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-4);
        let gain = manager.voice_gain(fire).expect("gain");
        assert!((gain - 0.35).abs() < 1e-4);
    }

    #[test]
    fn test_missing_clip_still_counts_as_playing() {
        let (mut aggregator, _) = scene();
        let mut manager = PlaybackManager::stub(Vec3::ZERO, limit());

        let listeners = [Pose::IDENTITY];
        assert_eq!(aggregator.tick(&listeners, &mut manager).started, 1);
        assert_eq!(aggregator.tick(&listeners, &mut manager).started, 0);
    }

    #[test]
    fn test_stop_all_lets_aggregator_restart() {
        let (mut aggregator, fire) = scene();
        let mut manager = PlaybackManager::stub(Vec3::ZERO, limit());
        let listeners = [Pose::IDENTITY];

        aggregator.tick(&listeners, &mut manager);
        manager.stop_all();
        assert!(!manager.is_playing(fire));

        assert_eq!(aggregator.tick(&listeners, &mut manager).started, 1);
    }

    #[test]
    fn test_clip_from_missing_path_errors() {
        let (_, fire) = scene();
        let mut manager = PlaybackManager::stub(Vec3::ZERO, limit());
        let err = manager
            .load_clip_from_path(fire, Path::new("/nonexistent/splitear/clip.ogg"))
            .expect_err("missing file");
        assert!(err.to_string().contains("Failed to read clip"));
    }
}
