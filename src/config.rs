use anyhow::Result;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use splitear_audio::{AggregationMode, AggregatorConfig, AudioSettings};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

use crate::motion::Motion;

pub const DEFAULT_SCENE_PATH: &str = "config/split_screen.toml";

/// A headless split-screen scene: who is listening and what is making noise.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneConfig {
    pub audio: AudioSection,
    pub listeners: Vec<ListenerConfig>,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioSection {
    /// Radius beyond which a source is inaudible to a listener.
    pub distance_limit: f32,
    /// Position of the physical listener.
    pub anchor: [f32; 3],
    /// `blend` folds every listener together, `primary_only` hears through the first.
    pub mode: AggregationMode,
    /// Master volume (0.0 to 1.0).
    pub master_volume: f32,
    /// Environmental sources volume (0.0 to 1.0).
    pub ambient_volume: f32,
    /// Whether audio is muted.
    pub muted: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ListenerConfig {
    pub name: String,
    /// First tick this listener is part of the snapshot (a player joining late).
    #[serde(default)]
    pub join_tick: u64,
    pub motion: Motion,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SourceConfig {
    pub name: String,
    pub position: [f32; 3],
    /// Looping clip, relative to the scene file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<PathBuf>,
}

impl Default for AudioSection {
    fn default() -> Self {
        let aggregator = AggregatorConfig::default();
        let settings = AudioSettings::default();
        Self {
            distance_limit: aggregator.distance_limit,
            anchor: aggregator.anchor.to_array(),
            mode: aggregator.mode,
            master_volume: settings.master,
            ambient_volume: settings.ambient,
            muted: settings.muted,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            audio: AudioSection::default(),
            listeners: vec![
                ListenerConfig {
                    name: "player_one".into(),
                    join_tick: 0,
                    motion: Motion::Orbit {
                        center: [0.0, 0.0, 0.0],
                        radius: 8.0,
                        period_ticks: 400,
                        phase_degrees: 0.0,
                    },
                },
                ListenerConfig {
                    name: "player_two".into(),
                    join_tick: 20,
                    motion: Motion::Patrol {
                        from: [-20.0, 0.0, -10.0],
                        to: [30.0, 0.0, 10.0],
                        period_ticks: 600,
                    },
                },
            ],
            sources: vec![
                SourceConfig {
                    name: "campfire".into(),
                    position: [0.0, 0.0, 0.0],
                    clip: None,
                },
                SourceConfig {
                    name: "river".into(),
                    position: [25.0, -1.0, 12.0],
                    clip: None,
                },
                SourceConfig {
                    name: "windmill".into(),
                    position: [-22.0, 6.0, -18.0],
                    clip: None,
                },
            ],
        }
    }
}

impl SceneConfig {
    /// Load a scene from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<SceneConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    SceneConfig::default()
                }
            },
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!("Scene config not found at {}. Using defaults", path.display());
                }
                SceneConfig::default()
            }
        }
    }

    /// Save the scene to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Aggregator setup described by the `[audio]` section. Not yet validated.
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            distance_limit: self.audio.distance_limit,
            anchor: Vec3::from(self.audio.anchor),
            mode: self.audio.mode,
        }
    }

    /// Volume settings described by the `[audio]` section, clamped.
    pub fn audio_settings(&self) -> AudioSettings {
        let mut settings = AudioSettings {
            muted: self.audio.muted,
            ..AudioSettings::default()
        };
        settings.set_master(self.audio.master_volume);
        settings.set_ambient(self.audio.ambient_volume);
        settings
    }
}
