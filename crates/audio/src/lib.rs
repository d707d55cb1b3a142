#![warn(missing_docs)]
//! Multi-listener emulation for a single-listener audio engine.
//!
//! Split-screen games need every player to hear the world from their own
//! viewpoint, while the output device only mixes for one listener. This crate
//! re-places each environmental source around that one fixed listener every
//! tick so the shared mix approximates what all players would hear.
//!
//! # Architecture
//!
//! - [`compute_rendered_position`] - The pure aggregation step
//! - [`ListenerAggregator`] - Registered sources plus the per-tick driver
//! - [`SpatialPlayback`] - What the driver needs from an audio engine
//! - [`PlaybackManager`] - rodio-backed (or stub) [`SpatialPlayback`]
//! - [`AudioSettings`] - Volume controls for environmental playback
//!
//! # Example
//!
//! ```ignore
//! let mut builder = ListenerAggregator::builder(AggregatorConfig::new(30.0));
//! let river = builder.register_source("river", Vec3::new(4.0, 0.0, 12.0));
//! let mut aggregator = builder.build()?;
//! let mut playback = PlaybackManager::new(Vec3::ZERO, aggregator.distance_limit());
//! aggregator.tick(&[player_one, player_two], &mut playback);
//! ```

mod aggregator;
mod config;
mod manager;
mod playback;
mod registry;
mod settings;

pub use aggregator::{aggregate_offset, compute_rendered_position};
pub use config::{AggregationMode, AggregatorConfig, ConfigError, DistanceLimit};
pub use manager::PlaybackManager;
pub use playback::{linear_rolloff_gain, SpatialPlayback};
pub use registry::{
    AggregatorBuilder, EnvironmentalSource, ListenerAggregator, SourceHandle, TickSummary,
};
pub use settings::AudioSettings;
