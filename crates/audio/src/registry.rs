//! Registered environmental sources and the per-tick driver.

use std::collections::HashSet;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use splitear_core::Pose;
use tracing::{debug, info, trace, warn};

use crate::{
    compute_rendered_position, AggregationMode, AggregatorConfig, ConfigError, DistanceLimit,
    SpatialPlayback,
};

/// Opaque identifier of a registered source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceHandle(u32);

impl SourceHandle {
    /// Registration order of this source.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// An always-on, looping source registered once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentalSource {
    handle: SourceHandle,
    name: String,
    nominal: Vec3,
    rendered: Vec3,
}

impl EnvironmentalSource {
    /// Handle returned at registration.
    pub fn handle(&self) -> SourceHandle {
        self.handle
    }

    /// Name given at registration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the sound really is in the world. Never changes.
    pub fn nominal_position(&self) -> Vec3 {
        self.nominal
    }

    /// Where the sound was last rendered for the physical listener.
    pub fn rendered_position(&self) -> Vec3 {
        self.rendered
    }
}

/// Collects sources before an aggregator is built.
#[derive(Debug, Clone)]
pub struct AggregatorBuilder {
    config: AggregatorConfig,
    sources: Vec<EnvironmentalSource>,
}

impl AggregatorBuilder {
    /// Start a builder for `config`. Validation is deferred to [`Self::build`].
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            sources: Vec::new(),
        }
    }

    /// Register a source at its nominal world position.
    pub fn register_source(&mut self, name: impl Into<String>, position: Vec3) -> SourceHandle {
        let handle = SourceHandle(self.sources.len() as u32);
        let name = name.into();
        debug!(%handle, name = %name, ?position, "Registered environmental source");
        self.sources.push(EnvironmentalSource {
            handle,
            name,
            nominal: position,
            rendered: position,
        });
        handle
    }

    /// Validate the configuration and freeze the source list.
    pub fn build(self) -> Result<ListenerAggregator, ConfigError> {
        let distance_limit = self.config.validate()?;

        let mut names = HashSet::with_capacity(self.sources.len());
        for source in &self.sources {
            if !source.nominal.is_finite() {
                return Err(ConfigError::NonFiniteSourcePosition {
                    name: source.name.clone(),
                    position: source.nominal,
                });
            }
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource(source.name.clone()));
            }
        }

        Ok(ListenerAggregator {
            distance_limit,
            anchor: self.config.anchor,
            mode: self.config.mode,
            sources: self.sources,
            heard_listeners: false,
        })
    }
}

/// What a single [`ListenerAggregator::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Listeners that were folded into the rendered positions.
    pub listeners: usize,
    /// Sources whose playback was started this tick.
    pub started: usize,
    /// Sources whose playback failed to start this tick.
    pub failed: usize,
}

/// Renders every registered source for a set of virtual listeners.
#[derive(Debug, Clone)]
pub struct ListenerAggregator {
    distance_limit: DistanceLimit,
    anchor: Vec3,
    mode: AggregationMode,
    sources: Vec<EnvironmentalSource>,
    heard_listeners: bool,
}

impl ListenerAggregator {
    /// Shorthand for [`AggregatorBuilder::new`].
    pub fn builder(config: AggregatorConfig) -> AggregatorBuilder {
        AggregatorBuilder::new(config)
    }

    /// Shared audible radius.
    pub fn distance_limit(&self) -> DistanceLimit {
        self.distance_limit
    }

    /// Fixed position of the physical listener.
    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    /// Current folding mode.
    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    /// Switch folding mode. Takes effect on the next tick.
    pub fn set_mode(&mut self, mode: AggregationMode) {
        if self.mode != mode {
            info!(?mode, "Listener aggregation mode changed");
            self.mode = mode;
        }
    }

    /// Every registered source, in registration order.
    pub fn sources(&self) -> &[EnvironmentalSource] {
        &self.sources
    }

    /// Look up a source by handle.
    pub fn source(&self, handle: SourceHandle) -> Option<&EnvironmentalSource> {
        self.sources.get(handle.index())
    }

    /// Look up a source by name.
    pub fn source_by_name(&self, name: &str) -> Option<&EnvironmentalSource> {
        self.sources.iter().find(|source| source.name == name)
    }

    /// Re-render every source for this tick's listener snapshot.
    ///
    /// Rendered positions are written to `playback` before anything is
    /// started, and nothing is started until the snapshot is non-empty.
    pub fn tick<P>(&mut self, listeners: &[Pose], playback: &mut P) -> TickSummary
    where
        P: SpatialPlayback + ?Sized,
    {
        let listeners = match self.mode {
            AggregationMode::Blend => listeners,
            AggregationMode::PrimaryOnly => &listeners[..listeners.len().min(1)],
        };

        let mut summary = TickSummary {
            listeners: listeners.len(),
            ..TickSummary::default()
        };

        if !listeners.is_empty() && !self.heard_listeners {
            info!(
                listeners = listeners.len(),
                sources = self.sources.len(),
                "First listener snapshot received, starting environmental sources"
            );
            self.heard_listeners = true;
        }

        for source in &mut self.sources {
            source.rendered = compute_rendered_position(
                listeners,
                source.nominal,
                self.distance_limit,
                self.anchor,
            );
            playback.set_position(source.handle, source.rendered);
            trace!(
                handle = %source.handle,
                name = %source.name,
                rendered = ?source.rendered,
                "Rendered source"
            );

            if listeners.is_empty() || playback.is_playing(source.handle) {
                continue;
            }
            match playback.play(source.handle) {
                Ok(()) => {
                    debug!(handle = %source.handle, name = %source.name, "Started source");
                    summary.started += 1;
                }
                Err(err) => {
                    warn!(
                        handle = %source.handle,
                        name = %source.name,
                        "Failed to start source: {err:#}"
                    );
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}
