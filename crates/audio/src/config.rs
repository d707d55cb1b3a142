//! Aggregator configuration and validation.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while configuring an aggregator.
///
/// These are fatal: an aggregator is never built from an invalid configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The distance limit was zero or negative.
    #[error("distance limit must be greater than zero, got {0}")]
    NonPositiveDistanceLimit(f32),
    /// The distance limit was NaN or infinite.
    #[error("distance limit must be finite, got {0}")]
    NonFiniteDistanceLimit(f32),
    /// The distance limit was so large that its square overflows.
    #[error("distance limit {0} is too large, its square overflows")]
    DistanceLimitTooLarge(f32),
    /// The physical listener anchor had a NaN or infinite component.
    #[error("listener anchor must be finite, got {0:?}")]
    NonFiniteAnchor(Vec3),
    /// Two sources were registered under the same name.
    #[error("source `{0}` is registered more than once")]
    DuplicateSource(String),
    /// A source was registered at a NaN or infinite position.
    #[error("source `{name}` has a non-finite position {position:?}")]
    NonFiniteSourcePosition {
        /// Name the source was registered under.
        name: String,
        /// Offending nominal position.
        position: Vec3,
    },
}

/// Maximum audible distance, validated to be strictly positive with a finite square.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DistanceLimit(f32);

impl DistanceLimit {
    /// Validate `value` as a distance limit.
    pub fn new(value: f32) -> Result<Self, ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::NonFiniteDistanceLimit(value));
        }
        if value <= 0.0 {
            return Err(ConfigError::NonPositiveDistanceLimit(value));
        }
        // Weights are ratios of squared distances.
        if !(value * value).is_finite() {
            return Err(ConfigError::DistanceLimitTooLarge(value));
        }
        Ok(Self(value))
    }

    /// The limit in world units.
    pub fn get(self) -> f32 {
        self.0
    }

    /// The limit squared.
    pub fn squared(self) -> f32 {
        self.0 * self.0
    }
}

impl TryFrom<f32> for DistanceLimit {
    type Error = ConfigError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// How listener snapshots are folded into a rendered position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Blend every listener in the snapshot.
    #[default]
    Blend,
    /// Only hear through the first listener in the snapshot.
    PrimaryOnly,
}

/// Unvalidated aggregator setup, as read from a scene description.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    /// Radius beyond which a source is inaudible to a listener.
    pub distance_limit: f32,
    /// Where the single physical listener sits. Never moved.
    pub anchor: Vec3,
    /// Listener folding mode.
    pub mode: AggregationMode,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            distance_limit: 30.0,
            anchor: Vec3::ZERO,
            mode: AggregationMode::Blend,
        }
    }
}

impl AggregatorConfig {
    /// Create a blending config with the given limit at the world origin.
    pub fn new(distance_limit: f32) -> Self {
        Self {
            distance_limit,
            ..Self::default()
        }
    }

    /// Check the limit and anchor, returning the validated limit.
    pub fn validate(&self) -> Result<DistanceLimit, ConfigError> {
        let limit = DistanceLimit::new(self.distance_limit)?;
        if !self.anchor.is_finite() {
            return Err(ConfigError::NonFiniteAnchor(self.anchor));
        }
        Ok(limit)
    }
}
