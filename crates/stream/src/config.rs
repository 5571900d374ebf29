use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::StreamError;

/// Admission and cleanup tunables of the sliding window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnControl {
    /// Segments spawned per admitted batch.
    pub platforms_per_batch: usize,
    /// A batch is admitted once the tail is closer than this to the agent (Z).
    pub spawn_trigger_distance: f32,
    /// Upper bound on live segments.
    pub max_active_platforms: usize,
    /// Segments further than this behind the agent (Z) are retired.
    pub cleanup_distance: f32,
}

impl Default for SpawnControl {
    fn default() -> Self {
        Self {
            platforms_per_batch: 6,
            spawn_trigger_distance: 30.0,
            max_active_platforms: 10,
            cleanup_distance: 25.0,
        }
    }
}

/// Spacing envelope along the travel axis.
///
/// The configured value is only the starting point: the window drifts it
/// every spawn (see `AdaptiveState`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapEnvelope {
    pub min_gap: f32,
    pub max_gap: f32,
    pub gap_randomness: f32,
}

impl Default for GapEnvelope {
    fn default() -> Self {
        Self {
            min_gap: 3.0,
            max_gap: 15.0,
            gap_randomness: 2.0,
        }
    }
}

/// Placement constraints that never change after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticConstraints {
    pub speed_gap_multiplier: f32,

    /// 0 keeps the previous X, 1 snaps to the agent's X.
    pub horizontal_follow_strength: f32,
    pub horizontal_randomness: f32,
    pub max_horizontal_delta: f32,
    pub min_absolute_x: f32,
    pub max_absolute_x: f32,

    /// 0 keeps the previous Y, 1 snaps to the agent's Y.
    pub vertical_follow_strength: f32,
    pub vertical_randomness: f32,
    /// Optional cap on the downward step between consecutive segments.
    pub max_vertical_delta: Option<f32>,
    pub min_absolute_y: f32,
    pub max_absolute_y: f32,

    /// Fixed extra drop applied to every new segment.
    pub descent_bias: f32,
    /// How far below the agent the initial segment sits.
    pub initial_drop: f32,
}

impl Default for StaticConstraints {
    fn default() -> Self {
        Self {
            speed_gap_multiplier: 0.3,
            horizontal_follow_strength: 0.6,
            horizontal_randomness: 2.0,
            max_horizontal_delta: 3.0,
            min_absolute_x: -8.0,
            max_absolute_x: 8.0,
            vertical_follow_strength: 0.5,
            vertical_randomness: 1.0,
            max_vertical_delta: None,
            min_absolute_y: -5.0,
            max_absolute_y: 2.0,
            descent_bias: 0.05,
            initial_drop: 2.0,
        }
    }
}

/// Full configuration of a streaming window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub spawn: SpawnControl,
    pub gap: GapEnvelope,
    pub constraints: StaticConstraints,
    /// Seed for the placement RNG.
    pub seed: u64,
}

impl StreamConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, StreamError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&data)
    }

    /// Reject values that would make placement undefined.
    pub fn validate(&self) -> Result<(), StreamError> {
        let s = &self.spawn;
        let g = &self.gap;
        let c = &self.constraints;

        let finite = [
            ("spawn_trigger_distance", s.spawn_trigger_distance),
            ("cleanup_distance", s.cleanup_distance),
            ("min_gap", g.min_gap),
            ("max_gap", g.max_gap),
            ("gap_randomness", g.gap_randomness),
            ("speed_gap_multiplier", c.speed_gap_multiplier),
            ("horizontal_follow_strength", c.horizontal_follow_strength),
            ("horizontal_randomness", c.horizontal_randomness),
            ("max_horizontal_delta", c.max_horizontal_delta),
            ("min_absolute_x", c.min_absolute_x),
            ("max_absolute_x", c.max_absolute_x),
            ("vertical_follow_strength", c.vertical_follow_strength),
            ("vertical_randomness", c.vertical_randomness),
            ("min_absolute_y", c.min_absolute_y),
            ("max_absolute_y", c.max_absolute_y),
            ("descent_bias", c.descent_bias),
            ("initial_drop", c.initial_drop),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return invalid(format!("{name} must be finite"));
        }

        if s.platforms_per_batch == 0 {
            return invalid("platforms_per_batch must be at least 1".into());
        }
        if s.max_active_platforms == 0 {
            return invalid("max_active_platforms must be at least 1".into());
        }
        if s.cleanup_distance < 0.0 {
            return invalid("cleanup_distance must not be negative".into());
        }
        if g.min_gap < 0.0 || g.gap_randomness < 0.0 {
            return invalid("min_gap and gap_randomness must not be negative".into());
        }
        if g.min_gap > g.max_gap {
            return invalid(format!(
                "min_gap ({}) exceeds max_gap ({})",
                g.min_gap, g.max_gap
            ));
        }
        if c.horizontal_randomness < 0.0 || c.vertical_randomness < 0.0 {
            return invalid("randomness must not be negative".into());
        }
        if c.max_horizontal_delta < 0.0 {
            return invalid("max_horizontal_delta must not be negative".into());
        }
        if let Some(d) = c.max_vertical_delta {
            if !d.is_finite() || d < 0.0 {
                return invalid("max_vertical_delta must be finite and not negative".into());
            }
        }
        if c.min_absolute_x > c.max_absolute_x {
            return invalid("min_absolute_x exceeds max_absolute_x".into());
        }
        if c.min_absolute_y > c.max_absolute_y {
            return invalid("min_absolute_y exceeds max_absolute_y".into());
        }
        Ok(())
    }
}

fn invalid(msg: String) -> Result<(), StreamError> {
    Err(StreamError::InvalidConfig(msg))
}
