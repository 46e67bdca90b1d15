use std::path::Path;

use anyhow::Context;
use rumble_shared::{ConfigError, MIN_CLIP_DURATION};
use serde::{Deserialize, Serialize};

/// Engine tuning, loadable from JSON. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds between two device flush passes. 0 flushes on every tick.
    pub flush_interval_secs: f64,
    /// Lower bound on clip durations, on top of the hard minimum
    pub min_clip_duration_secs: f32,
    /// Initial global strength multiplier
    pub strength_multiplier: f32,
    pub silence_on_focus_loss: bool,
    /// Seed for randomized clip parameters. Unseeded engines draw from entropy.
    pub random_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: 0.1,
            min_clip_duration_secs: MIN_CLIP_DURATION,
            strength_multiplier: 1.0,
            silence_on_focus_loss: true,
            random_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config {}", path.display()))?;
        let config = Self::from_json_str(&json)
            .with_context(|| format!("Failed to parse engine config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.flush_interval_secs.is_finite() || self.flush_interval_secs < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "flush_interval_secs",
                expected: "a non-negative number of seconds",
                value: self.flush_interval_secs,
            });
        }
        if !self.min_clip_duration_secs.is_finite() || self.min_clip_duration_secs < MIN_CLIP_DURATION {
            return Err(ConfigError::OutOfRange {
                field: "min_clip_duration_secs",
                expected: "at least 0.01",
                value: self.min_clip_duration_secs as f64,
            });
        }
        if !(0.0..=1.0).contains(&self.strength_multiplier) {
            return Err(ConfigError::OutOfRange {
                field: "strength_multiplier",
                expected: "within [0, 1]",
                value: self.strength_multiplier as f64,
            });
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_flush_interval(mut self, seconds: f64) -> Self {
        self.flush_interval_secs = seconds;
        self
    }
}
