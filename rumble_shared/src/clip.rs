use serde::{Deserialize, Deserializer, Serialize};

use crate::curve::ProgressionCurve;
use crate::random::RandomizedParameter;
use crate::{clamp01, DEFAULT_CLIP_DURATION, MIN_CLIP_DURATION};

/// An optional progression curve together with its on/off switch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveSlot {
    pub enabled: bool,
    pub curve: Option<ProgressionCurve>,
}

impl CurveSlot {
    pub fn enabled(curve: ProgressionCurve) -> Self {
        Self {
            enabled: true,
            curve: Some(curve),
        }
    }

    /// Whether this slot contributes anything other than the identity multiplier.
    pub fn is_active(&self) -> bool {
        self.enabled && self.curve.is_some()
    }

    /// Curve value at `progress`, or 1.0 when the slot is switched off or has no curve.
    pub fn multiplier(&self, progress: f32) -> f32 {
        match (&self.curve, self.enabled) {
            (Some(curve), true) => curve.evaluate(progress),
            _ => 1.0,
        }
    }
}

/// A reusable haptic envelope.
///
/// Definitions are immutable once handed to the engine and are shared between all instances
/// playing them. Values are stored as authored; the accessors apply the valid ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipDefinition {
    name: String,
    #[serde(deserialize_with = "deserialize_unit_strength")]
    strength: RandomizedParameter<f32>,
    low_multiplier: f32,
    high_multiplier: f32,
    global_curve: CurveSlot,
    low_curve: CurveSlot,
    high_curve: CurveSlot,
    looping: bool,
    duration: f32,
}

fn deserialize_unit_strength<'de, D>(deserializer: D) -> Result<RandomizedParameter<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    RandomizedParameter::<f32>::deserialize(deserializer).map(RandomizedParameter::into_unit)
}

impl Default for ClipDefinition {
    fn default() -> Self {
        Self {
            name: "New Haptic Clip".to_string(),
            strength: RandomizedParameter::unit(0.2),
            low_multiplier: 1.0,
            high_multiplier: 1.0,
            global_curve: CurveSlot::default(),
            low_curve: CurveSlot::default(),
            high_curve: CurveSlot::default(),
            looping: false,
            duration: DEFAULT_CLIP_DURATION,
        }
    }
}

impl ClipDefinition {
    /// Clip with a constant base strength, clamped into `[0, 1]`.
    pub fn new(strength: f32) -> Self {
        Self {
            strength: RandomizedParameter::unit(strength),
            ..Default::default()
        }
    }

    pub fn with_strength(mut self, strength: RandomizedParameter<f32>) -> Self {
        self.strength = strength.into_unit();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_channel_multipliers(mut self, low: f32, high: f32) -> Self {
        self.low_multiplier = clamp01(low);
        self.high_multiplier = clamp01(high);
        self
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = seconds;
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_global_curve(mut self, curve: ProgressionCurve) -> Self {
        self.global_curve = CurveSlot::enabled(curve);
        self
    }

    pub fn with_low_curve(mut self, curve: ProgressionCurve) -> Self {
        self.low_curve = CurveSlot::enabled(curve);
        self
    }

    pub fn with_high_curve(mut self, curve: ProgressionCurve) -> Self {
        self.high_curve = CurveSlot::enabled(curve);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template for the per-instance base strength. Instances clone and resolve it.
    pub fn strength(&self) -> &RandomizedParameter<f32> {
        &self.strength
    }

    pub fn low_multiplier(&self) -> f32 {
        clamp01(self.low_multiplier)
    }

    pub fn high_multiplier(&self) -> f32 {
        clamp01(self.high_multiplier)
    }

    pub fn global_curve(&self) -> &CurveSlot {
        &self.global_curve
    }

    pub fn low_curve(&self) -> &CurveSlot {
        &self.low_curve
    }

    pub fn high_curve(&self) -> &CurveSlot {
        &self.high_curve
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Duration in seconds, never below [`MIN_CLIP_DURATION`].
    pub fn duration(&self) -> f32 {
        if self.duration.is_nan() {
            return MIN_CLIP_DURATION;
        }
        self.duration.max(MIN_CLIP_DURATION)
    }

    /// True if any of the three curves shapes the intensity over time.
    pub fn uses_progression_curve(&self) -> bool {
        self.global_curve.is_active() || self.low_curve.is_active() || self.high_curve.is_active()
    }
}
