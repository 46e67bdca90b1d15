use rumble_shared::{clamp01, ClipDefinition, MotorSpeeds};
use serde::{Deserialize, Serialize};

/// Scaling a caller attaches to one playback of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstanceMultipliers {
    pub strength: f32,
    pub low: f32,
    pub high: f32,
    /// Playback speed of the progression curves. 2.0 runs the curves twice per clip duration.
    pub speed: f32,
}

impl Default for InstanceMultipliers {
    fn default() -> Self {
        Self {
            strength: 1.0,
            low: 1.0,
            high: 1.0,
            speed: 1.0,
        }
    }
}

impl InstanceMultipliers {
    pub fn new(strength: f32, low: f32, high: f32) -> Self {
        Self {
            strength,
            low,
            high,
            ..Default::default()
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = sanitize_speed(speed);
        self
    }
}

/// Speeds below zero (or NaN) freeze the curves instead of running them backwards.
pub(crate) fn sanitize_speed(speed: f32) -> f32 {
    if speed.is_nan() { 0.0 } else { speed.max(0.0) }
}

/// Motor intensities of one clip at `progress`.
///
/// The result is not clamped; blending and the device writer take care of the hardware range.
pub fn evaluate(
    definition: &ClipDefinition,
    base_strength: f32,
    progress: f32,
    global_strength: f32,
    multipliers: &InstanceMultipliers,
) -> MotorSpeeds {
    let progress = clamp01(progress);

    let global_curve = definition.global_curve().multiplier(progress);
    let low_curve = definition.low_curve().multiplier(progress);
    let high_curve = definition.high_curve().multiplier(progress);

    let common = base_strength * global_strength * multipliers.strength * global_curve;

    MotorSpeeds {
        low: common * definition.low_multiplier() * multipliers.low * low_curve,
        high: common * definition.high_multiplier() * multipliers.high * high_curve,
    }
}
