use serde::{Deserialize, Serialize};

pub mod clip;
pub mod curve;
pub mod error;
pub mod random;

pub use clip::{ClipDefinition, CurveSlot};
pub use curve::{Easing, Keyframe, ProgressionCurve};
pub use error::{ConfigError, DeviceError};
pub use random::{RandomMode, RandomizedParameter, SampleUniform};

/// Shortest duration a clip may have. Keeps progress computation away from a division by zero.
pub const MIN_CLIP_DURATION: f32 = 0.01;

/// Duration a freshly built clip gets when none is specified.
pub const DEFAULT_CLIP_DURATION: f32 = 0.3;

/// Which gamepads a clip instance plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeviceTarget {
    /// Every device known at the time playback starts
    #[default]
    All,
    /// A single device by its position in the enumerated device list
    Index(usize),
}

impl From<usize> for DeviceTarget {
    fn from(index: usize) -> Self {
        DeviceTarget::Index(index)
    }
}

impl std::fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceTarget::All => write!(f, "all devices"),
            DeviceTarget::Index(i) => write!(f, "device #{}", i),
        }
    }
}

/// A pair of rumble motor intensities.
///
/// `low` drives the low frequency (heavy) motor, `high` the high frequency (light) one.
/// Hardware expects both in `[0, 1]`; intermediate results may overshoot until [`MotorSpeeds::clamped`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotorSpeeds {
    pub low: f32,
    pub high: f32,
}

impl MotorSpeeds {
    pub const ZERO: MotorSpeeds = MotorSpeeds { low: 0.0, high: 0.0 };

    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Component-wise maximum. Used to blend concurrent clips so they saturate instead of adding up.
    pub fn max(self, other: MotorSpeeds) -> MotorSpeeds {
        MotorSpeeds {
            low: self.low.max(other.low),
            high: self.high.max(other.high),
        }
    }

    /// Both channels clamped into the valid hardware range. NaN becomes 0.
    pub fn clamped(self) -> MotorSpeeds {
        MotorSpeeds {
            low: clamp01(self.low),
            high: clamp01(self.high),
        }
    }
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
pub fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
