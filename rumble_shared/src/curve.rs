use serde::{Deserialize, Serialize};

/// Shape of the segment that starts at a keyframe.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    /// Keep the keyframe's value until the next keyframe
    Hold,
    QuadIn,
    QuadOut,
    SmoothStep,
}

impl Easing {
    /// Map a normalized segment position `x` in `[0, 1]` to an interpolation factor.
    pub fn at_normalized(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        match self {
            Easing::Linear => x,
            Easing::Hold => 0.0,
            Easing::QuadIn => x * x,
            Easing::QuadOut => x * (2.0 - x),
            Easing::SmoothStep => x * x * (3.0 - 2.0 * x),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub easing: Easing,
}

impl Keyframe {
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            easing: Easing::Linear,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// Maps normalized playback progress to an intensity multiplier.
///
/// Keyframes are kept sorted by time. Outside the keyed range the curve holds the first/last value.
/// A curve without keyframes evaluates to 1.0 everywhere.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct ProgressionCurve {
    keys: Vec<Keyframe>,
}

impl ProgressionCurve {
    pub fn from_keys(keys: impl IntoIterator<Item = Keyframe>) -> Self {
        let mut keys: Vec<Keyframe> = keys
            .into_iter()
            .filter(|k| k.time.is_finite() && k.value.is_finite())
            .collect();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// Ramp from 0 at the start to 1 at the end.
    pub fn ramp_up() -> Self {
        Self::from_keys([Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 1.0)])
    }

    /// Ramp from 1 at the start to 0 at the end.
    pub fn ramp_down() -> Self {
        Self::from_keys([Keyframe::new(0.0, 1.0), Keyframe::new(1.0, 0.0)])
    }

    pub fn constant(value: f32) -> Self {
        Self::from_keys([Keyframe::new(0.0, value)])
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 1.0,
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // First key strictly after t. Guaranteed to be in 1..len by the checks above
        let next = self.keys.partition_point(|k| k.time <= t);
        let a = &self.keys[next - 1];
        let b = &self.keys[next];
        let span = b.time - a.time;
        if span <= f32::EPSILON {
            return b.value;
        }
        let factor = a.easing.at_normalized((t - a.time) / span);
        a.value + (b.value - a.value) * factor
    }
}

impl From<Vec<Keyframe>> for ProgressionCurve {
    fn from(keys: Vec<Keyframe>) -> Self {
        Self::from_keys(keys)
    }
}

impl From<ProgressionCurve> for Vec<Keyframe> {
    fn from(curve: ProgressionCurve) -> Self {
        curve.keys
    }
}
