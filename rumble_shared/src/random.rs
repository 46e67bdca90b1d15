use serde::{Deserialize, Serialize};

/// Types a [`RandomizedParameter`] can be drawn from.
pub trait SampleUniform: Copy + PartialOrd {
    /// Draw a value between `min` and `max`. Must return `min` when the range is empty.
    fn sample_uniform(rng: &mut fastrand::Rng, min: Self, max: Self) -> Self;
}

impl SampleUniform for f32 {
    fn sample_uniform(rng: &mut fastrand::Rng, min: f32, max: f32) -> f32 {
        if !(max > min) {
            return min;
        }
        min + rng.f32() * (max - min)
    }
}

impl SampleUniform for i32 {
    /// Half-open: `max` itself is never returned.
    fn sample_uniform(rng: &mut fastrand::Rng, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        rng.i32(min..max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RandomMode {
    #[default]
    Constant,
    Random,
}

/// A value that is either fixed or drawn from `[min, max]`.
///
/// Drawing happens in [`RandomizedParameter::resolve`], which a clip instance calls exactly once when it
/// starts playing. Every later [`RandomizedParameter::value`] call returns the same cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "StoredParameter<T>",
    bound(deserialize = "T: SampleUniform + Deserialize<'de>")
)]
pub struct RandomizedParameter<T> {
    mode: RandomMode,
    min: T,
    max: T,
    #[serde(skip)]
    resolved: Option<T>,
}

/// Serialized form, normalized on load: constants collapse to `min`, random bounds are ordered.
#[derive(Deserialize)]
struct StoredParameter<T> {
    mode: RandomMode,
    min: T,
    max: T,
}

impl<T: SampleUniform> From<StoredParameter<T>> for RandomizedParameter<T> {
    fn from(stored: StoredParameter<T>) -> Self {
        match stored.mode {
            RandomMode::Constant => Self::constant(stored.min),
            RandomMode::Random => Self::random(stored.min, stored.max),
        }
    }
}

impl<T: SampleUniform> RandomizedParameter<T> {
    pub fn constant(value: T) -> Self {
        Self {
            mode: RandomMode::Constant,
            min: value,
            max: value,
            resolved: Some(value),
        }
    }

    pub fn random(min: T, max: T) -> Self {
        // Keep min <= max so sampling never sees an inverted range
        let (min, max) = if max < min { (max, min) } else { (min, max) };
        Self {
            mode: RandomMode::Random,
            min,
            max,
            resolved: None,
        }
    }

    /// Draw a new value (random mode) and cache it. Returns the cached value.
    pub fn resolve(&mut self, rng: &mut fastrand::Rng) -> T {
        let value = match self.mode {
            RandomMode::Constant => self.min,
            RandomMode::Random => T::sample_uniform(rng, self.min, self.max),
        };
        self.resolved = Some(value);
        value
    }

    /// The cached value. Falls back to `min` for a random parameter that was never resolved.
    pub fn value(&self) -> T {
        match self.mode {
            RandomMode::Constant => self.min,
            RandomMode::Random => self.resolved.unwrap_or(self.min),
        }
    }

    pub fn is_random(&self) -> bool {
        self.mode == RandomMode::Random
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn mode(&self) -> RandomMode {
        self.mode
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }
}

impl RandomizedParameter<f32> {
    /// Constant clamped into `[0, 1]`.
    pub fn unit(value: f32) -> Self {
        Self::constant(crate::clamp01(value))
    }

    /// Random range with both bounds clamped into `[0, 1]`.
    pub fn unit_range(min: f32, max: f32) -> Self {
        Self::random(crate::clamp01(min), crate::clamp01(max))
    }

    /// Same parameter with its bounds clamped into `[0, 1]`.
    pub fn into_unit(self) -> Self {
        match self.mode {
            RandomMode::Constant => Self::unit(self.min),
            RandomMode::Random => Self::unit_range(self.min, self.max),
        }
    }
}

impl<T: SampleUniform> From<T> for RandomizedParameter<T> {
    fn from(value: T) -> Self {
        Self::constant(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_ignores_rng() {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut p = RandomizedParameter::constant(0.4f32);
        assert_eq!(p.value(), 0.4);
        assert_eq!(p.resolve(&mut rng), 0.4);
        assert_eq!(p.min(), p.max());
        assert!(!p.is_random());
    }

    #[test]
    fn test_random_is_held_until_resolved_again() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut p = RandomizedParameter::random(0.2f32, 0.9);
        assert!(!p.is_resolved());
        assert_eq!(p.value(), 0.2);

        let v = p.resolve(&mut rng);
        for _ in 0..10 {
            assert_eq!(p.value(), v);
        }
        assert!((0.2..=0.9).contains(&v));
    }

    #[test]
    fn test_random_spreads_over_range() {
        let mut rng = fastrand::Rng::with_seed(42);
        let template = RandomizedParameter::random(0.0f32, 1.0);
        let values: Vec<f32> = (0..500).map(|_| template.clone().resolve(&mut rng)).collect();

        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(values.iter().any(|v| *v < 0.25));
        assert!(values.iter().any(|v| *v > 0.75));
    }

    #[test]
    fn test_inverted_bounds_are_swapped() {
        let p = RandomizedParameter::random(5i32, 2);
        assert_eq!((p.min(), p.max()), (2, 5));
    }

    #[test]
    fn test_int_range_is_half_open() {
        let mut rng = fastrand::Rng::with_seed(3);
        let mut p = RandomizedParameter::random(0i32, 3);
        for _ in 0..200 {
            let v = p.resolve(&mut rng);
            assert!((0..3).contains(&v));
        }
        let mut empty = RandomizedParameter::random(4i32, 4);
        assert_eq!(empty.resolve(&mut rng), 4);
    }

    #[test]
    fn test_unit_clamps() {
        assert_eq!(RandomizedParameter::unit(1.5).value(), 1.0);
        let p = RandomizedParameter::unit_range(-1.0, 0.5);
        assert_eq!((p.min(), p.max()), (0.0, 0.5));
    }

    #[test]
    fn test_resolved_value_is_not_serialized() {
        let mut rng = fastrand::Rng::with_seed(9);
        let mut p = RandomizedParameter::random(0.1f32, 0.2);
        p.resolve(&mut rng);
        let json = serde_json::to_string(&p).unwrap();
        let back: RandomizedParameter<f32> = serde_json::from_str(&json).unwrap();
        assert!(!back.is_resolved());
        assert_eq!(back.mode(), RandomMode::Random);
    }

    #[test]
    fn test_loaded_parameter_is_normalized() {
        let inverted: RandomizedParameter<f32> =
            serde_json::from_str(r#"{ "mode": "Random", "min": 0.9, "max": 0.1 }"#).unwrap();
        assert_eq!((inverted.min(), inverted.max()), (0.1, 0.9));

        let constant: RandomizedParameter<i32> =
            serde_json::from_str(r#"{ "mode": "Constant", "min": 3, "max": 8 }"#).unwrap();
        assert_eq!((constant.min(), constant.max()), (3, 3));
        assert_eq!(constant.value(), 3);
    }
}
