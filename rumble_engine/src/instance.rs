use std::sync::Arc;

use rumble_shared::{ClipDefinition, DeviceTarget, MotorSpeeds, RandomizedParameter};
use serde::Serialize;

use crate::envelope::{self, InstanceMultipliers};

/// Non-owning reference to a playing clip instance.
///
/// Handles stay valid as identifiers after the instance ended; every engine call taking a stale
/// handle simply does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InstanceHandle(u64);

impl InstanceHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a clip instance. A looping clip stays `Playing` across cycles; each wrap is reported
/// per tick as [`Advance::Looped`] and counted in [`ClipInstance::cycles`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InstanceState {
    Inactive,
    Playing,
    /// A non-looping clip reached the end of its duration
    Completed,
    Stopped,
}

/// What happened to an instance during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Not playing, nothing to do
    Idle,
    /// Still playing, progress moved
    Progressed,
    /// Wrapped into a new cycle
    Looped,
    /// Ran past its duration and is done
    Completed,
}

pub struct ClipInstance {
    handle: InstanceHandle,
    definition: Arc<ClipDefinition>,
    target: DeviceTarget,
    strength: RandomizedParameter<f32>,
    multipliers: InstanceMultipliers,
    state: InstanceState,
    duration: f64,
    cycle_elapsed: f64,
    total_elapsed: f64,
    cycles: u32,
    progress: f32,
}

impl ClipInstance {
    /// A new, not yet playing instance. `min_duration` is an additional floor on the clip's duration.
    pub fn new(
        handle: InstanceHandle,
        definition: Arc<ClipDefinition>,
        target: DeviceTarget,
        multipliers: InstanceMultipliers,
        min_duration: f32,
    ) -> Self {
        let duration = definition.duration().max(min_duration) as f64;
        let strength = definition.strength().clone();
        Self {
            handle,
            definition,
            target,
            strength,
            multipliers,
            state: InstanceState::Inactive,
            duration,
            cycle_elapsed: 0.0,
            total_elapsed: 0.0,
            cycles: 0,
            progress: 0.0,
        }
    }

    /// Start playing: draw the base strength once and rewind.
    pub fn activate(&mut self, rng: &mut fastrand::Rng) {
        self.strength.resolve(rng);
        self.cycle_elapsed = 0.0;
        self.total_elapsed = 0.0;
        self.cycles = 0;
        self.progress = 0.0;
        self.state = InstanceState::Playing;
    }

    /// Move the clock forward by `delta` seconds.
    pub fn advance(&mut self, delta: f64) -> Advance {
        if self.state != InstanceState::Playing {
            return Advance::Idle;
        }
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        self.cycle_elapsed += delta;
        self.total_elapsed += delta;

        let mut looped = false;
        if self.cycle_elapsed >= self.duration {
            if !self.definition.is_looping() {
                self.cycle_elapsed = self.duration;
                self.progress = 1.0;
                self.state = InstanceState::Completed;
                return Advance::Completed;
            }
            // A long tick may span several cycles
            let wrapped = (self.cycle_elapsed / self.duration).floor() as u32;
            self.cycles = self.cycles.saturating_add(wrapped);
            self.cycle_elapsed %= self.duration;
            looped = true;
        }

        self.progress = self.compute_progress();
        if looped { Advance::Looped } else { Advance::Progressed }
    }

    /// Normalized position inside the current cycle, scaled by the speed multiplier and wrapped into `[0, 1]`.
    fn compute_progress(&self) -> f32 {
        let progress = (self.cycle_elapsed / self.duration) as f32 * self.multipliers.speed;
        if progress > 1.0 { progress % 1.0 } else { progress }
    }

    /// Mark as stopped. Returns false if it already was.
    pub fn stop(&mut self) -> bool {
        if self.state == InstanceState::Stopped {
            return false;
        }
        self.state = InstanceState::Stopped;
        true
    }

    /// Current intensities, before blending. Silent unless playing.
    pub fn evaluate(&self, global_strength: f32) -> MotorSpeeds {
        if self.state != InstanceState::Playing {
            return MotorSpeeds::ZERO;
        }
        envelope::evaluate(
            &self.definition,
            self.strength.value(),
            self.progress,
            global_strength,
            &self.multipliers,
        )
    }

    /// Whether progress changes can alter the output. Without any curve the intensity is constant.
    pub fn uses_progression_curve(&self) -> bool {
        self.definition.uses_progression_curve()
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.multipliers.speed = envelope::sanitize_speed(speed);
        self.progress = self.compute_progress();
    }

    pub fn handle(&self) -> InstanceHandle {
        self.handle
    }

    pub fn definition(&self) -> &Arc<ClipDefinition> {
        &self.definition
    }

    pub fn target(&self) -> DeviceTarget {
        self.target
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == InstanceState::Playing
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn multipliers(&self) -> InstanceMultipliers {
        self.multipliers
    }

    pub fn base_strength(&self) -> f32 {
        self.strength.value()
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn total_elapsed(&self) -> f64 {
        self.total_elapsed
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}
