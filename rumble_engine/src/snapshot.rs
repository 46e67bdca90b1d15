use rumble_shared::{DeviceTarget, MotorSpeeds};
use serde::Serialize;

use crate::envelope::InstanceMultipliers;
use crate::instance::{ClipInstance, InstanceHandle, InstanceState};

/// Read-only view of one playing instance, for inspectors and logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceInfo {
    pub handle: InstanceHandle,
    pub clip_name: String,
    pub target: DeviceTarget,
    pub state: InstanceState,
    pub progress: f32,
    pub cycles: u32,
    pub base_strength: f32,
    pub multipliers: InstanceMultipliers,
    /// Unblended output of this instance alone, clamped to the hardware range
    pub speeds: MotorSpeeds,
}

impl InstanceInfo {
    pub fn from_instance(instance: &ClipInstance, global_strength: f32) -> Self {
        Self {
            handle: instance.handle(),
            clip_name: instance.definition().name().to_string(),
            target: instance.target(),
            state: instance.state(),
            progress: instance.progress(),
            cycles: instance.cycles(),
            base_strength: instance.base_strength(),
            multipliers: instance.multipliers(),
            speeds: instance.evaluate(global_strength).clamped(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceMotorInfo {
    pub index: usize,
    pub name: String,
    pub computed: MotorSpeeds,
    pub flushed: Option<MotorSpeeds>,
    pub dirty: bool,
    pub instance_count: usize,
}

/// State published after every tick for threads that do not own the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub clock: f64,
    pub strength_multiplier: f32,
    pub instances: Vec<InstanceInfo>,
    pub devices: Vec<DeviceMotorInfo>,
}

impl EngineSnapshot {
    pub fn instance(&self, handle: InstanceHandle) -> Option<&InstanceInfo> {
        self.instances.iter().find(|i| i.handle == handle)
    }

    pub fn device(&self, index: usize) -> Option<&DeviceMotorInfo> {
        self.devices.get(index)
    }
}
