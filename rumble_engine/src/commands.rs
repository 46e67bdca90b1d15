use std::sync::Arc;

use crossbeam_channel::Sender;
use rumble_shared::{ClipDefinition, DeviceTarget};

use crate::envelope::InstanceMultipliers;
use crate::instance::InstanceHandle;

/// Requests other threads send to the thread that owns the engine.
pub enum EngineCommand {
    Play {
        definition: Arc<ClipDefinition>,
        target: DeviceTarget,
        multipliers: InstanceMultipliers,
        // None when the target index is invalid
        response_tx: Option<Sender<Option<InstanceHandle>>>,
    },
    Stop { handle: InstanceHandle, force_flush: bool },
    StopAll { force_flush: bool },
    SetStrengthMultiplier(f32),
    SetSpeedMultiplier { handle: InstanceHandle, speed: f32 },
    FocusChanged(bool),
    RefreshDevices,
    ForceFlush,
    // Stop everything and silence the hardware; further commands are ignored
    Shutdown,
}
