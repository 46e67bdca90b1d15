use rumble_shared::{DeviceTarget, MotorSpeeds};

use crate::instance::ClipInstance;
use crate::motor_state::MotorSpeedTable;
use crate::registry::PlaybackRegistry;

/// Combine concurrent clips into one value per channel.
///
/// The loudest contributor wins on each channel independently, so stacked clips saturate instead of
/// summing past the motor range. The result is clamped to `[0, 1]`.
pub fn blend<'a>(instances: impl IntoIterator<Item = &'a ClipInstance>, global_strength: f32) -> MotorSpeeds {
    instances
        .into_iter()
        .map(|inst| inst.evaluate(global_strength))
        .fold(MotorSpeeds::ZERO, MotorSpeeds::max)
        .clamped()
}

/// Re-blend one device (or all) and flag it for a flush if the result moved.
///
/// Returns the number of devices whose computed value changed.
pub fn recompute_speeds(
    registry: &PlaybackRegistry,
    table: &mut MotorSpeedTable,
    target: DeviceTarget,
    global_strength: f32,
) -> usize {
    match target {
        DeviceTarget::Index(device) => recompute_device(registry, table, device, global_strength) as usize,
        DeviceTarget::All => {
            let count = registry.device_count().max(table.device_count());
            (0..count)
                .filter(|&device| recompute_device(registry, table, device, global_strength))
                .count()
        }
    }
}

fn recompute_device(
    registry: &PlaybackRegistry,
    table: &mut MotorSpeedTable,
    device: usize,
    global_strength: f32,
) -> bool {
    let speeds = blend(registry.instances_on(device), global_strength);
    let changed = table.set_computed(device, speeds);
    if changed {
        log::trace!("Device {} blended to ({:.3}, {:.3})", device, speeds.low, speeds.high);
    }
    changed
}
