use rumble_shared::MotorSpeeds;

use crate::device::{DeviceHandle, GamepadBackend};
use crate::motor_state::MotorSpeedTable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub written: usize,
    /// Dirty devices whose value already matched the hardware
    pub unchanged: usize,
    pub failed: usize,
    /// Device indices the backend no longer enumerates
    pub invalid: usize,
}

/// Pushes blended motor speeds to the backend, skipping writes the hardware already has.
#[derive(Debug, Default)]
pub struct DeviceWriter {
    total_writes: u64,
    total_failures: u64,
}

impl DeviceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write every dirty device whose computed value differs from the last flushed one.
    ///
    /// Failed writes are not retried; the device is written again once its value changes.
    pub fn flush<B: GamepadBackend>(
        &mut self,
        table: &mut MotorSpeedTable,
        backend: &mut B,
        devices: &[DeviceHandle],
    ) -> FlushReport {
        let mut report = FlushReport::default();
        for device in table.take_dirty() {
            let Some(handle) = devices.get(device) else {
                log::warn!("Skipping motor update for invalid device index {}", device);
                report.invalid += 1;
                continue;
            };
            let Some(state) = table.state(device).copied() else {
                continue;
            };
            if !state.needs_write() {
                report.unchanged += 1;
                continue;
            }
            if self.write(backend, handle, state.computed) {
                table.record_flushed(device, state.computed);
                report.written += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    /// Write zero to every enumerated device, whatever the table says. Used on focus loss and shutdown.
    pub fn silence_all<B: GamepadBackend>(
        &mut self,
        table: &mut MotorSpeedTable,
        backend: &mut B,
        devices: &[DeviceHandle],
    ) -> FlushReport {
        // Nothing left to flush after this
        table.take_dirty();

        let mut report = FlushReport::default();
        for (device, handle) in devices.iter().enumerate() {
            table.set_computed(device, MotorSpeeds::ZERO);
            if self.write(backend, handle, MotorSpeeds::ZERO) {
                table.record_flushed(device, MotorSpeeds::ZERO);
                report.written += 1;
            } else {
                report.failed += 1;
            }
        }
        table.take_dirty();
        report
    }

    fn write<B: GamepadBackend>(&mut self, backend: &mut B, handle: &DeviceHandle, speeds: MotorSpeeds) -> bool {
        let speeds = speeds.clamped();
        match backend.set_motor_speeds(handle, speeds.low, speeds.high) {
            Ok(()) => {
                log::debug!("Motor speeds for {}: low {:.3}, high {:.3}", handle, speeds.low, speeds.high);
                self.total_writes += 1;
                true
            }
            Err(e) => {
                log::warn!("Rumble write failed: {}", e);
                self.total_failures += 1;
                false
            }
        }
    }

    pub fn total_writes(&self) -> u64 {
        self.total_writes
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }
}
