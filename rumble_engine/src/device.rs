use rumble_shared::{DeviceError, MotorSpeeds};

/// Opaque identity of a gamepad as handed out by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    pub id: u64,
    pub name: String,
}

impl DeviceHandle {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

impl std::fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// The platform side of rumble output: device discovery and motor writes.
pub trait GamepadBackend {
    /// Currently connected gamepads. The position in this list is the device index the engine uses.
    fn enumerate_devices(&self) -> Vec<DeviceHandle>;

    /// Set both motors of one gamepad. Values are already clamped to `[0, 1]`.
    fn set_motor_speeds(&mut self, device: &DeviceHandle, low: f32, high: f32) -> Result<(), DeviceError>;
}

pub struct SimulatedPad {
    pub handle: DeviceHandle,
    pub connected: bool,
    pub current: MotorSpeeds,
    pub writes: Vec<MotorSpeeds>,
}

/// In-memory backend that records every motor write. Used by the headless demo and the tests.
pub struct SimulatedGamepads {
    pads: Vec<SimulatedPad>,
    next_id: u64,
}

impl SimulatedGamepads {
    pub fn new(count: usize) -> Self {
        let mut pads = Self {
            pads: Vec::with_capacity(count),
            next_id: 1,
        };
        for i in 0..count {
            pads.add_pad(format!("Simulated Pad {}", i + 1));
        }
        pads
    }

    pub fn add_pad(&mut self, name: impl Into<String>) -> DeviceHandle {
        let handle = DeviceHandle::new(self.next_id, name);
        self.next_id += 1;
        self.pads.push(SimulatedPad {
            handle: handle.clone(),
            connected: true,
            current: MotorSpeeds::ZERO,
            writes: Vec::new(),
        });
        handle
    }

    /// Keep the pad enumerated but fail every further write, like a controller that dropped mid-session.
    pub fn disconnect(&mut self, index: usize) {
        if let Some(pad) = self.pads.get_mut(index) {
            pad.connected = false;
        }
    }

    /// Drop the pad from enumeration entirely.
    pub fn remove(&mut self, index: usize) -> Option<SimulatedPad> {
        if index < self.pads.len() {
            Some(self.pads.remove(index))
        } else {
            None
        }
    }

    pub fn current(&self, index: usize) -> Option<MotorSpeeds> {
        self.pads.get(index).map(|p| p.current)
    }

    pub fn writes(&self, index: usize) -> &[MotorSpeeds] {
        self.pads.get(index).map(|p| p.writes.as_slice()).unwrap_or(&[])
    }

    pub fn write_count(&self, index: usize) -> usize {
        self.writes(index).len()
    }

    pub fn total_writes(&self) -> usize {
        self.pads.iter().map(|p| p.writes.len()).sum()
    }
}

impl GamepadBackend for SimulatedGamepads {
    fn enumerate_devices(&self) -> Vec<DeviceHandle> {
        self.pads.iter().map(|p| p.handle.clone()).collect()
    }

    fn set_motor_speeds(&mut self, device: &DeviceHandle, low: f32, high: f32) -> Result<(), DeviceError> {
        let pad = self
            .pads
            .iter_mut()
            .find(|p| p.handle.id == device.id)
            .ok_or_else(|| DeviceError::Disconnected(device.to_string()))?;
        if !pad.connected {
            return Err(DeviceError::Disconnected(device.to_string()));
        }
        let speeds = MotorSpeeds::new(low, high);
        pad.current = speeds;
        pad.writes.push(speeds);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_writes() {
        let mut pads = SimulatedGamepads::new(2);
        let devices = pads.enumerate_devices();
        assert_eq!(devices.len(), 2);

        pads.set_motor_speeds(&devices[1], 0.3, 0.6).unwrap();
        assert_eq!(pads.current(1), Some(MotorSpeeds::new(0.3, 0.6)));
        assert_eq!(pads.write_count(0), 0);
        assert_eq!(pads.write_count(1), 1);
    }

    #[test]
    fn test_disconnected_pad_rejects_writes() {
        let mut pads = SimulatedGamepads::new(1);
        let devices = pads.enumerate_devices();
        pads.disconnect(0);
        assert!(matches!(
            pads.set_motor_speeds(&devices[0], 1.0, 1.0),
            Err(DeviceError::Disconnected(_))
        ));
        assert_eq!(pads.total_writes(), 0);
    }

    #[test]
    fn test_removed_pad_is_not_enumerated() {
        let mut pads = SimulatedGamepads::new(3);
        let removed = pads.remove(1).unwrap();
        let devices = pads.enumerate_devices();
        assert_eq!(devices.len(), 2);
        assert!(!devices.contains(&removed.handle));
        assert!(pads.set_motor_speeds(&removed.handle, 0.1, 0.1).is_err());
    }
}
