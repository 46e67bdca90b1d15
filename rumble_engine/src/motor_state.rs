use rumble_shared::MotorSpeeds;

/// What the engine knows about one device's motors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorSpeedState {
    /// Latest blended value
    pub computed: MotorSpeeds,
    /// Last value that reached the hardware, `None` before the first write
    pub flushed: Option<MotorSpeeds>,
    pub dirty: bool,
}

impl MotorSpeedState {
    pub fn needs_write(&self) -> bool {
        self.flushed != Some(self.computed)
    }
}

/// Per-device computed/flushed pairs plus the queue of devices waiting for a flush.
#[derive(Debug, Default)]
pub struct MotorSpeedTable {
    states: Vec<MotorSpeedState>,
    dirty_queue: Vec<usize>,
}

impl MotorSpeedTable {
    pub fn new(device_count: usize) -> Self {
        Self {
            states: vec![MotorSpeedState::default(); device_count],
            dirty_queue: Vec::new(),
        }
    }

    pub fn ensure_devices(&mut self, device_count: usize) {
        if self.states.len() < device_count {
            self.states.resize(device_count, MotorSpeedState::default());
        }
    }

    pub fn device_count(&self) -> usize {
        self.states.len()
    }

    /// Store a freshly blended value. Marks the device dirty and returns true only if it changed.
    pub fn set_computed(&mut self, device: usize, speeds: MotorSpeeds) -> bool {
        self.ensure_devices(device + 1);
        if self.states[device].computed == speeds {
            return false;
        }
        self.states[device].computed = speeds;
        self.mark_dirty(device);
        true
    }

    pub fn mark_dirty(&mut self, device: usize) {
        self.ensure_devices(device + 1);
        let state = &mut self.states[device];
        if !state.dirty {
            state.dirty = true;
            self.dirty_queue.push(device);
        }
    }

    /// Hand out the dirty devices in the order they were flagged and clear their flags.
    pub fn take_dirty(&mut self) -> Vec<usize> {
        let queue = std::mem::take(&mut self.dirty_queue);
        for &device in &queue {
            self.states[device].dirty = false;
        }
        queue
    }

    pub fn record_flushed(&mut self, device: usize, speeds: MotorSpeeds) {
        self.ensure_devices(device + 1);
        self.states[device].flushed = Some(speeds);
    }

    pub fn state(&self, device: usize) -> Option<&MotorSpeedState> {
        self.states.get(device)
    }

    pub fn computed(&self, device: usize) -> Option<MotorSpeeds> {
        self.states.get(device).map(|s| s.computed)
    }

    pub fn flushed(&self, device: usize) -> Option<MotorSpeeds> {
        self.states.get(device).and_then(|s| s.flushed)
    }

    pub fn is_dirty(&self, device: usize) -> bool {
        self.states.get(device).is_some_and(|s| s.dirty)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty_queue.len()
    }
}
