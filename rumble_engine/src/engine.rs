use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use crossbeam_channel::Receiver;
use rumble_shared::{clamp01, ClipDefinition, DeviceTarget, MotorSpeeds};

use crate::blender::recompute_speeds;
use crate::commands::EngineCommand;
use crate::config::EngineConfig;
use crate::device::{DeviceHandle, GamepadBackend};
use crate::envelope::{sanitize_speed, InstanceMultipliers};
use crate::instance::{ClipInstance, InstanceHandle};
use crate::motor_state::MotorSpeedTable;
use crate::registry::PlaybackRegistry;
use crate::scheduler::UpdateScheduler;
use crate::snapshot::{DeviceMotorInfo, EngineSnapshot, InstanceInfo};
use crate::writer::{DeviceWriter, FlushReport};

/// Owns every playing clip and the motor state of every gamepad.
///
/// The engine is driven from a single thread: the host calls [`HapticEngine::tick`] once per frame.
/// Other threads talk to it through [`EngineCommand`]s and read the published [`EngineSnapshot`].
pub struct HapticEngine<B: GamepadBackend> {
    backend: B,
    devices: Vec<DeviceHandle>,
    registry: PlaybackRegistry,
    motors: MotorSpeedTable,
    scheduler: UpdateScheduler,
    writer: DeviceWriter,
    config: EngineConfig,
    strength_multiplier: f32,
    rng: fastrand::Rng,
    next_instance_id: u64,
    snapshot: Arc<ArcSwap<EngineSnapshot>>,
    focused: bool,
    shut_down: bool,
}

impl<B: GamepadBackend> HapticEngine<B> {
    pub fn new(backend: B, config: EngineConfig) -> Self {
        let devices = backend.enumerate_devices();
        let rng = match config.random_seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        log::info!(
            "Haptic engine started with {} device(s), flush interval {:.3}s",
            devices.len(),
            config.flush_interval_secs
        );

        let engine = Self {
            registry: PlaybackRegistry::new(devices.len()),
            motors: MotorSpeedTable::new(devices.len()),
            scheduler: UpdateScheduler::new(config.flush_interval_secs),
            writer: DeviceWriter::new(),
            strength_multiplier: clamp01(config.strength_multiplier),
            rng,
            next_instance_id: 1,
            snapshot: Arc::new(ArcSwap::from_pointee(EngineSnapshot::default())),
            focused: true,
            shut_down: false,
            devices,
            backend,
            config,
        };
        engine.publish_snapshot();
        engine
    }

    // --- Playback ---

    /// Play `definition` with default instance multipliers.
    pub fn play(&mut self, definition: Arc<ClipDefinition>, target: DeviceTarget) -> Option<InstanceHandle> {
        self.play_with(definition, target, InstanceMultipliers::default())
    }

    /// Start a new instance of `definition`. Returns `None` when `target` names a device that does not exist.
    pub fn play_with(
        &mut self,
        definition: Arc<ClipDefinition>,
        target: DeviceTarget,
        multipliers: InstanceMultipliers,
    ) -> Option<InstanceHandle> {
        if self.shut_down {
            log::warn!("Ignoring play of '{}': engine is shut down", definition.name());
            return None;
        }
        let devices: Vec<usize> = match target {
            DeviceTarget::All => (0..self.devices.len()).collect(),
            DeviceTarget::Index(index) if index < self.devices.len() => vec![index],
            DeviceTarget::Index(index) => {
                log::warn!(
                    "Cannot play '{}' on device index {}: only {} device(s) connected",
                    definition.name(),
                    index,
                    self.devices.len()
                );
                return None;
            }
        };

        let handle = InstanceHandle::new(self.next_instance_id);
        self.next_instance_id += 1;

        let multipliers = InstanceMultipliers {
            speed: sanitize_speed(multipliers.speed),
            ..multipliers
        };
        let mut instance = ClipInstance::new(
            handle,
            definition,
            target,
            multipliers,
            self.config.min_clip_duration_secs,
        );
        instance.activate(&mut self.rng);
        log::debug!(
            "Playing '{}' {} on {} (strength {:.3})",
            instance.definition().name(),
            handle,
            target,
            instance.base_strength()
        );

        self.registry.insert(instance, devices.clone());
        self.recompute_devices(&devices);
        Some(handle)
    }

    /// Play on the device identified by `device`. Returns `None` when the backend no longer lists it.
    pub fn play_on_device(
        &mut self,
        definition: Arc<ClipDefinition>,
        device: &DeviceHandle,
        multipliers: InstanceMultipliers,
    ) -> Option<InstanceHandle> {
        let Some(index) = self.devices.iter().position(|d| d.id == device.id) else {
            log::warn!("Cannot play '{}' on unknown device {}", definition.name(), device);
            return None;
        };
        self.play_with(definition, DeviceTarget::Index(index), multipliers)
    }

    /// Stop one instance. Hardware follows on the next flush. Stale handles are ignored.
    pub fn stop(&mut self, handle: InstanceHandle) -> bool {
        let Some((mut instance, devices)) = self.registry.remove(handle) else {
            return false;
        };
        instance.stop();
        log::debug!("Stopped '{}' {}", instance.definition().name(), handle);
        self.recompute_devices(&devices);
        true
    }

    /// Stop one instance and push the result to the hardware right away.
    pub fn stop_with_flush(&mut self, handle: InstanceHandle) -> bool {
        let stopped = self.stop(handle);
        self.force_flush();
        stopped
    }

    pub fn stop_all(&mut self) -> usize {
        let drained = self.registry.drain();
        let count = drained.len();
        for (mut instance, _) in drained {
            instance.stop();
        }
        if count > 0 {
            log::debug!("Stopped {} instance(s)", count);
        }
        recompute_speeds(&self.registry, &mut self.motors, DeviceTarget::All, self.strength_multiplier);
        count
    }

    // --- Multipliers ---

    /// Scale every clip on every device. Clamped to `[0, 1]`.
    pub fn set_strength_multiplier(&mut self, multiplier: f32) {
        let multiplier = clamp01(multiplier);
        if multiplier == self.strength_multiplier {
            return;
        }
        self.strength_multiplier = multiplier;
        recompute_speeds(&self.registry, &mut self.motors, DeviceTarget::All, multiplier);
    }

    pub fn strength_multiplier(&self) -> f32 {
        self.strength_multiplier
    }

    /// Change how fast an instance runs through its curves. Returns false for stale handles.
    pub fn set_speed_multiplier(&mut self, handle: InstanceHandle, speed: f32) -> bool {
        let Some(instance) = self.registry.get_mut(handle) else {
            return false;
        };
        instance.set_speed(speed);
        if instance.uses_progression_curve() {
            let devices = self.registry.devices_of(handle).to_vec();
            self.recompute_devices(&devices);
        }
        true
    }

    // --- Ticking ---

    pub fn tick(&mut self, delta: Duration) {
        self.tick_secs(delta.as_secs_f64());
    }

    /// Advance every instance by `delta` seconds, re-blend what moved and flush if the interval elapsed.
    pub fn tick_secs(&mut self, delta: f64) {
        if self.shut_down {
            return;
        }
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };

        let report = self.scheduler.advance_instances(&mut self.registry, delta);
        for &device in &report.reblend {
            recompute_speeds(
                &self.registry,
                &mut self.motors,
                DeviceTarget::Index(device),
                self.strength_multiplier,
            );
        }

        if self.scheduler.flush_due(delta) {
            self.flush();
        }
        self.publish_snapshot();
    }

    /// Drain pending commands without blocking. Returns how many were handled.
    pub fn process_commands(&mut self, command_rx: &Receiver<EngineCommand>) -> usize {
        let mut handled = 0;
        while let Ok(cmd) = command_rx.try_recv() {
            self.handle_command(cmd);
            handled += 1;
        }
        handled
    }

    pub fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Play {
                definition,
                target,
                multipliers,
                response_tx,
            } => {
                let handle = self.play_with(definition, target, multipliers);
                if let Some(tx) = response_tx {
                    let _ = tx.send(handle);
                }
            }
            EngineCommand::Stop { handle, force_flush } => {
                self.stop(handle);
                if force_flush {
                    self.force_flush();
                }
            }
            EngineCommand::StopAll { force_flush } => {
                self.stop_all();
                if force_flush {
                    self.force_flush();
                }
            }
            EngineCommand::SetStrengthMultiplier(multiplier) => self.set_strength_multiplier(multiplier),
            EngineCommand::SetSpeedMultiplier { handle, speed } => {
                self.set_speed_multiplier(handle, speed);
            }
            EngineCommand::FocusChanged(focused) => self.on_focus_changed(focused),
            EngineCommand::RefreshDevices => self.refresh_devices(),
            EngineCommand::ForceFlush => {
                self.force_flush();
            }
            EngineCommand::Shutdown => self.shutdown(),
        }
    }

    // --- Device output ---

    /// Write every pending change now and restart the flush interval.
    pub fn force_flush(&mut self) -> FlushReport {
        self.scheduler.reset_flush_timer();
        self.flush()
    }

    fn flush(&mut self) -> FlushReport {
        let report = self.writer.flush(&mut self.motors, &mut self.backend, &self.devices);
        if report.failed > 0 {
            log::debug!("{} of {} rumble write(s) failed", report.failed, report.failed + report.written);
        }
        report
    }

    /// Stop everything and write zero to every device immediately.
    pub fn silence(&mut self) {
        self.stop_all();
        self.writer.silence_all(&mut self.motors, &mut self.backend, &self.devices);
        self.scheduler.reset_flush_timer();
    }

    pub fn on_focus_changed(&mut self, focused: bool) {
        if focused == self.focused {
            return;
        }
        self.focused = focused;
        if focused {
            log::info!("Application focus regained");
        } else if self.config.silence_on_focus_loss {
            log::info!("Application focus lost, silencing rumble");
            self.silence();
            self.publish_snapshot();
        }
    }

    pub fn has_focus(&self) -> bool {
        self.focused
    }

    /// Re-enumerate gamepads. New devices start with no instances; running all-device clips stay where they were.
    pub fn refresh_devices(&mut self) {
        let devices = self.backend.enumerate_devices();
        if devices.len() != self.devices.len() {
            log::info!("Device count changed from {} to {}", self.devices.len(), devices.len());
        }
        self.registry.ensure_devices(devices.len());
        self.motors.ensure_devices(devices.len());
        self.devices = devices;
    }

    /// Stop all playback and silence the hardware. The engine ignores further requests afterwards.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        log::info!("Haptic engine shutting down");
        self.silence();
        self.shut_down = true;
        self.publish_snapshot();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    // --- Queries ---

    pub fn is_playing(&self, handle: InstanceHandle) -> bool {
        self.registry.get(handle).is_some_and(|i| i.is_playing())
    }

    pub fn instance_info(&self, handle: InstanceHandle) -> Option<InstanceInfo> {
        self.registry
            .get(handle)
            .map(|i| InstanceInfo::from_instance(i, self.strength_multiplier))
    }

    pub fn instances_on(&self, device: usize) -> Vec<InstanceHandle> {
        self.registry.handles_on(device).to_vec()
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    /// Latest blended value for `device`, which may not have reached the hardware yet.
    pub fn computed_speeds(&self, device: usize) -> Option<MotorSpeeds> {
        self.motors.computed(device)
    }

    pub fn flushed_speeds(&self, device: usize) -> Option<MotorSpeeds> {
        self.motors.flushed(device)
    }

    pub fn devices(&self) -> &[DeviceHandle] {
        &self.devices
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn clock(&self) -> f64 {
        self.scheduler.clock()
    }

    pub fn total_writes(&self) -> u64 {
        self.writer.total_writes()
    }

    pub fn failed_writes(&self) -> u64 {
        self.writer.total_failures()
    }

    /// Shared handle other threads can `load()` the latest snapshot from.
    pub fn snapshot_handle(&self) -> Arc<ArcSwap<EngineSnapshot>> {
        self.snapshot.clone()
    }

    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        self.snapshot.load_full()
    }

    fn recompute_devices(&mut self, devices: &[usize]) {
        for &device in devices {
            recompute_speeds(
                &self.registry,
                &mut self.motors,
                DeviceTarget::Index(device),
                self.strength_multiplier,
            );
        }
    }

    fn publish_snapshot(&self) {
        let instances = self
            .registry
            .iter()
            .map(|(instance, _)| InstanceInfo::from_instance(instance, self.strength_multiplier))
            .collect();
        let devices = self
            .devices
            .iter()
            .enumerate()
            .map(|(index, handle)| {
                let state = self.motors.state(index).copied().unwrap_or_default();
                DeviceMotorInfo {
                    index,
                    name: handle.name.clone(),
                    computed: state.computed,
                    flushed: state.flushed,
                    dirty: state.dirty,
                    instance_count: self.registry.handles_on(index).len(),
                }
            })
            .collect();
        self.snapshot.store(Arc::new(EngineSnapshot {
            clock: self.scheduler.clock(),
            strength_multiplier: self.strength_multiplier,
            instances,
            devices,
        }));
    }
}

impl<B: GamepadBackend> Drop for HapticEngine<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
