use std::collections::BTreeSet;

use crate::instance::{Advance, InstanceHandle};
use crate::registry::PlaybackRegistry;

/// Outcome of advancing all instances by one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Devices whose blended value may have changed
    pub reblend: BTreeSet<usize>,
    /// Instances that finished and were taken out of the registry
    pub completed: Vec<InstanceHandle>,
}

/// Drives clip progress every tick and paces device flushes independently of the tick rate.
pub struct UpdateScheduler {
    clock: f64,
    flush_interval: f64,
    since_flush: f64,
}

impl UpdateScheduler {
    pub fn new(flush_interval: f64) -> Self {
        Self {
            clock: 0.0,
            flush_interval: flush_interval.max(0.0),
            since_flush: 0.0,
        }
    }

    /// Advance every playing instance, then retire the ones that completed.
    ///
    /// All progress updates finish before the report is returned, so callers re-blend each device
    /// at most once per tick and only after every contributor moved.
    pub fn advance_instances(&mut self, registry: &mut PlaybackRegistry, delta: f64) -> TickReport {
        self.clock += delta;

        let mut report = TickReport::default();
        for (instance, devices) in registry.iter_mut() {
            match instance.advance(delta) {
                Advance::Progressed | Advance::Looped => {
                    if instance.uses_progression_curve() {
                        report.reblend.extend(devices.iter().copied());
                    }
                }
                Advance::Completed => report.completed.push(instance.handle()),
                Advance::Idle => {}
            }
        }

        for &handle in &report.completed {
            if let Some((mut instance, devices)) = registry.remove(handle) {
                instance.stop();
                log::debug!(
                    "Clip '{}' {} completed after {:.3}s",
                    instance.definition().name(),
                    handle,
                    instance.total_elapsed()
                );
                report.reblend.extend(devices);
            }
        }
        report
    }

    /// Account for `delta` on the flush timer. Returns true when a flush pass is due.
    pub fn flush_due(&mut self, delta: f64) -> bool {
        self.since_flush += delta;
        if self.since_flush >= self.flush_interval {
            self.since_flush = 0.0;
            true
        } else {
            false
        }
    }

    /// Restart the flush interval, used after a forced flush.
    pub fn reset_flush_timer(&mut self) {
        self.since_flush = 0.0;
    }

    /// Seconds of tick time accumulated since the engine started.
    pub fn clock(&self) -> f64 {
        self.clock
    }
}
