#[cfg(test)]
mod tests {
    use crate::{EngineCommand, EngineConfig, HapticEngine, InstanceMultipliers, SimulatedGamepads};
    use approx::assert_relative_eq;
    use crossbeam_channel::{bounded, unbounded};
    use rumble_shared::{ClipDefinition, DeviceTarget, MotorSpeeds, ProgressionCurve, RandomizedParameter};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn engine_with(pads: usize, config: EngineConfig) -> HapticEngine<SimulatedGamepads> {
        HapticEngine::new(SimulatedGamepads::new(pads), config)
    }

    fn engine(pads: usize) -> HapticEngine<SimulatedGamepads> {
        engine_with(pads, EngineConfig::default().with_seed(7))
    }

    #[test]
    fn test_overlapping_clips_blend_to_loudest_then_release() {
        let mut engine = engine(1);
        let soft = Arc::new(ClipDefinition::new(0.5).with_duration(1.0).with_name("soft"));
        let hard = Arc::new(ClipDefinition::new(0.8).with_duration(1.0).with_name("hard"));
        let a = engine.play(soft, DeviceTarget::Index(0)).unwrap();
        let b = engine.play(hard, DeviceTarget::Index(0)).unwrap();

        // Quarter-second ticks keep the clock exact; the flush interval elapses on every tick
        for _ in 0..3 {
            engine.tick(Duration::from_millis(250));
            assert!(engine.is_playing(a) && engine.is_playing(b));
            let current = engine.backend().current(0).unwrap();
            assert_relative_eq!(current.low, 0.8);
            assert_relative_eq!(current.high, 0.8);
        }

        engine.tick(Duration::from_millis(250));
        assert!(!engine.is_playing(a) && !engine.is_playing(b));
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.backend().current(0), Some(MotorSpeeds::ZERO));
    }

    #[test]
    fn test_clip_plays_for_its_duration() {
        let mut engine = engine(1);
        let handle = engine
            .play(Arc::new(ClipDefinition::new(0.5).with_duration(0.5)), DeviceTarget::Index(0))
            .unwrap();
        let tick = 1.0 / 64.0;
        let mut elapsed = 0.0;
        while engine.is_playing(handle) {
            engine.tick_secs(tick);
            elapsed += tick;
            assert!(elapsed <= 0.5 + tick, "clip outlived its duration");
        }
        assert!(elapsed >= 0.5);
    }

    #[test]
    fn test_invalid_index_returns_none() {
        let mut engine = engine(2);
        let before = engine.snapshot();
        assert!(engine.play(Arc::new(ClipDefinition::new(1.0)), DeviceTarget::Index(7)).is_none());
        assert_eq!(engine.active_count(), 0);
        assert_eq!(*engine.snapshot(), *before);
    }

    #[test]
    fn test_constant_intensity_writes_once() {
        let mut engine = engine(1);
        let def = Arc::new(ClipDefinition::new(0.6).looping(true));
        engine.play(def, DeviceTarget::Index(0)).unwrap();

        for _ in 0..120 {
            engine.tick(Duration::from_secs_f64(1.0 / 60.0));
        }
        assert_eq!(engine.backend().write_count(0), 1);
    }

    #[test]
    fn test_change_is_written_within_one_flush_interval() {
        let mut engine = engine(1);
        engine.play(Arc::new(ClipDefinition::new(0.6).looping(true)), DeviceTarget::Index(0));
        engine.force_flush();
        assert_eq!(engine.backend().write_count(0), 1);

        engine.set_strength_multiplier(0.5);
        // 0.1 s interval at 64 Hz: seven ticks cover it
        for _ in 0..7 {
            engine.tick_secs(1.0 / 64.0);
        }
        assert_eq!(engine.backend().write_count(0), 2);
        assert_relative_eq!(engine.backend().current(0).unwrap().low, 0.3);
    }

    #[test]
    fn test_curved_clip_follows_curve() {
        let mut engine = engine_with(1, EngineConfig::default().with_seed(1).with_flush_interval(0.0));
        let def = Arc::new(
            ClipDefinition::new(1.0)
                .with_duration(1.0)
                .with_channel_multipliers(1.0, 0.5)
                .with_low_curve(ProgressionCurve::ramp_down()),
        );
        engine.play(def, DeviceTarget::Index(0)).unwrap();
        engine.tick_secs(0.25);
        let current = engine.backend().current(0).unwrap();
        assert_relative_eq!(current.low, 0.75, epsilon = 1e-5);
        assert_relative_eq!(current.high, 0.5, epsilon = 1e-5);

        engine.tick_secs(0.5);
        assert_relative_eq!(engine.backend().current(0).unwrap().low, 0.25, epsilon = 1e-5);
    }

    #[test]
    fn test_stop_all_with_forced_flush_zeroes_devices() {
        let mut engine = engine(3);
        engine.play(Arc::new(ClipDefinition::new(0.7).looping(true)), DeviceTarget::All);
        engine.play(Arc::new(ClipDefinition::new(0.4).looping(true)), DeviceTarget::Index(2));
        engine.force_flush();
        assert_relative_eq!(engine.backend().current(2).unwrap().low, 0.7);

        assert_eq!(engine.stop_all(), 2);
        engine.force_flush();
        for d in 0..3 {
            assert_eq!(engine.backend().current(d), Some(MotorSpeeds::ZERO));
            assert_eq!(engine.flushed_speeds(d), Some(MotorSpeeds::ZERO));
        }
    }

    #[test]
    fn test_stopping_shared_instance_restores_other() {
        let mut engine = engine(2);
        let shared = engine
            .play(Arc::new(ClipDefinition::new(0.9).looping(true)), DeviceTarget::All)
            .unwrap();
        engine.play(Arc::new(ClipDefinition::new(0.3).looping(true)), DeviceTarget::Index(1));

        assert!(engine.stop_with_flush(shared));
        assert_eq!(engine.backend().current(0), Some(MotorSpeeds::ZERO));
        assert_relative_eq!(engine.backend().current(1).unwrap().low, 0.3);
    }

    #[test]
    fn test_looping_clip_keeps_playing() {
        let mut engine = engine(1);
        let handle = engine
            .play(
                Arc::new(ClipDefinition::new(0.5).with_duration(0.25).looping(true)),
                DeviceTarget::Index(0),
            )
            .unwrap();
        for _ in 0..200 {
            engine.tick_secs(0.05);
        }
        assert!(engine.is_playing(handle));
        assert!(engine.instance_info(handle).unwrap().cycles >= 39);

        engine.stop(handle);
        assert!(!engine.is_playing(handle));
    }

    #[test]
    fn test_random_strength_stable_and_spread() {
        let mut engine = engine(1);
        let def = Arc::new(
            ClipDefinition::new(0.0)
                .with_strength(RandomizedParameter::random(0.2, 0.8))
                .looping(true),
        );
        let handles: Vec<_> = (0..200)
            .map(|_| engine.play(def.clone(), DeviceTarget::Index(0)).unwrap())
            .collect();

        let first: Vec<f32> = handles
            .iter()
            .map(|h| engine.instance_info(*h).unwrap().base_strength)
            .collect();
        for _ in 0..10 {
            engine.tick_secs(0.05);
        }
        let later: Vec<f32> = handles
            .iter()
            .map(|h| engine.instance_info(*h).unwrap().base_strength)
            .collect();
        assert_eq!(first, later);

        assert!(first.iter().all(|s| (0.2..=0.8).contains(s)));
        let min = first.iter().copied().fold(f32::MAX, f32::min);
        let max = first.iter().copied().fold(f32::MIN, f32::max);
        assert!(min < 0.3 && max > 0.7, "strengths not spread: {}..{}", min, max);
    }

    #[test]
    fn test_library_clip_strength_is_normalized() {
        let mut engine = engine(1);
        let loud: ClipDefinition =
            serde_json::from_str(r#"{ "strength": { "mode": "Constant", "min": 5.0, "max": 5.0 } }"#).unwrap();
        let handle = engine
            .play_with(Arc::new(loud), DeviceTarget::Index(0), InstanceMultipliers::new(0.1, 1.0, 1.0))
            .unwrap();
        assert_eq!(engine.instance_info(handle).unwrap().base_strength, 1.0);
        assert_relative_eq!(engine.computed_speeds(0).unwrap().low, 0.1);

        let inverted: ClipDefinition =
            serde_json::from_str(r#"{ "strength": { "mode": "Random", "min": 0.9, "max": 0.1 } }"#).unwrap();
        let inverted = Arc::new(inverted);
        let strengths: Vec<f32> = (0..50)
            .map(|_| {
                let h = engine.play(inverted.clone(), DeviceTarget::Index(0)).unwrap();
                engine.instance_info(h).unwrap().base_strength
            })
            .collect();
        assert!(strengths.iter().all(|s| (0.1..=0.9).contains(s)));
        assert!(strengths.iter().any(|s| *s != strengths[0]));
    }

    #[test]
    fn test_huge_ticks_keep_looping_clip_alive() {
        let mut engine = engine(1);
        let handle = engine
            .play(
                Arc::new(ClipDefinition::new(0.5).with_duration(0.01).looping(true)),
                DeviceTarget::Index(0),
            )
            .unwrap();
        engine.tick(Duration::from_secs(100_000_000));
        engine.tick(Duration::from_secs(1));
        assert!(engine.is_playing(handle));
        assert_eq!(engine.instance_info(handle).unwrap().cycles, u32::MAX);
    }

    #[test]
    fn test_focus_loss_silences_everything() {
        let mut engine = engine(2);
        let handle = engine
            .play(Arc::new(ClipDefinition::new(0.9).looping(true)), DeviceTarget::All)
            .unwrap();
        engine.force_flush();

        engine.on_focus_changed(false);
        assert!(!engine.is_playing(handle));
        for d in 0..2 {
            assert_eq!(engine.backend().current(d), Some(MotorSpeeds::ZERO));
        }
    }

    #[test]
    fn test_focus_loss_can_be_ignored() {
        let config = EngineConfig {
            silence_on_focus_loss: false,
            ..EngineConfig::default()
        };
        let mut engine = engine_with(1, config);
        let handle = engine
            .play(Arc::new(ClipDefinition::new(0.9).looping(true)), DeviceTarget::All)
            .unwrap();
        engine.on_focus_changed(false);
        assert!(engine.is_playing(handle));
        assert!(!engine.has_focus());
    }

    #[test]
    fn test_disconnected_device_does_not_stop_others() {
        let mut engine = engine(2);
        engine.backend_mut().disconnect(0);
        engine.play(Arc::new(ClipDefinition::new(0.5).looping(true)), DeviceTarget::All);
        engine.tick_secs(0.1);

        assert_eq!(engine.backend().write_count(0), 0);
        assert_relative_eq!(engine.backend().current(1).unwrap().low, 0.5);
        assert_eq!(engine.failed_writes(), 1);
        assert_eq!(engine.flushed_speeds(0), None);

        // No retry while the value stays the same
        engine.tick_secs(0.1);
        assert_eq!(engine.failed_writes(), 1);
    }

    #[test]
    fn test_removed_device_index_is_skipped() {
        let mut engine = engine(2);
        engine.play(Arc::new(ClipDefinition::new(0.5).looping(true)), DeviceTarget::All);
        engine.backend_mut().remove(1);
        engine.refresh_devices();
        engine.force_flush();

        assert_eq!(engine.devices().len(), 1);
        assert_relative_eq!(engine.backend().current(0).unwrap().low, 0.5);
        assert_eq!(engine.backend().total_writes(), 1);
    }

    #[test]
    fn test_commands_from_another_thread() {
        let mut engine = engine(2);
        let (cmd_tx, cmd_rx) = unbounded();
        let (resp_tx, resp_rx) = bounded(1);

        let sender = thread::spawn(move || {
            cmd_tx
                .send(EngineCommand::Play {
                    definition: Arc::new(ClipDefinition::new(0.8).looping(true)),
                    target: DeviceTarget::Index(1),
                    multipliers: InstanceMultipliers::new(0.5, 1.0, 1.0),
                    response_tx: Some(resp_tx),
                })
                .unwrap();
            cmd_tx
        });
        let cmd_tx = sender.join().unwrap();

        assert_eq!(engine.process_commands(&cmd_rx), 1);
        let handle = resp_rx.recv().unwrap().unwrap();
        assert!(engine.is_playing(handle));
        assert_relative_eq!(engine.computed_speeds(1).unwrap().low, 0.4);

        cmd_tx.send(EngineCommand::SetStrengthMultiplier(0.5)).unwrap();
        cmd_tx.send(EngineCommand::StopAll { force_flush: true }).unwrap();
        assert_eq!(engine.process_commands(&cmd_rx), 2);
        assert_eq!(engine.strength_multiplier(), 0.5);
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.backend().current(1), Some(MotorSpeeds::ZERO));

        cmd_tx.send(EngineCommand::Shutdown).unwrap();
        engine.process_commands(&cmd_rx);
        assert!(engine.is_shut_down());
    }

    #[test]
    fn test_snapshot_visible_from_reader_thread() {
        let mut engine = engine(1);
        let snapshots = engine.snapshot_handle();
        let handle = engine
            .play(Arc::new(ClipDefinition::new(0.5).looping(true)), DeviceTarget::Index(0))
            .unwrap();
        engine.tick_secs(0.1);

        let reader = thread::spawn(move || {
            let snapshot = snapshots.load_full();
            (snapshot.instances.len(), snapshot.device(0).map(|d| d.computed))
        });
        let (count, computed) = reader.join().unwrap();
        assert_eq!(count, 1);
        assert_eq!(computed, engine.computed_speeds(0));
        assert!(engine.instance_info(handle).is_some());
    }
}
