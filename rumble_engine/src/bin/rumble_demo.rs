use anyhow::Context;
use crossbeam_channel::{bounded, unbounded};
use rumble_engine::{EngineCommand, EngineConfig, HapticEngine, InstanceMultipliers, SimulatedGamepads};
use rumble_shared::{ClipDefinition, DeviceTarget, Keyframe, ProgressionCurve, RandomizedParameter};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_micros(16_667);

fn builtin_clips() -> Vec<ClipDefinition> {
    vec![
        ClipDefinition::new(0.8).with_name("impact").with_duration(0.15),
        ClipDefinition::new(0.0)
            .with_name("engine idle")
            .with_strength(RandomizedParameter::random(0.25, 0.4))
            .with_channel_multipliers(1.0, 0.3)
            .with_duration(0.6)
            .looping(true)
            .with_high_curve(ProgressionCurve::from_keys([
                Keyframe::new(0.0, 0.2),
                Keyframe::new(0.5, 1.0),
                Keyframe::new(1.0, 0.2),
            ])),
        ClipDefinition::new(1.0)
            .with_name("charge up")
            .with_duration(1.5)
            .with_global_curve(ProgressionCurve::ramp_up()),
    ]
}

fn load_clips(path: &str) -> anyhow::Result<Vec<ClipDefinition>> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read clip library {}", path))?;
    let clips: Vec<ClipDefinition> =
        serde_json::from_str(&json).with_context(|| format!("Failed to parse clip library {}", path))?;
    Ok(clips)
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    // rumble_demo [config.json] [clips.json]
    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let clips = match args.get(2) {
        Some(path) => load_clips(path)?,
        None => builtin_clips(),
    };
    anyhow::ensure!(!clips.is_empty(), "Clip library is empty");
    let clips: Vec<Arc<ClipDefinition>> = clips.into_iter().map(Arc::new).collect();

    let mut engine = HapticEngine::new(SimulatedGamepads::new(2), config);
    let snapshots = engine.snapshot_handle();
    let (cmd_tx, cmd_rx) = unbounded();

    println!("[Demo] {} clip(s), {} simulated pad(s)", clips.len(), engine.devices().len());

    // Game-side thread: fires clips the way gameplay code would
    let game = thread::spawn(move || -> anyhow::Result<()> {
        let mut looping = None;
        for (step, clip) in clips.iter().cycle().take(6).enumerate() {
            let (resp_tx, resp_rx) = bounded(1);
            let target = if step % 2 == 0 { DeviceTarget::All } else { DeviceTarget::Index(1) };
            cmd_tx.send(EngineCommand::Play {
                definition: clip.clone(),
                target,
                multipliers: InstanceMultipliers::default(),
                response_tx: Some(resp_tx),
            })?;
            let handle = resp_rx.recv()?;
            println!("[Demo] Played '{}' on {} -> {:?}", clip.name(), target, handle);
            if clip.is_looping() && looping.is_none() {
                looping = handle;
            }
            thread::sleep(Duration::from_millis(400));
        }

        if let Some(handle) = looping {
            cmd_tx.send(EngineCommand::SetSpeedMultiplier { handle, speed: 2.0 })?;
        }
        cmd_tx.send(EngineCommand::SetStrengthMultiplier(0.5))?;
        thread::sleep(Duration::from_millis(500));

        cmd_tx.send(EngineCommand::FocusChanged(false))?;
        thread::sleep(Duration::from_millis(200));
        cmd_tx.send(EngineCommand::Shutdown)?;
        Ok(())
    });

    // Host update loop
    let started = Instant::now();
    let mut last = started;
    let mut frame: u64 = 0;
    while !engine.is_shut_down() {
        engine.process_commands(&cmd_rx);
        let now = Instant::now();
        engine.tick(now - last);
        last = now;

        frame += 1;
        if frame % 30 == 0 {
            let snapshot = snapshots.load();
            for device in &snapshot.devices {
                println!(
                    "[Demo] t={:.2}s {} low {:.3} high {:.3} ({} clip(s))",
                    snapshot.clock, device.name, device.computed.low, device.computed.high, device.instance_count
                );
            }
        }
        if started.elapsed() > Duration::from_secs(30) {
            engine.shutdown();
        }
        thread::sleep(TICK);
    }

    game.join().map_err(|_| anyhow::anyhow!("Game thread panicked"))??;

    let pads = engine.backend();
    for (index, device) in engine.devices().iter().enumerate() {
        println!("[Demo] {}: {} write(s), final {:?}", device, pads.write_count(index), pads.current(index));
    }
    println!("[Demo] Done.");
    Ok(())
}
