pub mod blender;
pub mod commands;
pub mod config;
pub mod device;
pub mod engine; // HapticEngine lives here
pub mod envelope;
pub mod instance;
pub mod motor_state;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod writer;

#[cfg(test)]
mod tests_playback;

// Re-exports
pub use commands::EngineCommand;
pub use config::EngineConfig;
pub use device::{DeviceHandle, GamepadBackend, SimulatedGamepads};
pub use engine::HapticEngine;
pub use envelope::InstanceMultipliers;
pub use instance::{InstanceHandle, InstanceState};
pub use snapshot::{DeviceMotorInfo, EngineSnapshot, InstanceInfo};
