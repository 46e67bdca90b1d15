use thiserror::Error;

/// Failures reported by a gamepad backend when writing motor speeds.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    #[error("device {0} is no longer connected")]
    Disconnected(String),
    #[error("device {device} rejected the rumble write: {reason}")]
    Rejected { device: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
}
