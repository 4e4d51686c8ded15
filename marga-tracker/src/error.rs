//! Error types for the trajectory tracker.

use thiserror::Error;

/// Tracker error type.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Waypoint velocity must be non-negative, got {0}")]
    NegativeVelocity(f32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for TrackerError {
    fn from(e: toml::de::Error) -> Self {
        TrackerError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
