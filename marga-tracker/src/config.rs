//! Configuration loading for the trajectory tracker.

use crate::error::{Result, TrackerError};
use crate::tracker::TrackerParams;
use serde::Deserialize;
use std::path::Path;

/// Tracker startup configuration, loaded from TOML.
///
/// The `[params]` table carries the runtime-adjustable control surface;
/// everything else is fixed at startup (except the frames, which
/// odometry may auto-correct).
#[derive(Clone, Debug, Deserialize)]
pub struct TrackerConfig {
    /// Robot body frame (default: "base_link")
    #[serde(default = "default_frame_robot")]
    pub frame_robot: String,

    /// Odometry frame (default: "odom")
    #[serde(default = "default_frame_odom")]
    pub frame_odom: String,

    /// Timer tick rate in Hz (default: 50)
    #[serde(default = "default_hz")]
    pub hz: f64,

    /// Tick on odometry messages instead of the timer (default: false)
    #[serde(default)]
    pub use_odom: bool,

    /// Extrapolate the odometry pose by its twist (default: true)
    #[serde(default = "default_predict_odom")]
    pub predict_odom: bool,

    /// Upper bound on tick and prediction intervals in seconds
    /// (default: 0.2)
    #[serde(default = "default_max_dt")]
    pub max_dt: f64,

    /// Control-law parameters
    #[serde(default)]
    pub params: TrackerParams,
}

fn default_frame_robot() -> String {
    "base_link".to_string()
}
fn default_frame_odom() -> String {
    "odom".to_string()
}
fn default_hz() -> f64 {
    50.0
}
fn default_predict_odom() -> bool {
    true
}
fn default_max_dt() -> f64 {
    0.2
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frame_robot: default_frame_robot(),
            frame_odom: default_frame_odom(),
            hz: default_hz(),
            use_odom: false,
            predict_odom: default_predict_odom(),
            max_dt: default_max_dt(),
            params: TrackerParams::default(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TrackerError::Config(format!("Failed to read config file: {}", e)))?;
        let config: TrackerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the startup-fatal invariants.
    pub fn validate(&self) -> Result<()> {
        if self.hz <= 0.0 {
            return Err(TrackerError::Config(format!(
                "hz must be positive, got {}",
                self.hz
            )));
        }
        if self.max_dt <= 0.0 {
            return Err(TrackerError::Config(format!(
                "max_dt must be positive, got {}",
                self.max_dt
            )));
        }
        Ok(())
    }
}
