//! Configuration loading for the costmap builder.

use crate::error::{MapError, Result};
use crate::footprint::Polygon;
use crate::layer::OverlayMode;
use serde::Deserialize;
use std::path::Path;
use sutra_core::WorldPoint;

/// Costmap configuration, loaded from TOML at startup.
#[derive(Clone, Debug, Deserialize)]
pub struct CostmapConfig {
    /// Number of yaw bins in the cost volume (default: 16)
    #[serde(default = "default_ang_resolution")]
    pub ang_resolution: i32,

    /// Hard inflation radius in meters (default: 0.2)
    #[serde(default = "default_linear_expand")]
    pub linear_expand: f32,

    /// Cost falloff radius beyond the hard radius in meters (default: 0.5)
    #[serde(default = "default_linear_spread")]
    pub linear_spread: f32,

    /// Overlay combining mode: "overwrite" or "max" (default: "max")
    #[serde(default = "default_overlay_mode")]
    pub overlay_mode: String,

    /// Robot footprint vertices in the body frame, `[x, y]` per vertex.
    /// A trailing per-vertex speed value is accepted and ignored.
    pub footprint: Vec<Vec<f32>>,
}

fn default_ang_resolution() -> i32 {
    16
}
fn default_linear_expand() -> f32 {
    0.2
}
fn default_linear_spread() -> f32 {
    0.5
}
fn default_overlay_mode() -> String {
    "max".to_string()
}

impl CostmapConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MapError::Config(format!("Failed to read config file: {}", e)))?;
        let config: CostmapConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the startup-fatal invariants.
    pub fn validate(&self) -> Result<()> {
        if self.ang_resolution <= 0 {
            return Err(MapError::Config(format!(
                "ang_resolution must be positive, got {}",
                self.ang_resolution
            )));
        }
        if self.linear_expand < 0.0 || self.linear_spread < 0.0 {
            return Err(MapError::Config(
                "linear_expand and linear_spread must be non-negative".to_string(),
            ));
        }
        self.overlay_mode()?;
        self.polygon()?;
        Ok(())
    }

    /// Parse the overlay mode string.
    pub fn overlay_mode(&self) -> Result<OverlayMode> {
        match self.overlay_mode.as_str() {
            "overwrite" => Ok(OverlayMode::Overwrite),
            "max" => Ok(OverlayMode::Max),
            other => Err(MapError::Config(format!(
                "Unknown overlay_mode \"{}\"",
                other
            ))),
        }
    }

    /// Build the footprint polygon from the vertex list.
    pub fn polygon(&self) -> Result<Polygon> {
        if self.footprint.len() < 3 {
            return Err(MapError::Config(format!(
                "footprint needs at least 3 vertices, got {}",
                self.footprint.len()
            )));
        }
        let mut vertices = Vec::with_capacity(self.footprint.len());
        for (i, v) in self.footprint.iter().enumerate() {
            match v.len() {
                2 | 3 => vertices.push(WorldPoint::new(v[0], v[1])),
                n => {
                    return Err(MapError::Config(format!(
                        "footprint vertex {} has {} components, expected [x, y]",
                        i, n
                    )))
                }
            }
        }
        Ok(Polygon::new(vertices))
    }
}
