//! Error types for the costmap builder.

use thiserror::Error;

/// Costmap error type.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Overlay received before any base map")]
    NoBaseMap,

    #[error("Overlay frame \"{overlay}\" does not match base map frame \"{base}\"")]
    FrameMismatch { base: String, overlay: String },

    #[error("Overlay resolution {overlay} does not match base map resolution {base}")]
    ResolutionMismatch { base: f32, overlay: f32 },

    #[error("Degenerate occupancy grid ({width}x{height})")]
    DegenerateMap { width: u32, height: u32 },

    #[error("No overlay layer with index {0}")]
    UnknownLayer(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for MapError {
    fn from(e: toml::de::Error) -> Self {
        MapError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MapError>;
