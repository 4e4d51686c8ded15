//! Configuration-space costmap builder.
//!
//! Turns 2D occupancy grids into a 3D cost volume indexed by
//! `(x, y, yaw)`: each cell states the cost of placing the robot's
//! footprint at that pose. Obstacles are dilated per yaw bin by
//! precomputed footprint kernels; dynamic obstacle grids are composed on
//! top of the base map through a layered pipeline that emits full
//! snapshots and minimal bounding-box updates.

pub mod config;
pub mod cspace;
pub mod error;
pub mod footprint;
pub mod layer;
pub mod node;
pub mod pipeline;
pub mod template;

pub use config::CostmapConfig;
pub use cspace::{CSpace3D, CSpace3DUpdate, Region};
pub use error::{MapError, Result};
pub use footprint::Polygon;
pub use layer::{CostmapLayer, OverlayMode};
pub use node::{CostmapNode, CostmapTopics};
pub use pipeline::CostmapPipeline;
pub use template::CSpaceTemplate;
