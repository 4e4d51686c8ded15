//! Message types exchanged between nodes.
//!
//! These are plain structs passed over the in-process bus; serialization
//! of a middleware wire format is out of scope.

use crate::point::WorldPoint;
use crate::pose::Pose2D;
use serde::{Deserialize, Serialize};

/// Stamp plus originating frame, carried by every published message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Monotonic time in seconds
    pub stamp: f64,
    /// Coordinate frame the message is expressed in
    pub frame_id: String,
}

impl Header {
    pub fn new(stamp: f64, frame_id: impl Into<String>) -> Self {
        Self {
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

/// 2D occupancy grid with signed-byte costs.
///
/// Costs are in [-1, 100]: -1 unknown, 0 free, 100 lethal.
/// `data` is row-major, `data.len() == width * height`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OccupancyGrid2D {
    pub header: Header,
    /// Width in cells
    pub width: u32,
    /// Height in cells
    pub height: u32,
    /// Meters per cell
    pub resolution: f32,
    /// Pose of the (0, 0) cell corner
    pub origin: Pose2D,
    pub data: Vec<i8>,
}

impl OccupancyGrid2D {
    /// All-free grid with the given geometry.
    pub fn new(header: Header, width: u32, height: u32, resolution: f32, origin: Pose2D) -> Self {
        Self {
            header,
            width,
            height,
            resolution,
            origin,
            data: vec![0; (width * height) as usize],
        }
    }

    /// Cost at a cell, or `None` outside the grid.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<i8> {
        if x < self.width && y < self.height {
            Some(self.data[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Set the cost at a cell; out-of-range indices are ignored.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, cost: i8) {
        if x < self.width && y < self.height {
            self.data[(y * self.width + x) as usize] = cost;
        }
    }

    /// A grid is degenerate when either dimension is zero.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One waypoint of a reference path.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub pose: Pose2D,
    /// Target linear speed through this waypoint; `None` means
    /// "use the configured maximum".
    pub velocity: Option<f32>,
}

impl PathPoint {
    pub fn new(pose: Pose2D) -> Self {
        Self {
            pose,
            velocity: None,
        }
    }

    pub fn with_velocity(pose: Pose2D, velocity: f32) -> Self {
        Self {
            pose,
            velocity: Some(velocity),
        }
    }
}

/// Reference path published by a planner.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathMessage {
    pub header: Header,
    pub poses: Vec<PathPoint>,
}

/// Differential-drive velocity command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityCommand {
    /// Linear velocity in m/s (positive forward)
    pub linear: f32,
    /// Angular velocity in rad/s (positive CCW)
    pub angular: f32,
}

impl VelocityCommand {
    pub fn new(linear: f32, angular: f32) -> Self {
        Self { linear, angular }
    }

    /// Zero command.
    pub fn stop() -> Self {
        Self::default()
    }
}

/// Odometry report: pose of the robot in the odometry frame plus the
/// measured body twist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Odometry {
    /// Frame of `pose` (the odometry frame)
    pub header: Header,
    /// The robot body frame
    pub child_frame_id: String,
    pub pose: Pose2D,
    pub twist: VelocityCommand,
}

/// Point cloud used for costmap diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub header: Header,
    pub points: Vec<[f32; 3]>,
}

/// Stamped footprint polygon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolygonStamped {
    pub header: Header,
    pub points: Vec<WorldPoint>,
}

/// Stamped pose.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub header: Header,
    pub pose: Pose2D,
}
