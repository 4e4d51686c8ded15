//! Closed-loop trajectory tracker.
//!
//! Consumes a reference path and the robot pose, emits linear/angular
//! velocity commands. The control law combines a pure-pursuit-style
//! lookahead with time-optimal deceleration toward the goal, slew-limited
//! velocities, and explicit handling of in-place rotations, reverse
//! motion and path-recovery termination.

pub mod config;
pub mod control;
pub mod error;
pub mod geometry;
pub mod node;
pub mod path;
pub mod tracker;

pub use config::TrackerConfig;
pub use control::{time_optimal_control, VelAccLimiter};
pub use error::{Result, TrackerError};
pub use node::{TrackerNode, TrackerTopics};
pub use path::{Path2D, PathPose};
pub use tracker::{Tracker, TrackerOutput, TrackerParams, TrackerStatus, TrackingStatus};
