//! Shared world model for the motion-control stack.
//!
//! `sutra-core` holds everything the costmap builder and the trajectory
//! tracker have in common: 2D geometry on the ROS REP-103 axis convention,
//! the message types exchanged between nodes, an in-process pub/sub bus,
//! and a minimal stamped-transform buffer. Nothing here knows about
//! costmaps or control; it is the connective tissue only.

pub mod bus;
pub mod msg;
pub mod point;
pub mod pose;
pub mod tf;
pub mod time;

pub use msg::{
    Header, OccupancyGrid2D, Odometry, PathMessage, PathPoint, PointCloud, PolygonStamped,
    PoseStamped, VelocityCommand,
};
pub use point::WorldPoint;
pub use pose::{normalize_angle, Pose2D};
pub use tf::{StampedTransform2D, TfBuffer, TfError};
pub use time::Clock;

/// Cost of a lethal obstacle cell.
pub const COST_LETHAL: i8 = 100;

/// Cost marker for unknown cells.
pub const COST_UNKNOWN: i8 = -1;
