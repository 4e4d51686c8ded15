//! 2D pose representation and angle arithmetic.

use crate::point::WorldPoint;
use serde::{Deserialize, Serialize};

/// Pose in the plane: position plus heading.
///
/// X forward, Y left, `yaw` CCW positive from +X (ROS REP-103).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in meters
    pub x: f32,
    /// Y position in meters
    pub y: f32,
    /// Heading in radians
    pub yaw: f32,
}

impl Pose2D {
    #[inline]
    pub fn new(x: f32, y: f32, yaw: f32) -> Self {
        Self { x, y, yaw }
    }

    /// Position component.
    #[inline]
    pub fn position(&self) -> WorldPoint {
        WorldPoint::new(self.x, self.y)
    }

    /// Transform a point from this pose's frame into the parent frame.
    #[inline]
    pub fn transform_point(&self, p: WorldPoint) -> WorldPoint {
        let (sin_t, cos_t) = self.yaw.sin_cos();
        WorldPoint::new(
            self.x + p.x * cos_t - p.y * sin_t,
            self.y + p.x * sin_t + p.y * cos_t,
        )
    }

    /// Transform a point from the parent frame into this pose's frame.
    #[inline]
    pub fn inverse_transform_point(&self, p: WorldPoint) -> WorldPoint {
        let (sin_t, cos_t) = self.yaw.sin_cos();
        let dx = p.x - self.x;
        let dy = p.y - self.y;
        WorldPoint::new(dx * cos_t + dy * sin_t, -dx * sin_t + dy * cos_t)
    }

    /// Compose two transforms: applies `other` in this pose's frame.
    #[inline]
    pub fn compose(&self, other: &Pose2D) -> Pose2D {
        let p = self.transform_point(other.position());
        Pose2D::new(p.x, p.y, normalize_angle(self.yaw + other.yaw))
    }

    /// Inverse transform.
    #[inline]
    pub fn inverse(&self) -> Pose2D {
        let (sin_t, cos_t) = self.yaw.sin_cos();
        Pose2D::new(
            -self.x * cos_t - self.y * sin_t,
            self.x * sin_t - self.y * cos_t,
            -self.yaw,
        )
    }
}

/// Normalize an angle to [-pi, pi].
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle;
    while a > std::f32::consts::PI {
        a -= 2.0 * std::f32::consts::PI;
    }
    while a < -std::f32::consts::PI {
        a += 2.0 * std::f32::consts::PI;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_transform_roundtrip() {
        let pose = Pose2D::new(1.0, 2.0, FRAC_PI_2);
        let p = WorldPoint::new(0.5, -0.3);
        let q = pose.inverse_transform_point(pose.transform_point(p));
        assert!((p.x - q.x).abs() < 1e-5);
        assert!((p.y - q.y).abs() < 1e-5);
    }

    #[test]
    fn test_inverse_compose_identity() {
        let pose = Pose2D::new(-2.0, 0.7, 1.1);
        let ident = pose.compose(&pose.inverse());
        assert!(ident.x.abs() < 1e-5);
        assert!(ident.y.abs() < 1e-5);
        assert!(ident.yaw.abs() < 1e-5);
    }

    #[test]
    fn test_normalize_angle() {
        assert!(normalize_angle(0.0).abs() < 1e-6);
        assert!(normalize_angle(2.0 * PI).abs() < 1e-6);
        assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-5);
        assert!((normalize_angle(-3.0 * PI) + PI).abs() < 1e-5);
    }
}
