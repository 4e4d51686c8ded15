//! 2D point type shared across the stack.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// World coordinates in meters.
///
/// Axis convention follows ROS REP-103: X forward, Y left, angles CCW
/// positive from +X.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPoint {
    /// X coordinate in meters
    pub x: f32,
    /// Y coordinate in meters
    pub y: f32,
}

impl WorldPoint {
    /// Origin point.
    pub const ZERO: WorldPoint = WorldPoint { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: WorldPoint) -> f32 {
        (*self - other).norm()
    }

    /// Vector magnitude.
    #[inline]
    pub fn norm(&self) -> f32 {
        self.squared_norm().sqrt()
    }

    /// Squared vector magnitude.
    #[inline]
    pub fn squared_norm(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Dot product.
    #[inline]
    pub fn dot(&self, other: WorldPoint) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    #[inline]
    pub fn cross(&self, other: WorldPoint) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Rotate around the origin by `angle` radians (CCW positive).
    #[inline]
    pub fn rotated(&self, angle: f32) -> WorldPoint {
        let (sin_a, cos_a) = angle.sin_cos();
        WorldPoint::new(
            self.x * cos_a - self.y * sin_a,
            self.x * sin_a + self.y * cos_a,
        )
    }

    /// Direction of this vector, CCW from +X.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }
}

impl Add for WorldPoint {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        WorldPoint::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for WorldPoint {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        WorldPoint::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for WorldPoint {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f32) -> Self {
        WorldPoint::new(self.x * scalar, self.y * scalar)
    }
}
