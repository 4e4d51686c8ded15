//! 3D configuration-space cost volume.

use serde::{Deserialize, Serialize};
use sutra_core::{Header, PointCloud, Pose2D, COST_LETHAL};

/// Cost volume indexed by (x, y, yaw bin).
///
/// `data` holds `angle * height * width` cost bytes with
/// `idx(gx, gy, a) = a * height * width + gy * width + gx`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CSpace3D {
    pub header: Header,
    /// Width in cells
    pub width: u32,
    /// Height in cells
    pub height: u32,
    /// Number of yaw bins
    pub angle: u32,
    /// Meters per cell
    pub linear_resolution: f32,
    /// Radians per yaw bin (2*pi / angle)
    pub angular_resolution: f32,
    /// Pose of the (0, 0) cell corner
    pub origin: Pose2D,
    pub data: Vec<i8>,
}

impl CSpace3D {
    /// All-free volume with the given geometry.
    pub fn new(header: Header, width: u32, height: u32, angle: u32, linear_resolution: f32, origin: Pose2D) -> Self {
        Self {
            header,
            width,
            height,
            angle,
            linear_resolution,
            angular_resolution: 2.0 * std::f32::consts::PI / angle as f32,
            origin,
            data: vec![0; (width * height * angle) as usize],
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32, a: u32) -> usize {
        ((a * self.height + y) * self.width + x) as usize
    }

    /// Cost at a cell, or `None` outside the volume.
    #[inline]
    pub fn get(&self, x: u32, y: u32, a: u32) -> Option<i8> {
        if x < self.width && y < self.height && a < self.angle {
            Some(self.data[self.index(x, y, a)])
        } else {
            None
        }
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, a: u32, cost: i8) {
        if x < self.width && y < self.height && a < self.angle {
            let i = self.index(x, y, a);
            self.data[i] = cost;
        }
    }

    /// Max-combine `cost` into a cell; out-of-range indices are ignored.
    #[inline]
    pub fn set_max(&mut self, x: u32, y: u32, a: u32, cost: i8) {
        if x < self.width && y < self.height && a < self.angle {
            let i = self.index(x, y, a);
            if self.data[i] < cost {
                self.data[i] = cost;
            }
        }
    }

    /// Geometry equality with another volume.
    pub fn same_geometry(&self, other: &CSpace3D) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.angle == other.angle
            && self.linear_resolution == other.linear_resolution
            && self.origin == other.origin
    }

    /// Extract the rectangular patch described by `region`.
    pub fn extract(&self, region: &Region, stamp: f64) -> CSpace3DUpdate {
        let mut update = CSpace3DUpdate {
            header: Header::new(stamp, self.header.frame_id.clone()),
            x: region.x,
            y: region.y,
            yaw: 0,
            width: region.width,
            height: region.height,
            angle: self.angle,
            data: Vec::with_capacity((region.width * region.height * self.angle) as usize),
        };
        for a in 0..self.angle {
            for y in region.y..region.y + region.height {
                for x in region.x..region.x + region.width {
                    update.data.push(self.data[self.index(x, y, a)]);
                }
            }
        }
        update
    }

    /// Project lethal cells to a diagnostic point cloud, lifting each yaw
    /// bin to `z = a * 0.1`.
    pub fn to_debug_cloud(&self, stamp: f64) -> PointCloud {
        let mut cloud = PointCloud {
            header: Header::new(stamp, self.header.frame_id.clone()),
            points: Vec::new(),
        };
        for a in 0..self.angle {
            for y in 0..self.height {
                for x in 0..self.width {
                    if self.data[self.index(x, y, a)] < COST_LETHAL {
                        continue;
                    }
                    cloud.points.push([
                        x as f32 * self.linear_resolution + self.origin.x,
                        y as f32 * self.linear_resolution + self.origin.y,
                        a as f32 * 0.1,
                    ]);
                }
            }
        }
        cloud
    }
}

/// Rectangular cell region within a volume (all yaw bins).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Whole-volume region.
    pub fn full(map: &CSpace3D) -> Self {
        Self {
            x: 0,
            y: 0,
            width: map.width,
            height: map.height,
        }
    }

    /// Build a region from signed corner coordinates, clipped to the
    /// `width x height` volume. Returns `None` when nothing remains.
    pub fn clipped(x0: i64, y0: i64, x1: i64, y1: i64, width: u32, height: u32) -> Option<Self> {
        let cx0 = x0.max(0);
        let cy0 = y0.max(0);
        let cx1 = x1.min(width as i64);
        let cy1 = y1.min(height as i64);
        if cx0 >= cx1 || cy0 >= cy1 {
            return None;
        }
        Some(Self {
            x: cx0 as u32,
            y: cy0 as u32,
            width: (cx1 - cx0) as u32,
            height: (cy1 - cy0) as u32,
        })
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Incremental update patch: the minimal bounding box that changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CSpace3DUpdate {
    pub header: Header,
    /// Patch corner, x cell
    pub x: u32,
    /// Patch corner, y cell
    pub y: u32,
    /// First yaw bin covered (always 0 here)
    pub yaw: u32,
    pub width: u32,
    pub height: u32,
    /// Number of yaw bins covered
    pub angle: u32,
    pub data: Vec<i8>,
}

impl CSpace3DUpdate {
    /// Cost at patch-local coordinates.
    #[inline]
    pub fn get(&self, x: u32, y: u32, a: u32) -> Option<i8> {
        if x < self.width && y < self.height && a < self.angle {
            Some(self.data[((a * self.height + y) * self.width + x) as usize])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume() -> CSpace3D {
        CSpace3D::new(Header::new(0.0, "map"), 8, 6, 4, 0.1, Pose2D::default())
    }

    #[test]
    fn test_index_layout() {
        let mut map = volume();
        map.set(7, 5, 3, 42);
        // idx = a*h*w + y*w + x
        assert_eq!(map.data[3 * 6 * 8 + 5 * 8 + 7], 42);
        assert_eq!(map.get(7, 5, 3), Some(42));
        assert_eq!(map.get(8, 0, 0), None);
    }

    #[test]
    fn test_set_max() {
        let mut map = volume();
        map.set(1, 1, 0, 50);
        map.set_max(1, 1, 0, 30);
        assert_eq!(map.get(1, 1, 0), Some(50));
        map.set_max(1, 1, 0, 90);
        assert_eq!(map.get(1, 1, 0), Some(90));
    }

    #[test]
    fn test_region_clipping() {
        let r = Region::clipped(-3, -3, 5, 4, 8, 6).unwrap();
        assert_eq!((r.x, r.y, r.width, r.height), (0, 0, 5, 4));
        assert!(Region::clipped(10, 0, 12, 3, 8, 6).is_none());
    }

    #[test]
    fn test_extract_roundtrip() {
        let mut map = volume();
        map.set(3, 2, 1, 77);
        let region = Region {
            x: 2,
            y: 1,
            width: 3,
            height: 3,
        };
        let update = map.extract(&region, 1.0);
        assert_eq!(update.get(1, 1, 1), Some(77));
        assert_eq!(update.get(0, 0, 0), Some(0));
        assert_eq!(
            update.data.len(),
            (region.width * region.height * map.angle) as usize
        );
    }

    #[test]
    fn test_debug_cloud_lift() {
        let mut map = volume();
        map.set(2, 3, 2, 100);
        map.set(1, 1, 0, 99);
        let cloud = map.to_debug_cloud(0.5);
        assert_eq!(cloud.points.len(), 1);
        let p = cloud.points[0];
        assert!((p[0] - 0.2).abs() < 1e-6);
        assert!((p[1] - 0.3).abs() < 1e-6);
        assert!((p[2] - 0.2).abs() < 1e-6);
    }
}
