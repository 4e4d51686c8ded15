//! Per-yaw footprint dilation kernels.
//!
//! For each yaw bin the rotated footprint is rasterized once into a sparse
//! list of `(dx, dy, cost)` offsets. Stamping a lethal occupancy cell then
//! reduces to max-combining the kernel at that cell, which keeps the
//! per-update cost proportional to the number of lethal cells.

use crate::footprint::Polygon;
use sutra_core::{WorldPoint, COST_LETHAL};

/// One kernel entry: cell offset from the obstacle plus the cost of
/// placing the footprint origin there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelCell {
    pub dx: i32,
    pub dy: i32,
    pub cost: i8,
}

/// Precomputed footprint kernels for every yaw bin.
#[derive(Clone, Debug)]
pub struct CSpaceTemplate {
    /// Number of yaw bins
    angle: u32,
    /// Kernel half-width in cells; offsets fit in [-range, range]
    range: i32,
    /// Sparse nonzero cells per yaw bin
    kernels: Vec<Vec<KernelCell>>,
}

impl CSpaceTemplate {
    /// Rasterize `footprint` for `angle` yaw bins on a grid of
    /// `resolution` meters per cell.
    ///
    /// Cost model: inside the footprint or within `linear_expand` of its
    /// perimeter scores 100; between `linear_expand` and
    /// `linear_expand + linear_spread` the cost ramps linearly down to 0;
    /// zero-cost cells are not stored.
    pub fn generate(
        footprint: &Polygon,
        angle: u32,
        linear_expand: f32,
        linear_spread: f32,
        resolution: f32,
    ) -> Self {
        let reach = footprint.circumradius() + linear_expand + linear_spread;
        let range = (reach / resolution).ceil() as i32;
        let angular_resolution = 2.0 * std::f32::consts::PI / angle as f32;

        let mut kernels = Vec::with_capacity(angle as usize);
        for a in 0..angle {
            let rotated = footprint.rotated(a as f32 * angular_resolution);
            let mut kernel = Vec::new();
            for dy in -range..=range {
                for dx in -range..=range {
                    // The obstacle sits at the negated offset relative to
                    // the footprint origin placed at (dx, dy).
                    let obstacle =
                        WorldPoint::new(-(dx as f32) * resolution, -(dy as f32) * resolution);
                    let cost = if rotated.contains(obstacle) {
                        COST_LETHAL
                    } else {
                        let d = rotated.distance(obstacle);
                        if d < linear_expand {
                            COST_LETHAL
                        } else if linear_spread > 0.0 && d < linear_expand + linear_spread {
                            (100.0 * (1.0 - (d - linear_expand) / linear_spread)).round() as i8
                        } else {
                            0
                        }
                    };
                    if cost > 0 {
                        kernel.push(KernelCell { dx, dy, cost });
                    }
                }
            }
            kernels.push(kernel);
        }

        Self {
            angle,
            range,
            kernels,
        }
    }

    /// Number of yaw bins.
    pub fn angle(&self) -> u32 {
        self.angle
    }

    /// Kernel half-width in cells.
    pub fn range(&self) -> i32 {
        self.range
    }

    /// Sparse kernel for one yaw bin.
    pub fn kernel(&self, a: u32) -> &[KernelCell] {
        &self.kernels[a as usize]
    }
}
