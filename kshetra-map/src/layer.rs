//! One link of the costmap chain.
//!
//! A layer owns its slice of the 3D cost volume plus the most recent
//! overlay grid routed to it. Rebuilding a region pulls the upstream
//! volume in (reset for OVERWRITE, max-combine for MAX) and then stamps
//! the stored overlay back on top.

use crate::cspace::{CSpace3D, Region};
use crate::template::CSpaceTemplate;
use serde::Deserialize;
use sutra_core::{OccupancyGrid2D, COST_LETHAL};

/// How an overlay combines with what is already in the layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum OverlayMode {
    /// The affected region is reset from upstream before stamping, so a
    /// moved obstacle leaves no trail.
    Overwrite,
    /// Stamps accumulate over the layer's own values.
    Max,
}

/// One costmap layer: own volume plus the last overlay stamped into it.
///
/// The overlay is stored together with the cell offset of its (0, 0)
/// corner in volume coordinates, so downstream rebuilds re-stamp it in
/// place.
#[derive(Clone, Debug)]
pub struct CostmapLayer {
    mode: OverlayMode,
    map: Option<CSpace3D>,
    overlay: Option<(OccupancyGrid2D, (i64, i64))>,
}

impl CostmapLayer {
    pub fn new(mode: OverlayMode) -> Self {
        Self {
            mode,
            map: None,
            overlay: None,
        }
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    /// The layer's current volume, if a base map has been seen.
    pub fn map(&self) -> Option<&CSpace3D> {
        self.map.as_ref()
    }

    /// Replace the stored overlay grid and its offset in volume cells.
    pub fn set_overlay(&mut self, occ: OccupancyGrid2D, offset: (i64, i64)) {
        self.overlay = Some((occ, offset));
    }

    /// Drop the stored overlay (base-map arrival clears downstream caches).
    pub fn clear_overlay(&mut self) {
        self.overlay = None;
    }

    /// Root-layer entry: allocate the volume on the base map's geometry
    /// and stamp every cell of it.
    pub fn set_base(&mut self, template: &CSpaceTemplate, occ: &OccupancyGrid2D) {
        let mut map = CSpace3D::new(
            occ.header.clone(),
            occ.width,
            occ.height,
            template.angle(),
            occ.resolution,
            occ.origin,
        );
        stamp_grid(&mut map, template, occ, 0, 0);
        self.map = Some(map);
        self.overlay = None;
    }

    /// Rebuild this layer from `upstream`.
    ///
    /// With `region == None` the whole volume is rebuilt (base-map path);
    /// otherwise only the given region is pulled in before the stored
    /// overlay is stamped back.
    pub fn rebuild(&mut self, template: &CSpaceTemplate, upstream: &CSpace3D, region: Option<Region>) {
        match (&mut self.map, region) {
            (Some(map), Some(region)) if map.same_geometry(upstream) => {
                for a in 0..map.angle {
                    for y in region.y..region.y + region.height {
                        for x in region.x..region.x + region.width {
                            let up = upstream.get(x, y, a).unwrap_or(0);
                            match self.mode {
                                OverlayMode::Overwrite => map.set(x, y, a, up),
                                OverlayMode::Max => map.set_max(x, y, a, up),
                            }
                        }
                    }
                }
            }
            _ => {
                // Full rebuild: both modes restart from the upstream copy.
                self.map = Some(upstream.clone());
            }
        }

        if let Some((occ, (ox, oy))) = self.overlay.clone() {
            let map = self.map.as_mut().expect("layer volume allocated above");
            stamp_grid(map, template, &occ, ox, oy);
        }
    }
}

/// Stamp an occupancy grid into a volume.
///
/// Finite non-lethal costs are max-combined into every yaw slice; lethal
/// cells are dilated by the footprint kernel; unknown (-1) cells leave the
/// volume untouched. `(ox, oy)` locates the grid's (0, 0) cell in volume
/// coordinates.
fn stamp_grid(map: &mut CSpace3D, template: &CSpaceTemplate, occ: &OccupancyGrid2D, ox: i64, oy: i64) {
    for y in 0..occ.height {
        for x in 0..occ.width {
            let val = occ.data[(y * occ.width + x) as usize];
            if val < 0 {
                continue;
            }
            let gx = ox + x as i64;
            let gy = oy + y as i64;
            if val > 0 {
                max_at(map, gx, gy, val);
            }
            if val >= COST_LETHAL {
                for a in 0..map.angle {
                    for cell in template.kernel(a) {
                        max_cell(map, gx + cell.dx as i64, gy + cell.dy as i64, a, cell.cost);
                    }
                }
            }
        }
    }
}

#[inline]
fn max_at(map: &mut CSpace3D, gx: i64, gy: i64, cost: i8) {
    if gx < 0 || gy < 0 || gx >= map.width as i64 || gy >= map.height as i64 {
        return;
    }
    for a in 0..map.angle {
        map.set_max(gx as u32, gy as u32, a, cost);
    }
}

#[inline]
fn max_cell(map: &mut CSpace3D, gx: i64, gy: i64, a: u32, cost: i8) {
    if gx < 0 || gy < 0 || gx >= map.width as i64 || gy >= map.height as i64 {
        return;
    }
    map.set_max(gx as u32, gy as u32, a, cost);
}
