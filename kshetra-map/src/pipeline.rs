//! Layered costmap pipeline.
//!
//! Ordered chain `root -> overlay layers -> output`. The root layer turns
//! a base occupancy grid into the initial cost volume; each overlay layer
//! stamps its own grid on top; the terminal output is the last layer's
//! volume, from which full snapshots and bounding-box updates are taken.

use crate::cspace::{CSpace3D, CSpace3DUpdate, Region};
use crate::error::{MapError, Result};
use crate::footprint::Polygon;
use crate::layer::{CostmapLayer, OverlayMode};
use crate::template::CSpaceTemplate;
use sutra_core::{normalize_angle, OccupancyGrid2D};
use tracing::{debug, info};

/// Relative tolerance for matching grid resolutions.
const RESOLUTION_TOLERANCE: f32 = 1e-4;

/// Maximum origin-yaw misalignment for an overlay to be expressible in
/// base-map cells.
const YAW_TOLERANCE: f32 = 1e-3;

/// The full costmap pipeline.
pub struct CostmapPipeline {
    angle: u32,
    linear_expand: f32,
    linear_spread: f32,
    footprint: Polygon,
    template: Option<CSpaceTemplate>,
    root: CostmapLayer,
    overlays: Vec<CostmapLayer>,
    base: Option<OccupancyGrid2D>,
}

impl CostmapPipeline {
    pub fn new(angle: u32, linear_expand: f32, linear_spread: f32, footprint: Polygon) -> Self {
        Self {
            angle,
            linear_expand,
            linear_spread,
            footprint,
            template: None,
            root: CostmapLayer::new(OverlayMode::Max),
            overlays: Vec::new(),
            base: None,
        }
    }

    /// Append an overlay layer; returns its index for event routing.
    pub fn add_overlay_layer(&mut self, mode: OverlayMode) -> usize {
        self.overlays.push(CostmapLayer::new(mode));
        self.overlays.len() - 1
    }

    /// The robot footprint this pipeline dilates with.
    pub fn footprint(&self) -> &Polygon {
        &self.footprint
    }

    /// Terminal output: the last layer's volume.
    pub fn map(&self) -> Option<&CSpace3D> {
        let last = self.overlays.last().unwrap_or(&self.root);
        last.map()
    }

    /// Route a base map to the root layer and rebuild the whole chain.
    ///
    /// Returns the resulting full snapshot.
    pub fn set_base_map(&mut self, occ: OccupancyGrid2D) -> Result<&CSpace3D> {
        if occ.is_degenerate() {
            return Err(MapError::DegenerateMap {
                width: occ.width,
                height: occ.height,
            });
        }

        let rebuild_template = match &self.template {
            Some(_) => self
                .base
                .as_ref()
                .map(|b| (b.resolution - occ.resolution).abs() > RESOLUTION_TOLERANCE)
                .unwrap_or(true),
            None => true,
        };
        if rebuild_template {
            info!(
                "Generating footprint template: {} yaw bins at {} m/cell",
                self.angle, occ.resolution
            );
            self.template = Some(CSpaceTemplate::generate(
                &self.footprint,
                self.angle,
                self.linear_expand,
                self.linear_spread,
                occ.resolution,
            ));
        }
        let template = self.template.as_ref().expect("template generated above");

        self.root.set_base(template, &occ);
        for i in 0..self.overlays.len() {
            let (before, rest) = self.overlays.split_at_mut(i);
            let upstream = if i == 0 {
                self.root.map()
            } else {
                before[i - 1].map()
            }
            .expect("upstream volume set");
            rest[0].clear_overlay();
            rest[0].rebuild(template, upstream, None);
        }
        self.base = Some(occ);

        debug!("C-space costmap generated");
        Ok(self.map().expect("pipeline holds a volume"))
    }

    /// Route an overlay grid to the layer at `index` and rebuild the
    /// affected region downstream.
    ///
    /// Returns the bounding-box update covering every cell that may have
    /// changed.
    pub fn process_overlay(&mut self, index: usize, occ: OccupancyGrid2D) -> Result<CSpace3DUpdate> {
        let base = self.base.as_ref().ok_or(MapError::NoBaseMap)?;
        if index >= self.overlays.len() {
            return Err(MapError::UnknownLayer(index));
        }
        if occ.is_degenerate() {
            return Err(MapError::DegenerateMap {
                width: occ.width,
                height: occ.height,
            });
        }
        if occ.header.frame_id != base.header.frame_id {
            return Err(MapError::FrameMismatch {
                base: base.header.frame_id.clone(),
                overlay: occ.header.frame_id.clone(),
            });
        }
        if (occ.resolution - base.resolution).abs() > RESOLUTION_TOLERANCE
            || normalize_angle(occ.origin.yaw - base.origin.yaw).abs() > YAW_TOLERANCE
        {
            return Err(MapError::ResolutionMismatch {
                base: base.resolution,
                overlay: occ.resolution,
            });
        }

        let ox = ((occ.origin.x - base.origin.x) / base.resolution).round() as i64;
        let oy = ((occ.origin.y - base.origin.y) / base.resolution).round() as i64;
        let template = self.template.as_ref().expect("base map implies template");
        let range = template.range() as i64;
        let stamp = occ.header.stamp;

        let region = Region::clipped(
            ox - range,
            oy - range,
            ox + occ.width as i64 + range,
            oy + occ.height as i64 + range,
            base.width,
            base.height,
        );

        self.overlays[index].set_overlay(occ, (ox, oy));

        if let Some(region) = region {
            for i in index..self.overlays.len() {
                let (before, rest) = self.overlays.split_at_mut(i);
                let upstream = if i == 0 {
                    self.root.map()
                } else {
                    before[i - 1].map()
                }
                .expect("base map implies upstream volume");
                rest[0].rebuild(template, upstream, Some(region));
            }
            debug!(
                "C-space costmap updated: region {}x{} at ({}, {})",
                region.width, region.height, region.x, region.y
            );
            Ok(self
                .map()
                .expect("pipeline holds a volume")
                .extract(&region, stamp))
        } else {
            // Overlay entirely outside the base map: nothing changed.
            debug!("Overlay outside the base map, empty update");
            let map = self.map().expect("pipeline holds a volume");
            Ok(CSpace3DUpdate {
                header: sutra_core::Header::new(stamp, map.header.frame_id.clone()),
                x: 0,
                y: 0,
                yaw: 0,
                width: 0,
                height: 0,
                angle: map.angle,
                data: Vec::new(),
            })
        }
    }
}
