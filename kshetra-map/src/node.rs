//! Costmap node: event loop tying the pipeline to the bus.

use crate::config::CostmapConfig;
use crate::cspace::{CSpace3D, CSpace3DUpdate};
use crate::error::Result;
use crate::pipeline::CostmapPipeline;
use crossbeam_channel::{select, tick, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use sutra_core::bus::Topic;
use sutra_core::{Clock, Header, OccupancyGrid2D, PointCloud, PolygonStamped};
use tracing::{error, info};

/// Frame the footprint polygon is expressed in.
const FRAME_ROBOT: &str = "base_link";

/// All bus endpoints of the costmap node.
#[derive(Clone)]
pub struct CostmapTopics {
    pub map: Topic<OccupancyGrid2D>,
    pub map_overlay: Topic<OccupancyGrid2D>,
    pub costmap: Topic<CSpace3D>,
    pub costmap_update: Topic<CSpace3DUpdate>,
    pub footprint: Topic<PolygonStamped>,
    pub debug: Topic<PointCloud>,
}

impl CostmapTopics {
    pub fn new() -> Self {
        Self {
            map: Topic::new("map"),
            map_overlay: Topic::new("map_overlay"),
            costmap: Topic::new("costmap"),
            costmap_update: Topic::new("costmap_update"),
            footprint: Topic::new("footprint"),
            debug: Topic::new("debug"),
        }
    }
}

impl Default for CostmapTopics {
    fn default() -> Self {
        Self::new()
    }
}

/// The costmap node: owns the pipeline, serializes all events on a single
/// loop.
pub struct CostmapNode {
    pipeline: CostmapPipeline,
    overlay_index: usize,
    sub_map: Receiver<OccupancyGrid2D>,
    sub_overlay: Receiver<OccupancyGrid2D>,
    topics: CostmapTopics,
    clock: Clock,
}

impl CostmapNode {
    /// Build the node from validated configuration.
    pub fn new(config: &CostmapConfig, topics: CostmapTopics) -> Result<Self> {
        config.validate()?;
        let mode = config.overlay_mode()?;
        let footprint = config.polygon()?;
        info!("costmap: {:?} overlay mode", mode);

        let mut pipeline = CostmapPipeline::new(
            config.ang_resolution as u32,
            config.linear_expand,
            config.linear_spread,
            footprint,
        );
        let overlay_index = pipeline.add_overlay_layer(mode);

        Ok(Self {
            pipeline,
            overlay_index,
            sub_map: topics.map.subscribe(),
            sub_overlay: topics.map_overlay.subscribe(),
            topics,
            clock: Clock::new(),
        })
    }

    /// Serialize events until `running` clears or all inputs disconnect.
    pub fn spin(&mut self, running: &AtomicBool) {
        let footprint_tick = tick(Duration::from_secs(1));
        while running.load(Ordering::Relaxed) {
            select! {
                recv(self.sub_map) -> msg => match msg {
                    Ok(occ) => self.handle_base_map(occ),
                    Err(_) => break,
                },
                recv(self.sub_overlay) -> msg => match msg {
                    Ok(occ) => self.handle_overlay(occ),
                    Err(_) => break,
                },
                recv(footprint_tick) -> _ => self.publish_footprint(),
                default(Duration::from_millis(50)) => {}
            }
        }
        info!("costmap node stopped");
    }

    /// Base-map event: rebuild the chain, publish snapshot + diagnostics.
    pub fn handle_base_map(&mut self, occ: OccupancyGrid2D) {
        info!("2D costmap received");
        match self.pipeline.set_base_map(occ) {
            Ok(map) => {
                let map = map.clone();
                let debug_cloud = map.to_debug_cloud(self.clock.now());
                self.topics.costmap.publish(map);
                self.topics.debug.publish(debug_cloud);
            }
            Err(e) => error!("Base map rejected: {}", e),
        }
    }

    /// Overlay event: stamp into the overlay layer, publish the patch.
    pub fn handle_overlay(&mut self, occ: OccupancyGrid2D) {
        match self.pipeline.process_overlay(self.overlay_index, occ) {
            Ok(update) => {
                let debug_cloud = self
                    .pipeline
                    .map()
                    .expect("overlay accepted implies a volume")
                    .to_debug_cloud(self.clock.now());
                self.topics.costmap_update.publish(update);
                self.topics.debug.publish(debug_cloud);
            }
            Err(e) => error!("Overlay rejected: {}", e),
        }
    }

    /// Republish the footprint with a fresh stamp.
    pub fn publish_footprint(&self) {
        self.topics.footprint.publish(PolygonStamped {
            header: Header::new(self.clock.now(), FRAME_ROBOT),
            points: self.pipeline.footprint().vertices().to_vec(),
        });
    }
}
