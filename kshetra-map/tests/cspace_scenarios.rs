//! End-to-end costmap scenarios through the public pipeline API.

use kshetra_map::{CostmapPipeline, OverlayMode, Polygon};
use sutra_core::{Header, OccupancyGrid2D, Pose2D, WorldPoint, COST_LETHAL};

fn square_footprint(half: f32) -> Polygon {
    Polygon::new(vec![
        WorldPoint::new(half, half),
        WorldPoint::new(-half, half),
        WorldPoint::new(-half, -half),
        WorldPoint::new(half, -half),
    ])
}

fn free_grid(size: u32) -> OccupancyGrid2D {
    OccupancyGrid2D::new(Header::new(0.0, "map"), size, size, 0.1, Pose2D::default())
}

/// Single lethal cell in an open map: each yaw bin carries the
/// footprint-swept lethal region around it.
#[test]
fn single_obstacle_sweeps_footprint_per_yaw() {
    let mut pipeline = CostmapPipeline::new(4, 0.2, 0.0, square_footprint(0.2));
    pipeline.add_overlay_layer(OverlayMode::Max);

    let mut occ = free_grid(100);
    occ.set(50, 50, 100);
    let map = pipeline.set_base_map(occ).unwrap();

    for a in 0..4 {
        // The obstacle cell and its immediate surroundings are lethal.
        assert_eq!(map.get(50, 50, a), Some(COST_LETHAL));
        assert_eq!(map.get(52, 50, a), Some(COST_LETHAL));
        assert_eq!(map.get(50, 48, a), Some(COST_LETHAL));
        // Beyond half-width + expand (0.4 m = 4 cells) nothing is marked.
        assert_eq!(map.get(55, 50, a), Some(0));
        assert_eq!(map.get(50, 56, a), Some(0));
    }

    // With no spread, every nonzero cell is exactly lethal.
    for &c in &map.data {
        assert!(c == 0 || c == COST_LETHAL);
    }

    // The swept region is symmetric for a square footprint (staying off
    // the inflation boundary itself).
    for a in 0..4 {
        for d in 1..4u32 {
            assert_eq!(map.get(50 + d, 50, a), map.get(50 - d, 50, a));
            assert_eq!(map.get(50, 50 + d, a), map.get(50, 50 - d, a));
        }
    }
}

/// Overlay obstacle: the update's bounding box encloses the obstacle plus
/// the footprint reach, and cells outside it are untouched.
#[test]
fn overlay_update_bbox_encloses_dilated_obstacle() {
    let mut pipeline = CostmapPipeline::new(4, 0.2, 0.0, square_footprint(0.2));
    let idx = pipeline.add_overlay_layer(OverlayMode::Max);

    let mut occ = free_grid(100);
    occ.set(50, 50, 100);
    pipeline.set_base_map(occ).unwrap();
    let before = pipeline.map().unwrap().clone();

    let mut overlay = free_grid(100);
    overlay.set(10, 10, 100);
    let update = pipeline.process_overlay(idx, overlay).unwrap();
    let after = pipeline.map().unwrap().clone();

    // Bbox encloses (10, 10) +- the footprint reach (4 cells).
    assert!(update.x <= 6 && update.y <= 6);
    assert!(update.x + update.width >= 15);
    assert!(update.y + update.height >= 15);
    assert_eq!(update.angle, 4);

    // Inside: the new obstacle is dilated.
    for a in 0..4 {
        assert_eq!(after.get(10, 10, a), Some(COST_LETHAL));
        assert_eq!(after.get(12, 10, a), Some(COST_LETHAL));
    }

    // Outside the bbox nothing moved, including the base obstacle.
    for a in 0..after.angle {
        for y in 0..after.height {
            for x in 0..after.width {
                let inside = x >= update.x
                    && x < update.x + update.width
                    && y >= update.y
                    && y < update.y + update.height;
                if !inside {
                    assert_eq!(before.get(x, y, a), after.get(x, y, a));
                }
            }
        }
    }
    assert_eq!(after.get(50, 50, 0), Some(COST_LETHAL));
}

/// Spread produces a linear halo that never exceeds the lethal cost.
#[test]
fn spread_halo_is_monotone() {
    let mut pipeline = CostmapPipeline::new(8, 0.1, 0.3, square_footprint(0.15));
    pipeline.add_overlay_layer(OverlayMode::Max);

    let mut occ = free_grid(60);
    occ.set(30, 30, 100);
    let map = pipeline.set_base_map(occ).unwrap();

    for a in 0..8 {
        let mut prev = map.get(30, 30, a).unwrap();
        for d in 1..10u32 {
            let c = map.get(30 + d, 30, a).unwrap();
            assert!(c <= prev, "cost must not grow with distance");
            assert!((0..=100).contains(&c));
            prev = c;
        }
    }
}
