//! Reference-path container and search primitives.

use crate::error::{Result, TrackerError};
use crate::geometry::{curvature_3p, line_strip_distance};
use sutra_core::{PathPoint, Pose2D, WorldPoint};

/// One stored waypoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathPose {
    pub pos: WorldPoint,
    pub yaw: f32,
    /// Explicit target speed, if the planner provided one.
    pub velocity: Option<f32>,
}

impl PathPose {
    pub fn new(pos: WorldPoint, yaw: f32, velocity: Option<f32>) -> Self {
        Self { pos, yaw, velocity }
    }
}

/// Ordered waypoint sequence with polyline queries.
///
/// Two consecutive input poses closer than `epsilon` collapse into a
/// single in-place-turn marker: a zero-length segment carrying the
/// position of the run's first pose and the yaw of its latest. The
/// control law detects these markers as rotate-in-place legs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path2D {
    poses: Vec<PathPose>,
}

impl Path2D {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a planner path, collapsing near-duplicates.
    ///
    /// A waypoint with a negative explicit velocity rejects the whole
    /// path. An empty input is accepted and means "no goal".
    pub fn from_points(points: &[PathPoint], epsilon: f32) -> Result<Self> {
        for p in points {
            if let Some(v) = p.velocity {
                if v < 0.0 {
                    return Err(TrackerError::NegativeVelocity(v));
                }
            }
        }

        let mut poses: Vec<PathPose> = Vec::with_capacity(points.len());
        let mut turn_end: Option<PathPose> = None;
        for p in points {
            let next = PathPose::new(p.pose.position(), p.pose.yaw, p.velocity);
            match poses.last() {
                None => poses.push(next),
                Some(last) => {
                    if (last.pos - next.pos).squared_norm() >= epsilon * epsilon {
                        if let Some(marker) = turn_end.take() {
                            poses.push(marker);
                        }
                        poses.push(next);
                    } else {
                        turn_end = Some(PathPose::new(
                            poses.last().expect("non-empty").pos,
                            next.yaw,
                            next.velocity,
                        ));
                    }
                }
            }
        }
        if let Some(marker) = turn_end {
            poses.push(marker);
        }
        Ok(Self { poses })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> &PathPose {
        &self.poses[i]
    }

    /// Total arc length.
    pub fn length(&self) -> f32 {
        self.poses
            .windows(2)
            .map(|w| (w[1].pos - w[0].pos).norm())
            .sum()
    }

    /// Express the path in another frame, keeping every `step`-th pose.
    pub fn transformed(&self, trans: &Pose2D, step: usize) -> Path2D {
        let step = step.max(1);
        Path2D {
            poses: self
                .poses
                .iter()
                .step_by(step)
                .map(|p| {
                    PathPose::new(trans.transform_point(p.pos), trans.yaw + p.yaw, p.velocity)
                })
                .collect(),
        }
    }

    /// Index one past the end of the current motion leg.
    ///
    /// Scans forward from `begin` until the travel direction reverses or
    /// an in-place-turn marker ends the leg; returns `len()` when neither
    /// occurs. The pose before the returned index carries the leg's
    /// target yaw.
    pub fn find_local_goal(&self, begin: usize, allow_backward: bool) -> usize {
        let end = self.poses.len();
        let mut sign_vel_prev = 0.0f32;
        for i in (begin + 1)..end {
            let inc = self.poses[i].pos - self.poses[i - 1].pos;
            if inc.x == 0.0 && inc.y == 0.0 {
                // Zero-length marker: the leg ends at this pose.
                return i + 1;
            }
            let sign_vel = if allow_backward {
                let dir = inc.angle();
                let yaw = self.poses[i].yaw;
                if dir.cos() * yaw.cos() + dir.sin() * yaw.sin() < 0.0 {
                    -1.0
                } else {
                    1.0
                }
            } else {
                1.0
            };
            if sign_vel_prev * sign_vel < 0.0 {
                return i;
            }
            sign_vel_prev = sign_vel;
        }
        end
    }

    /// Nearest polyline vertex index for `target`, searching forward from
    /// `begin` over `[begin, end)`.
    ///
    /// The scan starts with a degenerate segment at `begin`, so a
    /// single-pose window resolves to that pose. A positive
    /// `max_search_range` bounds the scanned arc length; `epsilon` lets a
    /// later segment win ties so tracking keeps moving forward.
    pub fn find_nearest(
        &self,
        begin: usize,
        end: usize,
        target: WorldPoint,
        max_search_range: f32,
        epsilon: f32,
    ) -> Option<usize> {
        let mut nearest = None;
        let mut min_dist = f32::MAX;
        let mut searched = 0.0f32;
        let mut prev = begin;
        for i in begin..end.min(self.poses.len()) {
            let a = self.poses[prev].pos;
            let b = self.poses[i].pos;
            searched += (b - a).norm();
            if max_search_range > 0.0 && searched > max_search_range {
                break;
            }
            let d = line_strip_distance(a, b, target).abs();
            if d <= min_dist + epsilon {
                min_dist = min_dist.min(d);
                nearest = Some(i);
            }
            prev = i;
        }
        nearest
    }

    /// Arc length from the projected point to the end of `[.., end)`.
    ///
    /// When the projection lies past the final pose of the window the
    /// distance is negated.
    pub fn remained_distance(&self, nearest: usize, end: usize, pos_on_line: WorldPoint) -> f32 {
        let mut remain = (self.poses[nearest].pos - pos_on_line).norm();
        if nearest + 1 >= end {
            if nearest >= 1 {
                let seg = self.poses[nearest].pos - self.poses[nearest - 1].pos;
                let rem = self.poses[nearest].pos - pos_on_line;
                if seg.dot(rem) < 0.0 {
                    remain = -remain;
                }
            }
            return remain;
        }
        for i in (nearest + 1)..end.min(self.poses.len()) {
            remain += (self.poses[i].pos - self.poses[i - 1].pos).norm();
        }
        remain
    }

    /// Mean three-point curvature over the window reaching `forward_dist`
    /// ahead of the projected point.
    pub fn curvature(
        &self,
        begin: usize,
        end: usize,
        pos_on_line: WorldPoint,
        forward_dist: f32,
    ) -> f32 {
        let end = end.min(self.poses.len());
        let mut searched = (self.poses[begin].pos - pos_on_line).norm();
        let mut sum = 0.0f32;
        let mut count = 0usize;
        let mut i = begin;
        while i + 2 < end && searched < forward_dist {
            let a = self.poses[i].pos;
            let b = self.poses[i + 1].pos;
            let c = self.poses[i + 2].pos;
            let k = curvature_3p(a, b, c);
            if k.is_finite() {
                sum += k;
                count += 1;
            }
            searched += (b - a).norm();
            i += 1;
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }
}
