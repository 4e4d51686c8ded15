//! Closed-loop trajectory tracking control law.
//!
//! Consumes the robot pose (as a robot <- path transform) and the stored
//! reference path, produces velocity commands plus a tracking status.
//! Pure-pursuit lookahead combined with time-optimal deceleration toward
//! the goal, slew-limited velocities, and explicit rotate-in-place
//! handling for sharp heading errors, short paths and in-place-turn
//! markers.

use crate::control::{time_optimal_control, VelAccLimiter};
use crate::geometry::{clip, line_distance, projection};
use crate::path::Path2D;
use serde::Deserialize;
use sutra_core::{normalize_angle, Header, PathMessage, Pose2D, VelocityCommand, WorldPoint};
use tracing::{debug, error, info};

/// Transform age beyond which a stale-path report is logged.
const TRANSFORM_AGE_LIMIT: f64 = 0.1;

/// Tracking state reported once per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingStatus {
    /// No usable path or transform this tick.
    NoPath = 0,
    /// Lateral divergence exceeded `dist_stop`; stopped.
    FarFromPath = 1,
    /// Actively tracking.
    Following = 2,
    /// Within goal tolerances at the end of the path.
    Goal = 3,
}

/// Status message published every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerStatus {
    pub stamp: f64,
    pub path_header: Header,
    pub distance_remains: f32,
    pub angle_remains: f32,
    pub status: TrackingStatus,
}

/// Runtime-adjustable control parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    /// Lookahead time for the pursuit origin (s)
    pub look_forward: f32,
    /// Curvature averaging window ahead of the projection (m)
    pub curv_forward: f32,
    /// Lateral error gain
    pub k_dist: f32,
    /// Heading error gain
    pub k_ang: f32,
    /// Angular velocity error gain
    pub k_avel: f32,
    /// When nonzero, scales the heading gain by `target_vel / gain_at_vel`
    pub gain_at_vel: f32,
    /// Lateral error clip (m)
    pub dist_lim: f32,
    /// Lateral divergence that aborts tracking (m)
    pub dist_stop: f32,
    /// Heading error that switches to rotate-in-place (rad)
    pub rotate_ang: f32,
    /// Maximum linear velocity (m/s)
    pub max_vel: f32,
    /// Maximum angular velocity (rad/s)
    pub max_angvel: f32,
    /// Maximum linear acceleration (m/s^2)
    pub max_acc: f32,
    /// Maximum angular acceleration (rad/s^2)
    pub max_angacc: f32,
    /// Deceleration margin for time-optimal linear control
    pub acc_toc_factor: f32,
    /// Deceleration margin for time-optimal angular control
    pub angacc_toc_factor: f32,
    /// Path decimation step
    pub path_step: usize,
    /// Goal position tolerance (m)
    pub goal_tolerance_dist: f32,
    /// Goal heading tolerance (rad)
    pub goal_tolerance_ang: f32,
    /// Position tolerance that freezes the linear command (m)
    pub stop_tolerance_dist: f32,
    /// Heading tolerance that freezes the angular command (rad)
    pub stop_tolerance_ang: f32,
    /// Paths shorter than this skip position control (m)
    pub no_position_control_dist: f32,
    /// Paths shorter than this rotate in place only (m)
    pub min_tracking_path: f32,
    /// Follow reverse path segments backward
    pub allow_backward: bool,
    /// Slow down so the feed-forward angular rate stays within limits
    pub limit_vel_by_avel: bool,
    /// Report transforms older than 100 ms
    pub check_old_path: bool,
    /// Waypoint dedup distance and nearest-search tie-break (m)
    pub epsilon: f32,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            look_forward: 0.5,
            curv_forward: 0.5,
            k_dist: 1.0,
            k_ang: 1.0,
            k_avel: 1.0,
            gain_at_vel: 0.0,
            dist_lim: 0.5,
            dist_stop: 2.0,
            rotate_ang: std::f32::consts::FRAC_PI_4,
            max_vel: 0.5,
            max_angvel: 1.0,
            max_acc: 1.0,
            max_angacc: 2.0,
            acc_toc_factor: 0.9,
            angacc_toc_factor: 0.9,
            path_step: 1,
            goal_tolerance_dist: 0.2,
            goal_tolerance_ang: 0.1,
            stop_tolerance_dist: 0.1,
            stop_tolerance_ang: 0.05,
            no_position_control_dist: 0.2,
            min_tracking_path: 0.0,
            allow_backward: true,
            limit_vel_by_avel: false,
            check_old_path: false,
            epsilon: 0.001,
        }
    }
}

/// One tick's worth of tracker output.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerOutput {
    /// Command to publish; `None` when the tick is status-only
    /// (transform failure leaves the previous command standing).
    pub command: Option<VelocityCommand>,
    pub status: TrackingStatus,
    pub distance_remains: f32,
    pub angle_remains: f32,
    /// Pose on the path being tracked, in the robot frame.
    pub tracking: Option<Pose2D>,
}

impl TrackerOutput {
    fn status_only(status: TrackingStatus) -> Self {
        Self {
            command: None,
            status,
            distance_remains: 0.0,
            angle_remains: 0.0,
            tracking: None,
        }
    }

    fn stopped(status: TrackingStatus) -> Self {
        Self {
            command: Some(VelocityCommand::stop()),
            ..Self::status_only(status)
        }
    }
}

/// The tracker state machine.
pub struct Tracker {
    params: TrackerParams,
    path: Path2D,
    path_header: Option<Header>,
    path_step_done: usize,
    v_lim: VelAccLimiter,
    w_lim: VelAccLimiter,
}

impl Tracker {
    pub fn new(params: TrackerParams) -> Self {
        Self {
            params,
            path: Path2D::new(),
            path_header: None,
            path_step_done: 0,
            v_lim: VelAccLimiter::new(),
            w_lim: VelAccLimiter::new(),
        }
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// Replace the runtime parameters.
    pub fn set_params(&mut self, params: TrackerParams) {
        self.params = params;
    }

    /// Scalar override of the maximum linear velocity.
    pub fn set_speed(&mut self, speed: f32) {
        self.params.max_vel = speed;
    }

    /// Frame of the current path, if any.
    pub fn path_frame(&self) -> Option<&str> {
        self.path_header.as_ref().map(|h| h.frame_id.as_str())
    }

    pub fn path_header(&self) -> Header {
        self.path_header.clone().unwrap_or_default()
    }

    /// Ingest a new reference path, replacing the previous one.
    pub fn set_path(&mut self, msg: &PathMessage) -> crate::error::Result<()> {
        self.path_header = Some(msg.header.clone());
        self.path_step_done = 0;
        match Path2D::from_points(&msg.poses, self.params.epsilon) {
            Ok(path) => {
                debug!("New path with {} poses", path.len());
                self.path = path;
                Ok(())
            }
            Err(e) => {
                self.path = Path2D::new();
                Err(e)
            }
        }
    }

    /// Run one control tick.
    ///
    /// `robot_from_path` expresses path-frame points in the robot frame;
    /// `None` means the frame lookup failed, which yields a status-only
    /// `NO_PATH` tick. `transform_delay` is the age of the transform in
    /// seconds.
    pub fn control(
        &mut self,
        robot_from_path: Option<Pose2D>,
        transform_delay: f64,
        dt: f32,
    ) -> TrackerOutput {
        if self.path_header.is_none() || self.path.is_empty() {
            self.v_lim.clear();
            self.w_lim.clear();
            return TrackerOutput::stopped(TrackingStatus::NoPath);
        }
        let trans = match robot_from_path {
            Some(t) => t,
            None => return TrackerOutput::status_only(TrackingStatus::NoPath),
        };
        if transform_delay.abs() > TRANSFORM_AGE_LIMIT && self.params.check_old_path {
            error!("Transform is too old: delay {:.3}s", transform_delay);
        }

        let p = self.params.clone();
        let acc_toc = [p.max_acc * p.acc_toc_factor, p.max_angacc * p.angacc_toc_factor];

        let lpath = self.path.transformed(&trans, p.path_step);
        let path_length = lpath.length();
        let begin = self.path_step_done.min(lpath.len() - 1);

        // Pursuit origin: the robot projected ahead along its current
        // motion.
        let predicted_yaw = self.w_lim.get() * p.look_forward / 2.0;
        let origin = WorldPoint::new(predicted_yaw.cos(), predicted_yaw.sin())
            * (self.v_lim.get() * p.look_forward);

        let i_local_goal = lpath.find_local_goal(begin, p.allow_backward);
        let max_search_range = if self.path_step_done > 0 { 1.0 } else { 0.0 };
        let i_nearest =
            match lpath.find_nearest(begin, i_local_goal, origin, max_search_range, p.epsilon) {
                Some(i) => i,
                None => {
                    self.v_lim.clear();
                    self.w_lim.clear();
                    return TrackerOutput::stopped(TrackingStatus::NoPath);
                }
            };
        let i_prev = i_nearest.saturating_sub(1);

        let a = lpath.get(i_prev).pos;
        let b = lpath.get(i_nearest).pos;
        let pos_on_line = projection(a, b, origin);
        let linear_vel = lpath.get(i_nearest).velocity.unwrap_or(p.max_vel);

        let mut remain_local = lpath.remained_distance(i_nearest, i_local_goal, pos_on_line);
        let mut remain = lpath.remained_distance(i_nearest, lpath.len(), pos_on_line);
        if path_length < p.no_position_control_dist {
            remain = 0.0;
            remain_local = 0.0;
        }

        let dist_err = line_distance(a, b, origin);

        // Heading error relative to the tracked segment, with the travel
        // sign resolved against the waypoint yaw.
        let vec = b - a;
        let mut angle = -vec.y.atan2(vec.x);
        let angle_pose = if p.allow_backward {
            lpath.get(i_nearest).yaw
        } else {
            -angle
        };
        let mut sign_vel = 1.0f32;
        if (-angle).cos() * angle_pose.cos() + (-angle).sin() * angle_pose.sin() < 0.0 {
            sign_vel = -1.0;
            angle += std::f32::consts::PI;
        }
        angle = normalize_angle(angle);

        let curv = lpath.curvature(i_nearest, i_local_goal, pos_on_line, p.curv_forward);

        let mut distance_remains = remain;
        let mut angle_remains = angle;

        debug!(
            "nearest: {}, local goal: {}, done: {}, goal: {}, remain: {:.3}, remain_local: {:.3}",
            i_nearest,
            i_local_goal,
            self.path_step_done,
            lpath.len(),
            remain,
            remain_local
        );

        let mut arrive_local_goal = false;
        let in_place_turning = vec.x == 0.0 && vec.y == 0.0;

        let large_angle_error =
            p.rotate_ang.abs() < std::f32::consts::PI && p.rotate_ang.cos() > angle.cos();
        if large_angle_error
            || remain_local.abs() < p.stop_tolerance_dist
            || path_length < p.min_tracking_path
            || in_place_turning
        {
            // Stop and rotate.
            if large_angle_error {
                info!("Stop and rotate due to large angular error: {:.3}", angle);
            }
            if path_length < p.min_tracking_path
                || remain_local.abs() < p.stop_tolerance_dist
                || in_place_turning
            {
                angle = normalize_angle(-lpath.get(i_local_goal - 1).yaw);
                angle_remains = angle;
                if i_local_goal != lpath.len() {
                    arrive_local_goal = true;
                }
            }
            self.v_lim.set(0.0, linear_vel, p.max_acc, dt);
            self.w_lim.set(
                time_optimal_control(angle + self.w_lim.get() * dt * 1.5, acc_toc[1]),
                p.max_angvel,
                p.max_angacc,
                dt,
            );

            if path_length < p.stop_tolerance_dist || in_place_turning {
                distance_remains = 0.0;
            }
        } else {
            // Reject ticks that drifted too far off the path.
            let dist_from_path = if i_nearest == 0 || i_nearest + 1 >= lpath.len() {
                -(b - origin).norm()
            } else {
                dist_err
            };
            if dist_from_path.abs() > p.dist_stop {
                return TrackerOutput {
                    command: Some(VelocityCommand::stop()),
                    status: TrackingStatus::FarFromPath,
                    distance_remains,
                    angle_remains,
                    tracking: None,
                };
            }

            // Path-following control.
            let dist_err_clip = clip(dist_err, p.dist_lim);

            self.v_lim.set(
                time_optimal_control(-remain_local * sign_vel, acc_toc[0]),
                linear_vel,
                p.max_acc,
                dt,
            );

            let mut wref = self.v_lim.get().abs() * curv;
            if p.limit_vel_by_avel && wref.abs() > p.max_angvel {
                self.v_lim.set(
                    self.v_lim.get().signum() * (p.max_angvel / curv).abs(),
                    linear_vel,
                    p.max_acc,
                    dt,
                );
                wref = wref.signum() * p.max_angvel;
            }

            let k_ang = if p.gain_at_vel == 0.0 {
                p.k_ang
            } else {
                p.k_ang * linear_vel / p.gain_at_vel
            };
            self.w_lim.increment(
                dt * (-dist_err_clip * p.k_dist
                    - angle * k_ang
                    - (self.w_lim.get() - wref) * p.k_avel),
                p.max_angvel,
                p.max_angacc,
                dt,
            );
        }

        if distance_remains.abs() < p.stop_tolerance_dist
            && angle_remains.abs() < p.stop_tolerance_ang
        {
            self.v_lim.clear();
            self.w_lim.clear();
        }

        let command = VelocityCommand::new(self.v_lim.get(), self.w_lim.get());
        let status = if distance_remains.abs() < p.goal_tolerance_dist
            && angle_remains.abs() < p.goal_tolerance_ang
            && i_local_goal == lpath.len()
        {
            TrackingStatus::Goal
        } else {
            TrackingStatus::Following
        };

        if arrive_local_goal {
            self.path_step_done = i_local_goal;
        } else {
            self.path_step_done = self.path_step_done.max(i_nearest.saturating_sub(1));
        }

        TrackerOutput {
            command: Some(command),
            status,
            distance_remains,
            angle_remains,
            tracking: Some(Pose2D::new(pos_on_line.x, pos_on_line.y, -angle)),
        }
    }
}
