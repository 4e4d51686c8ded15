//! Tracker node: tick sources and bus wiring.
//!
//! Two mutually exclusive tick sources drive the control law: a timer at
//! the configured rate, or incoming odometry messages (optionally
//! extrapolated by their own twist). All callbacks run on one event loop,
//! so tracker state needs no locking.

use crate::config::TrackerConfig;
use crate::tracker::{Tracker, TrackerOutput, TrackerStatus, TrackingStatus};
use crossbeam_channel::{never, select, tick, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use sutra_core::bus::Topic;
use sutra_core::{
    Clock, Header, Odometry, PathMessage, Pose2D, PoseStamped, StampedTransform2D, TfBuffer,
    VelocityCommand,
};
use tracing::{error, info, warn};

/// All bus endpoints of the tracker node.
#[derive(Clone)]
pub struct TrackerTopics {
    pub path: Topic<PathMessage>,
    pub path_velocity: Topic<PathMessage>,
    pub speed: Topic<f32>,
    pub odom: Topic<Odometry>,
    pub tf: Topic<StampedTransform2D>,
    pub params: Topic<crate::tracker::TrackerParams>,
    pub cmd_vel: Topic<VelocityCommand>,
    pub status: Topic<TrackerStatus>,
    pub tracking: Topic<PoseStamped>,
}

impl TrackerTopics {
    pub fn new() -> Self {
        Self {
            path: Topic::new("path"),
            path_velocity: Topic::new("path_velocity"),
            speed: Topic::new("speed"),
            odom: Topic::new("odom"),
            tf: Topic::new("tf"),
            params: Topic::new("params"),
            cmd_vel: Topic::new("cmd_vel"),
            status: Topic::new("status"),
            tracking: Topic::new("tracking"),
        }
    }
}

impl Default for TrackerTopics {
    fn default() -> Self {
        Self::new()
    }
}

/// The tracker node.
pub struct TrackerNode {
    config: TrackerConfig,
    tracker: Tracker,
    tf: TfBuffer,
    clock: Clock,
    prev_odom_stamp: Option<f64>,
    sub_path: Receiver<PathMessage>,
    sub_path_velocity: Receiver<PathMessage>,
    sub_speed: Receiver<f32>,
    sub_odom: Receiver<Odometry>,
    sub_tf: Receiver<StampedTransform2D>,
    sub_params: Receiver<crate::tracker::TrackerParams>,
    topics: TrackerTopics,
}

impl TrackerNode {
    pub fn new(config: TrackerConfig, topics: TrackerTopics) -> crate::error::Result<Self> {
        config.validate()?;
        let tracker = Tracker::new(config.params.clone());
        Ok(Self {
            config,
            tracker,
            tf: TfBuffer::new(),
            clock: Clock::new(),
            prev_odom_stamp: None,
            sub_path: topics.path.subscribe(),
            sub_path_velocity: topics.path_velocity.subscribe(),
            sub_speed: topics.speed.subscribe(),
            sub_odom: topics.odom.subscribe(),
            sub_tf: topics.tf.subscribe(),
            sub_params: topics.params.subscribe(),
            topics,
        })
    }

    /// Serialize events until `running` clears; emits one final zero
    /// command on the way out.
    pub fn spin(&mut self, running: &AtomicBool) {
        let timer = if self.config.use_odom {
            never()
        } else {
            tick(Duration::from_secs_f64(1.0 / self.config.hz))
        };
        info!(
            "tracker ticking from {}",
            if self.config.use_odom { "odometry" } else { "timer" }
        );

        while running.load(Ordering::Relaxed) {
            select! {
                recv(self.sub_path) -> msg => match msg {
                    Ok(m) => self.handle_path(m),
                    Err(_) => break,
                },
                recv(self.sub_path_velocity) -> msg => match msg {
                    Ok(m) => self.handle_path(m),
                    Err(_) => break,
                },
                recv(self.sub_speed) -> msg => match msg {
                    Ok(v) => self.handle_speed(v),
                    Err(_) => break,
                },
                recv(self.sub_odom) -> msg => match msg {
                    Ok(m) => self.handle_odometry(m),
                    Err(_) => break,
                },
                recv(self.sub_tf) -> msg => match msg {
                    Ok(t) => self.tf.set(t),
                    Err(_) => break,
                },
                recv(self.sub_params) -> msg => match msg {
                    Ok(p) => self.tracker.set_params(p),
                    Err(_) => break,
                },
                recv(timer) -> _ => self.timer_tick(),
                default(Duration::from_millis(50)) => {}
            }
        }

        self.topics.cmd_vel.publish(VelocityCommand::stop());
        info!("tracker node stopped");
    }

    /// New path event; a rejected path leaves the tracker with no goal.
    pub fn handle_path(&mut self, msg: PathMessage) {
        if let Err(e) = self.tracker.set_path(&msg) {
            error!("Path rejected: {}", e);
        }
    }

    /// Scalar override of the maximum linear velocity.
    pub fn handle_speed(&mut self, speed: f32) {
        self.tracker.set_speed(speed);
    }

    /// Timer tick: look up the robot <- odom transform and run control.
    pub fn timer_tick(&mut self) {
        let dt = (1.0 / self.config.hz) as f32;
        match self.tf.lookup(&self.config.frame_robot, &self.config.frame_odom) {
            Ok(tf) => self.run_control(tf.transform, tf.stamp, dt),
            Err(e) => {
                warn!("TF exception: {}", e);
                self.publish_no_path_status();
            }
        }
    }

    /// Odometry tick: derive dt from message stamps and optionally
    /// extrapolate the reported pose by its twist.
    pub fn handle_odometry(&mut self, odom: Odometry) {
        if odom.header.frame_id != self.config.frame_odom {
            warn!(
                "frame_odom is invalid. Update from \"{}\" to \"{}\"",
                self.config.frame_odom, odom.header.frame_id
            );
            self.config.frame_odom = odom.header.frame_id.clone();
        }
        if odom.child_frame_id != self.config.frame_robot {
            warn!(
                "frame_robot is invalid. Update from \"{}\" to \"{}\"",
                self.config.frame_robot, odom.child_frame_id
            );
            self.config.frame_robot = odom.child_frame_id.clone();
        }

        if let Some(prev) = self.prev_odom_stamp {
            let dt = (odom.header.stamp - prev).min(self.config.max_dt);
            if dt > 0.0 {
                let mut pose = odom.pose;
                if self.config.predict_odom {
                    let predict_dt = (self.clock.now() - odom.header.stamp)
                        .clamp(0.0, self.config.max_dt)
                        as f32;
                    pose = predict_pose(pose, odom.twist, predict_dt);
                }
                self.run_control(pose.inverse(), odom.header.stamp, dt as f32);
            }
        }
        self.prev_odom_stamp = Some(odom.header.stamp);
    }

    /// Compose the robot <- path transform and run one control tick.
    fn run_control(&mut self, robot_from_odom: Pose2D, tf_stamp: f64, dt: f32) {
        let now = self.clock.now();
        let robot_from_path = match self.tracker.path_frame() {
            None => Some((robot_from_odom, tf_stamp)),
            Some(path_frame) => {
                match self.tf.lookup(&self.config.frame_odom, path_frame) {
                    Ok(odom_from_path) => Some((
                        robot_from_odom.compose(&odom_from_path.transform),
                        finite_min(tf_stamp, odom_from_path.stamp),
                    )),
                    Err(e) => {
                        warn!("TF exception: {}", e);
                        None
                    }
                }
            }
        };

        let out = match robot_from_path {
            Some((trans, stamp)) => {
                let delay = if stamp.is_finite() { now - stamp } else { 0.0 };
                self.tracker.control(Some(trans), delay, dt)
            }
            None => self.tracker.control(None, 0.0, dt),
        };
        self.publish_output(out, now);
    }

    fn publish_output(&self, out: TrackerOutput, now: f64) {
        if let Some(cmd) = out.command {
            self.topics.cmd_vel.publish(cmd);
        }
        self.topics.status.publish(TrackerStatus {
            stamp: now,
            path_header: self.tracker.path_header(),
            distance_remains: out.distance_remains,
            angle_remains: out.angle_remains,
            status: out.status,
        });
        if let Some(pose) = out.tracking {
            self.topics.tracking.publish(PoseStamped {
                header: Header::new(now, self.config.frame_robot.clone()),
                pose,
            });
        }
    }

    fn publish_no_path_status(&self) {
        self.topics.status.publish(TrackerStatus {
            stamp: self.clock.now(),
            path_header: self.tracker.path_header(),
            distance_remains: 0.0,
            angle_remains: 0.0,
            status: TrackingStatus::NoPath,
        });
    }
}

/// Constant-twist extrapolation of an odometry pose.
fn predict_pose(mut pose: Pose2D, twist: VelocityCommand, dt: f32) -> Pose2D {
    let (sin_t, cos_t) = pose.yaw.sin_cos();
    pose.x += cos_t * twist.linear * dt;
    pose.y += sin_t * twist.linear * dt;
    pose.yaw += twist.angular * dt;
    pose
}

fn finite_min(a: f64, b: f64) -> f64 {
    match (a.is_finite(), b.is_finite()) {
        (true, true) => a.min(b),
        (true, false) => a,
        (false, true) => b,
        (false, false) => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sutra_core::PathPoint;

    fn node_with_topics(use_odom: bool) -> (TrackerNode, TrackerTopics) {
        let topics = TrackerTopics::new();
        let config = TrackerConfig {
            use_odom,
            ..TrackerConfig::default()
        };
        let node = TrackerNode::new(config, topics.clone()).unwrap();
        (node, topics)
    }

    fn straight_path(frame: &str) -> PathMessage {
        PathMessage {
            header: Header::new(0.0, frame),
            poses: (0..=10)
                .map(|i| PathPoint::new(Pose2D::new(i as f32 * 0.5, 0.0, 0.0)))
                .collect(),
        }
    }

    #[test]
    fn test_timer_tick_without_tf_is_no_path() {
        let (mut node, topics) = node_with_topics(false);
        let status_rx = topics.status.subscribe();
        let cmd_rx = topics.cmd_vel.subscribe();

        node.timer_tick();
        assert_eq!(status_rx.try_recv().unwrap().status, TrackingStatus::NoPath);
        // Status only: no command published.
        assert!(cmd_rx.try_recv().is_err());
    }

    #[test]
    fn test_timer_tick_follows_path() {
        let (mut node, topics) = node_with_topics(false);
        let status_rx = topics.status.subscribe();
        let cmd_rx = topics.cmd_vel.subscribe();

        // Robot at the odom origin; path expressed in the odom frame.
        node.tf.set(StampedTransform2D::new(
            0.0,
            "odom",
            "base_link",
            Pose2D::default(),
        ));
        node.handle_path(straight_path("odom"));
        node.timer_tick();

        let status = status_rx.try_recv().unwrap();
        assert_eq!(status.status, TrackingStatus::Following);
        assert!(status.distance_remains > 4.0);
        let cmd = cmd_rx.try_recv().unwrap();
        assert!(cmd.linear > 0.0);
    }

    #[test]
    fn test_exactly_one_status_per_tick() {
        let (mut node, topics) = node_with_topics(false);
        let status_rx = topics.status.subscribe();

        node.tf.set(StampedTransform2D::new(
            0.0,
            "odom",
            "base_link",
            Pose2D::default(),
        ));
        node.handle_path(straight_path("odom"));
        for _ in 0..5 {
            node.timer_tick();
        }
        assert_eq!(status_rx.try_iter().count(), 5);
    }

    #[test]
    fn test_odometry_frame_auto_correction() {
        let (mut node, _topics) = node_with_topics(true);
        let odom = Odometry {
            header: Header::new(1.0, "odom_combined"),
            child_frame_id: "base_footprint".to_string(),
            pose: Pose2D::default(),
            twist: VelocityCommand::stop(),
        };
        node.handle_odometry(odom);
        assert_eq!(node.config.frame_odom, "odom_combined");
        assert_eq!(node.config.frame_robot, "base_footprint");
    }

    #[test]
    fn test_odometry_first_message_only_arms() {
        let (mut node, topics) = node_with_topics(true);
        let status_rx = topics.status.subscribe();
        let odom = Odometry {
            header: Header::new(1.0, "odom"),
            child_frame_id: "base_link".to_string(),
            pose: Pose2D::default(),
            twist: VelocityCommand::stop(),
        };
        node.handle_odometry(odom.clone());
        assert_eq!(status_rx.try_iter().count(), 0);

        let mut second = odom;
        second.header.stamp = 1.02;
        node.handle_odometry(second);
        assert_eq!(status_rx.try_iter().count(), 1);
    }

    #[test]
    fn test_predict_pose_constant_twist() {
        let pose = Pose2D::new(1.0, 0.0, std::f32::consts::FRAC_PI_2);
        let out = predict_pose(pose, VelocityCommand::new(1.0, 0.5), 0.1);
        // Moving along +Y at this heading.
        assert!((out.x - 1.0).abs() < 1e-6);
        assert!((out.y - 0.1).abs() < 1e-6);
        assert!((out.yaw - (std::f32::consts::FRAC_PI_2 + 0.05)).abs() < 1e-6);
    }
}
