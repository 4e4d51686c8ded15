//! Closed-loop tracking scenarios: a simulated differential-drive robot
//! integrates the published commands while the node ticks on odometry.

use marga_tracker::{TrackerConfig, TrackerNode, TrackerParams, TrackerTopics, TrackingStatus};
use std::f32::consts::FRAC_PI_2;
use sutra_core::{Header, Odometry, PathMessage, PathPoint, Pose2D, VelocityCommand};

const DT: f64 = 0.02;

struct Sim {
    node: TrackerNode,
    topics: TrackerTopics,
    pose: Pose2D,
    twist: VelocityCommand,
    time: f64,
}

impl Sim {
    fn new(params: TrackerParams) -> Self {
        let topics = TrackerTopics::new();
        let config = TrackerConfig {
            use_odom: true,
            predict_odom: false,
            params,
            ..TrackerConfig::default()
        };
        let node = TrackerNode::new(config, topics.clone()).unwrap();
        Self {
            node,
            topics,
            pose: Pose2D::default(),
            twist: VelocityCommand::stop(),
            time: 10.0,
        }
    }

    fn send_path(&mut self, points: Vec<PathPoint>) {
        self.node.handle_path(PathMessage {
            header: Header::new(self.time, "odom"),
            poses: points,
        });
    }

    /// One odometry tick; returns the last published status.
    fn step(&mut self, cmd_rx: &crossbeam_channel::Receiver<VelocityCommand>) -> TrackingStatus {
        let status_rx = self.topics.status.subscribe();
        self.time += DT;
        self.node.handle_odometry(Odometry {
            header: Header::new(self.time, "odom"),
            child_frame_id: "base_link".to_string(),
            pose: self.pose,
            twist: self.twist,
        });
        if let Some(cmd) = cmd_rx.try_iter().last() {
            self.twist = cmd;
        }
        // Unicycle integration.
        let (sin_t, cos_t) = self.pose.yaw.sin_cos();
        self.pose.x += cos_t * self.twist.linear * DT as f32;
        self.pose.y += sin_t * self.twist.linear * DT as f32;
        self.pose.yaw += self.twist.angular * DT as f32;
        status_rx
            .try_iter()
            .last()
            .map(|s| s.status)
            .unwrap_or(TrackingStatus::NoPath)
    }
}

fn straight(points: usize, step: f32) -> Vec<PathPoint> {
    (0..points)
        .map(|i| PathPoint::new(Pose2D::new(i as f32 * step, 0.0, 0.0)))
        .collect()
}

#[test]
fn follows_straight_path_to_goal() {
    let mut sim = Sim::new(TrackerParams::default());
    let cmd_rx = sim.topics.cmd_vel.subscribe();
    sim.send_path(straight(21, 0.1));

    let mut status = TrackingStatus::NoPath;
    for _ in 0..3000 {
        status = sim.step(&cmd_rx);
        if status == TrackingStatus::Goal {
            break;
        }
        // The robot never leaves the line.
        assert!(sim.pose.y.abs() < 0.05);
    }
    assert_eq!(status, TrackingStatus::Goal);
    assert!((sim.pose.x - 2.0).abs() < 0.2, "stopped at {}", sim.pose.x);
    assert!(sim.twist.linear.abs() < 1e-3);
}

#[test]
fn mid_path_rotation_is_taken_in_place() {
    let mut sim = Sim::new(TrackerParams::default());
    let cmd_rx = sim.topics.cmd_vel.subscribe();

    // +X leg, rotate at the corner, then +Y leg.
    let mut points = Vec::new();
    for i in 0..=10 {
        points.push(PathPoint::new(Pose2D::new(i as f32 * 0.2, 0.0, 0.0)));
    }
    points.push(PathPoint::new(Pose2D::new(2.0, 0.0, FRAC_PI_2)));
    for i in 1..=10 {
        points.push(PathPoint::new(Pose2D::new(2.0, i as f32 * 0.2, FRAC_PI_2)));
    }
    sim.send_path(points);

    let mut status = TrackingStatus::NoPath;
    for _ in 0..8000 {
        status = sim.step(&cmd_rx);
        if status == TrackingStatus::Goal {
            break;
        }
    }
    assert_eq!(status, TrackingStatus::Goal);
    assert!((sim.pose.x - 2.0).abs() < 0.3, "x = {}", sim.pose.x);
    assert!((sim.pose.y - 2.0).abs() < 0.3, "y = {}", sim.pose.y);
    assert!(
        (sim.pose.yaw - FRAC_PI_2).abs() < 0.3,
        "yaw = {}",
        sim.pose.yaw
    );
}

#[test]
fn reverse_path_drives_backward() {
    let mut sim = Sim::new(TrackerParams::default());
    let cmd_rx = sim.topics.cmd_vel.subscribe();

    // Waypoints behind the robot, headings kept forward: with
    // allow_backward the tracker backs down the path.
    let points: Vec<PathPoint> = (0..=10)
        .map(|i| PathPoint::new(Pose2D::new(i as f32 * -0.3, 0.0, 0.0)))
        .collect();
    sim.send_path(points);

    for _ in 0..50 {
        sim.step(&cmd_rx);
    }
    assert!(sim.twist.linear < 0.0);
    assert!(sim.pose.x < -0.01);
}

#[test]
fn far_from_path_halts_immediately() {
    let mut params = TrackerParams::default();
    params.dist_stop = 1.0;
    let mut sim = Sim::new(params);
    let cmd_rx = sim.topics.cmd_vel.subscribe();

    sim.pose.y = 2.0; // 2 m lateral offset
    sim.send_path(straight(21, 0.5));

    let status = sim.step(&cmd_rx);
    let status2 = sim.step(&cmd_rx);
    assert_eq!(status, TrackingStatus::NoPath); // first odom message only arms dt
    assert_eq!(status2, TrackingStatus::FarFromPath);
    assert_eq!(sim.twist, VelocityCommand::stop());
    assert!((sim.pose.y - 2.0).abs() < 1e-6);
}

#[test]
fn empty_path_reports_no_path_and_zero_twist() {
    let mut sim = Sim::new(TrackerParams::default());
    let cmd_rx = sim.topics.cmd_vel.subscribe();
    sim.send_path(vec![]);

    sim.step(&cmd_rx);
    let status = sim.step(&cmd_rx);
    assert_eq!(status, TrackingStatus::NoPath);
    assert_eq!(sim.twist, VelocityCommand::stop());
}

#[test]
fn speed_override_caps_velocity() {
    let mut sim = Sim::new(TrackerParams::default());
    let cmd_rx = sim.topics.cmd_vel.subscribe();
    sim.send_path(straight(41, 0.25));

    // Warm up, then drop the speed cap far below the configured maximum.
    for _ in 0..100 {
        sim.step(&cmd_rx);
    }
    sim.node.handle_speed(0.1);
    for _ in 0..100 {
        sim.step(&cmd_rx);
    }
    assert!(sim.twist.linear <= 0.1 + 1e-5);
    assert!(sim.twist.linear > 0.0);
}
