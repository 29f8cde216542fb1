//! In-process simulation doubles for running the fusion stack without a robot.
//!
//! [`SimPoseSource`] replays a script of estimates and [`SimDrivetrain`]
//! records every reset and correction it receives while keeping a plausible
//! pose estimate. Together they let the control loop run in headless tests
//! and in the CLI harness.
//!
//! # Example
//!
//! ```rust
//! use tagfuse_hal::sim::{SimDrivetrain, SimPoseSource};
//! use tagfuse_hal::{Drivetrain, PoseSource};
//! use tagfuse_types::{Pose2d, PoseEstimate};
//!
//! let mut source = SimPoseSource::new("front").with_estimate(PoseEstimate {
//!     pose: Pose2d::new(1.0, 2.0, 0.0),
//!     tag_count: 1,
//!     avg_tag_distance: 1.0,
//!     timestamp_seconds: 0.5,
//!     ..PoseEstimate::default()
//! });
//! let mut drivetrain = SimDrivetrain::new(Pose2d::default());
//!
//! let est = source.latest_estimate();
//! drivetrain.reset_pose(est.pose);
//! assert_eq!(drivetrain.resets().len(), 1);
//! ```

use std::collections::VecDeque;

use tagfuse_types::{ImuMode, Pose2d, PoseEstimate, StdDevs};

use crate::drivetrain::Drivetrain;
use crate::pose_source::PoseSource;

// ────────────────────────────────────────────────────────────────────────────
// Scripted pose source
// ────────────────────────────────────────────────────────────────────────────

/// A pose source that returns scripted estimates, one per poll.
///
/// Once the script is exhausted the last estimate keeps being returned, which
/// is exactly what a real tracker does when no new frame has arrived.
pub struct SimPoseSource {
    id: String,
    script: VecDeque<PoseEstimate>,
    current: PoseEstimate,
    orientations: Vec<f64>,
    imu_modes: Vec<ImuMode>,
}

impl SimPoseSource {
    /// Create a source that reports no tags until something is queued.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: VecDeque::new(),
            current: PoseEstimate::empty(),
            orientations: Vec::new(),
            imu_modes: Vec::new(),
        }
    }

    /// Queue one estimate at the end of the script.
    pub fn with_estimate(mut self, estimate: PoseEstimate) -> Self {
        self.script.push_back(estimate);
        self
    }

    /// Queue one estimate at the end of the script.
    pub fn queue(&mut self, estimate: PoseEstimate) {
        self.script.push_back(estimate);
    }

    /// Every heading pushed so far, oldest first.
    pub fn orientations(&self) -> &[f64] {
        &self.orientations
    }

    /// Every IMU mode requested so far, oldest first.
    pub fn imu_modes(&self) -> &[ImuMode] {
        &self.imu_modes
    }
}

impl PoseSource for SimPoseSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn push_orientation(&mut self, heading_degrees: f64) {
        self.orientations.push(heading_degrees);
    }

    fn set_imu_mode(&mut self, mode: ImuMode) {
        self.imu_modes.push(mode);
    }

    fn latest_estimate(&mut self) -> PoseEstimate {
        if let Some(next) = self.script.pop_front() {
            self.current = next;
        }
        self.current
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recording drivetrain
// ────────────────────────────────────────────────────────────────────────────

/// One weighted correction received by a [`SimDrivetrain`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionRecord {
    pub pose: Pose2d,
    pub timestamp_seconds: f64,
    pub std_devs: StdDevs,
}

/// A simulated drivetrain pose estimator.
///
/// Odometry deltas move the estimate directly. Vision corrections are blended
/// per axis with an inverse-variance weight against a fixed odometry
/// uncertainty, so an axis with infinite measurement std dev is never moved.
#[derive(Debug, Clone)]
pub struct SimDrivetrain {
    pose: Pose2d,
    odometry_std_dev: f64,
    resets: Vec<Pose2d>,
    fusions: Vec<FusionRecord>,
}

impl SimDrivetrain {
    /// Default odometry uncertainty (metres / radians).
    pub const DEFAULT_ODOMETRY_STD_DEV: f64 = 0.1;

    pub fn new(initial: Pose2d) -> Self {
        Self {
            pose: initial,
            odometry_std_dev: Self::DEFAULT_ODOMETRY_STD_DEV,
            resets: Vec::new(),
            fusions: Vec::new(),
        }
    }

    pub fn with_odometry_std_dev(mut self, std_dev: f64) -> Self {
        self.odometry_std_dev = std_dev.abs();
        self
    }

    /// Apply a field-relative odometry delta.
    pub fn apply_odometry(&mut self, dx: f64, dy: f64, dheading: f64) {
        self.pose.x += dx;
        self.pose.y += dy;
        self.pose.heading += dheading;
    }

    /// Every hard reset received, oldest first.
    pub fn resets(&self) -> &[Pose2d] {
        &self.resets
    }

    /// Every weighted correction received, oldest first.
    pub fn fusions(&self) -> &[FusionRecord] {
        &self.fusions
    }

    // Kalman-style gain for one axis.
    fn gain(&self, measurement_std_dev: f64) -> f64 {
        let odom_var = self.odometry_std_dev * self.odometry_std_dev;
        let meas_var = measurement_std_dev * measurement_std_dev;
        if !meas_var.is_finite() {
            return 0.0;
        }
        if odom_var + meas_var <= 0.0 {
            return 1.0;
        }
        odom_var / (odom_var + meas_var)
    }
}

impl Drivetrain for SimDrivetrain {
    fn current_pose(&self) -> Pose2d {
        self.pose
    }

    fn reset_pose(&mut self, pose: Pose2d) {
        self.pose = pose;
        self.resets.push(pose);
    }

    fn fuse_measurement(&mut self, pose: Pose2d, timestamp_seconds: f64, std_devs: StdDevs) {
        let (kx, ky, kh) = (
            self.gain(std_devs.x),
            self.gain(std_devs.y),
            self.gain(std_devs.heading),
        );
        self.pose.x += kx * (pose.x - self.pose.x);
        self.pose.y += ky * (pose.y - self.pose.y);
        self.pose.heading += kh * (pose.heading - self.pose.heading);
        self.fusions.push(FusionRecord {
            pose,
            timestamp_seconds,
            std_devs,
        });
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
