//! Generic `Drivetrain` trait: the owner of the robot's running pose estimate.
//!
//! The fusion core never owns drivetrain state. It reads the current pose and
//! writes corrections through this contract; kinematics, odometry and motor
//! control stay on the other side of it.

use tagfuse_types::{Pose2d, StdDevs};

/// A drivetrain pose estimator that accepts vision corrections.
pub trait Drivetrain {
    /// The drivetrain's current field-relative pose estimate.
    fn current_pose(&self) -> Pose2d;

    /// Hard-reset the pose estimate. Used only to seed localization.
    fn reset_pose(&mut self, pose: Pose2d);

    /// Blend a vision measurement into the pose estimate.
    ///
    /// `timestamp_seconds` is in the control loop's clock domain and
    /// `std_devs` states how much to trust each axis.
    fn fuse_measurement(&mut self, pose: Pose2d, timestamp_seconds: f64, std_devs: StdDevs);
}

impl<D: Drivetrain + ?Sized> Drivetrain for Box<D> {
    fn current_pose(&self) -> Pose2d {
        (**self).current_pose()
    }

    fn reset_pose(&mut self, pose: Pose2d) {
        (**self).reset_pose(pose)
    }

    fn fuse_measurement(&mut self, pose: Pose2d, timestamp_seconds: f64, std_devs: StdDevs) {
        (**self).fuse_measurement(pose, timestamp_seconds, std_devs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal drivetrain that overwrites its pose on every call.
    struct MockDrivetrain {
        pose: Pose2d,
        fused: usize,
    }

    impl Drivetrain for MockDrivetrain {
        fn current_pose(&self) -> Pose2d {
            self.pose
        }

        fn reset_pose(&mut self, pose: Pose2d) {
            self.pose = pose;
        }

        fn fuse_measurement(&mut self, pose: Pose2d, _timestamp_seconds: f64, _std_devs: StdDevs) {
            self.pose = pose;
            self.fused += 1;
        }
    }

    #[test]
    fn boxed_drivetrain_forwards_calls() {
        let mut dt: Box<dyn Drivetrain> = Box::new(MockDrivetrain {
            pose: Pose2d::default(),
            fused: 0,
        });
        dt.reset_pose(Pose2d::new(1.0, 1.0, 0.0));
        assert_eq!(dt.current_pose(), Pose2d::new(1.0, 1.0, 0.0));
        dt.fuse_measurement(Pose2d::new(2.0, 1.0, 0.0), 0.0, StdDevs::translation_only(1.0));
        assert_eq!(dt.current_pose().x, 2.0);
    }
}
