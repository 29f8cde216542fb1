//! Ground truth for `tagfuse sim`: a robot circling mid-field, cameras that
//! see it through two fixed tag clusters, and a driver-station schedule.

use std::f64::consts::TAU;

use tagfuse_hal::botpose::BOTPOSE_HEADER_LEN;
use tagfuse_perception::FieldBounds;
use tagfuse_runtime::RobotMode;
use tagfuse_types::Pose2d;

/// Wheel odometry over-reports travel by this factor, so the drivetrain
/// drifts without vision.
pub const ODOMETRY_SCALE_ERROR: f64 = 1.03;

/// Cycles spent disabled before autonomous starts.
const DISABLED_CYCLES: u64 = 25;
/// Length of the autonomous period in cycles.
const AUTONOMOUS_CYCLES: u64 = 750;

/// Circular path around the field centre.
#[derive(Debug, Clone, Copy)]
pub struct Track {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    /// Radians per second.
    pub angular_rate: f64,
}

impl Track {
    pub fn for_field(bounds: &FieldBounds) -> Self {
        Self {
            center_x: (bounds.x_min + bounds.x_max) / 2.0,
            center_y: (bounds.y_min + bounds.y_max) / 2.0,
            radius: 2.0,
            angular_rate: 0.4,
        }
    }

    /// True robot pose `t` seconds after the start, facing along the path.
    pub fn pose_at(&self, t: f64) -> Pose2d {
        let angle = self.angular_rate * t;
        Pose2d::new(
            self.center_x + self.radius * angle.cos(),
            self.center_y + self.radius * angle.sin(),
            (angle + TAU / 4.0).rem_euclid(TAU),
        )
    }
}

/// A camera looking at one cluster of tags.
#[derive(Debug, Clone, Copy)]
pub struct SimCamera {
    pub tag_x: f64,
    pub tag_y: f64,
    pub tags_in_cluster: u32,
    /// Tags further than this are never detected.
    pub max_range: f64,
    pub latency_seconds: f64,
}

impl SimCamera {
    /// Cameras alternate between clusters either side of the track.
    pub fn for_index(index: usize, track: &Track) -> Self {
        let side = if index % 2 == 0 { -1.0 } else { 1.0 };
        Self {
            tag_x: track.center_x + side * (track.radius + 0.5),
            tag_y: track.center_y,
            tags_in_cluster: 2,
            max_range: 6.0,
            latency_seconds: 0.025,
        }
    }

    /// The botpose array this camera publishes at `publish_time_us` while the
    /// robot drives `track`. The frame shows the robot where it was
    /// `latency_seconds` before publication.
    pub fn frame(&self, track: &Track, publish_time_us: i64) -> Vec<f64> {
        let captured_at = publish_time_us as f64 * 1e-6 - self.latency_seconds;
        self.frame_of(track.pose_at(captured_at))
    }

    fn frame_of(&self, truth: Pose2d) -> Vec<f64> {
        let latency_ms = self.latency_seconds * 1e3;
        let distance = (truth.x - self.tag_x).hypot(truth.y - self.tag_y);
        if distance > self.max_range {
            let mut empty = vec![0.0; BOTPOSE_HEADER_LEN];
            empty[6] = latency_ms;
            return empty;
        }

        let mut values = vec![
            truth.x,
            truth.y,
            0.0,
            0.0,
            0.0,
            truth.heading.to_degrees(),
            latency_ms,
            f64::from(self.tags_in_cluster),
            0.5,
            distance,
            1.0 / (1.0 + distance * distance),
        ];
        for tag in 0..self.tags_in_cluster {
            let id = f64::from(tag + 1);
            values.extend_from_slice(&[id, 0.0, 0.0, 0.5, distance, distance, 0.1]);
        }
        values
    }
}

/// Driver-station mode for a given cycle: disabled, then autonomous, then
/// teleop.
pub fn mode_at(cycle: u64) -> RobotMode {
    if cycle < DISABLED_CYCLES {
        RobotMode::Disabled
    } else if cycle < DISABLED_CYCLES + AUTONOMOUS_CYCLES {
        RobotMode::Autonomous
    } else {
        RobotMode::Teleop
    }
}

/// Odometry delta between two truth poses as the drifting wheels report it.
pub fn odometry_between(from: Pose2d, to: Pose2d) -> (f64, f64, f64) {
    let mut dheading = to.heading - from.heading;
    if dheading > TAU / 2.0 {
        dheading -= TAU;
    } else if dheading < -TAU / 2.0 {
        dheading += TAU;
    }
    (
        (to.x - from.x) * ODOMETRY_SCALE_ERROR,
        (to.y - from.y) * ODOMETRY_SCALE_ERROR,
        dheading,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagfuse_hal::botpose::{decode_botpose, fiducial_ids};

    fn track() -> Track {
        Track::for_field(&FieldBounds::default())
    }

    #[test]
    fn track_stays_on_the_field() {
        let bounds = FieldBounds::default();
        let t = track();
        for i in 0..200 {
            let p = t.pose_at(f64::from(i) * 0.1);
            assert!(bounds.contains(p.x, p.y));
        }
    }

    #[test]
    fn near_camera_frame_decodes_to_truth() {
        let t = track();
        let cam = SimCamera::for_index(0, &t);
        // Start of the track is on the +x side; camera 0 looks at the -x cluster.
        let truth = t.pose_at(0.0);
        let frame = cam.frame_of(truth);
        let est = decode_botpose(&frame, 25_000).unwrap();
        assert_eq!(est.tag_count, 2);
        assert!((est.avg_tag_distance - 4.5).abs() < 1e-9);
        assert!(est.timestamp_seconds.abs() < 1e-9);
        assert!((est.pose.x - truth.x).abs() < 1e-9);
        assert!((est.pose.heading - truth.heading).abs() < 1e-9);
        assert_eq!(fiducial_ids(&frame), vec![1, 2]);
    }

    #[test]
    fn frame_shows_pose_at_capture_time() {
        let t = track();
        let cam = SimCamera::for_index(0, &t);
        let publish_us = 3_000_000;
        let est = decode_botpose(&cam.frame(&t, publish_us), publish_us).unwrap();

        assert!((est.timestamp_seconds - 2.975).abs() < 1e-9);
        let captured = t.pose_at(est.timestamp_seconds);
        assert!(est.pose.translation_distance(&captured) < 1e-9);
        // The robot has moved on by the time the frame is published.
        assert!(est.pose.translation_distance(&t.pose_at(3.0)) > 1e-3);
    }

    #[test]
    fn out_of_range_camera_reports_no_tags() {
        let cam = SimCamera {
            max_range: 1.0,
            ..SimCamera::for_index(1, &track())
        };
        let frame = cam.frame_of(Pose2d::new(0.5, 0.5, 0.0));
        let est = decode_botpose(&frame, 2_000_000).unwrap();
        assert!(!est.has_tags());
        assert!(fiducial_ids(&frame).is_empty());
    }

    #[test]
    fn schedule_runs_disabled_auto_teleop() {
        assert_eq!(mode_at(0), RobotMode::Disabled);
        assert_eq!(mode_at(DISABLED_CYCLES), RobotMode::Autonomous);
        assert_eq!(
            mode_at(DISABLED_CYCLES + AUTONOMOUS_CYCLES),
            RobotMode::Teleop
        );
    }

    #[test]
    fn odometry_overreports_and_unwraps_heading() {
        let from = Pose2d::new(1.0, 1.0, TAU - 0.05);
        let to = Pose2d::new(2.0, 1.0, 0.05);
        let (dx, dy, dh) = odometry_between(from, to);
        assert!((dx - ODOMETRY_SCALE_ERROR).abs() < 1e-12);
        assert_eq!(dy, 0.0);
        assert!((dh - 0.1).abs() < 1e-9);
    }
}
