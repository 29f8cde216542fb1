//! Generic `PoseSource` trait for fiducial-tracking cameras.

use tagfuse_types::{ImuMode, PoseEstimate};

/// A camera or tracker that reports a field-relative robot pose.
///
/// The fusion engine only ever talks to this trait, so a tracker transport can
/// be swapped without touching validation or fusion logic.
pub trait PoseSource: Send {
    /// Stable identifier for this source, e.g. `"limelight-front"`.
    fn id(&self) -> &str;

    /// Push the robot's current heading (degrees, CCW positive) to the
    /// tracker's onboard localizer.
    ///
    /// Called once per cycle before [`latest_estimate`][Self::latest_estimate].
    /// The pushed heading affects the tracker's *next* frame.
    fn push_orientation(&mut self, heading_degrees: f64);

    /// Switch the tracker's IMU mode. Called on enable/disable transitions,
    /// not every cycle.
    fn set_imu_mode(&mut self, mode: ImuMode);

    /// Return the most recently latched estimate without blocking.
    ///
    /// The result may be stale: the same `timestamp_seconds` can be returned
    /// for several consecutive cycles when no new frame has arrived.
    fn latest_estimate(&mut self) -> PoseEstimate;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagfuse_types::Pose2d;

    struct MockSource {
        id: String,
        heading: Option<f64>,
        mode: ImuMode,
    }

    impl PoseSource for MockSource {
        fn id(&self) -> &str {
            &self.id
        }

        fn push_orientation(&mut self, heading_degrees: f64) {
            self.heading = Some(heading_degrees);
        }

        fn set_imu_mode(&mut self, mode: ImuMode) {
            self.mode = mode;
        }

        fn latest_estimate(&mut self) -> PoseEstimate {
            PoseEstimate {
                pose: Pose2d::new(1.0, 2.0, 0.0),
                tag_count: 1,
                avg_tag_distance: 1.5,
                timestamp_seconds: 3.0,
                ..PoseEstimate::default()
            }
        }
    }

    #[test]
    fn mock_source_through_trait_object() {
        let mut source: Box<dyn PoseSource> = Box::new(MockSource {
            id: "front".to_string(),
            heading: None,
            mode: ImuMode::ExternalOnly,
        });
        assert_eq!(source.id(), "front");
        source.push_orientation(90.0);
        source.set_imu_mode(ImuMode::InternalOnly);
        let est = source.latest_estimate();
        assert_eq!(est.tag_count, 1);
        assert!((est.pose.y - 2.0).abs() < 1e-9);
    }
}
