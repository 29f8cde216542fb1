//! [`LatchedPoseSource`] – a pose source fed by an asynchronous camera driver.
//!
//! The camera's capture pipeline runs on its own thread and publishes each
//! decoded frame through a [`LatchHandle`]. The control loop polls the
//! [`LatchedPoseSource`] side, which never blocks: when the latch is momentarily
//! held by the driver, the source returns the copy it saw last and queues
//! orientation / IMU-mode pushes until the next successful poll.
//!
//! # Example
//!
//! ```rust
//! use tagfuse_hal::{LatchedPoseSource, PoseSource};
//! use tagfuse_types::{Pose2d, PoseEstimate};
//!
//! let (mut source, handle) = LatchedPoseSource::new("limelight-front");
//!
//! // Driver thread side.
//! handle.publish(PoseEstimate {
//!     pose: Pose2d::new(2.0, 3.0, 0.0),
//!     tag_count: 2,
//!     avg_tag_distance: 1.2,
//!     timestamp_seconds: 10.0,
//!     ..PoseEstimate::default()
//! });
//!
//! // Control loop side.
//! source.push_orientation(45.0);
//! assert_eq!(source.latest_estimate().tag_count, 2);
//! assert_eq!(handle.orientation_degrees(), Some(45.0));
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use tagfuse_types::{ImuMode, PoseEstimate, TagfuseError};
use tracing::trace;

use crate::botpose::decode_botpose;
use crate::pose_source::PoseSource;

#[derive(Debug, Default)]
struct Latch {
    estimate: PoseEstimate,
    orientation_degrees: Option<f64>,
    imu_mode: Option<ImuMode>,
    frames_published: u64,
}

/// Control-loop side of a latched camera.
pub struct LatchedPoseSource {
    id: String,
    latch: Arc<Mutex<Latch>>,
    last_seen: PoseEstimate,
    pending_orientation: Option<f64>,
    pending_imu_mode: Option<ImuMode>,
}

/// Driver side of a latched camera. Cheap to clone and `Send`.
#[derive(Clone)]
pub struct LatchHandle {
    latch: Arc<Mutex<Latch>>,
}

impl LatchedPoseSource {
    /// Create a source and the handle its camera driver publishes through.
    ///
    /// Until the first frame is published the source reports an estimate with
    /// no tags.
    pub fn new(id: impl Into<String>) -> (Self, LatchHandle) {
        let latch = Arc::new(Mutex::new(Latch::default()));
        let source = Self {
            id: id.into(),
            latch: latch.clone(),
            last_seen: PoseEstimate::empty(),
            pending_orientation: None,
            pending_imu_mode: None,
        };
        (source, LatchHandle { latch })
    }

    fn flush_pending(&mut self, latch: &mut Latch) {
        if let Some(heading) = self.pending_orientation.take() {
            latch.orientation_degrees = Some(heading);
        }
        if let Some(mode) = self.pending_imu_mode.take() {
            latch.imu_mode = Some(mode);
        }
    }

    fn sync(&mut self) {
        let latch = self.latch.clone();
        let Some(mut guard) = latch.try_lock() else {
            trace!(source = %self.id, "latch busy; using cached estimate");
            return;
        };
        self.flush_pending(&mut guard);
        self.last_seen = guard.estimate;
    }
}

impl PoseSource for LatchedPoseSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn push_orientation(&mut self, heading_degrees: f64) {
        self.pending_orientation = Some(heading_degrees);
        let latch = self.latch.clone();
        if let Some(mut guard) = latch.try_lock() {
            self.flush_pending(&mut guard);
        }
    }

    fn set_imu_mode(&mut self, mode: ImuMode) {
        self.pending_imu_mode = Some(mode);
        let latch = self.latch.clone();
        if let Some(mut guard) = latch.try_lock() {
            self.flush_pending(&mut guard);
        }
    }

    fn latest_estimate(&mut self) -> PoseEstimate {
        self.sync();
        self.last_seen
    }
}

impl LatchHandle {
    /// Latch a freshly decoded estimate, replacing the previous one.
    pub fn publish(&self, estimate: PoseEstimate) {
        let mut guard = self.latch.lock();
        guard.estimate = estimate;
        guard.frames_published += 1;
    }

    /// Decode and latch a raw botpose array.
    ///
    /// # Errors
    ///
    /// Returns [`TagfuseError::MalformedBotpose`] for short arrays; the
    /// previously latched estimate is kept.
    pub fn publish_botpose(
        &self,
        values: &[f64],
        publish_time_us: i64,
    ) -> Result<(), TagfuseError> {
        let estimate = decode_botpose(values, publish_time_us)?;
        self.publish(estimate);
        Ok(())
    }

    /// Most recent heading pushed by the control loop, for forwarding to the
    /// device.
    pub fn orientation_degrees(&self) -> Option<f64> {
        self.latch.lock().orientation_degrees
    }

    /// Most recent IMU mode requested by the control loop.
    pub fn imu_mode(&self) -> Option<ImuMode> {
        self.latch.lock().imu_mode
    }

    pub fn frames_published(&self) -> u64 {
        self.latch.lock().frames_published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagfuse_types::Pose2d;

    fn estimate(ts: f64) -> PoseEstimate {
        PoseEstimate {
            pose: Pose2d::new(1.0, 1.0, 0.0),
            tag_count: 1,
            avg_tag_distance: 2.0,
            timestamp_seconds: ts,
            ..PoseEstimate::default()
        }
    }

    #[test]
    fn empty_until_first_publish() {
        let (mut source, _handle) = LatchedPoseSource::new("cam");
        assert_eq!(source.latest_estimate().tag_count, 0);
    }

    #[test]
    fn latest_publish_wins_and_repeats_when_stale() {
        let (mut source, handle) = LatchedPoseSource::new("cam");
        handle.publish(estimate(1.0));
        handle.publish(estimate(2.0));
        assert_eq!(source.latest_estimate().timestamp_seconds, 2.0);
        assert_eq!(source.latest_estimate().timestamp_seconds, 2.0);
        assert_eq!(handle.frames_published(), 2);
    }

    #[test]
    fn pushes_reach_the_driver() {
        let (mut source, handle) = LatchedPoseSource::new("cam");
        assert_eq!(handle.orientation_degrees(), None);
        source.push_orientation(-30.0);
        source.set_imu_mode(ImuMode::SeedInternal);
        assert_eq!(handle.orientation_degrees(), Some(-30.0));
        assert_eq!(handle.imu_mode(), Some(ImuMode::SeedInternal));
    }

    #[test]
    fn busy_latch_returns_cached_copy_and_defers_pushes() {
        let (mut source, handle) = LatchedPoseSource::new("cam");
        handle.publish(estimate(1.0));
        assert_eq!(source.latest_estimate().timestamp_seconds, 1.0);

        {
            let mut guard = handle.latch.lock();
            guard.estimate = estimate(5.0);
            // Latch is held: the poll must not block.
            assert_eq!(source.latest_estimate().timestamp_seconds, 1.0);
            source.push_orientation(12.0);
            assert_eq!(guard.orientation_degrees, None);
        }

        assert_eq!(source.latest_estimate().timestamp_seconds, 5.0);
        assert_eq!(handle.orientation_degrees(), Some(12.0));
    }

    #[test]
    fn driver_panic_leaves_latch_usable() {
        let (mut source, handle) = LatchedPoseSource::new("cam");
        let crashed = handle.clone();
        let result = std::thread::spawn(move || {
            let _guard = crashed.latch.lock();
            panic!("driver crashed mid-publish");
        })
        .join();
        assert!(result.is_err());

        handle.publish(estimate(3.0));
        source.push_orientation(8.0);
        assert_eq!(source.latest_estimate().timestamp_seconds, 3.0);
        assert_eq!(handle.orientation_degrees(), Some(8.0));
    }

    #[test]
    fn malformed_botpose_keeps_previous_estimate() {
        let (mut source, handle) = LatchedPoseSource::new("cam");
        handle.publish(estimate(1.0));
        assert!(handle.publish_botpose(&[0.0; 4], 0).is_err());
        assert_eq!(source.latest_estimate().timestamp_seconds, 1.0);
    }

    #[test]
    fn handle_works_across_threads() {
        let (mut source, handle) = LatchedPoseSource::new("cam");
        let driver = std::thread::spawn(move || {
            handle.publish(estimate(7.0));
        });
        driver.join().unwrap();
        assert_eq!(source.latest_estimate().timestamp_seconds, 7.0);
    }
}
