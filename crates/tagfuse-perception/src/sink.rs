//! Where the fusion engine reports what it did with each estimate.

use tagfuse_types::{Pose2d, RejectReason, StdDevs};
use tracing::{debug, info, warn};

/// Receives rejection, seed and fusion events from the engine.
///
/// Nothing in the engine depends on what a sink does with them.
pub trait FusionSink: Send {
    fn rejected(&mut self, source_id: &str, reason: &RejectReason);

    fn seeded(&mut self, source_id: &str, pose: Pose2d);

    fn fused(&mut self, _source_id: &str, _pose: Pose2d, _std_devs: StdDevs) {}
}

/// Default sink: structured `tracing` events.
///
/// Rejections are logged at `warn` with the values that triggered them, seeds
/// at `info`, fusions at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FusionSink for TracingSink {
    fn rejected(&mut self, source_id: &str, reason: &RejectReason) {
        match *reason {
            // Every idle cycle of a camera that sees nothing lands here.
            RejectReason::NoTags => {
                debug!(source = %source_id, reason = %reason, "Rejected vision estimate")
            }
            RejectReason::TooFar {
                avg_tag_distance,
                threshold,
            } => warn!(
                source = %source_id,
                reason = %reason,
                avg_tag_distance,
                threshold,
                "Rejected vision estimate"
            ),
            RejectReason::OutOfBounds { x, y } => warn!(
                source = %source_id,
                reason = %reason,
                x,
                y,
                "Rejected vision estimate"
            ),
            RejectReason::LargeJump { divergence, limit } => warn!(
                source = %source_id,
                reason = %reason,
                divergence,
                limit,
                "Rejected vision estimate"
            ),
        }
    }

    fn seeded(&mut self, source_id: &str, pose: Pose2d) {
        info!(
            source = %source_id,
            x = pose.x,
            y = pose.y,
            heading_deg = pose.heading_degrees(),
            "Pose seeded from vision"
        );
    }

    fn fused(&mut self, source_id: &str, pose: Pose2d, std_devs: StdDevs) {
        debug!(
            source = %source_id,
            x = pose.x,
            y = pose.y,
            xy_std_dev = std_devs.x,
            "Fused vision estimate"
        );
    }
}
