//! Dashboard feedback: per-source counters and a serializable snapshot of
//! the fusion engine.

use serde::Serialize;
use tagfuse_types::{EstimateOutcome, Pose2d, RejectReason};

use crate::freshness::SourceHealth;

/// How many estimates were dropped for each reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RejectionCounts {
    pub no_tags: u64,
    pub too_far: u64,
    pub out_of_bounds: u64,
    pub large_jump: u64,
}

impl RejectionCounts {
    fn bump(&mut self, reason: &RejectReason) {
        let slot = match reason {
            RejectReason::NoTags => &mut self.no_tags,
            RejectReason::TooFar { .. } => &mut self.too_far,
            RejectReason::OutOfBounds { .. } => &mut self.out_of_bounds,
            RejectReason::LargeJump { .. } => &mut self.large_jump,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u64 {
        self.no_tags + self.too_far + self.out_of_bounds + self.large_jump
    }
}

/// Running counters for one source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceStats {
    pub last_outcome: Option<&'static str>,
    pub seeded: u64,
    pub fused: u64,
    pub rejections: RejectionCounts,
}

impl SourceStats {
    pub fn record(&mut self, outcome: &EstimateOutcome) {
        self.last_outcome = Some(outcome.label());
        match outcome {
            EstimateOutcome::Seeded { .. } => self.seeded += 1,
            EstimateOutcome::Fused { .. } => self.fused += 1,
            EstimateOutcome::Rejected { reason } => self.rejections.bump(reason),
        }
    }
}

/// Snapshot of one source for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceTelemetry {
    pub id: String,
    pub health: SourceHealth,
    pub last_outcome: Option<&'static str>,
    pub seeded: u64,
    pub fused: u64,
    pub rejections: RejectionCounts,
}

/// Snapshot of the fusion engine and the drivetrain pose it feeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionTelemetry {
    pub pose_seeded: bool,
    pub last_accepted_pose: Option<Pose2d>,
    pub robot_pose: Pose2d,
    pub robot_yaw_degrees: f64,
    pub sources: Vec<SourceTelemetry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagfuse_types::StdDevs;

    #[test]
    fn stats_count_each_outcome() {
        let mut stats = SourceStats::default();
        stats.record(&EstimateOutcome::Rejected {
            reason: RejectReason::NoTags,
        });
        stats.record(&EstimateOutcome::Seeded {
            pose: Pose2d::default(),
        });
        stats.record(&EstimateOutcome::Fused {
            pose: Pose2d::default(),
            timestamp_seconds: 1.0,
            std_devs: StdDevs::translation_only(0.1),
        });
        stats.record(&EstimateOutcome::Rejected {
            reason: RejectReason::LargeJump {
                divergence: 3.0,
                limit: 2.0,
            },
        });
        assert_eq!(stats.seeded, 1);
        assert_eq!(stats.fused, 1);
        assert_eq!(stats.rejections.no_tags, 1);
        assert_eq!(stats.rejections.large_jump, 1);
        assert_eq!(stats.rejections.total(), 2);
        assert_eq!(stats.last_outcome, Some("large jump"));
    }

    #[test]
    fn telemetry_serializes_to_json() {
        let t = FusionTelemetry {
            pose_seeded: true,
            last_accepted_pose: Some(Pose2d::new(1.0, 2.0, 0.0)),
            robot_pose: Pose2d::new(1.0, 2.0, 0.0),
            robot_yaw_degrees: 0.0,
            sources: vec![SourceTelemetry {
                id: "front".to_string(),
                health: SourceHealth::Fresh,
                last_outcome: Some("fused"),
                seeded: 1,
                fused: 4,
                rejections: RejectionCounts::default(),
            }],
        };
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["pose_seeded"], true);
        assert_eq!(json["sources"][0]["health"], "fresh");
        assert_eq!(json["sources"][0]["fused"], 4);
    }
}
