//! [`ValidationPipeline`] – ordered rejection rules for pose estimates.
//!
//! Every estimate is passed through [`ValidationPipeline::evaluate`]. Rules run
//! in a fixed order and the first one that fails decides the outcome:
//!
//! 1. [`NoTagsRule`] – nothing was detected. Runs first because distance and
//!    pose fields are undefined without a detection.
//! 2. [`TagDistanceRule`] – tags were too far away to trust.
//! 3. [`FieldBoundsRule`] – the pose lies outside the field.
//! 4. Unseeded sessions accept the estimate as a seed here.
//! 5. [`DivergenceRule`] – the pose jumped too far from odometry.
//!
//! Anything left is a fusion update weighted by [`xy_std_dev`].

use tagfuse_types::{Pose2d, PoseEstimate, RejectReason, StdDevs};

use crate::config::{FieldBounds, FusionConfig};

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// A single check an estimate must pass.
pub trait EstimateRule: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Return `Ok(())` when the estimate passes, or the reason it is dropped.
    /// `current` is the drivetrain's pose at the time of the check.
    fn check(&self, estimate: &PoseEstimate, current: &Pose2d) -> Result<(), RejectReason>;
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

/// Rejects estimates that saw no tags.
pub struct NoTagsRule;

impl EstimateRule for NoTagsRule {
    fn name(&self) -> &str {
        "no_tags"
    }

    fn check(&self, estimate: &PoseEstimate, _current: &Pose2d) -> Result<(), RejectReason> {
        if estimate.tag_count == 0 {
            return Err(RejectReason::NoTags);
        }
        Ok(())
    }
}

/// Rejects estimates whose mean tag distance exceeds `threshold` metres.
pub struct TagDistanceRule {
    pub threshold: f64,
}

impl EstimateRule for TagDistanceRule {
    fn name(&self) -> &str {
        "tag_distance"
    }

    fn check(&self, estimate: &PoseEstimate, _current: &Pose2d) -> Result<(), RejectReason> {
        // NaN distances fail too.
        if !(estimate.avg_tag_distance <= self.threshold) {
            return Err(RejectReason::TooFar {
                avg_tag_distance: estimate.avg_tag_distance,
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

/// Rejects estimates whose translation lies outside the field.
pub struct FieldBoundsRule {
    pub bounds: FieldBounds,
}

impl EstimateRule for FieldBoundsRule {
    fn name(&self) -> &str {
        "field_bounds"
    }

    fn check(&self, estimate: &PoseEstimate, _current: &Pose2d) -> Result<(), RejectReason> {
        let (x, y) = (estimate.pose.x, estimate.pose.y);
        if !self.bounds.contains(x, y) {
            return Err(RejectReason::OutOfBounds { x, y });
        }
        Ok(())
    }
}

/// Rejects estimates further than `limit` metres from the drivetrain pose.
pub struct DivergenceRule {
    pub limit: f64,
}

impl EstimateRule for DivergenceRule {
    fn name(&self) -> &str {
        "divergence"
    }

    fn check(&self, estimate: &PoseEstimate, current: &Pose2d) -> Result<(), RejectReason> {
        let divergence = current.translation_distance(&estimate.pose);
        if !(divergence <= self.limit) {
            return Err(RejectReason::LargeJump {
                divergence,
                limit: self.limit,
            });
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Std-dev model
// ────────────────────────────────────────────────────────────────────────────

/// Translation std dev for an accepted estimate: grows with the square of the
/// mean tag distance and shrinks with the number of tags seen.
///
/// `tag_count` must be non-zero; the pipeline guarantees that.
pub fn xy_std_dev(avg_tag_distance: f64, tag_count: u32) -> f64 {
    avg_tag_distance * avg_tag_distance / f64::from(tag_count)
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Result of validating one estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Reject(RejectReason),
    /// Passed the pre-seed rules while unseeded: hard-reset the drivetrain.
    Seed,
    /// Passed every rule while seeded: apply a weighted correction.
    Fuse(StdDevs),
}

/// The fixed-order rule chain built from a [`FusionConfig`].
pub struct ValidationPipeline {
    pre_seed: Vec<Box<dyn EstimateRule>>,
    post_seed: Vec<Box<dyn EstimateRule>>,
}

impl ValidationPipeline {
    pub fn from_config(config: &FusionConfig) -> Self {
        Self {
            pre_seed: vec![
                Box::new(NoTagsRule),
                Box::new(TagDistanceRule {
                    threshold: config.avg_tag_distance_threshold,
                }),
                Box::new(FieldBoundsRule {
                    bounds: config.field_bounds,
                }),
            ],
            post_seed: vec![Box::new(DivergenceRule {
                limit: config.max_divergence_from_odometry,
            })],
        }
    }

    /// Validate `estimate` given whether the session is seeded and the
    /// drivetrain's current pose. Later rules are never evaluated once an
    /// earlier one rejects.
    pub fn evaluate(
        &self,
        estimate: &PoseEstimate,
        pose_seeded: bool,
        current: &Pose2d,
    ) -> Verdict {
        if let Err(reason) = run(&self.pre_seed, estimate, current) {
            return Verdict::Reject(reason);
        }
        if !pose_seeded {
            return Verdict::Seed;
        }
        if let Err(reason) = run(&self.post_seed, estimate, current) {
            return Verdict::Reject(reason);
        }
        Verdict::Fuse(StdDevs::translation_only(xy_std_dev(
            estimate.avg_tag_distance,
            estimate.tag_count,
        )))
    }

    /// Rule names in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.pre_seed
            .iter()
            .chain(self.post_seed.iter())
            .map(|r| r.name())
            .collect()
    }
}

fn run(
    rules: &[Box<dyn EstimateRule>],
    estimate: &PoseEstimate,
    current: &Pose2d,
) -> Result<(), RejectReason> {
    for rule in rules {
        rule.check(estimate, current)?;
    }
    Ok(())
}
