//! [`VisionFusionEngine`] – per-cycle vision fusion orchestrator.
//!
//! Each call to [`VisionFusionEngine::execute`]:
//!
//! 1. **Orient** – pushes the drivetrain's heading to every source, whatever
//!    happens later in the cycle.
//! 2. **Poll** – reads each source's latched estimate, in registration order.
//! 3. **Validate** – runs the estimate through the
//!    [`ValidationPipeline`].
//! 4. **Apply** – the first acceptable estimate of a session hard-resets the
//!    drivetrain pose; later ones are fused with distance-weighted std devs.
//!
//! Rejections are reported to the [`FusionSink`] and dropped. They never stop
//! other sources from being processed and are never raised as errors.
//!
//! # Example
//!
//! ```rust
//! use tagfuse_hal::sim::{SimDrivetrain, SimPoseSource};
//! use tagfuse_perception::{FusionConfig, VisionFusionEngine};
//! use tagfuse_types::{Pose2d, PoseEstimate};
//!
//! let source = SimPoseSource::new("front").with_estimate(PoseEstimate {
//!     pose: Pose2d::new(2.0, 2.0, 0.1),
//!     tag_count: 3,
//!     avg_tag_distance: 1.0,
//!     timestamp_seconds: 1.0,
//!     ..PoseEstimate::default()
//! });
//!
//! let mut engine = VisionFusionEngine::new(FusionConfig::default())
//!     .expect("default config is valid")
//!     .with_source(Box::new(source))
//!     .expect("unique source id");
//! let mut drivetrain = SimDrivetrain::new(Pose2d::default());
//!
//! let report = engine.execute(&mut drivetrain);
//! assert!(engine.state().pose_seeded());
//! assert_eq!(report.seeded_by(), Some("front"));
//! assert_eq!(drivetrain.resets(), &[Pose2d::new(2.0, 2.0, 0.1)]);
//! ```

use serde::Serialize;
use tagfuse_hal::{ClockSync, Drivetrain, IdentityClock, PoseSource};
use tagfuse_types::{EstimateOutcome, TagfuseError};
use tracing::{debug, info};

use crate::config::FusionConfig;
use crate::feedback::{FusionTelemetry, SourceStats, SourceTelemetry};
use crate::freshness::FrameFreshness;
use crate::sink::{FusionSink, TracingSink};
use crate::state::FusionState;
use crate::validation::{ValidationPipeline, Verdict};

// ─────────────────────────────────────────────────────────────────────────────
// Cycle report
// ─────────────────────────────────────────────────────────────────────────────

/// One source's outcome within a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOutcome {
    pub source_id: String,
    #[serde(flatten)]
    pub outcome: EstimateOutcome,
}

/// Everything that happened during one [`VisionFusionEngine::execute`] call,
/// in source registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub outcomes: Vec<SourceOutcome>,
}

impl CycleReport {
    pub fn outcome_for(&self, source_id: &str) -> Option<&EstimateOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.source_id == source_id)
            .map(|o| &o.outcome)
    }

    /// The source that seeded localization this cycle, if any.
    pub fn seeded_by(&self) -> Option<&str> {
        self.outcomes
            .iter()
            .find(|o| matches!(o.outcome, EstimateOutcome::Seeded { .. }))
            .map(|o| o.source_id.as_str())
    }

    pub fn fused_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, EstimateOutcome::Fused { .. }))
            .count()
    }

    pub fn rejected_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !o.outcome.is_accepted())
            .count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

struct RegisteredSource {
    source: Box<dyn PoseSource>,
    freshness: FrameFreshness,
    stats: SourceStats,
}

/// Fuses vision pose estimates from any number of sources into a drivetrain's
/// pose estimate.
///
/// Construct with [`VisionFusionEngine::new`], register sources, then call
/// [`execute`][Self::execute] once per control cycle. Call
/// [`on_disable`][Self::on_disable] / [`on_enable`][Self::on_enable] on robot
/// mode transitions.
pub struct VisionFusionEngine {
    config: FusionConfig,
    pipeline: ValidationPipeline,
    state: FusionState,
    sources: Vec<RegisteredSource>,
    clock: Box<dyn ClockSync>,
    sink: Box<dyn FusionSink>,
}

impl VisionFusionEngine {
    /// Create an engine with no sources, an identity clock and a
    /// [`TracingSink`].
    ///
    /// # Errors
    ///
    /// Returns [`TagfuseError::InvalidConfig`] when `config` fails
    /// [`FusionConfig::validate`].
    pub fn new(config: FusionConfig) -> Result<Self, TagfuseError> {
        config.validate()?;
        Ok(Self {
            pipeline: ValidationPipeline::from_config(&config),
            config,
            state: FusionState::new(),
            sources: Vec::new(),
            clock: Box::new(IdentityClock),
            sink: Box::new(TracingSink),
        })
    }

    /// Replace the clock used to translate camera timestamps.
    pub fn with_clock(mut self, clock: Box<dyn ClockSync>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the event sink.
    pub fn with_sink(mut self, sink: Box<dyn FusionSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Builder form of [`add_source`][Self::add_source].
    ///
    /// # Errors
    ///
    /// See [`add_source`][Self::add_source].
    pub fn with_source(mut self, source: Box<dyn PoseSource>) -> Result<Self, TagfuseError> {
        self.add_source(source)?;
        Ok(self)
    }

    /// Register a source. Sources are processed in registration order every
    /// cycle; the order never changes afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`TagfuseError::InvalidConfig`] when a source with the same id
    /// is already registered.
    pub fn add_source(&mut self, source: Box<dyn PoseSource>) -> Result<(), TagfuseError> {
        if self.sources.iter().any(|s| s.source.id() == source.id()) {
            return Err(TagfuseError::InvalidConfig(format!(
                "pose source '{}' is already registered",
                source.id()
            )));
        }
        debug!(source = %source.id(), "Registered pose source");
        self.sources.push(RegisteredSource {
            source,
            freshness: FrameFreshness::new(self.config.stale_after_cycles),
            stats: SourceStats::default(),
        });
        Ok(())
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn state(&self) -> &FusionState {
        &self.state
    }

    /// Source ids in processing order.
    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.source.id()).collect()
    }

    /// Robot enabled: switch every source to the enabled IMU mode.
    pub fn on_enable(&mut self) {
        let mode = self.config.enabled_imu_mode;
        for entry in &mut self.sources {
            entry.source.set_imu_mode(mode);
        }
        info!(imu_mode = ?mode, "Vision enabled");
    }

    /// Robot disabled: the robot is stationary, so localization may be
    /// hard-reset again by the next acceptable estimate.
    pub fn on_disable(&mut self) {
        self.state.unseed();
        let mode = self.config.disabled_imu_mode;
        for entry in &mut self.sources {
            entry.source.set_imu_mode(mode);
        }
        info!(imu_mode = ?mode, "Vision disabled; pose seed cleared");
    }

    /// Run one control cycle against `drivetrain`.
    pub fn execute<D: Drivetrain + ?Sized>(&mut self, drivetrain: &mut D) -> CycleReport {
        let heading_degrees = drivetrain.current_pose().heading_degrees();
        for entry in &mut self.sources {
            entry.source.push_orientation(heading_degrees);
        }

        let mut report = CycleReport {
            outcomes: Vec::with_capacity(self.sources.len()),
        };

        for entry in &mut self.sources {
            let estimate = entry.source.latest_estimate();
            entry.freshness.observe(&estimate);
            let source_id = entry.source.id();

            // Read per source: an earlier source may have just moved the pose.
            let current = drivetrain.current_pose();
            let outcome = match self
                .pipeline
                .evaluate(&estimate, self.state.pose_seeded(), &current)
            {
                Verdict::Reject(reason) => {
                    self.sink.rejected(source_id, &reason);
                    EstimateOutcome::Rejected { reason }
                }
                Verdict::Seed => {
                    drivetrain.reset_pose(estimate.pose);
                    self.state.seed(estimate.pose);
                    self.sink.seeded(source_id, estimate.pose);
                    EstimateOutcome::Seeded {
                        pose: estimate.pose,
                    }
                }
                Verdict::Fuse(std_devs) => {
                    let timestamp_seconds = self.clock.to_local_time(estimate.timestamp_seconds);
                    drivetrain.fuse_measurement(estimate.pose, timestamp_seconds, std_devs);
                    self.state.record_fused(estimate.pose);
                    self.sink.fused(source_id, estimate.pose, std_devs);
                    EstimateOutcome::Fused {
                        pose: estimate.pose,
                        timestamp_seconds,
                        std_devs,
                    }
                }
            };

            entry.stats.record(&outcome);
            report.outcomes.push(SourceOutcome {
                source_id: source_id.to_string(),
                outcome,
            });
        }

        report
    }

    /// Snapshot for dashboards.
    pub fn telemetry<D: Drivetrain + ?Sized>(&self, drivetrain: &D) -> FusionTelemetry {
        let robot_pose = drivetrain.current_pose();
        FusionTelemetry {
            pose_seeded: self.state.pose_seeded(),
            last_accepted_pose: self.state.last_accepted_pose(),
            robot_pose,
            robot_yaw_degrees: robot_pose.heading_degrees(),
            sources: self
                .sources
                .iter()
                .map(|entry| SourceTelemetry {
                    id: entry.source.id().to_string(),
                    health: entry.freshness.health(),
                    last_outcome: entry.stats.last_outcome,
                    seeded: entry.stats.seeded,
                    fused: entry.stats.fused,
                    rejections: entry.stats.rejections,
                })
                .collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
