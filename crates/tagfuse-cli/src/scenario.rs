//! Scripted replays: a JSON file describing robot modes, odometry and what
//! each camera reported, cycle by cycle.
//!
//! ```json
//! {
//!   "initial_pose": { "x": 1.0, "y": 1.0 },
//!   "sources": ["front"],
//!   "cycles": [
//!     { "mode": "disabled",
//!       "estimates": { "front": { "pose": { "x": 2.0, "y": 2.0 },
//!                                  "tag_count": 2, "avg_tag_distance": 1.0,
//!                                  "timestamp_seconds": 0.5 } } },
//!     { "mode": "teleop", "odometry": { "dx": 0.05 } }
//!   ]
//! }
//! ```
//!
//! A source with no entry in a cycle keeps reporting its previous estimate,
//! the same as a camera whose tracker stopped producing frames.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tagfuse_hal::sim::SimDrivetrain;
use tagfuse_hal::{LatchHandle, LatchedPoseSource, OffsetClock};
use tagfuse_perception::{CycleReport, FusionTelemetry, VisionFusionEngine};
use tagfuse_runtime::{ControlLoop, RobotMode};
use tagfuse_types::{Pose2d, PoseEstimate, TagfuseError};

use crate::config::Config;

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct OdometryStep {
    #[serde(default)]
    pub dx: f64,
    #[serde(default)]
    pub dy: f64,
    #[serde(default)]
    pub dheading: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScenarioCycle {
    #[serde(default)]
    pub mode: RobotMode,
    #[serde(default)]
    pub odometry: Option<OdometryStep>,
    #[serde(default)]
    pub estimates: BTreeMap<String, PoseEstimate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub initial_pose: Pose2d,
    pub sources: Vec<String>,
    pub cycles: Vec<ScenarioCycle>,
}

impl Scenario {
    pub fn parse(raw: &str) -> Result<Self, TagfuseError> {
        let scenario: Scenario = serde_json::from_str(raw)
            .map_err(|e| TagfuseError::Scenario(format!("Failed to parse scenario: {e}")))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self, TagfuseError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            TagfuseError::Scenario(format!("Failed to read scenario at {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    fn validate(&self) -> Result<(), TagfuseError> {
        if self.sources.is_empty() {
            return Err(TagfuseError::Scenario("no sources declared".to_string()));
        }
        let mut declared = HashSet::new();
        for id in &self.sources {
            if !declared.insert(id.as_str()) {
                return Err(TagfuseError::Scenario(format!("source '{id}' declared twice")));
            }
        }
        for (i, cycle) in self.cycles.iter().enumerate() {
            let undeclared = cycle
                .estimates
                .keys()
                .find(|id| !declared.contains(id.as_str()));
            if let Some(unknown) = undeclared {
                return Err(TagfuseError::Scenario(format!(
                    "cycle {i}: estimate for undeclared source '{unknown}'"
                )));
            }
        }
        Ok(())
    }
}

/// Everything a replay produced.
#[derive(Debug)]
pub struct Replay {
    pub reports: Vec<CycleReport>,
    pub telemetry: FusionTelemetry,
    pub resets: usize,
    pub fusions: usize,
}

/// Run `scenario` through a [`ControlLoop`] over a [`SimDrivetrain`], using
/// the fusion tuning and clock offset from `config`.
pub fn replay(scenario: &Scenario, config: &Config) -> Result<Replay, TagfuseError> {
    let mut engine = VisionFusionEngine::new(config.fusion.clone())?
        .with_clock(Box::new(OffsetClock::new(config.clock_offset_seconds)));

    let mut handles: BTreeMap<&str, LatchHandle> = BTreeMap::new();
    for id in &scenario.sources {
        let (source, handle) = LatchedPoseSource::new(id.clone());
        engine.add_source(Box::new(source))?;
        handles.insert(id.as_str(), handle);
    }

    let mut control = ControlLoop::new(SimDrivetrain::new(scenario.initial_pose), engine);
    let mut reports = Vec::with_capacity(scenario.cycles.len());

    for cycle in &scenario.cycles {
        if let Some(step) = cycle.odometry {
            control
                .drivetrain_mut()
                .apply_odometry(step.dx, step.dy, step.dheading);
        }
        for (id, estimate) in &cycle.estimates {
            if let Some(handle) = handles.get(id.as_str()) {
                handle.publish(*estimate);
            }
        }
        reports.push(control.tick(cycle.mode));
    }

    Ok(Replay {
        reports,
        telemetry: control.telemetry(),
        resets: control.drivetrain().resets().len(),
        fusions: control.drivetrain().fusions().len(),
    })
}
