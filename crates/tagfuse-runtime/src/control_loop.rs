//! [`ControlLoop`] – fixed-period robot loop driving the fusion engine.
//!
//! Each tick:
//!
//! 1. **Transition** – compares the requested [`RobotMode`] with the previous
//!    one and fires [`VisionFusionEngine::on_enable`] /
//!    [`VisionFusionEngine::on_disable`] on edges.
//! 2. **Execute** – runs one [`VisionFusionEngine::execute`] cycle against the
//!    owned drivetrain. This happens in every mode, disabled included, so a
//!    stationary robot re-seeds from the first good estimate.
//!
//! # Example
//!
//! ```rust
//! use tagfuse_hal::sim::{SimDrivetrain, SimPoseSource};
//! use tagfuse_perception::{FusionConfig, VisionFusionEngine};
//! use tagfuse_runtime::control_loop::{ControlLoop, RobotMode};
//! use tagfuse_types::Pose2d;
//!
//! let engine = VisionFusionEngine::new(FusionConfig::default())
//!     .expect("default config is valid")
//!     .with_source(Box::new(SimPoseSource::new("front")))
//!     .expect("unique source id");
//! let mut control = ControlLoop::new(SimDrivetrain::new(Pose2d::default()), engine);
//!
//! control.tick(RobotMode::Disabled);
//! control.tick(RobotMode::Autonomous);
//! assert_eq!(control.cycles(), 2);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tagfuse_hal::Drivetrain;
use tagfuse_perception::{CycleReport, FusionTelemetry, VisionFusionEngine};
use tracing::{debug, info, instrument, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Robot mode
// ─────────────────────────────────────────────────────────────────────────────

/// Driver-station mode for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotMode {
    #[default]
    Disabled,
    Autonomous,
    Teleop,
    Test,
}

impl RobotMode {
    pub fn is_enabled(self) -> bool {
        !matches!(self, RobotMode::Disabled)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ControlLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Owns a drivetrain and the fusion engine that feeds it.
pub struct ControlLoop<D: Drivetrain> {
    drivetrain: D,
    engine: VisionFusionEngine,
    last_mode: Option<RobotMode>,
    cycles: u64,
}

impl<D: Drivetrain> ControlLoop<D> {
    pub fn new(drivetrain: D, engine: VisionFusionEngine) -> Self {
        Self {
            drivetrain,
            engine,
            last_mode: None,
            cycles: 0,
        }
    }

    pub fn drivetrain(&self) -> &D {
        &self.drivetrain
    }

    /// Mutable drivetrain access, e.g. to apply odometry between ticks.
    pub fn drivetrain_mut(&mut self) -> &mut D {
        &mut self.drivetrain
    }

    pub fn engine(&self) -> &VisionFusionEngine {
        &self.engine
    }

    /// Number of completed ticks.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn mode(&self) -> Option<RobotMode> {
        self.last_mode
    }

    pub fn telemetry(&self) -> FusionTelemetry {
        self.engine.telemetry(&self.drivetrain)
    }

    /// Run one cycle in `mode`.
    #[instrument(level = "debug", skip(self), fields(cycle = self.cycles))]
    pub fn tick(&mut self, mode: RobotMode) -> CycleReport {
        match (self.last_mode, mode.is_enabled()) {
            // First tick: configure IMU modes for whichever state we start in.
            (None, true) => self.engine.on_enable(),
            (None, false) => self.engine.on_disable(),
            (Some(prev), true) if !prev.is_enabled() => self.engine.on_enable(),
            (Some(prev), false) if prev.is_enabled() => self.engine.on_disable(),
            _ => {}
        }
        if self.last_mode != Some(mode) {
            info!(from = ?self.last_mode, to = ?mode, "Robot mode changed");
        }
        self.last_mode = Some(mode);

        let report = self.engine.execute(&mut self.drivetrain);
        self.cycles += 1;
        report
    }

    /// Tick every `period` until `shutdown` is set or `mode_fn` returns
    /// `None`. `mode_fn` runs before each tick with full access to the loop.
    ///
    /// Returns the number of ticks run by this call.
    pub fn run<F>(&mut self, period: Duration, shutdown: &AtomicBool, mut mode_fn: F) -> u64
    where
        F: FnMut(&mut Self) -> Option<RobotMode>,
    {
        let start_cycles = self.cycles;
        info!(period_ms = period.as_millis() as u64, "Control loop started");

        while !shutdown.load(Ordering::SeqCst) {
            let started = Instant::now();
            let Some(mode) = mode_fn(self) else {
                break;
            };
            let report = self.tick(mode);
            debug!(
                fused = report.fused_count(),
                rejected = report.rejected_count(),
                "Cycle complete"
            );

            let elapsed = started.elapsed();
            match period.checked_sub(elapsed) {
                Some(remaining) => thread::sleep(remaining),
                None => warn!(
                    elapsed_ms = elapsed.as_secs_f64() * 1e3,
                    period_ms = period.as_secs_f64() * 1e3,
                    "Control loop overrun"
                ),
            }
        }

        let ran = self.cycles - start_cycles;
        info!(cycles = ran, "Control loop stopped");
        ran
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
