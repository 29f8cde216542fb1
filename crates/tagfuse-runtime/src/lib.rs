//! `tagfuse-runtime` – the robot loop around the fusion engine.
//!
//! # Modules
//!
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]:
//!   owns a [`Drivetrain`][tagfuse_hal::Drivetrain] and a
//!   [`VisionFusionEngine`][tagfuse_perception::VisionFusionEngine], fires the
//!   enable/disable lifecycle hooks on [`RobotMode`][control_loop::RobotMode]
//!   transitions and paces ticks at a fixed period.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter. Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export.

pub mod control_loop;
pub mod telemetry;

pub use control_loop::{ControlLoop, RobotMode};
pub use telemetry::{TracerProviderGuard, init_tracing};
