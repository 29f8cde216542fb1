//! `tagfuse-perception` – vision-assisted pose estimation.
//!
//! Turns camera-reported robot poses into corrections of the drivetrain's
//! running pose estimate, dropping the ones that cannot be trusted.
//!
//! # Modules
//!
//! - [`config`] – [`FusionConfig`][config::FusionConfig]: per-deployment
//!   tuning (distance threshold, field bounds, divergence limit, IMU modes).
//! - [`state`] – [`FusionState`][state::FusionState]: whether localization
//!   has been seeded this session.
//! - [`validation`] – [`ValidationPipeline`][validation::ValidationPipeline]:
//!   the ordered rejection rules and the distance-dependent std-dev model.
//! - [`engine`] – [`VisionFusionEngine`][engine::VisionFusionEngine]: the
//!   per-cycle orchestrator that orients, polls, validates and fuses.
//! - [`sink`] – [`FusionSink`][sink::FusionSink]: where rejections and seed
//!   events are reported; [`TracingSink`][sink::TracingSink] by default.
//! - [`freshness`] – [`FrameFreshness`][freshness::FrameFreshness]: detects
//!   sources whose frames stopped changing.
//! - [`feedback`] – [`FusionTelemetry`][feedback::FusionTelemetry]: a
//!   serializable snapshot for dashboards.

pub mod config;
pub mod engine;
pub mod feedback;
pub mod freshness;
pub mod sink;
pub mod state;
pub mod validation;

pub use config::{FieldBounds, FusionConfig};
pub use engine::{CycleReport, SourceOutcome, VisionFusionEngine};
pub use feedback::{FusionTelemetry, SourceTelemetry};
pub use freshness::{FrameFreshness, SourceHealth};
pub use sink::{FusionSink, TracingSink};
pub use state::FusionState;
pub use validation::{ValidationPipeline, Verdict, xy_std_dev};
