//! `tagfuse-hal` – collaborator contracts and device adapters.
//!
//! Everything the fusion core talks to lives behind a trait here, so the
//! core can run against real trackers, a simulated robot, or test doubles.
//!
//! # Modules
//!
//! - [`pose_source`] – [`PoseSource`][pose_source::PoseSource]: one
//!   fiducial-tracking camera, polled once per cycle.
//! - [`drivetrain`] – [`Drivetrain`][drivetrain::Drivetrain]: the pose
//!   estimator owner that accepts hard resets and weighted corrections.
//! - [`clock`] – [`ClockSync`][clock::ClockSync]: maps camera capture
//!   timestamps into the control loop's clock domain.
//! - [`latched`] – [`LatchedPoseSource`][latched::LatchedPoseSource]: a
//!   source fed by a camera driver thread through a shared latch.
//! - [`botpose`] – decoder for the tracker's published botpose array.
//! - [`sim`] – scripted sources and a recording drivetrain for headless runs.

pub mod botpose;
pub mod clock;
pub mod drivetrain;
pub mod latched;
pub mod pose_source;
pub mod sim;

pub use clock::{ClockSync, IdentityClock, OffsetClock};
pub use drivetrain::Drivetrain;
pub use latched::{LatchHandle, LatchedPoseSource};
pub use pose_source::PoseSource;
