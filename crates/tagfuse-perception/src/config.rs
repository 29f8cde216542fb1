//! Static fusion tuning.

use serde::{Deserialize, Serialize};
use tagfuse_types::{ImuMode, TagfuseError};

/// Axis-aligned field rectangle in metres. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl FieldBounds {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

impl Default for FieldBounds {
    fn default() -> Self {
        Self::new(0.0, 16.54, 0.0, 8.07)
    }
}

/// Per-deployment fusion tuning. Never mutated once the engine owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Estimates whose mean tag distance exceeds this (metres) are dropped.
    #[serde(default = "default_avg_tag_distance_threshold")]
    pub avg_tag_distance_threshold: f64,

    /// Once seeded, estimates further than this (metres) from the drivetrain
    /// pose are dropped.
    #[serde(default = "default_max_divergence_from_odometry")]
    pub max_divergence_from_odometry: f64,

    /// IMU mode pushed to every source when the robot is enabled.
    #[serde(default = "default_enabled_imu_mode")]
    pub enabled_imu_mode: ImuMode,

    /// IMU mode pushed to every source when the robot is disabled.
    #[serde(default = "default_disabled_imu_mode")]
    pub disabled_imu_mode: ImuMode,

    /// Consecutive cycles with an unchanged timestamp before a source is
    /// reported stale.
    #[serde(default = "default_stale_after_cycles")]
    pub stale_after_cycles: u32,

    /// Estimates outside this rectangle are dropped.
    #[serde(default)]
    pub field_bounds: FieldBounds,
}

fn default_avg_tag_distance_threshold() -> f64 {
    4.0
}
fn default_max_divergence_from_odometry() -> f64 {
    2.0
}
fn default_enabled_imu_mode() -> ImuMode {
    ImuMode::InternalOnly
}
fn default_disabled_imu_mode() -> ImuMode {
    ImuMode::SeedInternal
}
fn default_stale_after_cycles() -> u32 {
    10
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            avg_tag_distance_threshold: default_avg_tag_distance_threshold(),
            field_bounds: FieldBounds::default(),
            max_divergence_from_odometry: default_max_divergence_from_odometry(),
            enabled_imu_mode: default_enabled_imu_mode(),
            disabled_imu_mode: default_disabled_imu_mode(),
            stale_after_cycles: default_stale_after_cycles(),
        }
    }
}

impl FusionConfig {
    /// Check the invariants every other component relies on.
    ///
    /// # Errors
    ///
    /// Returns [`TagfuseError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), TagfuseError> {
        positive("avg_tag_distance_threshold", self.avg_tag_distance_threshold)?;
        positive(
            "max_divergence_from_odometry",
            self.max_divergence_from_odometry,
        )?;

        let b = &self.field_bounds;
        for (name, v) in [
            ("field_bounds.x_min", b.x_min),
            ("field_bounds.x_max", b.x_max),
            ("field_bounds.y_min", b.y_min),
            ("field_bounds.y_max", b.y_max),
        ] {
            if !v.is_finite() {
                return Err(TagfuseError::InvalidConfig(format!("{name} must be finite")));
            }
        }
        if b.x_min >= b.x_max {
            return Err(TagfuseError::InvalidConfig(format!(
                "field_bounds.x_min ({}) must be below x_max ({})",
                b.x_min, b.x_max
            )));
        }
        if b.y_min >= b.y_max {
            return Err(TagfuseError::InvalidConfig(format!(
                "field_bounds.y_min ({}) must be below y_max ({})",
                b.y_min, b.y_max
            )));
        }
        if self.stale_after_cycles == 0 {
            return Err(TagfuseError::InvalidConfig(
                "stale_after_cycles must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<(), TagfuseError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TagfuseError::InvalidConfig(format!(
            "{name} must be a positive finite number, got {value}"
        )))
    }
}
