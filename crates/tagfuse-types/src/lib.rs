use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Field-relative 2D rigid transform: translation in metres, heading in
/// radians measured counter-clockwise from +X.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2d {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub heading: f64,
}

impl Pose2d {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    /// Euclidean distance between the translation parts of two poses.
    pub fn translation_distance(&self, other: &Pose2d) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn heading_degrees(&self) -> f64 {
        self.heading.to_degrees()
    }
}

impl fmt::Display for Pose2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.1}°)",
            self.x,
            self.y,
            self.heading_degrees()
        )
    }
}

/// A single camera's localization result for one control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseEstimate {
    #[serde(default)]
    pub pose: Pose2d,
    /// Number of fiducial tags observed; 0 means no detection.
    #[serde(default)]
    pub tag_count: u32,
    /// Mean camera-to-tag distance in metres. Undefined when `tag_count == 0`.
    #[serde(default)]
    pub avg_tag_distance: f64,
    /// Capture time in the camera's own clock domain.
    #[serde(default)]
    pub timestamp_seconds: f64,
    /// Distance between the outermost observed tags (metres).
    #[serde(default)]
    pub tag_span: f64,
    /// Mean tag area as a percentage of the image.
    #[serde(default)]
    pub avg_tag_area: f64,
}

impl PoseEstimate {
    /// An estimate carrying no detection.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_tags(&self) -> bool {
        self.tag_count > 0
    }
}

/// Measurement standard deviations passed alongside a weighted correction.
///
/// Non-finite values serialize as the strings `"inf"`, `"-inf"` and `"nan"`,
/// since JSON numbers cannot carry them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StdDevs {
    #[serde(serialize_with = "serialize_std_dev")]
    pub x: f64,
    #[serde(serialize_with = "serialize_std_dev")]
    pub y: f64,
    #[serde(serialize_with = "serialize_std_dev")]
    pub heading: f64,
}

fn serialize_std_dev<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else if value.is_nan() {
        serializer.serialize_str("nan")
    } else if *value > 0.0 {
        serializer.serialize_str("inf")
    } else {
        serializer.serialize_str("-inf")
    }
}

impl StdDevs {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    /// Equal `x`/`y` uncertainty with heading left entirely to the gyro.
    pub fn translation_only(xy: f64) -> Self {
        Self::new(xy, xy, f64::INFINITY)
    }
}

impl fmt::Display for StdDevs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {})", self.x, self.y, self.heading)
    }
}

/// Orientation source used by the tracker's onboard localizer.
///
/// The raw integer values are the ones the device expects on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImuMode {
    /// Use only the orientation pushed by the robot every cycle.
    #[default]
    ExternalOnly,
    /// Use the pushed orientation and seed the internal IMU with it.
    SeedInternal,
    /// Use the internal IMU only.
    InternalOnly,
    /// Internal IMU, corrected by single-tag solves.
    InternalMt1Assist,
    /// Internal IMU, corrected towards the pushed orientation.
    InternalExternalAssist,
}

impl ImuMode {
    pub fn as_raw(self) -> i32 {
        match self {
            ImuMode::ExternalOnly => 0,
            ImuMode::SeedInternal => 1,
            ImuMode::InternalOnly => 2,
            ImuMode::InternalMt1Assist => 3,
            ImuMode::InternalExternalAssist => 4,
        }
    }
}

impl TryFrom<i32> for ImuMode {
    type Error = TagfuseError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(ImuMode::ExternalOnly),
            1 => Ok(ImuMode::SeedInternal),
            2 => Ok(ImuMode::InternalOnly),
            3 => Ok(ImuMode::InternalMt1Assist),
            4 => Ok(ImuMode::InternalExternalAssist),
            other => Err(TagfuseError::InvalidConfig(format!(
                "unknown IMU mode {other}"
            ))),
        }
    }
}

/// Why a pose estimate was dropped. Rejections are expected per-cycle
/// outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    NoTags,
    TooFar { avg_tag_distance: f64, threshold: f64 },
    OutOfBounds { x: f64, y: f64 },
    LargeJump { divergence: f64, limit: f64 },
}

impl RejectReason {
    pub const ALL_LABELS: [&'static str; 4] =
        ["no tags detected", "too far", "out of bounds", "large jump"];

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NoTags => "no tags detected",
            RejectReason::TooFar { .. } => "too far",
            RejectReason::OutOfBounds { .. } => "out of bounds",
            RejectReason::LargeJump { .. } => "large jump",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one source's estimate during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EstimateOutcome {
    /// First acceptable estimate of the session: drivetrain pose hard-reset.
    Seeded { pose: Pose2d },
    /// Weighted correction applied to the drivetrain estimate.
    Fused {
        pose: Pose2d,
        timestamp_seconds: f64,
        std_devs: StdDevs,
    },
    Rejected { reason: RejectReason },
}

impl EstimateOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            EstimateOutcome::Seeded { .. } => "seeded",
            EstimateOutcome::Fused { .. } => "fused",
            EstimateOutcome::Rejected { reason } => reason.as_str(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        !matches!(self, EstimateOutcome::Rejected { .. })
    }
}

/// Errors raised at the fallible edges of the system (configuration,
/// device decoding, scenario input). The fusion core itself never fails.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum TagfuseError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed botpose array: expected at least 11 values, got {len}")]
    MalformedBotpose { len: usize },

    #[error("Config Error: {0}")]
    Config(String),

    #[error("Scenario Error: {0}")]
    Scenario(String),
}
