//! Deployment config – reads/writes `tagfuse.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tagfuse_perception::FusionConfig;
use tagfuse_types::TagfuseError;

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "tagfuse.toml";

/// Persisted deployment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Control loop period in milliseconds.
    #[serde(default = "default_loop_period_ms")]
    pub loop_period_ms: u64,

    /// Added to camera timestamps to express them on the robot clock.
    #[serde(default)]
    pub clock_offset_seconds: f64,

    /// Pose source ids, in processing order.
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    #[serde(default)]
    pub fusion: FusionConfig,
}

fn default_loop_period_ms() -> u64 {
    20
}
fn default_sources() -> Vec<String> {
    vec!["limelight-front".to_string(), "limelight-back".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loop_period_ms: default_loop_period_ms(),
            clock_offset_seconds: 0.0,
            sources: default_sources(),
            fusion: FusionConfig::default(),
        }
    }
}

impl Config {
    /// Check everything the control loop relies on.
    pub fn validate(&self) -> Result<(), TagfuseError> {
        if self.loop_period_ms == 0 {
            return Err(TagfuseError::InvalidConfig(
                "loop_period_ms must be greater than zero".to_string(),
            ));
        }
        if !self.clock_offset_seconds.is_finite() {
            return Err(TagfuseError::InvalidConfig(
                "clock_offset_seconds must be finite".to_string(),
            ));
        }
        if self.sources.is_empty() {
            return Err(TagfuseError::InvalidConfig(
                "at least one pose source must be configured".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for id in &self.sources {
            if !seen.insert(id.as_str()) {
                return Err(TagfuseError::InvalidConfig(format!(
                    "pose source '{id}' is listed twice"
                )));
            }
        }
        self.fusion.validate()
    }
}

/// `--config` value, or `./tagfuse.toml`.
pub fn resolve_path(explicit: Option<&str>) -> PathBuf {
    explicit
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load, apply `TAGFUSE_*` overrides and validate. A missing file yields the
/// defaults.
pub fn load_from(path: &Path) -> Result<Config, TagfuseError> {
    let mut cfg = if path.exists() {
        let raw = fs::read_to_string(path).map_err(|e| {
            TagfuseError::Config(format!("Failed to read config at {}: {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| TagfuseError::Config(format!("Failed to parse config: {e}")))?
    } else {
        Config::default()
    };
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Apply `TAGFUSE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `TAGFUSE_LOOP_PERIOD_MS` | `loop_period_ms` |
/// | `TAGFUSE_MAX_TAG_DISTANCE` | `fusion.avg_tag_distance_threshold` |
/// | `TAGFUSE_MAX_DIVERGENCE` | `fusion.max_divergence_from_odometry` |
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

/// Same as [`apply_env_overrides`] with an injectable lookup. Unparsable
/// values are ignored.
pub(crate) fn apply_overrides<F>(cfg: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("TAGFUSE_LOOP_PERIOD_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.loop_period_ms = ms;
    }
    if let Some(v) = lookup("TAGFUSE_MAX_TAG_DISTANCE")
        && let Ok(m) = v.trim().parse::<f64>()
    {
        cfg.fusion.avg_tag_distance_threshold = m;
    }
    if let Some(v) = lookup("TAGFUSE_MAX_DIVERGENCE")
        && let Ok(m) = v.trim().parse::<f64>()
    {
        cfg.fusion.max_divergence_from_odometry = m;
    }
}

/// Write `cfg` as TOML, creating parent directories as needed.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), TagfuseError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            TagfuseError::Config(format!("Failed to create config directory: {e}"))
        })?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| TagfuseError::Config(format!("Failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| {
        TagfuseError::Config(format!("Failed to write config at {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagfuse_types::ImuMode;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let cfg = load_from(&dir.path().join("tagfuse.toml")).expect("defaults");
        assert_eq!(cfg.loop_period_ms, 20);
        assert_eq!(cfg.sources, vec!["limelight-front", "limelight-back"]);
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("nested").join("tagfuse.toml");
        save_to(&Config::default(), &path).expect("save");
        let raw = std::fs::read_to_string(&path).expect("read back");
        let loaded: Config = toml::from_str(&raw).expect("parse");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("tagfuse.toml");
        std::fs::write(
            &path,
            r#"
sources = ["front"]

[fusion]
avg_tag_distance_threshold = 3.0
enabled_imu_mode = "internal_external_assist"

[fusion.field_bounds]
x_min = 0.0
x_max = 10.0
y_min = 0.0
y_max = 5.0
"#,
        )
        .expect("write");
        let cfg: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(cfg.sources, vec!["front"]);
        assert_eq!(cfg.loop_period_ms, 20);
        assert_eq!(cfg.fusion.avg_tag_distance_threshold, 3.0);
        assert_eq!(cfg.fusion.max_divergence_from_odometry, 2.0);
        assert_eq!(cfg.fusion.enabled_imu_mode, ImuMode::InternalExternalAssist);
        assert_eq!(cfg.fusion.disabled_imu_mode, ImuMode::SeedInternal);
        assert_eq!(cfg.fusion.field_bounds.x_max, 10.0);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("tagfuse.toml");
        std::fs::write(&path, "loop_period_ms = \"fast\"").expect("write");
        assert!(matches!(load_from(&path), Err(TagfuseError::Config(_))));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("tagfuse.toml");
        std::fs::write(&path, "sources = [\"a\", \"a\"]").expect("write");
        let err = load_from(&path).unwrap_err();
        assert!(err.to_string().contains("listed twice"));

        let cfg = Config {
            loop_period_ms: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            sources: Vec::new(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overrides_replace_fields() {
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, |key| match key {
            "TAGFUSE_LOOP_PERIOD_MS" => Some("10".to_string()),
            "TAGFUSE_MAX_TAG_DISTANCE" => Some(" 3.5 ".to_string()),
            "TAGFUSE_MAX_DIVERGENCE" => Some("1.0".to_string()),
            _ => None,
        });
        assert_eq!(cfg.loop_period_ms, 10);
        assert_eq!(cfg.fusion.avg_tag_distance_threshold, 3.5);
        assert_eq!(cfg.fusion.max_divergence_from_odometry, 1.0);
    }

    #[test]
    fn overrides_ignore_unparsable_values() {
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, |_| Some("not-a-number".to_string()));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn resolve_path_prefers_explicit() {
        assert_eq!(resolve_path(Some("/etc/robot.toml")), PathBuf::from("/etc/robot.toml"));
        assert_eq!(resolve_path(None), PathBuf::from("tagfuse.toml"));
    }
}
