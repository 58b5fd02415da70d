//! TOML-based application configuration.
//!
//! Stores the tunables of a pushup challenge:
//! - Required reps, debounce window and countdown length
//! - Motion analyzer thresholds
//! - Visual analyzer thresholds and sampling
//! - Scripted fallback schedule
//!
//! Configuration is stored at `~/.config/pushlock/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::detection::{MotionConfig, ScriptedConfig, VisualConfig};
use crate::error::ConfigError;

/// Smallest and largest value the "Required Pushups" stepper allows.
pub const MIN_TARGET_REPS: u32 = 5;
pub const MAX_TARGET_REPS: u32 = 50;
/// Stepper increment for the required pushups setting.
pub const TARGET_REPS_STEP: u32 = 5;
/// Coarsest sampling the visual analyzer accepts.
pub const MAX_PIXEL_STRIDE: usize = 64;

/// Challenge-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    #[serde(default = "default_target_reps")]
    pub target_reps: u32,
    /// Minimum time between two accepted reps, regardless of source.
    #[serde(default = "default_min_rep_interval_ms")]
    pub min_rep_interval_ms: u64,
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u32,
    /// Vibrate on every accepted rep.
    #[serde(default = "default_true")]
    pub haptic_feedback: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/pushlock/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub challenge: ChallengeConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub visual: VisualConfig,
    #[serde(default)]
    pub scripted: ScriptedConfig,
}

fn default_target_reps() -> u32 {
    10
}
fn default_min_rep_interval_ms() -> u64 {
    800
}
fn default_countdown_secs() -> u32 {
    3
}
fn default_true() -> bool {
    true
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            target_reps: default_target_reps(),
            min_rep_interval_ms: default_min_rep_interval_ms(),
            countdown_secs: default_countdown_secs(),
            haptic_feedback: true,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) => return Err(unknown()),
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default on-disk location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location or create it with defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// Load and validate a config file at an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("falling back to default config: {e}");
                Self::default()
            }
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The result is validated
    /// before it replaces `self`; nothing is written to disk.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| {
            ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Step the required pushups up or down, clamped to the stepper range.
    pub fn adjust_target_reps(&mut self, increment: bool) -> u32 {
        let current = self.challenge.target_reps;
        let next = if increment {
            current.saturating_add(TARGET_REPS_STEP)
        } else {
            current.saturating_sub(TARGET_REPS_STEP)
        };
        self.challenge.target_reps = next.clamp(MIN_TARGET_REPS, MAX_TARGET_REPS);
        self.challenge.target_reps
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };

        let target = self.challenge.target_reps;
        if !(MIN_TARGET_REPS..=MAX_TARGET_REPS).contains(&target) {
            return Err(invalid(
                "challenge.target_reps",
                &format!("must be between {MIN_TARGET_REPS} and {MAX_TARGET_REPS}"),
            ));
        }
        if target % TARGET_REPS_STEP != 0 {
            return Err(invalid(
                "challenge.target_reps",
                &format!("must be a multiple of {TARGET_REPS_STEP}"),
            ));
        }
        if self.challenge.countdown_secs == 0 {
            return Err(invalid("challenge.countdown_secs", "must be at least 1"));
        }
        if self.motion.sample_interval_ms == 0 {
            return Err(invalid("motion.sample_interval_ms", "must be positive"));
        }
        if self.motion.motion_threshold < 0.0 {
            return Err(invalid("motion.motion_threshold", "must not be negative"));
        }
        if self.motion.down_threshold >= self.motion.up_threshold {
            return Err(invalid(
                "motion.down_threshold",
                "must be below motion.up_threshold",
            ));
        }
        if self.visual.capture_interval_ms == 0 {
            return Err(invalid("visual.capture_interval_ms", "must be positive"));
        }
        if self.visual.analyze_every_nth_frame == 0 {
            return Err(invalid("visual.analyze_every_nth_frame", "must be at least 1"));
        }
        if !(1..=MAX_PIXEL_STRIDE).contains(&self.visual.pixel_stride) {
            return Err(invalid(
                "visual.pixel_stride",
                &format!("must be between 1 and {MAX_PIXEL_STRIDE}"),
            ));
        }
        if self.scripted.min_interval_ms > self.scripted.base_interval_ms {
            return Err(invalid(
                "scripted.min_interval_ms",
                "must not exceed scripted.base_interval_ms",
            ));
        }
        let holds = self
            .scripted
            .down_phase_ms
            .checked_add(self.scripted.up_phase_ms)
            .ok_or_else(|| invalid("scripted.down_phase_ms", "phase holds are too long"))?;
        if holds > self.scripted.min_interval_ms {
            return Err(invalid(
                "scripted.min_interval_ms",
                "must cover the down and up phase holds",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.challenge.target_reps, 10);
        assert_eq!(parsed.visual.movement_threshold, 2000);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("[challenge]\ntarget_reps = 20\n").unwrap();
        assert_eq!(parsed.challenge.target_reps, 20);
        assert_eq!(parsed.challenge.min_rep_interval_ms, 800);
        assert_eq!(parsed.motion.sample_interval_ms, 100);
        assert_eq!(parsed.scripted.base_interval_ms, 2500);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("challenge.target_reps").as_deref(), Some("10"));
        assert_eq!(cfg.get("motion.down_threshold").as_deref(), Some("-0.5"));
        assert_eq!(cfg.get("challenge.haptic_feedback").as_deref(), Some("true"));
        assert!(cfg.get("challenge.missing").is_none());
        assert!(cfg.get("challenge").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("challenge.target_reps", "25").unwrap();
        cfg.set("challenge.haptic_feedback", "false").unwrap();
        cfg.set("motion.down_threshold", "-0.8").unwrap();
        assert_eq!(cfg.challenge.target_reps, 25);
        assert!(!cfg.challenge.haptic_feedback);
        assert!((cfg.motion.down_threshold + 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_types() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("challenge.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.set("challenge.haptic_feedback", "maybe").is_err());
        assert!(cfg.set("challenge.target_reps", "7.5").is_err());
        assert!(cfg.set("motion", "1").is_err());
    }

    #[test]
    fn set_rejects_values_that_fail_validation() {
        let mut cfg = Config::default();
        assert!(cfg.set("challenge.target_reps", "55").is_err());
        assert!(cfg.set("challenge.target_reps", "12").is_err());
        assert_eq!(cfg.challenge.target_reps, 10);
    }

    #[test]
    fn set_rejects_overflowing_holds_and_strides() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("scripted.down_phase_ms", "18446744073709551615"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set("visual.pixel_stride", "18446744073709551615"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.set("visual.pixel_stride", "65").is_err());
        cfg.set("visual.pixel_stride", "64").unwrap();
        assert_eq!(cfg.scripted.down_phase_ms, 1000);
    }

    #[test]
    fn adjust_target_reps_clamps_to_stepper_range() {
        let mut cfg = Config::default();
        assert_eq!(cfg.adjust_target_reps(false), 5);
        assert_eq!(cfg.adjust_target_reps(false), 5);
        cfg.challenge.target_reps = 45;
        assert_eq!(cfg.adjust_target_reps(true), 50);
        assert_eq!(cfg.adjust_target_reps(true), 50);
    }

    #[test]
    fn save_and_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.challenge.target_reps = 30;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.challenge.target_reps, 30);
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[challenge]\ntarget_reps = 3\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));

        std::fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }
}
