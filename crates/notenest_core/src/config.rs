//! Runtime configuration for relay, presentation layer and panel controller.
//!
//! # Responsibility
//! - Hold the timing constants of the save/load protocol.
//! - Hold panel width bounds shared by store and presentation layer.
//! - Parse optional TOML overrides and reject inconsistent values.
//!
//! # Invariants
//! - `Default` reproduces the stock protocol timings (500ms debounce, 1s load
//!   timeout, 100ms close grace, toggle retries at +500ms then +1000ms).
//! - `min <= default <= max` for panel width bounds.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_CLOSE_GRACE_MS: u64 = 100;
pub const DEFAULT_TOGGLE_RETRY_DELAYS_MS: [u64; 2] = [500, 1_000];
pub const DEFAULT_PANEL_WIDTH: u32 = 400;
pub const MIN_PANEL_WIDTH: u32 = 300;
pub const MAX_PANEL_WIDTH: u32 = 800;

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config file: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config TOML: {err}"),
            Self::InvalidValue { field, reason } => {
                write!(f, "invalid config value for {field}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Allowed panel widths in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WidthBounds {
    pub default: u32,
    pub min: u32,
    pub max: u32,
}

impl Default for WidthBounds {
    fn default() -> Self {
        Self {
            default: DEFAULT_PANEL_WIDTH,
            min: MIN_PANEL_WIDTH,
            max: MAX_PANEL_WIDTH,
        }
    }
}

impl WidthBounds {
    pub fn clamp(&self, width: u32) -> u32 {
        width.clamp(self.min, self.max)
    }

    /// Clamps a signed width produced by drag arithmetic.
    pub fn clamp_signed(&self, width: i64) -> u32 {
        width.clamp(i64::from(self.min), i64::from(self.max)) as u32
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NestConfig {
    /// Quiet period before an editor burst is autosaved.
    pub debounce_ms: u64,
    /// Wait for the initial tree before falling back to the seed tree.
    pub load_timeout_ms: u64,
    /// Delay between the close-time persist and the hide request.
    pub close_grace_ms: u64,
    /// Delays between toggle retries after injecting the presentation layer.
    pub toggle_retry_delays_ms: Vec<u64>,
    pub panel_width: WidthBounds,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; logging is off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for NestConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
            close_grace_ms: DEFAULT_CLOSE_GRACE_MS,
            toggle_retry_delays_ms: DEFAULT_TOGGLE_RETRY_DELAYS_MS.to_vec(),
            panel_width: WidthBounds::default(),
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl NestConfig {
    /// Parses and validates a TOML document; missing fields keep defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: NestConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(invalid("debounce_ms", "must be > 0"));
        }
        if self.load_timeout_ms == 0 {
            return Err(invalid("load_timeout_ms", "must be > 0"));
        }
        if self.toggle_retry_delays_ms.is_empty() {
            return Err(invalid("toggle_retry_delays_ms", "must not be empty"));
        }
        let bounds = self.panel_width;
        if bounds.min == 0 || bounds.min > bounds.max {
            return Err(invalid("panel_width", "expected 0 < min <= max"));
        }
        if bounds.default < bounds.min || bounds.default > bounds.max {
            return Err(invalid("panel_width.default", "must lie within [min, max]"));
        }
        if self.log_level.trim().is_empty() {
            return Err(invalid("log_level", "must not be empty"));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }

    pub fn toggle_retry_delays(&self) -> Vec<Duration> {
        self.toggle_retry_delays_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect()
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, NestConfig, WidthBounds};
    use std::time::Duration;

    #[test]
    fn defaults_match_protocol_timings() {
        let config = NestConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.load_timeout(), Duration::from_secs(1));
        assert_eq!(config.close_grace(), Duration::from_millis(100));
        assert_eq!(
            config.toggle_retry_delays(),
            vec![Duration::from_millis(500), Duration::from_millis(1_000)]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = NestConfig::from_toml_str("debounce_ms = 250\n[panel_width]\nmax = 900\n")
            .expect("partial config should parse");
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.load_timeout_ms, 1_000);
        assert_eq!(config.panel_width.max, 900);
        assert_eq!(config.panel_width.min, 300);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = NestConfig::from_toml_str("autosave = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn inconsistent_width_bounds_are_rejected() {
        let err = NestConfig::from_toml_str("[panel_width]\nmin = 900\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "panel_width",
                ..
            }
        ));
    }

    #[test]
    fn width_clamp_honours_bounds() {
        let bounds = WidthBounds::default();
        assert_eq!(bounds.clamp(100), 300);
        assert_eq!(bounds.clamp(500), 500);
        assert_eq!(bounds.clamp(10_000), 800);
        assert_eq!(bounds.clamp_signed(-40), 300);
    }
}
