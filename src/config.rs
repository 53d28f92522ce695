//! Configuration for the emotion tracker.

use crate::core::gate::{GatePolicy, DEFAULT_DEBOUNCE_MS, DEFAULT_MIN_CONFIDENCE};
use crate::core::sampler::{
    SamplingSettings, DEFAULT_DETECTOR_TIMEOUT_MS, DEFAULT_SAMPLE_INTERVAL_MS,
};
use crate::core::stats::DEFAULT_RECENT_WINDOW_HOURS;
use crate::core::time_of_day::LocalZone;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Main configuration for the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Time between detector samples
    #[serde(with = "duration_ms")]
    pub sample_interval: Duration,

    /// Upper bound for one detector call
    #[serde(with = "duration_ms")]
    pub detector_timeout: Duration,

    /// Candidates must be strictly above this confidence to be logged
    pub min_confidence: f64,

    /// A repeated emotion is only logged again after this much time
    #[serde(with = "duration_ms")]
    pub debounce: Duration,

    /// Window for the "recent" views, in hours
    pub recent_window_hours: f64,

    /// Path for the emotion log and transparency stats
    pub data_path: PathBuf,

    /// Default directory for exports
    pub export_path: PathBuf,

    /// Maximum size of the stored log in bytes
    pub storage_quota_bytes: Option<u64>,

    /// How often to check the store for changes made by other processes
    #[serde(with = "duration_ms")]
    pub sync_poll_interval: Duration,

    /// IANA timezone for time-of-day buckets; system zone when unset
    pub timezone: Option<String>,

    /// Whether capture is currently paused
    pub paused: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("emotion-tracker");

        Self {
            sample_interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
            detector_timeout: Duration::from_millis(DEFAULT_DETECTOR_TIMEOUT_MS),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS as u64),
            recent_window_hours: DEFAULT_RECENT_WINDOW_HOURS,
            export_path: data_dir.join("exports"),
            data_path: data_dir,
            storage_quota_bytes: None,
            sync_poll_interval: Duration::from_millis(500),
            timezone: None,
            paused: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("emotion-tracker")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("sample_interval", self.sample_interval),
            ("detector_timeout", self.detector_timeout),
            ("sync_poll_interval", self.sync_poll_interval),
        ];
        for (field, value) in durations {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if !self.recent_window_hours.is_finite() || self.recent_window_hours < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "recent_window_hours",
                reason: format!("{} is not a non-negative number", self.recent_window_hours),
            });
        }

        if let Some(name) = &self.timezone {
            parse_timezone(name)?;
        }
        Ok(())
    }

    /// Gate thresholds from this configuration.
    pub fn gate_policy(&self) -> GatePolicy {
        let debounce_ms = i64::try_from(self.debounce.as_millis()).unwrap_or(i64::MAX);
        GatePolicy {
            min_confidence: self.min_confidence,
            debounce: chrono::Duration::milliseconds(debounce_ms),
        }
    }

    pub fn sampling_settings(&self) -> SamplingSettings {
        SamplingSettings {
            interval: self.sample_interval,
            detector_timeout: self.detector_timeout,
        }
    }

    /// Zone used for time-of-day buckets.
    ///
    /// An unknown timezone name falls back to the system zone.
    pub fn local_zone(&self) -> LocalZone {
        match &self.timezone {
            Some(name) => match parse_timezone(name) {
                Ok(tz) => LocalZone::Named(tz),
                Err(e) => {
                    warn!("{e}, using system timezone");
                    LocalZone::System
                }
            },
            None => LocalZone::System,
        }
    }

    /// Where transparency counters are persisted.
    pub fn transparency_path(&self) -> PathBuf {
        self.data_path.join("transparency_stats.json")
    }
}

fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimezone(name.to_string()))
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidTimezone(String),
    InvalidValue { field: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidTimezone(name) => write!(f, "Unknown timezone: {name}"),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for {field}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as integer milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("emotion-tracker-config-{}", uuid::Uuid::new_v4()))
            .join("config.json")
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sample_interval, Duration::from_millis(100));
        assert_eq!(config.debounce, Duration::from_millis(5000));
        assert_eq!(config.min_confidence, 0.6);
        assert_eq!(config.recent_window_hours, 24.0);
        assert!(!config.paused);
        assert_eq!(config.local_zone(), LocalZone::System);
    }

    #[test]
    fn test_gate_policy_matches_defaults() {
        assert_eq!(Config::default().gate_policy(), GatePolicy::default());
    }

    #[test]
    fn test_durations_serialize_as_millis() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["sample_interval"], 100);
        assert_eq!(json["debounce"], 5000);
        assert_eq!(json["sync_poll_interval"], 500);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let path = temp_config_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"debounce": 2000, "paused": true}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.debounce, Duration::from_millis(2000));
        assert!(config.paused);
        assert_eq!(config.sample_interval, Duration::from_millis(100));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = temp_config_path();
        let config = Config {
            timezone: Some("Europe/Berlin".to_string()),
            storage_quota_bytes: Some(1024),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.local_zone(), LocalZone::Named(chrono_tz::Europe::Berlin));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_invalid_timezone() {
        let config = Config {
            timezone: Some("Mars/Olympus".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimezone(_))
        ));
        assert_eq!(config.local_zone(), LocalZone::System);
    }

    #[test]
    fn test_zero_durations_rejected() {
        for field in ["sample_interval", "detector_timeout", "sync_poll_interval"] {
            let config: Config = serde_json::from_str(&format!(r#"{{"{field}": 0}}"#)).unwrap();
            match config.validate() {
                Err(ConfigError::InvalidValue { field: bad, .. }) => assert_eq!(bad, field),
                other => panic!("{field}: expected InvalidValue, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_zero_interval_file_fails_to_load() {
        let path = temp_config_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"sample_interval": 0}"#).unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { field: "sample_interval", .. })
        ));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_bad_recent_window_rejected() {
        for hours in [-1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let config = Config {
                recent_window_hours: hours,
                ..Config::default()
            };
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::InvalidValue { field: "recent_window_hours", .. })
                ),
                "{hours} should be rejected"
            );
        }

        let zero = Config {
            recent_window_hours: 0.0,
            ..Config::default()
        };
        assert!(zero.validate().is_ok());
    }
}
