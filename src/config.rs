//! Service configuration.
//!
//! Loaded from a TOML file (default `stormmon.toml`), then overridden from
//! the environment. A `.env` file next to the binary is honoured through
//! `dotenv` before the environment is read.
//!
//! ```toml
//! [location]
//! name = "Nassau"
//! latitude = 25.05
//! longitude = -77.35
//!
//! [monitor]
//! cooldown_minutes = 360
//! interval_minutes = 30
//! state_path = "stormmon_state.json"
//! cones_path = "cones.json"
//!
//! [nws]
//! enabled = true
//! user_agent = "stormmon (ops@example.com)"
//!
//! [logging]
//! level = "info"
//! file = "stormmon.log"
//! ```
//!
//! Every field is optional. Environment overrides: `STORMMON_STATE_PATH`,
//! `STORMMON_LOG_FILE`; `STORMMON_CONFIG` picks the file itself.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Point, Polygon};
use crate::ingest::cones::{DEFAULT_RELEVANCE_RADIUS_KM, MonitoredArea};
use crate::logging::parse_level;

pub const DEFAULT_CONFIG_PATH: &str = "stormmon.toml";
pub const CONFIG_PATH_ENV: &str = "STORMMON_CONFIG";
pub const STATE_PATH_ENV: &str = "STORMMON_STATE_PATH";
pub const LOG_FILE_ENV: &str = "STORMMON_LOG_FILE";

/// Longest accepted cooldown: 30 days.
pub const MAX_COOLDOWN_MINUTES: i64 = 30 * 24 * 60;
/// Longest accepted cycle interval: one day.
pub const MAX_INTERVAL_MINUTES: u64 = 24 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Optional county outline as `[lon, lat]` pairs. When present, any
    /// overlap between the outline and a cone counts as "in the cone".
    pub county_outline: Option<Vec<[f64; 2]>>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: "Miami, FL".to_string(),
            latitude: 25.7617,
            longitude: -80.1918,
            county_outline: None,
        }
    }
}

impl LocationConfig {
    /// (lat, lon), the order used for distance calculations.
    pub fn lat_lon(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    pub fn monitored_area(&self) -> MonitoredArea {
        match &self.county_outline {
            Some(ring) => MonitoredArea::County(Polygon::new(
                ring.iter().map(|&[lon, lat]| Point::new(lon, lat)).collect(),
            )),
            None => MonitoredArea::Point(Point::new(self.longitude, self.latitude)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Minimum minutes between notifications for an unchanged situation.
    /// Zero disables the cooldown.
    pub cooldown_minutes: i64,
    /// Minutes between cycles in continuous mode.
    pub interval_minutes: u64,
    pub state_path: PathBuf,
    /// Cone snapshot maintained by an external fetcher. No cone signal when unset.
    pub cones_path: Option<PathBuf>,
    pub relevance_radius_km: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: 360,
            interval_minutes: 30,
            state_path: PathBuf::from("stormmon_state.json"),
            cones_path: None,
            relevance_radius_km: DEFAULT_RELEVANCE_RADIUS_KM,
        }
    }
}

impl MonitorConfig {
    /// Clamped to the accepted range, so an unvalidated value cannot panic.
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cooldown_minutes.clamp(0, MAX_COOLDOWN_MINUTES))
    }

    pub fn interval(&self) -> StdDuration {
        StdDuration::from_secs(self.interval_minutes.clamp(1, MAX_INTERVAL_MINUTES) * 60)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NwsConfig {
    pub enabled: bool,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for NwsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            user_agent: "stormmon (stormmon@example.com)".to_string(),
            timeout_secs: 15,
        }
    }
}

impl NwsConfig {
    pub fn timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub location: LocationConfig,
    pub monitor: MonitorConfig,
    pub nws: NwsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Parses and validates TOML text. `path` is only used in errors.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file that must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Resolves the config for a run: explicit path (must exist), else
    /// `$STORMMON_CONFIG` (must exist), else `stormmon.toml` if present, else
    /// defaults. Environment overrides are applied last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let from_env = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load(&path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup` (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(STATE_PATH_ENV).filter(|v| !v.is_empty()) {
            self.monitor.state_path = PathBuf::from(path);
        }
        if let Some(file) = lookup(LOG_FILE_ENV).filter(|v| !v.is_empty()) {
            self.logging.file = Some(file);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let loc = &self.location;
        if !loc.latitude.is_finite() || !(-90.0..=90.0).contains(&loc.latitude) {
            return Err(ConfigError::Invalid {
                field: "location.latitude",
                reason: format!("must be within [-90, 90]; got {}", loc.latitude),
            });
        }
        if !loc.longitude.is_finite() || !(-180.0..=180.0).contains(&loc.longitude) {
            return Err(ConfigError::Invalid {
                field: "location.longitude",
                reason: format!("must be within [-180, 180]; got {}", loc.longitude),
            });
        }
        if let Some(ring) = &loc.county_outline {
            if ring.len() < 3 {
                return Err(ConfigError::Invalid {
                    field: "location.county_outline",
                    reason: format!("needs at least 3 points; got {}", ring.len()),
                });
            }
        }
        if !(0..=MAX_COOLDOWN_MINUTES).contains(&self.monitor.cooldown_minutes) {
            return Err(ConfigError::Invalid {
                field: "monitor.cooldown_minutes",
                reason: format!(
                    "must be within [0, {}]; got {}",
                    MAX_COOLDOWN_MINUTES, self.monitor.cooldown_minutes
                ),
            });
        }
        if !(1..=MAX_INTERVAL_MINUTES).contains(&self.monitor.interval_minutes) {
            return Err(ConfigError::Invalid {
                field: "monitor.interval_minutes",
                reason: format!(
                    "must be within [1, {}]; got {}",
                    MAX_INTERVAL_MINUTES, self.monitor.interval_minutes
                ),
            });
        }
        let radius = self.monitor.relevance_radius_km;
        if radius.is_nan() || radius <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "monitor.relevance_radius_km",
                reason: format!("must be > 0; got {}", radius),
            });
        }
        if parse_level(&self.logging.level).is_none() {
            return Err(ConfigError::Invalid {
                field: "logging.level",
                reason: format!("unknown level {:?}", self.logging.level),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        Config::from_toml(text, Path::new("test.toml"))
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.monitor.cooldown(), chrono::Duration::hours(6));
        assert_eq!(config.monitor.interval(), StdDuration::from_secs(1800));
    }

    #[test]
    fn test_full_config_parses() {
        let config = parse(
            r#"
            [location]
            name = "Nassau"
            latitude = 25.05
            longitude = -77.35
            county_outline = [[-77.6, 24.9], [-77.1, 24.9], [-77.1, 25.2], [-77.6, 25.2]]

            [monitor]
            cooldown_minutes = 0
            interval_minutes = 15
            state_path = "/var/lib/stormmon/state.json"
            cones_path = "/var/lib/stormmon/cones.json"

            [nws]
            enabled = false

            [logging]
            level = "debug"
            file = "/var/log/stormmon.log"
            timestamps = true
            "#,
        )
        .unwrap();

        assert_eq!(config.location.name, "Nassau");
        assert!(matches!(config.location.monitored_area(), MonitoredArea::County(_)));
        assert_eq!(config.monitor.cooldown(), chrono::Duration::zero());
        assert_eq!(config.monitor.cones_path, Some(PathBuf::from("/var/lib/stormmon/cones.json")));
        assert!(!config.nws.enabled);
        assert_eq!(config.nws.timeout_secs, 15);
        assert_eq!(config.logging.file.as_deref(), Some("/var/log/stormmon.log"));
    }

    #[test]
    fn test_point_area_when_no_outline() {
        let config = Config::default();
        assert_eq!(
            config.location.monitored_area(),
            MonitoredArea::Point(Point::new(-80.1918, 25.7617))
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad = [
            "[location]\nlatitude = 95.0",
            "[location]\nlongitude = -200.0",
            "[location]\ncounty_outline = [[0.0, 0.0], [1.0, 1.0]]",
            "[monitor]\ncooldown_minutes = -5",
            "[monitor]\ninterval_minutes = 0",
            "[monitor]\ncooldown_minutes = 9223372036854775807",
            "[monitor]\ninterval_minutes = 9223372036854775807",
            "[monitor]\ninterval_minutes = 1441",
            "[logging]\nlevel = \"chatty\"",
        ];
        for text in bad {
            assert!(
                matches!(parse(text), Err(ConfigError::Invalid { .. })),
                "should reject: {text}"
            );
        }
    }

    #[test]
    fn test_out_of_range_durations_do_not_panic() {
        let mut monitor = MonitorConfig {
            cooldown_minutes: i64::MAX,
            interval_minutes: u64::MAX,
            ..MonitorConfig::default()
        };
        assert_eq!(monitor.cooldown(), chrono::Duration::days(30));
        assert_eq!(monitor.interval(), StdDuration::from_secs(24 * 60 * 60));

        monitor.cooldown_minutes = MAX_COOLDOWN_MINUTES;
        monitor.interval_minutes = MAX_INTERVAL_MINUTES;
        let config = Config { monitor, ..Config::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(matches!(parse("[monitor]\ncooldwn = 5"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides_replace_paths() {
        let env: HashMap<&str, &str> = [
            (STATE_PATH_ENV, "/tmp/override.json"),
            (LOG_FILE_ENV, "/tmp/override.log"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.monitor.state_path, PathBuf::from("/tmp/override.json"));
        assert_eq!(config.logging.file.as_deref(), Some("/tmp/override.log"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
