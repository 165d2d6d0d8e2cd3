/// Core data types for the tropical cyclone monitoring service.
///
/// This module defines the shared domain model imported by all other modules:
/// the ordered alert levels, the per-cycle threat signal, the context used for
/// deduplication, and the error types raised at the service's boundaries.
/// It contains no I/O.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Impact window
// ---------------------------------------------------------------------------

/// Days-until-impact used when no estimate can be computed. Also the cap
/// applied to any larger estimate: beyond a week the cone is not actionable.
pub const DEFAULT_DAYS_UNTIL_IMPACT: u32 = 7;

// ---------------------------------------------------------------------------
// Alert levels
// ---------------------------------------------------------------------------

/// Ordinal threat level, 1 (lowest) to 5 (highest).
///
/// The derived ordering follows declaration order, which matches the integer
/// value, so `a > b` always means "a is more severe than b".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AlertLevel {
    AllClear,
    TropicalStormThreat,
    TsWatchOrHurricaneThreat,
    EvacuationZone,
    HurricaneWarning,
}

impl AlertLevel {
    /// Every level, lowest first.
    pub const ALL: [AlertLevel; 5] = [
        AlertLevel::AllClear,
        AlertLevel::TropicalStormThreat,
        AlertLevel::TsWatchOrHurricaneThreat,
        AlertLevel::EvacuationZone,
        AlertLevel::HurricaneWarning,
    ];

    pub fn value(self) -> u8 {
        match self {
            AlertLevel::AllClear => 1,
            AlertLevel::TropicalStormThreat => 2,
            AlertLevel::TsWatchOrHurricaneThreat => 3,
            AlertLevel::EvacuationZone => 4,
            AlertLevel::HurricaneWarning => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AlertLevel::AllClear => "ALL_CLEAR",
            AlertLevel::TropicalStormThreat => "TROPICAL_STORM_THREAT",
            AlertLevel::TsWatchOrHurricaneThreat => "TS_WATCH_OR_HURRICANE_THREAT",
            AlertLevel::EvacuationZone => "EVACUATION_ZONE",
            AlertLevel::HurricaneWarning => "HURRICANE_WARNING",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.value())
    }
}

impl From<AlertLevel> for u8 {
    fn from(level: AlertLevel) -> u8 {
        level.value()
    }
}

impl TryFrom<u8> for AlertLevel {
    type Error = SignalError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AlertLevel::AllClear),
            2 => Ok(AlertLevel::TropicalStormThreat),
            3 => Ok(AlertLevel::TsWatchOrHurricaneThreat),
            4 => Ok(AlertLevel::EvacuationZone),
            5 => Ok(AlertLevel::HurricaneWarning),
            other => Err(SignalError::InvalidAlertLevel(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Storm type
// ---------------------------------------------------------------------------

/// Coarse storm classification carried for display. Ordered weakest first so
/// the strongest storm in scope can be picked with `max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StormType {
    #[default]
    Unknown,
    TropicalDepression,
    TropicalStorm,
    Hurricane,
}

impl fmt::Display for StormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StormType::Unknown => write!(f, "unknown"),
            StormType::TropicalDepression => write!(f, "tropical depression"),
            StormType::TropicalStorm => write!(f, "tropical storm"),
            StormType::Hurricane => write!(f, "hurricane"),
        }
    }
}

/// Finer storm classification used for per-storm threat records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StormCategory {
    /// Category 3-5
    MajorHurricane,
    /// Category 1-2
    MinorHurricane,
    TropicalStorm,
    TropicalDepression,
    Invest,
    DevelopmentArea,
    Unknown,
}

impl StormCategory {
    pub fn storm_type(self) -> StormType {
        match self {
            StormCategory::MajorHurricane | StormCategory::MinorHurricane => StormType::Hurricane,
            StormCategory::TropicalStorm => StormType::TropicalStorm,
            StormCategory::TropicalDepression => StormType::TropicalDepression,
            StormCategory::Invest | StormCategory::DevelopmentArea | StormCategory::Unknown => {
                StormType::Unknown
            }
        }
    }

    /// Official forecast cone (depression or stronger) as opposed to a
    /// disturbance or outlook area.
    pub fn is_forecast_cone(self) -> bool {
        matches!(
            self,
            StormCategory::MajorHurricane
                | StormCategory::MinorHurricane
                | StormCategory::TropicalStorm
                | StormCategory::TropicalDepression
        )
    }

    /// Named hurricane and tropical storm categories are well defined.
    pub fn is_well_defined(self) -> bool {
        matches!(
            self,
            StormCategory::MajorHurricane | StormCategory::MinorHurricane | StormCategory::TropicalStorm
        )
    }
}

impl fmt::Display for StormCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StormCategory::MajorHurricane => "major hurricane",
            StormCategory::MinorHurricane => "hurricane",
            StormCategory::TropicalStorm => "tropical storm",
            StormCategory::TropicalDepression => "tropical depression",
            StormCategory::Invest => "invest",
            StormCategory::DevelopmentArea => "development area",
            StormCategory::Unknown => "unknown system",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Per-storm detail
// ---------------------------------------------------------------------------

/// Assessment of one storm within the relevance radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormThreat {
    pub storm_id: String,
    pub name: String,
    pub category: StormCategory,
    pub in_cone: bool,
    pub distance_km: Option<f64>,
    /// 0.0 to 1.0; how much the assessment can be trusted given the data
    /// the storm record carried.
    pub confidence: f64,
    /// Tropical alerts in effect whose description names this storm.
    pub official_warnings: Vec<String>,
    pub estimated_arrival_hours: Option<u32>,
}

/// A tropical alert in effect at the location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAlert {
    pub event: String,
    pub description: Option<String>,
}

impl ActiveAlert {
    /// Whether the alert text names `storm_name`, case-insensitively.
    pub fn mentions(&self, storm_name: &str) -> bool {
        let name = storm_name.trim().to_lowercase();
        !name.is_empty()
            && self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&name))
    }
}

// ---------------------------------------------------------------------------
// Threat signal
// ---------------------------------------------------------------------------

/// Normalized inputs for one evaluation cycle.
///
/// Every flag defaults to `false` and `days_until_impact` to
/// [`DEFAULT_DAYS_UNTIL_IMPACT`], so a signal built from no data at all reads
/// as "no threat indicated". The field is unsigned: a negative day count can
/// only arrive from outside and is rejected by [`checked_days_until_impact`]
/// or by deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatSignal {
    pub in_disturbance_cone: bool,
    pub in_hurricane_cone: bool,
    pub has_hurricane_watch: bool,
    pub has_hurricane_warning: bool,
    pub has_tropical_storm_watch: bool,
    pub has_tropical_storm_warning: bool,
    pub has_evacuation_order: bool,
    pub storm_type: StormType,
    pub days_until_impact: u32,
}

impl Default for ThreatSignal {
    fn default() -> Self {
        Self {
            in_disturbance_cone: false,
            in_hurricane_cone: false,
            has_hurricane_watch: false,
            has_hurricane_warning: false,
            has_tropical_storm_watch: false,
            has_tropical_storm_warning: false,
            has_evacuation_order: false,
            storm_type: StormType::Unknown,
            days_until_impact: DEFAULT_DAYS_UNTIL_IMPACT,
        }
    }
}

impl ThreatSignal {
    /// Parse a signal from JSON, applying the same boundary rules as
    /// [`checked_days_until_impact`]: negative days are refused and large
    /// values are capped.
    pub fn from_json(input: &str) -> Result<Self, SignalError> {
        let mut raw: serde_json::Value =
            serde_json::from_str(input).map_err(|e| SignalError::Malformed(e.to_string()))?;

        // Cap before deserializing so counts beyond u32 still read as "a week or more".
        if let Some(days) = raw.get_mut("days_until_impact") {
            let capped = match (days.as_i64(), days.as_u64()) {
                (Some(d), _) => Some(checked_days_until_impact(d)?),
                (None, Some(_)) => Some(DEFAULT_DAYS_UNTIL_IMPACT),
                _ => None,
            };
            if let Some(capped) = capped {
                *days = serde_json::Value::from(capped);
            }
        }

        serde_json::from_value(raw).map_err(|e| SignalError::Malformed(e.to_string()))
    }
}

/// Validates an externally computed day count.
///
/// Negative values are an upstream bug and are rejected; anything beyond the
/// default window is capped to it.
pub fn checked_days_until_impact(days: i64) -> Result<u32, SignalError> {
    if days < 0 {
        return Err(SignalError::NegativeDaysUntilImpact(days));
    }
    Ok(days.min(DEFAULT_DAYS_UNTIL_IMPACT as i64) as u32)
}

// ---------------------------------------------------------------------------
// Deduplication context
// ---------------------------------------------------------------------------

/// What the current cycle saw, for comparison against persisted state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalContext {
    /// Latest advisory number per storm in scope, keyed by storm id.
    pub advisories: BTreeMap<String, String>,
    /// NWS alert identifiers observed this cycle.
    pub alert_ids: BTreeSet<String>,
}

impl SignalContext {
    pub fn is_empty(&self) -> bool {
        self.advisories.is_empty() && self.alert_ids.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Boundary validation errors for threat signals.
#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("days_until_impact must be >= 0, got {0}")]
    NegativeDaysUntilImpact(i64),
    #[error("alert level must be between 1 and 5, got {0}")]
    InvalidAlertLevel(u8),
    #[error("malformed threat signal: {0}")]
    Malformed(String),
}

/// Errors raised by upstream signal sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Non-2xx HTTP response.
    #[error("HTTP error: {0}")]
    HttpStatus(u16),
    /// Transport-level failure (DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Transport(String),
    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(String),
    /// A local snapshot could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The source responded but had nothing usable.
    #[error("No data available: {0}")]
    NoData(String),
}
