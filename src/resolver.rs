//! Alert level resolution.
//!
//! Maps one [`ThreatSignal`] to one [`AlertLevel`] using fixed,
//! severity-descending precedence. Official alerts are checked before cone
//! geometry, so a missing or stale cone can never mask a warning.
//!
//! The function is pure: no I/O, no clock, no state.

use crate::model::{AlertLevel, ThreatSignal};

/// A hurricane cone reaching the location within this many days is treated
/// like a tropical storm watch.
pub const HURRICANE_THREAT_MAX_DAYS: u32 = 5;

/// Beyond this many days, cone intersection alone is not actionable.
pub const CONE_ACTIONABLE_MAX_DAYS: u32 = 7;

/// Resolves a signal to its alert level. First matching rule wins.
pub fn resolve(signal: &ThreatSignal) -> AlertLevel {
    if signal.has_hurricane_warning {
        return AlertLevel::HurricaneWarning;
    }

    if signal.has_tropical_storm_warning || signal.has_hurricane_watch || signal.has_evacuation_order {
        return AlertLevel::EvacuationZone;
    }

    if signal.has_tropical_storm_watch
        || (signal.in_hurricane_cone && signal.days_until_impact <= HURRICANE_THREAT_MAX_DAYS)
    {
        return AlertLevel::TsWatchOrHurricaneThreat;
    }

    if signal.in_disturbance_cone
        || (signal.in_hurricane_cone && signal.days_until_impact <= CONE_ACTIONABLE_MAX_DAYS)
    {
        return AlertLevel::TropicalStormThreat;
    }

    AlertLevel::AllClear
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
