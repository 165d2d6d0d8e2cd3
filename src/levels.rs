/// Display metadata for each alert level.
///
/// This is the single source of truth for how a level is presented: icon,
/// colour, sound pattern, title prefix and guidance text. Nothing here feeds
/// back into threat resolution; notifiers look entries up by the level that
/// was already decided.

use crate::model::AlertLevel;

// ---------------------------------------------------------------------------
// Alert metadata
// ---------------------------------------------------------------------------

/// Static presentation metadata for one [`AlertLevel`].
#[derive(Debug, PartialEq, Eq)]
pub struct AlertInfo {
    pub level: AlertLevel,
    /// Emoji shown in console and toast titles.
    pub icon: &'static str,
    /// Hex colour used by HTML/toast renderers.
    pub color: &'static str,
    /// Identifier of the sound pattern a notifier should play.
    pub sound_pattern: &'static str,
    pub title_prefix: &'static str,
    pub guidance: &'static str,
}

/// One entry per level, lowest first. Index with `level.value() - 1`, or use
/// [`alert_info`].
pub static ALERT_INFO: [AlertInfo; 5] = [
    AlertInfo {
        level: AlertLevel::AllClear,
        icon: "🟢",
        color: "#2e7d32",
        sound_pattern: "none",
        title_prefix: "ALL CLEAR",
        guidance: "No tropical threats to your location. \
                   Keep your hurricane kit stocked and review your plan.",
    },
    AlertInfo {
        level: AlertLevel::TropicalStormThreat,
        icon: "🌀",
        color: "#f9a825",
        sound_pattern: "single_chime",
        title_prefix: "TROPICAL STORM THREAT",
        guidance: "Your location is in a disturbance area or a distant forecast cone. \
                   Check supplies and monitor official forecasts daily.",
    },
    AlertInfo {
        level: AlertLevel::TsWatchOrHurricaneThreat,
        icon: "⚠️",
        color: "#ef6c00",
        sound_pattern: "double_chime",
        title_prefix: "TROPICAL STORM WATCH / HURRICANE THREAT",
        guidance: "Tropical storm conditions are possible or a hurricane cone reaches you \
                   within five days. Secure outdoor items, refill medications and fuel.",
    },
    AlertInfo {
        level: AlertLevel::EvacuationZone,
        icon: "🚨",
        color: "#c62828",
        sound_pattern: "repeating_alarm",
        title_prefix: "EVACUATION ZONE",
        guidance: "A tropical storm warning, hurricane watch or evacuation order is in effect. \
                   Be ready to leave; follow local emergency management instructions.",
    },
    AlertInfo {
        level: AlertLevel::HurricaneWarning,
        icon: "🛑",
        color: "#6a1b9a",
        sound_pattern: "continuous_siren",
        title_prefix: "HURRICANE WARNING",
        guidance: "Hurricane conditions are expected. Complete preparations now and \
                   shelter in place or evacuate as directed by officials.",
    },
];

/// Looks up the metadata for `level`.
pub fn alert_info(level: AlertLevel) -> &'static AlertInfo {
    &ALERT_INFO[(level.value() - 1) as usize]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
