/// NWS (National Weather Service) Alerts API Client
///
/// Retrieves active alerts for the monitored point and reduces the tropical
/// ones to the watch/warning/evacuation flags of a `ThreatSignal`. Alert ids
/// are carried through so the state tracker can tell new alerts from ones it
/// has already acted on.
///
/// API Documentation: https://www.weather.gov/documentation/services-web-api
/// Active alerts: https://api.weather.gov/alerts/active?point={lat},{lon}

use std::time::Duration;

use serde::Deserialize;

use crate::aggregator::{SignalContribution, SignalSource};
use crate::logging::{DataSource, targets};
use crate::model::{ActiveAlert, SourceError};

const NWS_BASE_URL: &str = "https://api.weather.gov";

// ============================================================================
// NWS API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct AlertCollection {
    features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    #[serde(default)]
    id: Option<String>,
    properties: AlertProperties,
}

#[derive(Debug, Deserialize)]
struct AlertProperties {
    #[serde(default)]
    id: Option<String>,
    event: String,
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    urgency: Option<String>,
}

/// One active NWS alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NwsAlert {
    pub id: String,
    pub event: String,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub urgency: Option<String>,
}

/// Parses an `/alerts/active` GeoJSON response.
///
/// Features without any id are dropped: without one they cannot be
/// deduplicated.
pub fn parse_alerts_response(json: &str) -> Result<Vec<NwsAlert>, SourceError> {
    let collection: AlertCollection =
        serde_json::from_str(json).map_err(|e| SourceError::Parse(e.to_string()))?;

    Ok(collection
        .features
        .into_iter()
        .filter_map(|feature| {
            let AlertFeature { id: feature_id, properties: props } = feature;
            let id = props.id.or(feature_id)?;
            Some(NwsAlert {
                id,
                event: props.event,
                headline: props.headline,
                description: props.description,
                severity: props.severity,
                urgency: props.urgency,
            })
        })
        .collect())
}

// ============================================================================
// Event classification
// ============================================================================

/// Tropical alert kinds that feed the threat signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    HurricaneWarning,
    HurricaneWatch,
    TropicalStormWarning,
    TropicalStormWatch,
    Evacuation,
}

/// Maps an NWS event name to a tropical alert kind, case-insensitively.
/// Non-tropical events (flood watches, heat advisories, ...) give `None`.
pub fn classify_event(event: &str) -> Option<AlertKind> {
    let event = event.to_lowercase();
    if event.contains("hurricane warning") {
        Some(AlertKind::HurricaneWarning)
    } else if event.contains("hurricane watch") {
        Some(AlertKind::HurricaneWatch)
    } else if event.contains("tropical storm warning") {
        Some(AlertKind::TropicalStormWarning)
    } else if event.contains("tropical storm watch") {
        Some(AlertKind::TropicalStormWatch)
    } else if event.contains("evacuation") {
        Some(AlertKind::Evacuation)
    } else {
        None
    }
}

/// Folds tropical alerts into a contribution; other alerts are ignored.
pub fn contribution_from_alerts(alerts: &[NwsAlert]) -> SignalContribution {
    let mut contribution = SignalContribution::default();

    for alert in alerts {
        let Some(kind) = classify_event(&alert.event) else {
            continue;
        };
        let signal = &mut contribution.signal;
        match kind {
            AlertKind::HurricaneWarning => signal.has_hurricane_warning = true,
            AlertKind::HurricaneWatch => signal.has_hurricane_watch = true,
            AlertKind::TropicalStormWarning => signal.has_tropical_storm_warning = true,
            AlertKind::TropicalStormWatch => signal.has_tropical_storm_watch = true,
            AlertKind::Evacuation => signal.has_evacuation_order = true,
        }
        contribution.context.alert_ids.insert(alert.id.clone());
        contribution.alerts.push(ActiveAlert {
            event: alert.event.clone(),
            description: alert.description.clone(),
        });
    }

    contribution
}

// ============================================================================
// API Client
// ============================================================================

/// Supplier of active alerts for the monitored point.
pub trait AlertFeed {
    fn active_alerts(&self) -> Result<Vec<NwsAlert>, SourceError>;
}

/// Builds the active-alerts URL for a point.
pub fn build_alerts_url(latitude: f64, longitude: f64) -> String {
    format!(
        "{}/alerts/active?point={:.4},{:.4}",
        NWS_BASE_URL, latitude, longitude
    )
}

/// Blocking client for api.weather.gov.
pub struct NwsClient {
    client: reqwest::blocking::Client,
    latitude: f64,
    longitude: f64,
}

impl NwsClient {
    /// The NWS API rejects requests without a descriptive User-Agent.
    pub fn new(latitude: f64, longitude: f64, user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            latitude,
            longitude,
        })
    }
}

impl AlertFeed for NwsClient {
    fn active_alerts(&self) -> Result<Vec<NwsAlert>, SourceError> {
        let url = build_alerts_url(self.latitude, self.longitude);
        log::debug!(target: targets::NWS, "GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/geo+json")
            .send()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status().as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        parse_alerts_response(&body)
    }
}

/// NWS-based signal source.
pub struct NwsSignalSource<F> {
    feed: F,
}

impl<F: AlertFeed> NwsSignalSource<F> {
    pub fn new(feed: F) -> Self {
        Self { feed }
    }
}

impl<F: AlertFeed> SignalSource for NwsSignalSource<F> {
    fn name(&self) -> &str {
        "NWS alerts"
    }

    fn data_source(&self) -> DataSource {
        DataSource::Nws
    }

    fn collect(&self) -> Result<SignalContribution, SourceError> {
        let alerts = self.feed.active_alerts()?;
        let contribution = contribution_from_alerts(&alerts);
        log::info!(
            target: targets::NWS,
            "{} active alerts, {} tropical",
            alerts.len(),
            contribution.alerts.len()
        );
        Ok(contribution)
    }
}

// ============================================================================
// Tests
// ============================================================================
