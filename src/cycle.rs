//! One monitoring cycle: lock, load, aggregate, resolve, decide, notify, save.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::aggregator::{self, SignalSource};
use crate::config::Config;
use crate::geometry::PlanarGeometry;
use crate::ingest::cones::{ConeSignalSource, FileConeFeed};
use crate::ingest::nws::{NwsClient, NwsSignalSource};
use crate::logging::targets;
use crate::model::{AlertLevel, SourceError};
use crate::notify::{Notification, Notifier};
use crate::resolver::resolve;
use crate::state::{NotifyReason, StateError, StateStore, decide};

#[derive(Debug, Error)]
pub enum CycleError {
    /// Another run holds the state lock, or the lock could not be taken.
    #[error("could not lock state: {0}")]
    Lock(#[source] StateError),
}

/// Per-run settings that do not come from the sources.
#[derive(Debug, Clone)]
pub struct CycleOptions {
    pub location_name: String,
    pub cooldown: Duration,
}

impl CycleOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            location_name: config.location.name.clone(),
            cooldown: config.monitor.cooldown(),
        }
    }
}

/// What a cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub level: AlertLevel,
    pub previous_level: Option<AlertLevel>,
    pub notify: bool,
    pub reason: Option<NotifyReason>,
    /// False when no source produced data; `level` is then AllClear by default.
    pub data_available: bool,
    pub failed_sources: Vec<String>,
    /// False when the notifier reported an error.
    pub delivered: bool,
    /// False when the state could not be written back.
    pub persisted: bool,
}

impl CycleReport {
    /// A cycle counts as failed for exit-code purposes when its state was
    /// not written back.
    pub fn is_success(&self) -> bool {
        self.persisted
    }
}

/// Runs one cycle against `store`, holding its lock throughout.
pub fn run_cycle(
    sources: &[&dyn SignalSource],
    store: &StateStore,
    notifier: &dyn Notifier,
    options: &CycleOptions,
    now: DateTime<Utc>,
) -> Result<CycleReport, CycleError> {
    let _lock = store.lock().map_err(CycleError::Lock)?;

    let state = store.load();
    let previous_level = state.last_alert_level;

    let aggregation = aggregator::aggregate(sources);
    if !aggregation.data_available {
        log::error!(
            target: targets::SYSTEM,
            "No threat data available from any source; reporting all-clear as unverified"
        );
    }

    let level = resolve(&aggregation.signal);
    let decision = decide(level, &aggregation.context, state, now, options.cooldown);

    log::info!(
        target: targets::SYSTEM,
        "Level {} ({}), previously {}",
        level.value(),
        level.name(),
        previous_level.map_or_else(|| "none".to_string(), |p| p.value().to_string())
    );

    let mut delivered = true;
    if let Some(reason) = decision.reason {
        let notification = Notification::build(level, reason, &aggregation, &options.location_name, now);
        log::info!(target: targets::SYSTEM, "Notifying: {}", reason);
        if let Err(e) = notifier.notify(&notification) {
            log::error!(target: targets::SYSTEM, "{}", e);
            delivered = false;
        }
    } else {
        log::info!(target: targets::SYSTEM, "No notification (cooldown active)");
    }

    let persisted = match store.save(&decision.state) {
        Ok(()) => true,
        Err(e) => {
            log::error!(target: targets::STATE, "State not saved: {}", e);
            false
        }
    };

    Ok(CycleReport {
        level,
        previous_level,
        notify: decision.notify,
        reason: decision.reason,
        data_available: aggregation.data_available,
        failed_sources: aggregation.failed_sources,
        delivered,
        persisted,
    })
}

/// Builds the configured signal sources.
///
/// The cone source is only present when a snapshot path is configured; the
/// NWS source only when enabled.
pub fn sources_from_config(config: &Config) -> Result<Vec<Box<dyn SignalSource>>, SourceError> {
    let mut sources: Vec<Box<dyn SignalSource>> = Vec::new();
    let location = config.location.lat_lon();

    if let Some(path) = &config.monitor.cones_path {
        sources.push(Box::new(
            ConeSignalSource::new(
                FileConeFeed::new(path),
                PlanarGeometry,
                location,
                config.location.monitored_area(),
            )
            .with_relevance_radius_km(config.monitor.relevance_radius_km),
        ));
    }

    if config.nws.enabled {
        let client = NwsClient::new(
            config.location.latitude,
            config.location.longitude,
            &config.nws.user_agent,
            config.nws.timeout(),
        )?;
        sources.push(Box::new(NwsSignalSource::new(client)));
    }

    if sources.is_empty() {
        log::warn!(target: targets::SYSTEM, "No signal sources configured");
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::SignalContribution;
    use crate::logging::DataSource;
    use crate::notify::NotifyError;
    use chrono::TimeZone;
    use std::cell::RefCell;

    struct Fixed(Result<SignalContribution, String>);

    impl SignalSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn data_source(&self) -> DataSource {
            DataSource::System
        }

        fn collect(&self) -> Result<SignalContribution, SourceError> {
            self.0.clone().map_err(SourceError::NoData)
        }
    }

    #[derive(Default)]
    struct Recorder {
        sent: RefCell<Vec<Notification>>,
        fail: bool,
    }

    impl Notifier for Recorder {
        fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.sent.borrow_mut().push(notification.clone());
            if self.fail {
                Err(NotifyError::Delivery("smtp down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 10, 12, 0, 0).unwrap()
    }

    fn options() -> CycleOptions {
        CycleOptions {
            location_name: "Nassau".to_string(),
            cooldown: Duration::hours(6),
        }
    }

    fn watch_in_cone() -> SignalContribution {
        let mut c = SignalContribution::default();
        c.signal.has_hurricane_watch = true;
        c.signal.in_hurricane_cone = true;
        c.signal.days_until_impact = 2;
        c
    }

    #[test]
    fn test_first_cycle_notifies_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let notifier = Recorder::default();
        let source = Fixed(Ok(watch_in_cone()));

        let report = run_cycle(&[&source], &store, &notifier, &options(), now()).unwrap();
        assert_eq!(report.level, AlertLevel::EvacuationZone);
        assert_eq!(report.previous_level, None);
        assert_eq!(report.reason, Some(NotifyReason::Escalation));
        assert!(report.persisted && report.delivered && report.data_available);
        assert_eq!(notifier.sent.borrow().len(), 1);

        let saved = store.try_load().unwrap();
        assert_eq!(saved.last_alert_level, Some(AlertLevel::EvacuationZone));
        assert_eq!(saved.last_notified_at, Some(now()));
        assert!(!dir.path().join("state.json.lock").exists());
    }

    #[test]
    fn test_delivery_failure_still_saves_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let notifier = Recorder { fail: true, ..Recorder::default() };
        let source = Fixed(Ok(watch_in_cone()));

        let report = run_cycle(&[&source], &store, &notifier, &options(), now()).unwrap();
        assert!(report.notify);
        assert!(!report.delivered);
        assert!(report.persisted);
        assert!(report.is_success());
    }

    #[test]
    fn test_held_lock_fails_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let _held = store.lock().unwrap();

        let result = run_cycle(&[], &store, &Recorder::default(), &options(), now());
        assert!(matches!(result, Err(CycleError::Lock(StateError::Locked(_)))));
    }

    #[test]
    fn test_sources_from_config_respects_switches() {
        let mut config = Config::default();
        config.nws.enabled = false;
        assert!(sources_from_config(&config).unwrap().is_empty());

        config.monitor.cones_path = Some("cones.json".into());
        let sources = sources_from_config(&config).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "forecast cones");
    }
}
