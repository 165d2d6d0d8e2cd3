/// Notification rendering and dispatch.
///
/// A `Notification` is assembled from the decided level, its `AlertInfo`
/// entry and what the cycle saw. Delivery sits behind the `Notifier` trait;
/// the console notifier here is the only built-in channel.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::aggregator::Aggregation;
use crate::levels::{AlertInfo, alert_info};
use crate::model::{AlertLevel, StormThreat};
use crate::state::NotifyReason;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// A rendered notification, ready for any channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: AlertLevel,
    pub info: &'static AlertInfo,
    pub reason: NotifyReason,
    pub title: String,
    pub message: String,
    /// Mirrors `Aggregation::data_available`; false means the level was not
    /// derived from any real data.
    pub data_available: bool,
    pub issued_at: DateTime<Utc>,
}

impl Notification {
    pub fn build(
        level: AlertLevel,
        reason: NotifyReason,
        aggregation: &Aggregation,
        location_name: &str,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let info = alert_info(level);

        let title = if !aggregation.data_available {
            format!("⚠ DATA UNAVAILABLE: threat status unknown for {}", location_name)
        } else if reason == NotifyReason::ThreatPassed {
            format!("{} {}: threat has passed for {}", info.icon, info.title_prefix, location_name)
        } else {
            format!("{} {}: {}", info.icon, info.title_prefix, location_name)
        };

        let mut lines = Vec::new();
        if !aggregation.data_available {
            lines.push(
                "DATA UNAVAILABLE: no forecast or alert source could be reached; \
                 this level was not determined from real data."
                    .to_string(),
            );
        }
        if aggregation.data_available {
            lines.push(info.guidance.to_string());
        }
        let (in_cone, nearby): (Vec<&StormThreat>, Vec<&StormThreat>) =
            aggregation.threats.iter().partition(|t| t.in_cone);
        if !in_cone.is_empty() {
            lines.push("In the cone:".to_string());
            lines.extend(in_cone.into_iter().map(describe_threat));
        }
        if !nearby.is_empty() {
            lines.push("Also tracking:".to_string());
            lines.extend(nearby.into_iter().map(describe_threat));
        }
        if !aggregation.alerts.is_empty() {
            let events: Vec<&str> = aggregation.alerts.iter().map(|a| a.event.as_str()).collect();
            lines.push(format!("Active alerts: {}", events.join(", ")));
        }
        if !aggregation.failed_sources.is_empty() {
            lines.push(format!("Unavailable sources: {}", aggregation.failed_sources.join(", ")));
        }

        Self {
            level,
            info,
            reason,
            title,
            message: lines.join("\n"),
            data_available: aggregation.data_available,
            issued_at,
        }
    }
}

/// One line per storm: name, category, distance, arrival and linked warnings.
fn describe_threat(threat: &StormThreat) -> String {
    let mut line = format!("  - {} ({})", threat.name, threat.category);
    if let Some(km) = threat.distance_km {
        line.push_str(&format!(", {:.0} km away", km));
    }
    if let Some(hours) = threat.estimated_arrival_hours {
        line.push_str(&format!(", arrival in ~{}h", hours));
    }
    line.push_str(&format!(", confidence {:.0}%", threat.confidence * 100.0));
    if !threat.official_warnings.is_empty() {
        line.push_str(&format!(", warnings: {}", threat.official_warnings.join(", ")));
    }
    line
}

/// A delivery channel.
pub trait Notifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Prints notifications to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn render(notification: &Notification) -> String {
        let rule = "═".repeat(59);
        format!(
            "{rule}\n{}\nLevel {} | {} | sound: {}\n{rule}\n{}\n{rule}",
            notification.title,
            notification.level.value(),
            notification.issued_at.format("%Y-%m-%d %H:%M UTC"),
            notification.info.sound_pattern,
            notification.message,
        )
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        println!("{}", Self::render(notification));
        Ok(())
    }
}
