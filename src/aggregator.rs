//! Threat signal aggregation.
//!
//! Each upstream source produces a partial [`SignalContribution`]. The
//! aggregator merges them into the single [`ThreatSignal`] the resolver sees.
//! A failing source is logged and skipped; its fields simply stay at their
//! "no threat indicated" defaults. Whether *any* source produced data is
//! reported separately so an all-clear resolved from nothing can be told
//! apart from a real one.

use crate::logging::{self, DataSource};
use crate::model::{ActiveAlert, SignalContext, SourceError, StormThreat, ThreatSignal};

/// Partial signal from one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalContribution {
    pub signal: ThreatSignal,
    pub context: SignalContext,
    /// Every storm within the relevance radius, in the cone or not.
    pub threats: Vec<StormThreat>,
    /// Tropical alerts in effect.
    pub alerts: Vec<ActiveAlert>,
}

impl SignalContribution {
    /// Folds `other` into `self`: flags OR, nearest impact wins, strongest
    /// storm type wins, context and descriptions are unioned.
    pub fn merge(&mut self, other: SignalContribution) {
        let a = &mut self.signal;
        let b = other.signal;
        a.in_disturbance_cone |= b.in_disturbance_cone;
        a.in_hurricane_cone |= b.in_hurricane_cone;
        a.has_hurricane_watch |= b.has_hurricane_watch;
        a.has_hurricane_warning |= b.has_hurricane_warning;
        a.has_tropical_storm_watch |= b.has_tropical_storm_watch;
        a.has_tropical_storm_warning |= b.has_tropical_storm_warning;
        a.has_evacuation_order |= b.has_evacuation_order;
        a.storm_type = a.storm_type.max(b.storm_type);
        a.days_until_impact = a.days_until_impact.min(b.days_until_impact);

        self.context.advisories.extend(other.context.advisories);
        self.context.alert_ids.extend(other.context.alert_ids);
        self.threats.extend(other.threats);
        self.alerts.extend(other.alerts);
    }
}

/// Anything that can contribute to the threat signal: cone feeds, alert
/// feeds, third-party map analysis.
pub trait SignalSource {
    fn name(&self) -> &str;
    fn data_source(&self) -> DataSource;
    fn collect(&self) -> Result<SignalContribution, SourceError>;
}

/// Result of one collection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub signal: ThreatSignal,
    pub context: SignalContext,
    pub threats: Vec<StormThreat>,
    pub alerts: Vec<ActiveAlert>,
    /// False when every source failed (or there were none). The signal is
    /// then the default, and its all-clear carries no information.
    pub data_available: bool,
    pub failed_sources: Vec<String>,
}

/// Runs every source and merges what succeeded.
pub fn aggregate(sources: &[&dyn SignalSource]) -> Aggregation {
    let mut merged = SignalContribution::default();
    let mut failed_sources = Vec::new();
    let mut successful = 0;

    for source in sources {
        match source.collect() {
            Ok(contribution) => {
                successful += 1;
                merged.merge(contribution);
            }
            Err(e) => {
                logging::log_source_failure(source.data_source(), source.name(), &e);
                failed_sources.push(source.name().to_string());
            }
        }
    }

    logging::log_collection_summary(sources.len(), successful, failed_sources.len());

    attach_official_warnings(&mut merged.threats, &merged.alerts);

    Aggregation {
        signal: merged.signal,
        context: merged.context,
        threats: merged.threats,
        alerts: merged.alerts,
        data_available: successful > 0,
        failed_sources,
    }
}

/// Cone and alert data arrive from different sources; link each storm to the
/// alerts whose text names it.
fn attach_official_warnings(threats: &mut [StormThreat], alerts: &[ActiveAlert]) {
    for threat in threats {
        threat.official_warnings = alerts
            .iter()
            .filter(|alert| alert.mentions(&threat.name))
            .map(|alert| alert.event.clone())
            .collect();
    }
}

impl Aggregation {
    /// Storms whose cone covers the location.
    pub fn threats_in_cone(&self) -> impl Iterator<Item = &StormThreat> {
        self.threats.iter().filter(|t| t.in_cone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StormCategory, StormType};

    struct Fixed {
        name: &'static str,
        result: Result<SignalContribution, String>,
    }

    impl SignalSource for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn data_source(&self) -> DataSource {
            DataSource::System
        }

        fn collect(&self) -> Result<SignalContribution, SourceError> {
            self.result.clone().map_err(SourceError::Parse)
        }
    }

    fn cone_contribution() -> SignalContribution {
        let mut c = SignalContribution::default();
        c.signal.in_hurricane_cone = true;
        c.signal.storm_type = StormType::TropicalStorm;
        c.signal.days_until_impact = 4;
        c.context.advisories.insert("AL052024".to_string(), "7".to_string());
        c.threats.push(StormThreat {
            storm_id: "AL052024".to_string(),
            name: "Debby".to_string(),
            category: StormCategory::TropicalStorm,
            in_cone: true,
            distance_km: Some(420.0),
            confidence: 0.9,
            official_warnings: Vec::new(),
            estimated_arrival_hours: Some(80),
        });
        c
    }

    fn alert_contribution() -> SignalContribution {
        let mut c = SignalContribution::default();
        c.signal.has_tropical_storm_watch = true;
        c.context.alert_ids.insert("urn:oid:1".to_string());
        c.alerts.push(ActiveAlert {
            event: "Tropical Storm Watch".to_string(),
            description: Some("Tropical Storm Debby is forecast to approach.".to_string()),
        });
        c.alerts.push(ActiveAlert {
            event: "Storm Surge Watch".to_string(),
            description: Some("Surge from a distant system.".to_string()),
        });
        c
    }

    #[test]
    fn test_merges_all_successful_sources() {
        let cones = Fixed { name: "cones", result: Ok(cone_contribution()) };
        let nws = Fixed { name: "nws", result: Ok(alert_contribution()) };

        let agg = aggregate(&[&cones, &nws]);
        assert!(agg.data_available);
        assert!(agg.failed_sources.is_empty());
        assert!(agg.signal.in_hurricane_cone);
        assert!(agg.signal.has_tropical_storm_watch);
        assert_eq!(agg.signal.days_until_impact, 4);
        assert_eq!(agg.signal.storm_type, StormType::TropicalStorm);
        assert_eq!(agg.context.advisories.len(), 1);
        assert_eq!(agg.context.alert_ids.len(), 1);
        assert_eq!(agg.threats.len(), 1);
        assert_eq!(agg.threats_in_cone().count(), 1);
        assert_eq!(agg.alerts.len(), 2);
        // Only the alert naming the storm is linked to it.
        assert_eq!(agg.threats[0].official_warnings, vec!["Tropical Storm Watch"]);
    }

    #[test]
    fn test_failed_source_leaves_defaults_for_its_fields() {
        let cones = Fixed { name: "cones", result: Err("bad snapshot".to_string()) };
        let nws = Fixed { name: "nws", result: Ok(alert_contribution()) };

        let agg = aggregate(&[&cones, &nws]);
        assert!(agg.data_available);
        assert_eq!(agg.failed_sources, vec!["cones"]);
        assert!(!agg.signal.in_hurricane_cone);
        assert!(agg.signal.has_tropical_storm_watch);
        assert_eq!(agg.signal.days_until_impact, 7);
    }

    #[test]
    fn test_all_sources_failing_reports_no_data() {
        let cones = Fixed { name: "cones", result: Err("down".to_string()) };
        let nws = Fixed { name: "nws", result: Err("down".to_string()) };

        let agg = aggregate(&[&cones, &nws]);
        assert!(!agg.data_available);
        assert_eq!(agg.failed_sources.len(), 2);
        assert_eq!(agg.signal, ThreatSignal::default());
    }

    #[test]
    fn test_no_sources_reports_no_data() {
        let agg = aggregate(&[]);
        assert!(!agg.data_available);
        assert_eq!(agg.signal, ThreatSignal::default());
    }

    #[test]
    fn test_merge_takes_nearest_impact_and_strongest_storm() {
        let mut a = cone_contribution();
        let mut b = SignalContribution::default();
        b.signal.in_disturbance_cone = true;
        b.signal.storm_type = StormType::Hurricane;
        b.signal.days_until_impact = 2;
        a.merge(b);
        assert_eq!(a.signal.days_until_impact, 2);
        assert_eq!(a.signal.storm_type, StormType::Hurricane);
        assert!(a.signal.in_disturbance_cone && a.signal.in_hurricane_cone);
    }
}
