/// Forecast cone signals
///
/// Turns the set of active storm cones into the geometric half of a
/// `ThreatSignal`: whether the monitored location sits inside a disturbance
/// area or an official forecast cone, how strong the strongest intersecting
/// storm is, roughly how many days until it arrives, and which advisory
/// numbers were in effect.
///
/// Cone retrieval stays behind the `ConeFeed` trait. The only feed shipped
/// here reads a JSON snapshot that an external fetcher keeps up to date.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::aggregator::{SignalContribution, SignalSource};
use crate::geometry::{GeometryPredicate, MultiPolygon, Point, Polygon};
use crate::logging::{DataSource, targets};
use crate::model::{DEFAULT_DAYS_UNTIL_IMPACT, SourceError, StormCategory, StormThreat};

/// Storms whose centre is farther than this are ignored.
pub const DEFAULT_RELEVANCE_RADIUS_KM: f64 = 2000.0;

/// Unnamed areas larger than this (square degrees) are outlook regions, not
/// something a single location can meaningfully be "in".
pub const LARGE_AREA_SQ_DEG: f64 = 50.0;

const EARTH_RADIUS_KM: f64 = 6371.0;
const DEFAULT_SPEED_KPH: f64 = 15.0;

static SPEED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*(mph|kph|km/h|knots|kt)").expect("speed pattern is valid")
});

// ---------------------------------------------------------------------------
// Cone records
// ---------------------------------------------------------------------------

/// One active storm or disturbance with its cone geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormCone {
    pub storm_id: String,
    #[serde(default)]
    pub storm_name: Option<String>,
    /// Free-text type as published, e.g. "Hurricane", "Potential Tropical Cyclone".
    #[serde(default)]
    pub storm_type: Option<String>,
    #[serde(default)]
    pub max_winds_mph: Option<u32>,
    #[serde(default)]
    pub advisory_num: Option<String>,
    /// Current centre as (latitude, longitude).
    #[serde(default)]
    pub current_position: Option<(f64, f64)>,
    /// Motion text, e.g. "NW at 12 mph".
    #[serde(default)]
    pub movement: Option<String>,
    /// One polygon or several; holes are honoured.
    pub geometry: MultiPolygon,
}

impl StormCone {
    pub fn display_name(&self) -> &str {
        self.storm_name.as_deref().unwrap_or(&self.storm_id)
    }

    /// Whether this is a named/numbered system whose cone must always be
    /// checked, however large.
    pub fn is_named_system(&self) -> bool {
        let storm_type = self.storm_type.as_deref().unwrap_or_default().to_lowercase();
        let storm_name = self.storm_name.as_deref().unwrap_or_default().to_lowercase();
        let storm_id = self.storm_id.to_lowercase();

        storm_type.contains("named storm")
            || storm_type.contains("hurricane")
            || storm_type.contains("tropical storm")
            || storm_type.contains("potential tropical cyclone")
            || storm_name.contains("cyclone")
            || (!storm_name.is_empty() && storm_name != "unknown" && storm_name != "invest")
            || (storm_id.contains("al") && storm_id.chars().any(|c| c.is_ascii_digit()))
    }
}

// ---------------------------------------------------------------------------
// Categorization
// ---------------------------------------------------------------------------

/// Classify a cone from its published type, name, id and wind speed.
pub fn categorize(cone: &StormCone) -> StormCategory {
    let storm_type = cone.storm_type.as_deref().unwrap_or_default().to_lowercase();
    let storm_name = cone.storm_name.as_deref().unwrap_or_default().to_lowercase();
    let winds = cone.max_winds_mph.unwrap_or(0);

    if storm_type.contains("hurricane") || winds >= 74 {
        return if winds >= 111 {
            StormCategory::MajorHurricane
        } else {
            StormCategory::MinorHurricane
        };
    }
    if storm_type.contains("storm") || (39..74).contains(&winds) {
        return StormCategory::TropicalStorm;
    }
    if storm_type.contains("depression") || (1..39).contains(&winds) {
        return StormCategory::TropicalDepression;
    }
    if storm_name.contains("invest")
        || storm_type.contains("disturbance")
        || storm_type.contains("development")
        || cone.storm_id.contains('9')
    {
        return StormCategory::Invest;
    }
    if storm_name.contains("development") || storm_name.contains("area") {
        return StormCategory::DevelopmentArea;
    }
    StormCategory::Unknown
}

// ---------------------------------------------------------------------------
// Distance & arrival
// ---------------------------------------------------------------------------

/// Great-circle distance in kilometres between two (lat, lon) positions.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().asin() * EARTH_RADIUS_KM
}

/// Best guess at a storm centre: reported position, else cone centroid.
fn storm_centre(cone: &StormCone) -> Option<(f64, f64)> {
    cone.current_position
        .or_else(|| cone.geometry.centroid().map(|p| (p.lat, p.lon)))
}

/// Keeps cones within `max_km` of `location` (lat, lon). Cones we cannot
/// place at all are kept.
pub fn filter_by_distance(cones: Vec<StormCone>, location: (f64, f64), max_km: f64) -> Vec<StormCone> {
    cones
        .into_iter()
        .filter(|cone| match storm_centre(cone) {
            Some(centre) => {
                let distance = haversine_km(location, centre);
                let keep = distance <= max_km;
                log::debug!(
                    target: targets::NHC,
                    "{} {}: {:.0}km away",
                    if keep { "Including" } else { "Excluding" },
                    cone.display_name(),
                    distance
                );
                keep
            }
            None => true,
        })
        .collect()
}

/// Parses a forward speed out of motion text, in km/h.
pub fn parse_speed_kph(movement: &str) -> Option<f64> {
    let lower = movement.to_lowercase();
    let caps = SPEED_PATTERN.captures(&lower)?;
    let speed: f64 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2)?.as_str() {
        "mph" | "knots" | "kt" => Some(speed * 1.6),
        _ => Some(speed),
    }
}

/// Rough hours until the storm centre reaches `location` (lat, lon).
///
/// `None` without a position or motion text. Unparseable motion falls back
/// to a slow 15 km/h drift; a stationary storm gives `None`.
pub fn estimate_arrival_hours(cone: &StormCone, location: (f64, f64)) -> Option<u32> {
    let position = cone.current_position?;
    let movement = cone.movement.as_deref()?;

    let speed_kph = parse_speed_kph(movement).unwrap_or(DEFAULT_SPEED_KPH);
    if speed_kph <= 0.0 {
        return None;
    }
    let distance_km = haversine_km(location, position);
    Some((distance_km / speed_kph) as u32)
}

/// How far the assessment of `cone` can be trusted, 0.0 to 1.0. Starts at
/// 0.5 and rises with a real name, an advisory number, a known position and
/// a well-defined category.
pub fn assessment_confidence(cone: &StormCone, category: StormCategory) -> f64 {
    let mut confidence = 0.5;
    if cone
        .storm_name
        .as_deref()
        .is_some_and(|n| !n.is_empty() && !n.to_lowercase().contains("unknown"))
    {
        confidence += 0.2;
    }
    if cone
        .advisory_num
        .as_deref()
        .is_some_and(|a| !a.is_empty() && a != "Unknown")
    {
        confidence += 0.1;
    }
    if cone.current_position.is_some() {
        confidence += 0.1;
    }
    if category.is_well_defined() {
        confidence += 0.1;
    }
    f64::min(confidence, 1.0)
}

/// Converts hours to whole days, rounding up, capped at the default window.
pub fn days_from_hours(hours: u32) -> u32 {
    hours.div_ceil(24).min(DEFAULT_DAYS_UNTIL_IMPACT)
}

// ---------------------------------------------------------------------------
// Feeds
// ---------------------------------------------------------------------------

/// Supplier of currently active cones.
pub trait ConeFeed {
    fn active_cones(&self) -> Result<Vec<StormCone>, SourceError>;
}

/// Reads cones from a JSON array written by an external fetcher.
#[derive(Debug, Clone)]
pub struct FileConeFeed {
    path: PathBuf,
}

impl FileConeFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Parses a cone snapshot.
pub fn parse_cone_snapshot(json: &str) -> Result<Vec<StormCone>, SourceError> {
    serde_json::from_str(json).map_err(|e| SourceError::Parse(e.to_string()))
}

impl ConeFeed for FileConeFeed {
    fn active_cones(&self) -> Result<Vec<StormCone>, SourceError> {
        let json = std::fs::read_to_string(&self.path)?;
        parse_cone_snapshot(&json)
    }
}

// ---------------------------------------------------------------------------
// Signal source
// ---------------------------------------------------------------------------

/// What the monitored location is tested against.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitoredArea {
    Point(Point),
    /// County outline; any overlap with a cone counts.
    County(Polygon),
}

/// Cone-based signal source.
pub struct ConeSignalSource<F, G> {
    feed: F,
    geometry: G,
    /// Used for distance filtering and arrival estimates, as (lat, lon).
    location: (f64, f64),
    area: MonitoredArea,
    relevance_radius_km: f64,
}

impl<F: ConeFeed, G: GeometryPredicate> ConeSignalSource<F, G> {
    pub fn new(feed: F, geometry: G, location: (f64, f64), area: MonitoredArea) -> Self {
        Self {
            feed,
            geometry,
            location,
            area,
            relevance_radius_km: DEFAULT_RELEVANCE_RADIUS_KM,
        }
    }

    pub fn with_relevance_radius_km(mut self, km: f64) -> Self {
        self.relevance_radius_km = km;
        self
    }

    fn intersects(&self, cone: &StormCone) -> bool {
        if cone.geometry.area() > LARGE_AREA_SQ_DEG && !cone.is_named_system() {
            log::debug!(
                target: targets::NHC,
                "Skipping large development area {} ({:.2} sq deg)",
                cone.display_name(),
                cone.geometry.area()
            );
            return false;
        }

        let polygons = std::slice::from_ref(&cone.geometry);
        match &self.area {
            MonitoredArea::Point(point) => self.geometry.point_in_any_polygon(*point, polygons),
            MonitoredArea::County(county) => self.geometry.polygon_intersects_any(county, polygons),
        }
    }
}

impl<F: ConeFeed, G: GeometryPredicate> SignalSource for ConeSignalSource<F, G> {
    fn name(&self) -> &str {
        "forecast cones"
    }

    fn data_source(&self) -> DataSource {
        DataSource::Nhc
    }

    fn collect(&self) -> Result<SignalContribution, SourceError> {
        let cones = self.feed.active_cones()?;
        let total = cones.len();
        let cones = filter_by_distance(cones, self.location, self.relevance_radius_km);

        let mut contribution = SignalContribution::default();
        let mut days = DEFAULT_DAYS_UNTIL_IMPACT;

        for cone in &cones {
            let category = categorize(cone);
            let in_cone = self.intersects(cone);
            let arrival = estimate_arrival_hours(cone, self.location);

            contribution.threats.push(StormThreat {
                storm_id: cone.storm_id.clone(),
                name: cone.display_name().to_string(),
                category,
                in_cone,
                distance_km: storm_centre(cone).map(|c| haversine_km(self.location, c)),
                confidence: assessment_confidence(cone, category),
                official_warnings: Vec::new(),
                estimated_arrival_hours: arrival,
            });

            if !in_cone {
                continue;
            }
            log::info!(
                target: targets::NHC,
                "Location is inside the cone of {} ({})",
                cone.display_name(),
                category
            );

            if category.is_forecast_cone() {
                contribution.signal.in_hurricane_cone = true;
                if let Some(hours) = arrival {
                    days = days.min(days_from_hours(hours));
                }
            } else {
                contribution.signal.in_disturbance_cone = true;
            }
            contribution.signal.storm_type = contribution.signal.storm_type.max(category.storm_type());

            if let Some(advisory) = &cone.advisory_num {
                contribution
                    .context
                    .advisories
                    .insert(cone.storm_id.clone(), advisory.clone());
            }
        }

        contribution.signal.days_until_impact = days;
        log::debug!(
            target: targets::NHC,
            "{} cones analysed, {} within {:.0}km, {} intersecting",
            total,
            cones.len(),
            self.relevance_radius_km,
            contribution.threats.iter().filter(|t| t.in_cone).count()
        );
        Ok(contribution)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PlanarGeometry;
    use crate::model::StormType;

    /// Nassau, Bahamas as (lat, lon).
    const NASSAU: (f64, f64) = (25.05, -77.35);

    fn nassau_point() -> MonitoredArea {
        MonitoredArea::Point(Point::new(NASSAU.1, NASSAU.0))
    }

    fn box_around(lat: f64, lon: f64, half: f64) -> Polygon {
        Polygon::from_lon_lat(&[
            (lon - half, lat - half),
            (lon + half, lat - half),
            (lon + half, lat + half),
            (lon - half, lat + half),
        ])
    }

    fn cone(id: &str, storm_type: &str, winds: u32) -> StormCone {
        StormCone {
            storm_id: id.to_string(),
            storm_name: Some("Ernesto".to_string()),
            storm_type: Some(storm_type.to_string()),
            max_winds_mph: Some(winds),
            advisory_num: Some("12".to_string()),
            current_position: None,
            movement: None,
            geometry: box_around(NASSAU.0, NASSAU.1, 2.0).into(),
        }
    }

    struct StaticFeed(Result<Vec<StormCone>, String>);

    impl ConeFeed for StaticFeed {
        fn active_cones(&self) -> Result<Vec<StormCone>, SourceError> {
            self.0.clone().map_err(SourceError::NoData)
        }
    }

    fn source(cones: Vec<StormCone>) -> ConeSignalSource<StaticFeed, PlanarGeometry> {
        ConeSignalSource::new(StaticFeed(Ok(cones)), PlanarGeometry, NASSAU, nassau_point())
    }

    // --- Categorization -----------------------------------------------------

    #[test]
    fn test_categorize_by_winds_and_type() {
        assert_eq!(categorize(&cone("AL052024", "Hurricane", 120)), StormCategory::MajorHurricane);
        assert_eq!(categorize(&cone("AL052024", "Hurricane", 90)), StormCategory::MinorHurricane);
        assert_eq!(categorize(&cone("AL052024", "", 80)), StormCategory::MinorHurricane);
        assert_eq!(categorize(&cone("AL052024", "Tropical Storm", 50)), StormCategory::TropicalStorm);
        assert_eq!(categorize(&cone("AL052024", "", 45)), StormCategory::TropicalStorm);
        assert_eq!(
            categorize(&cone("AL052024", "Tropical Depression", 35)),
            StormCategory::TropicalDepression
        );
    }

    #[test]
    fn test_categorize_disturbances() {
        let mut invest = cone("AL942024", "Tropical Disturbance", 0);
        invest.storm_name = Some("Invest 94L".to_string());
        assert_eq!(categorize(&invest), StormCategory::Invest);

        let mut area = cone("two_1", "", 0);
        area.storm_name = Some("Area of interest".to_string());
        assert_eq!(categorize(&area), StormCategory::DevelopmentArea);

        let mut unknown = cone("x", "", 0);
        unknown.storm_name = None;
        assert_eq!(categorize(&unknown), StormCategory::Unknown);
    }

    #[test]
    fn test_category_maps_to_storm_type() {
        assert_eq!(StormCategory::MajorHurricane.storm_type(), StormType::Hurricane);
        assert_eq!(StormCategory::Invest.storm_type(), StormType::Unknown);
        assert!(StormCategory::TropicalDepression.is_forecast_cone());
        assert!(!StormCategory::DevelopmentArea.is_forecast_cone());
    }

    // --- Distance & arrival -------------------------------------------------

    #[test]
    fn test_haversine_known_distance() {
        // Miami to Nassau is roughly 290 km.
        let d = haversine_km((25.76, -80.19), NASSAU);
        assert!((d - 290.0).abs() < 15.0, "got {d}");
        assert_eq!(haversine_km(NASSAU, NASSAU), 0.0);
    }

    #[test]
    fn test_filter_by_distance_keeps_near_and_unplaceable() {
        let mut near = cone("AL01", "Hurricane", 90);
        near.current_position = Some((24.0, -76.0));
        let mut far = cone("EP01", "Hurricane", 90);
        far.current_position = Some((15.0, -120.0));
        let mut nowhere = cone("AL02", "Hurricane", 90);
        nowhere.geometry = Polygon::new(Vec::new()).into();

        let kept = filter_by_distance(vec![near, far, nowhere], NASSAU, DEFAULT_RELEVANCE_RADIUS_KM);
        let ids: Vec<_> = kept.iter().map(|c| c.storm_id.as_str()).collect();
        assert_eq!(ids, vec!["AL01", "AL02"]);
    }

    #[test]
    fn test_parse_speed_units() {
        let close = |got: Option<f64>, want: f64| got.is_some_and(|v| (v - want).abs() < 1e-9);
        assert!(close(parse_speed_kph("NW at 10 mph"), 16.0));
        assert!(close(parse_speed_kph("WNW AT 10 KNOTS"), 16.0));
        assert!(close(parse_speed_kph("N at 20 km/h"), 20.0));
        assert_eq!(parse_speed_kph("stationary"), None);
    }

    #[test]
    fn test_estimate_arrival_and_days() {
        let mut c = cone("AL05", "Hurricane", 90);
        assert_eq!(estimate_arrival_hours(&c, NASSAU), None);

        // ~1000 km east of Nassau moving at 10 mph (16 km/h): ~2.6 days.
        c.current_position = Some((25.05, -67.4));
        c.movement = Some("W at 10 mph".to_string());
        let hours = estimate_arrival_hours(&c, NASSAU).unwrap();
        assert!((55..70).contains(&hours), "got {hours}");
        assert_eq!(days_from_hours(hours), 3);

        assert_eq!(days_from_hours(0), 0);
        assert_eq!(days_from_hours(24), 1);
        assert_eq!(days_from_hours(25), 2);
        assert_eq!(days_from_hours(24 * 30), 7);
    }

    // --- Signal source ------------------------------------------------------

    #[test]
    fn test_hurricane_cone_sets_flags_and_advisory() {
        let mut c = cone("AL052024", "Hurricane", 100);
        c.current_position = Some((23.5, -74.0));
        c.movement = Some("NW at 12 mph".to_string());

        let contribution = source(vec![c]).collect().unwrap();
        assert!(contribution.signal.in_hurricane_cone);
        assert!(!contribution.signal.in_disturbance_cone);
        assert_eq!(contribution.signal.storm_type, StormType::Hurricane);
        assert!(contribution.signal.days_until_impact <= 1);
        assert_eq!(contribution.context.advisories["AL052024"], "12");

        let threat = &contribution.threats[0];
        assert_eq!(threat.name, "Ernesto");
        assert_eq!(threat.category, StormCategory::MinorHurricane);
        assert!(threat.in_cone);
        assert!(threat.distance_km.is_some_and(|d| (300.0..450.0).contains(&d)));
        assert!(threat.estimated_arrival_hours.is_some());
        assert!(threat.official_warnings.is_empty());
    }

    #[test]
    fn test_nearby_storm_outside_cone_is_tracked_without_flags() {
        let mut c = cone("AL062024", "Tropical Storm", 50);
        c.current_position = Some((18.0, -66.0));
        c.geometry = box_around(18.0, -66.0, 1.0).into();

        let contribution = source(vec![c]).collect().unwrap();
        assert!(!contribution.signal.in_hurricane_cone);
        assert_eq!(contribution.threats.len(), 1);
        assert!(!contribution.threats[0].in_cone);
    }

    #[test]
    fn test_location_in_cone_hole_is_outside() {
        let mut c = cone("AL052024", "Hurricane", 100);
        c.geometry = box_around(NASSAU.0, NASSAU.1, 2.0)
            .with_hole(&[
                (NASSAU.1 - 0.5, NASSAU.0 - 0.5),
                (NASSAU.1 + 0.5, NASSAU.0 - 0.5),
                (NASSAU.1 + 0.5, NASSAU.0 + 0.5),
                (NASSAU.1 - 0.5, NASSAU.0 + 0.5),
            ])
            .into();

        let contribution = source(vec![c]).collect().unwrap();
        assert!(!contribution.signal.in_hurricane_cone);
        assert!(!contribution.threats[0].in_cone);
    }

    #[test]
    fn test_multipolygon_cone_matches_any_part() {
        let mut c = cone("AL052024", "Hurricane", 100);
        c.geometry = MultiPolygon(vec![
            box_around(18.0, -66.0, 1.0),
            box_around(NASSAU.0, NASSAU.1, 0.5),
        ]);

        let contribution = source(vec![c]).collect().unwrap();
        assert!(contribution.signal.in_hurricane_cone);
    }

    #[test]
    fn test_assessment_confidence() {
        let mut c = cone("AL052024", "Hurricane", 100);
        let full = assessment_confidence(&c, StormCategory::MinorHurricane);
        // name + advisory + category, no position
        assert!((full - 0.9).abs() < 1e-9, "got {full}");

        c.current_position = Some((23.5, -74.0));
        let capped = assessment_confidence(&c, StormCategory::MinorHurricane);
        assert!((capped - 1.0).abs() < 1e-9 && capped <= 1.0);

        c.storm_name = Some("Unknown".to_string());
        c.advisory_num = Some("Unknown".to_string());
        c.current_position = None;
        let low = assessment_confidence(&c, StormCategory::Invest);
        assert!((low - 0.5).abs() < 1e-9, "got {low}");
    }

    #[test]
    fn test_disturbance_cone_sets_disturbance_flag() {
        let mut invest = cone("AL942024", "Tropical Disturbance", 0);
        invest.storm_name = Some("Invest 94L".to_string());

        let contribution = source(vec![invest]).collect().unwrap();
        assert!(contribution.signal.in_disturbance_cone);
        assert!(!contribution.signal.in_hurricane_cone);
        assert_eq!(contribution.signal.days_until_impact, DEFAULT_DAYS_UNTIL_IMPACT);
    }

    #[test]
    fn test_cone_elsewhere_contributes_nothing() {
        let mut c = cone("AL052024", "Hurricane", 100);
        c.geometry = box_around(18.0, -66.0, 1.0).into();

        let contribution = source(vec![c]).collect().unwrap();
        assert_eq!(contribution.signal, crate::model::ThreatSignal::default());
        assert!(contribution.context.is_empty());
    }

    #[test]
    fn test_large_unnamed_area_is_skipped_but_named_storm_is_not() {
        let mut outlook = cone("two", "", 0);
        outlook.storm_name = None;
        outlook.geometry = box_around(NASSAU.0, NASSAU.1, 5.0).into(); // 100 sq deg
        let contribution = source(vec![outlook.clone()]).collect().unwrap();
        assert!(!contribution.signal.in_disturbance_cone);

        let mut named = outlook;
        named.storm_type = Some("Hurricane".to_string());
        named.storm_name = Some("Francine".to_string());
        let contribution = source(vec![named]).collect().unwrap();
        assert!(contribution.signal.in_hurricane_cone);
    }

    #[test]
    fn test_numbered_id_anywhere_marks_named_system() {
        let mut c = cone("ATCF-AL09", "", 0);
        c.storm_name = None;
        assert!(c.is_named_system());

        c.storm_id = "two_1".to_string();
        assert!(!c.is_named_system());
    }

    #[test]
    fn test_county_outline_overlap_counts() {
        let mut c = cone("AL052024", "Tropical Storm", 50);
        c.geometry = box_around(25.5, -77.0, 0.3).into();
        let county = box_around(25.05, -77.35, 0.6);

        let src = ConeSignalSource::new(
            StaticFeed(Ok(vec![c])),
            PlanarGeometry,
            NASSAU,
            MonitoredArea::County(county),
        );
        let contribution = src.collect().unwrap();
        assert!(contribution.signal.in_hurricane_cone);
        assert_eq!(contribution.signal.storm_type, StormType::TropicalStorm);
    }

    #[test]
    fn test_feed_failure_propagates() {
        let src = ConeSignalSource::new(
            StaticFeed(Err("feed offline".to_string())),
            PlanarGeometry,
            NASSAU,
            nassau_point(),
        );
        assert!(src.collect().is_err());
    }

    #[test]
    fn test_file_feed_reads_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cones.json");
        let json = serde_json::to_string(&vec![cone("AL052024", "Hurricane", 100)]).unwrap();
        std::fs::write(&path, json).unwrap();

        let cones = FileConeFeed::new(&path).active_cones().unwrap();
        assert_eq!(cones.len(), 1);
        assert_eq!(cones[0].storm_id, "AL052024");

        assert!(FileConeFeed::new(dir.path().join("missing.json")).active_cones().is_err());
        assert!(matches!(parse_cone_snapshot("{}"), Err(SourceError::Parse(_))));
    }
}
