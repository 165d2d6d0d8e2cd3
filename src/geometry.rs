//! Point/polygon predicates over lon/lat degrees.
//!
//! Forecast cones are a few hundred kilometres across, so treating degrees as
//! a flat plane is accurate enough for "is this point inside the cone"
//! decisions. The types here are the serde-facing snapshot format; the
//! predicates themselves run on `geo` geometries. Callers depend on
//! [`GeometryPredicate`], so a geodesic implementation can be swapped in
//! without touching the signal sources.

use geo::{Area, Centroid, Intersects};
use serde::{Deserialize, Serialize};

/// A position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    fn to_geo(self) -> geo::Coord<f64> {
        geo::coord! { x: self.lon, y: self.lat }
    }
}

fn ring_to_geo(ring: &[Point]) -> geo::LineString<f64> {
    geo::LineString::new(ring.iter().map(|p| p.to_geo()).collect())
}

/// Number of distinct vertices, ignoring a closing duplicate.
fn ring_len(ring: &[Point]) -> usize {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => ring.len() - 1,
        _ => ring.len(),
    }
}

/// A polygon with an exterior ring and optional holes. Rings may or may not
/// repeat their first vertex at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Vec<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interiors: Vec<Vec<Point>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Point>) -> Self {
        Self {
            exterior,
            interiors: Vec::new(),
        }
    }

    /// Builds a hole-free polygon from `(lon, lat)` pairs.
    pub fn from_lon_lat(coords: &[(f64, f64)]) -> Self {
        Self::new(coords.iter().map(|&(lon, lat)| Point::new(lon, lat)).collect())
    }

    pub fn with_hole(mut self, coords: &[(f64, f64)]) -> Self {
        self.interiors
            .push(coords.iter().map(|&(lon, lat)| Point::new(lon, lat)).collect());
        self
    }

    /// Degenerate exteriors (fewer than three vertices) contain nothing.
    pub fn is_valid(&self) -> bool {
        ring_len(&self.exterior) >= 3
    }

    fn to_geo(&self) -> Option<geo::Polygon<f64>> {
        if !self.is_valid() {
            return None;
        }
        let holes = self
            .interiors
            .iter()
            .filter(|ring| ring_len(ring) >= 3)
            .map(|ring| ring_to_geo(ring))
            .collect();
        Some(geo::Polygon::new(ring_to_geo(&self.exterior), holes))
    }

    /// Unsigned area in square degrees, holes excluded.
    pub fn area(&self) -> f64 {
        self.to_geo().map_or(0.0, |p| p.unsigned_area())
    }

    /// Points on a ring count as inside; points in a hole do not.
    pub fn contains(&self, point: Point) -> bool {
        self.to_geo().is_some_and(|p| p.intersects(&point.to_geo()))
    }

    /// True if the two polygons share any point.
    pub fn intersects(&self, other: &Polygon) -> bool {
        match (self.to_geo(), other.to_geo()) {
            (Some(a), Some(b)) => a.intersects(&b),
            _ => false,
        }
    }
}

/// One or more polygons. Deserialises from a single polygon object or an
/// array of them, so older single-polygon snapshots still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PolygonsRepr", into = "PolygonsRepr")]
pub struct MultiPolygon(pub Vec<Polygon>);

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PolygonsRepr {
    One(Polygon),
    Many(Vec<Polygon>),
}

impl From<PolygonsRepr> for MultiPolygon {
    fn from(repr: PolygonsRepr) -> Self {
        match repr {
            PolygonsRepr::One(polygon) => MultiPolygon(vec![polygon]),
            PolygonsRepr::Many(polygons) => MultiPolygon(polygons),
        }
    }
}

impl From<MultiPolygon> for PolygonsRepr {
    fn from(multi: MultiPolygon) -> Self {
        PolygonsRepr::Many(multi.0)
    }
}

impl From<Polygon> for MultiPolygon {
    fn from(polygon: Polygon) -> Self {
        MultiPolygon(vec![polygon])
    }
}

impl MultiPolygon {
    fn to_geo(&self) -> geo::MultiPolygon<f64> {
        geo::MultiPolygon::new(self.0.iter().filter_map(Polygon::to_geo).collect())
    }

    /// Total unsigned area in square degrees.
    pub fn area(&self) -> f64 {
        self.to_geo().unsigned_area()
    }

    /// Area-weighted centroid; `None` when there is no valid polygon.
    pub fn centroid(&self) -> Option<Point> {
        self.to_geo().centroid().map(|c| Point::new(c.x(), c.y()))
    }

    pub fn contains(&self, point: Point) -> bool {
        self.0.iter().any(|p| p.contains(point))
    }

    pub fn intersects(&self, polygon: &Polygon) -> bool {
        self.0.iter().any(|p| p.intersects(polygon))
    }
}

// ---------------------------------------------------------------------------
// Predicate seam
// ---------------------------------------------------------------------------

/// Intersection tests used by the cone signal source.
pub trait GeometryPredicate {
    fn point_in_any_polygon(&self, point: Point, shapes: &[MultiPolygon]) -> bool;
    fn polygon_intersects_any(&self, polygon: &Polygon, shapes: &[MultiPolygon]) -> bool;
}

/// Flat-plane implementation backed by `geo`'s `Intersects`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarGeometry;

impl GeometryPredicate for PlanarGeometry {
    fn point_in_any_polygon(&self, point: Point, shapes: &[MultiPolygon]) -> bool {
        shapes.iter().any(|s| s.contains(point))
    }

    fn polygon_intersects_any(&self, polygon: &Polygon, shapes: &[MultiPolygon]) -> bool {
        shapes.iter().any(|s| s.intersects(polygon))
    }
}
