//! Region geometry model.
//!
//! A deliberately small GeoJSON geometry model: just enough to parse what
//! clients submit, re-serialize it in canonical form, measure its planar area
//! and hand it to the tile coverer. Coordinates are stored `(lon, lat)` as in
//! GeoJSON.

use serde::{Deserialize, Serialize};

/// A single coordinate pair.
///
/// Deserializes from a GeoJSON position (`[lon, lat, ...]`). Any ordinates
/// past the second (altitude, measure) are dropped, so a position always
/// re-serializes as exactly two numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(ordinates: Vec<f64>) -> Result<Self, Self::Error> {
        match ordinates.as_slice() {
            [lon, lat, ..] => Ok(Position::new(*lon, *lat)),
            _ => Err(format!(
                "a position needs at least 2 ordinates, got {}",
                ordinates.len()
            )),
        }
    }
}

impl From<Position> for [f64; 2] {
    fn from(p: Position) -> Self {
        [p.lon, p.lat]
    }
}

/// A closed linear ring. The first and last positions are expected to match.
pub type Ring = Vec<Position>;

/// A GeoJSON geometry, tagged by its `type` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    /// Axis-aligned rectangle spanned by two opposite corners, in any order.
    pub fn rectangle(a: Position, b: Position) -> Self {
        let (min_lon, max_lon) = (a.lon.min(b.lon), a.lon.max(b.lon));
        let (min_lat, max_lat) = (a.lat.min(b.lat), a.lat.max(b.lat));
        let ring = vec![
            Position::new(min_lon, min_lat),
            Position::new(max_lon, min_lat),
            Position::new(max_lon, max_lat),
            Position::new(min_lon, max_lat),
            Position::new(min_lon, min_lat),
        ];
        Geometry::Polygon {
            coordinates: vec![ring],
        }
    }

    /// GeoJSON type name, for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
            Geometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }

    /// Planar (degree-squared) area.
    ///
    /// Points and lines have no area. A polygon's area is its outer ring's
    /// area less its holes; multi-geometries and collections sum their parts.
    pub fn planar_area(&self) -> f64 {
        match self {
            Geometry::Point { .. }
            | Geometry::MultiPoint { .. }
            | Geometry::LineString { .. }
            | Geometry::MultiLineString { .. } => 0.0,
            Geometry::Polygon { coordinates } => polygon_area(coordinates),
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().map(|p| polygon_area(p)).sum()
            }
            Geometry::GeometryCollection { geometries } => {
                geometries.iter().map(Geometry::planar_area).sum()
            }
        }
    }
}

fn polygon_area(rings: &[Ring]) -> f64 {
    let mut rings = rings.iter();
    let Some(outer) = rings.next() else {
        return 0.0;
    };
    rings.fold(ring_area(outer).abs(), |area, hole| {
        area - ring_area(hole).abs()
    })
}

/// Signed shoelace area of a ring.
fn ring_area(ring: &[Position]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let twice: f64 = ring
        .windows(2)
        .map(|w| w[0].lon * w[1].lat - w[1].lon * w[0].lat)
        .sum();
    twice / 2.0
}
