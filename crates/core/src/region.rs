//! Validation of submitted extraction regions.
//!
//! Turns an untrusted [`JobRequest`] into a [`Region`]: a parsed geometry
//! plus a sanitized copy of the payload that is safe to hand to the
//! extraction tool and to echo back to clients.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::geometry::{Geometry, Position};

/// Body of a submission, before any validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region_type: String,
    #[serde(default)]
    pub region_data: Value,
}

impl JobRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(body).map_err(|_| CoreError::validation("input GeoJSON is invalid"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionType {
    Geojson,
    Bbox,
}

impl RegionType {
    pub fn as_str(self) -> &'static str {
        match self {
            RegionType::Geojson => "geojson",
            RegionType::Bbox => "bbox",
        }
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated region with a non-empty area.
#[derive(Debug, Clone)]
pub struct Region {
    pub geometry: Geometry,
    pub name: String,
    pub region_type: RegionType,
    /// Canonical re-serialization of the submitted payload.
    pub data: Value,
}

/// Validate a request into a [`Region`].
pub fn validate(request: JobRequest) -> Result<Region, CoreError> {
    let (region_type, geometry, data) = match request.region_type.as_str() {
        "geojson" => {
            let (geometry, data) = parse_geojson(request.region_data)?;
            (RegionType::Geojson, geometry, data)
        }
        "bbox" => {
            let (geometry, data) = parse_bbox(request.region_data)?;
            (RegionType::Bbox, geometry, data)
        }
        _ => return Err(CoreError::validation("invalid input RegionType")),
    };

    if geometry.planar_area() == 0.0 {
        return Err(CoreError::validation("Input has 0 area"));
    }

    Ok(Region {
        geometry,
        name: request.name,
        region_type,
        data,
    })
}

/// Parse a JSON request body straight into a [`Region`].
pub fn parse_region(body: &[u8]) -> Result<Region, CoreError> {
    validate(JobRequest::from_json(body)?)
}

fn parse_geojson(raw: Value) -> Result<(Geometry, Value), CoreError> {
    let geometry: Geometry =
        serde_json::from_value(raw).map_err(|_| CoreError::validation("input GeoJSON is invalid"))?;

    match &geometry {
        Geometry::Polygon { coordinates } => check_polygon(coordinates)?,
        Geometry::MultiPolygon { coordinates } => {
            if coordinates.is_empty() {
                return Err(CoreError::validation("geom does not have enough rings"));
            }
            for polygon in coordinates {
                check_polygon(polygon)?;
            }
        }
        // No ring structure to check; the area check still applies.
        Geometry::Point { .. }
        | Geometry::MultiPoint { .. }
        | Geometry::LineString { .. }
        | Geometry::MultiLineString { .. }
        | Geometry::GeometryCollection { .. } => {}
    }

    let data = serde_json::to_value(&geometry)
        .map_err(|e| CoreError::Internal(format!("failed to serialize geometry: {e}")))?;
    Ok((geometry, data))
}

fn check_polygon(rings: &[Vec<Position>]) -> Result<(), CoreError> {
    if rings.is_empty() {
        return Err(CoreError::validation("geom does not have enough rings"));
    }
    if rings.iter().any(|ring| ring.len() < 4) {
        return Err(CoreError::validation("ring does not have enough coordinates"));
    }
    Ok(())
}

/// `[minLat, minLon, maxLat, maxLon]`; extra numbers are ignored.
fn parse_bbox(raw: Value) -> Result<(Geometry, Value), CoreError> {
    let coords: Vec<f64> = serde_json::from_value(raw)
        .map_err(|_| CoreError::validation("bbox must be an array of numbers"))?;
    let [min_lat, min_lon, max_lat, max_lon] = match coords.get(..4) {
        Some(&[a, b, c, d]) => [a, b, c, d],
        _ => return Err(CoreError::validation("input does not have >3 coordinates")),
    };

    let geometry = Geometry::rectangle(
        Position::new(min_lon, min_lat),
        Position::new(max_lon, max_lat),
    );
    let data = Value::from(vec![min_lat, min_lon, max_lat, max_lon]);
    Ok((geometry, data))
}
