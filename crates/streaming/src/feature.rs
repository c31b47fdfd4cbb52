//! Tile feature payload parsing.
//!
//! Wire schema (per tile): `{ "features": [ { "geometry": { "type",
//! "coordinates" }, "properties": { "name", "height", "category" } } ] }`.
//! A malformed individual feature is skipped; the rest of the tile parses
//! normally.

use foundation::geo::GeoPoint;
use serde::Deserialize;
use tracing::debug;

/// Height assigned to features whose payload omits one (meters).
pub const DEFAULT_FEATURE_HEIGHT_M: f64 = 10.0;

/// Parsed, immutable map feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: FeatureGeometry,
    pub name: Option<String>,
    pub height_m: f64,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    Point(GeoPoint),
    /// First ring is the outer boundary, the rest are holes.
    Polygon { rings: Vec<Vec<GeoPoint>> },
}

#[derive(Debug)]
pub struct ParseError {
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: RawProperties,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct RawProperties {
    name: Option<String>,
    height: Option<f64>,
    category: Option<String>,
}

/// Parses a tile payload into features, skipping malformed entries.
pub fn parse_tile_payload(bytes: &[u8]) -> Result<Vec<Feature>, ParseError> {
    let raw: RawCollection = serde_json::from_slice(bytes).map_err(|e| ParseError {
        message: format!("invalid tile payload: {e}"),
    })?;

    let mut out = Vec::with_capacity(raw.features.len());
    for (idx, feature) in raw.features.into_iter().enumerate() {
        match parse_feature(feature) {
            Some(f) => out.push(f),
            None => debug!("skipping malformed feature at index {idx}"),
        }
    }
    Ok(out)
}

fn parse_feature(raw: RawFeature) -> Option<Feature> {
    let geometry = raw.geometry?;
    let geometry = match geometry.kind.as_str() {
        "Point" => {
            let pair = as_lon_lat(&geometry.coordinates)?;
            FeatureGeometry::Point(pair)
        }
        "Polygon" => {
            let rings = parse_rings(&geometry.coordinates)?;
            FeatureGeometry::Polygon { rings }
        }
        _ => return None,
    };

    Some(Feature {
        geometry,
        name: raw.properties.name,
        height_m: raw
            .properties
            .height
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or(DEFAULT_FEATURE_HEIGHT_M),
        category: raw.properties.category,
    })
}

fn parse_rings(value: &serde_json::Value) -> Option<Vec<Vec<GeoPoint>>> {
    let rings = value.as_array()?;
    let mut out = Vec::with_capacity(rings.len());
    for ring in rings {
        let positions = ring.as_array()?;
        let mut pts = Vec::with_capacity(positions.len());
        for position in positions {
            pts.push(as_lon_lat(position)?);
        }
        // An outer ring that cannot bound an area invalidates the feature.
        if out.is_empty() && pts.len() < 3 {
            return None;
        }
        out.push(pts);
    }
    if out.is_empty() { None } else { Some(out) }
}

fn as_lon_lat(value: &serde_json::Value) -> Option<GeoPoint> {
    let pair = value.as_array()?;
    let lon = pair.first()?.as_f64()?;
    let lat = pair.get(1)?.as_f64()?;
    if !lon.is_finite() || !lat.is_finite() {
        return None;
    }
    Some(GeoPoint::new(lon, lat))
}
