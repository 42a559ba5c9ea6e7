//! Classified road features loaded from GeoJSON.
//!
//! Only line geometries are kept. Each feature carries its string
//! properties (notably `class` and `type`) so style filters can select
//! it exactly as the vector-tile `road` layer would.

use std::collections::BTreeMap;

use geo::{Coord, LineString, MultiLineString};
use serde::Deserialize;

use playmat_core::{FeatureProperties, GeometryType};

use crate::RenderError;

/// One road line with its tags. Coordinates are (longitude, latitude).
#[derive(Debug, Clone, PartialEq)]
pub struct RoadFeature {
    /// Line geometry in degrees.
    pub geometry: MultiLineString<f64>,
    /// String properties.
    pub properties: BTreeMap<String, String>,
}

impl RoadFeature {
    /// A single-line feature with `class` and optional `type`.
    #[must_use]
    pub fn line(coords: &[(f64, f64)], class: &str, kind: Option<&str>) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("class".to_string(), class.to_string());
        if let Some(kind) = kind {
            properties.insert("type".to_string(), kind.to_string());
        }
        Self {
            geometry: MultiLineString::new(vec![LineString::from(coords.to_vec())]),
            properties,
        }
    }
}

impl FeatureProperties for RoadFeature {
    fn geometry_type(&self) -> GeometryType {
        GeometryType::LineString
    }

    fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// The features a software surface draws.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    /// Features in source order.
    pub features: Vec<RoadFeature>,
}

#[derive(Deserialize)]
struct RawCollection {
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    LineString { coordinates: Vec<Vec<f64>> },
    MultiLineString { coordinates: Vec<Vec<Vec<f64>>> },
    #[serde(other)]
    Other,
}

fn to_line(positions: &[Vec<f64>]) -> Option<LineString<f64>> {
    let coords: Vec<Coord<f64>> = positions
        .iter()
        .filter_map(|p| match p.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect();
    (coords.len() >= 2).then(|| LineString::new(coords))
}

impl FeatureCollection {
    /// Parse a GeoJSON `FeatureCollection`.
    ///
    /// Features without a line geometry, and lines with fewer than two
    /// valid positions, are skipped. Non-string properties are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::GeoJson`] if the document is not a
    /// feature collection.
    pub fn from_geojson_str(json: &str) -> Result<Self, RenderError> {
        let raw: RawCollection = serde_json::from_str(json)?;
        let total = raw.features.len();

        let features: Vec<RoadFeature> = raw
            .features
            .into_iter()
            .filter_map(|f| {
                let lines: Vec<LineString<f64>> = match f.geometry? {
                    RawGeometry::LineString { coordinates } => {
                        to_line(&coordinates).into_iter().collect()
                    }
                    RawGeometry::MultiLineString { coordinates } => {
                        coordinates.iter().filter_map(|l| to_line(l)).collect()
                    }
                    RawGeometry::Other => return None,
                };
                if lines.is_empty() {
                    return None;
                }
                let properties = f
                    .properties
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|(k, v)| match v {
                        serde_json::Value::String(s) => Some((k, s)),
                        _ => None,
                    })
                    .collect();
                Some(RoadFeature {
                    geometry: MultiLineString::new(lines),
                    properties,
                })
            })
            .collect();

        if features.len() < total {
            log::debug!(
                "loaded {} line features, skipped {}",
                features.len(),
                total - features.len()
            );
        }
        Ok(Self { features })
    }
}
