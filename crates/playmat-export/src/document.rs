//! Configuration document written next to each exported map image.
//!
//! The JSON shape is consumed by downstream tooling (print preparation,
//! generative restyling), so field names are fixed:
//!
//! ```json
//! {
//!   "mat": { "size", "dimensions", "widthMeters", "heightMeters", "rotation" },
//!   "colorScheme": { "name", "primary" },
//!   "location": { "latitude", "longitude", "zoom", "address" },
//!   "timestamp": "2024-05-01T12:00:00.000Z"
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use playmat_core::ConfigSnapshot;

use crate::ExportError;

/// Address recorded when the user never searched for one.
pub const NO_ADDRESS: &str = "Not specified";

/// Mat section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatSection {
    /// Mat-size key.
    pub size: String,
    /// Human-readable dimensions label.
    pub dimensions: String,
    /// Printed width in meters.
    pub width_meters: f64,
    /// Printed height in meters.
    pub height_meters: f64,
    /// Map bearing in degrees.
    pub rotation: f64,
}

/// Color-scheme section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSection {
    /// Scheme display name.
    pub name: String,
    /// Accent color as CSS hex.
    pub primary: String,
}

/// Location section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSection {
    /// Center latitude.
    pub latitude: f64,
    /// Center longitude.
    pub longitude: f64,
    /// Zoom level.
    pub zoom: f64,
    /// Searched address, or [`NO_ADDRESS`].
    pub address: String,
}

/// The full configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// Mat selection.
    pub mat: MatSection,
    /// Color selection.
    pub color_scheme: ColorSection,
    /// Camera position.
    pub location: LocationSection,
    /// ISO-8601 UTC time of export, millisecond precision.
    pub timestamp: String,
}

impl ExportDocument {
    /// Build the document for a capture snapshot.
    ///
    /// A missing or blank `address` is recorded as [`NO_ADDRESS`].
    #[must_use]
    pub fn new(snapshot: &ConfigSnapshot, address: Option<&str>, at: DateTime<Utc>) -> Self {
        let address = address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(NO_ADDRESS);

        Self {
            mat: MatSection {
                size: snapshot.mat_size.key.clone(),
                dimensions: snapshot.mat_size.display_dimensions.clone(),
                width_meters: snapshot.mat_size.physical_width_meters,
                height_meters: snapshot.mat_size.physical_height_meters,
                rotation: snapshot.rotation_degrees,
            },
            color_scheme: ColorSection {
                name: snapshot.color_scheme.display_name.clone(),
                primary: snapshot.color_scheme.accent_color.clone(),
            },
            location: LocationSection {
                latitude: snapshot.viewport.center_lat,
                longitude: snapshot.viewport.center_lng,
                zoom: snapshot.viewport.zoom,
                address: address.to_string(),
            },
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Pretty-printed JSON with two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
