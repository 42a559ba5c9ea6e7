//! Shared types for the playmat core.

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can hand framebuffers
/// and captures around without depending on `image` directly.
pub use image::RgbaImage;

/// One entry of the mat-size catalog.
///
/// The physical dimensions describe the printed product. The on-screen
/// selection rectangle does *not* use them directly; see
/// [`crate::overlay::compute_overlay_geometry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatSizeSpec {
    /// Lookup key (`"small"`, `"medium"`, `"large"`).
    pub key: String,
    /// Human-readable name shown in the UI.
    pub display_name: String,
    /// Printed width in meters.
    pub physical_width_meters: f64,
    /// Printed height in meters.
    pub physical_height_meters: f64,
    /// Pre-formatted dimensions label, e.g. `39" × 79" (1m × 2m)`.
    pub display_dimensions: String,
}

/// One entry of the color-scheme catalog.
///
/// Only decorates the selection rectangle; the captured raster never
/// depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    /// Lookup key (`"classic"`, `"muted"`, `"neon"`).
    pub key: String,
    /// Human-readable name shown in the UI.
    pub display_name: String,
    /// CSS hex accent color, e.g. `#10b981`.
    pub accent_color: String,
}

/// Camera state of the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    /// Longitude of the viewport center in degrees.
    pub center_lng: f64,
    /// Latitude of the viewport center in degrees.
    pub center_lat: f64,
    /// Map zoom level.
    pub zoom: f64,
    /// Map bearing in degrees, always in `[0, 360)`.
    pub rotation_degrees: f64,
    /// Camera pitch in degrees.
    pub pitch_degrees: f64,
}

impl ViewportState {
    /// Default longitude (Burlington, Ontario).
    pub const DEFAULT_CENTER_LNG: f64 = -79.7990;
    /// Default latitude (Burlington, Ontario).
    pub const DEFAULT_CENTER_LAT: f64 = 43.3255;
    /// Default zoom for a fresh session.
    pub const DEFAULT_ZOOM: f64 = 15.0;
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            center_lng: Self::DEFAULT_CENTER_LNG,
            center_lat: Self::DEFAULT_CENTER_LAT,
            zoom: Self::DEFAULT_ZOOM,
            rotation_degrees: 0.0,
            pitch_degrees: 0.0,
        }
    }
}

/// Raster dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Returns `true` if either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Serializable description of the configuration a capture was taken
/// with. Travels alongside the PNG bytes to export consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Selected mat size.
    pub mat_size: MatSizeSpec,
    /// Selected color scheme.
    pub color_scheme: ColorScheme,
    /// Map bearing at capture time.
    pub rotation_degrees: f64,
    /// Full camera state at capture time.
    pub viewport: ViewportState,
}

/// Errors raised while loading or validating configuration.
///
/// These surface at startup; dependent features are disabled rather
/// than the session crashing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A catalog table has no entries.
    #[error("{kind} catalog is empty")]
    EmptyCatalog {
        /// Which catalog (`"mat size"` or `"color scheme"`).
        kind: &'static str,
    },

    /// Two catalog entries share a key.
    #[error("duplicate {kind} key: {key}")]
    DuplicateKey {
        /// Which catalog.
        kind: &'static str,
        /// The repeated key.
        key: String,
    },

    /// A requested key does not exist in the catalog.
    #[error("unknown {kind} key: {key}")]
    UnknownKey {
        /// Which catalog.
        kind: &'static str,
        /// The key that was not found.
        key: String,
    },

    /// A mat-size entry has non-positive or non-finite dimensions.
    #[error("invalid mat size {key}: {reason}")]
    InvalidMatSize {
        /// Offending entry.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A color-scheme accent is not a CSS hex color.
    #[error("invalid accent color for {key}: {value}")]
    InvalidColor {
        /// Offending entry.
        key: String,
        /// The unparseable value.
        value: String,
    },

    /// A required credential is absent from the environment.
    #[error("missing required configuration: {var}")]
    MissingCredential {
        /// Environment variable name.
        var: String,
    },

    /// The configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
