//! Static mat-size and color-scheme catalogs.
//!
//! The built-in tables match the product line. A JSON document with the
//! same shape can replace them; it is validated before use.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::types::{ColorScheme, ConfigError, MatSizeSpec};

/// Key of the mat size a fresh session starts with.
pub const DEFAULT_MAT_SIZE_KEY: &str = "small";

/// Key of the color scheme a fresh session starts with.
pub const DEFAULT_COLOR_SCHEME_KEY: &str = "classic";

/// The set of selectable mat sizes and color schemes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Mat sizes, smallest first.
    pub mat_sizes: Vec<MatSizeSpec>,
    /// Color schemes.
    pub color_schemes: Vec<ColorScheme>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            mat_sizes: vec![
                mat_size("small", "Small", 1.0, 2.0, "39\" × 79\" (1m × 2m)"),
                mat_size("medium", "Medium", 1.5, 2.0, "59\" × 79\" (1.5m × 2m)"),
                mat_size("large", "Large", 2.0, 3.0, "79\" × 118\" (2m × 3m)"),
            ],
            color_schemes: vec![
                color_scheme("classic", "Classic", "#10b981"),
                color_scheme("muted", "Muted", "#64748b"),
                color_scheme("neon", "Neon Vibrant", "#ec4899"),
            ],
        }
    }
}

fn mat_size(key: &str, name: &str, width: f64, height: f64, dims: &str) -> MatSizeSpec {
    MatSizeSpec {
        key: key.to_string(),
        display_name: name.to_string(),
        physical_width_meters: width,
        physical_height_meters: height,
        display_dimensions: dims.to_string(),
    }
}

fn color_scheme(key: &str, name: &str, accent: &str) -> ColorScheme {
    ColorScheme {
        key: key.to_string(),
        display_name: name.to_string(),
        accent_color: accent.to_string(),
    }
}

impl Catalog {
    /// Parse and validate a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any error
    /// from [`Catalog::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check that both tables are non-empty, keys are unique, sizes are
    /// positive and finite, and accent colors parse.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mat_sizes.is_empty() {
            return Err(ConfigError::EmptyCatalog { kind: "mat size" });
        }
        if self.color_schemes.is_empty() {
            return Err(ConfigError::EmptyCatalog {
                kind: "color scheme",
            });
        }

        let mut seen = HashSet::new();
        for spec in &self.mat_sizes {
            if !seen.insert(spec.key.to_lowercase()) {
                return Err(ConfigError::DuplicateKey {
                    kind: "mat size",
                    key: spec.key.clone(),
                });
            }
            for (label, value) in [
                ("width", spec.physical_width_meters),
                ("height", spec.physical_height_meters),
            ] {
                if !value.is_finite() || value <= 0.0 {
                    return Err(ConfigError::InvalidMatSize {
                        key: spec.key.clone(),
                        reason: format!("{label} must be positive and finite, got {value}"),
                    });
                }
            }
        }

        let mut seen = HashSet::new();
        for scheme in &self.color_schemes {
            if !seen.insert(scheme.key.to_lowercase()) {
                return Err(ConfigError::DuplicateKey {
                    kind: "color scheme",
                    key: scheme.key.clone(),
                });
            }
            if scheme.accent_color.parse::<Rgb>().is_err() {
                return Err(ConfigError::InvalidColor {
                    key: scheme.key.clone(),
                    value: scheme.accent_color.clone(),
                });
            }
        }
        Ok(())
    }

    /// Look up a mat size by key, case-insensitively.
    #[must_use]
    pub fn mat_size(&self, key: &str) -> Option<&MatSizeSpec> {
        self.mat_sizes
            .iter()
            .find(|s| s.key.eq_ignore_ascii_case(key))
    }

    /// Look up a color scheme by key, case-insensitively.
    #[must_use]
    pub fn color_scheme(&self, key: &str) -> Option<&ColorScheme> {
        self.color_schemes
            .iter()
            .find(|c| c.key.eq_ignore_ascii_case(key))
    }

    /// Look up a mat size, reporting unknown keys as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] when `key` is not in the table.
    pub fn require_mat_size(&self, key: &str) -> Result<&MatSizeSpec, ConfigError> {
        self.mat_size(key).ok_or_else(|| ConfigError::UnknownKey {
            kind: "mat size",
            key: key.to_string(),
        })
    }

    /// Look up a color scheme, reporting unknown keys as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] when `key` is not in the table.
    pub fn require_color_scheme(&self, key: &str) -> Result<&ColorScheme, ConfigError> {
        self.color_scheme(key).ok_or_else(|| ConfigError::UnknownKey {
            kind: "color scheme",
            key: key.to_string(),
        })
    }
}
