//! playmat-export: Pure export serializers (sans-IO)
//!
//! Turns a capture into the artifacts handed to downstream consumers:
//! the configuration document JSON, the timestamped file names, and the
//! custom style layers as Mapbox GL style JSON.

pub mod bundle;
pub mod document;
pub mod style_json;

pub use bundle::{ExportBundle, config_file_name, map_file_name};
pub use document::{ExportDocument, NO_ADDRESS};
pub use style_json::{filter_to_json, layer_to_json, layers_to_json};

/// Errors that can occur while serializing an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// JSON serialization failed.
    #[error("failed to serialize export: {0}")]
    Json(#[from] serde_json::Error),
}
