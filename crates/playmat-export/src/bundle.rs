//! Export file naming and the image + document pair.

use chrono::{DateTime, Utc};

use playmat_core::CaptureOutput;

use crate::ExportError;
use crate::document::ExportDocument;

/// Prefix shared by every exported file.
pub const FILE_PREFIX: &str = "playmat";

/// `playmat-config-<unix millis>.json`
#[must_use]
pub fn config_file_name(at: DateTime<Utc>) -> String {
    format!("{FILE_PREFIX}-config-{}.json", at.timestamp_millis())
}

/// `playmat-map-<unix millis>.png`
#[must_use]
pub fn map_file_name(at: DateTime<Utc>) -> String {
    format!("{FILE_PREFIX}-map-{}.png", at.timestamp_millis())
}

/// Everything an export consumer writes out for one capture.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    /// File name for the configuration document.
    pub config_file_name: String,
    /// Pretty-printed configuration document.
    pub config_json: String,
    /// File name for the map image.
    pub map_file_name: String,
    /// PNG bytes, exactly as captured.
    pub png: Vec<u8>,
}

impl ExportBundle {
    /// Package a capture. Both file names share the same timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Json`] if the document cannot be
    /// serialized.
    pub fn new(
        capture: &CaptureOutput,
        address: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Self, ExportError> {
        let document = ExportDocument::new(&capture.snapshot, address, at);
        Ok(Self {
            config_file_name: config_file_name(at),
            config_json: document.to_json_pretty()?,
            map_file_name: map_file_name(at),
            png: capture.png.clone(),
        })
    }
}
