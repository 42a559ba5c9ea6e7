//! Geocoding results, errors and the provider trait.

use serde::{Deserialize, Serialize};

use playmat_core::SessionEvent;

/// Errors produced by geocoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeocodeError {
    /// The query was empty after trimming.
    #[error("search query is empty")]
    EmptyQuery,

    /// The provider returned no matches.
    #[error("no results for {query:?}")]
    NoResult {
        /// The query as sent.
        query: String,
    },

    /// The access token environment variable is unset or blank.
    #[error("missing geocoder access token: env var {var} not set")]
    MissingToken {
        /// Variable name.
        var: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The request could not be sent or timed out.
    #[error("geocoder request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("geocoder returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response body was not the expected JSON.
    #[error("geocoder response parse failed: {0}")]
    Decode(String),
}

impl GeocodeError {
    /// Whether retrying the same query may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Status { status: 429 | 500..=599, .. }
        )
    }
}

/// One ranked match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// Full place name.
    pub label: String,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Provider relevance in `[0, 1]`, when reported.
    pub relevance: Option<f64>,
}

impl GeocodeResult {
    /// Session event that flies the map to this result.
    #[must_use]
    pub const fn location_event(&self) -> SessionEvent {
        SessionEvent::LocationFound {
            longitude: self.longitude,
            latitude: self.latitude,
        }
    }
}

/// Forward geocoding: free text to ranked locations. Enables mocking in
/// tests.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `query`, best match first.
    ///
    /// # Errors
    ///
    /// Returns a [`GeocodeError`] for empty queries, transport or status
    /// failures, undecodable responses, or when nothing matched.
    async fn forward(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError>;
}
