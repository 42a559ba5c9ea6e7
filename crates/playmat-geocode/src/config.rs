//! Geocoder configuration parsed from environment variables.

use crate::types::GeocodeError;

/// Access token variable.
pub const TOKEN_VAR: &str = "MAPBOX_TOKEN";
/// Endpoint override variable.
pub const BASE_URL_VAR: &str = "PLAYMAT_GEOCODER_BASE_URL";
/// Request timeout override variable, in whole seconds.
pub const TIMEOUT_VAR: &str = "PLAYMAT_GEOCODER_TIMEOUT_SECS";

/// Mapbox API root.
pub const DEFAULT_BASE_URL: &str = "https://api.mapbox.com";
/// Whole-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Connect timeout, capped at the request timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
/// Matches requested per query.
pub const DEFAULT_RESULT_LIMIT: u8 = 5;

/// HTTP timeouts in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeocoderTimeouts {
    /// Whole request, including the body.
    pub request_secs: u64,
    /// TCP and TLS connect.
    pub connect_secs: u64,
}

impl Default for GeocoderTimeouts {
    fn default() -> Self {
        Self {
            request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

/// Everything [`crate::MapboxGeocoder`] needs to reach the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocoderConfig {
    /// Mapbox access token, sent as a query parameter.
    pub access_token: String,
    /// API root without a trailing slash.
    pub base_url: String,
    /// HTTP timeouts.
    pub timeouts: GeocoderTimeouts,
    /// Matches requested per query.
    pub limit: u8,
}

impl GeocoderConfig {
    /// Config with default endpoint and timeouts.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeouts: GeocoderTimeouts::default(),
            limit: DEFAULT_RESULT_LIMIT,
        }
    }

    /// Build typed geocoder config from environment variables.
    ///
    /// Required:
    /// - `MAPBOX_TOKEN`
    ///
    /// Optional:
    /// - `PLAYMAT_GEOCODER_BASE_URL`: default `https://api.mapbox.com`
    /// - `PLAYMAT_GEOCODER_TIMEOUT_SECS`: request timeout, default 10
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::MissingToken`] if the token is unset or
    /// blank.
    pub fn from_env() -> Result<Self, GeocodeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`GeocoderConfig::from_env`] over an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::MissingToken`] if the token is unset or
    /// blank.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GeocodeError> {
        let access_token = lookup(TOKEN_VAR)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GeocodeError::MissingToken {
                var: TOKEN_VAR.into(),
            })?;

        let base_url = lookup(BASE_URL_VAR)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let request_secs = lookup(TIMEOUT_VAR)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(Self {
            access_token,
            base_url,
            timeouts: GeocoderTimeouts {
                request_secs,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS.min(request_secs),
            },
            limit: DEFAULT_RESULT_LIMIT,
        })
    }
}
