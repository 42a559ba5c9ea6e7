//! Mapbox Places forward-geocoding client.
//!
//! Thin HTTP wrapper for `/geocoding/v5/mapbox.places/{query}.json`.
//! URL building and response parsing are pure functions for testability.

use std::time::Duration;

use reqwest::Url;

use crate::config::GeocoderConfig;
use crate::types::{GeocodeError, GeocodeResult, Geocoder};

// =============================================================================
// CLIENT
// =============================================================================

/// [`Geocoder`] over the Mapbox Places forward-geocoding endpoint.
pub struct MapboxGeocoder {
    http: reqwest::Client,
    config: GeocoderConfig,
}

impl MapboxGeocoder {
    /// Build the HTTP client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::ClientBuild`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: GeocoderConfig) -> Result<Self, GeocodeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| GeocodeError::ClientBuild(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &GeocoderConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Geocoder for MapboxGeocoder {
    async fn forward(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }

        let url = places_url(&self.config, query)?;
        log::debug!("geocoding {query:?}");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GeocodeError::Transport(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GeocodeError::Transport(e.without_url().to_string()))?;

        if status != 200 {
            log::warn!("geocoder returned status {status} for {query:?}");
            return Err(GeocodeError::Status { status, body: text });
        }

        let results = parse_places_response(&text, query)?;
        log::debug!("geocoding {query:?}: {} result(s)", results.len());
        Ok(results)
    }
}

// =============================================================================
// URL
// =============================================================================

/// Request URL for a forward lookup of `query`.
///
/// The query is a single percent-encoded path segment, so `/` and `#` in
/// free text cannot escape it.
///
/// # Errors
///
/// Returns [`GeocodeError::Transport`] if the configured base URL is not
/// an absolute hierarchical URL.
pub fn places_url(config: &GeocoderConfig, query: &str) -> Result<Url, GeocodeError> {
    let mut url = Url::parse(&config.base_url)
        .map_err(|e| GeocodeError::Transport(format!("invalid base URL: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| GeocodeError::Transport("base URL cannot have a path".into()))?
        .pop_if_empty()
        .extend(["geocoding", "v5", "mapbox.places", format!("{query}.json").as_str()]);
    url.query_pairs_mut()
        .append_pair("access_token", &config.access_token)
        .append_pair("limit", &config.limit.to_string());
    Ok(url)
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<PlaceFeature>,
}

#[derive(serde::Deserialize)]
struct PlaceFeature {
    #[serde(default)]
    place_name: String,
    #[serde(default)]
    center: Vec<f64>,
    relevance: Option<f64>,
}

// =============================================================================
// PARSING
// =============================================================================

/// Ranked results from a Places response body. Features without a
/// two-element `center` are skipped.
///
/// # Errors
///
/// Returns [`GeocodeError::Decode`] for malformed JSON and
/// [`GeocodeError::NoResult`] when no usable feature remains.
pub fn parse_places_response(json: &str, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
    let api: PlacesResponse =
        serde_json::from_str(json).map_err(|e| GeocodeError::Decode(e.to_string()))?;

    let results: Vec<GeocodeResult> = api
        .features
        .into_iter()
        .filter_map(|f| match f.center.as_slice() {
            [lng, lat] if lng.is_finite() && lat.is_finite() => Some(GeocodeResult {
                label: f.place_name,
                longitude: *lng,
                latitude: *lat,
                relevance: f.relevance,
            }),
            _ => None,
        })
        .collect();

    if results.is_empty() {
        return Err(GeocodeError::NoResult {
            query: query.to_string(),
        });
    }
    Ok(results)
}
