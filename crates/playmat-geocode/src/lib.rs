//! playmat-geocode: address search for the mat designer.
//!
//! [`Geocoder`] turns free text into ranked locations. [`MapboxGeocoder`]
//! implements it over the Mapbox Places API, and [`DebouncedSearch`]
//! drives any geocoder from keystrokes: queries wait out a quiet period
//! and only the most recent search ever delivers a result.
//!
//! A result becomes a [`playmat_core::SessionEvent::LocationFound`] via
//! [`GeocodeResult::location_event`].

pub mod client;
pub mod config;
pub mod debounce;
pub mod types;

pub use client::{MapboxGeocoder, parse_places_response, places_url};
pub use config::{GeocoderConfig, GeocoderTimeouts};
pub use debounce::{DEFAULT_DEBOUNCE, DebouncedSearch, SearchOutcome};
pub use types::{GeocodeError, GeocodeResult, Geocoder};
