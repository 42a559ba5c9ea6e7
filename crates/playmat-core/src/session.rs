//! Session state and the event dispatcher.
//!
//! [`Session`] owns the only mutable copies of the selected mat size,
//! color scheme and viewport. Every user or surface event goes through
//! [`Session::on_event`], which is the single place derived values
//! (overlay geometry, road widths, layer plans) are recomputed. Nothing
//! derived is cached, so a size change can never leave stale geometry
//! behind.

use serde::{Deserialize, Serialize};

use crate::capture::{self, CaptureError, CaptureOutput};
use crate::catalog::{Catalog, DEFAULT_COLOR_SCHEME_KEY, DEFAULT_MAT_SIZE_KEY};
use crate::overlay::{
    OverlayGeometry, OverlayMode, RoadWidthPolicy, SelectionBox, compute_overlay_geometry,
    compute_road_width_policy,
};
use crate::style::{StyleSynthesizer, SynthesisOutcome, SynthesizerState};
use crate::surface::RenderSurface;
use crate::types::{ColorScheme, ConfigError, ConfigSnapshot, MatSizeSpec, ViewportState};
use crate::viewport::{LOCATION_ZOOM, ViewportController};

/// Initial selections for a new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    /// Mat-size key.
    pub mat_size: String,
    /// Color-scheme key.
    pub color_scheme: String,
    /// Starting camera.
    pub viewport: ViewportState,
    /// Selection rectangle mode.
    pub overlay_mode: OverlayMode,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            mat_size: DEFAULT_MAT_SIZE_KEY.to_string(),
            color_scheme: DEFAULT_COLOR_SCHEME_KEY.to_string(),
            viewport: ViewportState::default(),
            overlay_mode: OverlayMode::default(),
        }
    }
}

/// Everything that can change session state.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The surface finished loading its base style.
    StyleLoaded,
    /// The surface camera moved by direct manipulation.
    SurfaceMoved,
    /// The user picked a mat size by key.
    SelectMatSize(String),
    /// The user picked a color scheme by key.
    SelectColorScheme(String),
    /// Fly to an explicit center and zoom.
    SetCenterZoom {
        /// Longitude in degrees.
        lng: f64,
        /// Latitude in degrees.
        lat: f64,
        /// Zoom level.
        zoom: f64,
    },
    /// Set an absolute bearing.
    RotateTo(f64),
    /// Rotate by a relative amount.
    RotateBy(f64),
    /// Rotate one step counter-clockwise.
    RotateLeft,
    /// Rotate one step clockwise.
    RotateRight,
    /// An address search resolved to a location.
    LocationFound {
        /// Longitude in degrees.
        longitude: f64,
        /// Latitude in degrees.
        latitude: f64,
    },
}

/// Interactive session over one render surface.
#[derive(Debug, Clone)]
pub struct Session {
    catalog: Catalog,
    mat_size: MatSizeSpec,
    color_scheme: ColorScheme,
    overlay_mode: OverlayMode,
    viewport: ViewportController,
    synthesizer: StyleSynthesizer,
}

impl Session {
    /// Start a session.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the catalog is invalid or a default
    /// key is not in it.
    pub fn new(catalog: Catalog, defaults: &SessionDefaults) -> Result<Self, ConfigError> {
        catalog.validate()?;
        let mat_size = catalog.require_mat_size(&defaults.mat_size)?.clone();
        let color_scheme = catalog.require_color_scheme(&defaults.color_scheme)?.clone();
        Ok(Self {
            catalog,
            mat_size,
            color_scheme,
            overlay_mode: defaults.overlay_mode,
            viewport: ViewportController::new(defaults.viewport),
            synthesizer: StyleSynthesizer::new(),
        })
    }

    /// The catalog the session selects from.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Selected mat size.
    #[must_use]
    pub const fn mat_size(&self) -> &MatSizeSpec {
        &self.mat_size
    }

    /// Selected color scheme.
    #[must_use]
    pub const fn color_scheme(&self) -> &ColorScheme {
        &self.color_scheme
    }

    /// Current camera state.
    #[must_use]
    pub const fn viewport(&self) -> ViewportState {
        self.viewport.state()
    }

    /// Selection rectangle mode.
    #[must_use]
    pub const fn overlay_mode(&self) -> OverlayMode {
        self.overlay_mode
    }

    /// Switch the selection rectangle mode. Road widths are unaffected.
    pub const fn set_overlay_mode(&mut self, mode: OverlayMode) {
        self.overlay_mode = mode;
    }

    /// Lifecycle state of the thematic style.
    #[must_use]
    pub const fn style_state(&self) -> SynthesizerState {
        self.synthesizer.state()
    }

    /// Fixed print-area rectangle for the selected size. Captures and
    /// road widths always use this, whatever the overlay mode.
    #[must_use]
    pub fn print_area(&self) -> OverlayGeometry {
        compute_overlay_geometry(&self.mat_size)
    }

    /// Current on-screen selection rectangle.
    #[must_use]
    pub fn overlay_geometry(&self) -> OverlayGeometry {
        self.overlay_mode
            .geometry(&self.mat_size, &self.viewport.state())
    }

    /// Road widths for the selected size.
    #[must_use]
    pub fn road_widths(&self) -> RoadWidthPolicy {
        compute_road_width_policy(&self.mat_size, &self.print_area())
    }

    /// Decoration for the on-screen selection rectangle.
    #[must_use]
    pub fn selection_box(&self) -> SelectionBox {
        SelectionBox::new(&self.mat_size, &self.color_scheme, self.overlay_geometry())
    }

    /// Configuration to attach to a capture.
    #[must_use]
    pub fn snapshot(&self) -> ConfigSnapshot {
        let viewport = self.viewport.state();
        ConfigSnapshot {
            mat_size: self.mat_size.clone(),
            color_scheme: self.color_scheme.clone(),
            rotation_degrees: viewport.rotation_degrees,
            viewport,
        }
    }

    /// Apply one event.
    ///
    /// Returns the style synthesis outcome when the event triggered a
    /// (re)build.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] when a selection names a key
    /// missing from the catalog; the session is left unchanged.
    pub fn on_event<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        event: SessionEvent,
    ) -> Result<Option<SynthesisOutcome>, ConfigError> {
        match event {
            SessionEvent::StyleLoaded => {
                let widths = self.road_widths();
                return Ok(Some(self.synthesizer.on_style_loaded(surface, &widths)));
            }
            SessionEvent::SurfaceMoved => self.viewport.sync_from_surface(surface),
            SessionEvent::SelectMatSize(key) => {
                let spec = self.catalog.require_mat_size(&key)?;
                if spec.key == self.mat_size.key {
                    return Ok(None);
                }
                log::info!("mat size changed: {} -> {}", self.mat_size.key, spec.key);
                self.mat_size = spec.clone();
                let widths = self.road_widths();
                return Ok(Some(self.synthesizer.on_mat_size_changed(surface, &widths)));
            }
            SessionEvent::SelectColorScheme(key) => {
                self.color_scheme = self.catalog.require_color_scheme(&key)?.clone();
            }
            SessionEvent::SetCenterZoom { lng, lat, zoom } => {
                self.viewport.set_center_zoom(surface, lng, lat, zoom);
            }
            SessionEvent::RotateTo(degrees) => {
                self.viewport.rotate_to(surface, degrees);
            }
            SessionEvent::RotateBy(delta) => {
                self.viewport.rotate_by(surface, delta);
            }
            SessionEvent::RotateLeft => {
                self.viewport.rotate_left(surface);
            }
            SessionEvent::RotateRight => {
                self.viewport.rotate_right(surface);
            }
            SessionEvent::LocationFound {
                longitude,
                latitude,
            } => {
                self.viewport
                    .set_center_zoom(surface, longitude, latitude, LOCATION_ZOOM);
            }
        }
        Ok(None)
    }

    /// Capture the current print area.
    ///
    /// The crop is the fixed [`Self::print_area`]; the overlay mode only
    /// changes the on-screen decoration.
    ///
    /// # Errors
    ///
    /// See [`capture::capture`].
    pub fn capture<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &S,
    ) -> Result<CaptureOutput, CaptureError> {
        if self.viewport.is_transitioning(surface) {
            return Err(CaptureError::TransitionInProgress);
        }
        capture::capture(surface, &self.print_area(), self.snapshot())
    }
}
