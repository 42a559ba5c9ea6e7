//! Camera control: center, zoom and bearing.
//!
//! The controller owns the session's [`ViewportState`] and pushes every
//! change to the surface as an animated transition. It never touches
//! overlay geometry; a mat-size change leaves the camera exactly where
//! it is.

use std::time::Duration;

use crate::surface::{CameraTarget, RenderSurface, Transition};
use crate::types::ViewportState;

/// Bearing change for one rotate-left/right step.
pub const ROTATION_STEP_DEGREES: f64 = 15.0;

/// Duration of bearing animations.
pub const ROTATE_DURATION: Duration = Duration::from_millis(300);

/// Zoom applied when flying to a geocoded location.
pub const LOCATION_ZOOM: f64 = 17.0;

/// Web-Mercator latitude limit.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Wrap a bearing into `[0, 360)`.
///
/// Non-finite input yields 0.
#[must_use]
pub fn normalize_rotation(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Bearing after rotating `current` by `delta` degrees.
#[must_use]
pub fn rotate_by(current: f64, delta: f64) -> f64 {
    normalize_rotation(current + delta)
}

/// Camera animation started by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Center/zoom fly-to.
    FlyTo,
    /// Bearing change.
    Rotate,
}

/// Applies viewport changes to a render surface.
#[derive(Debug, Clone)]
pub struct ViewportController {
    state: ViewportState,
    active: Option<TransitionKind>,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ViewportState::default())
    }
}

impl ViewportController {
    /// A controller starting from `state`. The rotation is normalized.
    #[must_use]
    pub fn new(state: ViewportState) -> Self {
        Self {
            state: ViewportState {
                rotation_degrees: normalize_rotation(state.rotation_degrees),
                ..state
            },
            active: None,
        }
    }

    /// Current camera state as last commanded or synced.
    #[must_use]
    pub const fn state(&self) -> ViewportState {
        self.state
    }

    /// The transition most recently started and not yet observed to
    /// finish.
    #[must_use]
    pub const fn active_transition(&self) -> Option<TransitionKind> {
        self.active
    }

    /// Whether a camera animation is still running on `surface`.
    pub fn is_transitioning<S: RenderSurface + ?Sized>(&mut self, surface: &S) -> bool {
        if surface.is_moving() {
            return true;
        }
        self.active = None;
        false
    }

    /// Fly to a new center and zoom.
    ///
    /// The transition is marked essential so it still animates when the
    /// platform requests reduced motion. Non-finite coordinates are
    /// ignored; latitude is clamped to the Mercator range.
    pub fn set_center_zoom<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        lng: f64,
        lat: f64,
        zoom: f64,
    ) {
        if !(lng.is_finite() && lat.is_finite() && zoom.is_finite()) {
            log::warn!("ignoring non-finite camera target ({lng}, {lat}) z{zoom}");
            return;
        }
        self.state.center_lng = lng;
        self.state.center_lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        self.state.zoom = zoom;
        surface.fly_to(
            CameraTarget {
                center_lng: self.state.center_lng,
                center_lat: self.state.center_lat,
                zoom,
            },
            Transition {
                duration: None,
                essential: true,
            },
        );
        self.active = Some(TransitionKind::FlyTo);
    }

    /// Animate the bearing to `degrees`, normalized into `[0, 360)`.
    /// Returns the applied bearing.
    pub fn rotate_to<S: RenderSurface + ?Sized>(&mut self, surface: &mut S, degrees: f64) -> f64 {
        let bearing = normalize_rotation(degrees);
        self.state.rotation_degrees = bearing;
        surface.rotate_to(
            bearing,
            Transition {
                duration: Some(ROTATE_DURATION),
                essential: false,
            },
        );
        self.active = Some(TransitionKind::Rotate);
        bearing
    }

    /// Rotate relative to the current bearing.
    pub fn rotate_by<S: RenderSurface + ?Sized>(&mut self, surface: &mut S, delta: f64) -> f64 {
        let target = rotate_by(self.state.rotation_degrees, delta);
        self.rotate_to(surface, target)
    }

    /// Rotate one step counter-clockwise.
    pub fn rotate_left<S: RenderSurface + ?Sized>(&mut self, surface: &mut S) -> f64 {
        self.rotate_by(surface, -ROTATION_STEP_DEGREES)
    }

    /// Rotate one step clockwise.
    pub fn rotate_right<S: RenderSurface + ?Sized>(&mut self, surface: &mut S) -> f64 {
        self.rotate_by(surface, ROTATION_STEP_DEGREES)
    }

    /// Copy the surface camera back after direct manipulation.
    pub fn sync_from_surface<S: RenderSurface + ?Sized>(&mut self, surface: &S) {
        let camera = surface.camera();
        self.state = ViewportState {
            rotation_degrees: normalize_rotation(camera.rotation_degrees),
            ..camera
        };
        if !surface.is_moving() {
            self.active = None;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::MockSurface;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rotate_by_wraps() {
        assert!(close(rotate_by(0.0, -15.0), 345.0));
        assert!(close(rotate_by(345.0, 15.0), 0.0));
        for x in [0.0, 15.0, 90.0, 345.0, 359.5] {
            assert!(close(rotate_by(x, 360.0), x), "{x}");
            assert!(close(rotate_by(x, -360.0), x), "{x}");
        }
    }

    #[test]
    fn normalize_stays_in_range() {
        for d in [-720.0, -1e-15, -0.0, 0.0, 359.999, 360.0, 1e9, -1e9] {
            let n = normalize_rotation(d);
            assert!((0.0..360.0).contains(&n), "{d} -> {n}");
        }
        assert!(close(normalize_rotation(f64::NAN), 0.0));
        assert!(close(normalize_rotation(-90.0), 270.0));
    }

    #[test]
    fn rotate_left_from_zero() {
        let mut surface = MockSurface::with_base_layers(&[]);
        let mut controller = ViewportController::default();
        let bearing = controller.rotate_left(&mut surface);
        assert!(close(bearing, 345.0));
        assert!(close(controller.state().rotation_degrees, 345.0));
        let (applied, transition) = surface.rotate_calls[0];
        assert!(close(applied, 345.0));
        assert_eq!(transition.duration, Some(Duration::from_millis(300)));
    }

    #[test]
    fn rotate_right_twice() {
        let mut surface = MockSurface::with_base_layers(&[]);
        let mut controller = ViewportController::default();
        controller.rotate_right(&mut surface);
        let bearing = controller.rotate_right(&mut surface);
        assert!(close(bearing, 30.0));
    }

    #[test]
    fn fly_to_is_essential() {
        let mut surface = MockSurface::with_base_layers(&[]);
        let mut controller = ViewportController::default();
        controller.set_center_zoom(&mut surface, -73.9855, 40.758, 17.0);
        let (target, transition) = surface.fly_calls[0];
        assert!(transition.essential);
        assert!(close(target.zoom, 17.0));
        assert!(close(controller.state().center_lat, 40.758));
        assert_eq!(controller.active_transition(), Some(TransitionKind::FlyTo));
        assert!(controller.is_transitioning(&surface));

        surface.settle();
        assert!(!controller.is_transitioning(&surface));
        assert_eq!(controller.active_transition(), None);
    }

    #[test]
    fn non_finite_target_is_ignored() {
        let mut surface = MockSurface::with_base_layers(&[]);
        let mut controller = ViewportController::default();
        controller.set_center_zoom(&mut surface, f64::NAN, 0.0, 10.0);
        assert!(surface.fly_calls.is_empty());
        assert_eq!(controller.state(), ViewportState::default());
    }

    #[test]
    fn latitude_is_clamped() {
        let mut surface = MockSurface::with_base_layers(&[]);
        let mut controller = ViewportController::default();
        controller.set_center_zoom(&mut surface, 0.0, 89.0, 3.0);
        assert!(close(controller.state().center_lat, MAX_LATITUDE));
    }

    #[test]
    fn sync_copies_surface_camera() {
        let mut surface = MockSurface::with_base_layers(&[]);
        surface.camera = ViewportState {
            center_lng: 2.35,
            center_lat: 48.85,
            zoom: 16.25,
            rotation_degrees: -30.0,
            pitch_degrees: 0.0,
        };
        let mut controller = ViewportController::default();
        controller.sync_from_surface(&surface);
        let state = controller.state();
        assert!(close(state.center_lng, 2.35));
        assert!(close(state.zoom, 16.25));
        assert!(close(state.rotation_degrees, 330.0));
    }
}
