//! Web-Mercator camera projection.
//!
//! World coordinates use 256-pixel tiles, the same convention as the GL
//! engines, so ground distances agree with
//! [`playmat_core::units::meters_per_css_pixel_at_zoom`].

use std::f64::consts::PI;

use geo::Coord;

use playmat_core::ViewportState;
use playmat_core::viewport::MAX_LATITUDE;

/// Tile edge in CSS pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Maps (longitude, latitude) to device pixels for one camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    center: Coord<f64>,
    world_size: f64,
    cos_bearing: f64,
    sin_bearing: f64,
    half_width: f64,
    half_height: f64,
    device_pixel_ratio: f64,
}

/// Position on the zoom-0 world square, in `[0, 1]`.
#[must_use]
pub fn mercator_unit(lng: f64, lat: f64) -> Coord<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Coord {
        x: (lng + 180.0) / 360.0,
        y: (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0,
    }
}

impl Projector {
    /// Projector for `camera` on a viewport of `css_width × css_height`
    /// CSS pixels.
    #[must_use]
    pub fn new(
        camera: &ViewportState,
        css_width: f64,
        css_height: f64,
        device_pixel_ratio: f64,
    ) -> Self {
        let world_size = TILE_SIZE * camera.zoom.exp2();
        let unit = mercator_unit(camera.center_lng, camera.center_lat);
        let bearing = camera.rotation_degrees.to_radians();
        Self {
            center: Coord {
                x: unit.x * world_size,
                y: unit.y * world_size,
            },
            world_size,
            cos_bearing: bearing.cos(),
            sin_bearing: bearing.sin(),
            half_width: css_width / 2.0,
            half_height: css_height / 2.0,
            device_pixel_ratio,
        }
    }

    /// Device-pixel position of a (longitude, latitude) coordinate.
    ///
    /// A positive bearing turns the map counter-clockwise: with bearing
    /// 90 east points up.
    #[must_use]
    pub fn project(&self, lng_lat: Coord<f64>) -> Coord<f64> {
        let unit = mercator_unit(lng_lat.x, lng_lat.y);
        let dx = unit.x.mul_add(self.world_size, -self.center.x);
        let dy = unit.y.mul_add(self.world_size, -self.center.y);
        let rx = dx.mul_add(self.cos_bearing, dy * self.sin_bearing);
        let ry = dy.mul_add(self.cos_bearing, -dx * self.sin_bearing);
        Coord {
            x: (self.half_width + rx) * self.device_pixel_ratio,
            y: (self.half_height + ry) * self.device_pixel_ratio,
        }
    }
}
