//! Physical-length to pixel conversions.
//!
//! Two unrelated unit paths live here and must stay separate:
//!
//! - **Print path**: inches/meters → CSS pixels at a fixed DPI and UI
//!   scale. Used for the selection rectangle, which always shows the
//!   same physical area regardless of what the map is doing.
//! - **Map path**: Web-Mercator ground resolution at a given latitude
//!   and zoom. Only for calculations relative to map content.

/// Screen resolution assumed for the print path.
pub const DPI: f64 = 96.0;

/// UI magnification applied on top of [`DPI`] so the selection box is
/// comfortably large on screen.
pub const SCALE: f64 = 2.0;

/// Inches per meter.
pub const INCHES_PER_METER: f64 = 39.3701;

/// Meters per pixel at zoom 0 on the equator for 256-pixel tiles.
pub const EQUATOR_METERS_PER_PIXEL: f64 = 156_543.033_92;

/// Convert a physical length in meters to CSS pixels.
#[must_use]
pub fn meters_to_css_pixels(meters: f64, dpi: f64, scale: f64) -> f64 {
    meters * INCHES_PER_METER * dpi * scale
}

/// Convert a physical length in inches to CSS pixels.
#[must_use]
pub fn inches_to_css_pixels(inches: f64, dpi: f64, scale: f64) -> f64 {
    inches * dpi * scale
}

/// Convert CSS pixels to backing-buffer (device) pixels.
#[must_use]
pub fn css_to_device_pixels(css_pixels: f64, device_pixel_ratio: f64) -> f64 {
    css_pixels * device_pixel_ratio
}

/// Ground distance covered by one CSS pixel at `latitude` and `zoom`.
///
/// Standard Web-Mercator ground resolution. Never use this for the
/// fixed selection rectangle.
#[must_use]
pub fn meters_per_css_pixel_at_zoom(latitude: f64, zoom: f64) -> f64 {
    EQUATOR_METERS_PER_PIXEL * latitude.to_radians().cos() / zoom.exp2()
}
