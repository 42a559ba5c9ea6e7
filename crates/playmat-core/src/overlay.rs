//! Selection-rectangle geometry and road line widths.
//!
//! Everything here is a pure function of the selected [`MatSizeSpec`].
//! In particular the overlay never looks at the viewport: the rectangle
//! always stands for the same physical print area, and only the map
//! content underneath it changes with pan and zoom.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::types::{ColorScheme, MatSizeSpec, ViewportState};
use crate::units::{DPI, SCALE, inches_to_css_pixels, meters_per_css_pixel_at_zoom};

/// On-screen inch dimensions of the selection rectangle per size key.
///
/// These are landscape boxes and deliberately do not follow the
/// physical width/height of the mat (the capture is always taken in a
/// fixed landscape orientation). Keep the values as they are.
const OVERLAY_INCHES: [(&str, f64, f64); 3] = [
    ("small", 2.0, 1.0),
    ("medium", 2.0, 1.5),
    ("large", 3.0, 2.0),
];

/// Physical road width on the printed mat: 2 inches, in meters.
pub const STREET_WIDTH_METERS: f64 = 0.0508;

/// Centerlines never get thinner than this, so they stay visible on the
/// smallest mats.
pub const MIN_CENTERLINE_PX: f64 = 1.0;

/// Minimum total edge thickness added by the road casing.
pub const MIN_CASING_EDGE_PX: f64 = 4.0;

/// Size of the selection rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayGeometry {
    /// Width in CSS pixels.
    pub css_width_px: f64,
    /// Height in CSS pixels.
    pub css_height_px: f64,
}

/// Compute the fixed-size selection rectangle for a mat size.
///
/// Unknown keys fall back to the smallest entry of the inch table.
#[must_use]
pub fn compute_overlay_geometry(spec: &MatSizeSpec) -> OverlayGeometry {
    let (_, width_in, height_in) = OVERLAY_INCHES
        .iter()
        .find(|(key, _, _)| spec.key.eq_ignore_ascii_case(key))
        .copied()
        .unwrap_or(OVERLAY_INCHES[0]);

    OverlayGeometry {
        css_width_px: inches_to_css_pixels(width_in, DPI, SCALE),
        css_height_px: inches_to_css_pixels(height_in, DPI, SCALE),
    }
}

/// Whether the on-screen selection rectangle follows the fixed print
/// area or the ground area under the current zoom. Captures always use
/// the fixed print area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlayMode {
    /// Constant on-screen size standing for the print area.
    #[default]
    FixedPhysical,
    /// Box covering the mat's real ground footprint at the current
    /// latitude and zoom. Grows and shrinks with the map.
    TrackZoom,
}

impl OverlayMode {
    /// Compute the rectangle for this mode.
    ///
    /// Only [`OverlayMode::TrackZoom`] reads the viewport.
    #[must_use]
    pub fn geometry(self, spec: &MatSizeSpec, viewport: &ViewportState) -> OverlayGeometry {
        match self {
            Self::FixedPhysical => compute_overlay_geometry(spec),
            Self::TrackZoom => compute_zoom_tracking_geometry(spec, viewport),
        }
    }
}

/// Rectangle covering the mat's physical footprint on the ground at the
/// viewport's latitude and zoom.
#[must_use]
pub fn compute_zoom_tracking_geometry(
    spec: &MatSizeSpec,
    viewport: &ViewportState,
) -> OverlayGeometry {
    let meters_per_px = meters_per_css_pixel_at_zoom(viewport.center_lat, viewport.zoom);
    if !meters_per_px.is_finite() || meters_per_px <= 0.0 {
        return OverlayGeometry {
            css_width_px: 0.0,
            css_height_px: 0.0,
        };
    }
    OverlayGeometry {
        css_width_px: spec.physical_width_meters / meters_per_px,
        css_height_px: spec.physical_height_meters / meters_per_px,
    }
}

/// Line widths, in CSS pixels, for each road feature kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadWidthPolicy {
    /// Road surface fill width (same as `street`).
    pub base: f64,
    /// Highway width, 1.5 × street.
    pub highway: f64,
    /// Regular street width.
    pub street: f64,
    /// Sidewalk width, a quarter of a street.
    pub sidewalk: f64,
    /// Dashed centerline width, never below [`MIN_CENTERLINE_PX`].
    pub centerline: f64,
    /// Crosswalk stripe width.
    pub crosswalk: f64,
}

impl RoadWidthPolicy {
    /// Width of the white road casing drawn under the road fill.
    #[must_use]
    pub fn casing(&self) -> f64 {
        self.street + (self.street * 0.16).max(MIN_CASING_EDGE_PX)
    }
}

/// Scale the real-world road widths into the selection rectangle.
///
/// The rectangle's width in pixels is mapped onto the mat's physical
/// width, and a 2-inch street is expressed in those pixels. Degenerate
/// physical widths produce zero-width roads rather than an error.
#[must_use]
pub fn compute_road_width_policy(spec: &MatSizeSpec, geometry: &OverlayGeometry) -> RoadWidthPolicy {
    let pixels_per_meter = geometry.css_width_px / spec.physical_width_meters;
    let pixels_per_meter = if pixels_per_meter.is_finite() && pixels_per_meter > 0.0 {
        pixels_per_meter
    } else {
        0.0
    };

    let street = STREET_WIDTH_METERS * pixels_per_meter;
    RoadWidthPolicy {
        base: street,
        highway: street * 1.5,
        street,
        sidewalk: street * 0.25,
        centerline: (street * 0.15).max(MIN_CENTERLINE_PX),
        crosswalk: street * 0.6,
    }
}

/// Accent used when a color scheme carries an unparseable color.
const FALLBACK_ACCENT: Rgb = Rgb::new(0x10, 0xB9, 0x81);

/// Decoration of the on-screen selection rectangle.
///
/// Purely cosmetic; never composited into a capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionBox {
    /// Rectangle size.
    pub geometry: OverlayGeometry,
    /// Border and label color.
    pub accent: Rgb,
    /// Border thickness in CSS pixels.
    pub border_px: f64,
    /// Corner radius in CSS pixels.
    pub corner_radius_px: f64,
    /// Text under the rectangle.
    pub label: String,
    /// Vertical distance from the rectangle center to the label center.
    pub label_offset_px: f64,
}

impl SelectionBox {
    /// Border thickness.
    pub const BORDER_PX: f64 = 4.0;
    /// Corner radius.
    pub const CORNER_RADIUS_PX: f64 = 16.0;
    /// Gap between the rectangle's bottom edge and the label center.
    pub const LABEL_GAP_PX: f64 = 30.0;

    /// Describe the selection rectangle for a size and color scheme.
    #[must_use]
    pub fn new(spec: &MatSizeSpec, scheme: &ColorScheme, geometry: OverlayGeometry) -> Self {
        let accent = scheme.accent_color.parse().unwrap_or_else(|e| {
            log::warn!("color scheme {}: {e}; using fallback accent", scheme.key);
            FALLBACK_ACCENT
        });
        Self {
            geometry,
            accent,
            border_px: Self::BORDER_PX,
            corner_radius_px: Self::CORNER_RADIUS_PX,
            label: format!(
                "Print Area: {} ({})",
                spec.display_name, spec.display_dimensions
            ),
            label_offset_px: geometry.css_height_px / 2.0 + Self::LABEL_GAP_PX,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn small_is_384_by_192() {
        let catalog = Catalog::default();
        let g = compute_overlay_geometry(catalog.mat_size("small").unwrap());
        assert!(close(g.css_width_px, 384.0, 1e-9));
        assert!(close(g.css_height_px, 192.0, 1e-9));
    }

    #[test]
    fn medium_and_large_follow_inch_table() {
        let catalog = Catalog::default();
        let medium = compute_overlay_geometry(catalog.mat_size("medium").unwrap());
        assert!(close(medium.css_width_px, 384.0, 1e-9));
        assert!(close(medium.css_height_px, 288.0, 1e-9));
        let large = compute_overlay_geometry(catalog.mat_size("large").unwrap());
        assert!(close(large.css_width_px, 576.0, 1e-9));
        assert!(close(large.css_height_px, 384.0, 1e-9));
    }

    #[test]
    fn unknown_key_falls_back_to_small() {
        let mut spec = Catalog::default().mat_sizes[2].clone();
        spec.key = "gigantic".to_string();
        let g = compute_overlay_geometry(&spec);
        assert!(close(g.css_width_px, 384.0, 1e-9));
        assert!(close(g.css_height_px, 192.0, 1e-9));
    }

    #[test]
    fn geometry_is_independent_of_viewport() {
        let catalog = Catalog::default();
        let viewports = [
            ViewportState::default(),
            ViewportState {
                zoom: 3.0,
                ..ViewportState::default()
            },
            ViewportState {
                zoom: 21.5,
                center_lng: 139.69,
                center_lat: 35.68,
                rotation_degrees: 270.0,
                pitch_degrees: 45.0,
            },
            ViewportState {
                center_lat: -85.0,
                rotation_degrees: 359.9,
                ..ViewportState::default()
            },
        ];
        for spec in &catalog.mat_sizes {
            let reference = compute_overlay_geometry(spec);
            for viewport in &viewports {
                let g = OverlayMode::FixedPhysical.geometry(spec, viewport);
                assert_eq!(g, reference, "{} changed with {viewport:?}", spec.key);
            }
        }
    }

    #[test]
    fn small_road_widths() {
        let catalog = Catalog::default();
        let spec = catalog.mat_size("small").unwrap();
        let w = compute_road_width_policy(spec, &compute_overlay_geometry(spec));
        assert!(close(w.street, 19.5072, 1e-9));
        assert!(close(w.base, w.street, 1e-12));
        assert!(close(w.highway, 29.2608, 1e-9));
        assert!(close(w.sidewalk, 4.8768, 1e-9));
        assert!(close(w.centerline, 2.92608, 1e-9));
        assert!(close(w.crosswalk, 11.70432, 1e-9));
    }

    #[test]
    fn highway_is_one_and_a_half_streets() {
        for spec in &Catalog::default().mat_sizes {
            let w = compute_road_width_policy(spec, &compute_overlay_geometry(spec));
            assert!(close(w.highway, 1.5 * w.street, 1e-12), "{}", spec.key);
        }
    }

    #[test]
    fn centerline_never_below_one_pixel() {
        for spec in &Catalog::default().mat_sizes {
            let w = compute_road_width_policy(spec, &compute_overlay_geometry(spec));
            assert!(w.centerline >= 1.0, "{}", spec.key);
        }
        // A huge mat squeezed into the small box gives hairline roads.
        let mut spec = Catalog::default().mat_sizes[0].clone();
        spec.physical_width_meters = 100.0;
        let w = compute_road_width_policy(&spec, &compute_overlay_geometry(&spec));
        assert!(w.street * 0.15 < 1.0);
        assert!(close(w.centerline, 1.0, f64::EPSILON));
    }

    #[test]
    fn degenerate_width_gives_zero_policy() {
        let mut spec = Catalog::default().mat_sizes[0].clone();
        spec.physical_width_meters = 0.0;
        let w = compute_road_width_policy(&spec, &compute_overlay_geometry(&spec));
        assert!(w.street.abs() < f64::EPSILON);
        assert!(close(w.centerline, 1.0, f64::EPSILON));
        assert!(w.highway.is_finite());
    }

    #[test]
    fn casing_adds_at_least_four_pixels() {
        let catalog = Catalog::default();
        let spec = catalog.mat_size("small").unwrap();
        let w = compute_road_width_policy(spec, &compute_overlay_geometry(spec));
        // 0.16 × 19.5 ≈ 3.1 < 4, so the floor applies.
        assert!(close(w.casing(), w.street + 4.0, 1e-9));

        let wide = RoadWidthPolicy {
            street: 50.0,
            ..w
        };
        assert!(close(wide.casing(), 58.0, 1e-9));
    }

    #[test]
    fn zoom_tracking_grows_with_zoom() {
        let spec = Catalog::default().mat_sizes[0].clone();
        let z17 = ViewportState {
            zoom: 17.0,
            ..ViewportState::default()
        };
        let z18 = ViewportState {
            zoom: 18.0,
            ..ViewportState::default()
        };
        let a = OverlayMode::TrackZoom.geometry(&spec, &z17);
        let b = OverlayMode::TrackZoom.geometry(&spec, &z18);
        assert!(close(b.css_width_px / a.css_width_px, 2.0, 1e-9));
        // Physical aspect, not the inch table.
        assert!(close(a.css_height_px / a.css_width_px, 2.0, 1e-9));
    }

    #[test]
    fn selection_box_label_and_offset() {
        let catalog = Catalog::default();
        let spec = catalog.mat_size("small").unwrap();
        let scheme = catalog.color_scheme("neon").unwrap();
        let b = SelectionBox::new(spec, scheme, compute_overlay_geometry(spec));
        assert_eq!(b.label, "Print Area: Small (39\" × 79\" (1m × 2m))");
        assert!(close(b.label_offset_px, 126.0, 1e-9));
        assert_eq!(b.accent, Rgb::new(0xEC, 0x48, 0x99));
    }

    #[test]
    fn selection_box_bad_accent_falls_back() {
        let catalog = Catalog::default();
        let spec = catalog.mat_size("small").unwrap();
        let scheme = ColorScheme {
            key: "odd".to_string(),
            display_name: "Odd".to_string(),
            accent_color: "teal".to_string(),
        };
        let b = SelectionBox::new(spec, &scheme, compute_overlay_geometry(spec));
        assert_eq!(b.accent, FALLBACK_ACCENT);
    }
}
