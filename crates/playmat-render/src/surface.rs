//! A headless [`RenderSurface`] rasterised with tiny-skia.
//!
//! The surface keeps an ordered style (base layers plus whatever custom
//! layers the synthesizer adds), a camera, and a set of classified road
//! features. [`SoftwareSurface::render`] draws the visible custom layers
//! bottom to top into a device-pixel framebuffer. Base layers are not
//! cartographically rendered; while any of them is visible the map
//! shows a plain land fill.
//!
//! Camera transitions are not animated. A started transition stays
//! pending (and [`RenderSurface::is_moving`] reports `true`) until
//! [`SoftwareSurface::settle`] jumps to the target.

use std::time::Duration;

use geo::{BoundingRect, Coord, Intersects, MapCoords, Rect};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tiny_skia::{Paint, PathBuilder, Pixmap, Stroke, StrokeDash, Transform};

use playmat_core::{
    CameraTarget, Filter, Framebuffer, LayerKind, LayerSpec, LineCap, LineJoin, LineStyle,
    RenderSurface, Rgb, SelectionBox, SurfaceError, Transition, ViewportState, Visibility,
};

use crate::RenderError;
use crate::features::FeatureCollection;
use crate::projection::Projector;

/// Layer ids of the built-in base style.
pub const DEFAULT_BASE_LAYERS: [&str; 7] = [
    "land",
    "landuse",
    "water",
    "road-street",
    "road-primary",
    "road-label",
    "poi-label",
];

/// Fill shown while any base layer is visible.
pub const BASE_LAND_COLOR: Rgb = Rgb::new(0xF8, 0xF4, 0xF0);

/// Viewport and base-style setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Viewport width in CSS pixels.
    pub css_width: u32,
    /// Viewport height in CSS pixels.
    pub css_height: u32,
    /// Backing pixels per CSS pixel.
    pub device_pixel_ratio: f64,
    /// Base-style layer ids, bottom first.
    pub base_layers: Vec<String>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            css_width: 1280,
            css_height: 800,
            device_pixel_ratio: 1.0,
            base_layers: DEFAULT_BASE_LAYERS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
enum LayerSource {
    Base,
    Custom(LayerSpec),
}

#[derive(Debug, Clone)]
struct StyleLayer {
    id: String,
    visibility: Visibility,
    source: LayerSource,
}

/// Software map surface.
#[derive(Debug, Clone)]
pub struct SoftwareSurface {
    config: SurfaceConfig,
    layers: Vec<StyleLayer>,
    style_loaded: bool,
    camera: ViewportState,
    pending: Option<ViewportState>,
    features: FeatureCollection,
    framebuffer: Option<RgbaImage>,
}

impl SoftwareSurface {
    /// Create a surface. The base style starts out loading; call
    /// [`SoftwareSurface::finish_loading`] to complete it.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidViewport`] for a zero-sized
    /// viewport or a non-positive pixel ratio.
    pub fn new(config: SurfaceConfig, features: FeatureCollection) -> Result<Self, RenderError> {
        let dpr = config.device_pixel_ratio;
        if config.css_width == 0 || config.css_height == 0 || !dpr.is_finite() || dpr <= 0.0 {
            return Err(RenderError::InvalidViewport {
                width: config.css_width,
                height: config.css_height,
                device_pixel_ratio: dpr,
            });
        }
        let layers = config
            .base_layers
            .iter()
            .map(|id| StyleLayer {
                id: id.clone(),
                visibility: Visibility::Visible,
                source: LayerSource::Base,
            })
            .collect();
        Ok(Self {
            config,
            layers,
            style_loaded: false,
            camera: ViewportState::default(),
            pending: None,
            features,
            framebuffer: None,
        })
    }

    /// Complete base-style loading.
    pub const fn finish_loading(&mut self) {
        self.style_loaded = true;
    }

    /// Viewport configuration.
    #[must_use]
    pub const fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Features drawn by line layers.
    #[must_use]
    pub const fn features(&self) -> &FeatureCollection {
        &self.features
    }

    /// Backing-buffer size in device pixels.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn device_size(&self) -> (u32, u32) {
        let dpr = self.config.device_pixel_ratio;
        (
            (f64::from(self.config.css_width) * dpr).round() as u32,
            (f64::from(self.config.css_height) * dpr).round() as u32,
        )
    }

    /// Visibility of a layer, if it exists.
    #[must_use]
    pub fn layer_visibility(&self, id: &str) -> Option<Visibility> {
        self.layers
            .iter()
            .find(|l| l.id == id)
            .map(|l| l.visibility)
    }

    /// Finish any pending transition. Returns `true` if the camera
    /// moved.
    pub fn settle(&mut self) -> bool {
        self.pending.take().is_some_and(|target| {
            let moved = target != self.camera;
            self.camera = target;
            moved
        })
    }

    fn begin_transition(&mut self, target: ViewportState, transition: Transition) {
        if transition.duration == Some(Duration::ZERO) {
            self.camera = target;
            self.pending = None;
        } else {
            self.pending = Some(target);
        }
    }

    /// Rasterise the current style into the framebuffer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidViewport`] if the backing buffer
    /// cannot be allocated.
    pub fn render(&mut self) -> Result<(), RenderError> {
        let (width, height) = self.device_size();
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::InvalidViewport {
            width: self.config.css_width,
            height: self.config.css_height,
            device_pixel_ratio: self.config.device_pixel_ratio,
        })?;

        let base_visible = self
            .layers
            .iter()
            .any(|l| matches!(l.source, LayerSource::Base) && l.visibility == Visibility::Visible);
        if base_visible {
            pixmap.fill(skia_color(BASE_LAND_COLOR, 1.0));
        }

        let projector = Projector::new(
            &self.camera,
            f64::from(self.config.css_width),
            f64::from(self.config.css_height),
            self.config.device_pixel_ratio,
        );

        let mut drawn = 0usize;
        for layer in &self.layers {
            if layer.visibility != Visibility::Visible {
                continue;
            }
            let LayerSource::Custom(spec) = &layer.source else {
                continue;
            };
            match &spec.kind {
                LayerKind::Background { color } => pixmap.fill(skia_color(*color, 1.0)),
                LayerKind::Line { filter, style, .. } => {
                    drawn += self.stroke_features(&mut pixmap, &projector, filter, style);
                }
            }
        }
        log::debug!(
            "rendered {width}x{height} framebuffer, {drawn} feature strokes at z{:.2} bearing {:.1}",
            self.camera.zoom,
            self.camera.rotation_degrees,
        );

        self.framebuffer = Some(pixmap_to_rgba(&pixmap));
        Ok(())
    }

    /// Stroke every matching feature. Returns how many were drawn.
    #[allow(clippy::cast_possible_truncation)]
    fn stroke_features(
        &self,
        pixmap: &mut Pixmap,
        projector: &Projector,
        filter: &Filter,
        style: &LineStyle,
    ) -> usize {
        let dpr = self.config.device_pixel_ratio;
        let width_px = style.width * dpr;
        if !(width_px.is_finite() && width_px > 0.0) {
            return 0;
        }

        let (w, h) = (f64::from(pixmap.width()), f64::from(pixmap.height()));
        let view = Rect::new(
            Coord {
                x: -width_px,
                y: -width_px,
            },
            Coord {
                x: w + width_px,
                y: h + width_px,
            },
        );

        let mut pb = PathBuilder::new();
        let mut drawn = 0;
        for feature in self.features.features.iter().filter(|f| filter.matches(*f)) {
            let projected = feature.geometry.map_coords(|c| projector.project(c));
            if !projected
                .bounding_rect()
                .is_some_and(|bbox| bbox.intersects(&view))
            {
                continue;
            }
            for line in &projected.0 {
                let mut points = line.coords();
                let Some(first) = points.next() else {
                    continue;
                };
                pb.move_to(first.x as f32, first.y as f32);
                for p in points {
                    pb.line_to(p.x as f32, p.y as f32);
                }
            }
            drawn += 1;
        }

        let Some(path) = pb.finish() else {
            return 0;
        };

        // GL dash arrays are in multiples of the line width.
        let dash = style.dash_array.as_ref().and_then(|d| {
            StrokeDash::new(d.iter().map(|v| (v * width_px) as f32).collect(), 0.0)
        });
        let stroke = Stroke {
            width: width_px as f32,
            line_cap: skia_cap(style.cap),
            line_join: skia_join(style.join),
            dash,
            ..Stroke::default()
        };

        let mut paint = Paint::default();
        paint.set_color(skia_color(style.color, style.opacity));
        paint.anti_alias = true;

        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        drawn
    }

    /// The framebuffer with the selection rectangle drawn on top.
    ///
    /// The decoration is composited into a copy; the framebuffer used
    /// for captures is never touched.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NotRendered`] before the first
    /// [`SoftwareSurface::render`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn preview(&self, selection: &SelectionBox) -> Result<RgbaImage, RenderError> {
        let base = self.framebuffer.as_ref().ok_or(RenderError::NotRendered)?;
        let mut out = base.clone();
        let Some(mut pixmap) = Pixmap::new(base.width(), base.height()) else {
            return Ok(out);
        };

        let dpr = self.config.device_pixel_ratio;
        let border = selection.border_px * dpr;
        let box_w = selection.geometry.css_width_px * dpr - border;
        let box_h = selection.geometry.css_height_px * dpr - border;
        let x = (f64::from(base.width()) - box_w) / 2.0;
        let y = (f64::from(base.height()) - box_h) / 2.0;

        if let Some(path) = rounded_rect(x, y, box_w, box_h, selection.corner_radius_px * dpr) {
            let stroke = Stroke {
                width: border as f32,
                ..Stroke::default()
            };
            let mut paint = Paint::default();
            paint.set_color(skia_color(selection.accent, 1.0));
            paint.anti_alias = true;
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }

        image::imageops::overlay(&mut out, &pixmap_to_rgba(&pixmap), 0, 0);
        Ok(out)
    }
}

impl RenderSurface for SoftwareSurface {
    fn is_style_loaded(&self) -> bool {
        self.style_loaded
    }

    fn style_layer_ids(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.id.clone()).collect()
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    fn add_layer(&mut self, layer: &LayerSpec) -> Result<(), SurfaceError> {
        if !self.style_loaded {
            return Err(SurfaceError::NotReady);
        }
        if self.has_layer(&layer.id) {
            return Err(SurfaceError::DuplicateLayer(layer.id.clone()));
        }
        if let Some(style) = layer.line_style()
            && !(style.width.is_finite() && style.width >= 0.0)
        {
            return Err(SurfaceError::Rejected(format!(
                "{}: invalid line width {}",
                layer.id, style.width
            )));
        }
        self.layers.push(StyleLayer {
            id: layer.id.clone(),
            visibility: Visibility::Visible,
            source: LayerSource::Custom(layer.clone()),
        });
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError> {
        let index = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| SurfaceError::UnknownLayer(id.to_string()))?;
        self.layers.remove(index);
        Ok(())
    }

    fn set_layer_visibility(
        &mut self,
        id: &str,
        visibility: Visibility,
    ) -> Result<(), SurfaceError> {
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| SurfaceError::UnknownLayer(id.to_string()))?;
        layer.visibility = visibility;
        Ok(())
    }

    fn camera(&self) -> ViewportState {
        self.camera
    }

    fn fly_to(&mut self, target: CameraTarget, transition: Transition) {
        let from = self.pending.unwrap_or(self.camera);
        let target = ViewportState {
            center_lng: target.center_lng,
            center_lat: target.center_lat,
            zoom: target.zoom,
            ..from
        };
        self.begin_transition(target, transition);
    }

    fn rotate_to(&mut self, bearing_degrees: f64, transition: Transition) {
        let from = self.pending.unwrap_or(self.camera);
        let target = ViewportState {
            rotation_degrees: bearing_degrees,
            ..from
        };
        self.begin_transition(target, transition);
    }

    fn is_moving(&self) -> bool {
        self.pending.is_some()
    }

    fn framebuffer(&self) -> Option<Framebuffer<'_>> {
        self.framebuffer.as_ref().map(|pixels| Framebuffer {
            pixels,
            device_pixel_ratio: self.config.device_pixel_ratio,
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn skia_color(color: Rgb, opacity: f64) -> tiny_skia::Color {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, alpha)
}

const fn skia_cap(cap: LineCap) -> tiny_skia::LineCap {
    match cap {
        LineCap::Round => tiny_skia::LineCap::Round,
        LineCap::Butt => tiny_skia::LineCap::Butt,
        LineCap::Square => tiny_skia::LineCap::Square,
    }
}

const fn skia_join(join: LineJoin) -> tiny_skia::LineJoin {
    match join {
        LineJoin::Round => tiny_skia::LineJoin::Round,
        LineJoin::Miter => tiny_skia::LineJoin::Miter,
        LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn rounded_rect(x: f64, y: f64, w: f64, h: f64, radius: f64) -> Option<tiny_skia::Path> {
    if !(w > 0.0 && h > 0.0) {
        return None;
    }
    let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);
    let (x, y, w, h, r) = (x as f32, y as f32, w as f32, h as f32, r as f32);
    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);
    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);
    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    pb.finish()
}

/// Convert a premultiplied pixmap into a straight-alpha image.
#[allow(clippy::cast_possible_truncation)]
fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let data = pixmap.data();
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (i, pixel) in img.pixels_mut().enumerate() {
        let off = i * 4;
        let a = data[off + 3];
        if a == 0 {
            *pixel = image::Rgba([0, 0, 0, 0]);
        } else {
            let r = u16::from(data[off]) * 255 / u16::from(a);
            let g = u16::from(data[off + 1]) * 255 / u16::from(a);
            let b = u16::from(data[off + 2]) * 255 / u16::from(a);
            *pixel = image::Rgba([r as u8, g as u8, b as u8, a]);
        }
    }
    img
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
mod tests {
    use image::Rgba;
    use playmat_core::{
        Catalog, Session, SessionDefaults, SessionEvent, compute_overlay_geometry,
    };

    use super::*;
    use crate::features::RoadFeature;

    const LAWN: Rgba<u8> = Rgba([0x7C, 0xFC, 0x00, 0xFF]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 0xFF]);
    const WHITE: Rgba<u8> = Rgba([0xFF, 0xFF, 0xFF, 0xFF]);

    fn config(dpr: f64) -> SurfaceConfig {
        SurfaceConfig {
            css_width: 400,
            css_height: 300,
            device_pixel_ratio: dpr,
            ..SurfaceConfig::default()
        }
    }

    fn east_west(class: &str, kind: Option<&str>) -> RoadFeature {
        RoadFeature::line(&[(-0.01, 0.0), (0.01, 0.0)], class, kind)
    }

    /// A loaded, styled surface centered on (0, 0) at zoom 16.
    fn styled(features: Vec<RoadFeature>, dpr: f64) -> (Session, SoftwareSurface) {
        let defaults = SessionDefaults {
            viewport: ViewportState {
                center_lng: 0.0,
                center_lat: 0.0,
                zoom: 16.0,
                ..ViewportState::default()
            },
            ..SessionDefaults::default()
        };
        let mut session = Session::new(Catalog::default(), &defaults).unwrap();
        let mut surface =
            SoftwareSurface::new(config(dpr), FeatureCollection { features }).unwrap();
        surface.finish_loading();
        session
            .on_event(
                &mut surface,
                SessionEvent::SetCenterZoom {
                    lng: 0.0,
                    lat: 0.0,
                    zoom: 16.0,
                },
            )
            .unwrap();
        surface.settle();
        session
            .on_event(&mut surface, SessionEvent::StyleLoaded)
            .unwrap();
        (session, surface)
    }

    #[test]
    fn rejects_bad_viewport() {
        assert!(matches!(
            SoftwareSurface::new(config(0.0), FeatureCollection::default()),
            Err(RenderError::InvalidViewport { .. })
        ));
    }

    #[test]
    fn add_layer_before_load_is_not_ready() {
        let mut surface = SoftwareSurface::new(config(1.0), FeatureCollection::default()).unwrap();
        let layer = LayerSpec::background("bg", Rgb::BLACK);
        assert_eq!(surface.add_layer(&layer), Err(SurfaceError::NotReady));
    }

    #[test]
    fn unstyled_surface_shows_land() {
        let mut surface = SoftwareSurface::new(config(1.0), FeatureCollection::default()).unwrap();
        surface.render().unwrap();
        let fb = surface.framebuffer().unwrap();
        assert_eq!(
            *fb.pixels.get_pixel(0, 0),
            Rgba([0xF8, 0xF4, 0xF0, 0xFF])
        );
    }

    #[test]
    fn styled_surface_hides_base_and_fills_lawn() {
        let (_, mut surface) = styled(vec![], 1.0);
        assert_eq!(surface.layer_visibility("land"), Some(Visibility::None));
        surface.render().unwrap();
        let fb = surface.framebuffer().unwrap();
        assert_eq!(*fb.pixels.get_pixel(0, 0), LAWN);
        assert_eq!(*fb.pixels.get_pixel(399, 299), LAWN);
    }

    #[test]
    fn main_road_has_white_casing() {
        let (_, mut surface) = styled(vec![east_west("primary", None)], 1.0);
        surface.render().unwrap();
        let px = surface.framebuffer().unwrap().pixels;
        // Base is ~19.5 px wide, casing ~23.5 px.
        assert_eq!(*px.get_pixel(100, 156), BLACK);
        assert_eq!(*px.get_pixel(100, 160), WHITE);
        assert_eq!(*px.get_pixel(100, 139), WHITE);
        assert_eq!(*px.get_pixel(100, 163), LAWN);
    }

    #[test]
    fn connector_has_no_casing() {
        let (_, mut surface) = styled(vec![east_west("service", None)], 1.0);
        surface.render().unwrap();
        let px = surface.framebuffer().unwrap().pixels;
        assert_eq!(*px.get_pixel(200, 150), BLACK);
        assert_eq!(*px.get_pixel(200, 160), LAWN);
    }

    #[test]
    fn sidewalk_is_gray() {
        let (_, mut surface) = styled(vec![east_west("path", Some("sidewalk"))], 1.0);
        surface.render().unwrap();
        let px = surface.framebuffer().unwrap().pixels;
        assert_eq!(*px.get_pixel(200, 150), Rgba([0xC0, 0xC0, 0xC0, 0xFF]));
        assert_eq!(*px.get_pixel(200, 156), LAWN);
    }

    #[test]
    fn bearing_rotates_content() {
        let (mut session, mut surface) = styled(vec![east_west("service", None)], 1.0);
        session
            .on_event(&mut surface, SessionEvent::RotateTo(90.0))
            .unwrap();
        assert!(surface.is_moving());
        assert!(surface.settle());
        surface.render().unwrap();
        let px = surface.framebuffer().unwrap().pixels;
        assert_eq!(*px.get_pixel(200, 200), BLACK);
        assert_eq!(*px.get_pixel(250, 150), LAWN);
    }

    #[test]
    fn pixel_ratio_scales_buffer() {
        let (_, mut surface) = styled(vec![east_west("service", None)], 2.0);
        assert_eq!(surface.device_size(), (800, 600));
        surface.render().unwrap();
        let fb = surface.framebuffer().unwrap();
        assert!((fb.device_pixel_ratio - 2.0).abs() < f64::EPSILON);
        // Road width doubles with the ratio: 2 × 19.5 px.
        assert_eq!(*fb.pixels.get_pixel(400, 318), BLACK);
        assert_eq!(*fb.pixels.get_pixel(400, 322), LAWN);
    }

    #[test]
    fn transitions_wait_for_settle() {
        let mut surface = SoftwareSurface::new(config(1.0), FeatureCollection::default()).unwrap();
        let before = surface.camera();
        surface.fly_to(
            CameraTarget {
                center_lng: 10.0,
                center_lat: 10.0,
                zoom: 12.0,
            },
            Transition {
                duration: None,
                essential: true,
            },
        );
        assert!(surface.is_moving());
        assert_eq!(surface.camera(), before);
        assert!(surface.settle());
        assert!(!surface.is_moving());
        assert!((surface.camera().zoom - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn preview_draws_border_but_keeps_framebuffer() {
        let (session, mut surface) = styled(vec![], 1.0);
        surface.render().unwrap();
        let preview = surface.preview(&session.selection_box()).unwrap();

        let geometry = compute_overlay_geometry(session.mat_size());
        // Middle of the top border of the 384 × 192 box.
        let top = ((300.0 - geometry.css_height_px) / 2.0) as u32 + 2;
        assert_eq!(*preview.get_pixel(200, top), Rgba([0x10, 0xB9, 0x81, 0xFF]));
        assert_eq!(*preview.get_pixel(200, 150), LAWN);
        assert_eq!(*surface.framebuffer().unwrap().pixels.get_pixel(200, top), LAWN);
    }

    #[test]
    fn preview_requires_render() {
        let (session, surface) = styled(vec![], 1.0);
        assert!(matches!(
            surface.preview(&session.selection_box()),
            Err(RenderError::NotRendered)
        ));
    }
}
