//! Integration test: capture a framebuffer through the core and package
//! it as an export bundle.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{TimeZone, Utc};
use image::Rgba;
use playmat_core::{
    CameraTarget, Catalog, Framebuffer, LayerSpec, RenderSurface, RgbaImage, Session,
    SessionDefaults, SessionEvent, SurfaceError, Transition, ViewportState, Visibility,
};
use playmat_export::{ExportBundle, ExportDocument};

/// Minimal surface: a fixed framebuffer and a camera that jumps.
struct StillSurface {
    pixels: RgbaImage,
    camera: ViewportState,
}

impl RenderSurface for StillSurface {
    fn is_style_loaded(&self) -> bool {
        true
    }

    fn style_layer_ids(&self) -> Vec<String> {
        Vec::new()
    }

    fn has_layer(&self, _id: &str) -> bool {
        false
    }

    fn add_layer(&mut self, _layer: &LayerSpec) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError> {
        Err(SurfaceError::UnknownLayer(id.to_string()))
    }

    fn set_layer_visibility(&mut self, id: &str, _: Visibility) -> Result<(), SurfaceError> {
        Err(SurfaceError::UnknownLayer(id.to_string()))
    }

    fn camera(&self) -> ViewportState {
        self.camera
    }

    fn fly_to(&mut self, target: CameraTarget, _transition: Transition) {
        self.camera.center_lng = target.center_lng;
        self.camera.center_lat = target.center_lat;
        self.camera.zoom = target.zoom;
    }

    fn rotate_to(&mut self, bearing_degrees: f64, _transition: Transition) {
        self.camera.rotation_degrees = bearing_degrees;
    }

    fn is_moving(&self) -> bool {
        false
    }

    fn framebuffer(&self) -> Option<Framebuffer<'_>> {
        Some(Framebuffer {
            pixels: &self.pixels,
            device_pixel_ratio: 2.0,
        })
    }
}

#[test]
fn capture_to_bundle() {
    let mut session = Session::new(Catalog::default(), &SessionDefaults::default()).unwrap();
    let mut surface = StillSurface {
        pixels: RgbaImage::from_pixel(1200, 900, Rgba([0x7C, 0xFC, 0x00, 0xFF])),
        camera: ViewportState::default(),
    };

    session
        .on_event(&mut surface, SessionEvent::SelectColorScheme("muted".into()))
        .unwrap();
    session
        .on_event(
            &mut surface,
            SessionEvent::LocationFound {
                longitude: -0.1276,
                latitude: 51.5072,
            },
        )
        .unwrap();
    session
        .on_event(&mut surface, SessionEvent::RotateLeft)
        .unwrap();

    let capture = session.capture(&surface).expect("capture should succeed");
    assert_eq!(capture.image.dimensions(), (768, 384));

    let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let bundle = ExportBundle::new(&capture, Some("Trafalgar Square"), at).unwrap();

    assert_eq!(bundle.map_file_name, "playmat-map-1735787045000.png");
    assert_eq!(bundle.config_file_name, "playmat-config-1735787045000.json");
    assert_eq!(bundle.png, capture.png);

    let doc: ExportDocument = serde_json::from_str(&bundle.config_json).unwrap();
    assert_eq!(doc.mat.size, "small");
    assert!((doc.mat.rotation - 345.0).abs() < 1e-9);
    assert_eq!(doc.color_scheme.name, "Muted");
    assert_eq!(doc.color_scheme.primary, "#64748b");
    assert!((doc.location.zoom - 17.0).abs() < 1e-9);
    assert!((doc.location.latitude - 51.5072).abs() < 1e-9);
    assert_eq!(doc.location.address, "Trafalgar Square");
    assert_eq!(doc.timestamp, "2025-01-02T03:04:05.000Z");

    let decoded = image::load_from_memory(&bundle.png).unwrap().to_rgba8();
    assert!(decoded.pixels().all(|p| *p == Rgba([0x7C, 0xFC, 0x00, 0xFF])));
}
