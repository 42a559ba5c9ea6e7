//! In-memory [`RenderSurface`] for unit tests.

use crate::layer::LayerSpec;
use crate::surface::{CameraTarget, Framebuffer, RenderSurface, SurfaceError, Transition, Visibility};
use crate::types::{RgbaImage, ViewportState};

#[derive(Debug, Clone, PartialEq)]
pub struct MockLayer {
    pub id: String,
    pub visibility: Visibility,
    /// `None` for base-style layers.
    pub spec: Option<LayerSpec>,
}

#[derive(Debug)]
pub struct MockSurface {
    pub style_loaded: bool,
    pub layers: Vec<MockLayer>,
    pub camera: ViewportState,
    pub moving: bool,
    pub pixels: Option<RgbaImage>,
    pub device_pixel_ratio: f64,
    /// `add_layer` fails for this id.
    pub reject_layer: Option<String>,
    pub fly_calls: Vec<(CameraTarget, Transition)>,
    pub rotate_calls: Vec<(f64, Transition)>,
}

impl MockSurface {
    pub fn with_base_layers(ids: &[&str]) -> Self {
        Self {
            style_loaded: true,
            layers: ids
                .iter()
                .map(|id| MockLayer {
                    id: (*id).to_string(),
                    visibility: Visibility::Visible,
                    spec: None,
                })
                .collect(),
            camera: ViewportState::default(),
            moving: false,
            pixels: None,
            device_pixel_ratio: 1.0,
            reject_layer: None,
            fly_calls: Vec::new(),
            rotate_calls: Vec::new(),
        }
    }

    pub fn with_framebuffer(mut self, pixels: RgbaImage, device_pixel_ratio: f64) -> Self {
        self.pixels = Some(pixels);
        self.device_pixel_ratio = device_pixel_ratio;
        self
    }

    pub fn settle(&mut self) {
        self.moving = false;
    }

    pub fn base_layers_hidden(&self) -> bool {
        self.layers
            .iter()
            .filter(|l| l.spec.is_none())
            .all(|l| l.visibility == Visibility::None)
    }

    pub fn custom_layer_ids(&self) -> Vec<String> {
        self.layers
            .iter()
            .filter(|l| l.spec.is_some())
            .map(|l| l.id.clone())
            .collect()
    }

    pub fn custom_layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers
            .iter()
            .find(|l| l.id == id)
            .and_then(|l| l.spec.as_ref())
    }

    fn index_of(&self, id: &str) -> Result<usize, SurfaceError> {
        self.layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| SurfaceError::UnknownLayer(id.to_string()))
    }
}

impl RenderSurface for MockSurface {
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
        if self.reject_layer.as_deref() == Some(layer.id.as_str()) {
            return Err(SurfaceError::Rejected(layer.id.clone()));
        }
        if self.has_layer(&layer.id) {
            return Err(SurfaceError::DuplicateLayer(layer.id.clone()));
        }
        self.layers.push(MockLayer {
            id: layer.id.clone(),
            visibility: Visibility::Visible,
            spec: Some(layer.clone()),
        });
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError> {
        let index = self.index_of(id)?;
        self.layers.remove(index);
        Ok(())
    }

    fn set_layer_visibility(
        &mut self,
        id: &str,
        visibility: Visibility,
    ) -> Result<(), SurfaceError> {
        let index = self.index_of(id)?;
        self.layers[index].visibility = visibility;
        Ok(())
    }

    fn camera(&self) -> ViewportState {
        self.camera
    }

    fn fly_to(&mut self, target: CameraTarget, transition: Transition) {
        self.camera.center_lng = target.center_lng;
        self.camera.center_lat = target.center_lat;
        self.camera.zoom = target.zoom;
        self.moving = true;
        self.fly_calls.push((target, transition));
    }

    fn rotate_to(&mut self, bearing_degrees: f64, transition: Transition) {
        self.camera.rotation_degrees = bearing_degrees;
        self.moving = true;
        self.rotate_calls.push((bearing_degrees, transition));
    }

    fn is_moving(&self) -> bool {
        self.moving
    }

    fn framebuffer(&self) -> Option<Framebuffer<'_>> {
        self.pixels.as_ref().map(|pixels| Framebuffer {
            pixels,
            device_pixel_ratio: self.device_pixel_ratio,
        })
    }
}
