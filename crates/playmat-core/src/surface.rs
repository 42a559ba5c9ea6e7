//! The render-surface port.
//!
//! The map engine is an external, long-lived mutable resource. The core
//! only talks to it through [`RenderSurface`]; a browser adapter, the
//! software surface in `playmat-render`, and test doubles all implement
//! the same trait.

use std::time::Duration;

use crate::layer::LayerSpec;
use crate::types::{RgbaImage, ViewportState};

/// Layer visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Drawn.
    Visible,
    /// Hidden.
    None,
}

/// Where a fly-to transition should end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTarget {
    /// Target longitude.
    pub center_lng: f64,
    /// Target latitude.
    pub center_lat: f64,
    /// Target zoom.
    pub zoom: f64,
}

/// Animation parameters for a camera change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Animation length. The engine picks one when `None`.
    pub duration: Option<Duration>,
    /// User-initiated navigation that must animate even when the
    /// platform asks for reduced motion.
    pub essential: bool,
}

/// Read access to the surface's backing pixels.
#[derive(Debug, Clone, Copy)]
pub struct Framebuffer<'a> {
    /// Backing buffer, in device pixels, straight (not premultiplied)
    /// RGBA.
    pub pixels: &'a RgbaImage,
    /// Backing-buffer pixels per CSS pixel.
    pub device_pixel_ratio: f64,
}

/// A surface rejected a layer operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    /// The style is still loading.
    #[error("style is not loaded")]
    NotReady,

    /// The layer id does not exist.
    #[error("no such layer: {0}")]
    UnknownLayer(String),

    /// A layer with this id already exists.
    #[error("layer already exists: {0}")]
    DuplicateLayer(String),

    /// Any other engine-reported failure.
    #[error("surface rejected operation: {0}")]
    Rejected(String),
}

/// Operations the core needs from a map engine instance.
pub trait RenderSurface {
    /// Whether the base style has finished loading.
    fn is_style_loaded(&self) -> bool;

    /// Ids of every layer currently in the style, in draw order.
    fn style_layer_ids(&self) -> Vec<String>;

    /// Whether a layer with `id` exists.
    fn has_layer(&self, id: &str) -> bool;

    /// Append a layer on top of the stack.
    ///
    /// # Errors
    ///
    /// Fails if the id is taken or the engine refuses the layer.
    fn add_layer(&mut self, layer: &LayerSpec) -> Result<(), SurfaceError>;

    /// Remove a layer.
    ///
    /// # Errors
    ///
    /// Fails if the layer does not exist.
    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError>;

    /// Show or hide a layer.
    ///
    /// # Errors
    ///
    /// Fails if the layer does not exist.
    fn set_layer_visibility(&mut self, id: &str, visibility: Visibility)
    -> Result<(), SurfaceError>;

    /// Current camera.
    fn camera(&self) -> ViewportState;

    /// Animate center and zoom.
    fn fly_to(&mut self, target: CameraTarget, transition: Transition);

    /// Animate the bearing.
    fn rotate_to(&mut self, bearing_degrees: f64, transition: Transition);

    /// Whether a camera animation is in progress.
    fn is_moving(&self) -> bool;

    /// Backing pixels and device-pixel ratio, if a buffer exists.
    fn framebuffer(&self) -> Option<Framebuffer<'_>>;
}
