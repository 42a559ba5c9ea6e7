//! playmat-core: Overlay geometry, map style planning, and capture
//! (sans-IO).
//!
//! Turns a physical mat size into:
//! selection rectangle -> road line widths -> thematic layer plan ->
//! pixel-exact crop of the rendered map.
//!
//! This crate has **no I/O dependencies**. The map engine is reached
//! only through the [`RenderSurface`] trait; the software surface lives
//! in `playmat-render`, network geocoding in `playmat-geocode`, and
//! file output in the `playmat` CLI.

pub mod capture;
pub mod catalog;
pub mod color;
pub mod filter;
pub mod layer;
pub mod overlay;
pub mod session;
pub mod style;
pub mod surface;
pub mod types;
pub mod units;
pub mod viewport;

#[cfg(test)]
mod testing;

pub use capture::{CaptureError, CaptureOutput, CaptureRegion, capture, compute_capture_region};
pub use catalog::Catalog;
pub use color::Rgb;
pub use filter::{FeatureProperties, FeatureTags, Filter, GeometryType};
pub use layer::{LayerKind, LayerSpec, LineCap, LineJoin, LineStyle};
pub use overlay::{
    OverlayGeometry, OverlayMode, RoadWidthPolicy, SelectionBox, compute_overlay_geometry,
    compute_road_width_policy,
};
pub use session::{Session, SessionDefaults, SessionEvent};
pub use style::{
    LayerOp, SkipReason, StyleSynthesizer, SynthesisOutcome, SynthesizerState, plan_build,
    plan_layers,
};
pub use surface::{CameraTarget, Framebuffer, RenderSurface, SurfaceError, Transition, Visibility};
pub use types::{
    ColorScheme, ConfigError, ConfigSnapshot, Dimensions, MatSizeSpec, RgbaImage, ViewportState,
};
pub use viewport::{ViewportController, normalize_rotation, rotate_by};
