//! playmat-render: Headless software render surface.
//!
//! Implements [`playmat_core::RenderSurface`] on top of tiny-skia so the
//! full style -> capture pipeline can run without a browser: in the CLI,
//! in tests, and for previews. Road features come from GeoJSON and are
//! projected with Web-Mercator at 256-pixel tiles.

pub mod features;
pub mod projection;
pub mod surface;

pub use features::{FeatureCollection, RoadFeature};
pub use projection::Projector;
pub use surface::{SoftwareSurface, SurfaceConfig};

/// Errors raised by the software surface.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The viewport cannot back a framebuffer.
    #[error("invalid viewport {width}x{height} css px at device pixel ratio {device_pixel_ratio}")]
    InvalidViewport {
        /// Width in CSS pixels.
        width: u32,
        /// Height in CSS pixels.
        height: u32,
        /// Requested pixel ratio.
        device_pixel_ratio: f64,
    },

    /// [`SoftwareSurface::render`] has not run yet.
    #[error("surface has not been rendered")]
    NotRendered,

    /// The feature document is not a GeoJSON feature collection.
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] serde_json::Error),
}
