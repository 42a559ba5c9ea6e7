//! Pixel-exact capture of the print area.
//!
//! The selection rectangle is centered on the surface. Its CSS size is
//! scaled by the device-pixel ratio and the matching block of backing
//! pixels is copied 1:1 into an image of exactly that size. There is no
//! resampling, so one output pixel is always one framebuffer pixel.

use serde::{Deserialize, Serialize};

use crate::overlay::OverlayGeometry;
use crate::surface::RenderSurface;
use crate::types::{ConfigSnapshot, Dimensions, RgbaImage};
use crate::units::css_to_device_pixels;

/// Largest capture side accepted, in device pixels.
pub const MAX_CAPTURE_SIDE: u32 = 32_768;

/// Block of backing pixels covered by the selection rectangle.
///
/// The origin may be negative, or the block may extend past the
/// framebuffer, when the surface is smaller than the rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    /// Left edge in device pixels.
    pub device_pixel_x: i64,
    /// Top edge in device pixels.
    pub device_pixel_y: i64,
    /// Width in device pixels.
    pub device_pixel_width: u32,
    /// Height in device pixels.
    pub device_pixel_height: u32,
}

impl CaptureRegion {
    /// Output image size.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.device_pixel_width,
            height: self.device_pixel_height,
        }
    }

    /// Whether at least one region pixel lies on a framebuffer of
    /// `framebuffer` size.
    #[must_use]
    pub fn overlaps(&self, framebuffer: Dimensions) -> bool {
        let right = self.device_pixel_x + i64::from(self.device_pixel_width);
        let bottom = self.device_pixel_y + i64::from(self.device_pixel_height);
        self.device_pixel_x < i64::from(framebuffer.width)
            && self.device_pixel_y < i64::from(framebuffer.height)
            && right > 0
            && bottom > 0
    }
}

/// Errors that abort a capture. No partial output is ever produced.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The surface has no backing buffer to read, or the buffer has no
    /// pixels.
    #[error("render surface has no framebuffer")]
    MissingFramebuffer,

    /// The selection rectangle lies entirely outside the framebuffer.
    #[error("capture region ({x}, {y}) is outside the {width} x {height} framebuffer")]
    OutsideFramebuffer {
        /// Region left edge.
        x: i64,
        /// Region top edge.
        y: i64,
        /// Framebuffer width.
        width: u32,
        /// Framebuffer height.
        height: u32,
    },

    /// No usable drawing context: the pixel ratio is not a positive
    /// finite number.
    #[error("invalid device pixel ratio: {0}")]
    InvalidDevicePixelRatio(f64),

    /// The scaled rectangle rounds to zero pixels.
    #[error("capture region is empty ({width} x {height} device px)")]
    EmptyRegion {
        /// Scaled width.
        width: f64,
        /// Scaled height.
        height: f64,
    },

    /// The scaled rectangle exceeds [`MAX_CAPTURE_SIDE`].
    #[error("capture region too large ({width} x {height} device px)")]
    RegionTooLarge {
        /// Scaled width.
        width: f64,
        /// Scaled height.
        height: f64,
    },

    /// The camera is still animating, so the framebuffer is mid-frame.
    #[error("camera transition in progress")]
    TransitionInProgress,

    /// PNG encoding failed.
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

/// Result of a successful capture.
#[derive(Debug, Clone)]
pub struct CaptureOutput {
    /// Encoded PNG.
    pub png: Vec<u8>,
    /// The cropped pixels the PNG was encoded from.
    pub image: RgbaImage,
    /// Where the crop was taken.
    pub region: CaptureRegion,
    /// Configuration at capture time.
    pub snapshot: ConfigSnapshot,
}

/// Locate the selection rectangle in a framebuffer.
///
/// # Errors
///
/// Returns [`CaptureError::MissingFramebuffer`] for a framebuffer with
/// no pixels, [`CaptureError::InvalidDevicePixelRatio`] for a
/// non-positive or non-finite ratio, [`CaptureError::EmptyRegion`] when
/// either side rounds to zero, [`CaptureError::RegionTooLarge`] above
/// [`MAX_CAPTURE_SIDE`] and [`CaptureError::OutsideFramebuffer`] when
/// no region pixel falls on the framebuffer.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn compute_capture_region(
    geometry: &OverlayGeometry,
    framebuffer: Dimensions,
    device_pixel_ratio: f64,
) -> Result<CaptureRegion, CaptureError> {
    if framebuffer.is_empty() {
        return Err(CaptureError::MissingFramebuffer);
    }
    if !device_pixel_ratio.is_finite() || device_pixel_ratio <= 0.0 {
        return Err(CaptureError::InvalidDevicePixelRatio(device_pixel_ratio));
    }

    let width = css_to_device_pixels(geometry.css_width_px, device_pixel_ratio).round();
    let height = css_to_device_pixels(geometry.css_height_px, device_pixel_ratio).round();
    if !(width >= 1.0 && height >= 1.0) {
        return Err(CaptureError::EmptyRegion { width, height });
    }
    let max = f64::from(MAX_CAPTURE_SIDE);
    if width > max || height > max {
        return Err(CaptureError::RegionTooLarge { width, height });
    }

    let x = ((f64::from(framebuffer.width) - width) / 2.0).floor();
    let y = ((f64::from(framebuffer.height) - height) / 2.0).floor();

    let region = CaptureRegion {
        device_pixel_x: x as i64,
        device_pixel_y: y as i64,
        device_pixel_width: width as u32,
        device_pixel_height: height as u32,
    };
    if !region.overlaps(framebuffer) {
        return Err(CaptureError::OutsideFramebuffer {
            x: region.device_pixel_x,
            y: region.device_pixel_y,
            width: framebuffer.width,
            height: framebuffer.height,
        });
    }
    Ok(region)
}

/// Copy `region` out of `pixels` into a new image of exactly the
/// region's size. Pixels outside the source stay fully transparent.
#[must_use]
pub fn crop_region(pixels: &RgbaImage, region: &CaptureRegion) -> RgbaImage {
    let mut out = RgbaImage::new(region.device_pixel_width, region.device_pixel_height);
    image::imageops::replace(
        &mut out,
        pixels,
        -region.device_pixel_x,
        -region.device_pixel_y,
    );
    out
}

/// Encode an RGBA image as PNG.
///
/// # Errors
///
/// Returns [`CaptureError::Encode`] if the encoder fails.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

/// Capture the print area from `surface`.
///
/// Reads the framebuffer and its pixel ratio, crops the centered
/// rectangle for `geometry` and PNG-encodes it.
///
/// # Errors
///
/// Returns [`CaptureError::TransitionInProgress`] while the camera is
/// moving, [`CaptureError::MissingFramebuffer`] if the surface has no
/// buffer or an empty one, and any error from
/// [`compute_capture_region`] or [`encode_png`].
pub fn capture<S: RenderSurface + ?Sized>(
    surface: &S,
    geometry: &OverlayGeometry,
    snapshot: ConfigSnapshot,
) -> Result<CaptureOutput, CaptureError> {
    if surface.is_moving() {
        return Err(CaptureError::TransitionInProgress);
    }
    let framebuffer = surface
        .framebuffer()
        .ok_or(CaptureError::MissingFramebuffer)?;

    let source = Dimensions {
        width: framebuffer.pixels.width(),
        height: framebuffer.pixels.height(),
    };
    let region = compute_capture_region(geometry, source, framebuffer.device_pixel_ratio)?;
    log::debug!(
        "capturing {}x{} at ({}, {}) from {}x{} framebuffer (dpr {})",
        region.device_pixel_width,
        region.device_pixel_height,
        region.device_pixel_x,
        region.device_pixel_y,
        source.width,
        source.height,
        framebuffer.device_pixel_ratio,
    );

    let image = crop_region(framebuffer.pixels, &region);
    let png = encode_png(&image)?;

    Ok(CaptureOutput {
        png,
        image,
        region,
        snapshot,
    })
}
