//! Decoding and cover-scaling of slide images.
//!
//! Images are scaled preserving their aspect ratio so that the result covers
//! the whole display. The axis that would leave a gap is fitted exactly; the
//! other one overflows and is cropped (or panned) at display time.

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

use super::{Dimensions, Frame};
use crate::error::DecodeError;

// =============================================================================
// Geometry
// =============================================================================

/// Largest frame, in pixels, a single slide may be scaled to (256 MiB as RGBA).
///
/// Extreme aspect ratios, such as a long strip, would otherwise need gigabytes
/// to cover the display.
pub const MAX_FRAME_PIXELS: u64 = 64 * 1024 * 1024;

/// Compute the size that covers `target` while keeping the aspect ratio of `source`.
///
/// If the target is narrower than the source the height is fitted, otherwise
/// the width is. The free axis is rounded up so no sub-pixel gap remains.
///
/// # Errors
///
/// Returns [`DecodeError::EmptyImage`] for a zero dimension and
/// [`DecodeError::TooLarge`] when the result exceeds [`MAX_FRAME_PIXELS`].
pub fn fill_dimensions(source: Dimensions, target: Dimensions) -> Result<Dimensions, DecodeError> {
    if source.is_empty() {
        return Err(DecodeError::EmptyImage {
            width: source.width,
            height: source.height,
        });
    }
    if target.is_empty() {
        return Err(DecodeError::EmptyImage {
            width: target.width,
            height: target.height,
        });
    }

    let (sw, sh) = (source.width as u64, source.height as u64);
    let (tw, th) = (target.width as u64, target.height as u64);

    // tw/th < sw/sh, cross-multiplied to stay exact
    let fit_height = tw * sh < sw * th;

    let (width, height) = if fit_height {
        ((sw * th).div_ceil(sh), th)
    } else {
        (tw, (sh * tw).div_ceil(sw))
    };

    let too_large = DecodeError::TooLarge {
        width,
        height,
        limit: MAX_FRAME_PIXELS,
    };
    if width.saturating_mul(height) > MAX_FRAME_PIXELS {
        return Err(too_large);
    }
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(width), Ok(height)) => Ok(Dimensions::new(width, height)),
        _ => Err(too_large),
    }
}

/// Resize `image` so it covers `target`.
pub fn scale_to_fill(
    image: &DynamicImage,
    target: Dimensions,
    filter: FilterType,
) -> Result<RgbaImage, DecodeError> {
    let size = fill_dimensions(Dimensions::new(image.width(), image.height()), target)?;
    Ok(image.resize_exact(size.width, size.height, filter).into_rgba8())
}

// =============================================================================
// Scaler
// =============================================================================

/// Turns raw file bytes into a display-ready [`Frame`].
///
/// Called by the producer on a blocking worker thread, never while the buffer
/// lock is held.
pub trait Scaler: Send + Sync + 'static {
    fn decode_and_fit(&self, bytes: &[u8]) -> Result<Frame, DecodeError>;
}

/// [`Scaler`] backed by the `image` crate.
#[derive(Debug, Clone)]
pub struct ImageScaler {
    display: Dimensions,
    filter: FilterType,
}

impl ImageScaler {
    /// Create a scaler for a display of the given size.
    ///
    /// Uses a triangle (bilinear) filter, which is a good speed/quality
    /// tradeoff for photos shown full screen.
    pub fn new(display: Dimensions) -> Self {
        Self::with_filter(display, FilterType::Triangle)
    }

    pub fn with_filter(display: Dimensions, filter: FilterType) -> Self {
        Self { display, filter }
    }

    pub fn display(&self) -> Dimensions {
        self.display
    }
}

impl Scaler for ImageScaler {
    fn decode_and_fit(&self, bytes: &[u8]) -> Result<Frame, DecodeError> {
        let image = image::load_from_memory(bytes)?;
        let pixels = scale_to_fill(&image, self.display, self.filter)?;
        Ok(Frame::new(pixels))
    }
}
