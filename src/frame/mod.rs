//! Display-ready frames and the scaling step that produces them.
//!
//! A [`Frame`] is an image that has already been decoded and scaled to cover
//! the display. Frames are created off the buffer lock by a [`Scaler`] and
//! never change after being inserted into the slide buffer.
//!
//! # Example
//!
//! ```
//! use rapidshow::frame::{fill_dimensions, Dimensions};
//!
//! // A 2:1 panorama on a 16:9 display is fitted to the display height
//! let fitted = fill_dimensions(Dimensions::new(1000, 500), Dimensions::new(1920, 1080)).unwrap();
//! assert_eq!(fitted, Dimensions::new(2160, 1080));
//! ```

mod scaler;

pub use scaler::{fill_dimensions, scale_to_fill, ImageScaler, Scaler, MAX_FRAME_PIXELS};

use image::RgbaImage;
use rand::seq::IndexedRandom;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A decoded, display-scaled image.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    /// Raw RGBA pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.image
    }

    /// Size of the pixel data in bytes.
    pub fn byte_size(&self) -> usize {
        self.image.as_raw().len()
    }

    /// Candidate top-left offsets for drawing this frame on `display`.
    ///
    /// Each axis yields `[overflow, centered, 0]`, where `overflow` is
    /// `display - frame` (negative when the frame is larger). A covering frame
    /// can be panned to any of the nine combinations without leaving gaps.
    pub fn placement_offsets(&self, display: Dimensions) -> ([i64; 3], [i64; 3]) {
        let x_min = display.width as i64 - self.width() as i64;
        let y_min = display.height as i64 - self.height() as i64;
        ([x_min, x_min / 2, 0], [y_min, y_min / 2, 0])
    }

    /// Pick one of the nine placements from [`Frame::placement_offsets`] at random.
    pub fn random_placement(&self, display: Dimensions) -> (i64, i64) {
        let (xs, ys) = self.placement_offsets(display);
        let mut rng = rand::rng();
        let x = xs.choose(&mut rng).copied().unwrap_or(0);
        let y = ys.choose(&mut rng).copied().unwrap_or(0);
        (x, y)
    }
}
