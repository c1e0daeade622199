//! Image preprocessing
//!
//! Scales a decoded image so its longer side fits a bound, converts it to
//! floating point RGBA (optionally linear light) and exposes full or
//! stride-sampled pixel extraction.
//!
//! Images smaller than the bound are never upscaled.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use palette::Srgb;

use crate::color::conversion::srgb_to_linear;
use crate::constants::pixels::ALPHA_THRESHOLD;
use crate::{AnalysisError, Result};

/// One RGB pixel in [0, 1] plus its alpha
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSample {
    pub rgb: Srgb,
    pub alpha: f32,
}

impl PixelSample {
    /// True when the pixel is opaque enough to take part in the analysis
    pub fn is_opaque(&self) -> bool {
        self.alpha > ALPHA_THRESHOLD
    }
}

/// Bounded-resolution RGBA float buffer
///
/// Owned exclusively by the caller; dropping it (or calling
/// [`PreprocessedImage::release`]) frees the pixel memory.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
    linear: bool,
}

impl PreprocessedImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Whether pixel values are linear light rather than gamma encoded
    pub fn is_linear(&self) -> bool {
        self.linear
    }

    /// Extract RGB pixels
    ///
    /// # Arguments
    ///
    /// * `sample_count` - 0 returns every pixel; otherwise every
    ///   `max(1, total / sample_count)`-th pixel is returned
    pub fn extract_rgb_pixels(&self, sample_count: usize) -> Vec<PixelSample> {
        let total = self.pixels.len();
        let step = if sample_count > 0 && sample_count < total {
            (total / sample_count).max(1)
        } else {
            1
        };

        self.pixels
            .iter()
            .step_by(step)
            .map(|p| PixelSample {
                rgb: Srgb::new(p[0], p[1], p[2]),
                alpha: p[3],
            })
            .collect()
    }

    /// Free the pixel buffer
    pub fn release(self) {
        drop(self);
    }
}

/// Downscaling and color-space preparation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePreprocessor {
    /// Longest side of the output, in pixels
    pub max_dimension: u32,
    /// Decode sRGB to linear light
    pub convert_to_linear_rgb: bool,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(256, true)
    }
}

impl ImagePreprocessor {
    pub fn new(max_dimension: u32, convert_to_linear_rgb: bool) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            convert_to_linear_rgb,
        }
    }

    /// Thumbnail-sized preset
    pub fn fast() -> Self {
        Self::new(100, true)
    }

    /// High resolution preset
    pub fn fine() -> Self {
        Self::new(512, true)
    }

    /// Gamma-encoded output at the given resolution
    pub fn gamma_encoded(max_dimension: u32) -> Self {
        Self::new(max_dimension, false)
    }

    /// Scale and convert an image
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::EmptyImage` if the image has no pixels
    pub fn preprocess(&self, image: &DynamicImage) -> Result<PreprocessedImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(AnalysisError::EmptyImage { width, height });
        }

        let scaled;
        let source = if width.max(height) > self.max_dimension {
            scaled = image.resize(self.max_dimension, self.max_dimension, FilterType::Triangle);
            &scaled
        } else {
            image
        };

        let buffer = source.to_rgba32f();
        let (out_w, out_h) = buffer.dimensions();
        let pixels = buffer
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                if self.convert_to_linear_rgb {
                    let lin = srgb_to_linear(Srgb::new(r, g, b));
                    [lin.red, lin.green, lin.blue, a]
                } else {
                    [r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0), a]
                }
            })
            .collect();

        Ok(PreprocessedImage {
            width: out_w,
            height: out_h,
            pixels,
            linear: self.convert_to_linear_rgb,
        })
    }
}
