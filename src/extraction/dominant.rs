//! Dominant color extraction
//!
//! Produces a small set of representative colors per photo with relative
//! area weights, plus a 256-bin brightness CDF used for tone analysis.
//!
//! Two algorithms:
//! - Perceptual: random pixel subsample, Lab conversion, weighted K-means
//!   where each sample is weighted by `(L/100) * (chroma/128)`
//! - Fast: unweighted K-means on stride-sampled RGB pixels
//!
//! Near-duplicate colors (ΔE below the merge threshold) can be merged
//! afterwards. Colors are always returned sorted by weight, descending.

use image::DynamicImage;
use palette::{Lab, Srgb};
use rand::{rngs::StdRng, seq::index, SeedableRng};
use tracing::debug;

use super::kmeans::{weighted_kmeans, KMeansConfig};
use crate::color::conversion::{
    array_to_lab, chroma, delta_e, lab_to_array, lab_to_rgb, perceptual_luminance, rgb_to_lab,
};
use crate::config::{ExtractionAlgorithm, ExtractionConfig};
use crate::constants::extraction::{CHROMA_NORMALIZER, MAX_ITERATIONS, MIN_SAMPLE_WEIGHT};
use crate::constants::pixels::BRIGHTNESS_CDF_BINS;
use crate::models::DominantColor;
use crate::preprocess::{ImagePreprocessor, PixelSample};
use crate::{AnalysisError, Result};

/// Colors and tone distribution of one photo
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub colors: Vec<DominantColor>,
    pub brightness_cdf: Vec<f32>,
}

impl ExtractionResult {
    fn empty() -> Self {
        Self {
            colors: Vec::new(),
            brightness_cdf: vec![0.0; BRIGHTNESS_CDF_BINS],
        }
    }
}

/// Dominant color extractor
#[derive(Debug, Clone, Default)]
pub struct DominantColorExtractor {
    config: ExtractionConfig,
}

impl DominantColorExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract dominant colors and the brightness CDF
    ///
    /// # Arguments
    ///
    /// * `image` - Decoded photo
    /// * `seed` - Seed for subsampling and K-means++; identical seeds give
    ///   identical results
    ///
    /// # Returns
    ///
    /// An empty color list and an all-zero CDF when the image has no pixels
    /// or no opaque pixels.
    ///
    /// # Errors
    ///
    /// Returns an error only if clustering the sampled pixels fails
    pub fn extract(&self, image: &DynamicImage, seed: u64) -> Result<ExtractionResult> {
        let quality = self.config.quality;
        let preprocessed = match ImagePreprocessor::gamma_encoded(quality.max_dimension()).preprocess(image) {
            Ok(preprocessed) => preprocessed,
            Err(AnalysisError::EmptyImage { .. }) => return Ok(ExtractionResult::empty()),
            Err(e) => return Err(e),
        };

        let pixels: Vec<PixelSample> = preprocessed
            .extract_rgb_pixels(0)
            .into_iter()
            .filter(PixelSample::is_opaque)
            .collect();

        if pixels.is_empty() {
            return Ok(ExtractionResult::empty());
        }

        let brightness_cdf = brightness_cdf(&pixels);

        let mut colors = match self.config.algorithm {
            ExtractionAlgorithm::Perceptual => self.extract_perceptual(&pixels, seed)?,
            ExtractionAlgorithm::Fast => {
                let sampled: Vec<PixelSample> = preprocessed
                    .extract_rgb_pixels(quality.sample_count())
                    .into_iter()
                    .filter(PixelSample::is_opaque)
                    .collect();
                self.extract_fast(&sampled, seed)?
            }
        };
        preprocessed.release();

        if self.config.auto_merge_similar_colors {
            colors = merge_similar_colors(colors, self.config.merge_delta_e);
        }
        sort_by_weight(&mut colors);

        debug!(
            colors = colors.len(),
            pixels = pixels.len(),
            "extracted dominant colors"
        );

        Ok(ExtractionResult {
            colors,
            brightness_cdf,
        })
    }

    fn extract_perceptual(&self, pixels: &[PixelSample], seed: u64) -> Result<Vec<DominantColor>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let sample_count = self.config.quality.sample_count();

        let sampled: Vec<&PixelSample> = if pixels.len() > sample_count {
            let mut picked = index::sample(&mut rng, pixels.len(), sample_count).into_vec();
            picked.sort_unstable();
            picked.into_iter().map(|i| &pixels[i]).collect()
        } else {
            pixels.iter().collect()
        };

        let mut points = Vec::with_capacity(sampled.len());
        let mut weights = Vec::with_capacity(sampled.len());
        for p in sampled {
            let lab = rgb_to_lab(p.rgb);
            points.push(lab_to_array(lab));
            weights.push(sample_weight(lab));
        }

        let k = self.config.target_count.min(points.len()).max(1);
        let result = weighted_kmeans(
            &points,
            Some(&weights),
            KMeansConfig::new(k, MAX_ITERATIONS, seed),
        )?;

        let total = points.len() as f32;
        Ok(result
            .centroids
            .iter()
            .zip(&result.cluster_sizes)
            .filter(|(_, &size)| size > 0)
            .map(|(c, &size)| DominantColor::new(lab_to_rgb(array_to_lab(*c)), size as f32 / total))
            .collect())
    }

    fn extract_fast(&self, pixels: &[PixelSample], seed: u64) -> Result<Vec<DominantColor>> {
        if pixels.is_empty() {
            return Ok(Vec::new());
        }
        let points: Vec<[f32; 3]> = pixels
            .iter()
            .map(|p| [p.rgb.red, p.rgb.green, p.rgb.blue])
            .collect();

        let k = self.config.target_count.min(points.len()).max(1);
        let result = weighted_kmeans(&points, None, KMeansConfig::new(k, MAX_ITERATIONS, seed))?;

        let total = points.len() as f32;
        Ok(result
            .centroids
            .iter()
            .zip(&result.cluster_sizes)
            .filter(|(_, &size)| size > 0)
            .map(|(c, &size)| DominantColor::new(Srgb::new(c[0], c[1], c[2]), size as f32 / total))
            .collect())
    }
}

/// Sample weight `(L/100) * (chroma/128)`, floored so neutral pixels still count
pub fn sample_weight(lab: Lab) -> f32 {
    let w = (lab.l / 100.0) * (chroma(lab) / CHROMA_NORMALIZER);
    if w.is_finite() {
        w.max(MIN_SAMPLE_WEIGHT)
    } else {
        MIN_SAMPLE_WEIGHT
    }
}

/// 256-bin cumulative distribution of perceptual luminance
///
/// Non-decreasing; the last bin is exactly 1.0 for non-empty input and
/// every bin is 0.0 for empty input.
pub fn brightness_cdf(pixels: &[PixelSample]) -> Vec<f32> {
    let mut cdf = vec![0.0_f32; BRIGHTNESS_CDF_BINS];
    if pixels.is_empty() {
        return cdf;
    }

    let mut histogram = vec![0u64; BRIGHTNESS_CDF_BINS];
    let max_bin = (BRIGHTNESS_CDF_BINS - 1) as f32;
    for p in pixels {
        let bin = (perceptual_luminance(p.rgb) * max_bin).round() as usize;
        histogram[bin.min(BRIGHTNESS_CDF_BINS - 1)] += 1;
    }

    let total = pixels.len() as f64;
    let mut running = 0u64;
    for (slot, count) in cdf.iter_mut().zip(&histogram) {
        running += count;
        *slot = (running as f64 / total) as f32;
    }
    cdf[BRIGHTNESS_CDF_BINS - 1] = 1.0;
    cdf
}

/// Merge colors closer than `threshold` (ΔE)
///
/// Scan order: colors sorted by weight descending; for each color `i` the
/// first later color within the threshold is merged into it (Lab average
/// weighted by color weight, weights added) and the scan of `i` restarts.
pub fn merge_similar_colors(colors: Vec<DominantColor>, threshold: f32) -> Vec<DominantColor> {
    let mut entries: Vec<(Lab, f32)> = colors.iter().map(|c| (c.lab(), c.weight)).collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut merged_any = false;
    let mut i = 0;
    while i < entries.len() {
        let mut j = i + 1;
        while j < entries.len() {
            if delta_e(entries[i].0, entries[j].0) < threshold {
                let (lab_i, w_i) = entries[i];
                let (lab_j, w_j) = entries.remove(j);
                let total = w_i + w_j;
                let (fi, fj) = if total > 0.0 {
                    (w_i / total, w_j / total)
                } else {
                    (0.5, 0.5)
                };
                let lab = Lab::new(
                    lab_i.l * fi + lab_j.l * fj,
                    lab_i.a * fi + lab_j.a * fj,
                    lab_i.b * fi + lab_j.b * fj,
                );
                entries[i] = (lab, total.min(1.0));
                merged_any = true;
                j = i + 1;
            } else {
                j += 1;
            }
        }
        i += 1;
    }

    if !merged_any {
        return colors;
    }
    entries
        .into_iter()
        .map(|(lab, w)| DominantColor::new(lab_to_rgb(lab), w))
        .collect()
}

fn sort_by_weight(colors: &mut [DominantColor]) {
    colors.sort_by(|a, b| b.weight.total_cmp(&a.weight));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionQuality;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn solid(rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb(rgb)))
    }

    fn split_image() -> DynamicImage {
        let mut img = RgbImage::from_pixel(64, 64, Rgb([230, 40, 30]));
        for y in 0..64 {
            for x in 0..16 {
                img.put_pixel(x, y, Rgb([20, 60, 200]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_uniform_gray_single_color() {
        let result = DominantColorExtractor::default()
            .extract(&solid([128, 128, 128]), 1)
            .unwrap();
        assert_eq!(result.colors.len(), 1);
        assert!((result.colors[0].weight - 1.0).abs() < 1e-5);
        assert_eq!(result.colors[0].hex, "#808080");
    }

    #[test]
    fn test_two_colors_sorted_by_weight() {
        let result = DominantColorExtractor::default()
            .extract(&split_image(), 3)
            .unwrap();
        assert_eq!(result.colors.len(), 2);
        assert!(result.colors[0].weight >= result.colors[1].weight);
        assert!((result.colors[0].weight - 0.75).abs() < 0.05);
        assert!(result.colors[0].rgb.red > 0.8);
        assert!(result.colors[1].rgb.blue > 0.7);
        for c in &result.colors {
            assert!((0.0..=1.0).contains(&c.weight));
        }
    }

    #[test]
    fn test_fast_algorithm() {
        let config = ExtractionConfig {
            algorithm: ExtractionAlgorithm::Fast,
            quality: ExtractionQuality::Fast,
            ..ExtractionConfig::default()
        };
        let result = DominantColorExtractor::new(config)
            .extract(&split_image(), 3)
            .unwrap();
        assert!(!result.colors.is_empty());
        assert!(result.colors.windows(2).all(|w| w[0].weight >= w[1].weight));
        assert!(result.colors[0].rgb.red > 0.8);
    }

    #[test]
    fn test_transparent_image_is_empty() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 0])));
        let result = DominantColorExtractor::default().extract(&img, 0).unwrap();
        assert!(result.colors.is_empty());
        assert_eq!(result.brightness_cdf.len(), 256);
        assert!(result.brightness_cdf.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zero_sized_image_is_empty() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let result = DominantColorExtractor::default().extract(&img, 0).unwrap();
        assert!(result.colors.is_empty());
        assert_eq!(result.brightness_cdf, vec![0.0; 256]);
    }

    #[test]
    fn test_brightness_cdf_monotonic() {
        let result = DominantColorExtractor::default()
            .extract(&split_image(), 5)
            .unwrap();
        let cdf = &result.brightness_cdf;
        assert_eq!(cdf.len(), 256);
        assert!(cdf.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(cdf[255], 1.0);
    }

    #[test]
    fn test_merge_similar_colors() {
        let colors = vec![
            DominantColor::new(Srgb::new(0.80, 0.10, 0.10), 0.5),
            DominantColor::new(Srgb::new(0.82, 0.11, 0.10), 0.3),
            DominantColor::new(Srgb::new(0.10, 0.10, 0.80), 0.2),
        ];
        let merged = merge_similar_colors(colors, 8.0);
        assert_eq!(merged.len(), 2);
        assert!((merged[0].weight - 0.8).abs() < 1e-5);
        assert!((merged[1].weight - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_merge_keeps_distinct_colors() {
        let colors = vec![
            DominantColor::new(Srgb::new(1.0, 0.0, 0.0), 0.6),
            DominantColor::new(Srgb::new(0.0, 0.0, 1.0), 0.4),
        ];
        assert_eq!(merge_similar_colors(colors.clone(), 8.0), colors);
    }

    #[test]
    fn test_sample_weight_floor() {
        assert_eq!(sample_weight(Lab::new(50.0, 0.0, 0.0)), MIN_SAMPLE_WEIGHT);
        assert!(sample_weight(Lab::new(50.0, 60.0, 40.0)) > 0.2);
    }
}
