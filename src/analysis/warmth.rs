//! Warm/cool scoring
//!
//! Two sub-scores are fused into one warmth value in [-1, 1]:
//! - Local: area-weighted mean b* of SLIC superpixels, with lightness,
//!   chroma and foliage (green) adjustments
//! - Palette: chroma-weighted mean b* of the photo's dominant colors
//!
//! `final = 0.7 * local + 0.3 * palette`. Near-black, near-white and
//! near-gray regions are ignored by both; when nothing survives the
//! sub-score is 0.
//!
//! The analyzer also produces the color cast and keeps the SLIC and HSL
//! byproducts for style feature computation.

use std::collections::BTreeMap;

use image::DynamicImage;

use super::color_cast::compute_color_cast;
use super::slic::{segment, superpixel_stats, SlicParams, Superpixel};
use crate::color::conversion::{lab_to_array, rgb_to_hsl, rgb_to_lab};
use crate::config::WarmthConfig;
use crate::constants::warmth::{
    HISTOGRAM_BINS, LOCAL_WEIGHT, MAX_LIGHTNESS, MIN_CHROMA, MIN_LIGHTNESS,
    PALETTE_CHROMA_NORMALIZER, PALETTE_WEIGHT, WARM_SCALE,
};
use crate::models::{
    AdvancedColorAnalysis, DominantColor, HslAnalysisData, PhotoColorInfo, SlicAnalysisData,
    WarmCoolDistribution,
};
use crate::preprocess::ImagePreprocessor;
use crate::Result;

/// True when a region is chromatic and neither near-black nor near-white
fn passes_gate(l: f32, chroma: f32) -> bool {
    (MIN_LIGHTNESS..=MAX_LIGHTNESS).contains(&l) && chroma >= MIN_CHROMA
}

fn lightness_weight(l: f32) -> f32 {
    if l < 30.0 {
        0.6
    } else if l > 70.0 {
        1.2
    } else {
        1.0
    }
}

fn chroma_weight(chroma: f32) -> f32 {
    if chroma < 15.0 {
        0.5
    } else if chroma > 40.0 {
        0.7
    } else {
        1.0
    }
}

/// Halves the weight of foliage-like regions (green, yellowish, not bright)
fn green_penalty(l: f32, a: f32, b: f32) -> f32 {
    if a < -5.0 && b > 5.0 && l < 75.0 {
        0.5
    } else {
        1.0
    }
}

fn normalize_b(mean_b: f32) -> f32 {
    mean_b.clamp(-WARM_SCALE, WARM_SCALE) / WARM_SCALE
}

/// Superpixel based warmth score
///
/// # Arguments
///
/// * `superpixels` - Non-empty superpixels of one image
/// * `total_pixels` - Pixel count of the image, for area fractions
pub fn local_warmth_score(superpixels: &[Superpixel], total_pixels: usize) -> f32 {
    if total_pixels == 0 {
        return 0.0;
    }
    let mut weighted_b = 0.0_f64;
    let mut weight_sum = 0.0_f64;

    for sp in superpixels {
        let [l, a, b] = sp.mean_lab;
        let chroma = (a * a + b * b).sqrt();
        if !passes_gate(l, chroma) {
            continue;
        }
        let area = sp.pixel_count as f32 / total_pixels as f32;
        let w = area * lightness_weight(l) * chroma_weight(chroma) * green_penalty(l, a, b);
        weighted_b += (w * b) as f64;
        weight_sum += w as f64;
    }

    if weight_sum <= 0.0 {
        0.0
    } else {
        normalize_b((weighted_b / weight_sum) as f32)
    }
}

/// Dominant color based warmth score
pub fn palette_warmth_score(colors: &[DominantColor]) -> f32 {
    let mut weighted_b = 0.0_f64;
    let mut weight_sum = 0.0_f64;

    for color in colors {
        let lab = color.lab();
        let chroma = (lab.a * lab.a + lab.b * lab.b).sqrt();
        if !passes_gate(lab.l, chroma) {
            continue;
        }
        let w = color.weight * chroma / PALETTE_CHROMA_NORMALIZER;
        weighted_b += (w * lab.b) as f64;
        weight_sum += w as f64;
    }

    if weight_sum <= 0.0 {
        0.0
    } else {
        normalize_b((weighted_b / weight_sum) as f32)
    }
}

/// `0.7 * local + 0.3 * palette`
pub fn fuse_scores(local: f32, palette: f32) -> f32 {
    (LOCAL_WEIGHT * local + PALETTE_WEIGHT * palette).clamp(-1.0, 1.0)
}

/// Warm/cool and color cast analyzer
#[derive(Debug, Clone, Copy, Default)]
pub struct WarmCoolAnalyzer {
    config: WarmthConfig,
}

impl WarmCoolAnalyzer {
    pub fn new(config: WarmthConfig) -> Self {
        Self { config }
    }

    /// Analyze one photo
    ///
    /// # Arguments
    ///
    /// * `image` - Decoded photo
    /// * `colors` - Dominant colors already extracted from it
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::EmptyImage` if the image has no pixels
    pub fn analyze(&self, image: &DynamicImage, colors: &[DominantColor]) -> Result<AdvancedColorAnalysis> {
        let preprocessed =
            ImagePreprocessor::gamma_encoded(self.config.max_dimension).preprocess(image)?;
        let width = preprocessed.width() as usize;
        let height = preprocessed.height() as usize;

        let pixels = preprocessed.extract_rgb_pixels(0);
        preprocessed.release();

        let mut lab_buffer = Vec::with_capacity(pixels.len());
        let mut opaque_lab = Vec::with_capacity(pixels.len());
        let mut hsl = Vec::with_capacity(pixels.len());
        for p in &pixels {
            let lab = lab_to_array(rgb_to_lab(p.rgb));
            lab_buffer.push(lab);
            if p.is_opaque() {
                opaque_lab.push(lab);
                let h = rgb_to_hsl(p.rgb);
                hsl.push([h.hue, h.saturation, h.lightness]);
            }
        }

        // Transparent pixels keep their place in the label map but belong to no superpixel
        let mut segmentation = segment(&lab_buffer, width, height, SlicParams::from(self.config));
        for (label, p) in segmentation.labels.iter_mut().zip(&pixels) {
            if !p.is_opaque() {
                *label = -1;
            }
        }
        let superpixels = superpixel_stats(&lab_buffer, &segmentation.labels, width);

        let local_score = local_warmth_score(&superpixels, opaque_lab.len());
        let palette_score = palette_warmth_score(colors);
        let color_cast = compute_color_cast(&opaque_lab);

        Ok(AdvancedColorAnalysis {
            warmth_score: fuse_scores(local_score, palette_score),
            local_score,
            palette_score,
            color_cast,
            slic: Some(SlicAnalysisData {
                width,
                height,
                lab_buffer,
                labels: segmentation.labels,
            }),
            hsl: Some(HslAnalysisData { pixels: hsl }),
        })
    }
}

/// Histogram bin of a score in [-1, 1]
pub fn histogram_bin(score: f32, bins: usize) -> usize {
    let max_bin = bins.saturating_sub(1);
    let pos = ((score.clamp(-1.0, 1.0) + 1.0) / 2.0) * max_bin as f32;
    (pos.floor().max(0.0) as usize).min(max_bin)
}

/// Warm/cool histogram over the photos that carry a warmth analysis
///
/// Returns `None` when no photo has one.
pub fn warm_cool_distribution(photos: &[PhotoColorInfo]) -> Option<WarmCoolDistribution> {
    let scores: BTreeMap<String, f32> = photos
        .iter()
        .filter_map(|p| p.advanced.as_ref().map(|a| (p.photo_id.clone(), a.warmth_score)))
        .collect();
    if scores.is_empty() {
        return None;
    }

    let mut bins = vec![0usize; HISTOGRAM_BINS];
    for &s in scores.values() {
        bins[histogram_bin(s, HISTOGRAM_BINS)] += 1;
    }

    let values: Vec<f32> = scores.values().copied().collect();
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    Some(WarmCoolDistribution {
        bins,
        scores,
        mean,
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use palette::Srgb;

    fn superpixel(lab: [f32; 3], count: usize) -> Superpixel {
        Superpixel {
            label: 0,
            pixel_count: count,
            mean_lab: lab,
            mean_x: 0.0,
            mean_y: 0.0,
        }
    }

    #[test]
    fn test_gray_superpixels_score_zero() {
        let sps = vec![superpixel([50.0, 1.0, 1.0], 10), superpixel([99.0, 0.0, 30.0], 10)];
        assert_eq!(local_warmth_score(&sps, 20), 0.0);
    }

    #[test]
    fn test_local_score_sign_and_clamp() {
        let warm = vec![superpixel([60.0, 10.0, 60.0], 10)];
        assert_eq!(local_warmth_score(&warm, 10), 1.0);

        let cool = vec![superpixel([60.0, 0.0, -20.0], 10)];
        assert!((local_warmth_score(&cool, 10) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_green_penalty_reduces_foliage() {
        let sps = vec![
            superpixel([50.0, -20.0, 20.0], 50),
            superpixel([50.0, 0.0, -20.0], 50),
        ];
        // Foliage has half the weight: (0.5*20 - 20) / 1.5 = -6.67
        let score = local_warmth_score(&sps, 100);
        assert!((score - (-20.0 / 3.0 / 40.0)).abs() < 1e-4);
    }

    #[test]
    fn test_palette_score() {
        let red = vec![DominantColor::new(Srgb::new(1.0, 0.0, 0.0), 1.0)];
        assert!(palette_warmth_score(&red) > 0.9);

        let blue = vec![DominantColor::new(Srgb::new(0.0, 0.0, 1.0), 1.0)];
        assert!(palette_warmth_score(&blue) < -0.9);

        let gray = vec![DominantColor::new(Srgb::new(0.5, 0.5, 0.5), 1.0)];
        assert_eq!(palette_warmth_score(&gray), 0.0);
        assert_eq!(palette_warmth_score(&[]), 0.0);
    }

    #[test]
    fn test_fusion() {
        assert!((fuse_scores(1.0, -1.0) - 0.4).abs() < 1e-6);
        assert_eq!(fuse_scores(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_analyze_uniform_gray() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(48, 32, Rgb([128, 128, 128])));
        let gray = vec![DominantColor::new(Srgb::new(0.502, 0.502, 0.502), 1.0)];
        let analysis = WarmCoolAnalyzer::default().analyze(&img, &gray).unwrap();

        assert_eq!(analysis.warmth_score, 0.0);
        assert!(analysis.color_cast.is_none());
        let slic = analysis.slic.unwrap();
        assert_eq!(slic.labels.len(), 48 * 32);
        assert_eq!(analysis.hsl.unwrap().pixels.len(), 48 * 32);
    }

    #[test]
    fn test_transparent_pixels_are_ignored() {
        use image::{Rgba, RgbaImage};

        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(48, 32, |x, _| {
            if x < 24 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 0, 0, 255])
            }
        }));
        let red = vec![DominantColor::new(Srgb::new(1.0, 0.0, 0.0), 1.0)];
        let analysis = WarmCoolAnalyzer::default().analyze(&img, &red).unwrap();

        // Only flat red remains, so there is no tonal range for a cast
        assert!(analysis.color_cast.is_none());
        assert!(analysis.local_score > 0.9);
        assert_eq!(analysis.hsl.unwrap().pixels.len(), 24 * 32);

        let slic = analysis.slic.unwrap();
        assert_eq!(slic.labels.len(), 48 * 32);
        assert_eq!(slic.labels.iter().filter(|&&l| l < 0).count(), 24 * 32);
        assert!(slic.labels.iter().enumerate().all(|(i, &l)| (i % 48 < 24) == (l < 0)));
    }

    #[test]
    fn test_analyze_pure_red_is_warm() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([255, 0, 0])));
        let red = vec![DominantColor::new(Srgb::new(1.0, 0.0, 0.0), 1.0)];
        let analysis = WarmCoolAnalyzer::default().analyze(&img, &red).unwrap();
        assert!(analysis.local_score > 0.9);
        assert!(analysis.palette_score > 0.9);
        assert!(analysis.warmth_score > 0.9);
    }

    #[test]
    fn test_histogram_bins() {
        assert_eq!(histogram_bin(-1.0, 20), 0);
        assert_eq!(histogram_bin(1.0, 20), 19);
        assert_eq!(histogram_bin(0.0, 20), 9);
        assert_eq!(histogram_bin(5.0, 20), 19);
    }

    #[test]
    fn test_distribution_skips_incomplete_photos() {
        let mut warm = PhotoColorInfo::new("warm");
        warm.advanced = Some(AdvancedColorAnalysis {
            warmth_score: 0.8,
            local_score: 0.8,
            palette_score: 0.8,
            color_cast: None,
            slic: None,
            hsl: None,
        });
        let bare = PhotoColorInfo::new("bare");

        let dist = warm_cool_distribution(&[warm, bare.clone()]).unwrap();
        assert_eq!(dist.bins.iter().sum::<usize>(), 1);
        assert_eq!(dist.scores.len(), 1);
        assert!((dist.mean - 0.8).abs() < 1e-6);
        assert!(warm_cool_distribution(&[bare]).is_none());
    }
}
