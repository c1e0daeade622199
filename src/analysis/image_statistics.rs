//! Per-photo style features
//!
//! Discretizes tone and color statistics into levels and derives mood tags:
//! - Brightness, contrast and dynamic range from the Lab L channel
//! - Saturation from per-pixel HSL
//! - Color variety from dominant color weights
//! - Light direction from the centroid of bright superpixels
//!
//! Everything is computed from the SLIC/HSL byproducts of the warmth
//! analysis so cached photos never need their pixels again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::slic::superpixel_stats;
use crate::models::{DominantColor, HslAnalysisData, SlicAnalysisData};

/// Superpixels brighter than this count as highlights
const HIGHLIGHT_L: f32 = 70.0;
/// Pixels darker than this count as shadows
const SHADOW_L: f32 = 30.0;
/// Colors heavier than this count towards color variety
const VARIETY_WEIGHT: f32 = 0.12;
/// Mood tags lighter than this (after normalization) are dropped
const MOOD_TAG_MIN_WEIGHT: f32 = 0.05;

/// Three-step level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    fn from_thresholds(value: f32, low: f32, high: f32) -> Self {
        if value < low {
            Level::Low
        } else if value < high {
            Level::Medium
        } else {
            Level::High
        }
    }

    /// Brightness from mean L
    pub fn brightness(l_mean: f32) -> Self {
        Self::from_thresholds(l_mean, 35.0, 65.0)
    }

    /// Contrast from the standard deviation of L
    pub fn contrast(l_std: f32) -> Self {
        Self::from_thresholds(l_std, 14.0, 28.0)
    }

    /// Saturation from mean HSL saturation
    pub fn saturation(s_mean: f32) -> Self {
        Self::from_thresholds(s_mean, 0.18, 0.35)
    }

    /// Color variety from the number of significant colors
    pub fn variety(effective_color_count: usize) -> Self {
        match effective_color_count {
            0 | 1 => Level::Low,
            2..=4 => Level::Medium,
            _ => Level::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DynamicRange {
    Narrow,
    Medium,
    Wide,
}

impl DynamicRange {
    /// From `P95 - P5` of L
    pub fn from_range(range: f32) -> Self {
        if range < 30.0 {
            DynamicRange::Narrow
        } else if range < 55.0 {
            DynamicRange::Medium
        } else {
            DynamicRange::Wide
        }
    }
}

/// Apparent direction of the main light
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightDirection {
    Left,
    Right,
    Back,
    Overhead,
    Front,
    Unknown,
}

impl LightDirection {
    pub fn label(self) -> &'static str {
        match self {
            LightDirection::Left => "left",
            LightDirection::Right => "right",
            LightDirection::Back => "back",
            LightDirection::Overhead => "overhead",
            LightDirection::Front => "front",
            LightDirection::Unknown => "unknown",
        }
    }
}

/// Discretized style features of one photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFeature {
    pub brightness: Level,
    pub contrast: Level,
    pub dynamic_range: DynamicRange,
    pub light_direction: LightDirection,
    /// Fraction of pixels with L < 30
    pub shadow_ratio: f32,
    /// Fraction of pixels with L > 70
    pub highlight_ratio: f32,
    pub warmth_score: f32,
    pub saturation: Level,
    pub color_variety: Level,
    /// Normalized mood tag weights
    pub mood_tags: BTreeMap<String, f32>,
    pub l_mean: f32,
    pub l_std: f32,
    pub dynamic_range_value: f32,
    pub s_mean: f32,
}

struct LightnessStats {
    mean: f32,
    std: f32,
    range: f32,
    shadow_ratio: f32,
    highlight_ratio: f32,
}

fn lightness_stats(lab: &[[f32; 3]]) -> LightnessStats {
    let n = lab.len();
    if n == 0 {
        return LightnessStats {
            mean: 0.0,
            std: 0.0,
            range: 0.0,
            shadow_ratio: 0.0,
            highlight_ratio: 0.0,
        };
    }

    let mut values: Vec<f32> = lab.iter().map(|p| p[0]).collect();
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let variance = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n as f64;

    let shadows = values.iter().filter(|&&l| l < SHADOW_L).count();
    let highlights = values.iter().filter(|&&l| l > HIGHLIGHT_L).count();

    values.sort_by(f32::total_cmp);
    let p05 = values[((n as f32 * 0.05) as usize).min(n - 1)];
    let p95 = values[((n as f32 * 0.95) as usize).min(n - 1)];

    LightnessStats {
        mean: mean as f32,
        std: variance.sqrt() as f32,
        range: p95 - p05,
        shadow_ratio: shadows as f32 / n as f32,
        highlight_ratio: highlights as f32 / n as f32,
    }
}

/// Light direction from the pixel-weighted centroid of bright superpixels
pub fn light_direction(slic: &SlicAnalysisData) -> LightDirection {
    let superpixels = superpixel_stats(&slic.lab_buffer, &slic.labels, slic.width);

    let mut sum_x = 0.0_f64;
    let mut sum_y = 0.0_f64;
    let mut count = 0usize;
    for sp in superpixels.iter().filter(|sp| sp.mean_lab[0] > HIGHLIGHT_L) {
        sum_x += sp.mean_x as f64 * sp.pixel_count as f64;
        sum_y += sp.mean_y as f64 * sp.pixel_count as f64;
        count += sp.pixel_count;
    }
    if count == 0 {
        return LightDirection::Unknown;
    }

    let cx = (sum_x / count as f64) as f32 - slic.width as f32 / 2.0;
    let cy = (sum_y / count as f64) as f32 - slic.height as f32 / 2.0;

    if cx.abs() > cy.abs() {
        if cx > 0.0 {
            LightDirection::Right
        } else {
            LightDirection::Left
        }
    } else if cy < 0.0 {
        if cy.abs() > slic.height as f32 * 0.15 {
            LightDirection::Back
        } else {
            LightDirection::Overhead
        }
    } else {
        LightDirection::Front
    }
}

fn flag(condition: bool, yes: f32, no: f32) -> f32 {
    if condition {
        yes
    } else {
        no
    }
}

/// Normalized mood tag weights, keeping tags above 5%
pub fn mood_tags(
    brightness: Level,
    contrast: Level,
    saturation: Level,
    variety: Level,
    warmth: f32,
    light: LightDirection,
) -> BTreeMap<String, f32> {
    let cool = (-warmth).max(0.0);
    let warm = warmth.max(0.0);

    let raw = [
        (
            "quiet",
            cool * 0.4 + flag(saturation == Level::Low, 0.3, 0.0) + flag(brightness == Level::Low, 0.3, 0.1),
        ),
        (
            "calm",
            flag(variety == Level::Low, 0.4, 0.1)
                + flag(contrast == Level::Low, 0.4, 0.1)
                + flag(brightness == Level::Medium, 0.2, 0.1),
        ),
        (
            "lonely",
            cool * 0.4 + flag(brightness == Level::Low, 0.4, 0.1) + flag(saturation == Level::Low, 0.2, 0.1),
        ),
        (
            "nostalgic",
            warm * 0.4 + flag(saturation == Level::Low, 0.3, 0.15) + flag(contrast == Level::Low, 0.3, 0.1),
        ),
        ("warm", warm * 0.6 + flag(brightness == Level::High, 0.4, 0.2)),
        (
            "friendly",
            warm * 0.4
                + flag(brightness == Level::Medium, 0.3, 0.1)
                + flag(saturation == Level::Medium, 0.3, 0.1),
        ),
        (
            "cinematic",
            cool * 0.4 + flag(contrast == Level::High, 0.4, 0.1) + flag(brightness != Level::High, 0.2, 0.0),
        ),
        (
            "dramatic",
            flag(contrast == Level::High, 0.5, 0.2)
                + flag(matches!(light, LightDirection::Left | LightDirection::Right), 0.3, 0.1)
                + flag(light == LightDirection::Back, 0.2, 0.0),
        ),
        (
            "soft",
            flag(contrast == Level::Low, 0.6, 0.2) + flag(brightness == Level::High, 0.4, 0.1),
        ),
        (
            "muted",
            flag(saturation == Level::Low, 0.7, 0.2) + flag(warmth.abs() < 0.3, 0.3, 0.1),
        ),
        (
            "gentle",
            flag(contrast == Level::Low, 0.4, 0.1)
                + flag(saturation == Level::Low, 0.3, 0.1)
                + flag(warmth > -0.2, 0.3, 0.0),
        ),
        (
            "vibrant",
            flag(saturation == Level::High, 0.6, 0.2) + flag(brightness != Level::Low, 0.4, 0.1),
        ),
    ];

    normalize_tags(raw.iter().map(|(tag, w)| (tag.to_string(), *w)))
}

/// Scale weights to sum to 1 and drop those at or below 5%
pub(crate) fn normalize_tags(weights: impl IntoIterator<Item = (String, f32)>) -> BTreeMap<String, f32> {
    let weights: BTreeMap<String, f32> = weights.into_iter().collect();
    let total: f32 = weights.values().sum();
    if total <= 0.0 {
        return BTreeMap::new();
    }
    weights
        .into_iter()
        .map(|(tag, w)| (tag, w / total))
        .filter(|(_, w)| *w > MOOD_TAG_MIN_WEIGHT)
        .collect()
}

/// Compute the style features of one photo
///
/// # Arguments
///
/// * `slic` - Lab buffer and superpixel labels from the warmth analysis
/// * `hsl` - Per-pixel HSL values from the warmth analysis
/// * `colors` - Dominant colors of the photo
/// * `warmth` - Fused warmth score
pub fn compute_image_feature(
    slic: &SlicAnalysisData,
    hsl: &HslAnalysisData,
    colors: &[DominantColor],
    warmth: f32,
) -> ImageFeature {
    let labeled: Vec<[f32; 3]> = slic
        .lab_buffer
        .iter()
        .zip(&slic.labels)
        .filter(|(_, &label)| label >= 0)
        .map(|(p, _)| *p)
        .collect();
    let l = lightness_stats(&labeled);
    let s_mean = if hsl.pixels.is_empty() {
        0.0
    } else {
        hsl.pixels.iter().map(|p| p[1]).sum::<f32>() / hsl.pixels.len() as f32
    };

    let brightness = Level::brightness(l.mean);
    let contrast = Level::contrast(l.std);
    let saturation = Level::saturation(s_mean);
    let color_variety = Level::variety(colors.iter().filter(|c| c.weight > VARIETY_WEIGHT).count());
    let direction = light_direction(slic);

    ImageFeature {
        brightness,
        contrast,
        dynamic_range: DynamicRange::from_range(l.range),
        light_direction: direction,
        shadow_ratio: l.shadow_ratio,
        highlight_ratio: l.highlight_ratio,
        warmth_score: warmth,
        saturation,
        color_variety,
        mood_tags: mood_tags(brightness, contrast, saturation, color_variety, warmth, direction),
        l_mean: l.mean,
        l_std: l.std,
        dynamic_range_value: l.range,
        s_mean,
    }
}
