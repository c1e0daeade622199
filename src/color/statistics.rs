//! Hue, lightness and saturation statistics, computed on demand
//!
//! Each photo is represented by its heaviest dominant color.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::conversion::rgb_to_hsl;
use crate::models::{ColorCluster, PhotoColorInfo};

/// Buckets at or below this share are left out of distributions
const MIN_SHARE: f32 = 0.05;

const HUE_RANGES: [(&str, f32, f32); 9] = [
    ("red", 345.0, 15.0),
    ("orange", 15.0, 45.0),
    ("yellow", 45.0, 75.0),
    ("yellow-green", 75.0, 105.0),
    ("green", 105.0, 165.0),
    ("cyan", 165.0, 195.0),
    ("blue", 195.0, 255.0),
    ("purple", 255.0, 285.0),
    ("magenta", 285.0, 345.0),
];

const LIGHTNESS_RANGES: [(&str, f32, f32); 5] = [
    ("very dark", 0.0, 0.2),
    ("dark", 0.2, 0.4),
    ("mid", 0.4, 0.6),
    ("light", 0.6, 0.8),
    ("very light", 0.8, 1.0),
];

const SATURATION_RANGES: [(&str, f32, f32); 4] = [
    ("gray", 0.0, 0.2),
    ("soft", 0.2, 0.5),
    ("vivid", 0.5, 0.8),
    ("intense", 0.8, 1.0),
];

/// Share of values falling into a named range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionBucket {
    pub range: String,
    pub percentage: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalColorStatistics {
    /// Top one or two hue families joined by '+', or "mixed"
    pub dominant_hue_range: String,
    /// "low-key", "mid-key" or "high-key"
    pub dominant_value: String,
    pub average_lightness: f32,
    /// "muted", "soft" or "vivid"
    pub dominant_saturation: String,
    pub average_saturation: f32,
    pub hue_distribution: Vec<DistributionBucket>,
    pub lightness_distribution: Vec<DistributionBucket>,
    pub saturation_distribution: Vec<DistributionBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterColorStatistics {
    pub hue_range: (f32, f32),
    pub hue_std_dev: f32,
    pub lightness_range: (f32, f32),
    pub lightness_std_dev: f32,
    pub saturation_range: (f32, f32),
    pub saturation_std_dev: f32,
    /// `max(0, 1 - (hue_std/360 + lightness_std + saturation_std) / 3)`
    pub consistency: f32,
    pub photo_count: usize,
}

fn in_hue_range(hue: f32, min: f32, max: f32) -> bool {
    if min > max {
        hue >= min || hue < max
    } else {
        hue >= min && hue < max
    }
}

fn distribution<F>(values: &[f32], ranges: &[(&str, f32, f32)], contains: F) -> Vec<DistributionBucket>
where
    F: Fn(f32, f32, f32) -> bool,
{
    if values.is_empty() {
        return Vec::new();
    }
    let total = values.len() as f32;
    let mut buckets: Vec<DistributionBucket> = ranges
        .iter()
        .map(|&(name, min, max)| DistributionBucket {
            range: name.to_string(),
            percentage: values.iter().filter(|&&v| contains(v, min, max)).count() as f32 / total,
        })
        .filter(|b| b.percentage > MIN_SHARE)
        .collect();
    buckets.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    buckets
}

/// Half-open range, except that the top of the last range is included
fn in_unit_range(v: f32, min: f32, max: f32) -> bool {
    v >= min && (v < max || (max >= 1.0 && v <= max))
}

fn min_max(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn std_dev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n).sqrt()
}

/// Collection-wide distributions of each photo's heaviest color
pub fn global_statistics(photos: &[PhotoColorInfo]) -> GlobalColorStatistics {
    let mut hues = Vec::new();
    let mut lightness = Vec::new();
    let mut saturation = Vec::new();
    let mut weighted_l = 0.0_f32;
    let mut weighted_s = 0.0_f32;
    let mut total_weight = 0.0_f32;

    for color in photos.iter().filter_map(|p| p.dominant_colors.first()) {
        let hsl = rgb_to_hsl(color.rgb);
        hues.push(hsl.hue);
        lightness.push(hsl.lightness);
        saturation.push(hsl.saturation);
        weighted_l += hsl.lightness * color.weight;
        weighted_s += hsl.saturation * color.weight;
        total_weight += color.weight;
    }

    let average_lightness = if total_weight > 0.0 { weighted_l / total_weight } else { 0.0 };
    let average_saturation = if total_weight > 0.0 { weighted_s / total_weight } else { 0.0 };

    let hue_distribution = distribution(&hues, &HUE_RANGES, in_hue_range);
    let dominant_hue_range = match hue_distribution.as_slice() {
        [] => "mixed".to_string(),
        [only] => only.range.clone(),
        [first, second, ..] => format!("{}+{}", first.range, second.range),
    };

    let dominant_value = if average_lightness < 0.35 {
        "low-key"
    } else if average_lightness < 0.65 {
        "mid-key"
    } else {
        "high-key"
    };

    let dominant_saturation = if average_saturation < 0.25 {
        "muted"
    } else if average_saturation < 0.6 {
        "soft"
    } else {
        "vivid"
    };

    GlobalColorStatistics {
        dominant_hue_range,
        dominant_value: dominant_value.to_string(),
        average_lightness,
        dominant_saturation: dominant_saturation.to_string(),
        average_saturation,
        hue_distribution,
        lightness_distribution: distribution(&lightness, &LIGHTNESS_RANGES, in_unit_range),
        saturation_distribution: distribution(&saturation, &SATURATION_RANGES, in_unit_range),
    }
}

/// Spread of the heaviest colors of a cluster's photos
pub fn cluster_statistics(cluster: &ColorCluster, photos: &[PhotoColorInfo]) -> ClusterColorStatistics {
    let members: HashSet<&str> = cluster.photo_ids.iter().map(String::as_str).collect();

    let mut hues = Vec::new();
    let mut lightness = Vec::new();
    let mut saturation = Vec::new();
    let mut photo_count = 0;

    for photo in photos.iter().filter(|p| members.contains(p.photo_id.as_str())) {
        photo_count += 1;
        if let Some(color) = photo.dominant_colors.first() {
            let hsl = rgb_to_hsl(color.rgb);
            hues.push(hsl.hue);
            lightness.push(hsl.lightness);
            saturation.push(hsl.saturation);
        }
    }

    let hue_std_dev = std_dev(&hues);
    let lightness_std_dev = std_dev(&lightness);
    let saturation_std_dev = std_dev(&saturation);
    let consistency = if photo_count == 0 {
        0.0
    } else {
        (1.0 - (hue_std_dev / 360.0 + lightness_std_dev + saturation_std_dev) / 3.0).max(0.0)
    };

    ClusterColorStatistics {
        hue_range: min_max(&hues),
        hue_std_dev,
        lightness_range: min_max(&lightness),
        lightness_std_dev,
        saturation_range: min_max(&saturation),
        saturation_std_dev,
        consistency,
        photo_count,
    }
}
