//! Collection-level style aggregation
//!
//! Folds the per-photo [`ImageFeature`]s of a run into one
//! [`CollectionFeature`]: modal levels, light direction shares, mean
//! warmth, palette shares, aggregated mood tags and rule-based style tags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::image_statistics::{normalize_tags, DynamicRange, ImageFeature, Level, LightDirection};
use crate::models::ColorCluster;

/// Palette entry with the share of photos it is primary for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleColor {
    pub name: String,
    pub hex: String,
    pub ratio: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionFeature {
    pub brightness: Level,
    pub contrast: Level,
    pub dynamic_range: DynamicRange,
    /// Share of photos per known light direction
    pub light_direction_stats: BTreeMap<String, f32>,
    pub mean_warmth_score: f32,
    pub saturation: Level,
    pub color_variety: Level,
    pub global_palette: Vec<StyleColor>,
    pub mood_tags: BTreeMap<String, f32>,
    pub style_tags: Vec<String>,
}

impl CollectionFeature {
    fn empty() -> Self {
        Self {
            brightness: Level::Medium,
            contrast: Level::Medium,
            dynamic_range: DynamicRange::Medium,
            light_direction_stats: BTreeMap::new(),
            mean_warmth_score: 0.0,
            saturation: Level::Medium,
            color_variety: Level::Medium,
            global_palette: Vec::new(),
            mood_tags: BTreeMap::new(),
            style_tags: Vec::new(),
        }
    }
}

/// Most frequent value; ties go to the smallest value
fn mode<T: Ord + Copy>(values: impl IntoIterator<Item = T>, fallback: T) -> T {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(T, usize)>, (v, c)| match best {
            Some((_, bc)) if bc >= c => best,
            _ => Some((v, c)),
        })
        .map(|(v, _)| v)
        .unwrap_or(fallback)
}

fn style_tags(
    brightness: Level,
    contrast: Level,
    saturation: Level,
    variety: Level,
    warmth: f32,
) -> Vec<String> {
    let mut tags = Vec::new();

    tags.push(if warmth < -0.3 {
        "cool_toned"
    } else if warmth > 0.3 {
        "warm_toned"
    } else {
        "neutral_toned"
    });

    match saturation {
        Level::Low => tags.push("muted_colors"),
        Level::High => tags.push("vibrant_colors"),
        Level::Medium => {}
    }
    match brightness {
        Level::Low => tags.push("low_key"),
        Level::High => tags.push("high_key"),
        Level::Medium => {}
    }
    match contrast {
        Level::Low => tags.push("soft_contrast"),
        Level::High => tags.push("high_contrast"),
        Level::Medium => {}
    }
    match variety {
        Level::Low => tags.push("monochromatic"),
        Level::High => tags.push("colorful"),
        Level::Medium => {}
    }

    if saturation == Level::Low && warmth < -0.2 {
        tags.push("film_like");
    }
    if contrast == Level::High && warmth < -0.2 {
        tags.push("cinematic");
    }
    if brightness == Level::High && saturation == Level::Low {
        tags.push("airy");
    }

    tags.into_iter().map(str::to_string).collect()
}

/// Aggregate per-photo features and the final palette
///
/// # Arguments
///
/// * `features` - Style features of every analyzed photo
/// * `palette` - Final global palette
pub fn aggregate_collection_feature(features: &[&ImageFeature], palette: &[ColorCluster]) -> CollectionFeature {
    if features.is_empty() {
        return CollectionFeature::empty();
    }
    let n = features.len() as f32;

    let brightness = mode(features.iter().map(|f| f.brightness), Level::Medium);
    let contrast = mode(features.iter().map(|f| f.contrast), Level::Medium);
    let dynamic_range = mode(features.iter().map(|f| f.dynamic_range), DynamicRange::Medium);
    let saturation = mode(features.iter().map(|f| f.saturation), Level::Medium);
    let color_variety = mode(features.iter().map(|f| f.color_variety), Level::Medium);

    let mut direction_counts: BTreeMap<String, usize> = BTreeMap::new();
    for f in features.iter().filter(|f| f.light_direction != LightDirection::Unknown) {
        *direction_counts
            .entry(f.light_direction.label().to_string())
            .or_default() += 1;
    }
    let known: usize = direction_counts.values().sum();
    let light_direction_stats = direction_counts
        .into_iter()
        .map(|(d, c)| (d, c as f32 / known.max(1) as f32))
        .collect();

    let mean_warmth_score = features.iter().map(|f| f.warmth_score).sum::<f32>() / n;

    let global_palette = palette
        .iter()
        .map(|c| StyleColor {
            name: c.name.clone(),
            hex: c.hex.clone(),
            ratio: c.photo_count() as f32 / n,
        })
        .collect();

    let mut mood_totals: BTreeMap<String, f32> = BTreeMap::new();
    for f in features {
        for (tag, w) in &f.mood_tags {
            *mood_totals.entry(tag.clone()).or_default() += w;
        }
    }

    CollectionFeature {
        brightness,
        contrast,
        dynamic_range,
        light_direction_stats,
        mean_warmth_score,
        saturation,
        color_variety,
        global_palette,
        mood_tags: normalize_tags(mood_totals),
        style_tags: style_tags(brightness, contrast, saturation, color_variety, mean_warmth_score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(brightness: Level, warmth: f32, light: LightDirection) -> ImageFeature {
        let mut mood_tags = BTreeMap::new();
        mood_tags.insert("warm".to_string(), 0.6);
        mood_tags.insert("soft".to_string(), 0.4);
        ImageFeature {
            brightness,
            contrast: Level::Low,
            dynamic_range: DynamicRange::Narrow,
            light_direction: light,
            shadow_ratio: 0.1,
            highlight_ratio: 0.2,
            warmth_score: warmth,
            saturation: Level::Low,
            color_variety: Level::Medium,
            mood_tags,
            l_mean: 60.0,
            l_std: 10.0,
            dynamic_range_value: 20.0,
            s_mean: 0.1,
        }
    }

    #[test]
    fn test_mode_ties_go_low() {
        assert_eq!(mode([Level::High, Level::Low], Level::Medium), Level::Low);
        assert_eq!(mode([Level::High, Level::High, Level::Low], Level::Medium), Level::High);
        assert_eq!(mode(Vec::<Level>::new(), Level::Medium), Level::Medium);
    }

    #[test]
    fn test_aggregate() {
        let a = feature(Level::High, 0.5, LightDirection::Left);
        let b = feature(Level::High, 0.3, LightDirection::Unknown);
        let c = feature(Level::Low, 0.4, LightDirection::Front);

        let mut cluster = ColorCluster::from_lab(0, palette::Lab::new(60.0, 20.0, 30.0));
        cluster.photo_ids = vec!["a".into(), "b".into()];

        let agg = aggregate_collection_feature(&[&a, &b, &c], &[cluster]);
        assert_eq!(agg.brightness, Level::High);
        assert!((agg.mean_warmth_score - 0.4).abs() < 1e-6);
        assert_eq!(agg.light_direction_stats.len(), 2);
        assert!((agg.light_direction_stats["left"] - 0.5).abs() < 1e-6);
        assert!((agg.global_palette[0].ratio - 2.0 / 3.0).abs() < 1e-6);
        assert!((agg.mood_tags["warm"] - 0.6).abs() < 1e-5);
        assert!(agg.style_tags.contains(&"warm_toned".to_string()));
        assert!(agg.style_tags.contains(&"airy".to_string()));
        assert!(agg.style_tags.contains(&"soft_contrast".to_string()));
    }

    #[test]
    fn test_empty_collection() {
        let agg = aggregate_collection_feature(&[], &[]);
        assert!(agg.style_tags.is_empty());
        assert_eq!(agg.brightness, Level::Medium);
    }
}
