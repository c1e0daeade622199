//! Integration tests for the collection analysis pipeline
//!
//! These tests validate the end-to-end workflow including:
//! - Color space conversion properties
//! - Dominant color extraction and the brightness CDF
//! - Warmth and color cast scoring
//! - Global clustering, photo assignment and adaptive refinement
//! - Caching, failure handling, cancellation and progress reporting
//!
//! All images are synthetic, built in memory with the `image` crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, Rgb, RgbImage};
use palette::Srgb;
use photo_colorscan::clustering::auto_k::{candidate_range, GlobalClusterer};
use photo_colorscan::color::conversion::{delta_e, lab_to_rgb, rgb8_to_lab, rgb_to_lab};
use photo_colorscan::config::{AdaptiveConfig, ClusteringConfig};
use photo_colorscan::extraction::DominantColorExtractor;
use photo_colorscan::{
    analyze_photo, AnalysisError, AnalysisPipeline, AnalysisSettings, CancellationToken, InMemoryCache,
    PhotoSource, QualityLevel,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Photo source serving in-memory images
struct MemorySource {
    images: HashMap<String, DynamicImage>,
}

impl MemorySource {
    fn new(images: Vec<(&str, DynamicImage)>) -> Self {
        Self {
            images: images.into_iter().map(|(id, img)| (id.to_string(), img)).collect(),
        }
    }
}

impl PhotoSource for MemorySource {
    fn load(&self, photo_id: &str) -> photo_colorscan::Result<DynamicImage> {
        self.images
            .get(photo_id)
            .cloned()
            .ok_or_else(|| AnalysisError::ImageLoadError {
                message: format!("no such photo: {}", photo_id),
                source: None,
            })
    }
}

fn solid(r: u8, g: u8, b: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(48, 32, Rgb([r, g, b])))
}

/// Left half one color, right half another
fn halves(left: [u8; 3], right: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(48, 32, |x, _| if x < 24 { Rgb(left) } else { Rgb(right) }))
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn no_adaptive() -> AnalysisSettings {
    AnalysisSettings {
        adaptive: AdaptiveConfig {
            enabled: false,
            ..AdaptiveConfig::default()
        },
        ..AnalysisSettings::default()
    }
}

// ============================================================================
// Color Conversion Properties
// ============================================================================

#[test]
fn test_lab_round_trip_within_one_step() {
    for r in (0..=255u16).step_by(51) {
        for g in (0..=255u16).step_by(51) {
            for b in (0..=255u16).step_by(51) {
                let rgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
                let back = lab_to_rgb(rgb_to_lab(rgb));
                assert!((back.red - rgb.red).abs() <= 1.0 / 255.0, "{:?} -> {:?}", rgb, back);
                assert!((back.green - rgb.green).abs() <= 1.0 / 255.0, "{:?} -> {:?}", rgb, back);
                assert!((back.blue - rgb.blue).abs() <= 1.0 / 255.0, "{:?} -> {:?}", rgb, back);
            }
        }
    }
}

#[test]
fn test_delta_e_properties() {
    let a = rgb8_to_lab(200, 40, 90);
    let b = rgb8_to_lab(30, 180, 220);
    assert_eq!(delta_e(a, a), 0.0);
    assert!((delta_e(a, b) - delta_e(b, a)).abs() < 1e-5);
    assert!(delta_e(a, b) > 0.0);
}

// ============================================================================
// Per-Photo Analysis
// ============================================================================

#[test]
fn test_extraction_weights_sorted_and_cdf_monotonic() {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| match (x / 16 + y / 32) % 4 {
        0 => Rgb([230, 60, 40]),
        1 => Rgb([40, 160, 60]),
        2 => Rgb([30, 50, 200]),
        _ => Rgb([240, 230, 210]),
    }));
    let result = DominantColorExtractor::default().extract(&image, 7).unwrap();

    assert!(!result.colors.is_empty());
    for pair in result.colors.windows(2) {
        assert!(pair[0].weight >= pair[1].weight);
    }
    for c in &result.colors {
        assert!((0.0..=1.0).contains(&c.weight));
    }

    assert_eq!(result.brightness_cdf.len(), 256);
    for pair in result.brightness_cdf.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
    assert_eq!(result.brightness_cdf[255], 1.0);
}

#[test]
fn test_uniform_gray_photo() {
    let info = analyze_photo("gray", &solid(128, 128, 128), &AnalysisSettings::default()).unwrap();

    assert_eq!(info.dominant_colors.len(), 1);
    assert!((info.dominant_colors[0].weight - 1.0).abs() < 1e-4);

    let advanced = info.advanced.unwrap();
    assert!(advanced.warmth_score.abs() < 1e-3);
    assert!(advanced.color_cast.is_none());
}

#[test]
fn test_pure_red_photo() {
    let info = analyze_photo("red", &solid(255, 0, 0), &AnalysisSettings::default()).unwrap();

    let top = &info.dominant_colors[0];
    assert!((top.weight - 1.0).abs() < 1e-4);
    assert!(top.rgb.red > 0.99);
    assert!(top.rgb.green < 0.01);
    assert!(top.rgb.blue < 0.01);

    let advanced = info.advanced.unwrap();
    assert!(advanced.palette_score > 0.0);
    assert!(advanced.warmth_score > 0.0);
}

// ============================================================================
// Collection Analysis
// ============================================================================

#[test]
fn test_two_photos_manual_k() {
    let source = MemorySource::new(vec![
        ("warm", halves([220, 60, 30], [240, 200, 60])),
        ("cool", halves([30, 60, 200], [40, 170, 190])),
    ]);
    let mut settings = no_adaptive();
    settings.clustering.manual_k = Some(2);

    let pipeline = AnalysisPipeline::new(Arc::new(source), settings);
    let result = pipeline.analyze_collection(&ids(&["warm", "cool"]), |_| {});

    assert_eq!(result.total_photos, 2);
    assert_eq!(result.processed_photos, 2);
    assert_eq!(result.clusters.len(), 2);
    assert_eq!(result.quality_level, QualityLevel::Manual);
    assert!(result.davies_bouldin_index.is_some());
    assert!(result.inertia.is_some_and(|v| v >= 0.0));

    let total_colors: usize = result.photo_infos.iter().map(|p| p.dominant_colors.len()).sum();
    let assigned: usize = result.clusters.iter().map(|c| c.color_count).sum();
    assert_eq!(assigned, total_colors);
}

#[test]
fn test_empty_collection() {
    let pipeline = AnalysisPipeline::new(Arc::new(MemorySource::new(vec![])), AnalysisSettings::default());
    let result = pipeline.analyze_collection(&[], |_| {});

    assert_eq!(result.total_photos, 0);
    assert!(result.clusters.is_empty());
    assert!(result.photo_infos.is_empty());
    assert!(!result.cancelled);
}

#[test]
fn test_auto_k_bounds() {
    let points: Vec<[f32; 3]> = (0..80)
        .map(|i| {
            let group = (i % 4) as f32;
            [20.0 + group * 20.0, group * 10.0 - 15.0, (i % 7) as f32]
        })
        .collect();
    let weights = vec![1.0; points.len()];
    let config = ClusteringConfig::default();
    let (min_k, max_k) = candidate_range(points.len(), &config).unwrap();

    let result = GlobalClusterer::new(config).cluster(&points, &weights).unwrap();
    assert!(result.optimal_k >= min_k && result.optimal_k <= max_k);
    assert_eq!(result.best_clustering.centroids.len(), result.optimal_k);
    assert_eq!(result.scores.len(), max_k - min_k + 1);
}

#[test]
fn test_adaptive_refinement_keeps_indices_dense() {
    let source = MemorySource::new(vec![
        ("r1", solid(200, 30, 30)),
        ("r2", solid(205, 35, 28)),
        ("r3", solid(190, 28, 35)),
        ("b1", solid(30, 40, 200)),
        ("b2", solid(35, 45, 205)),
        ("g1", solid(40, 180, 60)),
    ]);
    let pipeline = AnalysisPipeline::new(Arc::new(source), AnalysisSettings::default());
    let result = pipeline.analyze_collection(&ids(&["r1", "r2", "r3", "b1", "b2", "g1"]), |_| {});

    assert!(!result.clusters.is_empty());
    for (i, c) in result.clusters.iter().enumerate() {
        assert_eq!(c.index, i);
    }
    for photo in &result.photo_infos {
        let idx = photo.primary_cluster_index.unwrap();
        assert!(idx < result.clusters.len());
        assert!(result.clusters[idx].photo_ids.contains(&photo.photo_id));
    }
    let assigned: usize = result.clusters.iter().map(|c| c.photo_count()).sum();
    assert_eq!(assigned, 6);

    let warm_cool = result.warm_cool.unwrap();
    assert_eq!(warm_cool.bins.iter().sum::<usize>(), 6);
    assert!(result.collection_feature.is_some());
}

#[test]
fn test_failed_photos_are_counted_and_skipped() {
    let source = MemorySource::new(vec![("a", solid(200, 100, 50)), ("b", solid(50, 100, 200))]);
    let pipeline = AnalysisPipeline::new(Arc::new(source), no_adaptive());
    let result = pipeline.analyze_collection(&ids(&["a", "missing", "b", "a"]), |_| {});

    assert_eq!(result.total_photos, 3);
    assert_eq!(result.processed_photos, 2);
    assert_eq!(result.failed_photos, 1);
    let order: Vec<&str> = result.photo_infos.iter().map(|p| p.photo_id.as_str()).collect();
    assert_eq!(order, vec!["a", "b"]);
}

#[test]
fn test_second_run_uses_cache() {
    let source = Arc::new(MemorySource::new(vec![
        ("a", halves([220, 60, 30], [30, 60, 200])),
        ("b", solid(40, 180, 60)),
        ("c", solid(240, 200, 60)),
    ]));
    let cache = Arc::new(InMemoryCache::new());
    let photos = ids(&["a", "b", "c"]);

    let pipeline = AnalysisPipeline::new(source, no_adaptive()).with_cache(cache.clone());
    let first = pipeline.analyze_collection(&photos, |_| {});
    let second = pipeline.analyze_collection(&photos, |_| {});

    assert_eq!(first.cached_photos, 0);
    assert_eq!(cache.len(), 3);
    assert_eq!(second.cached_photos, 3);
    assert_eq!(second.processed_photos, 3);

    let hexes = |r: &photo_colorscan::AnalysisResult| r.clusters.iter().map(|c| c.hex.clone()).collect::<Vec<_>>();
    assert_eq!(hexes(&first), hexes(&second));
}

#[test]
fn test_palette_does_not_depend_on_input_order() {
    let images: Vec<(String, DynamicImage)> = (0..24u32)
        .map(|i| {
            let left = [(i * 53 % 256) as u8, ((i * 97 + 40) % 256) as u8, ((i * 31 + 120) % 256) as u8];
            let right = [((i * 71 + 200) % 256) as u8, ((i * 19 + 10) % 256) as u8, ((i * 137 + 60) % 256) as u8];
            (format!("photo_{:02}", i), halves(left, right))
        })
        .collect();
    let source = Arc::new(MemorySource::new(
        images.iter().map(|(id, img)| (id.as_str(), img.clone())).collect(),
    ));
    let forward: Vec<String> = images.iter().map(|(id, _)| id.clone()).collect();
    let mut backward = forward.clone();
    backward.reverse();
    let mut interleaved: Vec<String> = forward.iter().step_by(2).cloned().collect();
    interleaved.extend(forward.iter().skip(1).step_by(2).cloned());

    for settings in [no_adaptive(), AnalysisSettings::default()] {
        let run = |order: &[String]| {
            AnalysisPipeline::new(source.clone(), settings.clone()).analyze_collection(order, |_| {})
        };
        let reference = run(&forward);
        let palette = |r: &photo_colorscan::AnalysisResult| {
            let mut hexes: Vec<String> = r.clusters.iter().map(|c| c.hex.clone()).collect();
            hexes.sort();
            hexes
        };
        let photo_colors = |r: &photo_colorscan::AnalysisResult| {
            r.photo_infos
                .iter()
                .map(|p| {
                    let hex = p.primary_cluster_index.map(|i| r.clusters[i].hex.clone());
                    (p.photo_id.clone(), hex)
                })
                .collect::<HashMap<_, _>>()
        };

        for order in [&backward, &interleaved] {
            let other = run(order);
            assert_eq!(other.optimal_k, reference.optimal_k);
            assert_eq!(palette(&other), palette(&reference));
            assert_eq!(photo_colors(&other), photo_colors(&reference));
        }
    }
}

#[test]
fn test_cancelled_run_is_flagged() {
    let source = MemorySource::new(vec![("a", solid(200, 100, 50))]);
    let token = CancellationToken::new();
    token.cancel();

    let pipeline = AnalysisPipeline::new(Arc::new(source), AnalysisSettings::default()).with_cancellation(token);
    let result = pipeline.analyze_collection(&ids(&["a"]), |_| {});

    assert!(result.cancelled);
    assert!(result.clusters.is_empty());
    assert_eq!(result.processed_photos, 0);
}

#[test]
fn test_progress_is_monotonic_and_completes() {
    let source = MemorySource::new(vec![
        ("a", solid(200, 30, 30)),
        ("b", solid(30, 40, 200)),
        ("c", solid(40, 180, 60)),
    ]);
    let mut settings = AnalysisSettings::default();
    settings.pipeline.progress_interval_ms = 0;
    let seen = Mutex::new(Vec::new());

    let pipeline = AnalysisPipeline::new(Arc::new(source), settings);
    pipeline.analyze_collection(&ids(&["a", "b", "c"]), |p| {
        seen.lock().unwrap().push(p.overall_progress);
    });

    let seen = seen.into_inner().unwrap();
    assert!(!seen.is_empty());
    for pair in seen.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
    assert_eq!(*seen.last().unwrap(), 1.0);
}
