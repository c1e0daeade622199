//! Configuration structures for the photo_colorscan analysis pipeline.
//!
//! This module defines all tunable parameters for color analysis,
//! organized into logical groups for extraction, clustering, refinement,
//! warmth scoring and scheduling.
//!
//! # Configuration Loading
//!
//! Configuration can be loaded from JSON files or constructed programmatically:
//!
//! ```no_run
//! use photo_colorscan::AnalysisSettings;
//! use std::path::Path;
//!
//! // Load from file
//! let settings = AnalysisSettings::from_json_file(Path::new("settings.json"))?;
//!
//! // Or use defaults
//! let settings = AnalysisSettings::default();
//! # Ok::<(), photo_colorscan::AnalysisError>(())
//! ```
//!
//! # Configuration Sections
//!
//! - [`ExtractionConfig`]: per-photo dominant color extraction
//! - [`ClusteringConfig`]: global palette clustering and auto-K range
//! - [`AdaptiveConfig`]: merge/prune refinement of the global palette
//! - [`WarmthConfig`]: SLIC parameters for warm/cool scoring
//! - [`PipelineSettings`]: concurrency, caching and progress throttling
//!
//! Invalid values are clamped by [`AnalysisSettings::sanitized`] rather than
//! rejected.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants;
use crate::Result;

/// Dominant color extraction algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExtractionAlgorithm {
    /// Weighted K-means in Lab space
    #[default]
    Perceptual,
    /// Unweighted K-means on sampled RGB pixels
    Fast,
}

/// Extraction quality preset (resolution and sample count)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExtractionQuality {
    Fast,
    #[default]
    Balanced,
    Fine,
}

impl ExtractionQuality {
    /// Longest image side used for extraction
    pub fn max_dimension(self) -> u32 {
        match self {
            ExtractionQuality::Fast => 100,
            ExtractionQuality::Balanced => 256,
            ExtractionQuality::Fine => 512,
        }
    }

    /// Number of pixels sampled for clustering
    pub fn sample_count(self) -> usize {
        match self {
            ExtractionQuality::Fast => 800,
            ExtractionQuality::Balanced => 2000,
            ExtractionQuality::Fine => 5000,
        }
    }
}

/// Complete analysis configuration.
///
/// Contains all parameters needed to analyze a collection from photo
/// identifiers to a global palette. Can be serialized to/from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisSettings {
    /// Per-photo extraction parameters
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Global clustering parameters
    #[serde(default)]
    pub clustering: ClusteringConfig,

    /// Adaptive refinement parameters
    #[serde(default)]
    pub adaptive: AdaptiveConfig,

    /// Warm/cool scoring parameters
    #[serde(default)]
    pub warmth: WarmthConfig,

    /// Scheduling parameters
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// Dominant color extraction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub algorithm: ExtractionAlgorithm,

    pub quality: ExtractionQuality,

    /// Merge colors closer than `merge_delta_e` after clustering
    pub auto_merge_similar_colors: bool,

    /// Number of dominant colors requested per photo
    pub target_count: usize,

    /// ΔE threshold for merging near-duplicate colors
    pub merge_delta_e: f32,

    /// Base seed for sampling and K-means++ seeding
    pub seed: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            algorithm: ExtractionAlgorithm::Perceptual,
            quality: ExtractionQuality::Balanced,
            auto_merge_similar_colors: true,
            target_count: constants::extraction::DEFAULT_TARGET_COUNT,
            merge_delta_e: constants::extraction::MERGE_DELTA_E,
            seed: 42,
        }
    }
}

/// Global clustering parameters.
///
/// When `manual_k` is set the auto-K search is skipped entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// User-specified cluster count
    pub manual_k: Option<usize>,

    /// Lower bound of the automatic K range
    pub min_k: usize,

    /// Upper bound of the automatic K range
    pub max_k: usize,

    /// Iteration cap per K-means run
    pub max_iterations: usize,

    /// Concurrent K candidates in automatic mode
    pub max_concurrent_k_tests: usize,

    /// Points used to estimate the silhouette score
    pub silhouette_sample_size: usize,

    /// Base seed; each candidate K derives its own seed from it
    pub seed: u64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            manual_k: None,
            min_k: constants::clustering::MIN_K,
            max_k: constants::clustering::MAX_K,
            max_iterations: constants::clustering::MAX_ITERATIONS,
            max_concurrent_k_tests: constants::clustering::MAX_CONCURRENT_K_TESTS,
            silhouette_sample_size: constants::clustering::SILHOUETTE_SAMPLE_SIZE,
            seed: 42,
        }
    }
}

/// Adaptive refinement parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Run refinement after global clustering
    pub enabled: bool,

    /// Clusters closer than this ΔE are merged
    pub merge_threshold_delta_e: f32,

    /// Clusters with fewer photos are dropped
    pub min_cluster_size: usize,

    /// Mean member distance above which a cluster may be split
    pub split_threshold_intra_dist: f32,

    /// Only merge clusters whose names share a base color
    pub use_color_name_similarity: bool,

    /// Split dispersed clusters in two
    #[serde(default)]
    pub split_dispersed: bool,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            merge_threshold_delta_e: constants::adaptive::MERGE_THRESHOLD_DELTA_E,
            min_cluster_size: constants::adaptive::MIN_CLUSTER_SIZE,
            split_threshold_intra_dist: constants::adaptive::SPLIT_THRESHOLD_INTRA_DIST,
            use_color_name_similarity: true,
            split_dispersed: false,
        }
    }
}

/// SLIC parameters used by warm/cool and style analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarmthConfig {
    /// Longest image side used for superpixel analysis
    pub max_dimension: u32,

    /// Target number of superpixels
    pub segments: usize,

    /// SLIC compactness
    pub compactness: f32,

    /// SLIC iteration cap
    pub iterations: usize,
}

impl Default for WarmthConfig {
    fn default() -> Self {
        Self {
            max_dimension: constants::warmth::ANALYSIS_MAX_DIMENSION,
            segments: constants::slic::TARGET_SEGMENTS,
            compactness: constants::slic::COMPACTNESS,
            iterations: constants::slic::ITERATIONS,
        }
    }
}

/// Scheduling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Photos analyzed concurrently
    pub max_concurrent_extractions: usize,

    /// Reuse cached per-photo results
    pub use_cache: bool,

    /// Minimum milliseconds between progress callbacks
    pub progress_interval_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrent_extractions: constants::pipeline::MAX_CONCURRENT_EXTRACTIONS,
            use_cache: true,
            progress_interval_ms: constants::pipeline::PROGRESS_INTERVAL.as_millis() as u64,
        }
    }
}

impl AnalysisSettings {
    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Return a copy with every out-of-range value clamped to a usable one
    pub fn sanitized(&self) -> Self {
        let mut s = self.clone();

        s.extraction.target_count = s.extraction.target_count.clamp(1, 16);
        if !s.extraction.merge_delta_e.is_finite() || s.extraction.merge_delta_e < 0.0 {
            s.extraction.merge_delta_e = constants::extraction::MERGE_DELTA_E;
        }

        let c = &mut s.clustering;
        c.max_k = c.max_k.clamp(1, constants::clustering::MAX_K);
        c.min_k = c.min_k.clamp(1, c.max_k);
        c.manual_k = c.manual_k.map(|k| k.clamp(1, constants::clustering::MAX_K));
        c.max_iterations = c.max_iterations.max(1);
        c.max_concurrent_k_tests = c.max_concurrent_k_tests.max(1);
        c.silhouette_sample_size = c.silhouette_sample_size.max(10);

        let a = &mut s.adaptive;
        if !a.merge_threshold_delta_e.is_finite() || a.merge_threshold_delta_e < 0.0 {
            a.merge_threshold_delta_e = constants::adaptive::MERGE_THRESHOLD_DELTA_E;
        }
        if !a.split_threshold_intra_dist.is_finite() || a.split_threshold_intra_dist <= 0.0 {
            a.split_threshold_intra_dist = constants::adaptive::SPLIT_THRESHOLD_INTRA_DIST;
        }

        let w = &mut s.warmth;
        w.max_dimension = w.max_dimension.max(16);
        w.segments = w.segments.max(1);
        if !w.compactness.is_finite() || w.compactness <= 0.0 {
            w.compactness = constants::slic::COMPACTNESS;
        }
        w.iterations = w.iterations.max(1);

        s.pipeline.max_concurrent_extractions = s.pipeline.max_concurrent_extractions.max(1);

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_presets() {
        assert_eq!(ExtractionQuality::Fast.max_dimension(), 100);
        assert_eq!(ExtractionQuality::Balanced.max_dimension(), 256);
        assert_eq!(ExtractionQuality::Fine.max_dimension(), 512);
        assert!(ExtractionQuality::Fast.sample_count() < ExtractionQuality::Fine.sample_count());
    }

    #[test]
    fn test_sanitize_clamps_manual_k() {
        let mut settings = AnalysisSettings::default();
        settings.clustering.manual_k = Some(40);
        settings.clustering.min_k = 0;
        settings.pipeline.max_concurrent_extractions = 0;

        let s = settings.sanitized();
        assert_eq!(s.clustering.manual_k, Some(12));
        assert_eq!(s.clustering.min_k, 1);
        assert_eq!(s.pipeline.max_concurrent_extractions, 1);
    }

    #[test]
    fn test_sanitize_keeps_valid_settings() {
        let settings = AnalysisSettings::default();
        assert_eq!(settings.sanitized(), settings);
    }

    #[test]
    fn test_json_roundtrip_with_missing_sections() {
        let json = r#"{ "clustering": { "manual_k": 4, "min_k": 3, "max_k": 12,
            "max_iterations": 50, "max_concurrent_k_tests": 4,
            "silhouette_sample_size": 1500, "seed": 1 } }"#;
        let settings: AnalysisSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.clustering.manual_k, Some(4));
        assert_eq!(settings.extraction, ExtractionConfig::default());
        assert!(settings.adaptive.enabled);
    }

    #[test]
    fn test_json_file_roundtrip() {
        let path = std::env::temp_dir().join("photo_colorscan_settings_test.json");
        let mut settings = AnalysisSettings::default();
        settings.extraction.quality = ExtractionQuality::Fine;
        settings.to_json_file(&path).unwrap();

        let loaded = AnalysisSettings::from_json_file(&path).unwrap();
        assert_eq!(loaded, settings);
        let _ = std::fs::remove_file(&path);
    }
}
