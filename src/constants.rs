//! Reference values and tuning constants for color analysis
//!
//! This module contains compile-time constants shared across the
//! extraction, scoring and clustering stages.

/// Pixel gating and luminance
pub mod pixels {
    /// Pixels with alpha at or below this value (0-1 scale) are ignored
    pub const ALPHA_THRESHOLD: f32 = 10.0 / 255.0;

    /// Number of bins in the brightness CDF
    pub const BRIGHTNESS_CDF_BINS: usize = 256;

    /// Rec.601 luma coefficients
    pub const LUMA_R: f32 = 0.299;
    pub const LUMA_G: f32 = 0.587;
    pub const LUMA_B: f32 = 0.114;
}

/// Dominant color extraction
pub mod extraction {
    /// Default number of dominant colors per photo
    pub const DEFAULT_TARGET_COUNT: usize = 5;

    /// Colors closer than this ΔE are merged
    pub const MERGE_DELTA_E: f32 = 8.0;

    /// Iteration cap for per-photo K-means
    pub const MAX_ITERATIONS: usize = 50;

    /// Normalizer for chroma in sample weights
    pub const CHROMA_NORMALIZER: f32 = 128.0;

    /// Floor applied to sample weights so gray pixels still count
    pub const MIN_SAMPLE_WEIGHT: f32 = 0.01;
}

/// Warm/cool scoring
pub mod warmth {
    /// b* clamp used to normalize warmth scores to [-1, 1]
    pub const WARM_SCALE: f32 = 40.0;

    /// Superpixels darker than this are ignored
    pub const MIN_LIGHTNESS: f32 = 5.0;

    /// Superpixels brighter than this are ignored
    pub const MAX_LIGHTNESS: f32 = 98.0;

    /// Superpixels with lower chroma are treated as neutral
    pub const MIN_CHROMA: f32 = 5.0;

    /// Weight of the local (superpixel) score in the fused score
    pub const LOCAL_WEIGHT: f32 = 0.7;

    /// Weight of the palette score in the fused score
    pub const PALETTE_WEIGHT: f32 = 0.3;

    /// Normalizer for chroma in palette weights
    pub const PALETTE_CHROMA_NORMALIZER: f32 = 50.0;

    /// Number of bins in the collection warm/cool histogram
    pub const HISTOGRAM_BINS: usize = 20;

    /// Analysis resolution for SLIC based scoring
    pub const ANALYSIS_MAX_DIMENSION: u32 = 512;
}

/// SLIC superpixel defaults
pub mod slic {
    /// Target number of superpixels
    pub const TARGET_SEGMENTS: usize = 150;

    /// Compactness (spatial vs color trade-off)
    pub const COMPACTNESS: f32 = 20.0;

    /// Iteration cap
    pub const ITERATIONS: usize = 3;
}

/// Color cast percentiles
pub mod color_cast {
    pub const SHADOW_LOW_PERCENTILE: f32 = 5.0;
    pub const SHADOW_HIGH_PERCENTILE: f32 = 15.0;
    pub const HIGHLIGHT_LOW_PERCENTILE: f32 = 85.0;
    pub const HIGHLIGHT_HIGH_PERCENTILE: f32 = 95.0;

    /// Exponent applied to the normalized distance from the percentile edge
    pub const WEIGHT_GAMMA: i32 = 2;

    /// Images with P95 - P5 below this are considered flat
    pub const FLAT_RANGE_EPSILON: f32 = 1e-3;
}

/// Global clustering and auto-K selection
pub mod clustering {
    /// Smallest K tried in automatic mode
    pub const MIN_K: usize = 3;

    /// Largest K tried in automatic mode
    pub const MAX_K: usize = 12;

    /// Points per cluster used to scale the upper bound of the K range
    pub const POINTS_PER_K: usize = 10;

    /// K used when automatic selection fails
    pub const FALLBACK_K: usize = 5;

    /// Concurrent K candidates
    pub const MAX_CONCURRENT_K_TESTS: usize = 4;

    /// Points used to estimate the silhouette score
    pub const SILHOUETTE_SAMPLE_SIZE: usize = 1500;

    /// Iteration cap for global K-means
    pub const MAX_ITERATIONS: usize = 50;

    /// Silhouette thresholds for quality levels
    pub const EXCELLENT_SILHOUETTE: f32 = 0.7;
    pub const GOOD_SILHOUETTE: f32 = 0.5;
    pub const FAIR_SILHOUETTE: f32 = 0.25;
}

/// Adaptive cluster refinement
pub mod adaptive {
    /// Clusters closer than this ΔE are merged
    pub const MERGE_THRESHOLD_DELTA_E: f32 = 12.0;

    /// Clusters with fewer photos are dropped
    pub const MIN_CLUSTER_SIZE: usize = 2;

    /// Clusters with a larger mean member distance may be split
    pub const SPLIT_THRESHOLD_INTRA_DIST: f32 = 40.0;
}

/// Pipeline scheduling
pub mod pipeline {
    use std::time::Duration;

    /// Photos analyzed concurrently
    pub const MAX_CONCURRENT_EXTRACTIONS: usize = 8;

    /// Minimum time between progress callbacks
    pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fusion_weights_sum_to_one() {
        assert!((warmth::LOCAL_WEIGHT + warmth::PALETTE_WEIGHT - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_ordering() {
        assert!(clustering::MIN_K <= clustering::FALLBACK_K);
        assert!(clustering::FALLBACK_K <= clustering::MAX_K);
        assert!(clustering::FAIR_SILHOUETTE < clustering::GOOD_SILHOUETTE);
        assert!(clustering::GOOD_SILHOUETTE < clustering::EXCELLENT_SILHOUETTE);
        assert!(color_cast::SHADOW_LOW_PERCENTILE < color_cast::SHADOW_HIGH_PERCENTILE);
        assert!(color_cast::HIGHLIGHT_LOW_PERCENTILE < color_cast::HIGHLIGHT_HIGH_PERCENTILE);
        assert!(warmth::MIN_LIGHTNESS < warmth::MAX_LIGHTNESS);
    }

    #[test]
    fn test_luma_coefficients() {
        assert!((pixels::LUMA_R + pixels::LUMA_G + pixels::LUMA_B - 1.0).abs() < 1e-6);
    }
}
