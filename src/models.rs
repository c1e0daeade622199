//! Result types produced by the analysis
//!
//! Per-photo entities ([`PhotoColorInfo`] and what it carries) are created
//! during extraction and only touched afterwards by cluster assignment.
//! Collection-level entities ([`ColorCluster`], [`WarmCoolDistribution`],
//! [`AnalysisResult`]) are rebuilt from scratch on every run.

use std::collections::BTreeMap;

use palette::{Lab, Srgb};
use serde::{Deserialize, Serialize};

use crate::analysis::collection::CollectionFeature;
use crate::analysis::image_statistics::ImageFeature;
use crate::color::conversion::{rgb_to_lab, srgb_to_hex};
use crate::color::naming::color_name_for_rgb;
use crate::color::statistics::{self, ClusterColorStatistics, GlobalColorStatistics};
use crate::constants::clustering::{EXCELLENT_SILHOUETTE, FAIR_SILHOUETTE, GOOD_SILHOUETTE};

/// One representative color of a photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominantColor {
    /// Gamma-encoded sRGB
    pub rgb: Srgb,
    /// Hexadecimal representation of `rgb`
    pub hex: String,
    /// Fraction of sampled pixels represented by this color, in [0, 1]
    pub weight: f32,
    /// Nearest named color
    pub name: String,
}

impl DominantColor {
    /// Build a named color; the weight is clamped to [0, 1]
    pub fn new(rgb: Srgb, weight: f32) -> Self {
        Self {
            rgb,
            hex: srgb_to_hex(rgb),
            weight: if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) },
            name: color_name_for_rgb(rgb),
        }
    }

    /// Lab value of this color, derived from `rgb`
    pub fn lab(&self) -> Lab {
        rgb_to_lab(self.rgb)
    }
}

/// Mean chromatic offset of a tonal region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CastRegion {
    pub mean_a: f32,
    pub mean_b: f32,
    /// `sqrt(mean_a² + mean_b²)`
    pub strength: f32,
    /// Direction of the cast in degrees, [0, 360)
    pub hue_degrees: f32,
}

/// Highlight and shadow color cast of one photo
///
/// A region is `None` when no pixel contributed to it, which is distinct
/// from a neutral cast (strength close to zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorCastResult {
    /// Standard deviation of L / 100
    pub rms_contrast: f32,
    pub highlight: Option<CastRegion>,
    pub shadow: Option<CastRegion>,
}

/// SLIC byproduct kept so style features can be recomputed without pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlicAnalysisData {
    pub width: usize,
    pub height: usize,
    /// Row-major Lab values
    pub lab_buffer: Vec<[f32; 3]>,
    /// Row-major superpixel labels, -1 when unassigned or transparent
    pub labels: Vec<i32>,
}

/// Per-pixel HSL values (hue degrees, saturation, lightness)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HslAnalysisData {
    pub pixels: Vec<[f32; 3]>,
}

/// Warmth and color-cast analysis of one photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedColorAnalysis {
    /// `0.7 * local + 0.3 * palette`, in [-1, 1]
    pub warmth_score: f32,
    /// Superpixel based score
    pub local_score: f32,
    /// Dominant color based score
    pub palette_score: f32,
    /// Omitted for flat images
    pub color_cast: Option<ColorCastResult>,
    pub slic: Option<SlicAnalysisData>,
    pub hsl: Option<HslAnalysisData>,
}

/// Everything the analysis knows about one photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoColorInfo {
    pub photo_id: String,
    /// Sorted by weight, descending
    pub dominant_colors: Vec<DominantColor>,
    /// 256-bin cumulative luminance distribution
    pub brightness_cdf: Vec<f32>,
    pub advanced: Option<AdvancedColorAnalysis>,
    pub image_feature: Option<ImageFeature>,
    /// Index into [`AnalysisResult::clusters`], valid once the run completes
    pub primary_cluster_index: Option<usize>,
    /// Accumulated dominant color weight per cluster index
    #[serde(default)]
    pub cluster_mix: BTreeMap<usize, f32>,
}

impl PhotoColorInfo {
    pub fn new(photo_id: impl Into<String>) -> Self {
        Self {
            photo_id: photo_id.into(),
            dominant_colors: Vec::new(),
            brightness_cdf: Vec::new(),
            advanced: None,
            image_feature: None,
            primary_cluster_index: None,
            cluster_mix: BTreeMap::new(),
        }
    }

    /// A cached entry is only reusable when the warmth analysis is present
    pub fn is_complete(&self) -> bool {
        self.advanced.is_some()
    }
}

/// One entry of the global palette
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorCluster {
    /// Dense index 0..N; reassigned by sorting, merging and pruning
    pub index: usize,
    pub centroid: Srgb,
    pub centroid_lab: Lab,
    pub hex: String,
    pub name: String,
    /// Number of dominant colors assigned to this cluster
    pub color_count: usize,
    /// Photos whose primary cluster is this one
    pub photo_ids: Vec<String>,
}

impl ColorCluster {
    /// Build a cluster from a Lab centroid; rgb, hex and name are derived
    pub fn from_lab(index: usize, centroid_lab: Lab) -> Self {
        let centroid = crate::color::conversion::lab_to_rgb(centroid_lab);
        Self {
            index,
            centroid,
            centroid_lab,
            hex: srgb_to_hex(centroid),
            name: crate::color::naming::color_name(centroid_lab),
            color_count: 0,
            photo_ids: Vec::new(),
        }
    }

    pub fn photo_count(&self) -> usize {
        self.photo_ids.len()
    }
}

/// Histogram of fused warmth scores over the collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmCoolDistribution {
    /// Counts of scores in equal-width bins over [-1, 1]
    pub bins: Vec<usize>,
    /// Fused score per photo id
    pub scores: BTreeMap<String, f32>,
    pub mean: f32,
    pub min: f32,
    pub max: f32,
}

/// Quality of the chosen global clustering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    /// Automatic selection failed and the default K was used
    #[default]
    Unknown,
    /// K was supplied by the user
    Manual,
}

impl QualityLevel {
    /// Map a silhouette score to a level
    pub fn from_silhouette(score: f32) -> Self {
        if score >= EXCELLENT_SILHOUETTE {
            QualityLevel::Excellent
        } else if score >= GOOD_SILHOUETTE {
            QualityLevel::Good
        } else if score >= FAIR_SILHOUETTE {
            QualityLevel::Fair
        } else {
            QualityLevel::Poor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityLevel::Excellent => "excellent",
            QualityLevel::Good => "good",
            QualityLevel::Fair => "fair",
            QualityLevel::Poor => "poor",
            QualityLevel::Unknown => "unknown",
            QualityLevel::Manual => "manual",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            QualityLevel::Excellent => "Colors form clearly separated groups",
            QualityLevel::Good => "Colors form reasonably distinct groups",
            QualityLevel::Fair => "Color groups overlap noticeably",
            QualityLevel::Poor => "Colors do not form distinct groups",
            QualityLevel::Unknown => "Palette size could not be evaluated; a default was used",
            QualityLevel::Manual => "Palette size was set manually",
        }
    }
}

/// Outcome of one collection analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisResult {
    pub total_photos: usize,
    /// Photos with a usable result (freshly analyzed or cached)
    pub processed_photos: usize,
    pub failed_photos: usize,
    pub cached_photos: usize,
    /// Global palette, sorted by photo count descending
    pub clusters: Vec<ColorCluster>,
    pub photo_infos: Vec<PhotoColorInfo>,
    pub warm_cool: Option<WarmCoolDistribution>,
    pub optimal_k: usize,
    pub silhouette_score: Option<f32>,
    pub quality_level: QualityLevel,
    /// Davies–Bouldin index of the global clustering
    pub davies_bouldin_index: Option<f32>,
    /// Within-cluster sum of squared Lab distances of the global clustering
    pub inertia: Option<f32>,
    /// Silhouette score per tested K
    pub k_scores: BTreeMap<usize, f32>,
    /// Merge, split and prune events of adaptive refinement
    pub adaptive_log: Vec<String>,
    pub collection_feature: Option<CollectionFeature>,
    /// The caller aborted the run; partial results were discarded
    pub cancelled: bool,
}

impl AnalysisResult {
    /// An empty result for `total` requested photos
    pub fn empty(total: usize) -> Self {
        Self {
            total_photos: total,
            ..Self::default()
        }
    }

    pub fn quality_description(&self) -> &'static str {
        self.quality_level.description()
    }

    /// Hue, lightness and saturation distributions of the collection
    pub fn global_statistics(&self) -> GlobalColorStatistics {
        statistics::global_statistics(&self.photo_infos)
    }

    /// Spread and consistency of one cluster's member colors
    pub fn cluster_statistics(&self, cluster_index: usize) -> Option<ClusterColorStatistics> {
        let cluster = self.clusters.iter().find(|c| c.index == cluster_index)?;
        Some(statistics::cluster_statistics(cluster, &self.photo_infos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_color_derives_fields() {
        let color = DominantColor::new(Srgb::new(1.0, 0.0, 0.0), 1.4);
        assert_eq!(color.hex, "#FF0000");
        assert_eq!(color.name, "red");
        assert_eq!(color.weight, 1.0);
    }

    #[test]
    fn test_quality_levels() {
        assert_eq!(QualityLevel::from_silhouette(0.75), QualityLevel::Excellent);
        assert_eq!(QualityLevel::from_silhouette(0.5), QualityLevel::Good);
        assert_eq!(QualityLevel::from_silhouette(0.3), QualityLevel::Fair);
        assert_eq!(QualityLevel::from_silhouette(-0.2), QualityLevel::Poor);
        assert_eq!(QualityLevel::Manual.label(), "manual");
    }

    #[test]
    fn test_photo_info_serialization() {
        let mut info = PhotoColorInfo::new("photo-1");
        info.dominant_colors.push(DominantColor::new(Srgb::new(0.2, 0.4, 0.8), 0.6));
        info.brightness_cdf = vec![0.5; 256];
        info.advanced = Some(AdvancedColorAnalysis {
            warmth_score: -0.2,
            local_score: -0.25,
            palette_score: -0.1,
            color_cast: Some(ColorCastResult {
                rms_contrast: 0.1,
                highlight: None,
                shadow: Some(CastRegion {
                    mean_a: 1.0,
                    mean_b: -2.0,
                    strength: 5.0_f32.sqrt(),
                    hue_degrees: 296.57,
                }),
            }),
            slic: Some(SlicAnalysisData {
                width: 1,
                height: 1,
                lab_buffer: vec![[50.0, 0.0, 0.0]],
                labels: vec![0],
            }),
            hsl: None,
        });
        info.cluster_mix.insert(1, 0.6);

        let json = serde_json::to_string(&info).unwrap();
        let back: PhotoColorInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, back);
        assert!(back.is_complete());
    }

    #[test]
    fn test_empty_result() {
        let result = AnalysisResult::empty(0);
        assert_eq!(result.total_photos, 0);
        assert!(result.clusters.is_empty());
        assert_eq!(result.quality_level, QualityLevel::Unknown);
        assert!(result.cluster_statistics(0).is_none());
    }
}
