//! Collection analysis pipeline
//!
//! Stages, with the share of overall progress they cover:
//! - cache lookup and per-photo extraction (0.0 - 0.7)
//! - palette size selection (0.7 - 0.8)
//! - global clustering and photo assignment (0.8 - 0.9)
//! - adaptive refinement and summaries (0.9 - 1.0)
//!
//! Per-photo work runs on a dedicated rayon pool; results are collected in
//! input order so the palette only depends on the inputs and settings.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::cache::AnalysisCache;
use super::progress::{AnalysisProgress, CancellationToken, ProgressCounts, ProgressThrottler, ProgressTracker};
use crate::analysis::collection::aggregate_collection_feature;
use crate::analysis::image_statistics::{compute_image_feature, ImageFeature};
use crate::analysis::warmth::{warm_cool_distribution, WarmCoolAnalyzer};
use crate::clustering::adaptive::AdaptiveClusterManager;
use crate::clustering::assignment::assign_photos;
use crate::clustering::auto_k::{AutoKResult, GlobalClusterer};
use crate::color::conversion::{array_to_lab, lab_to_array};
use crate::config::AnalysisSettings;
use crate::constants::clustering::FALLBACK_K;
use crate::extraction::dominant::DominantColorExtractor;
use crate::extraction::kmeans::{sort_weighted_points, weighted_kmeans, KMeansConfig};
use crate::models::{AnalysisResult, ColorCluster, PhotoColorInfo, QualityLevel};
use crate::{AnalysisError, Result};

const EXTRACTION_SHARE: f32 = 0.7;
const K_SELECTION_SHARE: f32 = 0.1;

/// Decodes photos by identifier
pub trait PhotoSource: Send + Sync {
    fn load(&self, photo_id: &str) -> Result<DynamicImage>;
}

/// FNV-1a hash of a photo identifier, used to derive per-photo seeds
fn photo_seed(photo_id: &str, base: u64) -> u64 {
    let hash = photo_id
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3));
    hash ^ base
}

/// Progress emission shared by all stages of one run
struct Reporter<'a> {
    callback: &'a (dyn Fn(&AnalysisProgress) + Sync),
    throttler: ProgressThrottler,
    total: usize,
}

impl Reporter<'_> {
    fn emit(&self, progress: f32, stage: &str, counts: ProgressCounts, current_k: Option<usize>) {
        self.throttler.emit_with(progress, |overall_progress| {
            (self.callback)(&AnalysisProgress {
                overall_progress,
                stage: stage.to_string(),
                total_photos: self.total,
                processed_photos: counts.processed + counts.cached,
                failed_photos: counts.failed,
                cached_photos: counts.cached,
                current_k,
            })
        });
    }
}

/// Runs the full analysis over a photo collection
pub struct AnalysisPipeline {
    source: Arc<dyn PhotoSource>,
    cache: Option<Arc<dyn AnalysisCache>>,
    settings: AnalysisSettings,
    cancel: CancellationToken,
}

impl AnalysisPipeline {
    /// Create a pipeline; out-of-range settings are clamped
    pub fn new(source: Arc<dyn PhotoSource>, settings: AnalysisSettings) -> Self {
        Self {
            source,
            cache: None,
            settings: settings.sanitized(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn AnalysisCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Analyze a collection of photos
    ///
    /// Never fails: per-photo errors are counted in `failed_photos`, a
    /// failed palette size selection falls back to a default K, and a
    /// cancelled run returns a result flagged `cancelled`.
    ///
    /// # Arguments
    ///
    /// * `photo_ids` - Photos to analyze; duplicates are analyzed once
    /// * `progress` - Receives throttled, monotonically increasing progress
    pub fn analyze_collection<F>(&self, photo_ids: &[String], progress: F) -> AnalysisResult
    where
        F: Fn(&AnalysisProgress) + Sync,
    {
        let mut seen = HashSet::new();
        let ids: Vec<&str> = photo_ids
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect();

        let reporter = Reporter {
            callback: &progress,
            throttler: ProgressThrottler::new(Duration::from_millis(self.settings.pipeline.progress_interval_ms)),
            total: ids.len(),
        };
        let tracker = ProgressTracker::new();
        info!(photos = ids.len(), "Starting collection analysis");

        let mut result = AnalysisResult::empty(ids.len());
        if ids.is_empty() {
            reporter.emit(1.0, "Complete", tracker.snapshot(), None);
            return result;
        }

        let (cached, pending) = self.lookup_cache(&ids, &tracker);
        reporter.emit(
            tracker.snapshot().finished() as f32 / ids.len() as f32 * EXTRACTION_SHARE,
            "Checking cache",
            tracker.snapshot(),
            None,
        );

        let fresh = match self.extract_all(&pending, &tracker, &reporter) {
            Ok(fresh) => fresh,
            Err(AnalysisError::Cancelled) => return self.cancelled(result, &tracker),
            Err(e) => {
                warn!(error = %e, "Per-photo analysis could not start");
                pending.iter().for_each(|_| {
                    tracker.increment_failed();
                });
                vec![None; pending.len()]
            }
        };

        let mut slots: Vec<Option<PhotoColorInfo>> = vec![None; ids.len()];
        for (slot, info) in cached {
            slots[slot] = Some(info);
        }
        for (&(slot, _), info) in pending.iter().zip(fresh) {
            if let (Some(cache), Some(info)) = (&self.cache, &info) {
                cache.store(info);
            }
            slots[slot] = info;
        }
        let mut photos: Vec<PhotoColorInfo> = slots.into_iter().flatten().collect();

        let counts = tracker.snapshot();
        result.processed_photos = counts.processed + counts.cached;
        result.failed_photos = counts.failed;
        result.cached_photos = counts.cached;
        info!(
            processed = counts.processed,
            cached = counts.cached,
            failed = counts.failed,
            "Per-photo analysis finished"
        );

        let global = match self.cluster_collection(&photos, &reporter, &tracker) {
            Ok(global) => global,
            Err(AnalysisError::Cancelled) => return self.cancelled(result, &tracker),
            Err(e) => {
                warn!(error = %e, "Palette clustering failed");
                None
            }
        };

        let mut clusters = Vec::new();
        if let Some(global) = &global {
            result.optimal_k = global.optimal_k;
            result.silhouette_score = global.silhouette_score;
            result.davies_bouldin_index = global.davies_bouldin;
            result.inertia = Some(global.inertia);
            result.quality_level = global.quality_level;
            result.k_scores = global.scores.clone();

            reporter.emit(0.8, "Building palette", tracker.snapshot(), Some(global.optimal_k));
            clusters = build_palette(global, &mut photos);
            reporter.emit(0.9, "Assigning photos", tracker.snapshot(), Some(global.optimal_k));
        }

        if self.cancel.is_cancelled() {
            return self.cancelled(result, &tracker);
        }

        if self.settings.adaptive.enabled && !clusters.is_empty() {
            reporter.emit(0.95, "Refining palette", tracker.snapshot(), Some(result.optimal_k));
            let manager = AdaptiveClusterManager::new(self.settings.adaptive.clone());
            let (refined, update) = manager.refine(clusters, &mut photos);
            clusters = refined;
            result.adaptive_log = update.operations;
        }

        reporter.emit(0.98, "Summarizing", tracker.snapshot(), Some(result.optimal_k));
        result.warm_cool = warm_cool_distribution(&photos);
        let features: Vec<&ImageFeature> = photos.iter().filter_map(|p| p.image_feature.as_ref()).collect();
        if !features.is_empty() {
            result.collection_feature = Some(aggregate_collection_feature(&features, &clusters));
        }

        result.clusters = clusters;
        result.photo_infos = photos;
        reporter.emit(1.0, "Complete", tracker.snapshot(), Some(result.optimal_k));
        info!(
            clusters = result.clusters.len(),
            quality = result.quality_level.label(),
            "Collection analysis complete"
        );
        result
    }

    /// Split the collection into reusable cached entries and photos to analyze
    fn lookup_cache<'a>(
        &self,
        ids: &[&'a str],
        tracker: &ProgressTracker,
    ) -> (Vec<(usize, PhotoColorInfo)>, Vec<(usize, &'a str)>) {
        let mut cached = Vec::new();
        let mut pending = Vec::new();

        for (slot, &id) in ids.iter().enumerate() {
            let hit = match &self.cache {
                Some(cache) if self.settings.pipeline.use_cache => cache.get(id),
                _ => None,
            };
            match hit {
                Some(mut info) if info.is_complete() => {
                    info.primary_cluster_index = None;
                    info.cluster_mix.clear();
                    if info.image_feature.is_none() {
                        info.image_feature = image_feature_of(&info);
                    }
                    tracker.increment_cached();
                    cached.push((slot, info));
                }
                Some(_) => {
                    debug!(photo = id, "Cached entry lacks warmth analysis, recomputing");
                    pending.push((slot, id));
                }
                None => pending.push((slot, id)),
            }
        }

        debug!(cached = cached.len(), pending = pending.len(), "Cache lookup finished");
        (cached, pending)
    }

    /// Analyze pending photos on the extraction pool
    ///
    /// Returns one entry per pending photo, in order; failed photos are
    /// `None`. Returns `Err(Cancelled)` when the run was cancelled.
    fn extract_all(
        &self,
        pending: &[(usize, &str)],
        tracker: &ProgressTracker,
        reporter: &Reporter<'_>,
    ) -> Result<Vec<Option<PhotoColorInfo>>> {
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.pipeline.max_concurrent_extractions)
            .build()
            .map_err(|e| AnalysisError::processing(format!("failed to build extraction pool: {}", e)))?;

        let extractor = DominantColorExtractor::new(self.settings.extraction.clone());
        let analyzer = WarmCoolAnalyzer::new(self.settings.warmth);
        let total = reporter.total as f32;

        let outcomes: Vec<Option<PhotoColorInfo>> = pool.install(|| {
            pending
                .par_iter()
                .map(|&(_, id)| {
                    if self.cancel.is_cancelled() {
                        return None;
                    }
                    let outcome = self.analyze_photo(id, &extractor, &analyzer);
                    let counts = match &outcome {
                        Ok(_) => tracker.increment_processed(),
                        Err(e) => {
                            warn!(photo = id, error = %e, "Skipping photo");
                            tracker.increment_failed()
                        }
                    };
                    reporter.emit(
                        counts.finished() as f32 / total * EXTRACTION_SHARE,
                        "Extracting colors",
                        counts,
                        None,
                    );
                    outcome.ok()
                })
                .collect()
        });

        if self.cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        Ok(outcomes)
    }

    /// Full per-photo analysis
    fn analyze_photo(
        &self,
        photo_id: &str,
        extractor: &DominantColorExtractor,
        analyzer: &WarmCoolAnalyzer,
    ) -> Result<PhotoColorInfo> {
        let image = self.source.load(photo_id)?;
        let extraction = extractor.extract(&image, photo_seed(photo_id, self.settings.extraction.seed))?;
        let advanced = analyzer.analyze(&image, &extraction.colors)?;

        let mut info = PhotoColorInfo::new(photo_id);
        info.dominant_colors = extraction.colors;
        info.brightness_cdf = extraction.brightness_cdf;
        info.advanced = Some(advanced);
        info.image_feature = image_feature_of(&info);
        debug!(photo = photo_id, colors = info.dominant_colors.len(), "Analyzed photo");
        Ok(info)
    }

    /// Global clustering over every dominant color, with the default-K fallback
    ///
    /// Returns `Ok(None)` when there is nothing to cluster.
    fn cluster_collection(
        &self,
        photos: &[PhotoColorInfo],
        reporter: &Reporter<'_>,
        tracker: &ProgressTracker,
    ) -> Result<Option<AutoKResult>> {
        let mut weighted: Vec<([f32; 3], f32)> = photos
            .iter()
            .flat_map(|p| &p.dominant_colors)
            .map(|c| (lab_to_array(c.lab()), c.weight.max(f32::EPSILON)))
            .collect();
        sort_weighted_points(&mut weighted);
        let (points, weights): (Vec<[f32; 3]>, Vec<f32>) = weighted.into_iter().unzip();
        if points.is_empty() {
            return Ok(None);
        }

        reporter.emit(EXTRACTION_SHARE, "Selecting palette size", tracker.snapshot(), None);
        let clusterer = GlobalClusterer::new(self.settings.clustering.clone());
        let on_candidate = |done: usize, total: usize| {
            reporter.emit(
                EXTRACTION_SHARE + K_SELECTION_SHARE * done as f32 / total.max(1) as f32,
                "Selecting palette size",
                tracker.snapshot(),
                None,
            );
        };

        match clusterer.cluster_with_progress(&points, &weights, &on_candidate, &self.cancel) {
            Ok(global) => Ok(Some(global)),
            Err(AnalysisError::Cancelled) => Err(AnalysisError::Cancelled),
            Err(e) => {
                let k = FALLBACK_K.min(points.len());
                warn!(error = %e, k, "Palette size selection failed, using default K");
                let config = KMeansConfig::new(k, self.settings.clustering.max_iterations, self.settings.clustering.seed);
                let clustering = weighted_kmeans(&points, Some(&weights), config)?;
                Ok(Some(AutoKResult::from_clustering(
                    &points,
                    clustering,
                    Default::default(),
                    None,
                    QualityLevel::Unknown,
                )))
            }
        }
    }

    fn cancelled(&self, mut result: AnalysisResult, tracker: &ProgressTracker) -> AnalysisResult {
        let counts = tracker.snapshot();
        info!(finished = counts.finished(), "Collection analysis cancelled");
        result.processed_photos = counts.processed + counts.cached;
        result.failed_photos = counts.failed;
        result.cached_photos = counts.cached;
        result.cancelled = true;
        result
    }
}

fn image_feature_of(info: &PhotoColorInfo) -> Option<ImageFeature> {
    let advanced = info.advanced.as_ref()?;
    let slic = advanced.slic.as_ref()?;
    let hsl = advanced.hsl.as_ref()?;
    Some(compute_image_feature(slic, hsl, &info.dominant_colors, advanced.warmth_score))
}

/// Turn the global clustering into palette entries sorted by photo count
fn build_palette(global: &AutoKResult, photos: &mut [PhotoColorInfo]) -> Vec<ColorCluster> {
    let mut clusters: Vec<ColorCluster> = global
        .best_clustering
        .centroids
        .iter()
        .enumerate()
        .map(|(i, &c)| ColorCluster::from_lab(i, array_to_lab(c)))
        .collect();
    assign_photos(photos, &mut clusters);

    clusters.sort_by(|a, b| b.photo_count().cmp(&a.photo_count()).then(a.index.cmp(&b.index)));
    for (i, c) in clusters.iter_mut().enumerate() {
        c.index = i;
    }
    assign_photos(photos, &mut clusters);
    clusters
}
