//! Global palette clustering with automatic K selection
//!
//! Every dominant color of the collection becomes one weighted Lab point.
//! With a manual K the points are clustered once; otherwise each candidate
//! K in the allowed range is clustered on a bounded rayon pool and scored
//! by silhouette, and the best candidate wins (ties go to the smaller K).

use std::collections::BTreeMap;
use std::sync::Mutex;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::quality::{davies_bouldin_index, inertia, silhouette_score};
use crate::config::ClusteringConfig;
use crate::constants::clustering::{MAX_K, POINTS_PER_K};
use crate::extraction::kmeans::{weighted_kmeans, ClusteringResult, KMeansConfig};
use crate::models::QualityLevel;
use crate::pipeline::progress::CancellationToken;
use crate::{AnalysisError, Result};

/// Outcome of global clustering
#[derive(Debug, Clone, PartialEq)]
pub struct AutoKResult {
    pub optimal_k: usize,
    pub best_clustering: ClusteringResult,
    /// Silhouette score per successfully tested K
    pub scores: BTreeMap<usize, f32>,
    pub silhouette_score: Option<f32>,
    pub quality_level: QualityLevel,
    /// Davies–Bouldin index of the chosen clustering, lower is better
    pub davies_bouldin: Option<f32>,
    /// Within-cluster sum of squared distances of the chosen clustering
    pub inertia: f32,
}

impl AutoKResult {
    /// Wrap a finished clustering, computing the auxiliary quality indices
    pub fn from_clustering(
        points: &[[f32; 3]],
        best_clustering: ClusteringResult,
        scores: BTreeMap<usize, f32>,
        silhouette_score: Option<f32>,
        quality_level: QualityLevel,
    ) -> Self {
        let centroids = &best_clustering.centroids;
        let davies_bouldin = (centroids.len() >= 2)
            .then(|| davies_bouldin_index(points, &best_clustering.assignments, centroids));
        let inertia = inertia(points, &best_clustering.assignments, centroids);
        Self {
            optimal_k: centroids.len(),
            best_clustering,
            scores,
            silhouette_score,
            quality_level,
            davies_bouldin,
            inertia,
        }
    }
}

/// Candidate range for `n` points, `None` when automatic selection is impossible
pub fn candidate_range(n: usize, config: &ClusteringConfig) -> Option<(usize, usize)> {
    if n < 2 {
        return None;
    }
    let min_k = config.min_k.max(1).min(n);
    let max_k = config.max_k.min(min_k.max(n / POINTS_PER_K)).min(n).max(min_k);
    Some((min_k, max_k))
}

/// Deterministic seed for one candidate K
fn seed_for_k(base: u64, k: usize) -> u64 {
    base ^ (k as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

pub struct GlobalClusterer {
    config: ClusteringConfig,
}

impl Default for GlobalClusterer {
    fn default() -> Self {
        Self::new(ClusteringConfig::default())
    }
}

impl GlobalClusterer {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    /// Cluster without progress reporting or cancellation
    pub fn cluster(&self, points: &[[f32; 3]], weights: &[f32]) -> Result<AutoKResult> {
        self.cluster_with_progress(points, weights, &|_, _| {}, &CancellationToken::new())
    }

    /// Cluster Lab points, honoring `manual_k` when set
    ///
    /// # Arguments
    ///
    /// * `points` - Lab values of every dominant color
    /// * `weights` - Weight of each point
    /// * `progress` - Called with (completed, total) after each candidate K
    /// * `cancel` - Checked before each candidate starts
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InsufficientData` for fewer than two points in
    /// automatic mode (or none in manual mode), `AnalysisError::Cancelled` if
    /// the token fired, and `AnalysisError::ClusteringError` when every
    /// candidate failed.
    pub fn cluster_with_progress(
        &self,
        points: &[[f32; 3]],
        weights: &[f32],
        progress: &(dyn Fn(usize, usize) + Sync),
        cancel: &CancellationToken,
    ) -> Result<AutoKResult> {
        match self.config.manual_k {
            Some(k) => self.cluster_manual(points, weights, k),
            None => self.cluster_auto(points, weights, progress, cancel),
        }
    }

    fn cluster_manual(&self, points: &[[f32; 3]], weights: &[f32], k: usize) -> Result<AutoKResult> {
        let n = points.len();
        if n == 0 {
            return Err(AnalysisError::InsufficientData { points: 0, required: 1 });
        }
        let k = k.clamp(1, MAX_K).min(n);
        debug!(k, points = n, "Clustering with manual K");

        let clustering = weighted_kmeans(
            points,
            Some(weights),
            KMeansConfig::new(k, self.config.max_iterations, self.config.seed),
        )?;

        let mut scores = BTreeMap::new();
        let silhouette = (k >= 2).then(|| {
            silhouette_score(points, &clustering.assignments, k, self.config.silhouette_sample_size)
        });
        if let Some(s) = silhouette {
            scores.insert(k, s);
        }

        Ok(AutoKResult::from_clustering(
            points,
            clustering,
            scores,
            silhouette,
            QualityLevel::Manual,
        ))
    }

    fn cluster_auto(
        &self,
        points: &[[f32; 3]],
        weights: &[f32],
        progress: &(dyn Fn(usize, usize) + Sync),
        cancel: &CancellationToken,
    ) -> Result<AutoKResult> {
        let n = points.len();
        let (min_k, max_k) = candidate_range(n, &self.config)
            .ok_or(AnalysisError::InsufficientData { points: n, required: 2 })?;
        let total = max_k - min_k + 1;
        info!(min_k, max_k, points = n, "Selecting palette size");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_concurrent_k_tests.max(1))
            .build()
            .map_err(|e| AnalysisError::processing(format!("failed to build K selection pool: {}", e)))?;

        let completed = Mutex::new(0usize);
        let candidates: Vec<Option<(usize, ClusteringResult, f32)>> = pool.install(|| {
            (min_k..=max_k)
                .into_par_iter()
                .map(|k| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let config = KMeansConfig::new(k, self.config.max_iterations, seed_for_k(self.config.seed, k));
                    let outcome = match weighted_kmeans(points, Some(weights), config) {
                        Ok(clustering) => {
                            let score = silhouette_score(
                                points,
                                &clustering.assignments,
                                k,
                                self.config.silhouette_sample_size,
                            );
                            debug!(k, score, iterations = clustering.iterations, "Tested candidate K");
                            Some((k, clustering, score))
                        }
                        Err(e) => {
                            warn!(k, error = %e, "Candidate K failed");
                            None
                        }
                    };

                    // Progress is reported under the lock so counts arrive in order
                    if let Ok(mut done) = completed.lock() {
                        *done += 1;
                        progress(*done, total);
                    }
                    outcome
                })
                .collect()
        });

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let mut scores = BTreeMap::new();
        let mut best: Option<(usize, ClusteringResult, f32)> = None;
        for (k, clustering, score) in candidates.into_iter().flatten() {
            scores.insert(k, score);
            let better = match &best {
                Some((_, _, best_score)) => score > *best_score,
                None => true,
            };
            if better {
                best = Some((k, clustering, score));
            }
        }

        let (optimal_k, best_clustering, score) =
            best.ok_or_else(|| AnalysisError::clustering(format!("all {} candidate K values failed", total)))?;
        let quality_level = QualityLevel::from_silhouette(score);
        info!(optimal_k, score, quality = quality_level.label(), "Selected palette size");

        let result = AutoKResult::from_clustering(points, best_clustering, scores, Some(score), quality_level);
        debug!(
            davies_bouldin = result.davies_bouldin,
            inertia = result.inertia,
            "Chosen clustering indices"
        );
        Ok(result)
    }
}
