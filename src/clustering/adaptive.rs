//! Adaptive refinement of the global palette
//!
//! Runs after global clustering:
//! 1. Merge the closest pair of clusters whose centroids are within the
//!    merge threshold (and, optionally, share a base color name) until no
//!    such pair remains
//! 2. Optionally split clusters whose member colors are too dispersed
//! 3. Drop clusters with too few photos, unless that would drop them all
//! 4. Reindex densely and reassign every photo from the new centroids

use palette::Lab;
use tracing::{debug, info};

use super::assignment::assign_photos;
use crate::color::conversion::{array_to_lab, delta_e, lab_to_array};
use crate::color::naming::are_names_similar;
use crate::config::AdaptiveConfig;
use crate::extraction::kmeans::{distance, nearest_centroid, sort_weighted_points, weighted_kmeans, KMeansConfig};
use crate::models::{ColorCluster, PhotoColorInfo};

const SPLIT_SEED: u64 = 0x5EED_5911;
const SPLIT_MAX_ITERATIONS: usize = 30;

/// Summary of one refinement pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdaptiveUpdate {
    pub merged: usize,
    pub split: usize,
    pub pruned: usize,
    pub final_count: usize,
    /// Human-readable log of every operation, in order
    pub operations: Vec<String>,
}

impl AdaptiveUpdate {
    fn record(&mut self, op: String) {
        info!("{}", op);
        self.operations.push(op);
    }
}

pub struct AdaptiveClusterManager {
    config: AdaptiveConfig,
}

impl Default for AdaptiveClusterManager {
    fn default() -> Self {
        Self::new(AdaptiveConfig::default())
    }
}

impl AdaptiveClusterManager {
    pub fn new(config: AdaptiveConfig) -> Self {
        Self { config }
    }

    /// Refine `clusters` and reassign `photos` to the result
    ///
    /// Returns the clusters unchanged when refinement is disabled.
    pub fn refine(
        &self,
        clusters: Vec<ColorCluster>,
        photos: &mut [PhotoColorInfo],
    ) -> (Vec<ColorCluster>, AdaptiveUpdate) {
        let mut update = AdaptiveUpdate::default();
        if !self.config.enabled {
            update.final_count = clusters.len();
            return (clusters, update);
        }
        debug!(clusters = clusters.len(), "Refining palette");

        let mut clusters = self.merge_similar(clusters, &mut update);

        if self.config.split_dispersed {
            clusters = self.split_dispersed(clusters, photos, &mut update);
            if update.split > 0 {
                reindex(&mut clusters);
                assign_photos(photos, &mut clusters);
            }
        }

        let mut clusters = self.prune_small(clusters, &mut update);
        reindex(&mut clusters);
        assign_photos(photos, &mut clusters);

        update.final_count = clusters.len();
        info!(
            merged = update.merged,
            split = update.split,
            pruned = update.pruned,
            final_count = update.final_count,
            "Palette refinement finished"
        );
        (clusters, update)
    }

    fn mergeable(&self, a: &ColorCluster, b: &ColorCluster) -> Option<f32> {
        let d = delta_e(a.centroid_lab, b.centroid_lab);
        if d >= self.config.merge_threshold_delta_e {
            return None;
        }
        if self.config.use_color_name_similarity && !are_names_similar(&a.name, &b.name) {
            return None;
        }
        Some(d)
    }

    fn merge_similar(&self, mut clusters: Vec<ColorCluster>, update: &mut AdaptiveUpdate) -> Vec<ColorCluster> {
        loop {
            let mut closest: Option<(usize, usize, f32)> = None;
            for i in 0..clusters.len() {
                for j in (i + 1)..clusters.len() {
                    if let Some(d) = self.mergeable(&clusters[i], &clusters[j]) {
                        if closest.map_or(true, |(_, _, best)| d < best) {
                            closest = Some((i, j, d));
                        }
                    }
                }
            }

            let Some((i, j, d)) = closest else {
                return clusters;
            };

            let absorbed = clusters.remove(j);
            let merged = merge_pair(&clusters[i], &absorbed);
            update.record(format!(
                "Merged #{} ({}) + #{} ({}) -> {} (ΔE {:.1})",
                clusters[i].index, clusters[i].name, absorbed.index, absorbed.name, merged.name, d
            ));
            clusters[i] = merged;
            update.merged += 1;
        }
    }

    fn split_dispersed(
        &self,
        clusters: Vec<ColorCluster>,
        photos: &[PhotoColorInfo],
        update: &mut AdaptiveUpdate,
    ) -> Vec<ColorCluster> {
        if clusters.is_empty() {
            return clusters;
        }
        let centroids: Vec<[f32; 3]> = clusters.iter().map(|c| lab_to_array(c.centroid_lab)).collect();
        let mut members: Vec<Vec<([f32; 3], f32)>> = vec![Vec::new(); clusters.len()];
        for color in photos.iter().flat_map(|p| &p.dominant_colors) {
            let point = lab_to_array(color.lab());
            let (pos, _) = nearest_centroid(&point, &centroids);
            members[pos].push((point, color.weight.max(f32::EPSILON)));
        }
        let members = members.into_iter().map(|mut m| {
            sort_weighted_points(&mut m);
            m.into_iter().unzip::<_, _, Vec<[f32; 3]>, Vec<f32>>()
        });

        let mut result = Vec::with_capacity(clusters.len());
        for ((cluster, center), (points, weights)) in clusters.into_iter().zip(&centroids).zip(members) {
            if points.len() < 2 {
                result.push(cluster);
                continue;
            }
            let spread = points.iter().map(|p| distance(p, center)).sum::<f32>() / points.len() as f32;
            if spread <= self.config.split_threshold_intra_dist {
                result.push(cluster);
                continue;
            }

            match weighted_kmeans(&points, Some(&weights), KMeansConfig::new(2, SPLIT_MAX_ITERATIONS, SPLIT_SEED)) {
                Ok(halves) if halves.cluster_sizes.iter().all(|&s| s > 0) => {
                    let first = ColorCluster::from_lab(cluster.index, array_to_lab(halves.centroids[0]));
                    let second = ColorCluster::from_lab(cluster.index, array_to_lab(halves.centroids[1]));
                    update.record(format!(
                        "Split #{} ({}) -> {} + {} (spread {:.1})",
                        cluster.index, cluster.name, first.name, second.name, spread
                    ));
                    update.split += 1;
                    result.push(first);
                    result.push(second);
                }
                _ => result.push(cluster),
            }
        }
        result
    }

    fn prune_small(&self, clusters: Vec<ColorCluster>, update: &mut AdaptiveUpdate) -> Vec<ColorCluster> {
        let min = self.config.min_cluster_size;
        if clusters.iter().all(|c| c.photo_count() < min) {
            if !clusters.is_empty() && min > 0 {
                update.record(format!(
                    "Kept all {} clusters: none reaches {} photos",
                    clusters.len(),
                    min
                ));
            }
            return clusters;
        }

        let (kept, dropped): (Vec<_>, Vec<_>) = clusters.into_iter().partition(|c| c.photo_count() >= min);
        for c in &dropped {
            update.record(format!(
                "Removed #{} ({}): {} photo(s)",
                c.index,
                c.name,
                c.photo_count()
            ));
        }
        update.pruned += dropped.len();
        kept
    }
}

/// Centroid averaged by photo count (equal weights when both are empty)
fn merge_pair(a: &ColorCluster, b: &ColorCluster) -> ColorCluster {
    let (na, nb) = (a.photo_count() as f32, b.photo_count() as f32);
    let (wa, wb) = if na + nb > 0.0 {
        (na / (na + nb), nb / (na + nb))
    } else {
        (0.5, 0.5)
    };
    let lab = Lab::new(
        a.centroid_lab.l * wa + b.centroid_lab.l * wb,
        a.centroid_lab.a * wa + b.centroid_lab.a * wb,
        a.centroid_lab.b * wa + b.centroid_lab.b * wb,
    );

    let mut merged = ColorCluster::from_lab(a.index, lab);
    merged.color_count = a.color_count + b.color_count;
    merged.photo_ids = a.photo_ids.iter().chain(&b.photo_ids).cloned().collect();
    merged
}

fn reindex(clusters: &mut [ColorCluster]) {
    for (i, c) in clusters.iter_mut().enumerate() {
        c.index = i;
    }
}
