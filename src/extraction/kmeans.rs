//! Weighted K-means with K-means++ seeding
//!
//! Operates on plain 3-vectors so the same engine clusters Lab samples
//! (perceptual extraction, global palette) and RGB samples (fast
//! extraction). Distances are squared Euclidean.
//!
//! Algorithm:
//! 1. Seed the first center with probability proportional to weight, then
//!    each following center with probability proportional to `weight * D²`
//! 2. Assign every point to its nearest center (ties go to the lower index)
//! 3. Move each center to the weighted mean of its members
//! 4. Reseed a center that lost all members with the point farthest from
//!    its own center
//! 5. Stop when assignments no longer change or the iteration cap is hit
//!
//! Results are deterministic for a given seed.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{AnalysisError, Result};

/// Parameters of one K-means run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansConfig {
    pub k: usize,
    pub max_iterations: usize,
    pub seed: u64,
}

impl KMeansConfig {
    pub fn new(k: usize, max_iterations: usize, seed: u64) -> Self {
        Self {
            k,
            max_iterations: max_iterations.max(1),
            seed,
        }
    }
}

/// Output of one clustering call
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringResult {
    /// One center per cluster, `k` entries
    pub centroids: Vec<[f32; 3]>,
    /// Cluster index per input point
    pub assignments: Vec<usize>,
    /// Member count per cluster
    pub cluster_sizes: Vec<usize>,
    /// Member weight sum per cluster
    pub cluster_weights: Vec<f32>,
    pub iterations: usize,
    pub converged: bool,
}

impl ClusteringResult {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }
}

#[inline]
pub(crate) fn squared_distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    let d2 = a[2] - b[2];
    d0 * d0 + d1 * d1 + d2 * d2
}

/// Euclidean distance between two 3-vectors
#[inline]
pub fn distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    squared_distance(a, b).sqrt()
}

/// Index of and squared distance to the nearest centroid
///
/// Returns `(0, f32::INFINITY)` when `centroids` is empty.
pub fn nearest_centroid(point: &[f32; 3], centroids: &[[f32; 3]]) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// Sort weighted points lexicographically by (L, a, b, weight)
///
/// Seeding follows point order, so clustering a canonically ordered set
/// gives the same centroids however the points were gathered.
pub fn sort_weighted_points(points: &mut [([f32; 3], f32)]) {
    points.sort_by(|(a, wa), (b, wb)| {
        a[0].total_cmp(&b[0])
            .then(a[1].total_cmp(&b[1]))
            .then(a[2].total_cmp(&b[2]))
            .then(wa.total_cmp(wb))
    });
}

/// Pick an index with probability proportional to `scores`
fn roulette(scores: &[f64], rng: &mut StdRng) -> Option<usize> {
    let total: f64 = scores.iter().sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }
    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &s) in scores.iter().enumerate() {
        if s > 0.0 {
            cumulative += s;
            last_positive = Some(i);
            if cumulative >= target {
                return Some(i);
            }
        }
    }
    last_positive
}

fn seed_centers(
    points: &[[f32; 3]],
    weights: &[f32],
    k: usize,
    rng: &mut StdRng,
) -> Vec<[f32; 3]> {
    let n = points.len();
    let mut centers = Vec::with_capacity(k);
    let mut chosen = vec![false; n];

    let initial: Vec<f64> = weights.iter().map(|&w| w.max(0.0) as f64).collect();
    let first = roulette(&initial, rng).unwrap_or_else(|| rng.random_range(0..n));
    centers.push(points[first]);
    chosen[first] = true;

    let mut min_dist: Vec<f32> = points
        .iter()
        .map(|p| squared_distance(p, &points[first]))
        .collect();

    while centers.len() < k {
        let scores: Vec<f64> = min_dist
            .iter()
            .zip(weights)
            .map(|(&d, &w)| (d as f64) * (w.max(0.0) as f64))
            .collect();

        // All remaining mass sits on existing centers: take the next unused point
        let next = roulette(&scores, rng)
            .or_else(|| chosen.iter().position(|c| !c))
            .unwrap_or(0);

        centers.push(points[next]);
        chosen[next] = true;
        for (d, p) in min_dist.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &points[next]));
        }
    }

    centers
}

/// Run weighted K-means
///
/// # Arguments
///
/// * `points` - Input vectors
/// * `weights` - Optional per-point weights; `None` weighs every point 1
/// * `config` - Cluster count, iteration cap and seed
///
/// # Errors
///
/// Returns `AnalysisError::InsufficientData` if `k` is zero or there are
/// fewer points than clusters, and `AnalysisError::InvalidParameter` if the
/// weight slice length does not match the point count.
pub fn weighted_kmeans(
    points: &[[f32; 3]],
    weights: Option<&[f32]>,
    config: KMeansConfig,
) -> Result<ClusteringResult> {
    let n = points.len();
    let k = config.k;
    if k == 0 || n < k {
        return Err(AnalysisError::InsufficientData {
            points: n,
            required: k.max(1),
        });
    }

    let owned_weights;
    let weights = match weights {
        Some(w) if w.len() != n => {
            return Err(AnalysisError::InvalidParameter {
                parameter: "weights".to_string(),
                value: format!("{} weights for {} points", w.len(), n),
            });
        }
        Some(w) => w,
        None => {
            owned_weights = vec![1.0_f32; n];
            &owned_weights
        }
    };

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut centroids = seed_centers(points, weights, k, &mut rng);
    let mut assignments = vec![usize::MAX; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let (nearest, _) = nearest_centroid(p, &centroids);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }
        if !changed {
            converged = true;
            break;
        }

        let mut sums = vec![[0.0_f64; 3]; k];
        let mut weight_sums = vec![0.0_f64; k];
        let mut counts = vec![0usize; k];
        for (i, p) in points.iter().enumerate() {
            let c = assignments[i];
            let w = weights[i].max(0.0) as f64;
            sums[c][0] += p[0] as f64 * w;
            sums[c][1] += p[1] as f64 * w;
            sums[c][2] += p[2] as f64 * w;
            weight_sums[c] += w;
            counts[c] += 1;
        }

        for c in 0..k {
            if counts[c] == 0 {
                continue;
            }
            if weight_sums[c] > 0.0 {
                centroids[c] = [
                    (sums[c][0] / weight_sums[c]) as f32,
                    (sums[c][1] / weight_sums[c]) as f32,
                    (sums[c][2] / weight_sums[c]) as f32,
                ];
            } else {
                centroids[c] = unweighted_mean(points, &assignments, c);
            }
        }

        reseed_empty_clusters(points, &mut centroids, &mut assignments, &counts);
    }

    let mut cluster_sizes = vec![0usize; k];
    let mut cluster_weights = vec![0.0_f32; k];
    for (i, &c) in assignments.iter().enumerate() {
        cluster_sizes[c] += 1;
        cluster_weights[c] += weights[i].max(0.0);
    }

    Ok(ClusteringResult {
        centroids,
        assignments,
        cluster_sizes,
        cluster_weights,
        iterations,
        converged,
    })
}

/// Move each empty cluster onto the point farthest from its own centroid
///
/// The chosen point is reassigned immediately, so several empty clusters in
/// one iteration receive distinct points.
fn reseed_empty_clusters(
    points: &[[f32; 3]],
    centroids: &mut [[f32; 3]],
    assignments: &mut [usize],
    counts: &[usize],
) {
    for c in 0..centroids.len() {
        if counts[c] > 0 {
            continue;
        }
        let farthest = points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, squared_distance(p, &centroids[assignments[i]])))
            .fold((0, -1.0_f32), |best, cur| if cur.1 > best.1 { cur } else { best });
        if farthest.1 > 0.0 {
            centroids[c] = points[farthest.0];
            assignments[farthest.0] = c;
        }
    }
}

fn unweighted_mean(points: &[[f32; 3]], assignments: &[usize], cluster: usize) -> [f32; 3] {
    let mut sum = [0.0_f64; 3];
    let mut count = 0usize;
    for (p, _) in points
        .iter()
        .zip(assignments)
        .filter(|(_, &a)| a == cluster)
    {
        sum[0] += p[0] as f64;
        sum[1] += p[1] as f64;
        sum[2] += p[2] as f64;
        count += 1;
    }
    let n = count.max(1) as f64;
    [(sum[0] / n) as f32, (sum[1] / n) as f32, (sum[2] / n) as f32]
}
