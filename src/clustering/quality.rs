//! Clustering quality indices
//!
//! The silhouette score drives automatic K selection. Davies–Bouldin and
//! inertia of the chosen clustering are reported on `AutoKResult` and
//! `AnalysisResult` for diagnostics.

use crate::extraction::kmeans::{distance, squared_distance};

/// Mean silhouette coefficient of a clustering, in [-1, 1]
///
/// For each evaluated point `s = (b - a) / max(a, b)` where `a` is the mean
/// distance to the other members of its cluster and `b` the smallest mean
/// distance to another cluster. Points of singleton clusters score 0 and
/// points with `a = b = 0` are skipped.
///
/// When there are more than `sample_size` points, an evenly strided subset
/// is evaluated (against all points), so the result is deterministic.
///
/// # Returns
///
/// 0.0 for fewer than two clusters or mismatched inputs
pub fn silhouette_score(points: &[[f32; 3]], assignments: &[usize], k: usize, sample_size: usize) -> f32 {
    let n = points.len();
    if n == 0 || n != assignments.len() || k < 2 {
        return 0.0;
    }

    let mut cluster_sizes = vec![0usize; k];
    for &a in assignments {
        if a < k {
            cluster_sizes[a] += 1;
        }
    }

    let evaluated: Vec<usize> = if sample_size == 0 || n <= sample_size {
        (0..n).collect()
    } else {
        (0..sample_size).map(|i| i * n / sample_size).collect()
    };

    let mut total = 0.0_f64;
    let mut counted = 0usize;
    let mut sums = vec![0.0_f64; k];

    for &i in &evaluated {
        let own = assignments[i];
        if own >= k {
            continue;
        }
        if cluster_sizes[own] <= 1 {
            counted += 1;
            continue;
        }

        sums.iter_mut().for_each(|s| *s = 0.0);
        for (j, p) in points.iter().enumerate() {
            if j != i && assignments[j] < k {
                sums[assignments[j]] += distance(&points[i], p) as f64;
            }
        }

        let a = sums[own] / (cluster_sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && cluster_sizes[c] > 0)
            .map(|c| sums[c] / cluster_sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        if !b.is_finite() {
            continue;
        }

        let max = a.max(b);
        if max > 0.0 {
            total += (b - a) / max;
            counted += 1;
        }
    }

    if counted == 0 {
        0.0
    } else {
        (total / counted as f64) as f32
    }
}

/// Davies–Bouldin index; lower is better, 0.0 for fewer than two clusters
pub fn davies_bouldin_index(points: &[[f32; 3]], assignments: &[usize], centroids: &[[f32; 3]]) -> f32 {
    let k = centroids.len();
    if k < 2 || points.len() != assignments.len() {
        return 0.0;
    }

    let mut radii = vec![0.0_f64; k];
    let mut counts = vec![0usize; k];
    for (p, &c) in points.iter().zip(assignments) {
        if c < k {
            radii[c] += distance(p, &centroids[c]) as f64;
            counts[c] += 1;
        }
    }
    for (r, &c) in radii.iter_mut().zip(&counts) {
        if c > 0 {
            *r /= c as f64;
        }
    }

    let sum: f64 = (0..k)
        .map(|i| {
            (0..k)
                .filter(|&j| j != i)
                .filter_map(|j| {
                    let d = distance(&centroids[i], &centroids[j]) as f64;
                    (d > 0.0).then(|| (radii[i] + radii[j]) / d)
                })
                .fold(0.0, f64::max)
        })
        .sum();

    (sum / k as f64) as f32
}

/// Sum of squared distances from each point to its centroid
pub fn inertia(points: &[[f32; 3]], assignments: &[usize], centroids: &[[f32; 3]]) -> f32 {
    points
        .iter()
        .zip(assignments)
        .filter_map(|(p, &c)| centroids.get(c).map(|center| squared_distance(p, center) as f64))
        .sum::<f64>() as f32
}
