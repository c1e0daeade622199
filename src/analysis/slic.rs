//! SLIC superpixel segmentation
//!
//! Partitions a Lab image into compact superpixels:
//! - Centers start on a regular grid with spacing `S = sqrt(N / K)`
//! - Each iteration assigns every pixel within `±S` of a center to the
//!   center minimizing `sqrt(dc² + (m * ds / S)²)`
//! - Centers then move to the mean Lab and mean position of their pixels
//!
//! Centers that end an iteration without pixels keep their previous
//! position and are not reseeded. This deviates from canonical SLIC and
//! is kept as is.

use serde::{Deserialize, Serialize};

use crate::config::WarmthConfig;

/// SLIC parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicParams {
    pub target_segments: usize,
    pub compactness: f32,
    pub iterations: usize,
}

impl Default for SlicParams {
    fn default() -> Self {
        WarmthConfig::default().into()
    }
}

impl From<WarmthConfig> for SlicParams {
    fn from(config: WarmthConfig) -> Self {
        Self {
            target_segments: config.segments,
            compactness: config.compactness,
            iterations: config.iterations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Center {
    lab: [f32; 3],
    x: f32,
    y: f32,
}

/// Label map produced by [`segment`]
#[derive(Debug, Clone, PartialEq)]
pub struct SlicSegmentation {
    pub width: usize,
    pub height: usize,
    /// Row-major label per pixel, -1 when unassigned
    pub labels: Vec<i32>,
    /// Number of centers seeded on the grid
    pub center_count: usize,
}

/// Aggregate of one superpixel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Superpixel {
    pub label: i32,
    pub pixel_count: usize,
    pub mean_lab: [f32; 3],
    pub mean_x: f32,
    pub mean_y: f32,
}

fn grid_positions(extent: usize, step: usize) -> Vec<usize> {
    let positions: Vec<usize> = (0..)
        .map(|i| step / 2 + i * step)
        .take_while(|&p| p < extent)
        .collect();
    if positions.is_empty() {
        vec![extent / 2]
    } else {
        positions
    }
}

#[inline]
fn slic_distance(lab: &[f32; 3], x: f32, y: f32, center: &Center, spatial_scale: f32) -> f32 {
    let dl = lab[0] - center.lab[0];
    let da = lab[1] - center.lab[1];
    let db = lab[2] - center.lab[2];
    let dc2 = dl * dl + da * da + db * db;
    let dx = x - center.x;
    let dy = y - center.y;
    let ds = (dx * dx + dy * dy).sqrt() * spatial_scale;
    (dc2 + ds * ds).sqrt()
}

/// Segment a Lab image into superpixels
///
/// # Arguments
///
/// * `lab` - Row-major Lab pixels, `width * height` entries
/// * `width`, `height` - Image dimensions
/// * `params` - Target count, compactness and iteration cap
///
/// # Returns
///
/// A label map; empty when the buffer does not match the dimensions
pub fn segment(lab: &[[f32; 3]], width: usize, height: usize, params: SlicParams) -> SlicSegmentation {
    let n = width * height;
    if n == 0 || lab.len() != n {
        return SlicSegmentation {
            width,
            height,
            labels: vec![-1; lab.len()],
            center_count: 0,
        };
    }

    let k = params.target_segments.clamp(1, n);
    let s = (n as f32 / k as f32).sqrt().max(1.0);
    let step = (s as usize).max(1);
    let spatial_scale = params.compactness / s;

    let mut centers: Vec<Center> = Vec::new();
    for &cy in &grid_positions(height, step) {
        for &cx in &grid_positions(width, step) {
            centers.push(Center {
                lab: lab[cy * width + cx],
                x: cx as f32,
                y: cy as f32,
            });
        }
    }

    let mut labels = vec![-1_i32; n];
    let mut distances = vec![f32::INFINITY; n];
    let window = step as isize;

    for _ in 0..params.iterations.max(1) {
        labels.iter_mut().for_each(|l| *l = -1);
        distances.iter_mut().for_each(|d| *d = f32::INFINITY);

        for (ci, center) in centers.iter().enumerate() {
            let cx = center.x.round() as isize;
            let cy = center.y.round() as isize;
            let x0 = (cx - window).max(0) as usize;
            let x1 = ((cx + window).min(width as isize - 1)).max(0) as usize;
            let y0 = (cy - window).max(0) as usize;
            let y1 = ((cy + window).min(height as isize - 1)).max(0) as usize;

            for y in y0..=y1 {
                for x in x0..=x1 {
                    let idx = y * width + x;
                    let d = slic_distance(&lab[idx], x as f32, y as f32, center, spatial_scale);
                    if d < distances[idx] {
                        distances[idx] = d;
                        labels[idx] = ci as i32;
                    }
                }
            }
        }

        let mut sums = vec![[0.0_f64; 5]; centers.len()];
        let mut counts = vec![0usize; centers.len()];
        for (idx, &label) in labels.iter().enumerate() {
            if label < 0 {
                continue;
            }
            let c = label as usize;
            let p = lab[idx];
            let acc = &mut sums[c];
            acc[0] += p[0] as f64;
            acc[1] += p[1] as f64;
            acc[2] += p[2] as f64;
            acc[3] += (idx % width) as f64;
            acc[4] += (idx / width) as f64;
            counts[c] += 1;
        }

        for (c, center) in centers.iter_mut().enumerate() {
            if counts[c] == 0 {
                continue;
            }
            let cnt = counts[c] as f64;
            let acc = sums[c];
            *center = Center {
                lab: [(acc[0] / cnt) as f32, (acc[1] / cnt) as f32, (acc[2] / cnt) as f32],
                x: (acc[3] / cnt) as f32,
                y: (acc[4] / cnt) as f32,
            };
        }
    }

    // Pixels that drifted out of every window go to their nearest center
    for idx in 0..n {
        if labels[idx] >= 0 {
            continue;
        }
        let (x, y) = ((idx % width) as f32, (idx / width) as f32);
        let nearest = centers
            .iter()
            .enumerate()
            .map(|(ci, c)| (ci, slic_distance(&lab[idx], x, y, c, spatial_scale)))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((ci, _)) = nearest {
            labels[idx] = ci as i32;
        }
    }

    SlicSegmentation {
        width,
        height,
        labels,
        center_count: centers.len(),
    }
}

/// Mean color and position of every non-empty superpixel
pub fn superpixel_stats(lab: &[[f32; 3]], labels: &[i32], width: usize) -> Vec<Superpixel> {
    let max_label = labels.iter().copied().max().unwrap_or(-1);
    if max_label < 0 || width == 0 {
        return Vec::new();
    }

    let slots = max_label as usize + 1;
    let mut sums = vec![[0.0_f64; 5]; slots];
    let mut counts = vec![0usize; slots];
    for (idx, (&label, p)) in labels.iter().zip(lab).enumerate() {
        if label < 0 {
            continue;
        }
        let acc = &mut sums[label as usize];
        acc[0] += p[0] as f64;
        acc[1] += p[1] as f64;
        acc[2] += p[2] as f64;
        acc[3] += (idx % width) as f64;
        acc[4] += (idx / width) as f64;
        counts[label as usize] += 1;
    }

    counts
        .iter()
        .enumerate()
        .filter(|(_, &c)| c > 0)
        .map(|(label, &count)| {
            let cnt = count as f64;
            let acc = sums[label];
            Superpixel {
                label: label as i32,
                pixel_count: count,
                mean_lab: [(acc[0] / cnt) as f32, (acc[1] / cnt) as f32, (acc[2] / cnt) as f32],
                mean_x: (acc[3] / cnt) as f32,
                mean_y: (acc[4] / cnt) as f32,
            }
        })
        .collect()
}
