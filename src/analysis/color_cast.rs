//! Highlight and shadow color cast
//!
//! Pixels darker than the 15th lightness percentile form the shadow region
//! and pixels brighter than the 85th form the highlight region. Each pixel
//! is weighted by how deep it sits in its region,
//! `clamp((P15 - L) / (P15 - P5), 0, 1)²` for shadows and the mirrored
//! expression for highlights, and the weighted mean (a, b) gives the cast.

use crate::color::conversion::hue_degrees;
use crate::constants::color_cast::{
    FLAT_RANGE_EPSILON, HIGHLIGHT_HIGH_PERCENTILE, HIGHLIGHT_LOW_PERCENTILE,
    SHADOW_HIGH_PERCENTILE, SHADOW_LOW_PERCENTILE, WEIGHT_GAMMA,
};
use crate::models::{CastRegion, ColorCastResult};

/// Value at percentile `p` (0-100) of an ascending slice
pub fn percentile(sorted: &[f32], p: f32) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    sorted[(rank.round() as usize).min(sorted.len() - 1)]
}

#[derive(Default)]
struct RegionAccumulator {
    weight: f64,
    a: f64,
    b: f64,
}

impl RegionAccumulator {
    fn add(&mut self, w: f32, a: f32, b: f32) {
        if w > 0.0 {
            self.weight += w as f64;
            self.a += (w * a) as f64;
            self.b += (w * b) as f64;
        }
    }

    fn finish(self) -> Option<CastRegion> {
        if self.weight <= 0.0 {
            return None;
        }
        let mean_a = (self.a / self.weight) as f32;
        let mean_b = (self.b / self.weight) as f32;
        Some(CastRegion {
            mean_a,
            mean_b,
            strength: (mean_a * mean_a + mean_b * mean_b).sqrt(),
            hue_degrees: hue_degrees(mean_a, mean_b),
        })
    }
}

fn depth_weight(distance: f32, span: f32) -> f32 {
    let t = (distance / span.max(f32::EPSILON)).clamp(0.0, 1.0);
    t.powi(WEIGHT_GAMMA)
}

/// Compute the color cast of a Lab image
///
/// # Returns
///
/// `None` for empty or tonally flat images (`P95 - P5` below epsilon)
pub fn compute_color_cast(lab: &[[f32; 3]]) -> Option<ColorCastResult> {
    if lab.is_empty() {
        return None;
    }

    let mut lightness: Vec<f32> = lab.iter().map(|p| p[0]).collect();
    lightness.sort_by(f32::total_cmp);

    let p5 = percentile(&lightness, SHADOW_LOW_PERCENTILE);
    let p15 = percentile(&lightness, SHADOW_HIGH_PERCENTILE);
    let p85 = percentile(&lightness, HIGHLIGHT_LOW_PERCENTILE);
    let p95 = percentile(&lightness, HIGHLIGHT_HIGH_PERCENTILE);

    if p95 - p5 < FLAT_RANGE_EPSILON {
        return None;
    }

    let mut shadow = RegionAccumulator::default();
    let mut highlight = RegionAccumulator::default();
    let mut sum = 0.0_f64;
    let mut sum_sq = 0.0_f64;

    for p in lab {
        let l = p[0];
        sum += l as f64;
        sum_sq += (l as f64) * (l as f64);
        if l < p15 {
            shadow.add(depth_weight(p15 - l, p15 - p5), p[1], p[2]);
        } else if l > p85 {
            highlight.add(depth_weight(l - p85, p95 - p85), p[1], p[2]);
        }
    }

    let n = lab.len() as f64;
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);

    Some(ColorCastResult {
        rms_contrast: (variance.sqrt() / 100.0) as f32,
        highlight: highlight.finish(),
        shadow: shadow.finish(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lightness ramp 0..100 with a blue shadow tint and a yellow highlight tint
    fn tinted_ramp() -> Vec<[f32; 3]> {
        (0..=100)
            .map(|i| {
                let l = i as f32;
                if l < 20.0 {
                    [l, 0.0, -10.0]
                } else if l > 80.0 {
                    [l, 2.0, 12.0]
                } else {
                    [l, 0.0, 0.0]
                }
            })
            .collect()
    }

    #[test]
    fn test_flat_image_has_no_cast() {
        let lab = vec![[53.6, 0.0, 0.0]; 500];
        assert!(compute_color_cast(&lab).is_none());
        assert!(compute_color_cast(&[]).is_none());
    }

    #[test]
    fn test_shadow_and_highlight_casts() {
        let cast = compute_color_cast(&tinted_ramp()).unwrap();

        let shadow = cast.shadow.unwrap();
        assert!((shadow.mean_b + 10.0).abs() < 1e-4);
        assert!((shadow.strength - 10.0).abs() < 1e-4);
        assert!((shadow.hue_degrees - 270.0).abs() < 1e-3);

        let highlight = cast.highlight.unwrap();
        assert!(highlight.mean_b > 11.0);
        assert!(highlight.hue_degrees > 0.0 && highlight.hue_degrees < 90.0);

        assert!(cast.rms_contrast > 0.2 && cast.rms_contrast < 0.4);
    }

    #[test]
    fn test_two_level_image_omits_empty_region() {
        // Half black, half white: nothing is strictly below P15 = 0
        let mut lab = vec![[0.0, 0.0, 0.0]; 50];
        lab.extend(vec![[100.0, 0.0, 5.0]; 50]);
        let cast = compute_color_cast(&lab).unwrap();
        assert!(cast.shadow.is_none());
        assert!(cast.highlight.is_none());
    }

    #[test]
    fn test_percentile() {
        let v: Vec<f32> = (0..=10).map(|i| i as f32).collect();
        assert_eq!(percentile(&v, 0.0), 0.0);
        assert_eq!(percentile(&v, 50.0), 5.0);
        assert_eq!(percentile(&v, 100.0), 10.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}
