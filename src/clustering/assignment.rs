//! Photo to cluster assignment
//!
//! Each dominant color of a photo votes for its nearest cluster centroid
//! with its weight. The cluster with the largest accumulated weight becomes
//! the photo's primary cluster.

use std::collections::BTreeMap;

use crate::color::conversion::lab_to_array;
use crate::extraction::kmeans::nearest_centroid;
use crate::models::{ColorCluster, PhotoColorInfo};

/// Cluster with the largest vote; ties go to the lower index
fn primary_cluster(mix: &BTreeMap<usize, f32>) -> Option<usize> {
    mix.iter()
        .fold(None, |best: Option<(usize, f32)>, (&idx, &w)| match best {
            Some((_, bw)) if bw >= w => best,
            _ => Some((idx, w)),
        })
        .map(|(idx, _)| idx)
}

/// Recompute every photo's cluster mix and primary cluster
///
/// Clears and refills `color_count` and `photo_ids` of every cluster.
/// Photos without dominant colors end up unassigned.
pub fn assign_photos(photos: &mut [PhotoColorInfo], clusters: &mut [ColorCluster]) {
    for cluster in clusters.iter_mut() {
        cluster.color_count = 0;
        cluster.photo_ids.clear();
    }

    let centroids: Vec<[f32; 3]> = clusters.iter().map(|c| lab_to_array(c.centroid_lab)).collect();

    for photo in photos.iter_mut() {
        photo.cluster_mix.clear();
        photo.primary_cluster_index = None;
        if centroids.is_empty() {
            continue;
        }

        for color in &photo.dominant_colors {
            let (pos, _) = nearest_centroid(&lab_to_array(color.lab()), &centroids);
            clusters[pos].color_count += 1;
            *photo.cluster_mix.entry(clusters[pos].index).or_default() += color.weight;
        }

        if let Some(primary) = primary_cluster(&photo.cluster_mix) {
            photo.primary_cluster_index = Some(primary);
            if let Some(cluster) = clusters.iter_mut().find(|c| c.index == primary) {
                cluster.photo_ids.push(photo.photo_id.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DominantColor;
    use palette::Srgb;

    fn photo(id: &str, colors: &[(Srgb, f32)]) -> PhotoColorInfo {
        let mut info = PhotoColorInfo::new(id);
        info.dominant_colors = colors.iter().map(|&(rgb, w)| DominantColor::new(rgb, w)).collect();
        info
    }

    #[test]
    fn test_weighted_vote() {
        let red = Srgb::new(0.9, 0.1, 0.1);
        let blue = Srgb::new(0.1, 0.1, 0.9);
        let mut photos = vec![
            photo("a", &[(red, 0.7), (blue, 0.3)]),
            photo("b", &[(red, 0.2), (blue, 0.5), (blue, 0.3)]),
            photo("c", &[]),
        ];
        let mut clusters = vec![
            ColorCluster::from_lab(0, crate::color::conversion::rgb_to_lab(red)),
            ColorCluster::from_lab(1, crate::color::conversion::rgb_to_lab(blue)),
        ];

        assign_photos(&mut photos, &mut clusters);

        assert_eq!(photos[0].primary_cluster_index, Some(0));
        assert_eq!(photos[1].primary_cluster_index, Some(1));
        assert_eq!(photos[2].primary_cluster_index, None);
        assert!((photos[1].cluster_mix[&1] - 0.8).abs() < 1e-6);
        assert_eq!(clusters[0].color_count + clusters[1].color_count, 5);
        assert_eq!(clusters[0].photo_ids, vec!["a".to_string()]);
        assert_eq!(clusters[1].photo_ids, vec!["b".to_string()]);
    }

    #[test]
    fn test_no_clusters_leaves_photos_unassigned() {
        let mut photos = vec![photo("a", &[(Srgb::new(0.5, 0.5, 0.5), 1.0)])];
        assign_photos(&mut photos, &mut []);
        assert_eq!(photos[0].primary_cluster_index, None);
        assert!(photos[0].cluster_mix.is_empty());
    }

    #[test]
    fn test_tie_goes_to_lower_index() {
        let mut mix = BTreeMap::new();
        mix.insert(2, 0.5);
        mix.insert(1, 0.5);
        assert_eq!(primary_cluster(&mix), Some(1));
    }
}
