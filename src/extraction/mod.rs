//! Per-photo dominant color extraction
//!
//! [`kmeans`] is the clustering engine shared with global palette
//! clustering; [`dominant`] turns an image into a short weighted palette.

pub mod dominant;
pub mod kmeans;

pub use dominant::{DominantColorExtractor, ExtractionResult};
pub use kmeans::{weighted_kmeans, ClusteringResult, KMeansConfig};
