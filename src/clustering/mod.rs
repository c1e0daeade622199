//! Global palette clustering
//!
//! Clusters the dominant colors of a whole collection into a palette,
//! assigns photos to palette entries and refines the result.

pub mod adaptive;
pub mod assignment;
pub mod auto_k;
pub mod quality;

pub use adaptive::{AdaptiveClusterManager, AdaptiveUpdate};
pub use assignment::assign_photos;
pub use auto_k::{AutoKResult, GlobalClusterer};
