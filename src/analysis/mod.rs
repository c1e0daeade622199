//! Local structure, warmth and style analysis
//!
//! These analyzers work on a bounded-resolution Lab copy of the photo:
//! superpixel segmentation, warm/cool scoring, highlight and shadow color
//! cast, per-photo style features and their collection-level aggregate.

pub mod collection;
pub mod color_cast;
pub mod image_statistics;
pub mod slic;
pub mod warmth;

pub use collection::{aggregate_collection_feature, CollectionFeature};
pub use image_statistics::{compute_image_feature, ImageFeature};
pub use warmth::{warm_cool_distribution, WarmCoolAnalyzer};
