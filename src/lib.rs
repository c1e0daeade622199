//! # Photo Colorscan
//!
//! A Rust crate for analyzing the color content of photo collections.
//!
//! This library turns a set of photos into:
//! - A short weighted palette of dominant colors per photo
//! - Warm/cool scores and highlight/shadow color casts from superpixel analysis
//! - A global palette with an automatically chosen size and quality rating
//! - Collection-level hue, lightness, saturation and style statistics
//!
//! ## Example
//!
//! ```rust,no_run
//! use photo_colorscan::{AnalysisPipeline, AnalysisSettings, DirectoryPhotoSource};
//! use std::sync::Arc;
//!
//! let source = DirectoryPhotoSource::new("photos");
//! let ids = source.list_photos()?;
//! let pipeline = AnalysisPipeline::new(Arc::new(source), AnalysisSettings::default());
//!
//! let result = pipeline.analyze_collection(&ids, |p| {
//!     println!("{:>3.0}% {}", p.overall_progress * 100.0, p.stage);
//! });
//! for cluster in &result.clusters {
//!     println!("{} {} ({} photos)", cluster.hex, cluster.name, cluster.photo_count());
//! }
//! # Ok::<(), photo_colorscan::AnalysisError>(())
//! ```

use image::DynamicImage;

pub mod analysis;
pub mod clustering;
pub mod color;
pub mod config;
pub mod constants;
pub mod error;
pub mod extraction;
pub mod image_loader;
pub mod models;
pub mod pipeline;
pub mod preprocess;

pub use config::AnalysisSettings;
pub use error::{AnalysisError, Result};
pub use image_loader::DirectoryPhotoSource;
pub use models::{AnalysisResult, ColorCluster, DominantColor, PhotoColorInfo, QualityLevel};
pub use pipeline::{AnalysisCache, AnalysisPipeline, AnalysisProgress, CancellationToken, InMemoryCache, PhotoSource};

/// Analyze a single decoded photo with the given settings
///
/// Runs dominant color extraction, warmth and color cast analysis and style
/// feature computation, without any clustering.
///
/// # Errors
///
/// Returns `AnalysisError::EmptyImage` if the image has no pixels
pub fn analyze_photo(photo_id: &str, image: &DynamicImage, settings: &AnalysisSettings) -> Result<PhotoColorInfo> {
    let settings = settings.sanitized();
    let extraction =
        extraction::DominantColorExtractor::new(settings.extraction.clone()).extract(image, settings.extraction.seed)?;
    let advanced = analysis::WarmCoolAnalyzer::new(settings.warmth).analyze(image, &extraction.colors)?;

    let mut info = PhotoColorInfo::new(photo_id);
    info.image_feature = match (&advanced.slic, &advanced.hsl) {
        (Some(slic), Some(hsl)) => Some(analysis::compute_image_feature(
            slic,
            hsl,
            &extraction.colors,
            advanced.warmth_score,
        )),
        _ => None,
    };
    info.dominant_colors = extraction.colors;
    info.brightness_cdf = extraction.brightness_cdf;
    info.advanced = Some(advanced);
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_photo_info_serialization() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(32, 32, |x, _| {
            if x < 16 {
                Rgb([220, 120, 40])
            } else {
                Rgb([40, 90, 200])
            }
        }));
        let info = analyze_photo("split", &image, &AnalysisSettings::default()).unwrap();
        assert!(info.is_complete());
        assert!(info.image_feature.is_some());

        let json = serde_json::to_string(&info).unwrap();
        let deserialized: PhotoColorInfo = serde_json::from_str(&json).unwrap();

        assert_eq!(info, deserialized);
    }
}
