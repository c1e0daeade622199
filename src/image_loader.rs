//! Image loading for photo collections on disk
//!
//! Decoding goes through the `image` crate. EXIF orientation is applied on
//! load so that light direction is measured on the upright photo.
//!
//! ## Supported Formats
//!
//! JPEG, PNG, GIF (first frame), WebP, TIFF, BMP, ICO, TGA, OpenEXR, PNM,
//! QOI, DDS and Radiance HDR.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageDecoder, ImageReader};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::pipeline::PhotoSource;

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoFormat {
    Jpeg,
    Png,
    /// First frame only
    Gif,
    WebP,
    Tiff,
    Bmp,
    Ico,
    Tga,
    Exr,
    /// PBM, PGM and PPM
    Pnm,
    Qoi,
    Dds,
    Hdr,
}

impl PhotoFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<PhotoFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(PhotoFormat::Jpeg),
            "png" => Some(PhotoFormat::Png),
            "gif" => Some(PhotoFormat::Gif),
            "webp" => Some(PhotoFormat::WebP),
            "tiff" | "tif" => Some(PhotoFormat::Tiff),
            "bmp" => Some(PhotoFormat::Bmp),
            "ico" => Some(PhotoFormat::Ico),
            "tga" => Some(PhotoFormat::Tga),
            "exr" => Some(PhotoFormat::Exr),
            "pbm" | "pgm" | "ppm" | "pnm" => Some(PhotoFormat::Pnm),
            "qoi" => Some(PhotoFormat::Qoi),
            "dds" => Some(PhotoFormat::Dds),
            "hdr" => Some(PhotoFormat::Hdr),
            _ => None,
        }
    }

    fn image_format(self) -> image::ImageFormat {
        match self {
            PhotoFormat::Jpeg => image::ImageFormat::Jpeg,
            PhotoFormat::Png => image::ImageFormat::Png,
            PhotoFormat::Gif => image::ImageFormat::Gif,
            PhotoFormat::WebP => image::ImageFormat::WebP,
            PhotoFormat::Tiff => image::ImageFormat::Tiff,
            PhotoFormat::Bmp => image::ImageFormat::Bmp,
            PhotoFormat::Ico => image::ImageFormat::Ico,
            PhotoFormat::Tga => image::ImageFormat::Tga,
            PhotoFormat::Exr => image::ImageFormat::OpenExr,
            PhotoFormat::Pnm => image::ImageFormat::Pnm,
            PhotoFormat::Qoi => image::ImageFormat::Qoi,
            PhotoFormat::Dds => image::ImageFormat::Dds,
            PhotoFormat::Hdr => image::ImageFormat::Hdr,
        }
    }
}

/// Load an image from disk, upright
///
/// # Errors
///
/// Returns `AnalysisError::ImageLoadError` if the file cannot be opened,
/// its format is not supported, or decoding fails
///
/// # Example
///
/// ```rust,no_run
/// use photo_colorscan::image_loader::load_image;
/// use std::path::Path;
///
/// let image = load_image(Path::new("photo.jpg"))?;
/// println!("Loaded image: {}x{}", image.width(), image.height());
/// # Ok::<(), photo_colorscan::AnalysisError>(())
/// ```
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let format = PhotoFormat::from_extension(path).ok_or_else(|| AnalysisError::ImageLoadError {
        message: format!("Unknown image format for file: {}", path.display()),
        source: None,
    })?;

    let mut reader = ImageReader::open(path)
        .map_err(|e| AnalysisError::image_load(format!("Failed to open image file: {}", path.display()), e))?;
    reader.set_format(format.image_format());

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| AnalysisError::image_load(format!("Failed to read image header: {}", path.display()), e))?;
    let orientation = decoder
        .orientation()
        .map_err(|e| AnalysisError::image_load(format!("Failed to read orientation: {}", path.display()), e))?;

    let mut image = DynamicImage::from_decoder(decoder)
        .map_err(|e| AnalysisError::image_load(format!("Failed to decode image: {}", path.display()), e))?;
    image.apply_orientation(orientation);

    debug!(path = %path.display(), width = image.width(), height = image.height(), "Loaded image");
    Ok(image)
}

/// Get list of all supported file extensions
pub fn supported_extensions() -> &'static [&'static str] {
    &[
        "jpg", "jpeg", "png", "gif", "webp", "tiff", "tif", "bmp", "ico", "tga", "exr", "pbm", "pgm",
        "ppm", "pnm", "qoi", "dds", "hdr",
    ]
}

/// Check if a file extension is supported
pub fn is_supported_extension(ext: &str) -> bool {
    let ext_lower = ext.to_lowercase();
    supported_extensions().contains(&ext_lower.as_str())
}

/// Photo source backed by a directory; identifiers are file names
#[derive(Debug, Clone)]
pub struct DirectoryPhotoSource {
    root: PathBuf,
}

impl DirectoryPhotoSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File names of all supported images in the directory, sorted
    pub fn list_photos(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let supported = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(is_supported_extension);
            if let (true, Some(name)) = (supported, path.file_name().and_then(|n| n.to_str())) {
                ids.push(name.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl PhotoSource for DirectoryPhotoSource {
    fn load(&self, photo_id: &str) -> Result<DynamicImage> {
        let name = Path::new(photo_id);
        if name.file_name() != Some(name.as_os_str()) {
            return Err(AnalysisError::InvalidParameter {
                parameter: "photo_id".to_string(),
                value: photo_id.to_string(),
            });
        }
        load_image(&self.root.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("colorscan_{}_{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            PhotoFormat::from_extension(Path::new("photo.jpg")),
            Some(PhotoFormat::Jpeg)
        );
        assert_eq!(
            PhotoFormat::from_extension(Path::new("photo.JPEG")),
            Some(PhotoFormat::Jpeg)
        );
        assert_eq!(
            PhotoFormat::from_extension(Path::new("photo.webp")),
            Some(PhotoFormat::WebP)
        );
        assert_eq!(PhotoFormat::from_extension(Path::new("photo.heic")), None);
        assert_eq!(PhotoFormat::from_extension(Path::new("photo.xyz")), None);
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_extension("jpg"));
        assert!(is_supported_extension("PNG"));
        assert!(!is_supported_extension("xyz"));
        assert!(!is_supported_extension("doc"));
    }

    #[test]
    fn test_directory_source_round_trip() {
        let dir = temp_dir("source");
        RgbImage::from_pixel(8, 6, Rgb([200, 30, 30])).save(dir.join("b.png")).unwrap();
        RgbImage::from_pixel(4, 4, Rgb([30, 30, 200])).save(dir.join("a.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "not an image").unwrap();

        let source = DirectoryPhotoSource::new(&dir);
        let ids = source.list_photos().unwrap();
        assert_eq!(ids, vec!["a.png".to_string(), "b.png".to_string()]);

        let image = source.load("b.png").unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
        assert_eq!(image.to_rgb8().get_pixel(0, 0), &Rgb([200, 30, 30]));

        assert!(source.load("../b.png").is_err());
        assert!(source.load("missing.png").is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
