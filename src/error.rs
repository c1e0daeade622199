//! Error types for the photo_colorscan library

use thiserror::Error;

/// Result type alias for photo_colorscan operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Comprehensive error types for color analysis operations
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Image file could not be loaded or decoded
    #[error("Failed to load image: {message}")]
    ImageLoadError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Image decoded but contains no usable pixels
    #[error("Image is empty: {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// Too few points for the requested clustering
    #[error("Insufficient data for clustering: {points} points, {required} required")]
    InsufficientData { points: usize, required: usize },

    /// Clustering could not produce a valid result
    #[error("Clustering failed: {reason}")]
    ClusteringError { reason: String },

    /// Color space conversion error
    #[error("Color conversion error: {message}")]
    ColorConversionError { message: String },

    /// Generic processing error
    #[error("Processing error: {message}")]
    ProcessingError { message: String },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// The run was cancelled by the caller
    #[error("Analysis cancelled")]
    Cancelled,

    /// Settings file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings or cached results could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Create an image load error with context
    pub fn image_load<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageLoadError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a processing error from a message
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    /// Create a clustering error from a reason
    pub fn clustering(reason: impl Into<String>) -> Self {
        Self::ClusteringError {
            reason: reason.into(),
        }
    }

    /// Check if this error only affects a single photo or stage
    ///
    /// Recoverable errors are absorbed by the pipeline: the photo is counted
    /// as failed, or the clustering stage falls back to its default.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::ImageLoadError { .. }
                | AnalysisError::EmptyImage { .. }
                | AnalysisError::InsufficientData { .. }
                | AnalysisError::ClusteringError { .. }
        )
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::ImageLoadError { .. } | AnalysisError::EmptyImage { .. } => {
                "Could not read one of the photos. It was skipped.".to_string()
            }
            AnalysisError::InsufficientData { .. } => {
                "Not enough colors to build a palette. Try adding more photos.".to_string()
            }
            AnalysisError::ClusteringError { .. } => {
                "Could not pick the best palette size. A default size was used.".to_string()
            }
            AnalysisError::Cancelled => "Analysis was cancelled.".to_string(),
            _ => "Color analysis failed. Please try again.".to_string(),
        }
    }
}
