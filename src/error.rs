//! Error types for the skin_scan library

use thiserror::Error;

use crate::types::Region;

/// Result type alias for skin_scan operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Error taxonomy for the analysis pipeline
///
/// Only [`AnalysisError::InvalidImage`] and [`AnalysisError::NoFaceDetected`]
/// reach the caller of a full analysis. Per-region failures are logged and
/// the region is dropped from the report.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Image could not be loaded, decoded or is empty
    #[error("Invalid image: {message}")]
    InvalidImage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The localizer found no candidate face regions
    #[error("No face detected in {width}x{height} image")]
    NoFaceDetected { width: i32, height: i32 },

    /// Analysis of a single region failed
    #[error("Region {region} could not be processed: {reason}")]
    RegionProcessing { region: Region, reason: String },

    /// OpenCV operation failed
    #[error("OpenCV error: {operation}")]
    OpenCv {
        operation: String,
        #[source]
        source: Option<opencv::Error>,
    },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Report or config could not be written
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl AnalysisError {
    /// Create an invalid image error with an underlying cause
    pub fn invalid_image<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::InvalidImage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid image error without an underlying cause
    pub fn invalid_image_msg(message: impl Into<String>) -> Self {
        Self::InvalidImage {
            message: message.into(),
            source: None,
        }
    }

    /// Create an OpenCV error with context
    pub fn opencv(operation: impl Into<String>, source: opencv::Error) -> Self {
        Self::OpenCv {
            operation: operation.into(),
            source: Some(source),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a region processing error
    pub fn region(region: Region, reason: impl Into<String>) -> Self {
        Self::RegionProcessing {
            region,
            reason: reason.into(),
        }
    }

    /// Check if this error indicates a recoverable condition
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::NoFaceDetected { .. } | AnalysisError::RegionProcessing { .. }
        )
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::InvalidImage { .. } => {
                "Could not load the image. Please check the file format and try again.".to_string()
            }
            AnalysisError::NoFaceDetected { .. } => {
                "No face was found. Please use a well-lit, front-facing photo.".to_string()
            }
            AnalysisError::RegionProcessing { .. } => {
                "Part of the face could not be analyzed.".to_string()
            }
            AnalysisError::InvalidParameter { parameter, .. } => {
                format!("The setting '{}' has an invalid value.", parameter)
            }
            AnalysisError::Config { .. } => {
                "The configuration file could not be read.".to_string()
            }
            _ => "Skin analysis failed. Please try with a different image.".to_string(),
        }
    }
}
