//! Image preprocessing module
//!
//! This module normalizes a decoded image before localization: optional
//! downscaling of oversized photos and optional local contrast enhancement.
//! It also hosts the color-space helpers shared by the detection stages.

pub mod enhance;

use log::debug;
use opencv::{
    core::Mat,
    imgproc::{cvt_color_def, COLOR_BGR2GRAY},
    prelude::*,
};

use crate::config::PreprocessingConfig;
use crate::{AnalysisError, Result};

pub use enhance::{enhance_contrast, limit_dimension};

/// Ensure a BGR image is present and has three channels
pub fn ensure_color_image(image: &Mat) -> Result<()> {
    if image.empty() || image.rows() == 0 || image.cols() == 0 {
        return Err(AnalysisError::invalid_image_msg("Image is empty"));
    }
    if image.channels() != 3 {
        return Err(AnalysisError::invalid_image_msg(format!(
            "Expected a 3-channel BGR image, got {} channel(s)",
            image.channels()
        )));
    }
    Ok(())
}

/// Single-channel luminance of a BGR image
pub fn to_luminance(image: &Mat) -> Result<Mat> {
    let mut gray = Mat::default();
    cvt_color_def(image, &mut gray, COLOR_BGR2GRAY)
        .map_err(|e| AnalysisError::opencv("Grayscale conversion", e))?;
    Ok(gray)
}

/// Applies the configured preprocessing steps in order
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessingConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    /// Resize then enhance, returning a new image
    ///
    /// # Errors
    ///
    /// `InvalidImage` for an empty or non-BGR input, `OpenCv` when a
    /// filter fails.
    pub fn apply(&self, image: &Mat) -> Result<Mat> {
        ensure_color_image(image)?;

        let mut current = match self.config.max_dimension {
            Some(max_dimension) => limit_dimension(image, max_dimension)?,
            None => image
                .try_clone()
                .map_err(|e| AnalysisError::opencv("Image copy", e))?,
        };

        if self.config.enhance_contrast {
            current = enhance_contrast(&current)?;
        }

        debug!(
            "Preprocessed image: {}x{} -> {}x{}",
            image.cols(),
            image.rows(),
            current.cols(),
            current.rows()
        );
        Ok(current)
    }
}
