//! Resizing and local contrast enhancement
//!
//! Contrast enhancement smooths noise with an edge-preserving bilateral
//! filter, then equalizes the Lab lightness channel with CLAHE so that
//! blemishes stand out under flat or uneven lighting.

use opencv::{
    core::{merge, split, Mat, Size, Vector},
    imgproc::{
        bilateral_filter_def, create_clahe, cvt_color_def, resize, COLOR_BGR2Lab, COLOR_Lab2BGR,
        INTER_AREA,
    },
    prelude::*,
};

use crate::constants::preprocessing::{
    BILATERAL_DIAMETER, BILATERAL_SIGMA_COLOR, BILATERAL_SIGMA_SPACE, CLAHE_CLIP_LIMIT,
    CLAHE_TILE_GRID,
};
use crate::{AnalysisError, Result};

/// Downscale so the longest edge is at most `max_dimension`, keeping aspect
///
/// Images already within the limit are copied unchanged.
pub fn limit_dimension(image: &Mat, max_dimension: u32) -> Result<Mat> {
    let (width, height) = (image.cols(), image.rows());
    let longest = width.max(height);

    if max_dimension == 0 || longest as u32 <= max_dimension {
        return image
            .try_clone()
            .map_err(|e| AnalysisError::opencv("Image copy", e));
    }

    let scale = max_dimension as f64 / longest as f64;
    let new_width = ((width as f64 * scale) as i32).max(1);
    let new_height = ((height as f64 * scale) as i32).max(1);

    let mut resized = Mat::default();
    resize(
        image,
        &mut resized,
        Size::new(new_width, new_height),
        0.0,
        0.0,
        INTER_AREA,
    )
    .map_err(|e| AnalysisError::opencv("Resize", e))?;

    Ok(resized)
}

/// Bilateral smoothing followed by CLAHE on the lightness channel
pub fn enhance_contrast(image: &Mat) -> Result<Mat> {
    let mut filtered = Mat::default();
    bilateral_filter_def(
        image,
        &mut filtered,
        BILATERAL_DIAMETER,
        BILATERAL_SIGMA_COLOR,
        BILATERAL_SIGMA_SPACE,
    )
    .map_err(|e| AnalysisError::opencv("Bilateral filter", e))?;

    let mut lab = Mat::default();
    cvt_color_def(&filtered, &mut lab, COLOR_BGR2Lab)
        .map_err(|e| AnalysisError::opencv("Lab conversion", e))?;

    let mut channels = Vector::<Mat>::new();
    split(&lab, &mut channels).map_err(|e| AnalysisError::opencv("Channel split", e))?;

    let lightness = channels
        .get(0)
        .map_err(|e| AnalysisError::opencv("Lightness channel access", e))?;

    let mut clahe = create_clahe(
        CLAHE_CLIP_LIMIT,
        Size::new(CLAHE_TILE_GRID, CLAHE_TILE_GRID),
    )
    .map_err(|e| AnalysisError::opencv("CLAHE creation", e))?;

    let mut equalized = Mat::default();
    clahe
        .apply(&lightness, &mut equalized)
        .map_err(|e| AnalysisError::opencv("CLAHE apply", e))?;

    channels
        .set(0, equalized)
        .map_err(|e| AnalysisError::opencv("Lightness channel replace", e))?;

    let mut merged = Mat::default();
    merge(&channels, &mut merged).map_err(|e| AnalysisError::opencv("Channel merge", e))?;

    let mut enhanced = Mat::default();
    cvt_color_def(&merged, &mut enhanced, COLOR_Lab2BGR)
        .map_err(|e| AnalysisError::opencv("BGR conversion", e))?;

    Ok(enhanced)
}
