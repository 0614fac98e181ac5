//! Unified image loading for files, encoded bytes and raw pixel buffers
//!
//! ## Supported Formats
//!
//! Decoded via the `image` crate: JPEG, PNG, BMP, TIFF, WebP.
//!
//! ## Design
//!
//! The loader converts every image to an OpenCV `Mat` in BGR format for
//! consistent downstream processing. EXIF orientation is applied at decode
//! time when requested, so region coordinates refer to the upright image.
//! Any decode failure is reported as [`AnalysisError::InvalidImage`] and is
//! never replaced with a substitute image.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageDecoder, ImageReader};
use log::debug;
use opencv::core::{Mat, CV_8UC3};
use opencv::prelude::*;

use crate::error::{AnalysisError, Result};

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG image
    Jpeg,
    /// PNG image
    Png,
    /// BMP image
    Bmp,
    /// TIFF image
    Tiff,
    /// WebP image
    WebP,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "bmp" => Some(ImageFormat::Bmp),
            "tiff" | "tif" => Some(ImageFormat::Tiff),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }
}

/// Load an image from disk and convert to OpenCV Mat (BGR format)
///
/// # Arguments
///
/// * `path` - Path to the image file
/// * `exif_correction` - Rotate/flip according to the EXIF orientation tag
///
/// # Errors
///
/// Returns `AnalysisError::InvalidImage` if:
/// - The extension is not a supported format
/// - File cannot be opened
/// - Decoding fails or the image has zero area
///
/// # Example
///
/// ```rust,no_run
/// use skin_scan::image_loader::load_image;
/// use std::path::Path;
///
/// let mat = load_image(Path::new("face.jpg"), true)?;
/// # Ok::<(), skin_scan::AnalysisError>(())
/// ```
pub fn load_image(path: &Path, exif_correction: bool) -> Result<Mat> {
    if ImageFormat::from_extension(path).is_none() {
        return Err(AnalysisError::invalid_image_msg(format!(
            "Unsupported image format for file: {}",
            path.display()
        )));
    }

    let reader = ImageReader::open(path).map_err(|e| {
        AnalysisError::invalid_image(format!("Failed to open image file: {}", path.display()), e)
    })?;
    let reader = reader.with_guessed_format().map_err(|e| {
        AnalysisError::invalid_image(format!("Failed to read image file: {}", path.display()), e)
    })?;

    let image = decode(reader, exif_correction)
        .map_err(|e| AnalysisError::invalid_image(format!("Failed to decode image: {}", path.display()), e))?;
    debug!(
        "Loaded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    dynamic_to_mat(&image)
}

/// Decode an encoded image held in memory (format guessed from content)
pub fn load_image_bytes(bytes: &[u8], exif_correction: bool) -> Result<Mat> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AnalysisError::invalid_image("Failed to inspect image bytes", e))?;
    let image = decode(reader, exif_correction)
        .map_err(|e| AnalysisError::invalid_image("Failed to decode image bytes", e))?;
    dynamic_to_mat(&image)
}

fn decode<R>(reader: ImageReader<R>, exif_correction: bool) -> image::ImageResult<DynamicImage>
where
    R: std::io::BufRead + std::io::Seek,
{
    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    if exif_correction {
        image.apply_orientation(orientation);
    }
    Ok(image)
}

/// Convert a decoded image of any pixel type to a BGR Mat
pub fn dynamic_to_mat(image: &DynamicImage) -> Result<Mat> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    mat_from_rgb(rgb.as_raw(), width, height)
}

/// Convert an interleaved RGB byte buffer to an OpenCV BGR Mat
///
/// # Errors
///
/// Returns `AnalysisError::InvalidImage` when either dimension is zero or
/// the buffer length is not `width * height * 3`.
pub fn mat_from_rgb(rgb_data: &[u8], width: u32, height: u32) -> Result<Mat> {
    if width == 0 || height == 0 {
        return Err(AnalysisError::invalid_image_msg(format!(
            "Image has zero area ({}x{})",
            width, height
        )));
    }
    let expected = width as usize * height as usize * 3;
    if rgb_data.len() != expected {
        return Err(AnalysisError::invalid_image_msg(format!(
            "RGB buffer holds {} bytes, expected {} for {}x{}",
            rgb_data.len(),
            expected,
            width,
            height
        )));
    }

    let mut mat = Mat::zeros(height as i32, width as i32, CV_8UC3)
        .and_then(|m| m.to_mat())
        .map_err(|e| AnalysisError::opencv("Failed to create Mat", e))?;

    let bgr = mat
        .data_bytes_mut()
        .map_err(|e| AnalysisError::opencv("Failed to access Mat buffer", e))?;
    for (dst, src) in bgr.chunks_exact_mut(3).zip(rgb_data.chunks_exact(3)) {
        dst[0] = src[2];
        dst[1] = src[1];
        dst[2] = src[0];
    }

    Ok(mat)
}

/// Get list of all supported file extensions
pub fn supported_extensions() -> &'static [&'static str] {
    &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"]
}

/// Check if a file extension is supported
pub fn is_supported_extension(ext: &str) -> bool {
    let ext_lower = ext.to_lowercase();
    supported_extensions().contains(&ext_lower.as_str())
}
