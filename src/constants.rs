//! Default tuning values for each pipeline stage
//!
//! These seed [`crate::config::PipelineConfig::default`]; the pipeline itself
//! always reads the configured values.

/// Face region localization (cascade detector)
pub mod localization {
    /// Window growth per scan; 1.1 scales the window up by 10%
    pub const SCALE_FACTOR: f64 = 1.1;

    /// Overlapping positive detections required to confirm a region
    pub const MIN_NEIGHBORS: i32 = 5;

    /// Smallest detectable window edge in pixels
    pub const MIN_WINDOW: i32 = 30;

    /// File name of the stock OpenCV frontal face cascade
    pub const FRONTAL_FACE_CASCADE: &str = "haarcascade_frontalface_default.xml";

    /// Directories where OpenCV packages usually install their cascades
    pub const CASCADE_SEARCH_DIRS: &[&str] = &[
        "/usr/share/opencv4/haarcascades",
        "/usr/local/share/opencv4/haarcascades",
        "/usr/share/opencv/haarcascades",
        "/opt/homebrew/share/opencv4/haarcascades",
        "/usr/local/opt/opencv/share/opencv4/haarcascades",
    ];
}

/// Blemish spot detection
pub mod spots {
    /// Noise smoothing blur kernel edge (odd)
    pub const BLUR_KERNEL_SIZE: i32 = 5;

    /// Neighborhood edge for Gaussian adaptive thresholding (odd, >= 3)
    pub const ADAPTIVE_BLOCK_SIZE: i32 = 11;

    /// Offset subtracted from the local weighted mean
    pub const ADAPTIVE_C: f64 = 2.0;

    /// Structuring element edge for closing/opening
    pub const MORPH_KERNEL_SIZE: i32 = 3;

    /// Component area band, both bounds exclusive
    pub const MIN_SPOT_AREA: f64 = 5.0;
    pub const MAX_SPOT_AREA: f64 = 200.0;

    /// Skin tone inclusion range in 8-bit HSV (OpenCV hue is 0-179)
    pub const SKIN_HSV_LOWER: [u8; 3] = [0, 20, 70];
    pub const SKIN_HSV_UPPER: [u8; 3] = [20, 255, 255];

    /// Optional YCrCb refinement range (Y, Cr, Cb)
    pub const SKIN_YCRCB_LOWER: [u8; 3] = [0, 135, 85];
    pub const SKIN_YCRCB_UPPER: [u8; 3] = [255, 180, 135];

    /// Elliptical kernel smoothing the combined HSV and YCrCb skin mask
    pub const SKIN_MASK_SMOOTHING_KERNEL: i32 = 11;
}

/// Density field synthesis
pub mod density {
    /// Standard deviation of each spot's Gaussian bump in pixels
    pub const SIGMA: f64 = 15.0;
}

/// Severity classification
pub mod severity {
    /// Pixel area of one normalization unit (100x100)
    pub const UNIT_AREA: f64 = 10_000.0;

    /// Upper bounds (exclusive) of the density bands
    pub const CLEAR_MAX: f64 = 0.5;
    pub const MILD_MAX: f64 = 1.5;
    pub const MODERATE_MAX: f64 = 3.0;

    /// Multiplier from density to the 0-100 severity score
    pub const SCORE_PER_DENSITY: f64 = 20.0;
    pub const MAX_SCORE: f64 = 100.0;
}

/// Image preprocessing
pub mod preprocessing {
    /// Bilateral filter neighborhood diameter
    pub const BILATERAL_DIAMETER: i32 = 9;
    pub const BILATERAL_SIGMA_COLOR: f64 = 75.0;
    pub const BILATERAL_SIGMA_SPACE: f64 = 75.0;

    /// CLAHE parameters for lightness enhancement
    pub const CLAHE_CLIP_LIMIT: f64 = 2.0;
    pub const CLAHE_TILE_GRID: i32 = 8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_kernel_defaults() {
        assert_eq!(spots::BLUR_KERNEL_SIZE % 2, 1);
        assert_eq!(spots::ADAPTIVE_BLOCK_SIZE % 2, 1);
        assert_eq!(spots::MORPH_KERNEL_SIZE % 2, 1);
    }

    #[test]
    fn test_threshold_ranges() {
        assert!(spots::MIN_SPOT_AREA < spots::MAX_SPOT_AREA);
        assert!(severity::CLEAR_MAX < severity::MILD_MAX);
        assert!(severity::MILD_MAX < severity::MODERATE_MAX);
        assert!(localization::SCALE_FACTOR > 1.0);
    }

    #[test]
    fn test_skin_range_ordering() {
        for i in 0..3 {
            assert!(spots::SKIN_HSV_LOWER[i] <= spots::SKIN_HSV_UPPER[i]);
            assert!(spots::SKIN_YCRCB_LOWER[i] <= spots::SKIN_YCRCB_UPPER[i]);
        }
    }
}
