//! Blemish spot detection within a face region
//!
//! Implements spot detection that:
//! - Restricts candidates to skin-toned pixels (HSV range, optional YCrCb)
//! - Finds locally dark pixels with Gaussian adaptive thresholding
//! - Cleans the candidate mask with closing then opening
//! - Keeps external contours whose area lies inside the configured band
//! - Reports one centroid per kept contour and a filled mask of their extents
//!
//! The pipeline is deterministic. Any OpenCV failure degrades to an empty
//! [`SpotSet`] so one bad region never aborts the rest of the image.

use log::{debug, warn};
use opencv::{
    core::{bitwise_and_def, count_non_zero, in_range, Mat, Point as CvPoint, Scalar, Size, Vector, CV_8UC1},
    imgproc::{
        adaptive_threshold, contour_area_def, cvt_color_def, draw_contours, find_contours_def,
        gaussian_blur_def, get_structuring_element_def, moments_def, morphology_ex_def,
        ADAPTIVE_THRESH_GAUSSIAN_C, CHAIN_APPROX_SIMPLE, COLOR_BGR2HSV, COLOR_BGR2YCrCb, FILLED,
        LINE_8, MORPH_CLOSE, MORPH_ELLIPSE, MORPH_OPEN, MORPH_RECT, RETR_EXTERNAL, THRESH_BINARY_INV,
    },
    prelude::*,
};

use crate::config::SpotDetectionConfig;
use crate::constants::spots::{SKIN_MASK_SMOOTHING_KERNEL, SKIN_YCRCB_LOWER, SKIN_YCRCB_UPPER};
use crate::preprocessing::{ensure_color_image, to_luminance};
use crate::types::Point;
use crate::{AnalysisError, Result};

type VectorOfPoint = Vector<CvPoint>;

/// Detected spot centers plus a mask of their extents
///
/// The point list is authoritative. The mask is a derived view for
/// visualization: every retained contour drawn filled with 255 on 0.
#[derive(Debug, Clone)]
pub struct SpotSet {
    /// Spot centroids in region-local coordinates, in contour order
    pub points: Vec<Point>,
    /// `CV_8UC1` mask, same size as the region
    pub mask: Mat,
    /// Contour area of each retained spot, parallel to `points`
    pub areas: Vec<f64>,
}

impl SpotSet {
    /// No spots and an all-zero mask of the given size
    pub fn empty(width: i32, height: i32) -> Self {
        let mask = Mat::zeros(height.max(0), width.max(0), CV_8UC1)
            .and_then(|m| m.to_mat())
            .unwrap_or_default();
        Self {
            points: Vec::new(),
            mask,
            areas: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of pixels set in the mask
    pub fn mask_coverage(&self) -> usize {
        if self.mask.empty() {
            return 0;
        }
        count_non_zero(&self.mask).map(|n| n as usize).unwrap_or(0)
    }

    /// Whether the mask marks pixel `(x, y)`
    pub fn is_masked(&self, x: i32, y: i32) -> bool {
        self.mask
            .at_2d::<u8>(y, x)
            .map(|value| *value > 0)
            .unwrap_or(false)
    }
}

/// Spot detector over cropped BGR regions
#[derive(Debug, Clone, Default)]
pub struct SpotDetector {
    config: SpotDetectionConfig,
}

impl SpotDetector {
    /// Create a spot detector with the given parameters
    pub fn new(config: SpotDetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpotDetectionConfig {
        &self.config
    }

    /// Detect spots, degrading to an empty set on any processing failure
    pub fn detect(&self, region: &Mat) -> SpotSet {
        match self.try_detect(region) {
            Ok(spots) => spots,
            Err(e) => {
                warn!("Spot detection failed, reporting no spots: {}", e);
                SpotSet::empty(region.cols(), region.rows())
            }
        }
    }

    /// Detect spots, surfacing the first failing stage
    ///
    /// # Arguments
    ///
    /// * `region` - Cropped BGR face region
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError` if the region is empty or an OpenCV stage fails.
    pub fn try_detect(&self, region: &Mat) -> Result<SpotSet> {
        ensure_color_image(region)?;

        // Step 1: Skin tone inclusion mask
        let skin = self.skin_mask(region)?;

        // Step 2: Smoothed luminance
        let blurred = self.smoothed_luminance(region)?;

        // Step 3: Locally darker pixels
        let dark = self.local_dark_mask(&blurred)?;

        // Step 4: Dark and on skin
        let mut candidates = Mat::default();
        bitwise_and_def(&dark, &skin, &mut candidates)
            .map_err(|e| AnalysisError::opencv("Candidate mask intersection", e))?;

        // Step 5: Morphological cleanup
        let cleaned = self.morphological_cleanup(&candidates)?;

        // Steps 6-7: Contours, area band, centroids, filled mask
        let spots = self.extract_spots(&cleaned)?;

        debug!(
            "Detected {} spot(s) in {}x{} region",
            spots.len(),
            region.cols(),
            region.rows()
        );
        Ok(spots)
    }

    /// Pixels whose HSV (and optionally YCrCb) value falls in the skin range
    ///
    /// With YCrCb refinement the intersected mask is smoothed by an
    /// elliptical close then open.
    fn skin_mask(&self, region: &Mat) -> Result<Mat> {
        let mut hsv = Mat::default();
        cvt_color_def(region, &mut hsv, COLOR_BGR2HSV)
            .map_err(|e| AnalysisError::opencv("HSV conversion", e))?;

        let mut mask = Mat::default();
        in_range(
            &hsv,
            &scalar(self.config.skin_hsv_lower),
            &scalar(self.config.skin_hsv_upper),
            &mut mask,
        )
        .map_err(|e| AnalysisError::opencv("HSV skin range", e))?;

        if !self.config.ycrcb_refinement {
            return Ok(mask);
        }

        let mut ycrcb = Mat::default();
        cvt_color_def(region, &mut ycrcb, COLOR_BGR2YCrCb)
            .map_err(|e| AnalysisError::opencv("YCrCb conversion", e))?;

        let mut ycrcb_mask = Mat::default();
        in_range(
            &ycrcb,
            &scalar(SKIN_YCRCB_LOWER),
            &scalar(SKIN_YCRCB_UPPER),
            &mut ycrcb_mask,
        )
        .map_err(|e| AnalysisError::opencv("YCrCb skin range", e))?;

        let mut combined = Mat::default();
        bitwise_and_def(&mask, &ycrcb_mask, &mut combined)
            .map_err(|e| AnalysisError::opencv("Skin mask intersection", e))?;

        // Fill pinholes then drop specks left by intersecting two color models
        let kernel = get_structuring_element_def(
            MORPH_ELLIPSE,
            Size::new(SKIN_MASK_SMOOTHING_KERNEL, SKIN_MASK_SMOOTHING_KERNEL),
        )
        .map_err(|e| AnalysisError::opencv("Skin kernel creation", e))?;

        let mut closed = Mat::default();
        morphology_ex_def(&combined, &mut closed, MORPH_CLOSE, &kernel)
            .map_err(|e| AnalysisError::opencv("Skin mask closing", e))?;

        let mut smoothed = Mat::default();
        morphology_ex_def(&closed, &mut smoothed, MORPH_OPEN, &kernel)
            .map_err(|e| AnalysisError::opencv("Skin mask opening", e))?;
        Ok(smoothed)
    }

    fn smoothed_luminance(&self, region: &Mat) -> Result<Mat> {
        let gray = to_luminance(region)?;
        let kernel = self.config.blur_kernel_size;

        let mut blurred = Mat::default();
        gaussian_blur_def(&gray, &mut blurred, Size::new(kernel, kernel), 0.0)
            .map_err(|e| AnalysisError::opencv("Gaussian blur", e))?;
        Ok(blurred)
    }

    /// 255 where a pixel is darker than its Gaussian-weighted neighborhood
    fn local_dark_mask(&self, blurred: &Mat) -> Result<Mat> {
        let mut dark = Mat::default();
        adaptive_threshold(
            blurred,
            &mut dark,
            255.0,
            ADAPTIVE_THRESH_GAUSSIAN_C,
            THRESH_BINARY_INV,
            self.config.adaptive_block_size,
            self.config.adaptive_c,
        )
        .map_err(|e| AnalysisError::opencv("Adaptive threshold", e))?;
        Ok(dark)
    }

    /// Closing merges near fragments, opening drops single-pixel noise
    fn morphological_cleanup(&self, candidates: &Mat) -> Result<Mat> {
        let size = self.config.morph_kernel_size;
        let kernel = get_structuring_element_def(MORPH_RECT, Size::new(size, size))
            .map_err(|e| AnalysisError::opencv("Kernel creation", e))?;

        let mut closed = Mat::default();
        morphology_ex_def(candidates, &mut closed, MORPH_CLOSE, &kernel)
            .map_err(|e| AnalysisError::opencv("Closing", e))?;

        let mut opened = Mat::default();
        morphology_ex_def(&closed, &mut opened, MORPH_OPEN, &kernel)
            .map_err(|e| AnalysisError::opencv("Opening", e))?;

        Ok(opened)
    }

    fn extract_spots(&self, binary: &Mat) -> Result<SpotSet> {
        let mut contours = Vector::<VectorOfPoint>::new();
        find_contours_def(binary, &mut contours, RETR_EXTERNAL, CHAIN_APPROX_SIMPLE)
            .map_err(|e| AnalysisError::opencv("Contour detection", e))?;

        let mut mask = Mat::zeros(binary.rows(), binary.cols(), CV_8UC1)
            .and_then(|m| m.to_mat())
            .map_err(|e| AnalysisError::opencv("Mask creation", e))?;

        let mut points = Vec::new();
        let mut areas = Vec::new();

        for (index, contour) in contours.iter().enumerate() {
            let area = contour_area_def(&contour)
                .map_err(|e| AnalysisError::opencv("Area calculation", e))?;

            if area <= self.config.min_spot_area || area >= self.config.max_spot_area {
                continue;
            }

            let moments = moments_def(&contour)
                .map_err(|e| AnalysisError::opencv("Moments calculation", e))?;
            if moments.m00 == 0.0 {
                continue;
            }

            let cx = (moments.m10 / moments.m00) as i32;
            let cy = (moments.m01 / moments.m00) as i32;
            points.push(Point::new(cx, cy));
            areas.push(area);

            draw_contours(
                &mut mask,
                &contours,
                index as i32,
                Scalar::all(255.0),
                FILLED,
                LINE_8,
                &Mat::default(),
                i32::MAX,
                CvPoint::new(0, 0),
            )
            .map_err(|e| AnalysisError::opencv("Contour drawing", e))?;
        }

        Ok(SpotSet {
            points,
            mask,
            areas,
        })
    }
}

fn scalar(channels: [u8; 3]) -> Scalar {
    Scalar::new(
        channels[0] as f64,
        channels[1] as f64,
        channels[2] as f64,
        0.0,
    )
}
