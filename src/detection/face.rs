//! Face region localization
//!
//! Converts the image to luminance and hands it to a pluggable
//! [`CandidateDetector`]. Candidates are clipped to the image bounds and
//! returned in the detector's order. A miss is an empty list; only an
//! unusable input image is an error.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};
use opencv::{
    core::{Mat, Rect, Size, Vector},
    objdetect::{CascadeClassifier, CASCADE_SCALE_IMAGE},
    prelude::*,
};

use crate::config::LocalizationConfig;
use crate::constants::localization::{CASCADE_SEARCH_DIRS, FRONTAL_FACE_CASCADE};
use crate::preprocessing::{ensure_color_image, to_luminance};
use crate::types::Region;
use crate::{AnalysisError, Result};

/// Pluggable sliding-window face detector
///
/// Implementations receive a single-channel luminance image and return
/// candidate rectangles in image coordinates. Any classifier (cascade,
/// learned model, test stub) can stand behind this trait.
pub trait CandidateDetector: Send + Sync {
    fn detect_candidates(&self, luminance: &Mat, params: &LocalizationConfig) -> Result<Vec<Rect>>;
}

/// OpenCV cascade classifier backend
///
/// The classifier is loaded once and shared read-only. OpenCV's
/// `detectMultiScale` needs mutable access, so calls are serialized.
pub struct CascadeDetector {
    classifier: Mutex<CascadeClassifier>,
    model_path: PathBuf,
}

impl CascadeDetector {
    /// Load a cascade model file
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the file is missing or OpenCV cannot parse it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| AnalysisError::invalid_parameter("cascade_path", path.display()))?;
        if !path.is_file() {
            return Err(AnalysisError::invalid_parameter("cascade_path", path.display()));
        }

        let classifier = CascadeClassifier::new(path_str)
            .map_err(|e| AnalysisError::opencv("Cascade load", e))?;
        if classifier.empty().map_err(|e| AnalysisError::opencv("Cascade check", e))? {
            return Err(AnalysisError::invalid_parameter("cascade_path", path.display()));
        }

        debug!("Loaded cascade model from {}", path.display());
        Ok(Self {
            classifier: Mutex::new(classifier),
            model_path: path.to_path_buf(),
        })
    }

    /// Load the configured cascade, or the stock frontal face cascade
    pub fn from_config(config: &LocalizationConfig) -> Result<Self> {
        match &config.cascade_path {
            Some(path) => Self::from_file(path),
            None => {
                let path = find_default_cascade().ok_or_else(|| {
                    AnalysisError::invalid_parameter(
                        "cascade_path",
                        format!("{} not found in standard locations", FRONTAL_FACE_CASCADE),
                    )
                })?;
                Self::from_file(&path)
            }
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl CandidateDetector for CascadeDetector {
    fn detect_candidates(&self, luminance: &Mat, params: &LocalizationConfig) -> Result<Vec<Rect>> {
        let mut objects = Vector::<Rect>::new();
        // detectMultiScale keeps no state between calls, so a poisoned lock is reused
        let mut classifier = self
            .classifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        classifier
            .detect_multi_scale(
                luminance,
                &mut objects,
                params.scale_factor,
                params.min_neighbors,
                CASCADE_SCALE_IMAGE,
                Size::new(params.min_window, params.min_window),
                Size::default(),
            )
            .map_err(|e| AnalysisError::opencv("Cascade detectMultiScale", e))?;

        Ok(objects.to_vec())
    }
}

/// Look for the stock frontal face cascade in common install locations
///
/// `OPENCV_CASCADE_DIR` is checked first when set.
pub fn find_default_cascade() -> Option<PathBuf> {
    let env_dir = std::env::var_os("OPENCV_CASCADE_DIR").map(PathBuf::from);
    env_dir
        .into_iter()
        .chain(CASCADE_SEARCH_DIRS.iter().map(PathBuf::from))
        .map(|dir| dir.join(FRONTAL_FACE_CASCADE))
        .find(|candidate| candidate.is_file())
}

/// Locates candidate face regions in a full image
#[derive(Clone)]
pub struct RegionLocalizer {
    detector: Arc<dyn CandidateDetector>,
    config: LocalizationConfig,
}

impl RegionLocalizer {
    pub fn new(detector: Arc<dyn CandidateDetector>, config: LocalizationConfig) -> Self {
        Self { detector, config }
    }

    /// Find candidate face regions
    ///
    /// Regions are returned in detector order and lie fully inside the image.
    ///
    /// # Errors
    ///
    /// Returns `InvalidImage` for an empty or non-BGR image. Images smaller
    /// than the minimum window and detector failures yield an empty list.
    pub fn locate(&self, image: &Mat) -> Result<Vec<Region>> {
        ensure_color_image(image)?;

        let (width, height) = (image.cols(), image.rows());
        if width < self.config.min_window || height < self.config.min_window {
            debug!(
                "Image {}x{} below minimum window {}, skipping localization",
                width, height, self.config.min_window
            );
            return Ok(Vec::new());
        }

        let luminance = to_luminance(image)?;
        let candidates = match self.detector.detect_candidates(&luminance, &self.config) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Candidate detector failed, treating as no detection: {}", e);
                return Ok(Vec::new());
            }
        };

        let regions: Vec<Region> = candidates
            .into_iter()
            .filter_map(|rect| Region::clamped(rect, width, height))
            .collect();

        debug!("Localized {} candidate region(s)", regions.len());
        Ok(regions)
    }
}
