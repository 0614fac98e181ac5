//! Analysis orchestration
//!
//! Composes localization, spot detection, density synthesis and severity
//! classification into one report per image. Regions are analyzed
//! independently: a failing region is logged and dropped while the others
//! complete. Only invalid input and a localization miss reach the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use opencv::{core::Mat, prelude::*};
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::detection::{CandidateDetector, CascadeDetector, RegionLocalizer, SpotDetector, SpotSet};
use crate::image_loader::{load_image, load_image_bytes};
use crate::preprocessing::{ensure_color_image, Preprocessor};
use crate::scoring::{DensityField, DensitySynthesizer, SeverityClassifier};
use crate::types::{AnalysisResult, Region, SeverityReport};
use crate::{AnalysisError, Result};

/// Everything produced for one region
///
/// `spots` and `density` are intended for rendering collaborators; the
/// report carries the numbers.
#[derive(Debug, Clone)]
pub struct RegionArtifacts {
    pub report: SeverityReport,
    pub spots: SpotSet,
    pub density: DensityField,
}

/// Report plus the per-region spot sets and density fields
#[derive(Debug, Clone)]
pub struct DetailedAnalysis {
    pub result: AnalysisResult,
    pub regions: Vec<RegionArtifacts>,
}

/// Outcome for one file of a batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub path: PathBuf,
    pub result: Result<AnalysisResult>,
}

/// End-to-end analyzer
///
/// Holds immutable stage configurations and a shared candidate detector, so
/// one instance can serve many images concurrently.
pub struct Analyzer {
    config: PipelineConfig,
    preprocessor: Preprocessor,
    localizer: RegionLocalizer,
    spot_detector: SpotDetector,
    density: DensitySynthesizer,
    severity: SeverityClassifier,
}

impl Analyzer {
    /// Build an analyzer around an injected candidate detector
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the configuration fails validation.
    pub fn new(config: PipelineConfig, detector: Arc<dyn CandidateDetector>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            preprocessor: Preprocessor::new(config.preprocessing.clone()),
            localizer: RegionLocalizer::new(detector, config.localization.clone()),
            spot_detector: SpotDetector::new(config.spot_detection.clone()),
            density: DensitySynthesizer::new(config.density.clone()),
            severity: SeverityClassifier::new(config.severity),
            config,
        })
    }

    /// Build an analyzer backed by an OpenCV cascade model
    ///
    /// Uses `localization.cascade_path`, or the stock frontal face cascade
    /// from a standard OpenCV install location.
    pub fn with_cascade(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let detector = CascadeDetector::from_config(&config.localization)?;
        Self::new(config, Arc::new(detector))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Apply the configured preprocessing to a decoded image
    pub fn prepare(&self, image: &Mat) -> Result<Mat> {
        self.preprocessor.apply(image)
    }

    /// Analyze an image, returning the serializable report
    ///
    /// # Errors
    ///
    /// `InvalidImage` for an empty or non-BGR image, `NoFaceDetected` when
    /// the localizer finds no region.
    pub fn analyze(&self, image: &Mat, source_id: &str) -> Result<AnalysisResult> {
        self.analyze_detailed(image, source_id)
            .map(|detailed| detailed.result)
    }

    /// Analyze an image, keeping spot sets and density fields
    pub fn analyze_detailed(&self, image: &Mat, source_id: &str) -> Result<DetailedAnalysis> {
        ensure_color_image(image)?;

        let regions = self.localizer.locate(image)?;
        if regions.is_empty() {
            info!("{}: no face detected", source_id);
            return Err(AnalysisError::NoFaceDetected {
                width: image.cols(),
                height: image.rows(),
            });
        }

        self.analyze_regions(image, &regions, source_id)
    }

    /// Analyze caller-chosen regions, skipping localization
    ///
    /// This is the entry point for fallback policies such as analyzing the
    /// image center after [`AnalysisError::NoFaceDetected`].
    pub fn analyze_regions(
        &self,
        image: &Mat,
        regions: &[Region],
        source_id: &str,
    ) -> Result<DetailedAnalysis> {
        ensure_color_image(image)?;

        let crops: Vec<(usize, Region, Result<Mat>)> = regions
            .iter()
            .enumerate()
            .map(|(index, region)| (index, *region, crop_region(image, *region)))
            .collect();

        let process = |(index, region, crop): (usize, Region, Result<Mat>)| {
            let outcome = crop.and_then(|crop| self.analyze_crop(index, region, &crop));
            (region, outcome)
        };

        let outcomes: Vec<(Region, Result<RegionArtifacts>)> = if self.config.parallel_regions {
            crops.into_par_iter().map(process).collect()
        } else {
            crops.into_iter().map(process).collect()
        };

        let mut artifacts = Vec::with_capacity(outcomes.len());
        for (region, outcome) in outcomes {
            match outcome {
                Ok(region_artifacts) => artifacts.push(region_artifacts),
                Err(e) => warn!("{}: dropping region {}: {}", source_id, region, e),
            }
        }

        let result = AnalysisResult {
            source_image_id: source_id.to_string(),
            region_count: regions.len(),
            reports: artifacts.iter().map(|a| a.report.clone()).collect(),
        };

        info!(
            "{}: {} region(s), {} analyzed, worst severity {}",
            source_id,
            result.region_count,
            result.reports.len(),
            result
                .worst_severity()
                .map(|label| label.to_string())
                .unwrap_or_else(|| "n/a".to_string())
        );

        Ok(DetailedAnalysis {
            result,
            regions: artifacts,
        })
    }

    /// Load, preprocess and analyze an image file
    pub fn analyze_path(&self, path: &Path) -> Result<AnalysisResult> {
        let image = load_image(path, self.config.preprocessing.exif_correction)?;
        let prepared = self.prepare(&image)?;
        self.analyze(&prepared, &path.display().to_string())
    }

    /// Decode, preprocess and analyze an encoded image held in memory
    pub fn analyze_bytes(&self, bytes: &[u8], source_id: &str) -> Result<AnalysisResult> {
        let image = load_image_bytes(bytes, self.config.preprocessing.exif_correction)?;
        let prepared = self.prepare(&image)?;
        self.analyze(&prepared, source_id)
    }

    /// Analyze many files, one per worker task
    ///
    /// Outcomes keep the input order; a failure affects only its own entry.
    pub fn analyze_batch(&self, paths: &[PathBuf]) -> Vec<BatchOutcome> {
        paths
            .par_iter()
            .map(|path| BatchOutcome {
                path: path.clone(),
                result: self.analyze_path(path),
            })
            .collect()
    }

    fn analyze_crop(&self, index: usize, region: Region, crop: &Mat) -> Result<RegionArtifacts> {
        let spots = self.spot_detector.detect(crop);

        let density = self
            .density
            .synthesize(crop.cols() as usize, crop.rows() as usize, &spots.points)
            .map_err(|e| AnalysisError::region(region, e.to_string()))?;

        let assessment = self
            .severity
            .classify(spots.len(), region.area())
            .map_err(|e| AnalysisError::region(region, e.to_string()))?;

        debug!(
            "Region {} {}: {} spot(s), density {:.2}, {}",
            index + 1,
            region,
            spots.len(),
            assessment.density,
            assessment.label
        );

        Ok(RegionArtifacts {
            report: SeverityReport {
                face_id: index + 1,
                region,
                spot_count: spots.len(),
                density_score: assessment.density,
                severity_score: assessment.score,
                severity_label: assessment.label,
            },
            spots,
            density,
        })
    }
}

/// Copy a region out of the image
fn crop_region(image: &Mat, region: Region) -> Result<Mat> {
    if !region.fits_within(image.cols(), image.rows()) {
        return Err(AnalysisError::region(
            region,
            format!("outside {}x{} image", image.cols(), image.rows()),
        ));
    }

    let view = Mat::roi(image, region.to_rect())
        .map_err(|e| AnalysisError::region(region, format!("crop failed: {}", e)))?;
    view.try_clone()
        .map_err(|e| AnalysisError::region(region, format!("crop copy failed: {}", e)))
}
