//! Configuration structures for the skin_scan analysis pipeline.
//!
//! This module defines all tunable parameters for the analysis,
//! organized into one group per pipeline stage.
//!
//! # Configuration Loading
//!
//! Configuration can be loaded from JSON files or constructed programmatically:
//!
//! ```no_run
//! use skin_scan::PipelineConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = PipelineConfig::from_json_file(Path::new("config.json"))?;
//!
//! // Or use defaults
//! let config = PipelineConfig::default();
//! # Ok::<(), skin_scan::AnalysisError>(())
//! ```
//!
//! Every section is optional in JSON; missing sections and fields fall back
//! to their defaults.
//!
//! # Configuration Sections
//!
//! - [`LocalizationConfig`]: cascade scan parameters
//! - [`PreprocessingConfig`]: orientation, resizing, contrast enhancement
//! - [`SpotDetectionConfig`]: blur, adaptive threshold, skin range, area band
//! - [`DensityConfig`]: heat map Gaussian width
//! - [`SeverityThresholds`]: density band boundaries

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{density, localization, severity, spots};
use crate::{AnalysisError, Result};

/// Complete pipeline configuration.
///
/// Contains all parameters needed to process an image from input to report.
/// Can be serialized to/from JSON for reproducible runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Face region localization configuration
    pub localization: LocalizationConfig,

    /// Preprocessing configuration
    pub preprocessing: PreprocessingConfig,

    /// Spot detection configuration
    pub spot_detection: SpotDetectionConfig,

    /// Density field configuration
    pub density: DensityConfig,

    /// Severity classification thresholds
    pub severity: SeverityThresholds,

    /// Analyze the regions of one image in parallel
    pub parallel_regions: bool,
}

/// Cascade detector scan parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    /// Window scale step between scans (must be > 1.0)
    pub scale_factor: f64,

    /// Overlapping detections needed to confirm a region
    pub min_neighbors: i32,

    /// Minimum window edge in pixels
    pub min_window: i32,

    /// Cascade model file; searched in standard OpenCV locations when unset
    pub cascade_path: Option<PathBuf>,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            scale_factor: localization::SCALE_FACTOR,
            min_neighbors: localization::MIN_NEIGHBORS,
            min_window: localization::MIN_WINDOW,
            cascade_path: None,
        }
    }
}

/// Preprocessing applied to a decoded image before localization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Apply EXIF orientation when loading from files or bytes
    pub exif_correction: bool,

    /// Downscale images whose longest edge exceeds this many pixels
    pub max_dimension: Option<u32>,

    /// Bilateral filter plus CLAHE on the lightness channel
    pub enhance_contrast: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            exif_correction: true,
            max_dimension: None,
            enhance_contrast: false,
        }
    }
}

/// Spot detection parameters.
///
/// Controls how locally dark, skin-toned blobs are isolated inside a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotDetectionConfig {
    /// Gaussian blur kernel size (must be odd)
    pub blur_kernel_size: i32,

    /// Adaptive threshold neighborhood (must be odd and >= 3)
    pub adaptive_block_size: i32,

    /// Constant subtracted from the weighted local mean
    pub adaptive_c: f64,

    /// Closing/opening structuring element size (must be odd)
    pub morph_kernel_size: i32,

    /// Components must have area strictly above this
    pub min_spot_area: f64,

    /// Components must have area strictly below this
    pub max_spot_area: f64,

    /// Lower HSV bound of the skin tone range
    pub skin_hsv_lower: [u8; 3],

    /// Upper HSV bound of the skin tone range
    pub skin_hsv_upper: [u8; 3],

    /// Also require pixels to fall in the YCrCb skin range
    pub ycrcb_refinement: bool,
}

impl Default for SpotDetectionConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: spots::BLUR_KERNEL_SIZE,
            adaptive_block_size: spots::ADAPTIVE_BLOCK_SIZE,
            adaptive_c: spots::ADAPTIVE_C,
            morph_kernel_size: spots::MORPH_KERNEL_SIZE,
            min_spot_area: spots::MIN_SPOT_AREA,
            max_spot_area: spots::MAX_SPOT_AREA,
            skin_hsv_lower: spots::SKIN_HSV_LOWER,
            skin_hsv_upper: spots::SKIN_HSV_UPPER,
            ycrcb_refinement: false,
        }
    }
}

/// Density field parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    /// Gaussian standard deviation in pixels
    pub sigma: f64,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            sigma: density::SIGMA,
        }
    }
}

/// Density band boundaries for the severity scale.
///
/// `density < clear_max` is Clear, `< mild_max` Mild, `< moderate_max`
/// Moderate, anything above Severe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    pub clear_max: f64,
    pub mild_max: f64,
    pub moderate_max: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            clear_max: severity::CLEAR_MAX,
            mild_max: severity::MILD_MAX,
            moderate_max: severity::MODERATE_MAX,
        }
    }
}

fn check(ok: bool, parameter: &str, value: impl ToString) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(AnalysisError::invalid_parameter(parameter, value))
    }
}

fn is_odd_positive(value: i32) -> bool {
    value > 0 && value % 2 == 1
}

impl LocalizationConfig {
    pub fn validate(&self) -> Result<()> {
        check(
            self.scale_factor > 1.0 && self.scale_factor.is_finite(),
            "localization.scale_factor",
            self.scale_factor,
        )?;
        check(
            self.min_neighbors >= 0,
            "localization.min_neighbors",
            self.min_neighbors,
        )?;
        check(self.min_window > 0, "localization.min_window", self.min_window)
    }
}

impl PreprocessingConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(max_dimension) = self.max_dimension {
            check(
                max_dimension > 0,
                "preprocessing.max_dimension",
                max_dimension,
            )?;
        }
        Ok(())
    }
}

impl SpotDetectionConfig {
    pub fn validate(&self) -> Result<()> {
        check(
            is_odd_positive(self.blur_kernel_size),
            "spot_detection.blur_kernel_size",
            self.blur_kernel_size,
        )?;
        check(
            is_odd_positive(self.adaptive_block_size) && self.adaptive_block_size >= 3,
            "spot_detection.adaptive_block_size",
            self.adaptive_block_size,
        )?;
        check(
            self.adaptive_c.is_finite(),
            "spot_detection.adaptive_c",
            self.adaptive_c,
        )?;
        check(
            is_odd_positive(self.morph_kernel_size),
            "spot_detection.morph_kernel_size",
            self.morph_kernel_size,
        )?;
        check(
            self.min_spot_area >= 0.0 && self.min_spot_area < self.max_spot_area,
            "spot_detection.spot_area",
            format!("[{}, {}]", self.min_spot_area, self.max_spot_area),
        )?;
        let ordered = (0..3).all(|i| self.skin_hsv_lower[i] <= self.skin_hsv_upper[i]);
        check(
            ordered,
            "spot_detection.skin_hsv",
            format!("{:?}..{:?}", self.skin_hsv_lower, self.skin_hsv_upper),
        )
    }
}

impl DensityConfig {
    pub fn validate(&self) -> Result<()> {
        check(
            self.sigma > 0.0 && self.sigma.is_finite(),
            "density.sigma",
            self.sigma,
        )
    }
}

impl SeverityThresholds {
    pub fn validate(&self) -> Result<()> {
        check(
            self.clear_max >= 0.0
                && self.clear_max < self.mild_max
                && self.mild_max < self.moderate_max
                && self.moderate_max.is_finite(),
            "severity",
            format!(
                "clear_max={}, mild_max={}, moderate_max={}",
                self.clear_max, self.mild_max, self.moderate_max
            ),
        )
    }
}

impl PipelineConfig {
    /// Check every section, reporting the first invalid parameter
    pub fn validate(&self) -> Result<()> {
        self.localization.validate()?;
        self.preprocessing.validate()?;
        self.spot_detection.validate()?;
        self.density.validate()?;
        self.severity.validate()
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AnalysisError::config("Invalid configuration JSON", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::config(format!("Failed to read {}", path.display()), e)
        })?;
        Self::from_json_str(&content)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AnalysisError::config("Failed to serialize configuration", e))?;
        std::fs::write(path, json).map_err(|e| AnalysisError::Io {
            message: format!("Failed to write {}", path.display()),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.localization.scale_factor, 1.1);
        assert_eq!(config.localization.min_neighbors, 5);
        assert_eq!(config.spot_detection.adaptive_block_size, 11);
        assert_eq!(config.density.sigma, 15.0);
        assert!(!config.parallel_regions);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{ "severity": { "clear_max": 1.0, "mild_max": 2.0, "moderate_max": 4.0 },
                 "spot_detection": { "adaptive_c": 3.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.severity.mild_max, 2.0);
        assert_eq!(config.spot_detection.adaptive_c, 3.5);
        assert_eq!(config.spot_detection.blur_kernel_size, 5);
        assert_eq!(config.localization, LocalizationConfig::default());
    }

    #[test]
    fn test_rejects_even_block_size() {
        let mut config = PipelineConfig::default();
        config.spot_detection.adaptive_block_size = 10;
        match config.validate() {
            Err(AnalysisError::InvalidParameter { parameter, value }) => {
                assert_eq!(parameter, "spot_detection.adaptive_block_size");
                assert_eq!(value, "10");
            }
            other => panic!("Expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let mut config = PipelineConfig::default();
        config.severity.mild_max = 0.4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_scale_and_sigma() {
        let mut config = PipelineConfig::default();
        config.localization.scale_factor = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.density.sigma = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_area_band() {
        let mut config = PipelineConfig::default();
        config.spot_detection.min_spot_area = 300.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let result = PipelineConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(AnalysisError::Config { .. })));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = PipelineConfig::default();
        config.preprocessing.max_dimension = Some(1200);
        config.localization.cascade_path = Some(PathBuf::from("/models/face.xml"));
        config.to_json_file(&path).unwrap();

        let loaded = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
