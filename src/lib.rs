//! # Skin Scan
//!
//! A Rust crate for locating faces in photographs and grading visible
//! blemishes on each one.
//!
//! For every face region the pipeline:
//! - Detects small dark skin spots with a skin-gated adaptive threshold
//! - Synthesizes a normalized density field (heat map) over the spots
//! - Classifies severity from spot count per unit area
//!
//! ## Example
//!
//! ```rust,no_run
//! use skin_scan::{analyze_image, PipelineConfig};
//! use std::path::Path;
//!
//! let result = analyze_image(Path::new("portrait.jpg"), PipelineConfig::default())?;
//! for face in &result.reports {
//!     println!("Face {}: {} spots, {}", face.face_id, face.spot_count, face.severity_label);
//! }
//! # Ok::<(), skin_scan::AnalysisError>(())
//! ```
//!
//! Any face detector can be plugged in through [`CandidateDetector`]:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use opencv::core::{Mat, Rect};
//! use skin_scan::{Analyzer, CandidateDetector, LocalizationConfig, PipelineConfig};
//!
//! struct WholeImage;
//!
//! impl CandidateDetector for WholeImage {
//!     fn detect_candidates(&self, luminance: &Mat, _: &LocalizationConfig) -> skin_scan::Result<Vec<Rect>> {
//!         use opencv::prelude::*;
//!         Ok(vec![Rect::new(0, 0, luminance.cols(), luminance.rows())])
//!     }
//! }
//!
//! let analyzer = Analyzer::new(PipelineConfig::default(), Arc::new(WholeImage))?;
//! # Ok::<(), skin_scan::AnalysisError>(())
//! ```

use std::path::Path;

pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod image_loader;
pub mod pipeline;
pub mod preprocessing;
pub mod scoring;
pub mod types;

pub use config::{
    DensityConfig, LocalizationConfig, PipelineConfig, PreprocessingConfig, SeverityThresholds,
    SpotDetectionConfig,
};
pub use detection::{CandidateDetector, CascadeDetector, RegionLocalizer, SpotDetector, SpotSet};
pub use error::{AnalysisError, Result};
pub use image_loader::{load_image, load_image_bytes};
pub use pipeline::{Analyzer, BatchOutcome, DetailedAnalysis, RegionArtifacts};
pub use scoring::{DensityField, DensitySynthesizer, SeverityAssessment, SeverityClassifier};
pub use types::{AnalysisResult, Point, Region, SeverityLabel, SeverityReport};

/// Analyze a portrait image file with the cascade face detector
///
/// Convenience wrapper that builds an [`Analyzer`] for a single call. Build
/// one analyzer and reuse it when processing many images.
///
/// # Errors
///
/// Returns `AnalysisError` if:
/// - The configuration is invalid or no cascade model can be loaded
/// - The image cannot be loaded or has an unsupported format
/// - No face is detected
pub fn analyze_image(image_path: &Path, config: PipelineConfig) -> Result<AnalysisResult> {
    Analyzer::with_cascade(config)?.analyze_path(image_path)
}
