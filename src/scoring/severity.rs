//! Severity classification from spot density
//!
//! Density is the number of spots per 100x100 pixel unit of region area.
//! One four-level scale is used, with configurable band boundaries. The raw
//! density and a 0-100 score are always returned next to the label so
//! callers can apply their own banding.

use serde::{Deserialize, Serialize};

use crate::config::SeverityThresholds;
use crate::constants::severity::{MAX_SCORE, SCORE_PER_DENSITY, UNIT_AREA};
use crate::types::SeverityLabel;
use crate::{AnalysisError, Result};

/// Classification outcome for one region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityAssessment {
    /// Spots per 100x100 pixel unit
    pub density: f64,
    /// `min(density * 20, 100)`
    pub score: f64,
    pub label: SeverityLabel,
}

/// Maps spot counts to severity labels
#[derive(Debug, Clone, Copy, Default)]
pub struct SeverityClassifier {
    thresholds: SeverityThresholds,
}

impl SeverityClassifier {
    pub fn new(thresholds: SeverityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SeverityThresholds {
        &self.thresholds
    }

    /// Classify `spot_count` spots found in `region_area` pixels
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `region_area` is zero.
    pub fn classify(&self, spot_count: usize, region_area: u64) -> Result<SeverityAssessment> {
        if region_area == 0 {
            return Err(AnalysisError::invalid_parameter("region_area", 0));
        }

        let density = spot_count as f64 / (region_area as f64 / UNIT_AREA);
        Ok(SeverityAssessment {
            density,
            score: (density * SCORE_PER_DENSITY).min(MAX_SCORE),
            label: self.label_for(density),
        })
    }

    /// Band a precomputed density
    pub fn label_for(&self, density: f64) -> SeverityLabel {
        let t = &self.thresholds;
        if density < t.clear_max {
            SeverityLabel::Clear
        } else if density < t.mild_max {
            SeverityLabel::Mild
        } else if density < t.moderate_max {
            SeverityLabel::Moderate
        } else {
            SeverityLabel::Severe
        }
    }
}
