//! Density and severity scoring module
//!
//! This module turns detected spot centers into a normalized heat map and
//! a severity assessment for each face region.

pub mod density;
pub mod severity;

pub use density::{DensityField, DensitySynthesizer};
pub use severity::{SeverityAssessment, SeverityClassifier};
