//! Face region and blemish spot detection module
//!
//! This module handles the computer vision tasks: locating candidate face
//! regions in a full image and detecting blemish spots inside each region.

pub mod face;
pub mod spots;

pub use face::{CandidateDetector, CascadeDetector, RegionLocalizer};
pub use spots::{SpotDetector, SpotSet};
