//! Value types shared across the pipeline stages
//!
//! Regions are stored in `(top, right, bottom, left)` order, matching the
//! `bounding_box` field of the JSON report.

use std::fmt;
use std::path::Path;

use opencv::core::Rect;
use serde::{Deserialize, Serialize, Serializer};

use crate::{AnalysisError, Result};

/// Axis-aligned rectangle hypothesized to contain a face
///
/// Invariant: `0 <= top < bottom` and `0 <= left < right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "[i32; 4]", try_from = "[i32; 4]")]
pub struct Region {
    top: i32,
    right: i32,
    bottom: i32,
    left: i32,
}

impl Region {
    /// Build a region, rejecting inverted or negative coordinates
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Result<Self> {
        if top < 0 || left < 0 || top >= bottom || left >= right {
            return Err(AnalysisError::invalid_parameter(
                "region",
                format!("({}, {}, {}, {})", top, right, bottom, left),
            ));
        }
        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }

    /// Convert an OpenCV `(x, y, w, h)` rectangle
    pub fn from_rect(rect: Rect) -> Result<Self> {
        Self::new(rect.y, rect.x + rect.width, rect.y + rect.height, rect.x)
    }

    /// Intersect `rect` with a `width`x`height` image, `None` if nothing remains
    pub fn clamped(rect: Rect, width: i32, height: i32) -> Option<Self> {
        let left = rect.x.max(0);
        let top = rect.y.max(0);
        let right = (rect.x + rect.width).min(width);
        let bottom = (rect.y + rect.height).min(height);
        Self::new(top, right, bottom, left).ok()
    }

    /// Centered region covering `fraction` of each image dimension
    ///
    /// Callers use this as a fallback after [`AnalysisError::NoFaceDetected`].
    pub fn centered(width: i32, height: i32, fraction: f64) -> Result<Self> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(AnalysisError::invalid_parameter("fraction", fraction));
        }
        let region_w = ((width as f64 * fraction).round() as i32).max(1);
        let region_h = ((height as f64 * fraction).round() as i32).max(1);
        let left = (width - region_w) / 2;
        let top = (height - region_h) / 2;
        Self::new(top, left + region_w, top + region_h, left)
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn right(&self) -> i32 {
        self.right
    }

    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Pixel area of the region
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// OpenCV rectangle for cropping
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width(), self.height())
    }

    /// Whether the region lies fully inside a `width`x`height` image
    pub fn fits_within(&self, width: i32, height: i32) -> bool {
        self.right <= width && self.bottom <= height
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[top={}, right={}, bottom={}, left={}]",
            self.top, self.right, self.bottom, self.left
        )
    }
}

impl From<Region> for [i32; 4] {
    fn from(region: Region) -> Self {
        [region.top, region.right, region.bottom, region.left]
    }
}

impl TryFrom<[i32; 4]> for Region {
    type Error = AnalysisError;

    fn try_from(value: [i32; 4]) -> Result<Self> {
        Region::new(value[0], value[1], value[2], value[3])
    }
}

/// Pixel coordinate local to a region's cropped frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Ordered severity scale, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityLabel {
    Clear,
    Mild,
    Moderate,
    Severe,
}

impl SeverityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLabel::Clear => "Clear",
            SeverityLabel::Mild => "Mild",
            SeverityLabel::Moderate => "Moderate",
            SeverityLabel::Severe => "Severe",
        }
    }
}

impl fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn round_2<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 100.0).round() / 100.0)
}

fn round_1<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 10.0).round() / 10.0)
}

/// Per-region outcome of the analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityReport {
    /// 1-based index of the region in localizer order
    pub face_id: usize,
    #[serde(rename = "bounding_box")]
    pub region: Region,
    #[serde(rename = "acne_count")]
    pub spot_count: usize,
    /// Spots per 100x100 pixel unit
    #[serde(rename = "acne_density", serialize_with = "round_2")]
    pub density_score: f64,
    /// `min(density * 20, 100)`
    #[serde(serialize_with = "round_1")]
    pub severity_score: f64,
    #[serde(rename = "severity")]
    pub severity_label: SeverityLabel,
}

/// Complete result for one input image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "image_path")]
    pub source_image_id: String,
    /// Number of regions the localizer returned, including dropped ones
    #[serde(rename = "faces_detected")]
    pub region_count: usize,
    #[serde(rename = "face_analyses")]
    pub reports: Vec<SeverityReport>,
}

impl AnalysisResult {
    /// Pretty-printed JSON report
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AnalysisError::config("Failed to serialize analysis result", e))
    }

    /// Write the JSON report to disk
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json).map_err(|e| AnalysisError::Io {
            message: format!("Failed to write report to {}", path.display()),
            source: e,
        })
    }

    /// Highest severity across all regions
    pub fn worst_severity(&self) -> Option<SeverityLabel> {
        self.reports.iter().map(|r| r.severity_label).max()
    }
}
