//! Integration tests for the complete analysis pipeline
//!
//! These tests drive the public API end to end:
//! - Region localization through an injected detector
//! - Spot detection, density synthesis and severity grading per region
//! - Per-region fault isolation and the no-face outcome
//! - JSON report shape, file and batch entry points
//!
//! Fixtures are drawn on uniform skin-tone canvases. Tests that need the
//! OpenCV cascade model return early when it is not installed.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use opencv::{
    core::{Mat, Point as CvPoint, Rect, Scalar, CV_8UC3},
    imgproc::{circle, FILLED, LINE_8},
    prelude::*,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use skin_scan::detection::face::find_default_cascade;
use skin_scan::{
    AnalysisError, Analyzer, CandidateDetector, CascadeDetector, LocalizationConfig,
    PipelineConfig, Region, RegionLocalizer, SeverityLabel,
};

const SKIN_BGR: (f64, f64, f64) = (180.0, 200.0, 220.0);
const SPOT_BGR: (f64, f64, f64) = (60.0, 80.0, 120.0);

/// Face placement used by the synthetic portraits
const FACE: (i32, i32, i32) = (50, 50, 300);

struct FixedDetector(Vec<Rect>);

impl CandidateDetector for FixedDetector {
    fn detect_candidates(&self, _: &Mat, _: &LocalizationConfig) -> skin_scan::Result<Vec<Rect>> {
        Ok(self.0.clone())
    }
}

/// Treats the whole image as one face
struct WholeImageDetector;

impl CandidateDetector for WholeImageDetector {
    fn detect_candidates(&self, luminance: &Mat, _: &LocalizationConfig) -> skin_scan::Result<Vec<Rect>> {
        Ok(vec![Rect::new(0, 0, luminance.cols(), luminance.rows())])
    }
}

fn face_rect() -> Rect {
    let (x, y, size) = FACE;
    Rect::new(x, y, size, size)
}

fn analyzer_with(detector: impl CandidateDetector + 'static) -> Analyzer {
    Analyzer::new(PipelineConfig::default(), Arc::new(detector)).unwrap()
}

fn skin_canvas(width: i32, height: i32) -> Mat {
    let (b, g, r) = SKIN_BGR;
    Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::new(b, g, r, 0.0)).unwrap()
}

fn paint_spot(image: &mut Mat, x: i32, y: i32, radius: i32) {
    let (b, g, r) = SPOT_BGR;
    circle(
        image,
        CvPoint::new(x, y),
        radius,
        Scalar::new(b, g, r, 0.0),
        FILLED,
        LINE_8,
        0,
    )
    .unwrap();
}

/// Region-local centers of the 5x4 spot grid
fn grid_centers() -> Vec<(i32, i32)> {
    let mut centers = Vec::new();
    for i in 0..5 {
        for j in 0..4 {
            centers.push((30 + 60 * i, 37 + 75 * j));
        }
    }
    centers
}

/// 400x400 portrait with 20 spots of radius 3 to 7 inside the face square
fn spotted_portrait() -> Mat {
    let (fx, fy, _) = FACE;
    let mut image = skin_canvas(400, 400);
    for (k, (cx, cy)) in grid_centers().into_iter().enumerate() {
        paint_spot(&mut image, fx + cx, fy + cy, 3 + (k as i32 % 5));
    }
    image
}

fn mat_to_rgb_image(mat: &Mat) -> image::RgbImage {
    let bytes = mat.data_bytes().unwrap();
    let rgb: Vec<u8> = bytes
        .chunks_exact(3)
        .flat_map(|bgr| [bgr[2], bgr[1], bgr[0]])
        .collect();
    image::RgbImage::from_raw(mat.cols() as u32, mat.rows() as u32, rgb).unwrap()
}

fn save_png(mat: &Mat, path: &Path) {
    mat_to_rgb_image(mat).save(path).unwrap();
}

// ============================================================================
// End-to-end analysis
// ============================================================================

#[test]
fn test_spotted_face_is_graded() {
    let analyzer = analyzer_with(FixedDetector(vec![face_rect()]));
    let result = analyzer.analyze(&spotted_portrait(), "portrait").unwrap();

    assert_eq!(result.source_image_id, "portrait");
    assert_eq!(result.region_count, 1);
    assert_eq!(result.reports.len(), 1);

    let report = &result.reports[0];
    assert_eq!(report.face_id, 1);
    assert_eq!(report.region, Region::new(50, 350, 350, 50).unwrap());
    assert!(
        (15..=20).contains(&report.spot_count),
        "Expected 15-20 spots, found {}",
        report.spot_count
    );
    // 15 to 20 spots over 9 units of 100x100 pixels
    assert!(report.density_score > 1.5 && report.density_score < 3.0);
    assert_eq!(report.severity_label, SeverityLabel::Moderate);
    assert!((report.severity_score - report.density_score * 20.0).abs() < 1e-9);
}

#[test]
fn test_detected_spots_sit_on_painted_spots() {
    let analyzer = analyzer_with(FixedDetector(vec![face_rect()]));
    let detailed = analyzer
        .analyze_detailed(&spotted_portrait(), "portrait")
        .unwrap();
    let artifacts = &detailed.regions[0];

    assert!(!artifacts.spots.is_empty());
    for point in &artifacts.spots.points {
        let nearest = grid_centers()
            .into_iter()
            .map(|(cx, cy)| (cx - point.x).abs().max((cy - point.y).abs()))
            .min()
            .unwrap();
        assert!(nearest <= 2, "Spot at {:?} is not on a painted spot", point);
        assert!(artifacts.spots.is_masked(point.x, point.y));
    }

    assert_eq!(artifacts.density.width(), 300);
    assert_eq!(artifacts.density.height(), 300);
    assert_eq!(artifacts.density.max_value(), 1.0);
    for point in &artifacts.spots.points {
        let value = artifacts
            .density
            .get(point.x as usize, point.y as usize)
            .unwrap();
        assert!(value > 0.5, "Density {} too low at spot {:?}", value, point);
    }
}

#[test]
fn test_clear_skin_reports_no_spots() {
    let analyzer = analyzer_with(FixedDetector(vec![face_rect()]));
    let detailed = analyzer
        .analyze_detailed(&skin_canvas(400, 400), "clear")
        .unwrap();

    let report = &detailed.result.reports[0];
    assert_eq!(report.spot_count, 0);
    assert_eq!(report.density_score, 0.0);
    assert_eq!(report.severity_label, SeverityLabel::Clear);
    assert!(detailed.regions[0].density.is_zero());
    assert_eq!(detailed.regions[0].spots.mask_coverage(), 0);
}

#[test]
fn test_multiple_faces_are_independent() {
    let analyzer = analyzer_with(FixedDetector(vec![
        face_rect(),
        Rect::new(0, 0, 40, 40),
    ]));
    let result = analyzer.analyze(&spotted_portrait(), "portrait").unwrap();

    assert_eq!(result.reports.len(), 2);
    assert_eq!(result.reports[0].severity_label, SeverityLabel::Moderate);
    assert_eq!(result.reports[1].face_id, 2);
    assert_eq!(result.reports[1].spot_count, 0);
    assert_eq!(result.worst_severity(), Some(SeverityLabel::Moderate));
}

#[test]
fn test_noisy_skin_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut image = skin_canvas(200, 200);
    {
        let bytes = image.data_bytes_mut().unwrap();
        for value in bytes.iter_mut() {
            let jitter: i16 = rng.random_range(-3..=3);
            *value = (*value as i16 + jitter).clamp(0, 255) as u8;
        }
    }

    let analyzer = analyzer_with(WholeImageDetector);
    let first = analyzer.analyze_detailed(&image, "noise").unwrap();
    let second = analyzer.analyze_detailed(&image, "noise").unwrap();

    assert_eq!(first.result, second.result);
    assert_eq!(first.regions[0].density, second.regions[0].density);
    let max = first.regions[0].density.max_value();
    assert!(max == 0.0 || max == 1.0);
}

// ============================================================================
// Error handling and fault isolation
// ============================================================================

#[test]
fn test_no_face_detected() {
    let analyzer = analyzer_with(FixedDetector(vec![]));
    match analyzer.analyze(&spotted_portrait(), "portrait") {
        Err(e @ AnalysisError::NoFaceDetected { .. }) => {
            assert!(e.is_recoverable());
            assert!(matches!(e, AnalysisError::NoFaceDetected { width: 400, height: 400 }));
        }
        other => panic!("Expected NoFaceDetected, got {:?}", other),
    }
}

#[test]
fn test_center_fallback_after_no_face() {
    let analyzer = analyzer_with(FixedDetector(vec![]));
    let image = spotted_portrait();

    let (width, height) = match analyzer.analyze(&image, "portrait") {
        Err(AnalysisError::NoFaceDetected { width, height }) => (width, height),
        other => panic!("Expected NoFaceDetected, got {:?}", other),
    };
    let center = Region::centered(width, height, 0.75).unwrap();
    let detailed = analyzer
        .analyze_regions(&image, &[center], "portrait")
        .unwrap();

    assert_eq!(detailed.result.region_count, 1);
    assert_eq!(detailed.result.reports[0].region, center);
    assert!(detailed.result.reports[0].spot_count > 0);
}

#[test]
fn test_failing_region_does_not_abort_others() {
    let analyzer = analyzer_with(FixedDetector(vec![]));
    let face = Region::from_rect(face_rect()).unwrap();
    let outside = Region::new(380, 900, 900, 380).unwrap();

    let detailed = analyzer
        .analyze_regions(&spotted_portrait(), &[outside, face], "portrait")
        .unwrap();

    assert_eq!(detailed.result.region_count, 2);
    assert_eq!(detailed.result.reports.len(), 1);
    assert_eq!(detailed.result.reports[0].face_id, 2);
    assert_eq!(detailed.result.reports[0].region, face);
}

#[test]
fn test_invalid_inputs() {
    let analyzer = analyzer_with(WholeImageDetector);

    assert!(matches!(
        analyzer.analyze(&Mat::default(), "empty"),
        Err(AnalysisError::InvalidImage { .. })
    ));
    assert!(matches!(
        analyzer.analyze_path(Path::new("nonexistent_file.jpg")),
        Err(AnalysisError::InvalidImage { .. })
    ));
    assert!(matches!(
        analyzer.analyze_path(Path::new("notes.txt")),
        Err(AnalysisError::InvalidImage { .. })
    ));
    assert!(matches!(
        analyzer.analyze_bytes(b"not an image", "garbage"),
        Err(AnalysisError::InvalidImage { .. })
    ));
}

// ============================================================================
// Report format
// ============================================================================

#[test]
fn test_json_report_shape() {
    let analyzer = analyzer_with(FixedDetector(vec![face_rect()]));
    let result = analyzer.analyze(&spotted_portrait(), "photos/portrait.jpg").unwrap();
    let json: serde_json::Value = serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();

    assert_eq!(json["image_path"], "photos/portrait.jpg");
    assert_eq!(json["faces_detected"], 1);

    let face = &json["face_analyses"][0];
    assert_eq!(face["face_id"], 1);
    assert_eq!(face["bounding_box"], serde_json::json!([50, 350, 350, 50]));
    assert_eq!(face["acne_count"], result.reports[0].spot_count);
    assert_eq!(face["severity"], "Moderate");

    let density = face["acne_density"].as_f64().unwrap();
    assert_eq!(density, (density * 100.0).round() / 100.0);
    assert!((density - result.reports[0].density_score).abs() <= 0.005);
}

#[test]
fn test_report_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");

    let analyzer = analyzer_with(FixedDetector(vec![face_rect()]));
    let result = analyzer.analyze(&spotted_portrait(), "portrait").unwrap();
    result.write_json(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(json["face_analyses"].as_array().unwrap().len(), 1);
}

// ============================================================================
// File, bytes and batch entry points
// ============================================================================

#[test]
fn test_analyze_path_and_bytes_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portrait.png");
    let portrait = spotted_portrait();
    save_png(&portrait, &path);

    let mut encoded = Vec::new();
    mat_to_rgb_image(&portrait)
        .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)
        .unwrap();

    let analyzer = analyzer_with(FixedDetector(vec![face_rect()]));
    let from_path = analyzer.analyze_path(&path).unwrap();
    let from_bytes = analyzer.analyze_bytes(&encoded, &path.display().to_string()).unwrap();

    assert_eq!(from_path, from_bytes);
    assert_eq!(from_path.source_image_id, path.display().to_string());
    assert_eq!(from_path.reports[0].severity_label, SeverityLabel::Moderate);
}

#[test]
fn test_batch_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.png");
    let clear = dir.path().join("clear.png");
    save_png(&spotted_portrait(), &good);
    save_png(&skin_canvas(400, 400), &clear);
    let missing = dir.path().join("missing.png");

    let paths: Vec<PathBuf> = vec![good.clone(), missing.clone(), clear.clone()];
    let analyzer = analyzer_with(FixedDetector(vec![face_rect()]));
    let outcomes = analyzer.analyze_batch(&paths);

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].path, good);
    assert_eq!(outcomes[1].path, missing);
    assert_eq!(outcomes[2].path, clear);

    let good_result = outcomes[0].result.as_ref().unwrap();
    assert_eq!(good_result.reports[0].severity_label, SeverityLabel::Moderate);
    assert!(matches!(outcomes[1].result, Err(AnalysisError::InvalidImage { .. })));
    let clear_result = outcomes[2].result.as_ref().unwrap();
    assert_eq!(clear_result.reports[0].severity_label, SeverityLabel::Clear);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_thresholds_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{ "severity": { "clear_max": 5.0, "mild_max": 6.0, "moderate_max": 7.0 } }"#,
    )
    .unwrap();

    let config = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(config.density, PipelineConfig::default().density);

    let analyzer = Analyzer::new(config, Arc::new(FixedDetector(vec![face_rect()]))).unwrap();
    let result = analyzer.analyze(&spotted_portrait(), "portrait").unwrap();
    assert_eq!(result.reports[0].severity_label, SeverityLabel::Clear);
}

#[test]
fn test_parallel_regions_match_sequential() {
    let rects = vec![face_rect(), Rect::new(0, 0, 200, 200), Rect::new(200, 200, 200, 200)];
    let sequential = analyzer_with(FixedDetector(rects.clone()))
        .analyze(&spotted_portrait(), "portrait")
        .unwrap();

    let config = PipelineConfig {
        parallel_regions: true,
        ..PipelineConfig::default()
    };
    let parallel = Analyzer::new(config, Arc::new(FixedDetector(rects)))
        .unwrap()
        .analyze(&spotted_portrait(), "portrait")
        .unwrap();

    assert_eq!(sequential, parallel);
}

// ============================================================================
// Cascade backend (skipped when no cascade model is installed)
// ============================================================================

#[test]
fn test_cascade_finds_no_face_on_blank_skin() {
    if find_default_cascade().is_none() {
        eprintln!("Skipping: no frontal face cascade installed");
        return;
    }

    let analyzer = Analyzer::with_cascade(PipelineConfig::default()).unwrap();
    let result = analyzer.analyze(&skin_canvas(320, 240), "blank");
    assert!(matches!(result, Err(AnalysisError::NoFaceDetected { .. })));
}

#[test]
fn test_cascade_finds_no_face_in_noise() {
    if find_default_cascade().is_none() {
        eprintln!("Skipping: no frontal face cascade installed");
        return;
    }

    let mut rng = StdRng::seed_from_u64(42);
    let mut image = Mat::new_rows_cols_with_default(240, 320, CV_8UC3, Scalar::all(0.0)).unwrap();
    rng.fill(image.data_bytes_mut().unwrap());

    let config = PipelineConfig::default();
    let detector = CascadeDetector::from_config(&config.localization).unwrap();
    let localizer = RegionLocalizer::new(Arc::new(detector), config.localization.clone());
    assert!(localizer.locate(&image).unwrap().is_empty());

    let analyzer = Analyzer::with_cascade(config).unwrap();
    assert!(matches!(
        analyzer.analyze(&image, "noise"),
        Err(AnalysisError::NoFaceDetected { width: 320, height: 240 })
    ));
}
