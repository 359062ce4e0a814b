use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;

use needle_audit::annotate::annotate_detections;
use needle_audit::detect::{Detector, StrokeDetector, StrokeDetectorConfig, detect_strokes};
use needle_audit::reconcile::{AlertState, filter_detections, reconcile_detections};

const SKIN: Rgb<u8> = Rgb([230, 200, 180]);
const INK: Rgb<u8> = Rgb([25, 25, 30]);

/// Skin-toned scene with `strokes` thin vertical needle marks and,
/// optionally, one round blob (a mole-like distractor).
fn synthetic_scene(strokes: usize, with_blob: bool) -> DynamicImage {
    let mut img = RgbImage::from_pixel(320, 240, SKIN);

    for i in 0..strokes {
        let x = 30 + (i as i32) * 60;
        draw_filled_rect_mut(&mut img, Rect::at(x, 40).of_size(3, 40), INK);
    }

    if with_blob {
        draw_filled_circle_mut(&mut img, (160, 180), 8, INK);
    }

    DynamicImage::ImageRgb8(img)
}

#[test]
fn finds_each_stroke_once() {
    let scene = synthetic_scene(4, false);
    let dets = detect_strokes(&scene, &StrokeDetectorConfig::default()).expect("detect failed");
    assert_eq!(dets.len(), 4, "one detection per stroke");
    for d in &dets {
        assert!((0.0..=1.0).contains(&d.confidence));
        assert!(d.confidence > 0.25, "strokes must pass the default cut");
        let bbox = d.bbox.expect("stroke detections carry a region");
        assert!(bbox.width() >= 3.0 && bbox.height() >= 40.0);
        assert_eq!(d.label.as_deref(), Some("needle"));
    }
}

#[test]
fn detections_come_in_left_to_right_order() {
    let scene = synthetic_scene(4, false);
    let dets = detect_strokes(&scene, &StrokeDetectorConfig::default()).expect("detect failed");
    let xs: Vec<f32> = dets.iter().map(|d| d.bbox.expect("region").x_min).collect();
    let mut sorted = xs.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite coordinates"));
    assert_eq!(xs, sorted);
}

#[test]
fn round_blob_scores_below_default_threshold() {
    let scene = synthetic_scene(3, true);
    let dets = detect_strokes(&scene, &StrokeDetectorConfig::default()).expect("detect failed");
    assert_eq!(dets.len(), 4, "three strokes plus the blob");

    let kept = filter_detections(&dets, 0.25).expect("valid threshold");
    assert_eq!(kept.len(), 3, "the blob must not survive the filter");
}

#[test]
fn blank_scene_yields_no_detections() {
    let scene = synthetic_scene(0, false);
    let dets = detect_strokes(&scene, &StrokeDetectorConfig::default()).expect("detect failed");
    assert!(dets.is_empty(), "got {} detections", dets.len());
}

#[test]
fn detector_trait_matches_free_function() {
    let scene = synthetic_scene(2, false);
    let detector = StrokeDetector::new(StrokeDetectorConfig::default());
    let via_trait = detector.detect(&scene).expect("detect failed");
    let direct = detect_strokes(&scene, detector.config()).expect("detect failed");
    assert_eq!(via_trait, direct);
    assert_eq!(detector.name(), "stroke");
}

#[test]
fn scan_pipeline_reconciles_against_expected() {
    let scene = synthetic_scene(4, true);
    let detector = StrokeDetector::new(StrokeDetectorConfig::default());
    let dets = detector.detect(&scene).expect("detect failed");

    let (kept, result) = reconcile_detections(4, &dets, 0.25).expect("valid inputs");
    assert_eq!(result.state, AlertState::Matched, "{}", result.message);
    assert_eq!(result.observed_count, 4);

    let annotated = annotate_detections(&scene, &kept);
    assert_eq!(annotated.dimensions(), (320, 240));
}

#[test]
fn missing_stroke_reports_deficient() {
    let scene = synthetic_scene(3, false);
    let detector = StrokeDetector::new(StrokeDetectorConfig::default());
    let dets = detector.detect(&scene).expect("detect failed");

    let (_, result) = reconcile_detections(4, &dets, 0.25).expect("valid inputs");
    assert_eq!(result.state, AlertState::Deficient);
    assert_eq!(result.delta, 1);
}
