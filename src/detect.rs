//! Finds needle-like strokes in a treatment site photo.
//!
//! Needles photograph as thin, elongated dark marks against skin. The
//! built-in detector binarizes the image with an Otsu threshold, gathers
//! connected components, and scores each component's elongation: long thin
//! strokes score near 1.0, round blobs (moxa marks, moles, shadows) score
//! near 0.0 and fall below the default confidence cut.

use image::DynamicImage;
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use serde::Serialize;
use std::collections::VecDeque;

const MIN_COMPONENT_PIXELS: usize = 24;
const MAX_COMPONENT_PIXELS: usize = 6000;
const NEEDLE_ELONGATION: f32 = 6.0;
const NEEDLE_LABEL: &str = "needle";

/// Configuration parameters for stroke detection.
///
/// Controls the component size band and the elongation ratio at which a
/// component earns full confidence.
#[derive(Debug, Clone)]
pub struct StrokeDetectorConfig {
    pub min_component_pixels: usize,
    pub max_component_pixels: usize,
    pub needle_elongation: f32,
}

impl Default for StrokeDetectorConfig {
    fn default() -> Self {
        Self {
            min_component_pixels: MIN_COMPONENT_PIXELS,
            max_component_pixels: MAX_COMPONENT_PIXELS,
            needle_elongation: NEEDLE_ELONGATION,
        }
    }
}

/// Axis-aligned pixel bounds of a detection. `x_max`/`y_max` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }
}

/// One recognized object instance in an image.
///
/// Immutable, scoped to a single detection call. `confidence` lies in
/// `[0, 1]`; the region and label are optional because external detectors
/// may supply counts only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub confidence: f32,
    pub bbox: Option<BoundingBox>,
    pub label: Option<String>,
}

/// Errors that can occur while running a detector over an image.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("empty image ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// A detection model collaborator. Construct once at startup and inject into
/// the presentation layer; the reconciliation engine never owns one.
pub trait Detector {
    fn name(&self) -> &'static str;
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectError>;
}

/// Built-in elongated-stroke detector.
#[derive(Debug, Clone, Default)]
pub struct StrokeDetector {
    config: StrokeDetectorConfig,
}

impl StrokeDetector {
    pub fn new(config: StrokeDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrokeDetectorConfig {
        &self.config
    }
}

impl Detector for StrokeDetector {
    fn name(&self) -> &'static str {
        "stroke"
    }

    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectError> {
        detect_strokes(image, &self.config)
    }
}

/// Detects needle-like strokes and returns them in row-major order of their
/// first pixel, which makes repeated runs over the same image deterministic.
pub fn detect_strokes(
    source: &DynamicImage,
    config: &StrokeDetectorConfig,
) -> Result<Vec<Detection>, DetectError> {
    let gray = source.to_luma8();
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectError::EmptyImage { width, height });
    }

    let level = otsu_level(&gray);
    // Needles are darker than skin: inverted threshold makes them foreground.
    let binary = threshold(&gray, level, ThresholdType::BinaryInverted);

    let mut mask = binary.into_raw();
    ensure_foreground_minority(&mut mask);

    Ok(extract_strokes(
        &mask,
        width as usize,
        height as usize,
        config,
    ))
}

// Strokes cover a small fraction of the frame. If the majority of pixels came
// out as foreground the polarity guess was wrong, so flip it.
fn ensure_foreground_minority(mask: &mut [u8]) {
    let foreground = mask.iter().filter(|&&px| px != 0).count();
    if foreground * 2 < mask.len() {
        return;
    }
    for px in mask.iter_mut() {
        *px = if *px == 0 { 255 } else { 0 };
    }
}

fn extract_strokes(
    mask: &[u8],
    width: usize,
    height: usize,
    config: &StrokeDetectorConfig,
) -> Vec<Detection> {
    let mut visited = vec![false; mask.len()];
    let mut out = Vec::new();

    for start in 0..mask.len() {
        if mask[start] == 0 || visited[start] {
            continue;
        }

        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited[start] = true;

        let mut min_x = width;
        let mut min_y = height;
        let mut max_x = 0usize;
        let mut max_y = 0usize;
        let mut sum_x = 0f64;
        let mut sum_y = 0f64;
        let mut pixels: Vec<(usize, usize)> = Vec::new();

        while let Some(idx) = queue.pop_front() {
            let y = idx / width;
            let x = idx % width;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            sum_x += x as f64;
            sum_y += y as f64;
            pixels.push((x, y));

            for (dx, dy) in [(-1isize, 0isize), (1, 0), (0, -1), (0, 1)] {
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                if nx < 0 || ny < 0 {
                    continue;
                }
                let (nxu, nyu) = (nx as usize, ny as usize);
                if nxu >= width || nyu >= height {
                    continue;
                }
                let next_idx = nyu * width + nxu;
                if mask[next_idx] == 0 || visited[next_idx] {
                    continue;
                }
                visited[next_idx] = true;
                queue.push_back(next_idx);
            }
        }

        let count = pixels.len();
        if !(config.min_component_pixels..=config.max_component_pixels).contains(&count) {
            continue;
        }

        let confidence = elongation_confidence(&pixels, sum_x, sum_y, config);
        out.push(Detection {
            confidence,
            bbox: Some(BoundingBox {
                x_min: min_x as f32,
                y_min: min_y as f32,
                x_max: (max_x + 1) as f32,
                y_max: (max_y + 1) as f32,
            }),
            label: Some(NEEDLE_LABEL.to_string()),
        });
    }

    out
}

// Principal-axis spread ratio of the component, mapped onto [0, 1].
// A ratio of 1 (perfectly round) scores 0; `needle_elongation` or beyond
// scores 1. Orientation-independent, so slanted needles score the same as
// vertical ones.
fn elongation_confidence(
    pixels: &[(usize, usize)],
    sum_x: f64,
    sum_y: f64,
    config: &StrokeDetectorConfig,
) -> f32 {
    let n = pixels.len() as f64;
    let mean_x = sum_x / n;
    let mean_y = sum_y / n;

    let mut sxx = 0f64;
    let mut sxy = 0f64;
    let mut syy = 0f64;
    for &(x, y) in pixels {
        let dx = x as f64 - mean_x;
        let dy = y as f64 - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    sxx /= n;
    sxy /= n;
    syy /= n;

    let trace = sxx + syy;
    let det = sxx * syy - sxy * sxy;
    let temp = ((trace * trace) / 4.0 - det).max(0.0).sqrt();
    let lambda_max = trace / 2.0 + temp;
    // Single-pixel-wide strokes have near-zero minor variance; floor it at
    // the variance of a one-pixel-wide strip.
    let lambda_min = (trace / 2.0 - temp).max(1.0 / 12.0);

    let ratio = (lambda_max / lambda_min).sqrt() as f32;
    ((ratio - 1.0) / (config.needle_elongation - 1.0)).clamp(0.0, 1.0)
}
