//! Draws detection overlays onto the scanned photo so the operator can see
//! which marks were counted.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detect::Detection;

const COLOR_CONFIDENT: Rgba<u8> = Rgba([110, 170, 90, 255]);
const COLOR_UNCERTAIN: Rgba<u8> = Rgba([230, 130, 30, 255]);
const CONFIDENT_AT: f32 = 0.5;
const STROKE_PX: i32 = 2;

/// Returns a copy of `source` with a hollow box around every detection that
/// carries a bounding region. Confident detections draw green, marginal ones
/// orange. Detections without a region are left unmarked.
pub fn annotate_detections(source: &DynamicImage, detections: &[Detection]) -> RgbaImage {
    let mut canvas = source.to_rgba8();
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return canvas;
    }

    for det in detections {
        let Some(bbox) = det.bbox else {
            continue;
        };
        let color = if det.confidence >= CONFIDENT_AT {
            COLOR_CONFIDENT
        } else {
            COLOR_UNCERTAIN
        };
        draw_box(&mut canvas, bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max, color);
    }

    canvas
}

fn draw_box(canvas: &mut RgbaImage, x_min: f32, y_min: f32, x_max: f32, y_max: f32, color: Rgba<u8>) {
    let width = canvas.width() as i32;
    let height = canvas.height() as i32;

    // Pad by one pixel so the box outlines the stroke instead of covering it.
    let x0 = (x_min.floor() as i32 - 1).clamp(0, width - 1);
    let y0 = (y_min.floor() as i32 - 1).clamp(0, height - 1);
    let x1 = (x_max.ceil() as i32 + 1).clamp(x0 + 1, width);
    let y1 = (y_max.ceil() as i32 + 1).clamp(y0 + 1, height);

    for inset in 0..STROKE_PX {
        let w = (x1 - x0) - 2 * inset;
        let h = (y1 - y0) - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(x0 + inset, y0 + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}
