//! Needle removal audit toolkit: detect needle-like strokes in a treatment
//! site photo, count them, and reconcile the count against the operator's
//! declared needle total.

pub mod annotate;
pub mod detect;
pub mod reconcile;
pub mod session;

pub use detect::{BoundingBox, Detection, Detector, StrokeDetector, StrokeDetectorConfig};
pub use reconcile::{
    AlertState, DEFAULT_CONFIDENCE_THRESHOLD, ReconcileError, ReconciliationResult,
    filter_detections, reconcile, reconcile_detections,
};
