//! Reconciles the operator-declared needle total against the detector's
//! count and classifies the outcome as matched, deficient, or surplus.

use serde::Serialize;

use crate::detect::Detection;

/// Default minimum confidence a detection must reach to be counted.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Errors produced by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    #[error("counts must be non-negative: expected {expected}, observed {observed}")]
    InvalidCount { expected: i64, observed: i64 },

    #[error("confidence threshold {0} outside [0, 1]")]
    InvalidThreshold(f32),
}

/// Outcome of comparing the observed count against the expected count.
///
/// The variant is decided solely by the sign of `expected - observed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Matched,
    Deficient,
    Surplus,
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertState::Matched => "matched",
            AlertState::Deficient => "deficient",
            AlertState::Surplus => "surplus",
        };
        f.write_str(s)
    }
}

/// One reconciliation outcome. Invariant: `delta == expected_count - observed_count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub expected_count: u64,
    pub observed_count: u64,
    pub delta: i64,
    pub state: AlertState,
    pub message: String,
}

/// Classifies the relationship between the expected and observed counts.
///
/// Counts arrive as signed integers because the expected count comes from
/// operator input; negative values fail with [`ReconcileError::InvalidCount`].
/// Pure and deterministic, no side effects.
pub fn reconcile(
    expected_count: i64,
    observed_count: i64,
) -> Result<ReconciliationResult, ReconcileError> {
    if expected_count < 0 || observed_count < 0 {
        return Err(ReconcileError::InvalidCount {
            expected: expected_count,
            observed: observed_count,
        });
    }

    let delta = expected_count - observed_count;
    let (state, message) = if delta == 0 {
        (
            AlertState::Matched,
            format!("count matches: {observed_count} of {expected_count}"),
        )
    } else if delta > 0 {
        (
            AlertState::Deficient,
            format!("alert: {delta} item(s) still missing"),
        )
    } else {
        (
            AlertState::Surplus,
            format!(
                "notice: {observed_count} detected exceeds expected {expected_count}, verify manually"
            ),
        )
    };

    Ok(ReconciliationResult {
        expected_count: expected_count as u64,
        observed_count: observed_count as u64,
        delta,
        state,
        message,
    })
}

/// Keeps the detections whose confidence reaches `confidence_threshold`,
/// preserving their original order.
///
/// The threshold must lie in `[0, 1]`; anything else is a caller
/// configuration error and fails with [`ReconcileError::InvalidThreshold`].
pub fn filter_detections(
    detections: &[Detection],
    confidence_threshold: f32,
) -> Result<Vec<Detection>, ReconcileError> {
    // NaN fails both bounds, so it is rejected here too.
    if !(0.0..=1.0).contains(&confidence_threshold) {
        return Err(ReconcileError::InvalidThreshold(confidence_threshold));
    }

    Ok(detections
        .iter()
        .filter(|d| d.confidence >= confidence_threshold)
        .cloned()
        .collect())
}

/// Filters `detections` at `confidence_threshold`, then reconciles the
/// surviving count against `expected_count`.
///
/// Returns the surviving detections alongside the result so the caller can
/// render them without re-filtering.
pub fn reconcile_detections(
    expected_count: i64,
    detections: &[Detection],
    confidence_threshold: f32,
) -> Result<(Vec<Detection>, ReconciliationResult), ReconcileError> {
    let kept = filter_detections(detections, confidence_threshold)?;
    let result = reconcile(expected_count, kept.len() as i64)?;
    Ok((kept, result))
}
