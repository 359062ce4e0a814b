//! Per-scan audit record: who scanned, where, when, and what the
//! reconciliation decided. Records are values; the crate never persists them.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::reconcile::{AlertState, ReconciliationResult};

#[derive(Debug, Clone, Serialize)]
pub struct ScanRecord {
    pub operator: String,
    pub station: String,
    pub scanned_at: DateTime<Local>,
    pub expected_count: u64,
    pub observed_count: u64,
    pub delta: i64,
    pub state: AlertState,
    pub message: String,
}

impl ScanRecord {
    /// Stamps a reconciliation outcome with the operator, station, and the
    /// current local time.
    pub fn new(operator: &str, station: &str, result: &ReconciliationResult) -> Self {
        Self::at(operator, station, Local::now(), result)
    }

    /// Like [`ScanRecord::new`] with an explicit timestamp.
    pub fn at(
        operator: &str,
        station: &str,
        scanned_at: DateTime<Local>,
        result: &ReconciliationResult,
    ) -> Self {
        Self {
            operator: operator.to_string(),
            station: station.to_string(),
            scanned_at,
            expected_count: result.expected_count,
            observed_count: result.observed_count,
            delta: result.delta,
            state: result.state,
            message: result.message.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// One-line footer for the scan display.
    pub fn summary_line(&self) -> String {
        format!(
            "scanned {} | operator {} | {} | {}",
            self.scanned_at.format("%Y-%m-%d %H:%M:%S"),
            self.operator,
            self.station,
            self.message,
        )
    }
}
