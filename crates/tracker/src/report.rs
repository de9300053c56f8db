use serde::{Deserialize, Serialize};

use crate::error::PollError;
use crate::steps::STEP_COUNT;

/// Status value handed to the host when a job finishes.
pub const TERMINAL_STATUS: &str = "COMPLETED";

/// Body of `GET /videos/{id}/progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub step: u8,
    pub progress: f64,
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
}

impl ProgressReport {
    pub fn new(step: u8, progress: f64, status: impl Into<String>) -> Self {
        Self {
            step,
            progress,
            status: status.into(),
            message: None,
            current_step: None,
        }
    }

    /// Clamp `step` and `progress` into their documented ranges.
    pub fn normalized(mut self) -> Result<Self, PollError> {
        if !self.progress.is_finite() {
            return Err(PollError::Malformed(format!(
                "progress is not a finite number: {}",
                self.progress
            )));
        }
        self.step = self.step.min(STEP_COUNT);
        self.progress = self.progress.clamp(0.0, 100.0);
        Ok(self)
    }

    pub fn is_completed(&self) -> bool {
        is_completed(&self.status)
    }
}

pub fn is_processing(status: &str) -> bool {
    status.trim().eq_ignore_ascii_case("processing")
}

pub fn is_completed(status: &str) -> bool {
    status.trim().eq_ignore_ascii_case("completed")
}

pub fn is_failed(status: &str) -> bool {
    status.trim().eq_ignore_ascii_case("failed")
}

/// Parse a progress body, mapping any shape mismatch to `Malformed`.
pub fn parse_report(body: &str) -> Result<ProgressReport, PollError> {
    serde_json::from_str::<ProgressReport>(body)
        .map_err(|e| PollError::Malformed(e.to_string()))?
        .normalized()
}
