// Pure view model: tracker state in, display state out.

use std::fmt;

use crate::steps::{derive_steps, ProcessingStep, StepStatus, STEP_COUNT};
use crate::tracker::TrackerState;

/// Progress the backend is assumed to make per minute.
const PERCENT_PER_MINUTE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub steps: Vec<ProcessingStep>,
    pub percent: u8,
    pub elapsed_seconds: u64,
    pub remaining_minutes: u32,
}

impl ProgressView {
    pub fn derive(state: &TrackerState) -> Self {
        Self {
            steps: derive_steps(state.current_step),
            percent: round_percent(state.progress_percent),
            elapsed_seconds: state.elapsed_seconds,
            remaining_minutes: estimate_remaining_minutes(state.progress_percent),
        }
    }

    pub fn active_step(&self) -> Option<&ProcessingStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Active)
    }

    pub fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    pub fn elapsed(&self) -> String {
        format_elapsed(self.elapsed_seconds)
    }

    /// "Step n/4", where n is the step being worked on.
    pub fn headline(&self) -> String {
        let current = (self.completed_count() + 1).min(STEP_COUNT as usize);
        format!("Step {}/{}", current, STEP_COUNT)
    }
}

pub fn round_percent(progress_percent: f64) -> u8 {
    progress_percent.clamp(0.0, 100.0).round() as u8
}

pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn estimate_remaining_minutes(progress_percent: f64) -> u32 {
    let remaining = ((100.0 - progress_percent) / PERCENT_PER_MINUTE).ceil();
    if remaining.is_nan() {
        return 0;
    }
    remaining.max(0.0) as u32
}

impl fmt::Display for ProgressView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Processing... {} | {} elapsed | {}%",
            self.headline(),
            self.elapsed(),
            self.percent
        )?;

        if let Some(active) = self.active_step() {
            writeln!(f, "  > {}: {}", active.label(), active.definition.description)?;
        }

        for step in &self.steps {
            let badge = match step.status {
                StepStatus::Completed => "done".to_string(),
                StepStatus::Active => format!("{}%", step.definition.nominal_progress),
                StepStatus::Pending => "waiting".to_string(),
            };
            writeln!(
                f,
                "  [{}] Step {}/{}: {}",
                badge,
                step.id(),
                STEP_COUNT,
                step.label()
            )?;
        }

        write!(f, "  Estimated time remaining: ~{} minutes", self.remaining_minutes)
    }
}
