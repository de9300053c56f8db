use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::notifier::StatusCallback;
use crate::report::is_processing;
use crate::tracker::{ProgressTracker, TrackerDeps};
use crate::view::ProgressView;

/// Host callback receiving `(job_id, new_status)`.
pub type JobStatusCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// A job as the host's list currently knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    pub id: String,
    pub status: String,
}

impl JobEntry {
    pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
        }
    }
}

/// Keeps one tracker per processing job in a host's list.
///
/// All trackers share the registry's API client and token provider.
pub struct TrackerRegistry {
    deps: TrackerDeps,
    on_status_change: Option<JobStatusCallback>,
    trackers: BTreeMap<String, ProgressTracker>,
}

impl TrackerRegistry {
    pub fn new(deps: TrackerDeps, on_status_change: Option<JobStatusCallback>) -> Self {
        Self {
            deps,
            on_status_change,
            trackers: BTreeMap::new(),
        }
    }

    /// Reconcile trackers with the host's current job list.
    ///
    /// Jobs that entered "processing" get a tracker, jobs that left it or
    /// vanished from the list lose theirs.
    pub fn sync(&mut self, jobs: &[JobEntry]) -> Result<()> {
        self.trackers.retain(|id, tracker| {
            let keep = jobs
                .iter()
                .any(|job| &job.id == id && is_processing(&job.status));
            if !keep {
                debug!("Dropping tracker for job {} ({})", id, tracker.status());
            }
            keep
        });

        for job in jobs.iter().filter(|job| is_processing(&job.status)) {
            if let Some(tracker) = self.trackers.get_mut(&job.id) {
                tracker.update_status(&job.status)?;
                continue;
            }
            let tracker = ProgressTracker::new(
                job.id.clone(),
                job.status.clone(),
                self.deps.clone(),
                self.callback_for(&job.id),
            )?;
            self.trackers.insert(job.id.clone(), tracker);
        }

        Ok(())
    }

    fn callback_for(&self, job_id: &str) -> Option<StatusCallback> {
        let callback = self.on_status_change.clone()?;
        let job_id = job_id.to_string();
        Some(Arc::new(move |status: &str| callback(&job_id, status)))
    }

    pub fn get(&self, job_id: &str) -> Option<&ProgressTracker> {
        self.trackers.get(job_id)
    }

    pub fn tracked_ids(&self) -> Vec<&str> {
        self.trackers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Views of every tracked job, ordered by job id.
    pub fn views(&self) -> Vec<(&str, ProgressView)> {
        self.trackers
            .iter()
            .filter_map(|(id, tracker)| tracker.snapshot().map(|view| (id.as_str(), view)))
            .collect()
    }
}
