use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{HttpApi, ProgressApi};
use crate::auth::{CachedTokenProvider, TokenCache, TokenProvider};
use crate::config::TrackerConfig;
use crate::error::PollError;
use crate::notifier::{StatusCallback, TerminalNotifier};
use crate::poll::poll_once;
use crate::report::{is_failed, is_processing, ProgressReport};
use crate::view::ProgressView;

/// Progress as last observed for one tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackerState {
    pub current_step: u8,
    pub progress_percent: f64,
    pub elapsed_seconds: u64,
}

impl TrackerState {
    /// Take step and progress from a successful poll.
    ///
    /// With `clamp_step` set, an older step than the one already shown is
    /// ignored so out-of-order responses cannot move the tracker backwards.
    pub fn apply_report(&mut self, report: &ProgressReport, clamp_step: bool) {
        self.current_step = if clamp_step {
            self.current_step.max(report.step)
        } else {
            report.step
        };
        self.progress_percent = report.progress;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub tick_interval: Duration,
    pub skip_overlapping_polls: bool,
    pub clamp_step_regression: bool,
}

impl PollSettings {
    /// Reject intervals the tickers cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than zero");
        }

        if self.tick_interval.is_zero() {
            anyhow::bail!("tick_interval must be greater than zero");
        }

        Ok(())
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&TrackerConfig::default())
    }
}

impl From<&TrackerConfig> for PollSettings {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            tick_interval: config.tick_interval(),
            skip_overlapping_polls: config.skip_overlapping_polls,
            clamp_step_regression: config.clamp_step_regression,
        }
    }
}

/// Collaborators shared by every tracker in a process.
#[derive(Clone)]
pub struct TrackerDeps {
    pub api: Arc<dyn ProgressApi>,
    pub tokens: Arc<dyn TokenProvider>,
    pub settings: PollSettings,
}

impl TrackerDeps {
    pub fn new(
        api: Arc<dyn ProgressApi>,
        tokens: Arc<dyn TokenProvider>,
        settings: PollSettings,
    ) -> Self {
        Self {
            api,
            tokens,
            settings,
        }
    }

    /// Wire the HTTP client and the demo-identity token provider.
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        let http = Arc::new(HttpApi::new(config)?);

        let mut provider = CachedTokenProvider::new(
            http.clone(),
            config.demo_email.clone(),
            config.demo_password.clone(),
        );
        if let Some(path) = &config.token_cache_path {
            provider = provider.with_cache(TokenCache::new(path));
        }

        Ok(Self::new(http, Arc::new(provider), PollSettings::from(config)))
    }
}

/// One "processing" window: a spawned task plus the handles to end it.
struct Session {
    id: Uuid,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    state: watch::Receiver<TrackerState>,
    notifier: Arc<TerminalNotifier>,
}

impl Session {
    fn start(job_id: &str, deps: &TrackerDeps, callback: Option<StatusCallback>) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| anyhow::anyhow!("Progress tracking needs a tokio runtime: {}", e))?;

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(TrackerState::default());
        let notifier = Arc::new(TerminalNotifier::new(callback));

        info!("Tracking job {} (session {})", job_id, id);

        let task = runtime.spawn(run_session(
            job_id.to_string(),
            id,
            deps.clone(),
            cancel.clone(),
            state_tx,
            notifier.clone(),
        ));

        Ok(Self {
            id,
            cancel,
            task,
            state: state_rx,
            notifier,
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
        debug!("Session {} stopped", self.id);
    }
}

/// Tracks one job while its status is "processing".
///
/// Hosts feed status changes through [`ProgressTracker::update_status`].
/// Entering "processing" starts a fresh session, leaving it (or dropping
/// the tracker) stops the poll loop and the elapsed clock together.
pub struct ProgressTracker {
    job_id: String,
    status: String,
    deps: TrackerDeps,
    on_status_change: Option<StatusCallback>,
    session: Option<Session>,
}

impl ProgressTracker {
    pub fn new(
        job_id: impl Into<String>,
        status: impl Into<String>,
        deps: TrackerDeps,
        on_status_change: Option<StatusCallback>,
    ) -> Result<Self> {
        let job_id = job_id.into();
        let status: String = status.into();
        if job_id.trim().is_empty() {
            anyhow::bail!("job_id cannot be empty");
        }
        deps.settings.validate()?;

        let mut tracker = Self {
            job_id,
            status: String::new(),
            deps,
            on_status_change,
            session: None,
        };
        tracker.update_status(&status)?;
        Ok(tracker)
    }

    pub fn update_status(&mut self, status: &str) -> Result<()> {
        self.status = status.to_string();

        if is_processing(status) {
            if self.session.is_none() {
                self.session = Some(Session::start(
                    &self.job_id,
                    &self.deps,
                    self.on_status_change.clone(),
                )?);
            }
        } else if let Some(session) = self.session.take() {
            info!(
                "Job {} is now {:?}, stopping session {}",
                self.job_id, status, session.id
            );
            drop(session);
        }

        Ok(())
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn state(&self) -> Option<TrackerState> {
        self.session.as_ref().map(|s| *s.state.borrow())
    }

    /// Display state, or `None` when there is nothing to render.
    pub fn snapshot(&self) -> Option<ProgressView> {
        self.state().map(|state| ProgressView::derive(&state))
    }

    /// Change feed for the current session.
    pub fn subscribe(&self) -> Option<watch::Receiver<TrackerState>> {
        self.session.as_ref().map(|s| s.state.clone())
    }

    pub fn has_notified(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.notifier.has_fired())
    }
}

async fn run_session(
    job_id: String,
    session_id: Uuid,
    deps: TrackerDeps,
    cancel: CancellationToken,
    state_tx: watch::Sender<TrackerState>,
    notifier: Arc<TerminalNotifier>,
) {
    let settings = deps.settings;
    let mut elapsed = Duration::ZERO;

    let mut elapsed_ticker = interval_at(
        Instant::now() + settings.tick_interval,
        settings.tick_interval,
    );
    // First tick completes immediately, giving the initial poll.
    let mut poll_ticker = interval(settings.poll_interval);
    poll_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut in_flight: JoinSet<Option<Result<ProgressReport, PollError>>> = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = elapsed_ticker.tick() => {
                elapsed += settings.tick_interval;
                state_tx.send_modify(|state| state.elapsed_seconds = elapsed.as_secs());
            }

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                match joined {
                    Ok(Some(Ok(report))) => {
                        debug!(
                            "Job {}: step {} progress {} status {}",
                            job_id, report.step, report.progress, report.status
                        );
                        state_tx.send_modify(|state| {
                            state.apply_report(&report, settings.clamp_step_regression)
                        });

                        if report.is_completed() {
                            if notifier.notify() {
                                info!("Job {} completed", job_id);
                            }
                        } else if is_failed(&report.status) {
                            warn!("Backend reports job {} as failed", job_id);
                        }
                    }
                    Ok(Some(Err(e))) => {
                        warn!("Progress poll for job {} failed: {}", job_id, e);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Progress poll task for job {} ended abnormally: {}", job_id, e);
                    }
                }
            }

            _ = poll_ticker.tick() => {
                if settings.skip_overlapping_polls && !in_flight.is_empty() {
                    debug!("Previous poll for job {} still in flight, skipping tick", job_id);
                    continue;
                }

                let api = deps.api.clone();
                let tokens = deps.tokens.clone();
                let poll_cancel = cancel.clone();
                let poll_job_id = job_id.clone();
                in_flight.spawn(async move {
                    tokio::select! {
                        biased;
                        _ = poll_cancel.cancelled() => None,
                        result = poll_once(api.as_ref(), tokens.as_ref(), &poll_job_id) => Some(result),
                    }
                });
            }
        }
    }

    in_flight.abort_all();
    debug!("Session {} for job {} finished", session_id, job_id);
}
