use tracing::{debug, warn};

use crate::api::ProgressApi;
use crate::auth::TokenProvider;
use crate::error::PollError;
use crate::report::ProgressReport;

/// Where a single poll attempt currently stands.
#[derive(Debug, Clone, PartialEq)]
enum AttemptState {
    Attempt,
    Renew,
    RetryOnce(String),
}

/// Run one poll tick for `job_id`.
///
/// An unauthenticated rejection renews the credential once and retries the
/// request once. Any other failure, or a second failure after renewal,
/// gives up for this tick.
pub async fn poll_once<P, T>(api: &P, tokens: &T, job_id: &str) -> Result<ProgressReport, PollError>
where
    P: ProgressApi + ?Sized,
    T: TokenProvider + ?Sized,
{
    let mut state = AttemptState::Attempt;

    loop {
        state = match state {
            AttemptState::Attempt => {
                let token = tokens.token().await?;
                match api.fetch_progress(job_id, &token).await {
                    Ok(report) => return Ok(report),
                    Err(e) if e.is_auth_failure() => {
                        debug!("Progress request for {} rejected, renewing credential", job_id);
                        AttemptState::Renew
                    }
                    Err(e) => return Err(e),
                }
            }
            AttemptState::Renew => {
                let token = tokens.refresh().await.map_err(|e| {
                    warn!("Credential renewal failed for {}: {}", job_id, e);
                    e
                })?;
                AttemptState::RetryOnce(token)
            }
            AttemptState::RetryOnce(token) => {
                return api.fetch_progress(job_id, &token).await;
            }
        };
    }
}
