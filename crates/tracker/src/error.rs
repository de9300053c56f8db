use thiserror::Error;

/// Why a single poll tick produced no state update.
///
/// None of these reach the user. The tracker logs them and waits for the
/// next tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PollError {
    #[error("request rejected as unauthenticated")]
    Unauthorized,

    #[error("login failed: {0}")]
    Login(String),

    #[error("unexpected status code {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed progress response: {0}")]
    Malformed(String),
}

impl PollError {
    /// True for failures that renewing the credential could fix.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, PollError::Unauthorized)
    }
}

impl From<reqwest::Error> for PollError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            PollError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            PollError::Status(status.as_u16())
        } else {
            PollError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenCacheError {
    #[error("token cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token cache is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
