//! HTTP client for the Vidova backend.
//!
//! Only the two endpoints the tracker needs are covered: the login
//! exchange and the per-video progress query.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TrackerConfig;
use crate::error::PollError;
use crate::report::{parse_report, ProgressReport};

/// Exchanges an identity for a bearer token.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<String, PollError>;
}

/// Fetches the progress of one job.
#[async_trait]
pub trait ProgressApi: Send + Sync {
    async fn fetch_progress(&self, job_id: &str, token: &str)
        -> Result<ProgressReport, PollError>;
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    /// Build a client with the timeouts from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client cannot be built.
    pub fn new(config: &TrackerConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(format!("vidova-tracker/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self::with_client(client, &config.api_base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Progress endpoint for `job_id`, with the id escaped as one path segment.
    fn progress_url(&self, job_id: &str) -> Result<Url, PollError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            PollError::Transport(format!("invalid base url {:?}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                PollError::Transport(format!("base url {:?} cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["videos", job_id, "progress"]);
        Ok(url)
    }
}

#[async_trait]
impl AuthApi for HttpApi {
    async fn login(&self, email: &str, password: &str) -> Result<String, PollError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Login(format!("server answered {}", status)));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| PollError::Login(format!("unreadable login response: {}", e)))?;

        match body.access_token {
            Some(token) if !token.is_empty() => {
                debug!("Login succeeded for {}", email);
                Ok(token)
            }
            _ => Err(PollError::Login("no token received".to_string())),
        }
    }
}

#[async_trait]
impl ProgressApi for HttpApi {
    async fn fetch_progress(
        &self,
        job_id: &str,
        token: &str,
    ) -> Result<ProgressReport, PollError> {
        let response = self
            .client
            .get(self.progress_url(job_id)?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(PollError::Unauthorized),
            status if !status.is_success() => Err(PollError::Status(status.as_u16())),
            _ => {
                let body = response.text().await?;
                parse_report(&body)
            }
        }
    }
}
