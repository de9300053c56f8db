use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::AuthApi;
use crate::error::{PollError, TokenCacheError};

/// Supplies the bearer credential for status requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Cached credential, logging in first if there is none.
    async fn token(&self) -> Result<String, PollError>;

    /// Log in again and replace the cached credential.
    async fn refresh(&self) -> Result<String, PollError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub obtained_at: DateTime<Utc>,
}

/// JSON file holding the last credential so later runs skip the login.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<StoredToken>, TokenCacheError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let stored: StoredToken = serde_json::from_str(&contents)?;
        if stored.access_token.is_empty() {
            return Ok(None);
        }
        Ok(Some(stored))
    }

    /// Each write goes to its own sibling temp file, renamed over the cache.
    pub fn store(&self, token: &StoredToken) -> Result<(), TokenCacheError> {
        use std::fs;
        use std::io::Write;

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let json = serde_json::to_string_pretty(token)?;
        let mut file = tempfile::NamedTempFile::new_in(parent)?;
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;

        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Token provider logging in with a fixed identity and caching the result.
///
/// Concurrent refreshes are not serialized. Each one logs in on its own and
/// the last write wins, which the identity provider tolerates.
pub struct CachedTokenProvider<A> {
    auth: Arc<A>,
    email: String,
    password: String,
    current: RwLock<Option<String>>,
    cache: Option<TokenCache>,
}

impl<A: AuthApi> CachedTokenProvider<A> {
    pub fn new(auth: Arc<A>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            auth,
            email: email.into(),
            password: password.into(),
            current: RwLock::new(None),
            cache: None,
        }
    }

    /// Persist credentials to `cache`, seeding memory from it when readable.
    pub fn with_cache(mut self, cache: TokenCache) -> Self {
        match cache.load() {
            Ok(Some(stored)) => {
                debug!("Loaded cached credential from {:?}", cache.path());
                self.current = RwLock::new(Some(stored.access_token));
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable token cache {:?}: {}", cache.path(), e),
        }
        self.cache = Some(cache);
        self
    }

    async fn login_and_store(&self) -> Result<String, PollError> {
        let token = self.auth.login(&self.email, &self.password).await?;

        *self.current.write().await = Some(token.clone());

        if let Some(cache) = self.cache.clone() {
            let stored = StoredToken {
                access_token: token.clone(),
                obtained_at: Utc::now(),
            };
            let path = cache.path().to_path_buf();
            match tokio::task::spawn_blocking(move || cache.store(&stored)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Failed to persist credential to {:?}: {}", path, e),
                Err(e) => warn!("Credential write to {:?} did not finish: {}", path, e),
            }
        }

        Ok(token)
    }
}

#[async_trait]
impl<A: AuthApi> TokenProvider for CachedTokenProvider<A> {
    async fn token(&self) -> Result<String, PollError> {
        if let Some(token) = self.current.read().await.clone() {
            return Ok(token);
        }
        info!("No cached credential, logging in as {}", self.email);
        self.login_and_store().await
    }

    async fn refresh(&self) -> Result<String, PollError> {
        info!("Renewing credential for {}", self.email);
        self.login_and_store().await
    }
}
