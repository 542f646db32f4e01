//! Session Client
//!
//! Composes the credential store and the refresh exchange into the single
//! call sites use: resolve a bearer token, refreshing lazily when expired.
//! Refresh is idempotent and the stored credential is read-mostly, so one
//! client is safe to share across concurrent uploads.

use crate::config::AuthConfig;

use super::store::{CredentialStore, FileStore};
use super::token::{AuthError, HttpRefresher, TokenRefresher};

/// Resolves a valid bearer credential per network call.
pub struct SessionClient {
    store: Box<dyn CredentialStore>,
    refresher: Box<dyn TokenRefresher>,
}

impl SessionClient {
    pub fn new(store: Box<dyn CredentialStore>, refresher: Box<dyn TokenRefresher>) -> Self {
        Self { store, refresher }
    }

    /// Session client backed by the on-disk credential file and the deployed
    /// token-exchange endpoint.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            Box::new(FileStore::new(&config.credential_path)),
            Box::new(HttpRefresher::new(&config.refresh_url)),
        )
    }

    /// Resolve a bearer token.
    ///
    /// Returns `None` when no credential is stored; callers must treat that
    /// as unauthenticated and fail fast rather than attempt the network
    /// call. An expired credential is refreshed and persisted before the
    /// new token is returned.
    pub async fn bearer_token(&self) -> Result<Option<String>, AuthError> {
        let Some(credential) = self.store.load().await? else {
            return Ok(None);
        };

        if !credential.is_expired() {
            return Ok(Some(credential.access_token));
        }

        tracing::debug!("Stored access token expired, refreshing");
        let refreshed = self.refresher.refresh(&credential.refresh_token).await?;
        self.store.save(&refreshed).await?;
        Ok(Some(refreshed.access_token))
    }
}

// ============================================================================
// Tests
// ============================================================================
