//! Credential and refresh exchange

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Credential
// ============================================================================

/// A stored OAuth credential. The access token is valid for `expires_in`
/// seconds after `issued_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,

    pub refresh_token: String,

    /// Access token lifetime in seconds
    pub expires_in: u64,

    /// When the access token was issued (stamped locally at grant time)
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    /// Whether the access token's age exceeds its declared lifetime.
    pub fn is_expired(&self) -> bool {
        let age = Utc::now().signed_duration_since(self.issued_at);
        age.num_seconds() > self.expires_in as i64
    }
}

// ============================================================================
// Refresh Exchange
// ============================================================================

/// Exchanges a refresh token for a fresh credential.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, AuthError>;
}

#[derive(Serialize)]
struct RefreshForm<'a> {
    refresh_token: &'a str,
    grant_type: &'a str,
}

#[derive(Deserialize)]
struct RefreshGrant {
    access_token: String,
    expires_in: u64,
    /// Some exchanges rotate the refresh token; most echo nothing
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Refresher backed by the deployed token-exchange endpoint. The endpoint
/// holds the OAuth client secret, so only the refresh token and grant type
/// travel from here.
pub struct HttpRefresher {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpRefresher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, AuthError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&RefreshForm {
                refresh_token,
                grant_type: "refresh_token",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %body, "Token refresh rejected");
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
                body,
            });
        }

        let grant: RefreshGrant = response.json().await?;

        tracing::debug!(expires_in = grant.expires_in, "Refreshed access token");

        Ok(Credential {
            access_token: grant.access_token,
            refresh_token: grant
                .refresh_token
                .unwrap_or_else(|| refresh_token.to_string()),
            expires_in: grant.expires_in,
            issued_at: Utc::now(),
        })
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Credential error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token refresh rejected ({status}): {body}")]
    RefreshRejected { status: u16, body: String },

    #[error("token endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("credential store unavailable: {0}")]
    Store(#[from] std::io::Error),

    #[error("stored credential is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

// ============================================================================
// Tests
// ============================================================================
