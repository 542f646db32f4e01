//! Chunk Transports
//!
//! The network seam the upload driver iterates over. Two real transports:
//! the same-origin relay endpoint (browser-equivalent path) and the Drive
//! API directly via [`DriveRelay`]. Deployments differ in which one the
//! backend expects; the driver is indifferent.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use crate::relay::{ChunkUploadRequest, ChunkUploadResponse, DriveRelay, InitResponse, RelayError, UploadInit};

// ============================================================================
// Transport Trait
// ============================================================================

/// Carries session-open and chunk-put calls to the storage backend.
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    /// Open a resumable session; returns its opaque location URI.
    async fn open_session(&self, token: &str, init: &UploadInit) -> Result<String, RelayError>;

    /// Submit one byte range to an open session.
    async fn send_chunk(
        &self,
        token: &str,
        request: &ChunkUploadRequest,
    ) -> Result<ChunkUploadResponse, RelayError>;
}

// ============================================================================
// Direct Transport
// ============================================================================

/// Direct-to-Drive transport: the relay client itself.
#[async_trait]
impl ChunkTransport for DriveRelay {
    async fn open_session(&self, token: &str, init: &UploadInit) -> Result<String, RelayError> {
        self.open_upload(token, init).await
    }

    async fn send_chunk(
        &self,
        _token: &str,
        request: &ChunkUploadRequest,
    ) -> Result<ChunkUploadResponse, RelayError> {
        // Session URIs are self-authorizing; no credential on the PUT.
        self.put_chunk(&request.uri, &request.chunk, &request.content_range)
            .await
    }
}

// ============================================================================
// Relay Transport
// ============================================================================

/// Transport that speaks the relay's `POST /google-drive` wire contract.
#[derive(Clone)]
pub struct ProxyTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl ProxyTransport {
    /// `endpoint` is the full relay URL, e.g. `https://api.example.com/google-drive`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        operation: &str,
        data: serde_json::Value,
    ) -> Result<T, RelayError> {
        let envelope = serde_json::json!({ "operation": operation, "data": data });

        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, token)
            .json(&envelope)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(RelayError::Unauthorized);
            }
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RelayError::MalformedUpstream(e.to_string()))
    }
}

#[async_trait]
impl ChunkTransport for ProxyTransport {
    async fn open_session(&self, token: &str, init: &UploadInit) -> Result<String, RelayError> {
        let response: InitResponse = self
            .post(token, "INIT", serde_json::to_value(init).map_err(|e| {
                RelayError::MalformedUpstream(e.to_string())
            })?)
            .await?;
        Ok(response.location)
    }

    async fn send_chunk(
        &self,
        token: &str,
        request: &ChunkUploadRequest,
    ) -> Result<ChunkUploadResponse, RelayError> {
        self.post(
            token,
            "UPLOAD",
            serde_json::to_value(request)
                .map_err(|e| RelayError::MalformedUpstream(e.to_string()))?,
        )
        .await
    }
}
