//! Drive Relay Client
//!
//! The reqwest-backed upstream client behind both relay endpoints and the
//! direct upload transport. One method per Drive call: resumable session
//! initiation, chunk PUT, metadata fetch, content download, and the
//! folder find-or-create pair used to target uploads.

use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, LOCATION, RANGE};
use reqwest::{RequestBuilder, StatusCode};

use crate::config::{DriveConfig, TokenTransport};
use super::types::{ChunkUploadResponse, DriveFile, FileList, RelayError, UploadInit};

/// Drive folder media type
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

// ============================================================================
// Client
// ============================================================================

/// Stateless client for the Google Drive REST surface.
#[derive(Clone)]
pub struct DriveRelay {
    http: reqwest::Client,
    api_base: String,
    upload_base: String,
    token_transport: TokenTransport,
}

impl DriveRelay {
    /// Build a relay client from configuration.
    ///
    /// Redirect following is disabled: Drive signals "resume incomplete" with
    /// HTTP 308, which must reach the caller instead of the redirect policy.
    pub fn new(config: &DriveConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
            token_transport: config.token_transport,
        })
    }

    /// Attach the bearer credential the way the deployed backend expects.
    fn authorize(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        match self.token_transport {
            TokenTransport::Header => request.bearer_auth(token),
            TokenTransport::Query => request.query(&[("access_token", token)]),
        }
    }

    // ========================================================================
    // Resumable Upload
    // ========================================================================

    /// Open a resumable upload session. Returns the opaque session URI from
    /// the upstream location header (header lookup is case-insensitive, since
    /// intermediaries may normalize casing).
    pub async fn open_upload(&self, token: &str, init: &UploadInit) -> Result<String, RelayError> {
        let url = format!("{}/files?uploadType=resumable", self.upload_base);

        let mut metadata = serde_json::json!({ "name": init.name });
        if let Some(folder_id) = &init.folder_id {
            metadata["parents"] = serde_json::json!([folder_id]);
        }

        let request = self
            .http
            .post(&url)
            .header("X-Upload-Content-Type", &init.content_type)
            .header("X-Upload-Content-Length", init.content_length)
            .json(&metadata);

        let response = self.authorize(request, token).send().await?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(RelayError::MissingLocation)?;

        tracing::debug!(
            name = %init.name,
            content_length = init.content_length,
            "Opened resumable upload session"
        );

        Ok(location)
    }

    /// PUT one byte range to an open session.
    ///
    /// A 308 response means the backend wants more data; its `Range` header
    /// (`bytes=0-{received-1}`) is authoritative about how many bytes were
    /// actually persisted. A final status carries the stored file record.
    pub async fn put_chunk(
        &self,
        uri: &str,
        chunk: &[u8],
        content_range: &str,
    ) -> Result<ChunkUploadResponse, RelayError> {
        let response = self
            .http
            .put(uri)
            .header(CONTENT_LENGTH, chunk.len())
            .header(CONTENT_RANGE, content_range)
            .body(chunk.to_vec())
            .send()
            .await?;

        if response.status() == StatusCode::PERMANENT_REDIRECT {
            // No Range header on a 308 means nothing was persisted yet.
            let next = match response.headers().get(RANGE) {
                Some(value) => {
                    let raw = value
                        .to_str()
                        .map_err(|_| RelayError::InvalidResumeRange(format!("{value:?}")))?;
                    resume_offset(raw)?
                }
                None => 0,
            };
            tracing::debug!(content_range, next, "Chunk partially accepted, resuming");
            return Ok(ChunkUploadResponse::resume(next));
        }

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let file: DriveFile = response
            .json()
            .await
            .map_err(|e| RelayError::MalformedUpstream(e.to_string()))?;

        tracing::debug!(file_id = %file.id, "Upload complete");

        let mime_type = file
            .mime_type
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Ok(ChunkUploadResponse::completed(file.id, mime_type))
    }

    // ========================================================================
    // File Access
    // ========================================================================

    /// Fetch the metadata record for a stored file, verbatim.
    pub async fn file_metadata(
        &self,
        token: &str,
        id: &str,
    ) -> Result<serde_json::Value, RelayError> {
        let url = format!("{}/files/{}", self.api_base, id);
        let response = self.http.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| RelayError::MalformedUpstream(e.to_string()))
    }

    /// Download a stored file's content. Returns the upstream content type
    /// alongside the bytes.
    pub async fn download(&self, token: &str, id: &str) -> Result<(String, Vec<u8>), RelayError> {
        let url = format!("{}/files/{}?alt=media", self.api_base, id);
        let response = self.http.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = response.bytes().await?.to_vec();
        Ok((content_type, bytes))
    }

    // ========================================================================
    // Folder Targeting
    // ========================================================================

    /// Resolve a folder by name, creating it when absent.
    pub async fn find_or_create_folder(
        &self,
        token: &str,
        name: &str,
    ) -> Result<String, RelayError> {
        let query = urlencoding::encode("mimeType='application/vnd.google-apps.folder'");
        let url = format!("{}/files?q={}", self.api_base, query);

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let listing: FileList = response
            .json()
            .await
            .map_err(|e| RelayError::MalformedUpstream(e.to_string()))?;

        if let Some(folder) = listing
            .files
            .iter()
            .find(|file| file.name.as_deref() == Some(name))
        {
            return Ok(folder.id.clone());
        }

        self.create_folder(token, name).await
    }

    /// Create a new Drive folder and return its id.
    pub async fn create_folder(&self, token: &str, name: &str) -> Result<String, RelayError> {
        let url = format!("{}/files", self.api_base);
        let body = serde_json::json!({ "name": name, "mimeType": FOLDER_MIME });

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let folder: DriveFile = response
            .json()
            .await
            .map_err(|e| RelayError::MalformedUpstream(e.to_string()))?;

        tracing::info!(folder_id = %folder.id, name, "Created Drive folder");

        Ok(folder.id)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Convert an upstream failure into a relay error, preserving the payload.
async fn upstream_error(response: reqwest::Response) -> RelayError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status, %body, "Upstream rejection");
    RelayError::Upstream { status, body }
}

/// Parse a 308 `Range` header (`bytes=0-{received-1}`) into the next byte
/// offset the backend expects.
fn resume_offset(header: &str) -> Result<u64, RelayError> {
    let malformed = || RelayError::InvalidResumeRange(header.to_string());

    let span = header.strip_prefix("bytes=").ok_or_else(malformed)?;
    let (_, last) = span.rsplit_once('-').ok_or_else(malformed)?;
    let received_through: u64 = last.trim().parse().map_err(|_| malformed())?;

    Ok(received_through + 1)
}

// ============================================================================
// Tests
// ============================================================================
