//! Wire types for the relay contract

use serde::{Deserialize, Serialize};

// ============================================================================
// Operation Payloads
// ============================================================================

/// `INIT` payload: open a resumable upload session upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadInit {
    /// Media type of the file to be uploaded
    pub content_type: String,

    /// Total file size in bytes
    pub content_length: u64,

    /// File name as it should appear in Drive
    pub name: String,

    /// Optional target folder id (`parents` entry on the Drive file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

/// Response to a successful `INIT`: the opaque session URI issued by Drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResponse {
    pub location: String,
}

/// `UPLOAD` payload: one byte range destined for an open session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUploadRequest {
    /// Raw chunk bytes (JSON array of 0-255 values on the wire)
    pub chunk: Vec<u8>,

    /// Session URI returned by `INIT`
    pub uri: String,

    /// Byte count of `chunk`; must match `chunk.len()`
    pub content_length: u64,

    /// `Content-Range` header value, e.g. `bytes 0-262143/600000`
    pub content_range: String,
}

/// Response to an `UPLOAD`: either the finished artifact or the offset the
/// backend wants next. Exactly one shape holds per response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUploadResponse {
    /// True once Drive has acknowledged the final byte
    pub done: bool,

    /// Artifact id (present when `done`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Artifact media type (present when `done`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Next byte offset to send (present when not `done`). The backend is
    /// authoritative: this may fall inside a range the caller already sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
}

impl ChunkUploadResponse {
    /// All bytes received; the stored file exists.
    pub fn completed(id: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            done: true,
            id: Some(id.into()),
            mime_type: Some(mime_type.into()),
            start: None,
        }
    }

    /// Backend wants more data starting at `start`.
    pub fn resume(start: u64) -> Self {
        Self {
            done: false,
            id: None,
            mime_type: None,
            start: Some(start),
        }
    }
}

// ============================================================================
// Upstream Payloads
// ============================================================================

/// Drive file record as returned by the files API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Envelope for a Drive file listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

// ============================================================================
// Error Types
// ============================================================================

/// Relay error types
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("missing Google access token; log in to Google and retry")]
    Unauthorized,

    #[error("Invalid operation {0}")]
    InvalidOperation(String),

    #[error("{0}")]
    BadRequest(String),

    /// Non-2xx/308 from Drive; `body` carries the upstream payload verbatim.
    #[error("Google API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("request to Google failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("resumable session response carried no location header")]
    MissingLocation,

    #[error("could not parse resume range {0:?}")]
    InvalidResumeRange(String),

    #[error("unexpected payload from Google: {0}")]
    MalformedUpstream(String),
}

impl RelayError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidOperation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { .. }
            | Self::Transport(_)
            | Self::MissingLocation
            | Self::InvalidResumeRange(_)
            | Self::MalformedUpstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the JSON error envelope
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidOperation(_) => "INVALID_OPERATION",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Upstream { .. } => "UPSTREAM",
            Self::Transport(_) => "UPSTREAM_UNREACHABLE",
            Self::MissingLocation => "MISSING_LOCATION",
            Self::InvalidResumeRange(_) => "INVALID_RESUME_RANGE",
            Self::MalformedUpstream(_) => "MALFORMED_UPSTREAM",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
