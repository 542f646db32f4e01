//! Types for the resumable upload protocol

use crate::auth::AuthError;
use crate::relay::{ChunkUploadResponse, RelayError};

// ============================================================================
// Constants
// ============================================================================

/// Fixed chunk size: 256 KiB. Every submission carries exactly this many
/// bytes except the final one, which carries the remainder.
pub const CHUNK_MAX: u64 = 256 * 1024;

// ============================================================================
// Session Types
// ============================================================================

/// One resumable upload session. Created by a successful session-open call
/// and discarded when the attempt terminates; never resumed across attempts.
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Opaque upload URI issued by the storage backend
    pub location: String,

    /// Total byte count of the source
    pub total_length: u64,

    /// Media type of the source
    pub content_type: String,

    /// File name as registered with the backend
    pub file_name: String,
}

/// One contiguous byte range, constructed per iteration and never retained.
#[derive(Debug, Clone)]
pub struct ChunkRange {
    start: u64,
    end: u64,
    bytes: Vec<u8>,
}

impl ChunkRange {
    /// Build a range, enforcing `start < end`, `end - start == bytes.len()`,
    /// and the fixed chunk-size bound. The empty range `0..0` is legal only
    /// for zero-length sources.
    pub fn new(start: u64, end: u64, bytes: Vec<u8>) -> Result<Self, UploadError> {
        let invalid = |reason| UploadError::InvalidRange { start, end, reason };

        if start > end || (start == end && start != 0) {
            return Err(invalid("range is not ascending"));
        }
        if end - start != bytes.len() as u64 {
            return Err(invalid("payload length does not match range"));
        }
        if end - start > CHUNK_MAX {
            return Err(invalid("range exceeds the chunk size bound"));
        }

        Ok(Self { start, end, bytes })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Format the `Content-Range` header for this range within a source of
    /// `total` bytes: `bytes {start}-{end-1}/{total}`, or the empty-body form
    /// `bytes */{total}` for a zero-length range.
    pub fn content_range(&self, total: u64) -> String {
        if self.is_empty() {
            format!("bytes */{total}")
        } else {
            format!("bytes {}-{}/{}", self.start, self.end - 1, total)
        }
    }
}

// ============================================================================
// Outcome Types
// ============================================================================

/// The stored-file record returned once all bytes are received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveArtifact {
    pub id: String,
    pub mime_type: String,
}

/// Result of one chunk submission. Exactly one variant holds per response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Backend wants more data starting at this offset
    Continue { next_start: u64 },

    /// All bytes received; the artifact exists
    Done(DriveArtifact),
}

impl TryFrom<ChunkUploadResponse> for UploadOutcome {
    type Error = UploadError;

    fn try_from(response: ChunkUploadResponse) -> Result<Self, Self::Error> {
        if response.done {
            let id = response
                .id
                .ok_or_else(|| UploadError::MalformedResponse("done without an id".into()))?;
            let mime_type = response.mime_type.ok_or_else(|| {
                UploadError::MalformedResponse("done without a media type".into())
            })?;
            Ok(UploadOutcome::Done(DriveArtifact { id, mime_type }))
        } else {
            let next_start = response.start.ok_or_else(|| {
                UploadError::MalformedResponse("incomplete without a resume offset".into())
            })?;
            Ok(UploadOutcome::Continue { next_start })
        }
    }
}

// ============================================================================
// State Machine
// ============================================================================

/// States of one upload attempt. `Completed` and `Failed` are terminal.
#[derive(Debug)]
pub enum UploadState {
    /// Opening the resumable session
    Requesting,

    /// Transmitting byte ranges; `offset` is the next byte to send
    Uploading { session: UploadSession, offset: u64 },

    /// All bytes acknowledged
    Completed(DriveArtifact),

    /// Attempt aborted; carries the triggering error
    Failed(UploadError),
}

/// Whole-percent progress for an offset into a source of `total` bytes.
pub fn percent_complete(offset: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (offset.saturating_mul(100) / total) as u8
}

// ============================================================================
// Error Types
// ============================================================================

/// Upload driver error types
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("not signed in to Google Drive; connect your Google account and try again")]
    Unauthenticated,

    #[error("could not refresh Google credential ({0}); sign in again")]
    Auth(#[from] AuthError),

    #[error("invalid chunk range {start}..{end}: {reason}")]
    InvalidRange {
        start: u64,
        end: u64,
        reason: &'static str,
    },

    #[error("could not open upload source: {0}")]
    SourceUnavailable(#[source] std::io::Error),

    #[error("failed to read bytes {start}..{end} from source: {source}")]
    Source {
        start: u64,
        end: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("upload session did not advance past byte {offset}")]
    Stalled { offset: u64 },

    #[error("unrecognized upload response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

// ============================================================================
// Tests
// ============================================================================
