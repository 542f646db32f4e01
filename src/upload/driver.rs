//! Upload Driver
//!
//! State machine for one resumable upload attempt:
//!
//! 1. `Requesting`: open a session for the file's declared type/length/name
//! 2. `Uploading`: transmit fixed 256 KiB byte ranges, resuming from the
//!    offset the backend reports after a partial write
//! 3. `Completed` / `Failed`: terminal, reported to the observer once
//!
//! Chunks are strictly sequential: the next range's start depends on the
//! previous response, so no two submissions are ever in flight at once.
//! There is no retry, no backoff, and no cancellation; any failure
//! short-circuits the attempt and the user re-initiates.

use std::path::Path;
use std::sync::Arc;

use crate::auth::SessionClient;
use crate::relay::{ChunkUploadRequest, UploadInit};

use super::source::{ByteSource, FileSource};
use super::transport::ChunkTransport;
use super::types::{
    percent_complete, ChunkRange, DriveArtifact, UploadError, UploadOutcome, UploadSession,
    UploadState, CHUNK_MAX,
};

// ============================================================================
// Observer
// ============================================================================

/// Receives progress and terminal notifications for an upload attempt.
/// Implementations must not block; they are invoked inline between chunks.
pub trait UploadObserver: Send + Sync {
    /// Entered an uploading step; `percent` is `floor(100 * offset / total)`.
    fn on_progress(&self, _percent: u8) {}

    /// Terminal: all bytes acknowledged.
    fn on_completed(&self, _artifact: &DriveArtifact) {}

    /// Terminal: attempt aborted.
    fn on_failed(&self, _error: &UploadError) {}
}

/// Observer that ignores every notification.
pub struct NullObserver;

impl UploadObserver for NullObserver {}

// ============================================================================
// Driver
// ============================================================================

/// Drives one upload attempt at a time over a [`ChunkTransport`].
pub struct UploadDriver<T: ChunkTransport> {
    transport: T,
    session_client: Arc<SessionClient>,
    observer: Arc<dyn UploadObserver>,
}

impl<T: ChunkTransport> UploadDriver<T> {
    pub fn new(transport: T, session_client: Arc<SessionClient>) -> Self {
        Self {
            transport,
            session_client,
            observer: Arc::new(NullObserver),
        }
    }

    pub fn with_observer(
        transport: T,
        session_client: Arc<SessionClient>,
        observer: Arc<dyn UploadObserver>,
    ) -> Self {
        Self {
            transport,
            session_client,
            observer,
        }
    }

    /// Upload a file from disk, deriving the name from the path and the
    /// content type from the file extension.
    pub async fn upload_path(
        &self,
        path: &Path,
        folder_id: Option<&str>,
    ) -> Result<DriveArtifact, UploadError> {
        let mut source = FileSource::open(path)
            .await
            .map_err(UploadError::SourceUnavailable)?;

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("untitled");
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        self.upload(&mut source, name, &content_type, folder_id).await
    }

    /// Run one upload attempt to completion or failure.
    pub async fn upload(
        &self,
        source: &mut dyn ByteSource,
        name: &str,
        content_type: &str,
        folder_id: Option<&str>,
    ) -> Result<DriveArtifact, UploadError> {
        let total = source.len();
        let init = UploadInit {
            content_type: content_type.to_string(),
            content_length: total,
            name: name.to_string(),
            folder_id: folder_id.map(str::to_string),
        };

        tracing::info!(name, total, "Starting Drive upload");

        let mut state = UploadState::Requesting;
        loop {
            state = match state {
                UploadState::Requesting => match self.begin(&init).await {
                    Ok(location) => UploadState::Uploading {
                        session: UploadSession {
                            location,
                            total_length: total,
                            content_type: init.content_type.clone(),
                            file_name: init.name.clone(),
                        },
                        offset: 0,
                    },
                    Err(error) => UploadState::Failed(error),
                },

                UploadState::Uploading { session, offset } => {
                    self.observer.on_progress(percent_complete(offset, total));

                    match self.send_range(source, &session, offset).await {
                        // Offsets must strictly increase or the loop would
                        // resubmit the same range forever.
                        Ok(UploadOutcome::Continue { next_start }) if next_start <= offset => {
                            UploadState::Failed(UploadError::Stalled { offset })
                        }
                        // The backend cannot have persisted bytes it was
                        // never sent.
                        Ok(UploadOutcome::Continue { next_start }) if next_start > total => {
                            UploadState::Failed(UploadError::MalformedResponse(format!(
                                "resume offset {next_start} beyond source length {total}"
                            )))
                        }
                        Ok(UploadOutcome::Continue { next_start }) => UploadState::Uploading {
                            session,
                            offset: next_start,
                        },
                        Ok(UploadOutcome::Done(artifact)) => UploadState::Completed(artifact),
                        Err(error) => UploadState::Failed(error),
                    }
                }

                UploadState::Completed(artifact) => {
                    tracing::info!(file_id = %artifact.id, name, "Drive upload complete");
                    self.observer.on_completed(&artifact);
                    return Ok(artifact);
                }

                UploadState::Failed(error) => {
                    tracing::warn!(name, error = %error, "Drive upload failed");
                    self.observer.on_failed(&error);
                    return Err(error);
                }
            };
        }
    }

    // ========================================================================
    // Steps
    // ========================================================================

    /// Resolve a bearer credential for one network call. The credential is
    /// never cached here; the session client owns freshness.
    async fn bearer(&self) -> Result<String, UploadError> {
        match self.session_client.bearer_token().await? {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(UploadError::Unauthenticated),
        }
    }

    async fn begin(&self, init: &UploadInit) -> Result<String, UploadError> {
        let token = self.bearer().await?;
        Ok(self.transport.open_session(&token, init).await?)
    }

    async fn send_range(
        &self,
        source: &mut dyn ByteSource,
        session: &UploadSession,
        offset: u64,
    ) -> Result<UploadOutcome, UploadError> {
        let total = session.total_length;
        let end = (offset + CHUNK_MAX).min(total);

        let bytes = source
            .read_range(offset, end)
            .await
            .map_err(|source| UploadError::Source {
                start: offset,
                end,
                source,
            })?;
        let range = ChunkRange::new(offset, end, bytes)?;

        let request = ChunkUploadRequest {
            content_length: range.len(),
            content_range: range.content_range(total),
            uri: session.location.clone(),
            chunk: range.into_bytes(),
        };

        tracing::debug!(
            file_name = %session.file_name,
            content_range = %request.content_range,
            "Submitting chunk"
        );

        let token = self.bearer().await?;
        let response = self.transport.send_chunk(&token, &request).await?;
        UploadOutcome::try_from(response)
    }
}

// ============================================================================
// Tests
// ============================================================================
