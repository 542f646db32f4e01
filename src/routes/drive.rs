//! Drive Relay Routes
//!
//! Same-origin endpoints in front of the Google Drive API.
//!
//! Endpoints:
//! - POST /google-drive - dispatch an INIT or UPLOAD operation upstream
//! - GET /google-drive?id={id}[&meta=true] - metadata or content pass-through

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::relay::{ChunkUploadRequest, InitResponse, RelayError, UploadInit};
use crate::state::AppState;

// ============================================================================
// Error Response
// ============================================================================

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            // Upstream rejections are surfaced verbatim so failures are
            // diagnosable without developer tooling.
            RelayError::Upstream { body, .. } => (status, body).into_response(),
            RelayError::InvalidOperation(operation) => {
                (status, format!("Invalid operation {operation}")).into_response()
            }
            RelayError::BadRequest(message) => (status, message).into_response(),
            other => {
                let body = Json(ErrorResponse {
                    error: other.to_string(),
                    code: other.code().to_string(),
                });
                (status, body).into_response()
            }
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Create the drive relay router
pub fn router() -> Router<AppState> {
    Router::new().route("/google-drive", post(relay_operation).get(fetch_file))
}

// ============================================================================
// Handlers
// ============================================================================

/// Envelope for POSTed operations: `{ operation, data }`.
#[derive(Deserialize)]
struct OperationEnvelope {
    operation: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// POST /google-drive
///
/// Dispatches on `operation`. INIT opens a resumable session and returns its
/// location; UPLOAD forwards one byte range and returns either the finished
/// artifact or the next offset to send. Anything else is a 400.
async fn relay_operation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(envelope): Json<OperationEnvelope>,
) -> Result<Response, RelayError> {
    match envelope.operation.as_str() {
        "INIT" => {
            let mut init: UploadInit = serde_json::from_value(envelope.data)
                .map_err(|e| RelayError::BadRequest(e.to_string()))?;
            let token = bearer_from(&headers)?;

            // No explicit target folder: uploads land in the configured one.
            if init.folder_id.is_none() {
                let folder = &state.config().drive.upload_folder;
                let id = state.relay().find_or_create_folder(&token, folder).await?;
                init.folder_id = Some(id);
            }

            tracing::info!(
                name = %init.name,
                content_length = init.content_length,
                folder = init.folder_id.as_deref().unwrap_or(""),
                "INIT upload session"
            );

            let location = state.relay().open_upload(&token, &init).await?;
            Ok(Json(InitResponse { location }).into_response())
        }

        "UPLOAD" => {
            let request: ChunkUploadRequest = serde_json::from_value(envelope.data)
                .map_err(|e| RelayError::BadRequest(e.to_string()))?;
            if request.chunk.len() as u64 != request.content_length {
                return Err(RelayError::BadRequest(format!(
                    "chunk carries {} bytes but contentLength is {}",
                    request.chunk.len(),
                    request.content_length
                )));
            }

            let response = state
                .relay()
                .put_chunk(&request.uri, &request.chunk, &request.content_range)
                .await?;

            tracing::debug!(
                content_range = %request.content_range,
                done = response.done,
                "UPLOAD chunk relayed"
            );

            Ok(Json(response).into_response())
        }

        other => Err(RelayError::InvalidOperation(other.to_string())),
    }
}

#[derive(Deserialize)]
struct FetchQuery {
    id: Option<String>,
    meta: Option<String>,
}

/// GET /google-drive?id={id}[&meta=true]
///
/// Pass-through fetch: metadata JSON with `meta`, raw content otherwise.
async fn fetch_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FetchQuery>,
) -> Result<Response, RelayError> {
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RelayError::BadRequest("id parameter is required".to_string()))?;
    let token = bearer_from(&headers)?;

    if query.meta.is_some() {
        let metadata = state.relay().file_metadata(&token, &id).await?;
        return Ok(Json(metadata).into_response());
    }

    let (content_type, bytes) = state.relay().download(&token, &id).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        bytes,
    )
        .into_response())
}

// ============================================================================
// Helpers
// ============================================================================

/// Extract the caller's bearer credential. Accepts both a bare token and the
/// `Bearer ` prefixed form.
fn bearer_from(headers: &HeaderMap) -> Result<String, RelayError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim())
        .unwrap_or("");

    if token.is_empty() {
        return Err(RelayError::Unauthorized);
    }
    Ok(token.to_string())
}

// ============================================================================
// Tests
// ============================================================================
