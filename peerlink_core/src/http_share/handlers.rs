use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

use super::server::AppState;
use crate::multipart::{self, MultipartError};
use crate::share::{OneShotListener, ServeOutcome, ShareError};

const NOT_MULTIPART_BODY: &str = "Bad Request: Content-Type must be multipart/form-data";
const PARSE_FAILED_BODY: &str = "Bad Request: Could not parse file content";
const MAX_BIND_ATTEMPTS: usize = 8;

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareResponse {
    pub code: u16,
}

fn server_error(e: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Server error: {}", e),
    )
        .into_response()
}

/// POST /upload
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let boundary = match multipart::boundary_from_content_type(content_type) {
        Ok(b) => b,
        Err(MultipartError::NotMultipart) => {
            return (StatusCode::BAD_REQUEST, NOT_MULTIPART_BODY).into_response();
        }
        Err(e) => {
            warn!("Rejected upload: {}", e);
            return (StatusCode::BAD_REQUEST, PARSE_FAILED_BODY).into_response();
        }
    };

    let upload = match multipart::parse(&body, &boundary) {
        Ok(u) => u,
        Err(e) => {
            warn!("Rejected upload ({} bytes): {}", body.len(), e);
            return (StatusCode::BAD_REQUEST, PARSE_FAILED_BODY).into_response();
        }
    };

    match state.uploads.persist(&upload).await {
        Ok(id) => Json(UploadResponse { id }).into_response(),
        Err(e) => {
            error!("Error processing file upload: {}", e);
            server_error(e)
        }
    }
}

/// GET /download/{id}
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let Some(path) = state.uploads.path(&id).await else {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    };

    let file = match File::open(&path).await {
        Ok(f) => f,
        Err(e) => {
            error!("Cannot open upload {} at {}: {}", id, path.display(), e);
            return server_error(e);
        }
    };
    let len = match file.metadata().await {
        Ok(m) => m.len(),
        Err(e) => return server_error(e),
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    (
        [
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}

/// POST /share/{id}: offer an uploaded file under a share code and start
/// its one-shot listener
pub async fn share_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let Some(path) = state.uploads.path(&id).await else {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    };

    state.sessions.purge_expired(state.config.session_ttl()).await;

    let mut attempts = 0;
    let listener = loop {
        let code = match state.sessions.offer(&path).await {
            Ok(code) => code,
            Err(e @ ShareError::CodeSpaceExhausted(_)) => {
                warn!("Cannot share upload {}: {}", id, e);
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service Unavailable: no free share codes",
                )
                    .into_response();
            }
            Err(e) => return server_error(e),
        };

        match OneShotListener::bind(state.sessions.clone(), code, state.config.bind_host).await {
            Ok(l) => break l,
            // Port held by another process; draw another code
            Err(e @ ShareError::BindConflict { .. }) if attempts < MAX_BIND_ATTEMPTS => {
                attempts += 1;
                warn!("{}, retrying", e);
            }
            Err(e) => return server_error(e),
        }
    };
    let code = listener.code();

    let cancel = state.shutdown.child_token();
    let accept_timeout = state.config.accept_timeout();
    tokio::spawn(async move {
        if let Ok(ServeOutcome::Served { transfer, .. }) =
            listener.serve(cancel, accept_timeout).await
        {
            if let Err(e) = transfer.await {
                error!("Transfer task for code {} failed: {}", code, e);
            }
        }
    });

    info!("Upload {} shared under code {}", id, code);
    Json(ShareResponse { code }).into_response()
}

/// Handler for unmatched routes
pub async fn not_found_handler() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
