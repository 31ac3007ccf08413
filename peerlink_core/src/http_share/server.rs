//! HTTP server for file sharing
//!
//! `POST /upload`, `GET /download/{id}` and `POST /share/{id}` behind a
//! permissive CORS layer.

use crate::config::AppConfig;
use crate::share::SessionRegistry;
use crate::uploads::UploadStore;
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use super::handlers::{download_handler, not_found_handler, share_handler, upload_handler};

/// Shared state behind every route
pub struct AppState {
    pub config: AppConfig,
    pub uploads: UploadStore,
    pub sessions: Arc<SessionRegistry>,
    /// Cancelled on shutdown; share listeners wait on child tokens
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self::with_registry(config, Arc::new(SessionRegistry::new()))
    }

    pub fn with_registry(config: AppConfig, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            uploads: UploadStore::new(config.upload_dir.clone()),
            config,
            sessions,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build the axum router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/upload", post(upload_handler))
        .route("/download/{id}", get(download_handler))
        .route("/share/{id}", post(share_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

/// Serve until `cancel_token` fires
pub async fn start_http_server(
    addr: SocketAddr,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
) -> Result<()> {
    let router = create_router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server on {}", addr))?;

    tracing::info!("API server started on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_share::{ShareResponse, UploadResponse};
    use crate::share::fetch;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use std::net::{IpAddr, Ipv4Addr};
    use tower::ServiceExt;

    const BOUNDARY: &str = "----peerlinkTestBoundary";

    fn test_config(dir: &std::path::Path) -> AppConfig {
        AppConfig {
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            upload_dir: dir.to_path_buf(),
            max_upload_bytes: 1024 * 1024,
            ..AppConfig::default()
        }
    }

    fn test_state(dir: &std::path::Path) -> Arc<AppState> {
        Arc::new(AppState::with_registry(
            test_config(dir),
            Arc::new(SessionRegistry::with_code_range(40000..=49999)),
        ))
    }

    /// State whose registry can only hand out `port`
    fn single_code_state(dir: &std::path::Path, port: u16, ttl_secs: u64) -> Arc<AppState> {
        let config = AppConfig {
            session_ttl_secs: ttl_secs,
            ..test_config(dir)
        };
        Arc::new(AppState::with_registry(
            config,
            Arc::new(SessionRegistry::with_code_range(port..=port)),
        ))
    }

    async fn free_port() -> u16 {
        let socket = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        socket.local_addr().unwrap().port()
    }

    async fn share(router: &Router, id: &str) -> axum::response::Response {
        router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/share/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    fn multipart_body(name: &str, content: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
            BOUNDARY, name
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn upload(router: &Router, name: &str, content: &[u8]) -> String {
        let response = router
            .clone()
            .oneshot(upload_request(multipart_body(name, content)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let parsed: UploadResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        parsed.id
    }

    #[tokio::test]
    async fn test_upload_then_download() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(dir.path()));
        let content = b"%PDF-1.7\r\n--not-the-boundary\x00\x01";

        let id = upload(&router, "report.pdf", content).await;

        let response = router
            .oneshot(
                Request::builder()
                    .uri(format!("/download/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["content-type"], "application/octet-stream");
        let disposition = headers["content-disposition"].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\""));
        assert!(disposition.ends_with("_report.pdf\""));
        assert_eq!(body_bytes(response).await, content);
    }

    #[tokio::test]
    async fn test_upload_requires_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(dir.path()));

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_bytes(response).await,
            b"Bad Request: Content-Type must be multipart/form-data"
        );
    }

    #[tokio::test]
    async fn test_upload_unparsable_body() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(dir.path()));

        let response = router
            .oneshot(upload_request(b"no parts here".to_vec()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_bytes(response).await,
            b"Bad Request: Could not parse file content"
        );
    }

    #[tokio::test]
    async fn test_upload_over_limit() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(dir.path()));
        let big = vec![7u8; 2 * 1024 * 1024];

        let response = router
            .oneshot(upload_request(multipart_body("big.bin", &big)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_download_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(dir.path()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/download/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(response).await, b"File not found");
    }

    #[tokio::test]
    async fn test_fallback_and_wrong_method() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(dir.path()));

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(response).await, b"Not Found");

        let response = router
            .oneshot(Request::builder().uri("/upload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(dir.path()));

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/download/x")
                    .header("origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");

        let preflight = router
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/upload")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(preflight.status().is_success());
        let methods = preflight.headers()["access-control-allow-methods"]
            .to_str()
            .unwrap();
        assert!(methods.contains("POST"));
        assert!(methods.contains("OPTIONS"));
    }

    #[tokio::test]
    async fn test_share_upload_over_code() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let router = create_router(state.clone());
        let content: Vec<u8> = (0..20_000u32).map(|i| (i * 7 % 256) as u8).collect();

        let id = upload(&router, "report.pdf", &content).await;

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/share/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ShareResponse { code } = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!((40000..=49999).contains(&code));

        let downloads = tempfile::tempdir().unwrap();
        let received = fetch(
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), code),
            downloads.path(),
        )
        .await
        .unwrap();

        assert!(received.file_name.ends_with("_report.pdf"));
        assert_eq!(tokio::fs::read(&received.path).await.unwrap(), content);
        assert!(!state.sessions.contains(code).await);

        state.shutdown.cancel();
    }

    #[tokio::test]
    async fn test_share_unknown_upload() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(dir.path()));

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/share/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_share_busy_port_then_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = blocker.local_addr().unwrap().port();
        let state = single_code_state(dir.path(), port, 3600);
        let router = create_router(state.clone());
        let id = upload(&router, "a.txt", b"contents").await;

        // Every draw lands on the held port
        let response = share(&router, &id).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.sessions.is_empty().await);

        drop(blocker);
        let response = share(&router, &id).await;
        assert_eq!(response.status(), StatusCode::OK);
        let ShareResponse { code } = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(code, port);

        // The only code is held by the waiting listener
        let response = share(&router, &id).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_bytes(response).await,
            b"Service Unavailable: no free share codes"
        );

        state.shutdown.cancel();
    }

    #[tokio::test]
    async fn test_share_purges_expired_offer() {
        let dir = tempfile::tempdir().unwrap();
        let port = free_port().await;
        let state = single_code_state(dir.path(), port, 0);
        let router = create_router(state.clone());
        let id = upload(&router, "a.txt", b"contents").await;

        // Offered but never listened for
        let stale = state.sessions.offer(dir.path().join("stale")).await.unwrap();
        assert_eq!(stale, port);
        assert_eq!(state.sessions.remaining().await, 0);

        let response = share(&router, &id).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            state.sessions.state(port).await,
            Some(crate::share::SessionState::Listening)
        );
        assert_eq!(
            state.sessions.resolve(port).await.unwrap(),
            state.uploads.path(&id).await.unwrap()
        );

        state.shutdown.cancel();
    }
}
