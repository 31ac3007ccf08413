//! HTTP file sharing module
//!
//! Upload/download over HTTP, plus an endpoint that re-offers an upload
//! under a share code.

mod handlers;
pub mod server;

pub use handlers::{ShareResponse, UploadResponse};
pub use server::{AppState, create_router, start_http_server};
