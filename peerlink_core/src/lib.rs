//! PeerLink core: short-code file sharing over one-shot TCP listeners,
//! multipart upload parsing and the HTTP surface around them.

pub mod config;
pub mod http_share;
pub mod multipart;
pub mod share;
pub mod uploads;
pub mod utils;

pub use config::AppConfig;
pub use multipart::{MultipartError, MultipartResult};
pub use share::{
    OneShotListener, ReceivedFile, ServeOutcome, SessionRegistry, SessionState, ShareError,
    ShareSession,
};
pub use uploads::UploadStore;

