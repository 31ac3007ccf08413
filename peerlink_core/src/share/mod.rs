//! Code-based file sharing over one-shot TCP listeners.
//!
//! This module provides:
//! - 4-digit share code generation
//! - A concurrent session registry (code -> file path)
//! - The one-shot listener/sender that streams a file behind a text header
//! - The peer-side receiver

pub mod code;
pub mod constants;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod receiver;
pub mod registry;
pub mod sender;

// Re-export public API
pub use code::generate_code;
pub use constants::{CHUNK_SIZE, CODE_MAX, CODE_MIN};
pub use error::ShareError;
pub use listener::{OneShotListener, ServeOutcome, serve_session};
pub use receiver::{ReceivedFile, fetch, receive_file};
pub use registry::{SessionRegistry, SessionState, ShareSession};
pub use sender::send_file;
