//! Session bookkeeping: share code -> offered file.
//!
//! Allocation is a single check-and-insert under the write lock, so
//! concurrent offers never hand out the same code. The code space is finite;
//! a full registry reports [`ShareError::CodeSpaceExhausted`] instead of
//! retrying forever.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use super::code::generate_code_in;
use super::constants::{CODE_MAX, CODE_MIN, MAX_RANDOM_ATTEMPTS};
use super::error::ShareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered, no listener yet
    Offered,
    /// A one-shot listener holds the code's port
    Listening,
}

/// A file offered under a share code
#[derive(Debug, Clone)]
pub struct ShareSession {
    pub file_path: PathBuf,
    pub state: SessionState,
    pub created_at: Instant,
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<u16, ShareSession>>,
    range: RangeInclusive<u16>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Registry over the 4-digit code space
    pub fn new() -> Self {
        Self::with_code_range(CODE_MIN..=CODE_MAX)
    }

    /// Registry drawing codes from a custom range
    ///
    /// # Panics
    /// If `range` is empty.
    pub fn with_code_range(range: RangeInclusive<u16>) -> Self {
        assert!(!range.is_empty(), "share code range must not be empty");
        Self {
            sessions: RwLock::new(HashMap::new()),
            range,
        }
    }

    /// Total number of codes this registry can hand out
    pub fn capacity(&self) -> usize {
        usize::from(*self.range.end() - *self.range.start()) + 1
    }

    /// Register `file_path` under a fresh code and return the code
    pub async fn offer(&self, file_path: impl Into<PathBuf>) -> Result<u16, ShareError> {
        let file_path = file_path.into();
        let capacity = self.capacity();
        let mut sessions = self.sessions.write().await;

        if sessions.len() >= capacity {
            return Err(ShareError::CodeSpaceExhausted(capacity));
        }

        let code = self
            .pick_free_code(&sessions)
            .ok_or(ShareError::CodeSpaceExhausted(capacity))?;

        debug!("Offered {} under code {}", file_path.display(), code);
        sessions.insert(
            code,
            ShareSession {
                file_path,
                state: SessionState::Offered,
                created_at: Instant::now(),
            },
        );
        Ok(code)
    }

    fn pick_free_code(&self, sessions: &HashMap<u16, ShareSession>) -> Option<u16> {
        for _ in 0..MAX_RANDOM_ATTEMPTS {
            let candidate = generate_code_in(self.range.clone());
            if !sessions.contains_key(&candidate) {
                return Some(candidate);
            }
        }

        // Dense registry: walk the whole range once from a random start
        let (lo, hi) = (*self.range.start(), *self.range.end());
        let start = generate_code_in(self.range.clone());
        (start..=hi)
            .chain(lo..start)
            .find(|code| !sessions.contains_key(code))
    }

    /// Look up the file offered under `code`
    pub async fn resolve(&self, code: u16) -> Result<PathBuf, ShareError> {
        self.sessions
            .read()
            .await
            .get(&code)
            .map(|s| s.file_path.clone())
            .ok_or(ShareError::SessionNotFound(code))
    }

    pub async fn contains(&self, code: u16) -> bool {
        self.sessions.read().await.contains_key(&code)
    }

    pub async fn state(&self, code: u16) -> Option<SessionState> {
        self.sessions.read().await.get(&code).map(|s| s.state)
    }

    /// Returns false if `code` is not registered
    pub async fn set_state(&self, code: u16, state: SessionState) -> bool {
        match self.sessions.write().await.get_mut(&code) {
            Some(session) => {
                session.state = state;
                true
            }
            None => false,
        }
    }

    /// Remove a session, freeing its code
    pub async fn release(&self, code: u16) -> Option<ShareSession> {
        let removed = self.sessions.write().await.remove(&code);
        if removed.is_some() {
            debug!("Released code {}", code);
        }
        removed
    }

    /// Drop sessions older than `ttl` that no listener is holding.
    /// Returns how many were removed.
    pub async fn purge_expired(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.state == SessionState::Listening || s.created_at.elapsed() < ttl);
        let purged = before - sessions.len();
        if purged > 0 {
            debug!("Purged {} expired sessions", purged);
        }
        purged
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Codes still available for new offers
    pub async fn remaining(&self) -> usize {
        self.capacity() - self.len().await
    }
}
