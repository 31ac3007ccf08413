//! One-shot listener: binds the share code as a TCP port, hands the file to
//! exactly one peer, then gives the port and the code back.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::error::ShareError;
use super::registry::{SessionRegistry, SessionState};
use super::sender::serve_peer;

/// How a listener finished
#[derive(Debug)]
pub enum ServeOutcome {
    /// A peer connected; `transfer` resolves to the payload bytes sent
    Served {
        peer: SocketAddr,
        transfer: JoinHandle<Result<u64, ShareError>>,
    },
    /// The cancellation token fired before any peer arrived
    Cancelled,
    /// No peer arrived within the accept timeout
    TimedOut,
}

pub struct OneShotListener {
    code: u16,
    file_path: PathBuf,
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
}

impl OneShotListener {
    /// Resolve `code` and bind `host:code`.
    ///
    /// An unknown code fails before any socket is touched. A bind failure
    /// releases the session so the code does not linger unusable.
    pub async fn bind(
        registry: Arc<SessionRegistry>,
        code: u16,
        host: IpAddr,
    ) -> Result<Self, ShareError> {
        let file_path = match registry.resolve(code).await {
            Ok(path) => path,
            Err(e) => {
                warn!("No file associated with code {}", code);
                return Err(e);
            }
        };

        let listener = match TcpListener::bind(SocketAddr::new(host, code)).await {
            Ok(listener) => listener,
            Err(source) => {
                error!("Error starting file server on port {}: {}", code, source);
                registry.release(code).await;
                return Err(ShareError::BindConflict { code, source });
            }
        };

        registry.set_state(code, SessionState::Listening).await;
        info!("Serving file '{}' on port {}", file_path.display(), code);

        Ok(Self {
            code,
            file_path,
            listener,
            registry,
        })
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Wait for one peer and spawn the transfer.
    ///
    /// Whatever the outcome, the listening socket is closed and the session
    /// released before this returns.
    pub async fn serve(
        self,
        cancel: CancellationToken,
        accept_timeout: Option<Duration>,
    ) -> Result<ServeOutcome, ShareError> {
        let Self {
            code,
            file_path,
            listener,
            registry,
        } = self;

        let accepted = tokio::select! {
            _ = cancel.cancelled() => None,
            res = accept_within(&listener, accept_timeout) => Some(res),
        };
        drop(listener);
        registry.release(code).await;

        match accepted {
            None => {
                info!("Share {} cancelled before a peer connected", code);
                Ok(ServeOutcome::Cancelled)
            }
            Some(None) => {
                warn!("No peer connected to share {} in time", code);
                Ok(ServeOutcome::TimedOut)
            }
            Some(Some(Err(e))) => {
                error!("Accept failed on port {}: {}", code, e);
                Err(ShareError::Io(e))
            }
            Some(Some(Ok((stream, peer)))) => {
                info!("Client connected to share {}: {}", code, peer);
                let transfer =
                    tokio::spawn(async move { serve_peer(stream, peer, &file_path).await });
                Ok(ServeOutcome::Served { peer, transfer })
            }
        }
    }
}

/// `None` when the timeout elapses first
async fn accept_within(
    listener: &TcpListener,
    timeout: Option<Duration>,
) -> Option<std::io::Result<(TcpStream, SocketAddr)>> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, listener.accept()).await.ok(),
        None => Some(listener.accept().await),
    }
}

/// Bind and serve in one call
pub async fn serve_session(
    registry: Arc<SessionRegistry>,
    code: u16,
    host: IpAddr,
    cancel: CancellationToken,
    accept_timeout: Option<Duration>,
) -> Result<ServeOutcome, ShareError> {
    OneShotListener::bind(registry, code, host)
        .await?
        .serve(cancel, accept_timeout)
        .await
}
