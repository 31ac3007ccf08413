use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::info;

use super::error::ShareError;
use super::protocol::read_header;
use crate::utils::{create_secure_file, sanitize_file_name};

/// A file pulled from a share
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    /// Name announced by the sender, after sanitization
    pub file_name: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Read a transfer from `stream` into `dest_dir`.
///
/// Everything after the header line, up to EOF, is the file content.
pub async fn receive_file<R>(stream: R, dest_dir: &Path) -> Result<ReceivedFile, ShareError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let announced = read_header(&mut reader).await?;
    let file_name = sanitize_file_name(&announced);

    tokio::fs::create_dir_all(dest_dir).await?;
    let path = dest_dir.join(&file_name);
    let mut file = create_secure_file(&path).await?;

    let bytes = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;

    Ok(ReceivedFile {
        file_name,
        path,
        bytes,
    })
}

/// Connect to a share at `addr` (host + code) and download it
pub async fn fetch(addr: SocketAddr, dest_dir: &Path) -> Result<ReceivedFile, ShareError> {
    let stream = TcpStream::connect(addr).await?;
    let received = receive_file(stream, dest_dir).await?;
    info!(
        "Received '{}' from {} ({} bytes)",
        received.file_name, addr, received.bytes
    );
    Ok(received)
}
