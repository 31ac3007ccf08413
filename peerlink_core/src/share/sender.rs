use std::net::SocketAddr;
use std::path::Path;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, info};

use super::constants::CHUNK_SIZE;
use super::error::ShareError;
use super::protocol::encode_header;
use crate::utils::format_transfer_speed;

/// Write the header line and the file's bytes to `stream`.
///
/// The file is opened before anything is written, so a missing file leaves
/// the stream untouched. Returns the number of payload bytes sent.
pub async fn send_file<W>(stream: &mut W, file_path: &Path) -> Result<u64, ShareError>
where
    W: AsyncWrite + Unpin,
{
    let file_name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ShareError::InvalidFileName(file_path.display().to_string()))?;
    let header = encode_header(file_name)?;

    let mut file = File::open(file_path).await?;
    stream.write_all(&header).await?;

    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut sent: u64 = 0;
    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        stream.write_all(&buffer[..n]).await?;
        sent += n as u64;
    }

    stream.flush().await?;
    Ok(sent)
}

/// Stream one file to an accepted peer, then close the connection whatever
/// the outcome
pub async fn serve_peer(
    mut stream: TcpStream,
    peer: SocketAddr,
    file_path: &Path,
) -> Result<u64, ShareError> {
    let start = Instant::now();
    let result = send_file(&mut stream, file_path).await;

    match &result {
        Ok(sent) => info!(
            "File '{}' sent to {} ({} bytes, {})",
            file_path.display(),
            peer,
            sent,
            format_transfer_speed(*sent, start.elapsed().as_secs_f64())
        ),
        Err(e) => error!("Error sending file to {}: {}", peer, e),
    }

    if let Err(e) = stream.shutdown().await {
        debug!("Error closing connection to {}: {}", peer, e);
    }
    result
}
