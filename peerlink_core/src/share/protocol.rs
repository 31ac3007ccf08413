//! Wire format of the code-based transfer.
//!
//! ```text
//! Filename: <name>\n
//! <raw file bytes until the sender closes the connection>
//! ```
//!
//! There is no length prefix and no end marker.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::constants::{HEADER_PREFIX, MAX_HEADER_LEN};
use super::error::ShareError;

/// Build the header line for `file_name`.
///
/// Names containing a line break would corrupt the framing and are rejected.
pub fn encode_header(file_name: &str) -> Result<Vec<u8>, ShareError> {
    if file_name.is_empty() || file_name.contains(['\n', '\r']) {
        return Err(ShareError::InvalidFileName(file_name.to_string()));
    }
    Ok(format!("{}{}\n", HEADER_PREFIX, file_name).into_bytes())
}

/// Parse one header line (with or without its trailing newline)
pub fn decode_header(line: &[u8]) -> Result<String, ShareError> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let name = line
        .strip_prefix(HEADER_PREFIX.as_bytes())
        .ok_or(ShareError::MalformedHeader)?;

    let name = std::str::from_utf8(name).map_err(|_| ShareError::MalformedHeader)?;
    if name.is_empty() {
        return Err(ShareError::MalformedHeader);
    }
    Ok(name.to_string())
}

/// Read the header line from the front of a stream, leaving the reader
/// positioned at the first payload byte
pub async fn read_header<R>(reader: &mut R) -> Result<String, ShareError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut limited = reader.take(MAX_HEADER_LEN as u64);
    limited.read_until(b'\n', &mut line).await?;

    if line.last() != Some(&b'\n') {
        return Err(ShareError::MalformedHeader);
    }
    decode_header(&line)
}
