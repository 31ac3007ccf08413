//! Minimal `multipart/form-data` parser for single-file uploads.
//!
//! All marker searches run over the raw body bytes; only the bounded
//! filename and content-type slices are decoded as text, so the payload is
//! never re-encoded. Only the first file part is extracted.

use bytes::Bytes;
use thiserror::Error;

/// Content type reported when the file part carries none
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const FILENAME_MARKER: &[u8] = b"filename=\"";
const CONTENT_TYPE_MARKER: &[u8] = b"content-type:";
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("Content-Type is not multipart/form-data")]
    NotMultipart,
    #[error("missing multipart boundary")]
    MissingBoundary,
    #[error("no file part found")]
    MissingFilename,
    #[error("unterminated filename in Content-Disposition")]
    UnterminatedFilename,
    #[error("part headers are not followed by a blank line")]
    MissingHeaderTerminator,
    #[error("part header is not valid UTF-8")]
    InvalidHeaderEncoding,
    #[error("no boundary after the file content")]
    BoundaryNotFound,
    #[error("file content is empty")]
    EmptyPayload,
}

/// The first file part of an upload body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartResult {
    pub filename: String,
    pub content_type: String,
    pub file_content: Bytes,
}

/// Extract the boundary token from a `Content-Type` header value such as
/// `multipart/form-data; boundary=----abc`
pub fn boundary_from_content_type(value: &str) -> Result<String, MultipartError> {
    let mut params = value.split(';');
    let mime = params.next().unwrap_or_default().trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return Err(MultipartError::NotMultipart);
    }

    params
        .filter_map(|p| p.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
        .ok_or(MultipartError::MissingBoundary)
}

/// Parse `body` and return its first file part
pub fn parse(body: &[u8], boundary: &str) -> Result<MultipartResult, MultipartError> {
    if boundary.is_empty() {
        return Err(MultipartError::MissingBoundary);
    }
    let delimiter = format!("\r\n--{}", boundary).into_bytes();
    let closing = format!("\r\n--{}--", boundary).into_bytes();

    let name_start = find(body, FILENAME_MARKER, 0).ok_or(MultipartError::MissingFilename)?
        + FILENAME_MARKER.len();
    let line_end = find(body, CRLF, name_start).unwrap_or(body.len());
    let name_end = find(&body[..line_end], b"\"", name_start)
        .ok_or(MultipartError::UnterminatedFilename)?;

    let header_end =
        find(body, HEADER_TERMINATOR, name_end).ok_or(MultipartError::MissingHeaderTerminator)?;
    // The blank line must belong to this part, not a later one
    if find(&body[..header_end], &delimiter, name_end).is_some() {
        return Err(MultipartError::MissingHeaderTerminator);
    }
    let content_start = header_end + HEADER_TERMINATOR.len();

    // The part's header block runs from its opening delimiter to the blank line
    let part_start = rfind(&body[..name_start], &delimiter[CRLF.len()..])
        .map(|p| p + delimiter.len() - CRLF.len())
        .unwrap_or(0);
    let headers = &body[part_start..header_end];

    let filename = decode(&body[name_start..name_end])?;
    let content_type = header_value(headers, CONTENT_TYPE_MARKER)?
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let content_end = payload_end(body, content_start, &closing, &delimiter)
        .ok_or(MultipartError::BoundaryNotFound)?;
    if content_end <= content_start {
        return Err(MultipartError::EmptyPayload);
    }

    Ok(MultipartResult {
        filename,
        content_type,
        file_content: Bytes::copy_from_slice(&body[content_start..content_end]),
    })
}

/// Closing boundary, or a delimiter line opening another part, whichever
/// comes first; a bare delimiter as a last resort
fn payload_end(body: &[u8], from: usize, closing: &[u8], delimiter: &[u8]) -> Option<usize> {
    let closing_at = find(body, closing, from);

    let mut next_part = None;
    let mut pos = from;
    while let Some(at) = find(body, delimiter, pos) {
        if body[at + delimiter.len()..].starts_with(CRLF) {
            next_part = Some(at);
            break;
        }
        pos = at + 1;
    }

    [closing_at, next_part]
        .into_iter()
        .flatten()
        .min()
        .or_else(|| find(body, delimiter, from))
}

/// Value of a header (case-insensitive name) inside a part's header block
fn header_value(headers: &[u8], name: &[u8]) -> Result<Option<String>, MultipartError> {
    let Some(at) = headers
        .windows(name.len())
        .position(|w| w.eq_ignore_ascii_case(name))
    else {
        return Ok(None);
    };

    let value_start = at + name.len();
    let value_end = find(headers, CRLF, value_start).unwrap_or(headers.len());
    decode(&headers[value_start..value_end]).map(|v| Some(v.trim().to_string()))
}

fn decode(bytes: &[u8]) -> Result<String, MultipartError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| MultipartError::InvalidHeaderEncoding)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
