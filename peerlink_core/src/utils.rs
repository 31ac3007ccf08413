use std::path::Path;
use tokio::fs::{File, OpenOptions};

/// Longest file name we keep when writing to disk
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Name used when nothing usable survives sanitization
pub const FALLBACK_FILE_NAME: &str = "unknown_file";

const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reduce a client-supplied file name to a single safe path component.
///
/// Directory parts (either separator style) are dropped, control characters
/// removed, Windows device names and dot entries replaced by
/// [`FALLBACK_FILE_NAME`], and the result truncated to
/// [`MAX_FILENAME_LENGTH`] bytes keeping a short extension.
pub fn sanitize_file_name(file_name: &str) -> String {
    let last = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let clean: String = last.chars().filter(|c| !c.is_control()).collect();

    let is_reserved = RESERVED_NAMES
        .iter()
        .any(|r| clean.eq_ignore_ascii_case(r));
    if is_reserved || clean == "." || clean == ".." || clean.trim().is_empty() {
        return FALLBACK_FILE_NAME.to_string();
    }

    truncate_file_name(clean)
}

fn truncate_file_name(mut name: String) -> String {
    if name.len() <= MAX_FILENAME_LENGTH {
        return name;
    }

    if let Some(dot) = name.rfind('.') {
        let ext_len = name.len() - dot;
        if ext_len < 20 {
            let ext = name[dot..].to_string();
            name.truncate(floor_char_boundary(&name, MAX_FILENAME_LENGTH - ext_len));
            name.push_str(&ext);
            return name;
        }
    }

    name.truncate(floor_char_boundary(&name, MAX_FILENAME_LENGTH));
    name
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Create (or truncate) a file readable only by its owner (0o600 on Unix)
pub async fn create_secure_file(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

/// Format transfer speed from bytes and elapsed time
pub fn format_transfer_speed(bytes_transferred: u64, elapsed_secs: f64) -> String {
    if elapsed_secs <= 0.0 {
        return "instant".to_string();
    }

    let speed_bps = bytes_transferred as f64 / elapsed_secs;
    if speed_bps > 1_000_000.0 {
        format!("{:.2} MB/s", speed_bps / 1_000_000.0)
    } else if speed_bps > 1_000.0 {
        format!("{:.1} KB/s", speed_bps / 1_000.0)
    } else {
        format!("{:.0} B/s", speed_bps)
    }
}
