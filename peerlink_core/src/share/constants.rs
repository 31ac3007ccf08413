/// Smallest share code (inclusive)
pub const CODE_MIN: u16 = 1000;

/// Largest share code (inclusive)
pub const CODE_MAX: u16 = 9999;

/// Random candidates tried before the registry scans for a free code
pub const MAX_RANDOM_ATTEMPTS: usize = 64;

/// Chunk size for streaming a file to a peer (4KB)
pub const CHUNK_SIZE: usize = 4096;

/// Prefix of the single header line sent before the file bytes
pub const HEADER_PREFIX: &str = "Filename: ";

/// Longest header line a receiver will buffer
pub const MAX_HEADER_LEN: usize = 4096;
