//! Content digests
//!
//! - Streaming MD5 of file content for duplicate detection
//! - MD5 of path strings, used as a stable record key

pub mod checksum;

pub use checksum::{hash_file, hash_utf8, DEFAULT_BLOCK_SIZE, EMPTY_MD5};
