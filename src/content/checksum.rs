//! MD5 digests for file content and path strings
//!
//! Files are read in fixed-size blocks so arbitrarily large files hash in
//! constant memory. Digests are returned as 32-char lowercase hex strings.

use crate::error::{HashError, HashResult};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Default read block size (2 MiB)
pub const DEFAULT_BLOCK_SIZE: usize = 2 * 1024 * 1024;

/// MD5 of the empty input
pub const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

/// Hash a file's content in `block_size` chunks
///
/// # Example
///
/// ```no_run
/// use examinator::content::checksum::{hash_file, DEFAULT_BLOCK_SIZE};
///
/// let digest = hash_file("Cargo.toml", DEFAULT_BLOCK_SIZE).unwrap();
/// assert_eq!(digest.len(), 32);
/// ```
pub fn hash_file(path: impl AsRef<Path>, block_size: usize) -> HashResult<String> {
    let path = path.as_ref();
    let read_err = |source| HashError::Read {
        path: path.to_path_buf(),
        source,
    };

    if path.is_dir() {
        return Err(HashError::IsDirectory {
            path: path.to_path_buf(),
        });
    }

    let mut file = File::open(path).map_err(read_err)?;
    let mut context = md5::Context::new();
    let mut block = vec![0u8; block_size.max(1)];

    loop {
        match file.read(&mut block) {
            Ok(0) => break,
            Ok(n) => context.consume(&block[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_err(e)),
        }
    }

    Ok(format!("{:x}", context.compute()))
}

/// MD5 of a UTF-8 string as hex
pub fn hash_utf8(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}
