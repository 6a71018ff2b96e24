//! Filesystem entry types and path records
//!
//! A `PathRecord` is the unit of output: one per visited entry, built from
//! `lstat` metadata (symlinks are never followed). Records that hit an error
//! along the way are kept as partial records with `error` set.

use crate::content::hash_utf8;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{FileType, Metadata};
use std::path::Path;
use std::time::SystemTime;

/// Error note for records whose path was stored escaped
pub const NON_UTF8_PATH: &str = "path is not valid UTF-8; invalid bytes stored as \\xNN";

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (not followed)
    Symlink,
    /// Sockets, FIFOs, devices, or anything unclassified
    Other,
}

impl EntryKind {
    /// Classify from `lstat` file type
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    /// Check if this is a regular file
    pub fn is_file(&self) -> bool {
        *self == EntryKind::File
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryKind::Directory
    }

    /// Stable lowercase name used in exports
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Other => "other",
        }
    }

    /// Parse the export name back
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(EntryKind::File),
            "directory" => Some(EntryKind::Directory),
            "symlink" => Some(EntryKind::Symlink),
            "other" => Some(EntryKind::Other),
            _ => None,
        }
    }
}

/// One visited filesystem entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRecord {
    /// Absolute path
    pub path: String,

    /// MD5 of the path string
    pub path_hash: String,

    /// Entry type
    pub kind: EntryKind,

    /// Size in bytes (files only)
    pub size: Option<u64>,

    /// Last modification time
    pub modified: Option<DateTime<Utc>>,

    /// Last access time
    pub accessed: Option<DateTime<Utc>>,

    /// Creation time (not available on every platform)
    pub created: Option<DateTime<Utc>>,

    /// MD5 of file content (files only, when hashing is enabled)
    pub content_hash: Option<String>,

    /// Depth from the walk root (root children are 1)
    pub depth: u32,

    /// Set when the record is partial
    pub error: Option<String>,
}

impl PathRecord {
    /// Column names, in row order
    pub const COLUMNS: [&'static str; 10] = [
        "path",
        "path_hash",
        "kind",
        "size",
        "modified_time",
        "accessed_time",
        "created_time",
        "content_hash",
        "depth",
        "error",
    ];

    /// Build a record from `lstat` metadata
    pub fn from_metadata(path: &Path, metadata: &Metadata, depth: u32) -> Self {
        let (path, escaped) = path_text(path);
        let kind = EntryKind::from_file_type(metadata.file_type());

        let mut record = Self {
            path_hash: hash_utf8(&path),
            path,
            kind,
            size: kind.is_file().then(|| metadata.len()),
            modified: to_utc(metadata.modified()),
            accessed: to_utc(metadata.accessed()),
            created: to_utc(metadata.created()),
            content_hash: None,
            depth,
            error: None,
        };
        if escaped {
            record.push_error(NON_UTF8_PATH);
        }
        record
    }

    /// Build a partial record for a path that could not be stat'ed
    pub fn partial(path: &Path, depth: u32, error: impl Into<String>) -> Self {
        let (path, escaped) = path_text(path);
        let mut record = Self {
            path_hash: hash_utf8(&path),
            path,
            kind: EntryKind::Other,
            size: None,
            modified: None,
            accessed: None,
            created: None,
            content_hash: None,
            depth,
            error: Some(error.into()),
        };
        if escaped {
            record.push_error(NON_UTF8_PATH);
        }
        record
    }

    /// Attach an error, keeping any earlier one
    pub fn push_error(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.error = Some(match self.error.take() {
            Some(prev) => format!("{}; {}", prev, error),
            None => error,
        });
    }

    /// Check whether this record is partial
    pub fn is_partial(&self) -> bool {
        self.error.is_some()
    }

    /// Render as a flat row matching `COLUMNS` (empty string for missing)
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.path.clone(),
            self.path_hash.clone(),
            self.kind.as_str().to_string(),
            self.size.map(|s| s.to_string()).unwrap_or_default(),
            format_time(self.modified),
            format_time(self.accessed),
            format_time(self.created),
            self.content_hash.clone().unwrap_or_default(),
            self.depth.to_string(),
            self.error.clone().unwrap_or_default(),
        ]
    }
}

/// Render a path as text without merging distinct names
///
/// Valid UTF-8 passes through untouched. Otherwise every invalid byte
/// becomes `\xNN` and literal backslashes are doubled. The flag reports
/// whether any escaping happened.
#[cfg(unix)]
pub fn path_text(path: &Path) -> (String, bool) {
    use std::fmt::Write;
    use std::os::unix::ffi::OsStrExt;

    let bytes = path.as_os_str().as_bytes();
    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), false);
    }

    let mut out = String::with_capacity(bytes.len() + 8);
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            if c == '\\' {
                out.push_str("\\\\");
            } else {
                out.push(c);
            }
        }
        for b in chunk.invalid() {
            let _ = write!(out, "\\x{:02x}", b);
        }
    }
    (out, true)
}

/// Render a path as text; unpaired surrogates fall back to lossy output
#[cfg(not(unix))]
pub fn path_text(path: &Path) -> (String, bool) {
    match path.to_str() {
        Some(text) => (text.to_string(), false),
        None => (path.to_string_lossy().into_owned(), true),
    }
}

fn to_utc(time: std::io::Result<SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

/// RFC 3339 with second precision, or empty
pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_kind_round_trip_names() {
        for kind in [
            EntryKind::File,
            EntryKind::Directory,
            EntryKind::Symlink,
            EntryKind::Other,
        ] {
            assert_eq!(EntryKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EntryKind::parse("fifo"), None);
    }

    #[test]
    fn test_record_from_file_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"12345").unwrap();

        let meta = fs::symlink_metadata(&path).unwrap();
        let record = PathRecord::from_metadata(&path, &meta, 1);

        assert_eq!(record.kind, EntryKind::File);
        assert_eq!(record.size, Some(5));
        assert!(record.modified.is_some());
        assert_eq!(record.path_hash, hash_utf8(&record.path));
        assert!(!record.is_partial());
    }

    #[test]
    fn test_directory_has_no_size() {
        let dir = tempdir().unwrap();
        let meta = fs::symlink_metadata(dir.path()).unwrap();
        let record = PathRecord::from_metadata(dir.path(), &meta, 0);
        assert_eq!(record.kind, EntryKind::Directory);
        assert_eq!(record.size, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_not_followed() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        fs::write(&target, b"x").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let meta = fs::symlink_metadata(&link).unwrap();
        let record = PathRecord::from_metadata(&link, &meta, 1);
        assert_eq!(record.kind, EntryKind::Symlink);
        assert_eq!(record.size, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_stay_distinct() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let ff = Path::new(OsStr::from_bytes(b"/d/a\xff"));
        let fe = Path::new(OsStr::from_bytes(b"/d/a\xfe"));
        assert_eq!(path_text(ff), ("/d/a\\xff".to_string(), true));
        assert_eq!(path_text(fe), ("/d/a\\xfe".to_string(), true));

        // A literal backslash cannot pass for an escape
        let literal = Path::new(OsStr::from_bytes(b"/d/a\\xff\xfe"));
        assert_eq!(path_text(literal).0, "/d/a\\\\xff\\xfe");

        assert_eq!(path_text(Path::new("/d/a\\b")), ("/d/a\\b".to_string(), false));

        let record = PathRecord::partial(ff, 1, "stat failed");
        assert_eq!(record.path, "/d/a\\xff");
        assert_eq!(record.path_hash, hash_utf8("/d/a\\xff"));
        assert!(record.error.as_deref().unwrap().contains("not valid UTF-8"));
    }

    #[test]
    fn test_partial_record_errors_accumulate() {
        let mut record = PathRecord::partial(Path::new("/gone"), 2, "stat failed");
        assert!(record.is_partial());
        record.push_error("hash failed");
        assert_eq!(record.error.as_deref(), Some("stat failed; hash failed"));
    }

    #[test]
    fn test_row_matches_columns() {
        let mut record = PathRecord::partial(Path::new("/x"), 1, "oops");
        record.modified = Some(Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap());
        let row = record.to_row();

        assert_eq!(row.len(), PathRecord::COLUMNS.len());
        assert_eq!(row[0], "/x");
        assert_eq!(row[3], "");
        assert_eq!(row[4], "2020-01-02T03:04:05Z");
        assert_eq!(row[9], "oops");
    }
}
