//! Local filesystem entry types

pub mod types;

pub use types::{format_time, path_text, EntryKind, PathRecord, NON_UTF8_PATH};
