//! Error types for dirlog
//!
//! Two layers:
//! - [`DirlogError`]: failures that abort a run or an encode step.
//! - [`EntryError`]: per-entry problems that are recorded on the record and
//!   counted in the summary, never propagated.

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirlogError {
    // Root
    #[error("cannot access '{}': no such file or directory", .0.display())]
    RootNotFound(PathBuf),

    #[error("cannot read '{}': {source}", path.display())]
    RootNotReadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{}' is not a directory", .0.display())]
    RootNotDirectory(PathBuf),

    // Output
    #[error("encoding failed after {records_written} records: {source}")]
    EncodingFailed {
        records_written: usize,
        #[source]
        source: io::Error,
    },

    // Collaborators
    #[error("config error in '{}': {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("thread pool failure: {0}")]
    ThreadPool(String),
}

impl DirlogError {
    /// The filesystem path this error refers to, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::RootNotFound(p)
            | Self::RootNotDirectory(p)
            | Self::RootNotReadable { path: p, .. }
            | Self::Config { path: p, .. } => Some(p),
            _ => None,
        }
    }

    /// Whether this error ended the run before a summary could be produced.
    ///
    /// An encode failure happens after traversal completed, so the summary
    /// exists but the output is incomplete.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::EncodingFailed { .. })
    }

    /// Map an io error from opening the root to the matching variant.
    pub(crate) fn from_root_io(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::RootNotFound(path)
        } else {
            Self::RootNotReadable { path, source }
        }
    }
}

/// Classification of a non-fatal, per-entry failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryErrorKind {
    /// The entry's metadata could not be read (stat failed or timed out).
    ExtractionFailed,
    /// The entry is a directory whose children could not be listed.
    ListingFailed,
}

impl EntryErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExtractionFailed => "extraction_failed",
            Self::ListingFailed => "listing_failed",
        }
    }
}

impl fmt::Display for EntryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error descriptor attached to an entry record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryError {
    pub kind: EntryErrorKind,
    pub message: String,
}

impl EntryError {
    pub fn extraction(err: &io::Error) -> Self {
        Self {
            kind: EntryErrorKind::ExtractionFailed,
            message: describe_io(err),
        }
    }

    pub fn listing(err: &io::Error) -> Self {
        Self {
            kind: EntryErrorKind::ListingFailed,
            message: describe_io(err),
        }
    }
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Short, platform-independent description for common io failures.
fn describe_io(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        io::ErrorKind::NotFound => "not found".to_string(),
        _ => err.to_string(),
    }
}
