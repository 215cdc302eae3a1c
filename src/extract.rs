//! Metadata extraction for a single filesystem entry
//!
//! Extraction never fails outright: any stat error is folded into the
//! record's `error` field and the fields known from the directory listing are
//! kept, so the entry still shows up in the output and the counts.

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use tracing::trace;

use crate::entry::{EntryKind, EntryRecord};
use crate::error::EntryError;

/// Everything the listing already told us about an entry.
#[derive(Debug, Clone)]
pub struct EntrySummary {
    /// Root-relative, `/`-separated path.
    pub path: String,
    pub name: String,
    /// Kind as reported by the listing, without following symlinks.
    pub kind: EntryKind,
    pub depth: usize,
}

/// Stats entries, optionally bounding each stat call by a timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    timeout: Option<Duration>,
}

impl Extractor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Build the full record for `fs_path`.
    ///
    /// Returns the lstat metadata alongside the record when the stat
    /// succeeded; the walker uses it for directory identity.
    pub fn extract(&self, fs_path: &Path, summary: EntrySummary) -> (EntryRecord, Option<Metadata>) {
        let mut record =
            EntryRecord::partial(summary.path, summary.name, summary.kind, summary.depth);

        match self.stat(fs_path) {
            Ok(meta) => {
                fill_from_metadata(&mut record, &meta);
                trace!(path = %record.path, kind = %record.kind, "extracted");
                (record, Some(meta))
            }
            Err(err) => {
                trace!(path = %record.path, error = %err, "extraction failed");
                record.error = Some(EntryError::extraction(&err));
                (record, None)
            }
        }
    }

    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        let Some(limit) = self.timeout else {
            return fs::symlink_metadata(path);
        };

        // The helper thread is abandoned on timeout; it exits once the
        // filesystem eventually answers.
        let (tx, rx) = bounded(1);
        let owned = path.to_path_buf();
        thread::Builder::new()
            .name("dirlog-stat".to_string())
            .spawn(move || {
                let _ = tx.send(fs::symlink_metadata(&owned));
            })?;

        await_answer(&rx, limit)
    }
}

/// Wait up to `limit` for a helper thread's result.
fn await_answer<T>(rx: &Receiver<io::Result<T>>, limit: Duration) -> io::Result<T> {
    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("timed out after {}", humantime::format_duration(limit)),
        )),
        Err(RecvTimeoutError::Disconnected) => {
            Err(io::Error::other("stat helper exited without answering"))
        }
    }
}

fn fill_from_metadata(record: &mut EntryRecord, meta: &Metadata) {
    let kind = EntryKind::from_file_type(meta.file_type());
    if kind != record.kind {
        // The entry changed type between listing and stat; trust the stat.
        *record = EntryRecord::partial(
            std::mem::take(&mut record.path),
            std::mem::take(&mut record.name),
            kind,
            record.depth,
        );
    }
    record.size_bytes = if kind == EntryKind::Directory {
        0
    } else {
        meta.len()
    };
    record.modified_time = meta.modified().ok().map(DateTime::<Utc>::from);
    record.created_time = meta.created().ok().map(DateTime::<Utc>::from);
}
