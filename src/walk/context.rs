//! Per-run shared state
//!
//! The only state workers share: the visited set used for cycle detection,
//! the record collection, and a few counters. Created at the start of a walk
//! and consumed at its end.

use std::collections::HashSet;
use std::fs::Metadata;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::entry::EntryRecord;

use super::progress::{Progress, ProgressUpdate};

/// Stable identity of a directory, used to cut symlink cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum FileId {
    #[cfg(unix)]
    Inode { dev: u64, ino: u64 },
    #[cfg_attr(unix, allow(dead_code))]
    Canonical(std::path::PathBuf),
}

impl FileId {
    #[cfg(unix)]
    pub(crate) fn of(_path: &Path, meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self::Inode {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }

    #[cfg(not(unix))]
    pub(crate) fn of(path: &Path, _meta: &Metadata) -> Self {
        Self::Canonical(std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()))
    }
}

pub(crate) struct RunContext {
    visited: Mutex<HashSet<FileId>>,
    records: Mutex<Vec<EntryRecord>>,
    discovered: AtomicUsize,
    processed: AtomicUsize,
    skipped: AtomicUsize,
    cancelled: AtomicBool,
    progress: Option<Progress>,
}

impl RunContext {
    pub(crate) fn new(progress: Option<Progress>) -> Self {
        Self {
            visited: Mutex::new(HashSet::new()),
            records: Mutex::new(Vec::new()),
            // The root counts as discovered.
            discovered: AtomicUsize::new(1),
            processed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            progress,
        }
    }

    /// Mark a directory as entered. Returns false if it was already visited.
    pub(crate) fn first_visit(&self, id: FileId) -> bool {
        match self.visited.lock() {
            Ok(mut visited) => visited.insert(id),
            Err(poisoned) => poisoned.into_inner().insert(id),
        }
    }

    pub(crate) fn push(&self, record: EntryRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }

    pub(crate) fn add_discovered(&self, n: usize) {
        self.discovered.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn note_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_cancelled(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Count one finished entry and notify the progress reporter.
    pub(crate) fn note_processed(&self) {
        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(progress) = &self.progress {
            progress.report(ProgressUpdate {
                processed,
                discovered: self.discovered.load(Ordering::Relaxed),
            });
        }
    }

    /// Send a closing update where processed equals discovered.
    pub(crate) fn report_done(&self) {
        if let Some(progress) = &self.progress {
            let processed = self.processed.load(Ordering::Relaxed);
            progress.report(ProgressUpdate {
                processed,
                discovered: processed,
            });
        }
    }

    pub(crate) fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    pub(crate) fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub(crate) fn into_records(self) -> Vec<EntryRecord> {
        match self.records.into_inner() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
