//! Results of a traversal

use std::cmp::Ordering;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{EntryKind, EntryRecord};

use super::filter::FilterPolicy;

/// Aggregate counts for one traversal.
///
/// `errors` counts records carrying an error and is reported separately from
/// the per-kind counts, so a degraded run can be told apart from a clean one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub files: usize,
    pub directories: usize,
    pub symlinks: usize,
    pub others: usize,
    pub errors: usize,
    /// Sum of `size_bytes` over emitted regular files.
    pub total_bytes: u64,
    /// Listed entries the filter kept out of the output.
    pub skipped_by_filter: usize,
    /// True when the run stopped early on a cancel request.
    pub cancelled: bool,
    /// Wall-clock time of the walk. Not serialized so that two runs over
    /// the same tree produce identical summaries.
    #[serde(skip)]
    pub elapsed: Duration,
}

impl Summary {
    /// Tally the emitted records.
    pub fn from_records(records: &[EntryRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            match record.kind {
                EntryKind::File => {
                    summary.files += 1;
                    summary.total_bytes += record.size_bytes;
                }
                EntryKind::Directory => summary.directories += 1,
                EntryKind::Symlink => summary.symlinks += 1,
                EntryKind::Other => summary.others += 1,
            }
            if record.has_error() {
                summary.errors += 1;
            }
        }
        summary
    }

    pub fn emitted(&self) -> usize {
        self.files + self.directories + self.symlinks + self.others
    }

    /// Completed, but some entries could not be fully read.
    pub fn is_degraded(&self) -> bool {
        self.errors > 0
    }

    /// Entries per second over the walk.
    pub fn entries_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.emitted() as f64 / secs
        } else {
            0.0
        }
    }
}

/// One end-to-end traversal: the root, the filter it ran with, the records
/// and their summary. Dropped once encoded.
#[derive(Debug, Clone)]
pub struct TraversalRun {
    /// Canonical absolute root.
    pub root: PathBuf,
    pub filter: FilterPolicy,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<EntryRecord>,
    pub summary: Summary,
    sorted: bool,
}

impl TraversalRun {
    pub(crate) fn new(
        root: PathBuf,
        filter: FilterPolicy,
        records: Vec<EntryRecord>,
        summary: Summary,
    ) -> Self {
        Self {
            root,
            filter,
            generated_at: Utc::now(),
            records,
            summary,
            sorted: false,
        }
    }

    /// Stable sort of the records by path, component by component, the root
    /// first. Records arrive in completion order from the workers; this gives
    /// the total order the text and CSV outputs read best in.
    pub fn finalize(&mut self) {
        if !self.sorted {
            self.records.sort_by(|a, b| compare_paths(&a.path, &b.path));
            self.sorted = true;
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Root path as written into output headers.
    pub fn root_display(&self) -> String {
        self.root.to_string_lossy().into_owned()
    }
}

/// Order root-relative paths so that a directory is followed directly by its
/// subtree (`a`, `a/b`, `a.txt` rather than `a`, `a.txt`, `a/b`).
pub fn compare_paths(a: &str, b: &str) -> Ordering {
    match (a == ".", b == ".") {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.split('/').cmp(b.split('/')),
    }
}
