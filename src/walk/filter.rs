//! Inclusion policy applied to directory listings

use serde::{Deserialize, Serialize};

use crate::entry::extension_of;
use crate::extract::EntrySummary;

/// What the walker should do with a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Extract and emit the record.
    Emit,
    /// Directory hidden from output but still descended.
    Traverse,
    /// Neither extracted nor emitted.
    Skip,
}

/// Filter applied to every listed entry before its metadata is read.
///
/// Depth convention: the root is depth 0 and `max_depth` is the deepest depth
/// whose entries are emitted. `max_depth = Some(0)` yields the root alone;
/// `Some(1)` yields the root and its immediate listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPolicy {
    /// Only non-directory entries with this extension are emitted.
    /// Stored lowercase without the leading dot.
    pub extension: Option<String>,
    pub max_depth: Option<usize>,
    pub include_root: bool,
    pub include_directories: bool,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            extension: None,
            max_depth: None,
            include_root: true,
            include_directories: true,
        }
    }
}

impl FilterPolicy {
    /// Set the extension filter. Accepts `txt`, `.txt` or `.TXT`; an empty
    /// string clears the filter.
    pub fn with_extension(mut self, ext: Option<&str>) -> Self {
        self.extension = ext.and_then(normalize_extension);
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Whether entries at `depth` may be emitted at all.
    pub fn within_depth(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth <= max)
    }

    /// Whether a directory at `depth` should be listed.
    pub fn descends(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }

    /// Decide on a listed entry.
    ///
    /// `traversable` is true for directories and, when following links, for
    /// symlinks that resolve to a directory. Those are always descended; the
    /// extension filter only keeps them out of the output.
    pub fn decide(&self, entry: &EntrySummary, traversable: bool) -> Decision {
        if !self.within_depth(entry.depth) {
            return Decision::Skip;
        }

        if entry.depth == 0 {
            return if self.include_root {
                Decision::Emit
            } else {
                Decision::Traverse
            };
        }

        if traversable {
            let shown = self.include_directories && self.matches_extension(&entry.name);
            return if shown {
                Decision::Emit
            } else {
                Decision::Traverse
            };
        }

        if self.matches_extension(&entry.name) {
            Decision::Emit
        } else {
            Decision::Skip
        }
    }

    fn matches_extension(&self, name: &str) -> bool {
        match &self.extension {
            Some(wanted) => extension_of(name) == *wanted,
            None => true,
        }
    }
}

fn normalize_extension(ext: &str) -> Option<String> {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
