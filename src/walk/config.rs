//! Configuration types for the walker

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::filter::FilterPolicy;
use super::progress::Progress;

/// Cooperative cancellation flag shared between a caller and a running walk.
///
/// Workers check it before starting each entry. Entries already in flight
/// finish; nothing new starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// The underlying flag, for signal handlers that only accept an
    /// `AtomicBool`.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// Configuration for a traversal.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub filter: FilterPolicy,
    /// Number of worker threads.
    /// 0 = auto-detect (twice the available parallelism)
    /// 1 = sequential
    /// N = use N worker threads
    pub concurrency: usize,
    /// Descend into symlinked directories outside the root. Links into the
    /// root are logged but not descended, and each target is listed once.
    pub follow_symlinks: bool,
    /// Stable-sort the records by path once the walk is done.
    pub sort_by_path: bool,
    /// Upper bound on a single stat call.
    pub entry_timeout: Option<Duration>,
    pub cancel: CancelToken,
    pub progress: Option<Progress>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            filter: FilterPolicy::default(),
            concurrency: 0,
            follow_symlinks: false,
            sort_by_path: true,
            entry_timeout: None,
            cancel: CancelToken::new(),
            progress: None,
        }
    }
}

impl WalkOptions {
    /// Resolve `concurrency` to an actual thread count.
    pub fn worker_count(&self) -> usize {
        if self.concurrency > 0 {
            return self.concurrency;
        }
        std::thread::available_parallelism()
            .map(|n| n.get() * 2)
            .unwrap_or(4)
    }
}
