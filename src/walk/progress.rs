//! Progress reporting hooks
//!
//! The walker calls the reporter from worker threads after every processed
//! entry, so reporters must return quickly. [`channel`] gives a reporter that
//! never blocks: updates are dropped while the receiver lags behind.

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, bounded};

/// Snapshot of a running traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressUpdate {
    /// Entries fully handled so far.
    pub processed: usize,
    /// Entries found in listings so far, the root included. Grows as the
    /// walk goes deeper, so it is an estimate of the final total.
    pub discovered: usize,
}

impl ProgressUpdate {
    /// Completion percentage against the current estimate.
    pub fn percent(&self) -> f64 {
        if self.discovered == 0 {
            0.0
        } else {
            (self.processed as f64 / self.discovered as f64 * 100.0).min(100.0)
        }
    }
}

/// Callback receiving progress updates.
#[derive(Clone)]
pub struct Progress {
    callback: Arc<dyn Fn(ProgressUpdate) + Send + Sync>,
}

impl Progress {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(f),
        }
    }

    pub(crate) fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

/// A reporter backed by a bounded channel.
///
/// Sends use `try_send`; when the channel is full the update is dropped.
/// The final update of a run is sent the same way, so consumers that must
/// see it should keep up or read the summary instead.
pub fn channel(capacity: usize) -> (Progress, Receiver<ProgressUpdate>) {
    let (tx, rx) = bounded(capacity.max(1));
    let progress = Progress::from_fn(move |update| {
        let _ = tx.try_send(update);
    });
    (progress, rx)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_percent() {
        let update = ProgressUpdate {
            processed: 1,
            discovered: 4,
        };
        assert_eq!(update.percent(), 25.0);
        assert_eq!(ProgressUpdate::default().percent(), 0.0);
    }

    #[test]
    fn test_channel_drops_when_full() {
        let (progress, rx) = channel(2);
        for i in 0..10 {
            progress.report(ProgressUpdate {
                processed: i,
                discovered: 10,
            });
        }
        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].processed, 0);
    }

    #[test]
    fn test_callback_is_invoked() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let progress = Progress::from_fn(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        progress.report(ProgressUpdate::default());
        progress.clone().report(ProgressUpdate::default());
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }
}
