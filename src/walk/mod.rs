//! Directory traversal
//!
//! - `filter` - which listed entries are emitted, traversed or skipped
//! - `engine` - the parallel walker
//! - `context` - state shared between workers during one walk
//! - `summary` - the finished run and its counts
//! - `progress` - non-blocking progress reporting

mod config;
mod context;
mod engine;
mod filter;
pub mod progress;
mod summary;

pub use config::{CancelToken, WalkOptions};
pub use engine::walk;
pub use filter::{Decision, FilterPolicy};
pub use progress::{Progress, ProgressUpdate};
pub use summary::{Summary, TraversalRun, compare_paths};
