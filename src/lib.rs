//! dirlog - walk a directory tree and log every entry's metadata
//!
//! ```no_run
//! use std::path::Path;
//! use dirlog::{OutputFormat, RunOptions};
//!
//! let options = RunOptions {
//!     format: OutputFormat::Json,
//!     ..Default::default()
//! };
//! let outcome = dirlog::run(Path::new("."), &options, std::io::stdout())?;
//! eprintln!("{} files, {} errors", outcome.summary.files, outcome.summary.errors);
//! # Ok::<(), dirlog::DirlogError>(())
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod extract;
pub mod logging;
pub mod output;
pub mod walk;

#[cfg(feature = "test-utils")]
pub mod test_utils;

use std::io::Write;
use std::path::Path;

pub use config::Settings;
pub use entry::{EntryKind, EntryRecord};
pub use error::{DirlogError, EntryError, EntryErrorKind};
pub use extract::{EntrySummary, Extractor};
pub use output::{EncodeReport, LogDocument, OutputFormat, encode, format_size, parse_json};
pub use walk::{
    CancelToken, FilterPolicy, Progress, ProgressUpdate, Summary, TraversalRun, WalkOptions, walk,
};

/// Options for one end-to-end invocation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub walk: WalkOptions,
    pub format: OutputFormat,
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: Summary,
    pub report: EncodeReport,
}

/// Walk `root` and encode the result to `sink`.
///
/// Fatal root problems and sink failures are returned as errors. Per-entry
/// problems are counted in `summary.errors` and the run still succeeds.
pub fn run<W: Write>(
    root: &Path,
    options: &RunOptions,
    sink: W,
) -> Result<RunOutcome, DirlogError> {
    let run = walk(root, &options.walk)?;
    let report = encode(options.format, &run, sink)?;
    Ok(RunOutcome {
        summary: run.summary,
        report,
    })
}
