//! Persisted settings
//!
//! A small JSON document remembering a previous invocation:
//!
//! ```json
//! {
//!   "directory_path": "/home/me/projects",
//!   "log_file_path": "projects.csv",
//!   "extension_filter": ".rs",
//!   "max_depth": 3,
//!   "output_format": "csv"
//! }
//! ```
//!
//! Every field is optional. `null` or a missing `max_depth` means no limit.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::RunOptions;
use crate::error::DirlogError;
use crate::output::OutputFormat;
use crate::walk::{FilterPolicy, WalkOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub directory_path: Option<PathBuf>,
    pub log_file_path: Option<PathBuf>,
    pub extension_filter: Option<String>,
    pub max_depth: Option<usize>,
    pub output_format: OutputFormat,
    /// Also echo the output to stdout.
    pub console: bool,
    pub verbose: bool,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, DirlogError> {
        let text = fs::read_to_string(path).map_err(|e| config_error(path, e))?;
        serde_json::from_str(&text).map_err(|e| config_error(path, e))
    }

    pub fn save(&self, path: &Path) -> Result<(), DirlogError> {
        let mut text = serde_json::to_string_pretty(self).map_err(|e| config_error(path, e))?;
        text.push('\n');
        fs::write(path, text).map_err(|e| config_error(path, e))
    }

    /// The filter these settings describe.
    pub fn filter(&self) -> FilterPolicy {
        FilterPolicy::default()
            .with_extension(self.extension_filter.as_deref())
            .with_max_depth(self.max_depth)
    }

    /// Run options with this filter and format, defaults for everything else.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            walk: WalkOptions {
                filter: self.filter(),
                ..Default::default()
            },
            format: self.output_format,
        }
    }
}

fn config_error(path: &Path, err: impl std::fmt::Display) -> DirlogError {
    DirlogError::Config {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
