//! Output encoders
//!
//! This module serializes a finished [`TraversalRun`] into one of four formats:
//! - Text: indented, human-readable listing
//! - JSON: a single document with entries and summary
//! - CSV: one row per entry under a fixed header
//! - XML: one element per entry inside a `directory_log` root
//!
//! # Module Structure
//!
//! - `utils` - byte counting, error mapping, size formatting
//! - `text`, `json`, `csv`, `xml` - one `encode` function per format
//!
//! Records are already buffered in the run, so memory use is
//! O(emitted records); each encoder writes them to the sink one at a time.

mod csv;
pub mod json;
mod text;
mod utils;
mod xml;

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DirlogError;
use crate::walk::TraversalRun;

pub use self::csv::CSV_HEADER;
pub use json::{LogDocument, parse as parse_json};
pub use utils::format_size;

/// The available output formats.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
    Xml,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xml => "xml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "xml" => Ok(Self::Xml),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// What an encoder wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeReport {
    pub records: usize,
    pub bytes: u64,
}

/// Serialize `run` to `sink` in the given format.
///
/// On a sink failure the error carries the number of records written
/// before it; the output must then be treated as incomplete.
pub fn encode<W: Write>(
    format: OutputFormat,
    run: &TraversalRun,
    sink: W,
) -> Result<EncodeReport, DirlogError> {
    let report = match format {
        OutputFormat::Text => text::encode(run, sink),
        OutputFormat::Json => json::encode(run, sink),
        OutputFormat::Csv => self::csv::encode(run, sink),
        OutputFormat::Xml => xml::encode(run, sink),
    }?;
    debug!(format = %format, records = report.records, bytes = report.bytes, "encoded output");
    Ok(report)
}
