//! JSON output
//!
//! The document is framed by hand so that each entry is serialized and
//! written on its own line as the encoder walks the records:
//!
//! ```text
//! {
//!   "root": "/abs/root",
//!   "generated_at": "2024-06-01T00:00:00.000000000Z",
//!   "entries": [
//!     {"path":".","name":"root",...},
//!     ...
//!   ],
//!   "summary": {"files":1,...}
//! }
//! ```

use std::io::{self, Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{EntryRecord, timestamp};
use crate::error::DirlogError;
use crate::walk::{Summary, TraversalRun};

use super::EncodeReport;
use super::utils::{CountingWriter, encoding_failed};

/// A JSON log read back from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogDocument {
    pub root: String,
    #[serde(with = "timestamp::required")]
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<EntryRecord>,
    pub summary: Summary,
}

/// Parse a document produced by the JSON encoder.
pub fn parse<R: Read>(reader: R) -> serde_json::Result<LogDocument> {
    serde_json::from_reader(reader)
}

pub fn encode<W: Write>(run: &TraversalRun, sink: W) -> Result<EncodeReport, DirlogError> {
    let mut out = CountingWriter::new(sink);
    let mut written = 0;

    write_prologue(&mut out, run).map_err(encoding_failed(written))?;
    for (i, record) in run.records.iter().enumerate() {
        write_entry(&mut out, record, i + 1 == run.records.len())
            .map_err(encoding_failed(written))?;
        written += 1;
    }
    write_epilogue(&mut out, &run.summary).map_err(encoding_failed(written))?;
    out.flush().map_err(encoding_failed(written))?;

    Ok(EncodeReport {
        records: written,
        bytes: out.bytes(),
    })
}

fn write_prologue<W: Write>(out: &mut W, run: &TraversalRun) -> io::Result<()> {
    writeln!(out, "{{")?;
    writeln!(out, "  \"root\": {},", serde_json::to_string(&run.root_display())?)?;
    writeln!(
        out,
        "  \"generated_at\": \"{}\",",
        timestamp::format(&run.generated_at)
    )?;
    writeln!(out, "  \"entries\": [")
}

fn write_entry<W: Write>(out: &mut W, record: &EntryRecord, last: bool) -> io::Result<()> {
    write!(out, "    ")?;
    serde_json::to_writer(&mut *out, record)?;
    if last {
        writeln!(out)
    } else {
        writeln!(out, ",")
    }
}

fn write_epilogue<W: Write>(out: &mut W, summary: &Summary) -> io::Result<()> {
    writeln!(out, "  ],")?;
    write!(out, "  \"summary\": ")?;
    serde_json::to_writer(&mut *out, summary)?;
    writeln!(out)?;
    writeln!(out, "}}")
}
