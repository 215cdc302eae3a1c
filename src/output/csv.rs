//! CSV output
//!
//! Header row is [`CSV_HEADER`], one row per record, RFC 4180 quoting.
//! Missing timestamps and errors are empty fields.

use std::io::{self, Write};

use crate::entry::{EntryRecord, timestamp};
use crate::error::DirlogError;
use crate::walk::TraversalRun;

use super::EncodeReport;
use super::utils::{CountingWriter, encoding_failed};

/// Column order of the CSV output.
pub const CSV_HEADER: [&str; 9] = [
    "path",
    "name",
    "kind",
    "size_bytes",
    "modified_time",
    "created_time",
    "depth",
    "extension",
    "error",
];

pub fn encode<W: Write>(run: &TraversalRun, sink: W) -> Result<EncodeReport, DirlogError> {
    let mut out = CountingWriter::new(sink);
    let mut rows = RowWriter::new();
    let mut written = 0;

    out.write_all(rows.encode(&CSV_HEADER).map_err(encoding_failed(written))?)
        .map_err(encoding_failed(written))?;
    for record in &run.records {
        let row = rows.encode(&fields(record)).map_err(encoding_failed(written))?;
        out.write_all(row).map_err(encoding_failed(written))?;
        written += 1;
    }
    out.flush().map_err(encoding_failed(written))?;

    Ok(EncodeReport {
        records: written,
        bytes: out.bytes(),
    })
}

fn fields(record: &EntryRecord) -> [String; 9] {
    [
        record.path.clone(),
        record.name.clone(),
        record.kind.to_string(),
        record.size_bytes.to_string(),
        timestamp::format_opt(record.modified_time.as_ref()),
        timestamp::format_opt(record.created_time.as_ref()),
        record.depth.to_string(),
        record.extension.clone(),
        record.error.as_ref().map(ToString::to_string).unwrap_or_default(),
    ]
}

/// Quotes one row at a time into a reused buffer, so each record reaches the
/// sink whole and the written count stays exact.
struct RowWriter {
    buf: Vec<u8>,
}

impl RowWriter {
    fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
        }
    }

    fn encode<S: AsRef<[u8]>>(&mut self, fields: &[S]) -> io::Result<&[u8]> {
        self.buf.clear();
        let mut inner = ::csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut self.buf);
        inner.write_record(fields)?;
        inner.flush()?;
        drop(inner);
        Ok(&self.buf)
    }
}
