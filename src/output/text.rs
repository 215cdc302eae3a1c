//! Plain text output
//!
//! One line per record, indented two spaces per depth level.

use std::io::{self, Write};

use crate::entry::{EntryRecord, timestamp};
use crate::error::DirlogError;
use crate::walk::{Summary, TraversalRun};

use super::EncodeReport;
use super::utils::{CountingWriter, encoding_failed, format_size};

const INDENT: &str = "  ";

pub fn encode<W: Write>(run: &TraversalRun, sink: W) -> Result<EncodeReport, DirlogError> {
    let mut out = CountingWriter::new(sink);
    let mut written = 0;

    write_header(&mut out, run).map_err(encoding_failed(written))?;
    for record in &run.records {
        write_record(&mut out, record).map_err(encoding_failed(written))?;
        written += 1;
    }
    write_footer(&mut out, &run.summary).map_err(encoding_failed(written))?;
    out.flush().map_err(encoding_failed(written))?;

    Ok(EncodeReport {
        records: written,
        bytes: out.bytes(),
    })
}

fn write_header<W: Write>(out: &mut W, run: &TraversalRun) -> io::Result<()> {
    writeln!(out, "Directory log: {}", run.root_display())?;
    writeln!(out, "Generated: {}", timestamp::format(&run.generated_at))?;
    writeln!(out)
}

fn write_record<W: Write>(out: &mut W, record: &EntryRecord) -> io::Result<()> {
    let indent = INDENT.repeat(record.depth);
    write!(out, "{}[{}] {}", indent, record.kind.tag(), record.name)?;
    if record.is_dir() {
        write!(out, "/")?;
    } else {
        write!(
            out,
            "  {} bytes ({})",
            record.size_bytes,
            format_size(record.size_bytes)
        )?;
    }
    write!(
        out,
        "  modified {}  created {}",
        display_time(&record.modified_time),
        display_time(&record.created_time)
    )?;
    if let Some(err) = &record.error {
        write!(out, "  !! {}", err)?;
    }
    writeln!(out)
}

fn write_footer<W: Write>(out: &mut W, summary: &Summary) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{} directories, {} files, {} symlinks, {} other, {} errors, {} bytes total",
        summary.directories,
        summary.files,
        summary.symlinks,
        summary.others,
        summary.errors,
        summary.total_bytes
    )?;
    if summary.skipped_by_filter > 0 {
        writeln!(out, "{} entries skipped by filter", summary.skipped_by_filter)?;
    }
    if summary.cancelled {
        writeln!(out, "PARTIAL: traversal was cancelled")?;
    }
    Ok(())
}

fn display_time(ts: &Option<chrono::DateTime<chrono::Utc>>) -> String {
    match ts {
        Some(ts) => timestamp::format(ts),
        None => "-".to_string(),
    }
}
