//! XML output
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <directory_log root="/abs/root" generated_at="...">
//!   <entry path="a.txt" name="a.txt" kind="file" size_bytes="3" .../>
//!   <summary files="1" .../>
//! </directory_log>
//! ```
//!
//! Attribute values are escaped here rather than by quick-xml so that tabs
//! and newlines survive attribute-value normalization. Control characters
//! that XML 1.0 cannot carry at all are replaced with U+FFFD.

use std::borrow::Cow;
use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::name::QName;

use crate::entry::{EntryRecord, timestamp};
use crate::error::DirlogError;
use crate::walk::{Summary, TraversalRun};

use super::EncodeReport;
use super::utils::{CountingWriter, encoding_failed};

const ROOT_ELEMENT: &str = "directory_log";

pub fn encode<W: Write>(run: &TraversalRun, sink: W) -> Result<EncodeReport, DirlogError> {
    let mut writer = Writer::new_with_indent(CountingWriter::new(sink), b' ', 2);
    let mut written = 0;

    write_prologue(&mut writer, run).map_err(encoding_failed(written))?;
    for record in &run.records {
        emit(&mut writer, Event::Empty(entry_element(record))).map_err(encoding_failed(written))?;
        written += 1;
    }
    write_epilogue(&mut writer, &run.summary).map_err(encoding_failed(written))?;

    let mut out = writer.into_inner();
    out.flush().map_err(encoding_failed(written))?;
    Ok(EncodeReport {
        records: written,
        bytes: out.bytes(),
    })
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> io::Result<()> {
    writer.write_event(event).map_err(io::Error::other)
}

fn write_prologue<W: Write>(writer: &mut Writer<W>, run: &TraversalRun) -> io::Result<()> {
    emit(writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new(ROOT_ELEMENT);
    push(&mut root, "root", &run.root_display());
    push(&mut root, "generated_at", &timestamp::format(&run.generated_at));
    emit(writer, Event::Start(root))
}

fn write_epilogue<W: Write>(writer: &mut Writer<W>, summary: &Summary) -> io::Result<()> {
    emit(writer, Event::Empty(summary_element(summary)))?;
    emit(writer, Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
    writer.get_mut().write_all(b"\n")
}

fn entry_element(record: &EntryRecord) -> BytesStart<'static> {
    let mut el = BytesStart::new("entry");
    push(&mut el, "path", &record.path);
    push(&mut el, "name", &record.name);
    push(&mut el, "kind", record.kind.as_str());
    push(&mut el, "size_bytes", &record.size_bytes.to_string());
    push(&mut el, "modified_time", &timestamp::format_opt(record.modified_time.as_ref()));
    push(&mut el, "created_time", &timestamp::format_opt(record.created_time.as_ref()));
    push(&mut el, "depth", &record.depth.to_string());
    push(&mut el, "extension", &record.extension);
    if let Some(err) = &record.error {
        push(&mut el, "error_kind", err.kind.as_str());
        push(&mut el, "error_message", &err.message);
    }
    el
}

fn summary_element(summary: &Summary) -> BytesStart<'static> {
    let mut el = BytesStart::new("summary");
    push(&mut el, "files", &summary.files.to_string());
    push(&mut el, "directories", &summary.directories.to_string());
    push(&mut el, "symlinks", &summary.symlinks.to_string());
    push(&mut el, "others", &summary.others.to_string());
    push(&mut el, "errors", &summary.errors.to_string());
    push(&mut el, "total_bytes", &summary.total_bytes.to_string());
    push(&mut el, "skipped_by_filter", &summary.skipped_by_filter.to_string());
    push(&mut el, "cancelled", if summary.cancelled { "true" } else { "false" });
    el
}

fn push(el: &mut BytesStart<'static>, key: &'static str, value: &str) {
    el.push_attribute(Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Owned(escape_attribute(value).into_bytes()),
    });
}

/// Escape a string for use inside a double-quoted attribute value.
fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {
                out.push('\u{FFFD}')
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use quick_xml::Reader;

    use super::super::test_support::sample_run;
    use super::*;

    fn render() -> String {
        let mut buf = Vec::new();
        encode(&sample_run(), &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    /// Parse the document and return (element name, attributes) pairs.
    fn elements(xml: &str) -> Vec<(String, HashMap<String, String>)> {
        let mut reader = Reader::from_str(xml);
        let mut found = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) | Event::Empty(e) => {
                    let name = String::from_utf8(e.name().as_ref().to_vec()).unwrap();
                    let attrs = e
                        .attributes()
                        .map(|a| {
                            let a = a.unwrap();
                            (
                                String::from_utf8(a.key.as_ref().to_vec()).unwrap(),
                                a.unescape_value().unwrap().into_owned(),
                            )
                        })
                        .collect();
                    found.push((name, attrs));
                }
                Event::Eof => break,
                _ => {}
            }
        }
        found
    }

    #[test]
    fn test_declaration_and_root() {
        let xml = render();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<directory_log root=\"/data/root\""));
        assert!(xml.trim_end().ends_with("</directory_log>"));
    }

    #[test]
    fn test_reserved_characters_round_trip() {
        let xml = render();
        assert!(xml.contains("name=\"a,&quot;b&quot;.txt\""));
        assert!(xml.contains("name=\"locked &lt;1&gt;\""));

        let parsed = elements(&xml);
        let entries: Vec<_> = parsed.iter().filter(|(n, _)| n == "entry").collect();
        assert_eq!(entries.len(), 4);
        let file = &entries[2].1;
        assert_eq!(file["name"], "a,\"b\".txt");
        assert_eq!(file["size_bytes"], "2048");
        assert_eq!(file["modified_time"], "2023-11-14T22:13:20.123456789Z");
        let locked = &entries[3].1;
        assert_eq!(locked["error_kind"], "listing_failed");
        assert_eq!(locked["error_message"], "permission denied");
    }

    #[test]
    fn test_summary_element() {
        let parsed = elements(&render());
        let (_, summary) = parsed.iter().find(|(n, _)| n == "summary").unwrap();
        assert_eq!(summary["directories"], "3");
        assert_eq!(summary["errors"], "1");
        assert_eq!(summary["cancelled"], "false");
    }

    #[test]
    fn test_escape_attribute_control_characters() {
        assert_eq!(escape_attribute("a\tb\nc"), "a&#9;b&#10;c");
        assert_eq!(escape_attribute("bell\u{7}"), "bell\u{FFFD}");
        assert_eq!(escape_attribute("plain"), "plain");
    }
}
