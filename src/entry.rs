//! Entry records produced by a traversal

use std::ffi::OsStr;
use std::fmt;
use std::fmt::Write as _;
use std::fs::FileType;
use std::path::{Component, Path};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EntryError;

/// The kind of a visited filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Device files, pipes, sockets.
    Other,
}

impl EntryKind {
    /// Classify a file type obtained without following symlinks.
    pub fn from_file_type(ft: FileType) -> Self {
        if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_dir() {
            Self::Directory
        } else if ft.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Other => "other",
        }
    }

    /// Single-letter tag used by the text format.
    pub fn tag(self) -> char {
        match self {
            Self::File => 'F',
            Self::Directory => 'D',
            Self::Symlink => 'L',
            Self::Other => '?',
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured metadata for one filesystem node.
///
/// `path` is relative to the traversal root, uses `/` as separator on every
/// platform, and is `.` for the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryRecord {
    pub path: String,
    pub name: String,
    pub kind: EntryKind,
    pub size_bytes: u64,
    #[serde(with = "timestamp::option")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(with = "timestamp::option")]
    pub created_time: Option<DateTime<Utc>>,
    pub depth: usize,
    pub extension: String,
    pub error: Option<EntryError>,
}

impl EntryRecord {
    /// A record carrying only what the directory listing revealed.
    pub fn partial(path: String, name: String, kind: EntryKind, depth: usize) -> Self {
        let extension = if kind == EntryKind::Directory {
            String::new()
        } else {
            extension_of(&name)
        };
        Self {
            path,
            name,
            kind,
            size_bytes: 0,
            modified_time: None,
            created_time: None,
            depth,
            extension,
            error: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Lowercase extension without the leading dot, empty if none.
///
/// Dotfiles such as `.bashrc` have no extension.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Render a file name as a string without losing information.
///
/// Backslashes are doubled and bytes that are not valid UTF-8 become `\xHH`,
/// so distinct names always give distinct strings.
pub fn name_string(name: &OsStr) -> String {
    let mut out = String::new();
    push_escaped(&mut out, name);
    out
}

#[cfg(unix)]
fn push_escaped(out: &mut String, name: &OsStr) {
    use std::os::unix::ffi::OsStrExt;

    for chunk in name.as_bytes().utf8_chunks() {
        push_valid(out, chunk.valid());
        for byte in chunk.invalid() {
            let _ = write!(out, "\\x{:02X}", byte);
        }
    }
}

#[cfg(windows)]
fn push_escaped(out: &mut String, name: &OsStr) {
    use std::os::windows::ffi::OsStrExt;

    for unit in char::decode_utf16(name.encode_wide()) {
        match unit {
            Ok('\\') => out.push_str("\\\\"),
            Ok(c) => out.push(c),
            Err(e) => {
                let _ = write!(out, "\\u{{{:04X}}}", e.unpaired_surrogate());
            }
        }
    }
}

#[cfg(not(any(unix, windows)))]
fn push_escaped(out: &mut String, name: &OsStr) {
    push_valid(out, &name.to_string_lossy());
}

#[cfg_attr(windows, allow(dead_code))]
fn push_valid(out: &mut String, valid: &str) {
    for c in valid.chars() {
        if c == '\\' {
            out.push_str("\\\\");
        } else {
            out.push(c);
        }
    }
}

/// Render `path` relative to `root` with `/` separators, `.` for the root.
pub fn relative_path_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(name_string(s)),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Fixed timestamp format shared by every output format.
///
/// RFC 3339, UTC, nanosecond precision, `Z` suffix. Parsing accepts any
/// RFC 3339 string so the format round-trips exactly.
pub mod timestamp {
    use super::*;

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    pub fn format_opt(ts: Option<&DateTime<Utc>>) -> String {
        ts.map(format).unwrap_or_default()
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
    }

    pub mod required {
        use super::*;
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(&format(ts))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
            let raw = String::deserialize(d)?;
            parse(&raw).map_err(serde::de::Error::custom)
        }
    }

    pub mod option {
        use super::*;
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => s.serialize_some(&format(ts)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => parse(&raw).map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("main.RS"), "rs");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("Makefile"), "");
        assert_eq!(extension_of(".bashrc"), "");
    }

    #[test]
    #[cfg(unix)]
    fn test_name_string_escapes_invalid_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let ff = name_string(OsStr::from_bytes(b"a\xff"));
        let fe = name_string(OsStr::from_bytes(b"a\xfe"));
        assert_eq!(ff, "a\\xFF");
        assert_eq!(fe, "a\\xFE");
        assert_ne!(ff, fe);
        // A literal backslash cannot be mistaken for an escape
        assert_eq!(name_string(OsStr::new("a\\xFF")), "a\\\\xFF");
        assert_eq!(name_string(OsStr::new("résumé.txt")), "résumé.txt");
    }

    #[test]
    fn test_relative_path_string() {
        let root = PathBuf::from("/data/root");
        assert_eq!(relative_path_string(&root, &root), ".");
        assert_eq!(
            relative_path_string(&root, &root.join("a").join("b.txt")),
            "a/b.txt"
        );
    }

    #[test]
    fn test_timestamp_format_is_fixed_width_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(timestamp::format(&ts), "2024-05-01T12:00:00.000000000Z");
    }

    #[test]
    fn test_timestamp_parse_preserves_nanos() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let text = timestamp::format(&ts);
        assert_eq!(timestamp::parse(&text).unwrap(), ts);
        assert!(timestamp::parse("").is_err());
    }

    #[test]
    fn test_partial_directory_has_no_extension() {
        let rec = EntryRecord::partial("a.d".into(), "a.d".into(), EntryKind::Directory, 1);
        assert_eq!(rec.extension, "");
        assert!(rec.is_dir());
        let rec = EntryRecord::partial("x.TXT".into(), "x.TXT".into(), EntryKind::File, 1);
        assert_eq!(rec.extension, "txt");
    }
}
