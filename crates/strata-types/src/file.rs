use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::TypeError;

/// On-disk encodings a map data file can use.
///
/// ```text
/// ┌─────────┬──────────────────┬──────────────────────────────────┐
/// │ Variant │ Suffixes         │ Description                      │
/// ├─────────┼──────────────────┼──────────────────────────────────┤
/// │ Xml     │ osm, osh, osc    │ XML, incl. history/change files  │
/// │ Pbf     │ pbf              │ Protocol buffer blocks           │
/// │ Opl     │ opl              │ One object per line, plain text  │
/// │ Json    │ json, geojson    │ JSON documents                   │
/// │ O5m     │ o5m, o5c         │ Compact binary delta encoding    │
/// │ Debug   │ debug            │ Human-readable dump              │
/// │ Unknown │ anything else    │ Not detected, must be given      │
/// └─────────┴──────────────────┴──────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileFormat {
    #[default]
    Unknown,
    Xml,
    Pbf,
    Opl,
    Json,
    O5m,
    Debug,
}

impl FileFormat {
    /// Lower-case name, as used in error messages and format strings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Xml => "xml",
            Self::Pbf => "pbf",
            Self::Opl => "opl",
            Self::Json => "json",
            Self::O5m => "o5m",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "xml" | "osm" => Ok(Self::Xml),
            "pbf" => Ok(Self::Pbf),
            "opl" => Ok(Self::Opl),
            "json" | "geojson" => Ok(Self::Json),
            "o5m" => Ok(Self::O5m),
            "debug" => Ok(Self::Debug),
            _ => Err(TypeError::UnknownFormat(s.to_string())),
        }
    }
}

/// Outer compression wrapped around the encoded data.
///
/// Recorded for the chunk source; the decode pipeline itself never
/// looks inside compressed data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FileCompression {
    #[default]
    None,
    Gzip,
    Bzip2,
}

impl FileCompression {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
        }
    }
}

impl fmt::Display for FileCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of an input file: its name plus how it is encoded.
///
/// The encoding is detected from the filename suffixes
/// (`planet.osm.pbf`, `history.osh.bz2`, `changes.osc.gz`) unless it is
/// given explicitly with [`File::with_format`]. A filename of `-` or
/// the empty string stands for standard input, which has no suffix to
/// detect from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct File {
    filename: String,
    format: FileFormat,
    compression: FileCompression,
    has_multiple_object_versions: bool,
}

impl File {
    /// Describe `filename`, detecting the format from its suffixes.
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let suffixes: Vec<String> = Path::new(&filename)
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.split('.').skip(1).map(str::to_ascii_lowercase).collect())
            .unwrap_or_default();

        let detected = detect(&suffixes).unwrap_or_default();
        Self {
            filename,
            format: detected.format,
            compression: detected.compression,
            has_multiple_object_versions: detected.history,
        }
    }

    /// Describe `filename` with an explicit format string such as
    /// `"pbf"`, `"osm.bz2"` or `"osh"`, overriding suffix detection.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::UnknownFormat`] if the string does not name a
    /// known format.
    pub fn with_format(filename: impl Into<String>, format: &str) -> Result<Self, TypeError> {
        let suffixes: Vec<String> = format.split('.').map(str::to_ascii_lowercase).collect();
        let detected = detect(&suffixes)
            .filter(|d| d.format != FileFormat::Unknown)
            .ok_or_else(|| TypeError::UnknownFormat(format.to_string()))?;

        Ok(Self {
            filename: filename.into(),
            format: detected.format,
            compression: detected.compression,
            has_multiple_object_versions: detected.history,
        })
    }

    /// Replace the format, keeping everything else.
    #[must_use]
    pub fn set_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn format(&self) -> FileFormat {
        self.format
    }

    #[must_use]
    pub fn compression(&self) -> FileCompression {
        self.compression
    }

    /// Whether the suffix marks history or change data.
    #[must_use]
    pub fn has_multiple_object_versions(&self) -> bool {
        self.has_multiple_object_versions
    }

    /// Whether the file stands for standard input.
    #[must_use]
    pub fn is_stdin(&self) -> bool {
        self.filename.is_empty() || self.filename == "-"
    }
}

#[derive(Default)]
struct Detected {
    format: FileFormat,
    compression: FileCompression,
    history: bool,
}

/// Interpret a chain of suffixes, last one first.
///
/// Returns `None` if a suffix is present but not understood.
fn detect(suffixes: &[String]) -> Option<Detected> {
    let mut detected = Detected::default();
    let mut rest = suffixes;

    if let Some((last, head)) = rest.split_last() {
        let compression = match last.as_str() {
            "gz" => Some(FileCompression::Gzip),
            "bz2" => Some(FileCompression::Bzip2),
            _ => None,
        };
        if let Some(compression) = compression {
            detected.compression = compression;
            rest = head;
        }
    }

    let Some(last) = rest.last() else {
        return Some(detected);
    };
    let (format, history) = match last.as_str() {
        "osm" | "xml" => (FileFormat::Xml, false),
        "osh" | "osc" => (FileFormat::Xml, true),
        "pbf" => (FileFormat::Pbf, false),
        "opl" => (FileFormat::Opl, false),
        "json" | "geojson" => (FileFormat::Json, false),
        "o5m" => (FileFormat::O5m, false),
        "o5c" => (FileFormat::O5m, true),
        "debug" => (FileFormat::Debug, false),
        _ => return None,
    };
    detected.format = format;
    detected.history = history;
    Some(detected)
}
