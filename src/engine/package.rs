//! Access to the text-bearing XML parts of a zipped `.docx` package.
//!
//! A [`Package`] decodes the body, header and footer parts once and keeps the
//! source bytes untouched. Rebuilding copies every entry that was not
//! rewritten verbatim, compressed bytes included.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Cursor, Read, Write};

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::EngineError;

/// Path of the main document part inside the package.
pub const BODY_PART: &str = "word/document.xml";

/// Kind of a text-bearing part, with its 1-based number for headers and footers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Body,
    Header(u32),
    Footer(u32),
}

impl PartKind {
    /// Conventional path of this part inside the package.
    pub fn path(&self) -> String {
        match self {
            Self::Body => BODY_PART.to_string(),
            Self::Header(n) => format!("word/header{n}.xml"),
            Self::Footer(n) => format!("word/footer{n}.xml"),
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body => write!(f, "body"),
            Self::Header(n) => write!(f, "header{n}"),
            Self::Footer(n) => write!(f, "footer{n}"),
        }
    }
}

/// One decoded text-bearing part.
#[derive(Debug, Clone)]
pub struct Part {
    pub kind: PartKind,
    pub xml: String,
}

impl Part {
    pub fn path(&self) -> String {
        self.kind.path()
    }
}

/// A template package opened for reading.
///
/// Parts are listed in processing order: body, headers ascending, footers
/// ascending. Numbering stops at the first missing index.
pub struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    parts: Vec<Part>,
}

impl<'a> Package<'a> {
    /// Open a package and decode its text-bearing parts.
    pub fn open(bytes: &'a [u8]) -> Result<Self, EngineError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| EngineError::MalformedPackage(format!("not a zip container: {e}")))?;

        let mut parts = Vec::new();
        match read_part(&mut archive, PartKind::Body)? {
            Some(part) => parts.push(part),
            None => {
                return Err(EngineError::MalformedPackage(format!(
                    "missing {BODY_PART}"
                )))
            }
        }
        read_numbered(&mut archive, PartKind::Header, &mut parts)?;
        read_numbered(&mut archive, PartKind::Footer, &mut parts)?;

        Ok(Self { archive, parts })
    }

    /// Text-bearing parts in processing order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, kind: PartKind) -> Option<&Part> {
        self.parts.iter().find(|p| p.kind == kind)
    }

    /// Serialize a new package where the parts named in `replaced` (keyed by
    /// path) carry new content. `self` is left unchanged.
    pub fn rebuild(&self, replaced: &BTreeMap<String, String>) -> Result<Vec<u8>, EngineError> {
        let mut archive = self.archive.clone();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index)?;
            let name = entry.name().to_string();
            match replaced.get(&name) {
                Some(content) => {
                    drop(entry);
                    writer.start_file(name, options)?;
                    writer.write_all(content.as_bytes())?;
                }
                None => writer.raw_copy_file(entry)?,
            }
        }

        Ok(writer.finish()?.into_inner())
    }
}

fn read_numbered(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    kind: fn(u32) -> PartKind,
    parts: &mut Vec<Part>,
) -> Result<(), EngineError> {
    let mut n = 1;
    while let Some(part) = read_part(archive, kind(n))? {
        parts.push(part);
        n += 1;
    }
    Ok(())
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    kind: PartKind,
) -> Result<Option<Part>, EngineError> {
    let path = kind.path();
    let mut entry = match archive.by_name(&path) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(EngineError::MalformedPackage(format!(
                "cannot read {path}: {e}"
            )))
        }
    };

    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| EngineError::MalformedPackage(format!("cannot decode {path}: {e}")))?;

    Ok(Some(Part { kind, xml }))
}
