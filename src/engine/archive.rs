//! Bundling of generated documents into one zip archive.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{EngineError, GeneratedDocument, DOCX_EXTENSION};

/// Compression level used for every archive entry.
const ARCHIVE_COMPRESSION_LEVEL: i64 = 6;

/// Append the `.docx` extension unless the name already ends with it.
pub fn docx_filename(name: &str) -> String {
    if name.to_lowercase().ends_with(DOCX_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{DOCX_EXTENSION}")
    }
}

/// Pack `documents` into a zip archive, in the given order.
///
/// Every document must itself be a readable package; a single unreadable one
/// aborts the whole archive.
pub fn build_archive(documents: &[GeneratedDocument]) -> Result<Vec<u8>, EngineError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(ARCHIVE_COMPRESSION_LEVEL));

    for document in documents {
        ZipArchive::new(Cursor::new(document.bytes.as_slice())).map_err(|e| {
            EngineError::MalformedPackage(format!("{}: {e}", document.filename))
        })?;

        writer.start_file(docx_filename(&document.filename), options)?;
        writer.write_all(&document.bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}
