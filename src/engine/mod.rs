//! Engine module - placeholder discovery and substitution for `.docx` templates.
//!
//! The engine is split into small, stateless components:
//! - `package` - access to the XML parts of a zipped document package
//! - `fields` - discovery of `{{placeholder}}` names in a template
//! - `merge` - substitution of bound values into a template
//! - `rows` - parsing and validation of `;`-delimited data files
//! - `batch` - per-row generation with failure isolation
//! - `archive` - bundling of generated documents into one zip

pub mod archive;
pub mod batch;
pub mod common;
pub mod fields;
pub mod merge;
pub mod package;
pub mod rows;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use archive::build_archive;
pub use batch::{BatchGenerator, BatchOutput, GenerationReport};
pub use fields::extract_fields;
pub use merge::{Bindings, DocumentMerger};
pub use package::{Package, PartKind};
pub use rows::{validate_rows, CsvRow, ParsedRows, RowValidation};
pub use traits::Render;

use thiserror::Error;

/// Name of the field that is always bound to the current date.
pub const TODAY_FIELD: &str = "today";

/// Maximum number of data rows accepted for one bulk generation.
pub const MAX_ROWS: usize = 200;

/// Extension of every generated document.
pub const DOCX_EXTENSION: &str = ".docx";

/// Errors that can occur while processing templates.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed document package: {0}")]
    MalformedPackage(String),
    #[error("data file validation failed: {}", .errors.join("; "))]
    Validation {
        errors: Vec<String>,
        warnings: Vec<String>,
    },
    #[error("failed to generate document for \"{filename}\": {message}")]
    RowGeneration { filename: String, message: String },
    #[error("no documents generated")]
    EmptyResult { details: Vec<String> },
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single generated document ready for download or archiving.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Returns `true` when `name` is the reserved date field, in any case.
pub fn is_today_field(name: &str) -> bool {
    name.trim().to_lowercase() == TODAY_FIELD
}
