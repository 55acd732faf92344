//! Bulk generation: one document per validated data row.
//!
//! Output filenames are made unique before any rendering happens, so the
//! numbering depends only on row order. A row that fails to render is
//! recorded in the [`GenerationReport`] and the batch carries on.

use std::collections::{HashMap, HashSet};

use log::{info, warn};
use serde::Serialize;

use super::common::docx_stem;
use super::merge::{Bindings, DocumentMerger};
use super::package::Package;
use super::rows::CsvRow;
use super::traits::Render;
use super::{EngineError, GeneratedDocument};

/// Summary of one batch, returned alongside the generated documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub total_rows: usize,
    pub successful_documents: usize,
    pub failed_documents: usize,
    pub errors: Vec<String>,
}

impl GenerationReport {
    pub fn has_failures(&self) -> bool {
        self.failed_documents > 0
    }
}

#[derive(Debug)]
pub struct BatchOutput {
    pub documents: Vec<GeneratedDocument>,
    pub report: GenerationReport,
}

/// Name used for a row whose filename is nothing but the extension.
const FALLBACK_FILENAME: &str = "document";

/// Give every repeated filename a numeric suffix (`_1`, `_2`, ...).
///
/// Names are compared without their `.docx` extension, which the archive
/// appends. The first occurrence keeps its name. A suffixed name that is
/// already taken keeps counting, so the result never contains the same name
/// twice.
pub fn resolve_duplicate_filenames(rows: Vec<CsvRow>) -> Vec<CsvRow> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut counters: HashMap<String, usize> = HashMap::new();

    rows.into_iter()
        .map(|mut row| {
            row.filename = match docx_stem(&row.filename) {
                "" => FALLBACK_FILENAME.to_string(),
                stem => stem.to_string(),
            };
            if taken.contains(&row.filename) {
                let counter = counters.entry(row.filename.clone()).or_insert(0);
                let mut candidate;
                loop {
                    *counter += 1;
                    candidate = format!("{}_{}", row.filename, counter);
                    if !taken.contains(&candidate) {
                        break;
                    }
                }
                row.filename = candidate;
            }
            taken.insert(row.filename.clone());
            row
        })
        .collect()
}

/// Drives a [`Render`] implementation over every row of a batch.
pub struct BatchGenerator<R: Render = DocumentMerger> {
    renderer: R,
}

impl BatchGenerator<DocumentMerger> {
    pub fn new() -> Self {
        Self::with_renderer(DocumentMerger::new())
    }
}

impl Default for BatchGenerator<DocumentMerger> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Render> BatchGenerator<R> {
    pub fn with_renderer(renderer: R) -> Self {
        Self { renderer }
    }

    /// Generate one document per row from `template`.
    ///
    /// Only values of `fields` are bound. Fails with `MalformedPackage` before
    /// any row when the template is unreadable, and with `EmptyResult` when no
    /// row produced a document.
    pub fn generate(
        &self,
        template: &[u8],
        fields: &[String],
        rows: Vec<CsvRow>,
    ) -> Result<BatchOutput, EngineError> {
        let package = Package::open(template)?;
        let allowed: HashSet<String> = fields.iter().map(|f| f.trim().to_lowercase()).collect();
        let rows = resolve_duplicate_filenames(rows);

        let mut report = GenerationReport {
            total_rows: rows.len(),
            ..Default::default()
        };
        let mut documents = Vec::with_capacity(rows.len());

        for (index, row) in rows.into_iter().enumerate() {
            let bindings: Bindings = row
                .fields
                .iter()
                .filter(|(field, _)| allowed.contains(&field.trim().to_lowercase()))
                .collect();

            match self.renderer.render(&package, &bindings) {
                Ok(bytes) => documents.push(GeneratedDocument {
                    filename: row.filename,
                    bytes,
                }),
                Err(e) => {
                    let failure = EngineError::RowGeneration {
                        filename: row.filename,
                        message: e.to_string(),
                    };
                    warn!("Row {} failed: {}", index + 1, failure);
                    report.errors.push(failure.to_string());
                }
            }
        }

        report.successful_documents = documents.len();
        report.failed_documents = report.errors.len();

        if documents.is_empty() {
            return Err(EngineError::EmptyResult {
                details: report.errors,
            });
        }

        info!(
            "Batch finished: {}/{} documents generated",
            report.successful_documents, report.total_rows
        );

        Ok(BatchOutput { documents, report })
    }
}
