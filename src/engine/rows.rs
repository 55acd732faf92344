//! Parsing and validation of `;`-delimited data files for bulk generation.
//!
//! The first header column always names the output file; the remaining
//! columns are matched case-insensitively against the template fields.

use std::collections::{BTreeMap, HashMap};

use csv::{ReaderBuilder, Trim};
use log::debug;
use serde::Serialize;

use super::common::{docx_stem, sanitize_output_filename};
use super::{is_today_field, EngineError, MAX_ROWS};

/// One data row ready for generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRow {
    pub filename: String,
    /// Values keyed by the template's spelling of each field.
    pub fields: BTreeMap<String, String>,
}

/// Successfully parsed data file.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedRows {
    pub filename_column: String,
    /// Data-file columns that feed template fields.
    pub field_columns: Vec<String>,
    pub rows: Vec<CsvRow>,
}

/// Outcome of validating a data file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RowValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub data: Option<ParsedRows>,
}

impl RowValidation {
    fn failed(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            errors,
            warnings,
            data: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty() && self.data.is_some()
    }

    /// Parsed rows plus warnings, or a `Validation` error carrying both lists.
    pub fn into_result(self) -> Result<(ParsedRows, Vec<String>), EngineError> {
        match self.data {
            Some(data) if self.errors.is_empty() => Ok((data, self.warnings)),
            _ => Err(EngineError::Validation {
                errors: self.errors,
                warnings: self.warnings,
            }),
        }
    }
}

fn find_field<'f>(fields: &'f [String], column: &str) -> Option<&'f String> {
    let column = column.to_lowercase();
    fields.iter().find(|f| f.trim().to_lowercase() == column)
}

/// Validate `raw` against the template's field list.
pub fn validate_rows(raw: &str, template_fields: &[String]) -> RowValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(raw.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record.iter().map(|h| h.trim().to_string()).collect(),
        Err(e) => {
            errors.push(format!("CSV parse error: {e}"));
            return RowValidation::failed(errors, warnings);
        }
    };

    if headers.iter().all(|h| h.is_empty()) {
        errors.push("Data file has no header row".to_string());
        return RowValidation::failed(errors, warnings);
    }

    let filename_column = headers[0].clone();
    let candidates = &headers[1..];

    let missing: Vec<&str> = template_fields
        .iter()
        .filter(|f| !is_today_field(f))
        .filter(|f| {
            let wanted = f.trim().to_lowercase();
            !candidates.iter().any(|c| c.to_lowercase() == wanted)
        })
        .map(|f| f.as_str())
        .collect();
    if !missing.is_empty() {
        errors.push(format!(
            "Data file is missing required fields: {}",
            missing.join(", ")
        ));
    }

    let extra: Vec<&str> = candidates
        .iter()
        .filter(|c| !c.is_empty() && find_field(template_fields, c).is_none())
        .map(|c| c.as_str())
        .collect();
    if !extra.is_empty() {
        warnings.push(format!(
            "Data file contains columns that are not in the template (they will be ignored): {}",
            extra.join(", ")
        ));
    }

    if !errors.is_empty() {
        return RowValidation::failed(errors, warnings);
    }

    // (record index, template field name) for every usable column
    let mapping: Vec<(usize, &String)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(i, c)| find_field(template_fields, c).map(|f| (i + 1, f)))
        .collect();
    let field_columns: Vec<String> = mapping.iter().map(|(i, _)| headers[*i].clone()).collect();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(index as u64 + 2, |p| p.line());
                errors.push(format!("CSV parse error on line {line}: {e}"));
                continue;
            }
        };
        let line = record.position().map_or(index as u64 + 2, |p| p.line());

        let sanitized = sanitize_output_filename(record.get(0).unwrap_or(""));
        let filename = docx_stem(&sanitized).to_string();
        if filename.is_empty() {
            warnings.push(format!("Line {line}: empty filename, row skipped"));
            continue;
        }

        let fields = mapping
            .iter()
            .map(|(i, field)| ((*field).clone(), record.get(*i).unwrap_or("").to_string()))
            .collect();

        rows.push(CsvRow { filename, fields });
    }

    if !errors.is_empty() {
        return RowValidation::failed(errors, warnings);
    }

    let duplicates = duplicate_filenames(&rows);
    if !duplicates.is_empty() {
        warnings.push(format!(
            "Duplicate filenames found (they will be numbered): {}",
            duplicates.join(", ")
        ));
    }

    if rows.is_empty() {
        errors.push("Data file contains no valid rows".to_string());
        return RowValidation::failed(errors, warnings);
    }

    if rows.len() > MAX_ROWS {
        errors.push(format!(
            "Data file has too many rows ({}). Maximum: {}",
            rows.len(),
            MAX_ROWS
        ));
        return RowValidation::failed(errors, warnings);
    }

    debug!(
        "Validated data file: {} rows, {} field columns",
        rows.len(),
        field_columns.len()
    );

    RowValidation {
        errors,
        warnings,
        data: Some(ParsedRows {
            filename_column,
            field_columns,
            rows,
        }),
    }
}

/// Filenames seen more than once, in order of first repetition.
fn duplicate_filenames(rows: &[CsvRow]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut duplicates = Vec::new();

    for row in rows {
        let count = counts.entry(row.filename.as_str()).or_insert(0);
        *count += 1;
        if *count == 2 {
            duplicates.push(row.filename.clone());
        }
    }

    duplicates
}
