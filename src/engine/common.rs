//! Common utilities for document generation.
//!
//! Shared helpers for date formatting, XML escaping and filename sanitizing.

use chrono::{Datelike, Local, NaiveDate};

use super::DOCX_EXTENSION;

/// Longest output filename kept from a data file, in characters.
pub const MAX_FILENAME_CHARS: usize = 200;

/// Czech month names in the genitive case, as used inside dates.
const CZECH_MONTHS: [&str; 12] = [
    "ledna",
    "února",
    "března",
    "dubna",
    "května",
    "června",
    "července",
    "srpna",
    "září",
    "října",
    "listopadu",
    "prosince",
];

/// Format a date in Czech long form (e.g., "14. října 2025").
pub fn format_czech_date(date: NaiveDate) -> String {
    let month = CZECH_MONTHS[(date.month0() as usize).min(CZECH_MONTHS.len() - 1)];
    format!("{}. {} {}", date.day(), month, date.year())
}

/// Format the current local date in Czech long form.
pub fn today_czech() -> String {
    format_czech_date(Local::now().date_naive())
}

/// Escape the five XML special characters.
pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Reduce recovered placeholder text to the characters a field name may hold.
///
/// Letters and digits of any script survive, so `Jméno` stays `Jméno`.
pub fn sanitize_field_name(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '.' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Sanitize a data-file cell for use as an output filename.
///
/// Strips path separators and characters reserved by common filesystems,
/// collapses whitespace runs and caps the length. May return an empty string.
pub fn sanitize_output_filename(name: &str) -> String {
    let mut result = String::new();
    let mut last_space = false;

    for ch in name.trim().chars() {
        if matches!(ch, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
            continue;
        }
        if ch.is_whitespace() {
            if !last_space {
                result.push(' ');
                last_space = true;
            }
        } else {
            result.push(ch);
            last_space = false;
        }
    }

    let truncated: String = result.chars().take(MAX_FILENAME_CHARS).collect();
    truncated.trim().to_string()
}

/// Drop every trailing `.docx` extension, in any case.
///
/// Archive entries get the extension appended later, so `x` and `x.docx`
/// must compare equal before duplicates are numbered.
pub fn docx_stem(name: &str) -> &str {
    let mut stem = name;
    while let Some(split) = stem.len().checked_sub(DOCX_EXTENSION.len()) {
        match stem.get(split..) {
            Some(tail) if tail.eq_ignore_ascii_case(DOCX_EXTENSION) => {
                stem = stem[..split].trim_end();
            }
            _ => break,
        }
    }
    stem
}

/// Turn a template name into an ASCII-only download filename stem.
pub fn download_stem(name: &str, fallback: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if stem.trim_matches('_').is_empty() {
        return fallback.to_string();
    }
    stem
}
