//! Discovery of `{{placeholder}}` names in a template package.
//!
//! Word processors often split one placeholder over several text runs, so the
//! text of all runs in a part is joined before the placeholder pattern runs.

use std::collections::HashSet;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use super::package::Package;
use super::{is_today_field, EngineError};

lazy_static! {
    /// Inner text of one `<w:t>` text run.
    static ref TEXT_RUN: Regex =
        Regex::new(r#"<w:t(?:\s[^>]*[^/>])?>([^<]*)</w:t>"#).unwrap();
    /// A placeholder in reconstructed plain text.
    static ref PLAIN_PLACEHOLDER: Regex = Regex::new(r"\{\{([^}]+)\}\}").unwrap();
}

/// Extract the distinct placeholder names from a package.
///
/// Names are returned in discovery order (body, headers, footers) and
/// de-duplicated case-insensitively, keeping the first spelling seen. The
/// reserved date field is never returned.
pub fn extract_fields(bytes: &[u8]) -> Result<Vec<String>, EngineError> {
    let package = Package::open(bytes)?;
    Ok(extract_from_package(&package))
}

/// Same as [`extract_fields`] for an already opened package.
pub fn extract_from_package(package: &Package<'_>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();

    for part in package.parts() {
        let text = run_text(&part.xml);
        for caps in PLAIN_PLACEHOLDER.captures_iter(&text) {
            let name = caps[1].trim();
            if name.is_empty() || is_today_field(name) {
                continue;
            }
            if seen.insert(name.to_lowercase()) {
                fields.push(name.to_string());
            }
        }
        debug!("Scanned {} for placeholders, {} distinct so far", part.kind, fields.len());
    }

    fields
}

/// Concatenated text of every text run in `xml`, in document order.
pub fn run_text(xml: &str) -> String {
    TEXT_RUN
        .captures_iter(xml)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
        .collect()
}
