//! Substitution of bound values into a template package.
//!
//! Placeholders are located directly in the part XML so that one which
//! straddles several runs is replaced as a whole: the span from `{{` to the
//! first `}}`, markup included, collapses into the escaped value. Placeholders
//! without a binding are left exactly as they were.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::debug;
use regex::{Captures, Regex};

use super::common::{escape_xml, format_czech_date, sanitize_field_name, today_czech};
use super::package::Package;
use super::traits::Render;
use super::{EngineError, TODAY_FIELD};

lazy_static! {
    /// `{{`, the shortest run of anything (markup included), `}}`.
    static ref SPLIT_PLACEHOLDER: Regex = Regex::new(r"(?s)\{\{(.*?)\}\}").unwrap();
    static ref TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref RUN_OPEN: Regex = Regex::new(r#"^<w:t(?:\s[^>]*[^/>])?>$"#).unwrap();
}

/// Field values keyed by lowercased field name. Last write wins.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(field), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(&normalize_key(field)).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(&normalize_key(field))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (field, value) in iter {
            bindings.insert(field.as_ref(), value);
        }
        bindings
    }
}

fn normalize_key(field: &str) -> String {
    field.trim().to_lowercase()
}

/// Rewrites template packages, always binding the date field.
#[derive(Debug, Clone)]
pub struct DocumentMerger {
    today: String,
}

impl Default for DocumentMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentMerger {
    /// Merger whose date field holds today's date.
    pub fn new() -> Self {
        Self {
            today: today_czech(),
        }
    }

    /// Merger whose date field holds `date`.
    pub fn with_date(date: NaiveDate) -> Self {
        Self {
            today: format_czech_date(date),
        }
    }

    /// Value bound to the date field.
    pub fn today(&self) -> &str {
        &self.today
    }

    /// Merge `bindings` into the template and return the new package bytes.
    pub fn merge(&self, template: &[u8], bindings: &Bindings) -> Result<Vec<u8>, EngineError> {
        let package = Package::open(template)?;
        self.merge_package(&package, bindings)
    }

    /// Merge into an already opened package without modifying it.
    pub fn merge_package(
        &self,
        package: &Package<'_>,
        bindings: &Bindings,
    ) -> Result<Vec<u8>, EngineError> {
        let mut effective = bindings.clone();
        effective.insert(TODAY_FIELD, self.today.clone());

        let mut replaced = BTreeMap::new();
        for part in package.parts() {
            if let Cow::Owned(xml) = substitute_placeholders(&part.xml, &effective) {
                if xml != part.xml {
                    debug!("Rewrote placeholders in {}", part.kind);
                    replaced.insert(part.path(), xml);
                }
            }
        }

        package.rebuild(&replaced)
    }
}

impl Render for DocumentMerger {
    fn render(&self, package: &Package<'_>, bindings: &Bindings) -> Result<Vec<u8>, EngineError> {
        self.merge_package(package, bindings)
    }
}

/// Replace every bound placeholder in one part's XML.
pub fn substitute_placeholders<'x>(xml: &'x str, bindings: &Bindings) -> Cow<'x, str> {
    SPLIT_PLACEHOLDER.replace_all(xml, |caps: &Captures| {
        let candidate = sanitize_field_name(&placeholder_text(&caps[1]));
        match bindings.get(&candidate) {
            Some(value) => escape_xml(value),
            None => caps[0].to_string(),
        }
    })
}

/// Literal text of a placeholder span.
///
/// The span starts inside a text run; an opening `<w:t>` enters a run and any
/// other tag leaves it. Only text inside runs is kept.
fn placeholder_text(content: &str) -> String {
    let mut text = String::new();
    let mut in_run = true;
    let mut last = 0;

    for tag in TAG.find_iter(content) {
        if in_run {
            text.push_str(&content[last..tag.start()]);
        }
        in_run = RUN_OPEN.is_match(tag.as_str());
        last = tag.end();
    }
    if in_run {
        text.push_str(&content[last..]);
    }

    text
}
