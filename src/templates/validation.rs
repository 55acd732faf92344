//! Input validation for template metadata.
//!
//! Collects every problem with a request before rejecting it, so the caller
//! can fix all of them at once.

use std::fmt;

use crate::engine::DOCX_EXTENSION;

use super::models::{NewTemplate, UpdateTemplateRequest};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_GROUP_CHARS: usize = 50;
pub const MAX_NOTE_CHARS: usize = 500;

/// Trait for validating request objects.
pub trait Validator {
    /// Validate the state of the object.
    fn validate(&self) -> Result<(), String>;
}

/// Validation error with a user-facing message.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn empty_field(field: &str, label: &str) -> Self {
        Self::new(field, format!("{label} is required"))
    }

    pub fn too_long(field: &str, label: &str, max: usize) -> Self {
        Self::new(field, format!("{label} must be {max} characters or less"))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors with formatted output.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// All messages joined into one line.
    pub fn to_message(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Convert to Result - Ok if no errors, Err with formatted message if errors exist
    pub fn into_result(self) -> Result<(), String> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.to_message())
        }
    }
}

/// Validate that a string is not empty after trimming
pub fn validate_required(value: &str, field: &str, label: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, label));
    }
}

pub fn validate_max_len(
    value: &str,
    max: usize,
    field: &str,
    label: &str,
    errors: &mut ValidationErrors,
) {
    if value.chars().count() > max {
        errors.add(ValidationError::too_long(field, label, max));
    }
}

/// Validate that an uploaded file carries the `.docx` extension
pub fn validate_docx_filename(filename: &str, field: &str, errors: &mut ValidationErrors) {
    if !filename.to_lowercase().ends_with(DOCX_EXTENSION) {
        errors.add(ValidationError::new(
            field,
            format!("File must be a {DOCX_EXTENSION} document"),
        ));
    }
}

impl Validator for NewTemplate {
    fn validate(&self) -> Result<(), String> {
        let mut errors = ValidationErrors::new();

        validate_required(&self.name, "name", "Name", &mut errors);
        validate_max_len(&self.name, MAX_NAME_CHARS, "name", "Name", &mut errors);
        validate_max_len(&self.group, MAX_GROUP_CHARS, "group", "Group", &mut errors);
        validate_max_len(&self.note, MAX_NOTE_CHARS, "note", "Note", &mut errors);
        validate_docx_filename(&self.original_filename, "file", &mut errors);
        if self.bytes.is_empty() {
            errors.add(ValidationError::empty_field("file", "File"));
        }

        errors.into_result()
    }
}

impl Validator for UpdateTemplateRequest {
    fn validate(&self) -> Result<(), String> {
        let mut errors = ValidationErrors::new();

        if self.name.is_none() && self.note.is_none() && self.group.is_none() {
            errors.add(ValidationError::new(
                "body",
                "At least one field (name, note, or group) is required",
            ));
        }
        if let Some(name) = &self.name {
            validate_required(name, "name", "Name", &mut errors);
            validate_max_len(name, MAX_NAME_CHARS, "name", "Name", &mut errors);
        }
        if let Some(group) = &self.group {
            validate_max_len(group, MAX_GROUP_CHARS, "group", "Group", &mut errors);
        }
        if let Some(note) = &self.note {
            validate_max_len(note, MAX_NOTE_CHARS, "note", "Note", &mut errors);
        }

        errors.into_result()
    }
}
