use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::engine::DOCX_EXTENSION;
use crate::storage::UsageCounters;

/// Group assigned to templates uploaded without one.
pub const DEFAULT_GROUP: &str = "Uncategorized";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub note: String,
    pub group: String,
    pub original_filename: String,
    /// Placeholder names found in the uploaded package, in discovery order.
    pub fields: Vec<String>,
    pub blob_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn new(
        name: String,
        note: String,
        group: String,
        original_filename: String,
        fields: Vec<String>,
    ) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Self {
            id,
            name,
            note,
            group,
            original_filename,
            fields,
            blob_key: format!("{id}{DOCX_EXTENSION}"),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Template upload after the multipart payload has been read.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub note: String,
    pub group: String,
    pub original_filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub note: Option<String>,
    pub group: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct MergeFieldValue {
    pub field: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub template_id: Uuid,
    #[serde(default)]
    pub merge_fields: Vec<MergeFieldValue>,
}

/// Multipart body of `POST /api/templates/upload`.
#[derive(Debug, ToSchema)]
pub struct UploadTemplateRequest {
    #[allow(unused)]
    pub file: Vec<u8>,
    #[allow(unused)]
    pub name: String,
    #[allow(unused)]
    pub note: Option<String>,
    #[allow(unused)]
    pub group: Option<String>,
}

/// Multipart body of `POST /api/templates/{id}/reupload`.
#[derive(Debug, ToSchema)]
pub struct ReuploadTemplateRequest {
    #[allow(unused)]
    pub file: Vec<u8>,
}

/// Multipart body of `POST /api/templates/bulk-generate`.
#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkGenerateRequest {
    #[allow(unused)]
    pub template_id: Uuid,
    #[allow(unused)]
    pub csv_file: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReuploadResponse {
    pub message: String,
    pub fields: Vec<String>,
}

/// Estimated manual effort per generated file, in seconds.
pub const SECONDS_SAVED_PER_FILE: u64 = 30;
/// Estimated manual effort per filled field, in seconds.
pub const SECONDS_SAVED_PER_FIELD: u64 = 20;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub current_template_count: usize,
    pub total_templates_created: u64,
    pub total_files_generated: u64,
    pub total_fields_filled: u64,
    pub last_generation_date: Option<DateTime<Utc>>,
    pub saved_time_seconds: u64,
}

impl Statistics {
    pub fn new(current_template_count: usize, counters: UsageCounters) -> Self {
        Self {
            current_template_count,
            total_templates_created: counters.total_templates_created,
            total_files_generated: counters.total_files_generated,
            total_fields_filled: counters.total_fields_filled,
            last_generation_date: counters.last_generation_date,
            saved_time_seconds: counters.total_files_generated * SECONDS_SAVED_PER_FILE
                + counters.total_fields_filled * SECONDS_SAVED_PER_FIELD,
        }
    }
}
