//! Template lifecycle and document generation on top of the storage traits.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::engine::archive::{build_archive, docx_filename};
use crate::engine::common::download_stem;
use crate::engine::{
    extract_fields, validate_rows, BatchGenerator, Bindings, DocumentMerger, EngineError,
    GeneratedDocument, GenerationReport,
};
use crate::storage::{BlobStore, StatisticsStore, StorageError, TemplateStore};

use super::models::{
    MergeFieldValue, NewTemplate, Statistics, Template, UpdateTemplateRequest, DEFAULT_GROUP,
};
use super::validation::Validator;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Template not found: {0}")]
    NotFound(Uuid),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Background generation task failed: {0}")]
    Blocking(String),
}

/// Result of a bulk generation.
#[derive(Debug)]
pub struct BulkGeneration {
    pub archive_name: String,
    pub archive: Vec<u8>,
    pub report: GenerationReport,
    /// Non-fatal findings from data-file validation.
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct TemplateService {
    blobs: Arc<dyn BlobStore>,
    store: Arc<dyn TemplateStore>,
    statistics: Arc<dyn StatisticsStore>,
}

impl TemplateService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        store: Arc<dyn TemplateStore>,
        statistics: Arc<dyn StatisticsStore>,
    ) -> Self {
        Self {
            blobs,
            store,
            statistics,
        }
    }

    /// Usage counters plus the current template count.
    pub fn statistics(&self) -> Statistics {
        Statistics::new(self.store.list().len(), self.statistics.snapshot())
    }

    pub fn list(&self) -> Vec<Template> {
        self.store.list()
    }

    pub fn get(&self, id: &Uuid) -> Result<Template, ServiceError> {
        self.store.get(id).ok_or(ServiceError::NotFound(*id))
    }

    /// Store a new template after discovering its placeholder fields.
    pub async fn upload(&self, upload: NewTemplate) -> Result<Template, ServiceError> {
        upload.validate().map_err(ServiceError::BadRequest)?;

        let fields = extract_fields(&upload.bytes)?;
        let group = match upload.group.trim() {
            "" => DEFAULT_GROUP.to_string(),
            group => group.to_string(),
        };
        let template = Template::new(
            upload.name.trim().to_string(),
            upload.note,
            group,
            upload.original_filename,
            fields,
        );

        self.blobs.put(&template.blob_key, &upload.bytes).await?;
        self.store.update(template.clone());
        self.statistics.record_template_created();
        info!(
            "Template {} uploaded with {} fields",
            template.id,
            template.fields.len()
        );

        Ok(template)
    }

    /// Replace the package of an existing template; its field list is
    /// regenerated from the new package.
    pub async fn reupload(
        &self,
        id: &Uuid,
        original_filename: String,
        bytes: Vec<u8>,
    ) -> Result<Template, ServiceError> {
        let mut template = self.get(id)?;
        if bytes.is_empty() {
            return Err(ServiceError::BadRequest("File is required".to_string()));
        }

        template.fields = extract_fields(&bytes)?;
        template.original_filename = original_filename;
        template.updated_at = Utc::now();

        self.blobs.put(&template.blob_key, &bytes).await?;
        self.store.update(template.clone());
        info!(
            "Template {} reuploaded with {} fields",
            template.id,
            template.fields.len()
        );

        Ok(template)
    }

    pub fn update(
        &self,
        id: &Uuid,
        request: UpdateTemplateRequest,
    ) -> Result<Template, ServiceError> {
        request.validate().map_err(ServiceError::BadRequest)?;
        let mut template = self.get(id)?;

        if let Some(name) = request.name {
            template.name = name.trim().to_string();
        }
        if let Some(note) = request.note {
            template.note = note;
        }
        if let Some(group) = request.group {
            template.group = group;
        }
        template.updated_at = Utc::now();

        self.store.update(template.clone());
        Ok(template)
    }

    /// Remove the blob, then the record. A failed blob delete keeps the record.
    pub async fn delete(&self, id: &Uuid) -> Result<(), ServiceError> {
        let template = self.get(id)?;
        match self.blobs.delete(&template.blob_key).await {
            Ok(()) => {}
            Err(StorageError::NotFound(key)) => warn!("Blob {} was already missing", key),
            Err(e) => return Err(e.into()),
        }
        self.store.delete(id);
        info!("Template {} deleted", id);
        Ok(())
    }

    /// Original package bytes of a template.
    pub async fn download(&self, id: &Uuid) -> Result<(Template, Vec<u8>), ServiceError> {
        let template = self.get(id)?;
        let bytes = self.blobs.get(&template.blob_key).await?;
        Ok((template, bytes))
    }

    /// Generate one document from caller-supplied values.
    pub async fn generate(
        &self,
        id: &Uuid,
        values: Vec<MergeFieldValue>,
    ) -> Result<GeneratedDocument, ServiceError> {
        let (template, bytes) = self.download(id).await?;
        let bindings: Bindings = values.into_iter().map(|v| (v.field, v.value)).collect();
        debug!("Generating document from {} with {} bindings", id, bindings.len());

        let output = DocumentMerger::new().merge(&bytes, &bindings)?;
        self.statistics
            .record_generation(1, template.fields.len() as u64);
        Ok(GeneratedDocument {
            filename: docx_filename(&format!(
                "{}_generated",
                download_stem(&template.name, "document")
            )),
            bytes: output,
        })
    }

    /// Validate a data file and generate one document per row into a zip.
    pub async fn bulk_generate(
        &self,
        id: &Uuid,
        csv: &str,
    ) -> Result<BulkGeneration, ServiceError> {
        let template = self.get(id)?;
        let (parsed, warnings) = validate_rows(csv, &template.fields).into_result()?;
        let bytes = self.blobs.get(&template.blob_key).await?;

        let fields = template.fields.clone();
        let rows = parsed.rows;
        let (archive, report) = tokio::task::spawn_blocking(move || {
            let output = BatchGenerator::new().generate(&bytes, &fields, rows)?;
            let archive = build_archive(&output.documents)?;
            Ok::<_, EngineError>((archive, output.report))
        })
        .await
        .map_err(|e| ServiceError::Blocking(e.to_string()))??;

        self.statistics.record_generation(
            report.successful_documents as u64,
            template.fields.len() as u64,
        );
        info!(
            "Bulk generation for {}: {} of {} documents",
            id, report.successful_documents, report.total_rows
        );

        Ok(BulkGeneration {
            archive_name: format!(
                "{}_bulk_{}.zip",
                download_stem(&template.name, "templates"),
                Utc::now().format("%Y-%m-%d")
            ),
            archive,
            report,
            warnings,
        })
    }
}
