use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::templates::models::Template;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Blob not found: {0}")]
    NotFound(String),
    #[error("Invalid blob key: {0}")]
    InvalidKey(String),
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Binary storage for template files.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Metadata storage for template records.
pub trait TemplateStore: Send + Sync {
    fn get(&self, id: &Uuid) -> Option<Template>;
    fn list(&self) -> Vec<Template>;
    /// Insert or replace the record with the same id.
    fn update(&self, template: Template);
    fn delete(&self, id: &Uuid) -> Option<Template>;
}

/// Cumulative usage counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounters {
    pub total_templates_created: u64,
    pub total_files_generated: u64,
    pub total_fields_filled: u64,
    pub last_generation_date: Option<DateTime<Utc>>,
}

/// Storage for usage counters.
pub trait StatisticsStore: Send + Sync {
    fn snapshot(&self) -> UsageCounters;
    fn record_template_created(&self);
    /// Count `files` generated documents, each filling `fields_per_file` fields.
    fn record_generation(&self, files: u64, fields_per_file: u64);
}

/// Blob store backed by a directory on the local filesystem.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let sanitized = sanitize_filename::sanitize(key);
        if sanitized.is_empty() || sanitized != key {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(sanitized))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, bytes).await?;
        debug!("Stored blob {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Template metadata kept in process memory.
#[derive(Default)]
pub struct InMemoryTemplateStore {
    templates: RwLock<HashMap<Uuid, Template>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn get(&self, id: &Uuid) -> Option<Template> {
        self.templates.read().get(id).cloned()
    }

    fn list(&self) -> Vec<Template> {
        let mut templates: Vec<Template> = self.templates.read().values().cloned().collect();
        templates.sort_by(|a, b| {
            a.group
                .cmp(&b.group)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        templates
    }

    fn update(&self, template: Template) {
        self.templates.write().insert(template.id, template);
    }

    fn delete(&self, id: &Uuid) -> Option<Template> {
        self.templates.write().remove(id)
    }
}

/// Usage counters kept in process memory.
#[derive(Default)]
pub struct InMemoryStatisticsStore {
    counters: RwLock<UsageCounters>,
}

impl InMemoryStatisticsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatisticsStore for InMemoryStatisticsStore {
    fn snapshot(&self) -> UsageCounters {
        self.counters.read().clone()
    }

    fn record_template_created(&self) {
        self.counters.write().total_templates_created += 1;
    }

    fn record_generation(&self, files: u64, fields_per_file: u64) {
        let mut counters = self.counters.write();
        counters.total_files_generated += files;
        counters.total_fields_filled += files * fields_per_file;
        counters.last_generation_date = Some(Utc::now());
    }
}
