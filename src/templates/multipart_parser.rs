use actix_multipart::{Field, Multipart};
use actix_web::HttpResponse;
use futures::StreamExt;
use sanitize_filename::sanitize;
use uuid::Uuid;

use crate::templates::models::NewTemplate;
use crate::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum MultipartParseError {
    #[error("Multipart field error: {0}")]
    FieldError(String),
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid field: {0}")]
    InvalidField(String),
    #[error("Payload too large: limit is {0} bytes")]
    TooLarge(usize),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Invalid UTF-8 data: {0}")]
    Utf8Error(String),
}

impl From<MultipartParseError> for HttpResponse {
    fn from(error: MultipartParseError) -> Self {
        match error {
            MultipartParseError::IoError(_) => HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&error.to_string())),
            MultipartParseError::TooLarge(_) => HttpResponse::PayloadTooLarge()
                .json(ErrorResponse::new("PayloadTooLarge", &error.to_string())),
            _ => HttpResponse::BadRequest().json(ErrorResponse::bad_request(&error.to_string())),
        }
    }
}

/// A file part read from a multipart payload.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Bulk-generation form: target template and data file.
#[derive(Debug)]
pub struct BulkForm {
    pub template_id: Uuid,
    pub csv_filename: String,
    pub csv: String,
}

async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, MultipartParseError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field.next().await {
        let data_chunk = chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
        if buffer.len() + data_chunk.len() > limit {
            return Err(MultipartParseError::TooLarge(limit));
        }
        buffer.extend_from_slice(&data_chunk);
    }
    Ok(buffer)
}

async fn read_text(field: &mut Field, limit: usize) -> Result<String, MultipartParseError> {
    let bytes = read_field(field, limit).await?;
    String::from_utf8(bytes).map_err(|e| MultipartParseError::Utf8Error(e.to_string()))
}

fn field_names(field: &Field) -> Result<(String, Option<String>), MultipartParseError> {
    let content_disposition = field.content_disposition().ok_or_else(|| {
        MultipartParseError::FieldError("Content disposition not found".to_string())
    })?;
    let name = content_disposition
        .get_name()
        .ok_or_else(|| MultipartParseError::FieldError("Field name not found".to_string()))?
        .to_string();
    let filename = content_disposition.get_filename().map(|f| sanitize(f));
    Ok((name, filename))
}

pub struct MultipartParser;

impl MultipartParser {
    /// Read the `file`, `name`, `note` and `group` fields of a template upload.
    pub async fn parse_template_upload(
        mut multipart: Multipart,
        limit: usize,
    ) -> Result<NewTemplate, MultipartParseError> {
        let mut file: Option<UploadedFile> = None;
        let mut name = String::new();
        let mut note = String::new();
        let mut group = String::new();

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let (field_name, filename) = field_names(&field)?;

            match field_name.as_str() {
                "file" => {
                    let bytes = read_field(&mut field, limit).await?;
                    file = Some(UploadedFile {
                        filename: filename.unwrap_or_default(),
                        bytes,
                    });
                }
                "name" => name = read_text(&mut field, limit).await?,
                "note" => note = read_text(&mut field, limit).await?,
                "group" => group = read_text(&mut field, limit).await?,
                _ => continue,
            }
        }

        let file = file.ok_or(MultipartParseError::MissingField("file"))?;
        Ok(NewTemplate {
            name,
            note,
            group,
            original_filename: file.filename,
            bytes: file.bytes,
        })
    }

    /// Read the single `file` field of a reupload.
    pub async fn parse_file(
        mut multipart: Multipart,
        limit: usize,
    ) -> Result<UploadedFile, MultipartParseError> {
        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let (field_name, filename) = field_names(&field)?;

            if field_name == "file" {
                let bytes = read_field(&mut field, limit).await?;
                return Ok(UploadedFile {
                    filename: filename.unwrap_or_default(),
                    bytes,
                });
            }
        }

        Err(MultipartParseError::MissingField("file"))
    }

    /// Read the `templateId` and `csvFile` fields of a bulk generation.
    pub async fn parse_bulk_form(
        mut multipart: Multipart,
        limit: usize,
    ) -> Result<BulkForm, MultipartParseError> {
        let mut template_id: Option<Uuid> = None;
        let mut csv: Option<(String, String)> = None;

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let (field_name, filename) = field_names(&field)?;

            match field_name.as_str() {
                "templateId" => {
                    let value = read_text(&mut field, limit).await?;
                    let id = Uuid::parse_str(value.trim()).map_err(|_| {
                        MultipartParseError::InvalidField("templateId is not a valid UUID".to_string())
                    })?;
                    template_id = Some(id);
                }
                "csvFile" => {
                    let content = read_text(&mut field, limit).await?;
                    csv = Some((filename.unwrap_or_default(), content));
                }
                _ => continue,
            }
        }

        let template_id = template_id.ok_or(MultipartParseError::MissingField("templateId"))?;
        let (csv_filename, csv) = csv.ok_or(MultipartParseError::MissingField("csvFile"))?;
        if !csv_filename.to_lowercase().ends_with(".csv") {
            return Err(MultipartParseError::InvalidField(
                "csvFile must be a .csv file".to_string(),
            ));
        }

        Ok(BulkForm {
            template_id,
            csv_filename,
            csv,
        })
    }
}
