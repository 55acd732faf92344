use actix_multipart::Multipart;
use actix_web::http::header::{
    ContentDisposition, DispositionParam, DispositionType, HeaderName, HeaderValue,
};
use actix_web::{web, HttpResponse, Responder};
use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::engine::archive::docx_filename;
use crate::engine::common::download_stem;
use crate::engine::{EngineError, GenerationReport};
use crate::storage::StorageError;
use crate::templates::models::{
    BulkGenerateRequest, GenerateRequest, ReuploadResponse, ReuploadTemplateRequest, Statistics,
    Template, UpdateTemplateRequest, UploadTemplateRequest,
};
use crate::templates::multipart_parser::MultipartParser;
use crate::templates::service::ServiceError;
use crate::templates::validation::{validate_docx_filename, ValidationErrors};
use crate::{AppState, ErrorResponse, DATA_FILE_WARNINGS_HEADER, GENERATION_WARNINGS_HEADER};

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

impl From<ServiceError> for HttpResponse {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::NotFound(_) => {
                HttpResponse::NotFound().json(ErrorResponse::not_found(&error.to_string()))
            }
            ServiceError::BadRequest(message) => {
                HttpResponse::BadRequest().json(ErrorResponse::bad_request(&message))
            }
            ServiceError::Engine(EngineError::Validation { errors, warnings }) => {
                HttpResponse::BadRequest().json(
                    ErrorResponse::bad_request("Data file validation failed")
                        .with_details(errors)
                        .with_warnings(warnings),
                )
            }
            ServiceError::Engine(EngineError::MalformedPackage(message)) => HttpResponse::BadRequest()
                .json(ErrorResponse::bad_request(&format!(
                    "Invalid document package: {message}"
                ))),
            ServiceError::Engine(EngineError::EmptyResult { details }) => {
                HttpResponse::InternalServerError().json(
                    ErrorResponse::internal_error("No documents could be generated")
                        .with_details(details),
                )
            }
            ServiceError::Storage(StorageError::NotFound(_)) => HttpResponse::NotFound()
                .json(ErrorResponse::not_found("Template file not found in storage")),
            other => {
                log::error!("Request failed: {}", other);
                HttpResponse::InternalServerError()
                    .json(ErrorResponse::internal_error(&other.to_string()))
            }
        }
    }
}

fn attachment(content_type: &str, filename: String, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(content_type)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(bytes)
}

/// JSON with every non-ASCII character written as a `\u` escape, so the
/// result is a valid header value.
fn ascii_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    Ok(out)
}

fn json_header_value<T: Serialize>(value: &T) -> Option<HeaderValue> {
    let json = ascii_json(value).ok()?;
    HeaderValue::from_str(&json).ok()
}

/// Report header value, present only when at least one row failed.
fn generation_warnings_header(report: &GenerationReport) -> Option<HeaderValue> {
    if !report.has_failures() {
        return None;
    }
    json_header_value(report)
}

/// JSON array of data-file warnings, present only when there are any.
fn data_file_warnings_header(warnings: &[String]) -> Option<HeaderValue> {
    if warnings.is_empty() {
        return None;
    }
    json_header_value(&warnings)
}

#[utoipa::path(
    context_path = "/api",
    tag = "Templates",
    get,
    path = "/templates",
    responses(
        (status = 200, description = "All templates ordered by group and name", body = [Template])
    )
)]
pub async fn list_templates(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.templates.list())
}

#[utoipa::path(
    context_path = "/api",
    tag = "Templates",
    get,
    path = "/templates/{id}",
    params(
        ("id" = Uuid, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Template found", body = Template),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn get_template(state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
    match state.templates.get(&path.into_inner()) {
        Ok(template) => HttpResponse::Ok().json(template),
        Err(e) => e.into(),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Templates",
    put,
    path = "/templates/{id}",
    params(
        ("id" = Uuid, Path, description = "Template ID")
    ),
    request_body = UpdateTemplateRequest,
    responses(
        (status = 200, description = "Template updated", body = Template),
        (status = 400, description = "Invalid metadata", body = ErrorResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn update_template(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    item: web::Json<UpdateTemplateRequest>,
) -> HttpResponse {
    match state.templates.update(&path.into_inner(), item.into_inner()) {
        Ok(template) => HttpResponse::Ok().json(template),
        Err(e) => e.into(),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Templates",
    delete,
    path = "/templates/{id}",
    params(
        ("id" = Uuid, Path, description = "Template ID")
    ),
    responses(
        (status = 204, description = "Template deleted"),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn delete_template(state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
    match state.templates.delete(&path.into_inner()).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => e.into(),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Templates",
    post,
    path = "/templates/upload",
    request_body(content = UploadTemplateRequest, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Template stored with its discovered fields", body = Template),
        (status = 400, description = "Invalid upload", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    )
)]
pub async fn upload_template(state: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    let upload =
        match MultipartParser::parse_template_upload(payload, state.config.max_upload_bytes).await
        {
            Ok(upload) => upload,
            Err(e) => return e.into(),
        };

    match state.templates.upload(upload).await {
        Ok(template) => HttpResponse::Created().json(template),
        Err(e) => e.into(),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Templates",
    post,
    path = "/templates/{id}/reupload",
    params(
        ("id" = Uuid, Path, description = "Template ID")
    ),
    request_body(content = ReuploadTemplateRequest, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Template file replaced", body = ReuploadResponse),
        (status = 400, description = "Invalid upload", body = ErrorResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn reupload_template(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> HttpResponse {
    let file = match MultipartParser::parse_file(payload, state.config.max_upload_bytes).await {
        Ok(file) => file,
        Err(e) => return e.into(),
    };
    let mut errors = ValidationErrors::new();
    validate_docx_filename(&file.filename, "file", &mut errors);
    if let Err(message) = errors.into_result() {
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&message));
    }

    match state
        .templates
        .reupload(&path.into_inner(), file.filename, file.bytes)
        .await
    {
        Ok(template) => HttpResponse::Ok().json(ReuploadResponse {
            message: "Template file replaced".to_string(),
            fields: template.fields,
        }),
        Err(e) => e.into(),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Templates",
    get,
    path = "/templates/{id}/download",
    params(
        ("id" = Uuid, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Original template file (.docx attachment)"),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn download_template(state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
    match state.templates.download(&path.into_inner()).await {
        Ok((template, bytes)) => attachment(
            DOCX_CONTENT_TYPE,
            docx_filename(&download_stem(&template.name, "template")),
            bytes,
        ),
        Err(e) => e.into(),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Generation",
    post,
    path = "/templates/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generated document (.docx attachment)"),
        (status = 400, description = "Template package is malformed", body = ErrorResponse),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn generate_document(
    state: web::Data<AppState>,
    item: web::Json<GenerateRequest>,
) -> HttpResponse {
    let request = item.into_inner();
    match state
        .templates
        .generate(&request.template_id, request.merge_fields)
        .await
    {
        Ok(document) => attachment(DOCX_CONTENT_TYPE, document.filename, document.bytes),
        Err(e) => e.into(),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Generation",
    post,
    path = "/templates/bulk-generate",
    request_body(content = BulkGenerateRequest, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Zip archive of generated documents. X-Generation-Warnings is set when some rows failed, X-Data-File-Warnings when the data file produced warnings"),
        (status = 400, description = "Data file validation failed", body = ErrorResponse),
        (status = 404, description = "Template not found", body = ErrorResponse),
        (status = 500, description = "No documents could be generated", body = ErrorResponse)
    )
)]
pub async fn bulk_generate(state: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    let form = match MultipartParser::parse_bulk_form(payload, state.config.max_upload_bytes).await
    {
        Ok(form) => form,
        Err(e) => return e.into(),
    };
    info!(
        "Bulk generation requested for {} from {}",
        form.template_id, form.csv_filename
    );

    let result = match state.templates.bulk_generate(&form.template_id, &form.csv).await {
        Ok(result) => result,
        Err(e) => return e.into(),
    };
    for warning in &result.warnings {
        info!("Data file warning: {}", warning);
    }

    let generation_warnings = generation_warnings_header(&result.report);
    if result.report.has_failures() && generation_warnings.is_none() {
        warn!("Could not encode {} header", GENERATION_WARNINGS_HEADER);
    }
    let data_file_warnings = data_file_warnings_header(&result.warnings);

    let mut response = attachment(ZIP_CONTENT_TYPE, result.archive_name, result.archive);
    let headers = response.headers_mut();
    if let Some(value) = generation_warnings {
        headers.insert(HeaderName::from_static(GENERATION_WARNINGS_HEADER), value);
    }
    if let Some(value) = data_file_warnings {
        headers.insert(HeaderName::from_static(DATA_FILE_WARNINGS_HEADER), value);
    }
    response
}

#[utoipa::path(
    context_path = "/api",
    tag = "Statistics",
    get,
    path = "/statistics",
    responses(
        (status = 200, description = "Usage counters and estimated time saved", body = Statistics)
    )
)]
pub async fn get_statistics(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.templates.statistics())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/statistics").route(web::get().to(get_statistics)))
        .service(web::resource("/templates").route(web::get().to(list_templates)))
        .service(web::resource("/templates/upload").route(web::post().to(upload_template)))
        .service(web::resource("/templates/generate").route(web::post().to(generate_document)))
        .service(web::resource("/templates/bulk-generate").route(web::post().to(bulk_generate)))
        .service(
            web::resource("/templates/{id}")
                .route(web::get().to(get_template))
                .route(web::put().to(update_template))
                .route(web::delete().to(delete_template)),
        )
        .service(
            web::resource("/templates/{id}/reupload").route(web::post().to(reupload_template)),
        )
        .service(
            web::resource("/templates/{id}/download").route(web::get().to(download_template)),
        );
}
