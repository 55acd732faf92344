use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod engine;
pub mod state;
pub mod storage;
pub mod templates;

pub use crate::config::AppConfig;
pub use crate::state::AppState;

/// Response header carrying the JSON generation report of a partial bulk run.
pub const GENERATION_WARNINGS_HEADER: &str = "x-generation-warnings";
/// Response header carrying the data-file warnings of a bulk run as a JSON array.
pub const DATA_FILE_WARNINGS_HEADER: &str = "x-data-file-warnings";

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            details: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::templates::handlers::list_templates,
        crate::templates::handlers::get_template,
        crate::templates::handlers::update_template,
        crate::templates::handlers::delete_template,
        crate::templates::handlers::upload_template,
        crate::templates::handlers::reupload_template,
        crate::templates::handlers::download_template,
        crate::templates::handlers::generate_document,
        crate::templates::handlers::bulk_generate,
        crate::templates::handlers::get_statistics
    ),
    components(
        schemas(
            templates::models::Template,
            templates::models::UpdateTemplateRequest,
            templates::models::MergeFieldValue,
            templates::models::GenerateRequest,
            templates::models::UploadTemplateRequest,
            templates::models::ReuploadTemplateRequest,
            templates::models::BulkGenerateRequest,
            templates::models::ReuploadResponse,
            templates::models::Statistics,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Templates", description = "Template management endpoints."),
        (name = "Generation", description = "Single and bulk document generation."),
        (name = "Statistics", description = "Usage statistics.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Localhost server")
    )
)]
pub struct ApiDoc;

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = web::Data::new(AppState::new(config.clone()));

    let prometheus = match PrometheusMetricsBuilder::new("docx_template_server")
        .endpoint("/metrics")
        .build()
    {
        Ok(prometheus) => prometheus,
        Err(e) => {
            log::error!("Failed to create Prometheus metrics middleware: {}", e);
            std::process::exit(1);
        }
    };

    log::info!(
        "Starting server at http://{}:{} (templates stored in {})",
        config.host,
        config.port,
        config.storage_dir.display()
    );

    let origins = config.cors_allowed_origins.clone();
    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .expose_headers(vec![
                header::CONTENT_DISPOSITION,
                header::HeaderName::from_static(GENERATION_WARNINGS_HEADER),
                header::HeaderName::from_static(DATA_FILE_WARNINGS_HEADER),
            ])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .service(web::scope("/api").configure(templates::handlers::config))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
