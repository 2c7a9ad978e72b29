//! OpenAPI specification endpoints

use actix_web::{get, HttpResponse, Responder};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SIR Inspection AI Service",
        description = "Surface-defect analysis and knowledge-base chat for the SIR inspection system"
    ),
    paths(
        crate::api::analyze::analyze,
        crate::api::chat::chat,
        crate::api::health::liveness,
        crate::api::health::readiness,
    ),
    components(schemas(
        crate::api::analyze::AnalyzeRequest,
        crate::api::chat::ChatRequest,
        crate::api::chat::ChatResponse,
        crate::api::error::ErrorResponse,
        crate::model::AnalysisResult,
        crate::model::Severity,
        crate::api::health::HealthStatus,
        crate::api::health::ReadinessStatus,
        crate::api::health::DependencyHealth,
    )),
    tags(
        (name = "analysis", description = "Image defect analysis"),
        (name = "chat", description = "Knowledge-base question answering"),
        (name = "health", description = "Service health probes")
    )
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
#[get("/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Serve OpenAPI YAML specification
#[get("/openapi.yaml")]
pub async fn openapi_yaml() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/yaml")
        .body(ApiDoc::openapi().to_yaml().unwrap())
}

/// Configure OpenAPI routes
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(openapi_json).service(openapi_yaml);
}
