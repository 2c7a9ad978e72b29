//! REST endpoint for image defect analysis

use std::path::{Path, PathBuf};

use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::model::Config;
use crate::service::AnalysisService;

/// Request body for `/analyze`
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Image path relative to the server data root
    pub file_path: Option<String>,
}

/// Analyze an image for surface defects
#[utoipa::path(
    post,
    path = "/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis completed", body = crate::model::AnalysisResult),
        (status = 400, description = "No file path provided", body = crate::api::error::ErrorResponse),
        (status = 404, description = "File not found", body = crate::api::error::ErrorResponse),
        (status = 500, description = "Analysis failed", body = crate::api::error::ErrorResponse)
    ),
    tag = "analysis"
)]
#[post("/analyze")]
pub async fn analyze(
    service: web::Data<AnalysisService>,
    config: web::Data<Config>,
    body: Option<web::Json<AnalyzeRequest>>,
) -> Result<HttpResponse, ApiError> {
    let file_path = body
        .and_then(|b| b.into_inner().file_path)
        .ok_or(ApiError::MissingFilePath)?;

    let full_path =
        resolve_data_path(&config.data_root, &file_path).ok_or(ApiError::FileNotFound)?;

    let result = service.analyze(&full_path).await?;

    tracing::info!(
        file_path = %file_path,
        is_defect = result.is_defect,
        severity = ?result.suggested_severity,
        observation = %result.ai_observation,
        "Analysis complete"
    );

    Ok(HttpResponse::Ok().json(result))
}

/// Resolve a request-supplied relative path against the data root
///
/// Returns None when the path does not exist or escapes the root.
fn resolve_data_path(root: &Path, relative: &str) -> Option<PathBuf> {
    let root = root.canonicalize().ok()?;
    let full = root.join(relative.trim_start_matches('/')).canonicalize().ok()?;
    full.starts_with(&root).then_some(full)
}

/// Configure analysis routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(analyze);
}
