//! API handlers for the narrative server
//!
//! Provides REST endpoints for:
//! - Questionnaire configuration (active, publish, history, export/import)
//! - Narrative template status, generation and invalidation
//! - Document preview and plain-text export

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use narrative_engine::{render_text, GeneratorStatus, TemplateLookup};
use serde::{Deserialize, Serialize};
use shared_types::{
    AnswerSet, Configuration, ConfigurationSummary, FormDefinition, RenderMode, RenderedDocument,
};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Build the router with every route mounted
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/form-config",
            get(get_form_config).post(publish_form_config),
        )
        .route("/api/form-config/history", get(form_config_history))
        .route("/api/form-config/export", get(export_form_config))
        .route("/api/form-config/import", post(import_form_config))
        .route("/api/form-config/versions/:version", get(get_form_config_version))
        .route(
            "/api/narrative-template",
            get(template_status)
                .post(get_or_generate_template)
                .delete(regenerate_templates),
        )
        .route("/api/documents/preview", post(preview_document))
        .route("/api/documents/export", post(export_document))
        .with_state(state)
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "narrative-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: GET /api/form-config
pub async fn get_form_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Configuration>, ApiError> {
    Ok(Json(state.service.active_configuration().await?))
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub config: FormDefinition,
    pub notes: Option<String>,
    pub author: Option<String>,
}

/// Handler: POST /api/form-config
pub async fn publish_form_config(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<Configuration>, ApiError> {
    info!(
        "Publish request: pages={}, author={:?}",
        req.config.pages.len(),
        req.author
    );

    let config = state
        .service
        .publish(req.config, req.author, req.notes)
        .await?;
    Ok(Json(config))
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub versions: Vec<ConfigurationSummary>,
    pub count: usize,
}

/// Handler: GET /api/form-config/history
pub async fn form_config_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let versions = state.service.history().await?;
    let count = versions.len();
    Ok(Json(HistoryResponse { versions, count }))
}

/// Handler: GET /api/form-config/versions/:version
pub async fn get_form_config_version(
    State(state): State<Arc<AppState>>,
    Path(version): Path<u32>,
) -> Result<Json<Configuration>, ApiError> {
    state
        .service
        .get_version(version)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("configuration version {}", version)))
}

/// Handler: GET /api/form-config/export
pub async fn export_form_config(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let body = state.service.export_definition().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"form-config.json\"",
            ),
        ],
        body,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// Exported definition JSON, as produced by the export route
    pub definition: String,
    pub author: Option<String>,
}

/// Handler: POST /api/form-config/import
pub async fn import_form_config(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<Configuration>, ApiError> {
    let config = state
        .service
        .import_definition(&req.definition, req.author)
        .await?;
    Ok(Json(config))
}

/// Handler: GET /api/narrative-template
pub async fn template_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GeneratorStatus>, ApiError> {
    Ok(Json(state.service.generator_status().await?))
}

/// Handler: POST /api/narrative-template
pub async fn get_or_generate_template(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TemplateLookup>, ApiError> {
    let lookup = state.service.narrative_template().await?;
    debug!(
        "Template {} served (cached={})",
        lookup.template.id, lookup.cached
    );
    Ok(Json(lookup))
}

#[derive(Serialize)]
pub struct RegenerateResponse {
    pub success: bool,
    pub removed: u64,
}

/// Handler: DELETE /api/narrative-template
pub async fn regenerate_templates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RegenerateResponse>, ApiError> {
    let removed = state.service.regenerate_templates().await?;
    Ok(Json(RegenerateResponse {
        success: true,
        removed,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub answers: AnswerSet,
    #[serde(default)]
    pub mode: RenderMode,
}

/// Handler: POST /api/documents/preview
pub async fn preview_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenderRequest>,
) -> Result<Json<RenderedDocument>, ApiError> {
    info!("Preview request: mode={}", req.mode);
    Ok(Json(state.service.render(&req.answers, req.mode).await?))
}

/// Handler: POST /api/documents/export
pub async fn export_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Export request: mode={}", req.mode);
    let document = state.service.render(&req.answers, req.mode).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_text(&document),
    ))
}
