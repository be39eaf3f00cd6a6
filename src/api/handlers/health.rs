use crate::AppState;
use crate::utils::format::format_file_size;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub version: String,
}

#[derive(Serialize, ToSchema)]
pub struct ApiInfoResponse {
    pub name: String,
    pub version: String,
    pub max_file_size: u64,
    pub max_file_size_formatted: String,
    pub chunk_size: u64,
    pub client_channel_active: bool,
    pub operations: Vec<String>,
    pub supported_video_formats: Vec<String>,
    pub supported_audio_formats: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_status = if state.config.bot_token.is_empty() {
        "not configured"
    } else {
        "configured"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        storage: storage_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/info",
    responses(
        (status = 200, description = "Service capabilities and limits", body = ApiInfoResponse)
    ),
    tag = "system"
)]
pub async fn api_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiInfoResponse {
        name: "Hostio File Relay API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        max_file_size: state.config.max_file_size,
        max_file_size_formatted: format_file_size(state.config.max_file_size),
        chunk_size: state.config.chunk_size,
        client_channel_active: state.coordinator.richer_active(),
        operations: vec![
            "POST /upload".to_string(),
            "GET /download/{file_id}".to_string(),
            "GET /stream/{file_id}".to_string(),
            "GET /player/{file_id}".to_string(),
            "GET /health".to_string(),
            "GET /api/info".to_string(),
        ],
        supported_video_formats: crate::services::media::VIDEO_EXTENSIONS
            .iter()
            .map(|ext| ext.to_string())
            .collect(),
        supported_audio_formats: crate::services::media::AUDIO_EXTENSIONS
            .iter()
            .map(|ext| ext.to_string())
            .collect(),
    })
}
