pub mod api;
pub mod config;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::storage::ObjectStore;
use crate::services::upload::UploadCoordinator;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_file,
        api::handlers::relay::download_file,
        api::handlers::relay::stream_file,
        api::handlers::relay::player_page,
        api::handlers::health::health_check,
        api::handlers::health::api_info,
    ),
    components(
        schemas(
            api::handlers::upload::UrlUploadRequest,
            api::handlers::upload::UploadResponse,
            api::handlers::health::HealthResponse,
            api::handlers::health::ApiInfoResponse,
        )
    ),
    tags(
        (name = "files", description = "Upload and relay endpoints"),
        (name = "system", description = "Service status endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn ObjectStore>,
    pub coordinator: Arc<UploadCoordinator>,
    pub ingest: reqwest::Client,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/api/info", get(api::handlers::health::api_info))
        .route(
            "/upload",
            post(api::handlers::upload::upload_file).layer(axum::extract::DefaultBodyLimit::max(
                // 10MB buffer for multipart framing overhead
                state.config.max_file_size as usize + 10 * 1024 * 1024,
            )),
        )
        .route("/download/:file_id", get(api::handlers::relay::download_file))
        .route("/stream/:file_id", get(api::handlers::relay::stream_file))
        .route("/player/:file_id", get(api::handlers::relay::player_page))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
