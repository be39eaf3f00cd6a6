use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, State},
    http::header,
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::{info, warn};
use url::Url;
use utoipa::ToSchema;

use crate::AppState;
use crate::api::error::AppError;
use crate::services::links::{LinkOp, RequestOrigin};
use crate::services::media;
use crate::services::storage::StoreError;
use crate::services::upload::StagedUpload;
use crate::utils::format::format_file_size;
use crate::utils::validation::SanitizedName;

/// 400 message enumerating the accepted intake methods
const INTAKE_HINT: &str =
    "No file provided. Send multipart form-data with a 'file' field, or a JSON body with 'file_url'.";

#[derive(Deserialize, ToSchema)]
pub struct UrlUploadRequest {
    /// Publicly reachable http(s) URL the server fetches the payload from
    pub file_url: String,
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub file_name: String,
    pub file_size: u64,
    pub file_size_formatted: String,
    pub file_id: String,
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_url: Option<String>,
    pub file_type: String,
    pub telegram_message_id: i64,
    pub upload_time: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(
        content = UrlUploadRequest,
        description = "Multipart form-data with a `file` field, or this JSON body with `file_url`"
    ),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "No usable intake in the request"),
        (status = 413, description = "Payload exceeds the advertised limit"),
        (status = 502, description = "Backing store did not accept the transfer")
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<UploadResponse>, AppError> {
    let origin = RequestOrigin::from_headers(request.headers());
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let staged = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::Input(e.to_string()))?;
        stage_multipart(&state, multipart).await?
    } else if content_type.starts_with("application/json") {
        let Json(req) = Json::<UrlUploadRequest>::from_request(request, &state)
            .await
            .map_err(|_| AppError::Input(INTAKE_HINT.to_string()))?;
        stage_from_url(&state, &req.file_url).await?
    } else {
        return Err(AppError::Input(INTAKE_HINT.to_string()));
    };

    info!(
        "📤 Storing {} ({})",
        staged.name,
        format_file_size(staged.size)
    );

    let outcome = state
        .coordinator
        .upload(&staged)
        .await
        .map_err(|e| store_rejection(e, state.config.expose_error_details))?;

    let handle = outcome.handle.to_string();
    let kind = media::classify(staged.name.as_str());

    let download_url = origin.url_for(LinkOp::Download, &handle, &staged.name);
    let (stream_url, player_url) = if kind.is_streamable() {
        (
            Some(origin.url_for(LinkOp::Stream, &handle, &staged.name)),
            Some(origin.url_for(LinkOp::Player, &handle, &staged.name)),
        )
    } else {
        (None, None)
    };

    info!(
        "✅ Upload successful: {} via the {} channel",
        staged.name, outcome.channel
    );

    Ok(Json(UploadResponse {
        success: true,
        file_name: staged.name.to_string(),
        file_size: staged.size,
        file_size_formatted: format_file_size(staged.size),
        file_id: handle,
        download_url,
        stream_url,
        player_url,
        file_type: kind.as_str().to_string(),
        telegram_message_id: outcome.message_id,
        upload_time: Utc::now(),
    }))
}

/// Failed writes keep the channel-facing hints of the public surface: an
/// unreachable destination chat is an operator configuration problem (400),
/// anything transport-shaped is a gateway failure (502).
fn store_rejection(err: StoreError, expose_details: bool) -> AppError {
    match err {
        StoreError::NotFound(_) => AppError::Input(
            "Storage channel not accessible. Check the bot permissions.".to_string(),
        ),
        other => AppError::from_store(other, "Failed to store the file", expose_details),
    }
}

async fn stage_multipart(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<StagedUpload, AppError> {
    let result = async {
        let mut staged: Option<StagedUpload> = None;

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            let err_msg = e.to_string();
            if err_msg.contains("length limit exceeded") {
                AppError::PayloadTooLarge(
                    "Request body exceeds the maximum allowed limit".to_string(),
                )
            } else {
                AppError::Input(err_msg)
            }
        })? {
            if field.name() != Some("file") {
                continue;
            }

            let original_name = field.file_name().unwrap_or("unnamed").to_string();
            let name = SanitizedName::new(&original_name);

            let body_with_io_error = field.map_err(std::io::Error::other);
            let reader = StreamReader::new(body_with_io_error);

            staged = Some(stage_to_disk(state, name, reader).await?);
        }

        staged.ok_or_else(|| AppError::Input(INTAKE_HINT.to_string()))
    }
    .await;

    match result {
        Ok(staged) => Ok(staged),
        Err(e) => {
            // Drain what the client is still sending so the rejection arrives
            // as a response instead of a reset connection.
            warn!("⚠️  Upload rejected early ({}), draining the stream", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}

async fn stage_from_url(state: &AppState, file_url: &str) -> Result<StagedUpload, AppError> {
    let parsed =
        Url::parse(file_url).map_err(|_| AppError::Input("file_url is not a valid URL".to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Input(
            "file_url must use the http or https scheme".to_string(),
        ));
    }

    let raw_name = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .unwrap_or("file");
    let name = SanitizedName::new(raw_name);

    info!("📥 Fetching upload source: {}", file_url);

    let response = state.ingest.get(parsed).send().await.map_err(|e| {
        tracing::error!("❌ Source fetch failed: {}", e);
        AppError::Upstream {
            message: "Network error. Check the file URL or try again later.".to_string(),
            detail: state.config.expose_error_details.then(|| e.to_string()),
        }
    })?;

    if !response.status().is_success() {
        return Err(AppError::Input(format!(
            "Source URL answered {}",
            response.status()
        )));
    }

    if let Some(len) = response.content_length() {
        if len > state.config.max_file_size {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large. Maximum size: {}",
                format_file_size(state.config.max_file_size)
            )));
        }
    }

    let reader = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));
    stage_to_disk(state, name, reader).await
}

/// Copy an inbound byte stream into a uniquely named file under the staging
/// directory, enforcing the advertised size cap while bytes arrive. The
/// returned guard deletes the file when dropped.
async fn stage_to_disk(
    state: &AppState,
    name: SanitizedName,
    reader: impl AsyncRead + Unpin + Send,
) -> Result<StagedUpload, AppError> {
    let path = tempfile::Builder::new()
        .prefix("staged-")
        .tempfile_in(&state.config.upload_dir)
        .map_err(|e| AppError::Internal(format!("create staging file: {}", e)))?
        .into_temp_path();

    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| AppError::Internal(format!("open staging file: {}", e)))?;

    // One extra byte makes an over-cap source detectable without reading it out.
    let mut limited = reader.take(state.config.max_file_size + 1);
    let size = tokio::io::copy(&mut limited, &mut file)
        .await
        .map_err(|e| AppError::Internal(format!("stage upload: {}", e)))?;
    file.flush()
        .await
        .map_err(|e| AppError::Internal(format!("flush staging file: {}", e)))?;

    if size > state.config.max_file_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File too large. Maximum size: {}",
            format_file_size(state.config.max_file_size)
        )));
    }

    Ok(StagedUpload { path, size, name })
}
