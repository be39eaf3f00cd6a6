use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use futures::{StreamExt, TryStreamExt, stream};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use tracing::{debug, info};

use crate::AppState;
use crate::api::error::AppError;
use crate::services::links::{LinkOp, RequestOrigin};
use crate::services::media::{self, MediaKind};
use crate::services::storage::{FileHandle, ObjectLocator, ObjectStore, StoreError};
use crate::utils::validation::SanitizedName;

#[derive(Deserialize)]
pub struct RelayQuery {
    pub filename: Option<String>,
}

/// What one proxied fetch produced: a truthful status, the headers worth
/// propagating, and the body stream.
struct ProxiedObject {
    status: StatusCode,
    content_range: Option<String>,
    content_length: Option<u64>,
    stream: crate::services::storage::ByteStream,
}

#[utoipa::path(
    get,
    path = "/download/{file_id}",
    params(
        ("file_id" = String, Path, description = "Stored file handle"),
        ("filename" = Option<String>, Query, description = "Filename for the Content-Disposition header")
    ),
    responses(
        (status = 200, description = "Full object stream"),
        (status = 206, description = "Requested byte range"),
        (status = 404, description = "Unknown file handle"),
        (status = 502, description = "Backing store unavailable")
    ),
    tag = "files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<RelayQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let handle = parse_handle(&file_id)?;
    let name = SanitizedName::new(query.filename.as_deref().unwrap_or("file"));

    info!("📥 Download request: {}", name);

    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let proxied = proxy_fetch(state.store.clone(), &handle, range)
        .await
        .map_err(|e| relay_error(e, state.config.expose_error_details))?;

    let ProxiedObject {
        status,
        content_range,
        content_length,
        stream,
    } = proxied;

    let mut response = (
        [
            (
                header::CONTENT_TYPE,
                mime::APPLICATION_OCTET_STREAM.to_string(),
            ),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition("attachment", &name),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response();

    apply_relay_parts(&mut response, status, content_range, content_length);

    Ok(response)
}

#[utoipa::path(
    get,
    path = "/stream/{file_id}",
    params(
        ("file_id" = String, Path, description = "Stored file handle"),
        ("filename" = Option<String>, Query, description = "Filename driving the media content type")
    ),
    responses(
        (status = 200, description = "Full media stream"),
        (status = 206, description = "Requested byte range"),
        (status = 404, description = "Unknown file handle"),
        (status = 502, description = "Backing store unavailable")
    ),
    tag = "files"
)]
pub async fn stream_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<RelayQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let handle = parse_handle(&file_id)?;
    let name = SanitizedName::new(query.filename.as_deref().unwrap_or("file"));

    info!("🎬 Stream request: {}", name);

    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let proxied = proxy_fetch(state.store.clone(), &handle, range)
        .await
        .map_err(|e| relay_error(e, state.config.expose_error_details))?;

    let ProxiedObject {
        status,
        content_range,
        content_length,
        stream,
    } = proxied;

    let mut response = (
        [
            (
                header::CONTENT_TYPE,
                media::stream_content_type(name.as_str()),
            ),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                content_disposition("inline", &name),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response();

    apply_relay_parts(&mut response, status, content_range, content_length);

    Ok(response)
}

#[utoipa::path(
    get,
    path = "/player/{file_id}",
    params(
        ("file_id" = String, Path, description = "Stored file handle"),
        ("filename" = Option<String>, Query, description = "Filename driving media detection")
    ),
    responses(
        (status = 200, description = "Embedded media player page"),
        (status = 400, description = "File type has no player"),
        (status = 404, description = "Unknown file handle")
    ),
    tag = "files"
)]
pub async fn player_page(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<RelayQuery>,
    headers: HeaderMap,
) -> Result<Html<String>, AppError> {
    let handle = parse_handle(&file_id)?;
    let name = SanitizedName::new(query.filename.as_deref().unwrap_or("file"));

    let kind = media::classify(name.as_str());
    if !kind.is_streamable() {
        return Err(AppError::Input(
            "File type not supported for playback".to_string(),
        ));
    }

    // Resolve before answering so an unknown handle is a 404, not a page of
    // dead links.
    let first_id = match &handle {
        FileHandle::Single(id) => id.as_str(),
        FileHandle::Chunked(ids) => ids
            .first()
            .map(String::as_str)
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?,
    };
    state
        .store
        .resolve(first_id)
        .await
        .map_err(|e| relay_error(e, state.config.expose_error_details))?;

    let origin = RequestOrigin::from_headers(&headers);
    let handle_text = handle.to_string();
    let stream_url = origin.url_for(LinkOp::Stream, &handle_text, &name);
    let download_url = origin.url_for(LinkOp::Download, &handle_text, &name);

    Ok(Html(player_markup(&name, kind, &stream_url, &download_url)))
}

fn parse_handle(file_id: &str) -> Result<FileHandle, AppError> {
    FileHandle::parse(file_id).map_err(|_| AppError::NotFound("File not found".to_string()))
}

fn relay_error(err: StoreError, expose_details: bool) -> AppError {
    AppError::from_store(err, "File is not available right now", expose_details)
}

/// Fetch one logical file, honoring a byte range when the upstream does.
///
/// A rejected or ignored range degrades to the full object with a 200 status;
/// chunked handles are resolved up front and streamed strictly in order as
/// one body, with later chunks fetched only once the earlier ones drain.
async fn proxy_fetch(
    store: Arc<dyn ObjectStore>,
    handle: &FileHandle,
    range: Option<&str>,
) -> Result<ProxiedObject, StoreError> {
    match handle {
        FileHandle::Single(id) => {
            let locator = store.resolve(id).await?;

            if let Some(range) = range {
                match store.fetch(&locator, Some(range)).await {
                    Ok(download) if download.partial => {
                        return Ok(ProxiedObject {
                            status: StatusCode::PARTIAL_CONTENT,
                            content_range: download.content_range,
                            content_length: download.content_length,
                            stream: download.stream,
                        });
                    }
                    // Upstream ignored the range and answered with everything
                    Ok(download) => {
                        return Ok(ProxiedObject {
                            status: StatusCode::OK,
                            content_range: None,
                            content_length: download.content_length.or(locator.size),
                            stream: download.stream,
                        });
                    }
                    Err(StoreError::RangeRejected) => {
                        debug!("Upstream rejected the range, serving the full object");
                    }
                    Err(e) => return Err(e),
                }
            }

            let download = store.fetch(&locator, None).await?;
            Ok(ProxiedObject {
                status: StatusCode::OK,
                content_range: None,
                content_length: download.content_length.or(locator.size),
                stream: download.stream,
            })
        }
        FileHandle::Chunked(ids) => {
            if range.is_some() {
                debug!("Range over a chunked handle degrades to the full object");
            }

            let mut locators = Vec::with_capacity(ids.len());
            for id in ids {
                locators.push(store.resolve(id).await?);
            }

            let content_length = locators.iter().map(|locator| locator.size).sum();

            let mut ordered = locators.into_iter();
            let first_locator = ordered
                .next()
                .ok_or_else(|| StoreError::NotFound("no chunks recorded".to_string()))?;
            let rest: Vec<ObjectLocator> = ordered.collect();

            let first = store.fetch(&first_locator, None).await?;

            let tail_store = store.clone();
            let tail = stream::iter(rest)
                .then(move |locator| {
                    let store = tail_store.clone();
                    async move {
                        let download = store
                            .fetch(&locator, None)
                            .await
                            .map_err(std::io::Error::other)?;
                        Ok::<_, std::io::Error>(download.stream)
                    }
                })
                .try_flatten();

            Ok(ProxiedObject {
                status: StatusCode::OK,
                content_range: None,
                content_length,
                stream: first.stream.chain(tail).boxed(),
            })
        }
    }
}

fn apply_relay_parts(
    response: &mut Response,
    status: StatusCode,
    content_range: Option<String>,
    content_length: Option<u64>,
) {
    *response.status_mut() = status;

    if let Some(h_val) = content_range.and_then(|v| v.parse().ok()) {
        response.headers_mut().insert(header::CONTENT_RANGE, h_val);
    }

    if let Some(content_length) = content_length {
        response.headers_mut().insert(
            header::CONTENT_LENGTH,
            content_length
                .to_string()
                .parse()
                .unwrap_or(header::HeaderValue::from_static("0")),
        );
    }
}

/// `attachment`/`inline` disposition with an RFC 5987 encoded UTF-8 name and
/// a short ASCII fallback for clients that ignore `filename*`.
fn content_disposition(kind: &str, name: &SanitizedName) -> String {
    let ascii_fallback = name
        .as_str()
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .take(64)
        .collect::<String>();
    let fallback = if ascii_fallback.is_empty() {
        "file"
    } else {
        &ascii_fallback
    };

    let encoded = utf8_percent_encode(name.as_str(), NON_ALPHANUMERIC);

    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        kind, fallback, encoded
    )
}

fn player_markup(
    name: &SanitizedName,
    kind: MediaKind,
    stream_url: &str,
    download_url: &str,
) -> String {
    let stream_src = attribute_escape(stream_url);
    let media_element = match kind {
        MediaKind::Video => format!(
            r#"<video controls playsinline src="{}">Your browser does not support video playback.</video>"#,
            stream_src
        ),
        _ => format!(
            r#"<audio controls src="{}">Your browser does not support audio playback.</audio>"#,
            stream_src
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{name} - Hostio Player</title>
</head>
<body>
<h1>{name}</h1>
{media_element}
<p><a href="{download_href}">Download</a></p>
</body>
</html>
"#,
        name = name,
        media_element = media_element,
        download_href = attribute_escape(download_url),
    )
}

// The handle segment of the URLs arrives verbatim from the request path.
fn attribute_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
