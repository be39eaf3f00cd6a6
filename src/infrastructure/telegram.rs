use std::path::Path;

use async_trait::async_trait;
use axum::http::header;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::services::storage::{
    ChannelCaps, ChannelUpload, ObjectDownload, ObjectLocator, ObjectStore, StoreError,
    UploadChannel,
};

/// Standard upload channel and the only fetch path: the Telegram Bot API.
///
/// Writes go through `sendDocument`, resolution through `getFile`, and the
/// bytes come back from the file endpoint, which usually honors ranges.
pub struct TelegramBotApi {
    client: Client,
    api_base: String,
    token: String,
    max_object_size: u64,
}

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct TgMessage {
    message_id: i64,
    document: Option<TgFileRef>,
    video: Option<TgFileRef>,
    audio: Option<TgFileRef>,
}

#[derive(Deserialize)]
struct TgFileRef {
    file_id: String,
}

#[derive(Deserialize)]
struct TgStoredFile {
    file_path: Option<String>,
    file_size: Option<u64>,
}

impl TelegramBotApi {
    pub fn new(client: Client, api_base: String, token: String, max_object_size: u64) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            max_object_size,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    async fn read_result<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        method: &str,
    ) -> Result<T, StoreError> {
        let status = response.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Err(StoreError::SizeExceeded(format!(
                "{} rejected the payload",
                method
            )));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| StoreError::Transfer(format!("{}: malformed response: {}", method, e)))?;

        if envelope.ok {
            envelope
                .result
                .ok_or_else(|| StoreError::Transfer(format!("{}: ok without a result", method)))
        } else {
            let description = envelope
                .description
                .unwrap_or_else(|| "no description".to_string());
            Err(classify_api_error(method, status, description))
        }
    }
}

fn classify_api_error(method: &str, status: StatusCode, description: String) -> StoreError {
    let lowered = description.to_lowercase();
    if lowered.contains("too large") || lowered.contains("too big") {
        StoreError::SizeExceeded(description)
    } else if lowered.contains("not found") || lowered.contains("file_id") {
        StoreError::NotFound(description)
    } else if status == StatusCode::UNAUTHORIZED || status.is_server_error() {
        StoreError::ChannelUnavailable(format!("{}: {}", method, description))
    } else {
        StoreError::Transfer(format!("{}: {}", method, description))
    }
}

#[async_trait]
impl UploadChannel for TelegramBotApi {
    fn label(&self) -> &'static str {
        "bot"
    }

    fn caps(&self) -> ChannelCaps {
        ChannelCaps {
            max_object_size: self.max_object_size,
            supports_range_get: true,
        }
    }

    async fn put(
        &self,
        source: &Path,
        file_name: &str,
        caption: &str,
        destination: &str,
    ) -> Result<ChannelUpload, StoreError> {
        let file = tokio::fs::File::open(source)
            .await
            .map_err(|e| StoreError::Transfer(format!("open staged file: {}", e)))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| StoreError::Transfer(format!("stat staged file: {}", e)))?
            .len();

        debug!("📦 sendDocument: {} ({} bytes)", file_name, len);

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = reqwest::multipart::Part::stream_with_length(body, len)
            .file_name(file_name.to_string())
            .mime_str(mime::APPLICATION_OCTET_STREAM.as_ref())
            .map_err(|e| StoreError::Transfer(format!("build upload part: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", destination.to_string())
            .text("caption", caption.to_string())
            .part("document", part);

        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StoreError::ChannelUnavailable(format!("sendDocument: {}", e)))?;

        let message: TgMessage = self.read_result(response, "sendDocument").await?;
        let file_id = message
            .document
            .or(message.video)
            .or(message.audio)
            .map(|f| f.file_id)
            .ok_or_else(|| {
                StoreError::Transfer("sendDocument answered without a file id".to_string())
            })?;

        Ok(ChannelUpload::Bot {
            file_id,
            message_id: message.message_id,
        })
    }
}

#[async_trait]
impl ObjectStore for TelegramBotApi {
    async fn resolve(&self, object_id: &str) -> Result<ObjectLocator, StoreError> {
        let response = self
            .client
            .get(self.method_url("getFile"))
            .query(&[("file_id", object_id)])
            .send()
            .await
            .map_err(|e| StoreError::ChannelUnavailable(format!("getFile: {}", e)))?;

        let stored: TgStoredFile = self.read_result(response, "getFile").await?;
        let file_path = stored
            .file_path
            .ok_or_else(|| StoreError::NotFound(format!("no stored path for {}", object_id)))?;

        Ok(ObjectLocator {
            url: self.file_url(&file_path),
            size: stored.file_size,
        })
    }

    async fn fetch(
        &self,
        locator: &ObjectLocator,
        range: Option<&str>,
    ) -> Result<ObjectDownload, StoreError> {
        let mut request = self.client.get(&locator.url);
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transfer(format!("object fetch: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound("stored object is gone".to_string()));
        }
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Err(StoreError::RangeRejected);
        }
        if !status.is_success() {
            return Err(StoreError::Transfer(format!(
                "object fetch answered {}",
                status
            )));
        }

        let headers = response.headers();
        let content_range = headers
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        Ok(ObjectDownload {
            partial: status == StatusCode::PARTIAL_CONTENT,
            content_range,
            content_length,
            stream: response
                .bytes_stream()
                .map_err(std::io::Error::other)
                .boxed(),
        })
    }
}
