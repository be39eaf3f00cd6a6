use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::services::storage::{ChannelCaps, ChannelUpload, StoreError, UploadChannel};

/// Richer upload channel: a companion MTProto bridge reached over HTTP.
///
/// The bridge logs in with a user session and accepts whole objects far above
/// the Bot API write ceiling. It is optional; when unconfigured the
/// coordinator never sees it. Downloads still resolve through the bot side.
pub struct TelegramClientGateway {
    client: Client,
    base_url: String,
    token: Option<String>,
    max_object_size: u64,
}

#[derive(Deserialize)]
struct BridgeReply {
    ok: bool,
    message_id: Option<i64>,
    file_id: Option<String>,
    description: Option<String>,
}

impl TelegramClientGateway {
    pub fn new(
        client: Client,
        base_url: String,
        token: Option<String>,
        max_object_size: u64,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            max_object_size,
        }
    }
}

#[async_trait]
impl UploadChannel for TelegramClientGateway {
    fn label(&self) -> &'static str {
        "client"
    }

    fn caps(&self) -> ChannelCaps {
        ChannelCaps {
            max_object_size: self.max_object_size,
            supports_range_get: false,
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

        debug!("📦 bridge upload: {} ({} bytes)", file_name, len);

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = reqwest::multipart::Part::stream_with_length(body, len)
            .file_name(file_name.to_string())
            .mime_str(mime::APPLICATION_OCTET_STREAM.as_ref())
            .map_err(|e| StoreError::Transfer(format!("build upload part: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", destination.to_string())
            .text("caption", caption.to_string())
            .part("file", part);

        let mut request = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::ChannelUnavailable(format!("bridge upload: {}", e)))?;

        let status = response.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Err(StoreError::SizeExceeded(
                "bridge rejected the payload".to_string(),
            ));
        }

        let reply: BridgeReply = response
            .json()
            .await
            .map_err(|e| StoreError::Transfer(format!("bridge reply: {}", e)))?;

        if !reply.ok {
            let description = reply
                .description
                .unwrap_or_else(|| "no description".to_string());
            return if status.is_server_error() {
                Err(StoreError::ChannelUnavailable(description))
            } else {
                Err(StoreError::Transfer(description))
            };
        }

        match (reply.file_id, reply.message_id) {
            (Some(file_id), Some(message_id)) => Ok(ChannelUpload::Client {
                file_id,
                message_id,
            }),
            _ => Err(StoreError::Transfer(
                "bridge answered ok without a file id".to_string(),
            )),
        }
    }
}
