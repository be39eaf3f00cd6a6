use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

/// Byte stream handed between the store client and HTTP bodies
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object exceeds the channel write ceiling: {0}")]
    SizeExceeded(String),

    #[error("upload channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("range not satisfiable upstream")]
    RangeRejected,

    #[error("transfer failed: {0}")]
    Transfer(String),
}

/// Capability flags advertised by an upload channel
#[derive(Debug, Clone, Copy)]
pub struct ChannelCaps {
    /// Largest payload the channel accepts in one write
    pub max_object_size: u64,
    /// Whether objects written through this channel can be range-fetched back
    pub supports_range_get: bool,
}

/// Raw per-channel write result. The bot and client APIs shape their success
/// payloads differently; both collapse to [`StoredObject`] at this boundary.
#[derive(Debug, Clone)]
pub enum ChannelUpload {
    Bot { file_id: String, message_id: i64 },
    Client { file_id: String, message_id: i64 },
}

impl ChannelUpload {
    pub fn into_stored(self) -> StoredObject {
        match self {
            ChannelUpload::Bot {
                file_id,
                message_id,
            }
            | ChannelUpload::Client {
                file_id,
                message_id,
            } => StoredObject {
                file_id,
                message_id,
            },
        }
    }
}

/// Canonical result of one successful backing-store write
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub file_id: String,
    pub message_id: i64,
}

/// Logical reference to a stored file: either one object, or the ordered
/// chunk objects a split upload was written as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileHandle {
    Single(String),
    Chunked(Vec<String>),
}

impl FileHandle {
    /// Parse the external text form (chunk ids joined by `,`)
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let ids: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        if ids.is_empty() {
            return Err(StoreError::NotFound("empty file id".to_string()));
        }
        Self::from_ids(ids)
    }

    pub fn from_ids(mut ids: Vec<String>) -> Result<Self, StoreError> {
        match ids.len() {
            0 => Err(StoreError::NotFound("no objects recorded".to_string())),
            1 => Ok(FileHandle::Single(ids.remove(0))),
            _ => Ok(FileHandle::Chunked(ids)),
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, FileHandle::Chunked(_))
    }

    pub fn into_ids(self) -> Vec<String> {
        match self {
            FileHandle::Single(id) => vec![id],
            FileHandle::Chunked(ids) => ids,
        }
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileHandle::Single(id) => f.write_str(id),
            FileHandle::Chunked(ids) => f.write_str(&ids.join(",")),
        }
    }
}

/// Write side of the backing store
#[async_trait]
pub trait UploadChannel: Send + Sync {
    /// Short name used in logs and the health surface
    fn label(&self) -> &'static str;

    fn caps(&self) -> ChannelCaps;

    /// Write one object from a local file; the caption travels with the
    /// object as its stored metadata.
    async fn put(
        &self,
        source: &Path,
        file_name: &str,
        caption: &str,
        destination: &str,
    ) -> Result<ChannelUpload, StoreError>;
}

/// Physical location of one stored object, resolved shortly before fetch
#[derive(Debug, Clone)]
pub struct ObjectLocator {
    pub url: String,
    pub size: Option<u64>,
}

/// One upstream fetch: status knowledge plus a bounded-memory byte stream
pub struct ObjectDownload {
    /// Upstream answered with partial content
    pub partial: bool,
    /// Upstream Content-Range, passed through verbatim when partial
    pub content_range: Option<String>,
    pub content_length: Option<u64>,
    pub stream: ByteStream,
}

/// Read side of the backing store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Metadata lookup turning an object id into a fetchable locator
    async fn resolve(&self, object_id: &str) -> Result<ObjectLocator, StoreError>;

    /// Fetch the object, optionally with a byte range. A store may answer a
    /// range request with the full object; callers inspect `partial`.
    async fn fetch(
        &self,
        locator: &ObjectLocator,
        range: Option<&str>,
    ) -> Result<ObjectDownload, StoreError>;
}
