use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::services::chunk::ChunkPlan;
use crate::services::storage::{FileHandle, StoreError, StoredObject, UploadChannel};
use crate::utils::format::format_file_size;
use crate::utils::validation::SanitizedName;

/// A staged inbound payload. The temp path guard deletes the staged file on
/// every exit path, success or failure.
pub struct StagedUpload {
    pub path: TempPath,
    pub size: u64,
    pub name: SanitizedName,
}

/// What one coordinated upload produced
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub handle: FileHandle,
    pub message_id: i64,
    pub channel: &'static str,
}

/// Decides the write path for a payload: one direct write, delegation to the
/// richer channel, or sequential manual chunking on the standard channel.
pub struct UploadCoordinator {
    standard: Arc<dyn UploadChannel>,
    richer: Option<Arc<dyn UploadChannel>>,
    chat_id: String,
    chunk_size: u64,
}

impl UploadCoordinator {
    pub fn new(
        standard: Arc<dyn UploadChannel>,
        richer: Option<Arc<dyn UploadChannel>>,
        config: &AppConfig,
    ) -> Self {
        Self {
            standard,
            richer,
            chat_id: config.chat_id.clone(),
            chunk_size: config.chunk_size,
        }
    }

    pub fn richer_active(&self) -> bool {
        self.richer.is_some()
    }

    pub async fn upload(&self, staged: &StagedUpload) -> Result<UploadOutcome, StoreError> {
        if staged.size <= self.standard.caps().max_object_size {
            return self.direct_upload(staged).await;
        }

        if let Some(richer) = &self.richer {
            info!(
                "📤 {} ({}) exceeds the single-write limit, delegating to the {} channel",
                staged.name,
                format_file_size(staged.size),
                richer.label()
            );
            match self.put_single(richer.as_ref(), staged).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => warn!(
                    "⚠️  {} channel failed ({}), falling back to chunked upload",
                    richer.label(),
                    e
                ),
            }
        }

        self.chunked_upload(staged).await
    }

    /// One write on the preferred channel; a failed attempt on the richer
    /// channel is retried once on the standard one.
    async fn direct_upload(&self, staged: &StagedUpload) -> Result<UploadOutcome, StoreError> {
        let preferred = self.richer.as_ref().unwrap_or(&self.standard);

        match self.put_single(preferred.as_ref(), staged).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if self.richer.is_some() => {
                warn!(
                    "⚠️  {} channel failed ({}), retrying on the {} channel",
                    preferred.label(),
                    e,
                    self.standard.label()
                );
                self.put_single(self.standard.as_ref(), staged).await
            }
            Err(e) => Err(e),
        }
    }

    async fn put_single(
        &self,
        channel: &dyn UploadChannel,
        staged: &StagedUpload,
    ) -> Result<UploadOutcome, StoreError> {
        let stored = channel
            .put(
                &staged.path,
                staged.name.as_str(),
                staged.name.as_str(),
                &self.chat_id,
            )
            .await?
            .into_stored();

        info!(
            "✅ Stored {} as one object via the {} channel (message {})",
            staged.name,
            channel.label(),
            stored.message_id
        );

        Ok(UploadOutcome {
            handle: FileHandle::Single(stored.file_id),
            message_id: stored.message_id,
            channel: channel.label(),
        })
    }

    /// Sequential chunked upload on the standard channel. Chunk temp files
    /// are deleted whether each write succeeds or fails; a failed chunk
    /// aborts the remainder and earlier chunks stay stored.
    async fn chunked_upload(&self, staged: &StagedUpload) -> Result<UploadOutcome, StoreError> {
        // Every chunk must fit the standard channel's single-write ceiling.
        let chunk_size = self.chunk_size.min(self.standard.caps().max_object_size);
        let plan = ChunkPlan::new(staged.size, chunk_size);
        let total = plan.chunk_count();
        info!(
            "✂️  Splitting {} ({}) into {} chunks of at most {}",
            staged.name,
            format_file_size(staged.size),
            total,
            format_file_size(chunk_size)
        );

        let mut source = File::open(&staged.path)
            .await
            .map_err(|e| StoreError::Transfer(format!("open staged file: {}", e)))?;

        let mut ids = Vec::with_capacity(total);
        let mut first: Option<StoredObject> = None;

        for range in plan.ranges() {
            let part = range.index + 1;
            let chunk_name = format!("{}.part{}", staged.name, part);
            let caption = format!("{} (Part {}/{})", staged.name, part, total);

            let chunk_guard = TempPath::from_path(chunk_temp_path(&staged.path, range.index));
            stage_chunk(&mut source, &chunk_guard, range.len).await?;

            let stored = self
                .standard
                .put(&chunk_guard, &chunk_name, &caption, &self.chat_id)
                .await?
                .into_stored();

            info!(
                "✅ Chunk {}/{} stored (message {})",
                part, total, stored.message_id
            );
            ids.push(stored.file_id.clone());
            if first.is_none() {
                first = Some(stored);
            }
        }

        let first = first.ok_or_else(|| StoreError::Transfer("empty chunk plan".to_string()))?;
        let handle = FileHandle::from_ids(ids)?;

        info!(
            "🧩 {} stored as {} ordered chunks",
            staged.name,
            handle.clone().into_ids().len()
        );

        Ok(UploadOutcome {
            handle,
            message_id: first.message_id,
            channel: self.standard.label(),
        })
    }
}

fn chunk_temp_path(base: &Path, index: usize) -> PathBuf {
    let mut path = base.as_os_str().to_os_string();
    path.push(format!(".chunk{}", index));
    PathBuf::from(path)
}

/// Copy the next `len` bytes of `source` into a fresh temp file
async fn stage_chunk(source: &mut File, dest: &Path, len: u64) -> Result<(), StoreError> {
    let mut chunk_file = File::create(dest)
        .await
        .map_err(|e| StoreError::Transfer(format!("create chunk file: {}", e)))?;

    let mut limited = source.take(len);
    let copied = tokio::io::copy(&mut limited, &mut chunk_file)
        .await
        .map_err(|e| StoreError::Transfer(format!("stage chunk: {}", e)))?;
    chunk_file
        .flush()
        .await
        .map_err(|e| StoreError::Transfer(format!("flush chunk file: {}", e)))?;

    if copied != len {
        return Err(StoreError::Transfer(format!(
            "staged file truncated: expected {} bytes, copied {}",
            len, copied
        )));
    }

    Ok(())
}
