use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempPath;

use hostio::config::AppConfig;
use hostio::services::storage::{
    ChannelCaps, ChannelUpload, FileHandle, StoreError, UploadChannel,
};
use hostio::services::upload::{StagedUpload, UploadCoordinator};
use hostio::utils::validation::SanitizedName;

#[derive(Debug, Clone)]
struct RecordedWrite {
    file_name: String,
    caption: String,
    destination: String,
    size: u64,
}

/// Upload channel that records every write instead of talking to a backend.
/// `fail_on_attempt` makes the nth call (0-based) return an error.
#[derive(Clone)]
struct RecordingChannel {
    label: &'static str,
    ceiling: u64,
    writes: Arc<Mutex<Vec<RecordedWrite>>>,
    attempts: Arc<AtomicUsize>,
    fail_on_attempt: Option<usize>,
}

impl RecordingChannel {
    fn new(label: &'static str, ceiling: u64) -> Self {
        Self {
            label,
            ceiling,
            writes: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
            fail_on_attempt: None,
        }
    }

    fn failing_on(label: &'static str, ceiling: u64, attempt: usize) -> Self {
        Self {
            fail_on_attempt: Some(attempt),
            ..Self::new(label, ceiling)
        }
    }

    fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UploadChannel for RecordingChannel {
    fn label(&self) -> &'static str {
        self.label
    }

    fn caps(&self) -> ChannelCaps {
        ChannelCaps {
            max_object_size: self.ceiling,
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
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_attempt == Some(attempt) {
            return Err(StoreError::ChannelUnavailable(
                "scripted failure".to_string(),
            ));
        }

        let size = tokio::fs::metadata(source).await.unwrap().len();
        let mut writes = self.writes.lock().unwrap();
        let index = writes.len();
        writes.push(RecordedWrite {
            file_name: file_name.to_string(),
            caption: caption.to_string(),
            destination: destination.to_string(),
            size,
        });

        Ok(ChannelUpload::Bot {
            file_id: format!("{}-{}", self.label, index),
            message_id: (index + 1) as i64,
        })
    }
}

fn coordinator_config(chunk_size: u64) -> AppConfig {
    AppConfig {
        chat_id: "-100123".to_string(),
        chunk_size,
        ..AppConfig::default()
    }
}

async fn staged_payload(dir: &Path, name: &str, len: usize) -> StagedUpload {
    let path = dir.join(format!("{}.staged", name));
    tokio::fs::write(&path, vec![0x5A; len]).await.unwrap();
    StagedUpload {
        path: TempPath::from_path(path),
        size: len as u64,
        name: SanitizedName::new(name),
    }
}

fn leftover_chunk_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.contains(".chunk"))
        .collect()
}

#[tokio::test]
async fn test_small_payload_is_one_direct_write() {
    let dir = tempfile::tempdir().unwrap();
    let standard = RecordingChannel::new("bot", 100);
    let coordinator = UploadCoordinator::new(
        Arc::new(standard.clone()),
        None,
        &coordinator_config(100),
    );

    let staged = staged_payload(dir.path(), "notes.txt", 80).await;
    let outcome = coordinator.upload(&staged).await.unwrap();

    let writes = standard.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].file_name, "notes.txt");
    assert_eq!(writes[0].caption, "notes.txt");
    assert_eq!(writes[0].destination, "-100123");
    assert_eq!(writes[0].size, 80);
    assert_eq!(outcome.handle, FileHandle::Single("bot-0".to_string()));
    assert_eq!(outcome.message_id, 1);
    assert_eq!(outcome.channel, "bot");
}

#[tokio::test]
async fn test_oversized_payload_chunks_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let standard = RecordingChannel::new("bot", 100);
    let coordinator = UploadCoordinator::new(
        Arc::new(standard.clone()),
        None,
        &coordinator_config(100),
    );

    let staged = staged_payload(dir.path(), "big.bin", 250).await;
    let outcome = coordinator.upload(&staged).await.unwrap();

    let writes = standard.writes();
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[0].file_name, "big.bin.part1");
    assert_eq!(writes[1].file_name, "big.bin.part2");
    assert_eq!(writes[2].file_name, "big.bin.part3");
    assert_eq!(writes[0].caption, "big.bin (Part 1/3)");
    assert_eq!(writes[1].caption, "big.bin (Part 2/3)");
    assert_eq!(writes[2].caption, "big.bin (Part 3/3)");
    assert_eq!(
        writes.iter().map(|w| w.size).collect::<Vec<_>>(),
        vec![100, 100, 50]
    );

    assert_eq!(
        outcome.handle,
        FileHandle::Chunked(vec![
            "bot-0".to_string(),
            "bot-1".to_string(),
            "bot-2".to_string(),
        ])
    );
    // The handle references the first chunk's message
    assert_eq!(outcome.message_id, 1);

    let leftovers = leftover_chunk_files(dir.path());
    assert!(leftovers.is_empty(), "chunk temp files left: {:?}", leftovers);
}

#[tokio::test]
async fn test_chunk_failure_aborts_remainder() {
    let dir = tempfile::tempdir().unwrap();
    let standard = RecordingChannel::failing_on("bot", 100, 1);
    let coordinator = UploadCoordinator::new(
        Arc::new(standard.clone()),
        None,
        &coordinator_config(100),
    );

    let staged = staged_payload(dir.path(), "big.bin", 250).await;
    let err = coordinator.upload(&staged).await.unwrap_err();

    assert!(matches!(err, StoreError::ChannelUnavailable(_)));
    // The first chunk landed, the failure stopped the rest
    assert_eq!(standard.attempts(), 2);
    assert_eq!(standard.writes().len(), 1);
    assert_eq!(standard.writes()[0].caption, "big.bin (Part 1/3)");

    let leftovers = leftover_chunk_files(dir.path());
    assert!(leftovers.is_empty(), "chunk temp files left: {:?}", leftovers);
}

#[tokio::test]
async fn test_richer_channel_takes_oversized_payload_whole() {
    let dir = tempfile::tempdir().unwrap();
    let standard = RecordingChannel::new("bot", 100);
    let richer = RecordingChannel::new("client", 10_000);
    let coordinator = UploadCoordinator::new(
        Arc::new(standard.clone()),
        Some(Arc::new(richer.clone())),
        &coordinator_config(100),
    );

    let staged = staged_payload(dir.path(), "feature.mkv", 250).await;
    let outcome = coordinator.upload(&staged).await.unwrap();

    assert_eq!(standard.attempts(), 0);
    let writes = richer.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].file_name, "feature.mkv");
    assert_eq!(writes[0].caption, "feature.mkv");
    assert_eq!(writes[0].size, 250);
    assert_eq!(outcome.handle, FileHandle::Single("client-0".to_string()));
    assert_eq!(outcome.channel, "client");
}

#[tokio::test]
async fn test_richer_failure_falls_back_to_chunked() {
    let dir = tempfile::tempdir().unwrap();
    let standard = RecordingChannel::new("bot", 100);
    let richer = RecordingChannel::failing_on("client", 10_000, 0);
    let coordinator = UploadCoordinator::new(
        Arc::new(standard.clone()),
        Some(Arc::new(richer.clone())),
        &coordinator_config(100),
    );

    let staged = staged_payload(dir.path(), "big.bin", 250).await;
    let outcome = coordinator.upload(&staged).await.unwrap();

    assert_eq!(richer.attempts(), 1);
    assert!(richer.writes().is_empty());
    assert_eq!(standard.writes().len(), 3);
    assert!(outcome.handle.is_chunked());
    assert_eq!(outcome.channel, "bot");
}

#[tokio::test]
async fn test_direct_write_retries_on_standard_channel() {
    let dir = tempfile::tempdir().unwrap();
    let standard = RecordingChannel::new("bot", 100);
    let richer = RecordingChannel::failing_on("client", 10_000, 0);
    let coordinator = UploadCoordinator::new(
        Arc::new(standard.clone()),
        Some(Arc::new(richer.clone())),
        &coordinator_config(100),
    );

    let staged = staged_payload(dir.path(), "notes.txt", 80).await;
    let outcome = coordinator.upload(&staged).await.unwrap();

    assert_eq!(richer.attempts(), 1);
    let writes = standard.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].file_name, "notes.txt");
    assert_eq!(outcome.handle, FileHandle::Single("bot-0".to_string()));
    assert_eq!(outcome.channel, "bot");
}

#[tokio::test]
async fn test_payload_on_chunk_boundary_stays_single() {
    let dir = tempfile::tempdir().unwrap();
    let standard = RecordingChannel::new("bot", 100);
    let coordinator = UploadCoordinator::new(
        Arc::new(standard.clone()),
        None,
        &coordinator_config(100),
    );

    let staged = staged_payload(dir.path(), "exact.bin", 100).await;
    let outcome = coordinator.upload(&staged).await.unwrap();

    assert_eq!(standard.writes().len(), 1);
    assert!(!outcome.handle.is_chunked());
}

#[tokio::test]
async fn test_chunk_size_clamped_to_channel_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let standard = RecordingChannel::new("bot", 100);
    // Configured chunk size exceeds what the channel accepts in one write
    let coordinator = UploadCoordinator::new(
        Arc::new(standard.clone()),
        None,
        &coordinator_config(150),
    );

    let staged = staged_payload(dir.path(), "big.bin", 250).await;
    coordinator.upload(&staged).await.unwrap();

    let sizes: Vec<u64> = standard.writes().iter().map(|w| w.size).collect();
    assert_eq!(sizes, vec![100, 100, 50]);
}
