use crate::files::create_private;
use log::{error, info};
use spowcore::history_sync::{HistorySyncRecord, HistorySyncSequence};
use spowcore::types::events::HistorySync;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum HistorySyncError {
    #[error("failed to open file to write history sync: {0}")]
    Open(#[source] std::io::Error),
    #[error("failed to write history sync: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write history sync: {0}")]
    Write(#[source] std::io::Error),
    #[error("history sync writer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Dumps history-sync blobs to `history-<start>-<seq>.json` files.
pub struct HistorySyncWriter {
    dir: PathBuf,
    sequence: HistorySyncSequence,
}

impl HistorySyncWriter {
    pub fn new(dir: impl Into<PathBuf>, started_at: i64) -> Self {
        Self {
            dir: dir.into(),
            sequence: HistorySyncSequence::new(started_at),
        }
    }

    /// Claims the next sequence number. Call this in event arrival order;
    /// the write itself may happen later on another task.
    pub fn reserve(&self) -> HistorySyncRecord {
        self.sequence.next_record()
    }

    pub async fn write(
        &self,
        record: &HistorySyncRecord,
        payload: Box<HistorySync>,
    ) -> Result<PathBuf, HistorySyncError> {
        let path = self.dir.join(&record.file_name);
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_json(&target, &payload)).await??;
        Ok(path)
    }

    /// Writes the record and reports the outcome. Failed records are dropped.
    pub async fn persist(&self, record: HistorySyncRecord, payload: Box<HistorySync>) {
        match self.write(&record, payload).await {
            Ok(path) => info!("Wrote history sync to {}", path.display()),
            Err(e) => error!("History sync #{} dropped: {e}", record.sequence),
        }
    }
}

fn write_json(path: &Path, payload: &HistorySync) -> Result<(), HistorySyncError> {
    let file = create_private(path).map_err(HistorySyncError::Open)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, payload)?;
    writer.write_all(b"\n").map_err(HistorySyncError::Write)?;
    writer.flush().map_err(HistorySyncError::Write)
}
