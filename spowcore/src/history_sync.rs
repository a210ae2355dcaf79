use std::sync::atomic::{AtomicU32, Ordering};

/// Hands out unique history-sync file names for one process run.
///
/// Names combine the process start time with a counter starting at 1. A
/// restart resets the counter but also moves the timestamp, so names never
/// collide across runs either.
#[derive(Debug)]
pub struct HistorySyncSequence {
    started_at: i64,
    counter: AtomicU32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySyncRecord {
    pub sequence: u32,
    pub file_name: String,
}

impl HistorySyncSequence {
    pub fn new(started_at: i64) -> Self {
        Self {
            started_at,
            counter: AtomicU32::new(0),
        }
    }

    pub fn next_record(&self) -> HistorySyncRecord {
        let sequence = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        HistorySyncRecord {
            sequence,
            file_name: file_name(self.started_at, sequence),
        }
    }
}

pub fn file_name(started_at: i64, sequence: u32) -> String {
    format!("history-{started_at}-{sequence}.json")
}
