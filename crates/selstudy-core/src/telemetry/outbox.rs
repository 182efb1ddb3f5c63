//! Durable queue of telemetry that could not be delivered.
//!
//! The whole queue lives in one JSON file that is read and rewritten in full
//! on every mutation. Writes go to a sibling temp file and are renamed over
//! the store, so readers see either the old or the new list.
//!
//! All store access goes through one async mutex: concurrent appends and a
//! replay cannot interleave their read-modify-write cycles. The mutex belongs
//! to one `DurableOutbox` value, so code that opens a store by path should use
//! [`DurableOutbox::shared`] to get the single instance for that file.
//!
//! Replay holds the lock for its whole pass and flushes once at the end. A
//! crash mid-replay therefore redelivers entries that were already accepted;
//! the collector must tolerate duplicates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::transport::Transport;
use crate::error::PersistenceError;

/// One undelivered call: where it was going and the exact JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntry {
    pub destination_path: String,
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
}

impl OutboxEntry {
    pub fn new(destination_path: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            destination_path: destination_path.into(),
            payload,
        }
    }
}

/// Counts from one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub attempted: usize,
    pub delivered: usize,
    pub remaining: usize,
}

/// File-backed outbox with a single-writer boundary.
#[derive(Debug)]
pub struct DurableOutbox {
    path: PathBuf,
    lock: Mutex<()>,
}

/// Live outboxes by store path.
static OPEN_OUTBOXES: LazyLock<std::sync::Mutex<HashMap<PathBuf, Weak<DurableOutbox>>>> =
    LazyLock::new(|| std::sync::Mutex::new(HashMap::new()));

impl DurableOutbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The process-wide outbox for `path`, created on first use.
    ///
    /// Every caller gets the same instance while any handle is alive, so all
    /// writers to one file share one lock.
    pub fn shared(path: impl Into<PathBuf>) -> Arc<Self> {
        let path = path.into();
        let mut open = OPEN_OUTBOXES
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = open.get(&path).and_then(Weak::upgrade) {
            return existing;
        }
        open.retain(|_, weak| weak.strong_count() > 0);
        let outbox = Arc::new(Self::new(path.clone()));
        open.insert(path, Arc::downgrade(&outbox));
        outbox
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add an entry at the end of the queue.
    ///
    /// An unreadable or corrupt store is treated as empty and overwritten.
    pub async fn append(&self, entry: OutboxEntry) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load_lenient().await;
        entries.push(entry);
        write_entries(&self.path, &entries).await?;
        tracing::info!(
            "outbox: queued delivery to {} ({} pending)",
            entries.last().map(|e| e.destination_path.as_str()).unwrap_or_default(),
            entries.len()
        );
        Ok(())
    }

    /// Current queue contents in insertion order.
    pub async fn entries(&self) -> Vec<OutboxEntry> {
        let _guard = self.lock.lock().await;
        self.load_lenient().await
    }

    /// Try every queued entry once, in order, and keep the failures.
    ///
    /// No backoff and no deduplication. Entries that fail stay in their
    /// original relative order.
    pub async fn replay_all<T>(&self, transport: &T) -> Result<ReplaySummary, PersistenceError>
    where
        T: Transport + ?Sized,
    {
        let _guard = self.lock.lock().await;
        let entries = self.load_lenient().await;
        if entries.is_empty() {
            return Ok(ReplaySummary::default());
        }

        let attempted = entries.len();
        let mut remaining = Vec::new();
        for entry in entries {
            match transport.post(&entry.destination_path, entry.payload.clone()).await {
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("outbox: replay to {} failed: {e}", entry.destination_path);
                    remaining.push(entry);
                }
            }
        }

        write_entries(&self.path, &remaining).await?;
        let summary = ReplaySummary {
            attempted,
            delivered: attempted - remaining.len(),
            remaining: remaining.len(),
        };
        tracing::info!(
            "outbox: replayed {} entries, {} delivered, {} remaining",
            summary.attempted,
            summary.delivered,
            summary.remaining
        );
        Ok(summary)
    }

    async fn load_lenient(&self) -> Vec<OutboxEntry> {
        match read_entries(&self.path).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("{e}; treating outbox as empty");
                Vec::new()
            }
        }
    }
}

async fn read_entries(path: &Path) -> Result<Vec<OutboxEntry>, PersistenceError> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if data.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&data).map_err(|e| PersistenceError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

async fn write_entries(path: &Path, entries: &[OutboxEntry]) -> Result<(), PersistenceError> {
    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };
    let data = serde_json::to_vec_pretty(entries).map_err(|e| write_err(e.into()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, &data).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)?;
    Ok(())
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
