//! Sinks for request/response records.

use std::path::Path;
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::store::{RequestRecord, StoreError};

/// Destination for stored request and response records.
#[async_trait]
pub trait RequestSink: Send + Sync {
    async fn append(&self, record: RequestRecord) -> Result<(), StoreError>;
}

/// Appends records as JSON lines to a file.
pub struct JsonlRequestSink {
    file: Mutex<File>,
}

impl JsonlRequestSink {
    /// Open (or create) the file at `path` for appending.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        tracing::info!(path = ?path, "Request log file opened");
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl RequestSink for JsonlRequestSink {
    async fn append(&self, record: RequestRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Keeps records in memory, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct MemoryRequestSink {
    records: Arc<std::sync::Mutex<Vec<RequestRecord>>>,
}

impl MemoryRequestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RequestRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RequestSink for MemoryRequestSink {
    async fn append(&self, record: RequestRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }
}
