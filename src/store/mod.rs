//! Record store port and its adapters.
//!
//! The aggregation engine only ever reads: every query takes a fresh
//! snapshot through [`RecordStore::all`]. Writes happen out of band, through
//! [`RecordStore::replace_all`] during an import.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::InMemoryStore;

use crate::models::ObservationRecord;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing observation records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the observation records, plus the bulk replace used by imports.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current snapshot of every record.
    async fn all(&self) -> Result<Vec<ObservationRecord>, StoreError>;

    /// Replace the whole record set. Returns the number of records stored.
    async fn replace_all(&self, records: Vec<ObservationRecord>) -> Result<usize, StoreError>;

    /// Human-readable description for logs and reports.
    fn describe(&self) -> String;
}
