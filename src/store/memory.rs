//! In-memory record store.

use super::{RecordStore, StoreError};
use crate::models::ObservationRecord;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Thread-safe store holding records in memory.
///
/// Readers clone the `Arc` under a short read lock, so a replace never
/// blocks a query that is already aggregating.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<Arc<Vec<ObservationRecord>>>>,
}

impl InMemoryStore {
    pub fn new(records: Vec<ObservationRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(Arc::new(records))),
        }
    }

    /// Load every record from another store once.
    pub async fn preload(source: &dyn RecordStore) -> Result<Self, StoreError> {
        let records = source.all().await?;
        debug!(source = %source.describe(), records = records.len(), "Preloaded records");
        Ok(Self::new(records))
    }

    fn snapshot(&self) -> Result<Arc<Vec<ObservationRecord>>, StoreError> {
        self.records
            .read()
            .map(|guard| Arc::clone(&*guard))
            .map_err(|_| StoreError::Unavailable("record lock poisoned".to_string()))
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn all(&self) -> Result<Vec<ObservationRecord>, StoreError> {
        Ok(self.snapshot()?.as_ref().clone())
    }

    async fn replace_all(&self, records: Vec<ObservationRecord>) -> Result<usize, StoreError> {
        let count = records.len();
        let mut guard = self
            .records
            .write()
            .map_err(|_| StoreError::Unavailable("record lock poisoned".to_string()))?;
        *guard = Arc::new(records);
        Ok(count)
    }

    fn describe(&self) -> String {
        let count = self.snapshot().map(|r| r.len()).unwrap_or(0);
        format!("in-memory ({} records)", count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(shift: &str) -> ObservationRecord {
        ObservationRecord {
            shift: Some(shift.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_replace_all() {
        let store = InMemoryStore::new(vec![sample("Mañana")]);
        assert_eq!(store.all().await.unwrap().len(), 1);

        let stored = store
            .replace_all(vec![sample("Tarde"), sample("Noche")])
            .await
            .unwrap();
        assert_eq!(stored, 2);
        assert_eq!(store.all().await.unwrap()[0], sample("Tarde"));
        assert_eq!(store.describe(), "in-memory (2 records)");
    }

    #[tokio::test]
    async fn test_preload_copies_source() {
        let source = InMemoryStore::new(vec![sample("Noche")]);
        let cached = InMemoryStore::preload(&source).await.unwrap();

        source.replace_all(Vec::new()).await.unwrap();

        assert_eq!(cached.all().await.unwrap(), vec![sample("Noche")]);
    }
}
