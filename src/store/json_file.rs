//! Record store backed by a JSON snapshot file.

use super::{RecordStore, StoreError};
use crate::models::ObservationRecord;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Persistent store holding every record in one JSON array on disk.
///
/// Each read parses the file again, so a query always sees the latest
/// completed import. Imports write a sibling temp file and rename it over
/// the snapshot, so readers never observe a half-written file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store at `path`.
    ///
    /// The snapshot file itself may not exist yet (an empty record set), but
    /// its directory must.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let dir = snapshot_dir(&path);

        if !dir.is_dir() {
            return Err(StoreError::Io {
                path: dir.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "snapshot directory does not exist",
                ),
            });
        }

        info!(path = %path.display(), exists = path.exists(), "Opened JSON record store");
        Ok(Self { path })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn snapshot_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn write_snapshot(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(snapshot_dir(path)).map_err(io_err)?;
    tmp.write_all(content).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn all(&self) -> Result<Vec<ObservationRecord>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Snapshot missing, treating as empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let records: Vec<ObservationRecord> =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), records = records.len(), "Loaded snapshot");
        Ok(records)
    }

    async fn replace_all(&self, records: Vec<ObservationRecord>) -> Result<usize, StoreError> {
        let count = records.len();
        let content =
            serde_json::to_vec_pretty(&records).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_snapshot(&path, &content))
            .await
            .map_err(|e| StoreError::Unavailable(format!("snapshot writer failed: {}", e)))??;

        info!(path = %self.path.display(), records = count, "Replaced snapshot");
        Ok(count)
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(sector: &str) -> ObservationRecord {
        ObservationRecord {
            sector: Some(sector.to_string()),
            action: Some("Alcohol".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_requires_existing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope").join("data.json");
        assert!(JsonFileStore::open(missing).is_err());

        let ok = JsonFileStore::open(dir.path().join("data.json"));
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("data.json")).unwrap();

        let records = store.all().await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_replace_all_then_read() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("data.json")).unwrap();

        store
            .replace_all(vec![sample("ICU"), sample("ER")])
            .await
            .unwrap();
        let stored = store.replace_all(vec![sample("GUARDIA")]).await.unwrap();
        assert_eq!(stored, 1);

        let records = store.all().await.unwrap();
        assert_eq!(records, vec![sample("GUARDIA")]);
    }

    #[tokio::test]
    async fn test_malformed_snapshot_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        let err = store.all().await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_reads_original_export_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"[{
                "Marca temporal": "2024-11-03",
                "Nombre del observador": "Ana",
                "Sector en el que realizo la observación": "GUARDIA",
                "Turno": "Noche",
                "Personal al que observo": "Medico",
                "Momento que observa": "Antes del contacto",
                "Accion que realizo": null
            }]"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        let records = store.all().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sector.as_deref(), Some("GUARDIA"));
        assert_eq!(records[0].action, None);
        assert!(store.describe().contains("data.json"));
    }
}
