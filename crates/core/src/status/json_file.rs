//! JSON document status backend.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use super::{ItemRecord, StatusBackend, StatusError};

/// Stores the whole mapping as one pretty-printed JSON object keyed by domain.
///
/// Writes go to a sibling `.tmp` file which is then renamed over the target,
/// so readers only ever see a complete document.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    /// Where an unreadable document is kept before it gets overwritten.
    pub fn preserved_path(&self) -> PathBuf {
        self.sibling(".corrupt")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "status".into());
        name.push(suffix);
        self.path.with_file_name(name)
    }

    /// Copy the current document aside so the next persist cannot erase what
    /// could not be read.
    async fn preserve_original(&self) {
        let preserved = self.preserved_path();
        match fs::copy(&self.path, &preserved).await {
            Ok(_) => warn!(
                path = %self.path.display(),
                "Kept a copy of the unreadable status document at {}",
                preserved.display()
            ),
            Err(e) => warn!(
                path = %self.path.display(),
                "Could not keep a copy of the unreadable status document: {}", e
            ),
        }
    }
}

#[async_trait]
impl StatusBackend for JsonFileBackend {
    fn name(&self) -> &str {
        "json"
    }

    async fn read_all(&self) -> Result<HashMap<String, ItemRecord>, StatusError> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(StatusError::io(&self.path, e)),
        };

        if data.trim().is_empty() {
            return Ok(HashMap::new());
        }

        let document: serde_json::Map<String, serde_json::Value> =
            match serde_json::from_str(&data) {
                Ok(document) => document,
                Err(e) => {
                    self.preserve_original().await;
                    return Err(e.into());
                }
            };

        // Each record is read on its own; unreadable ones are skipped.
        let mut entries = HashMap::with_capacity(document.len());
        let mut rejected = 0;
        for (domain, value) in document {
            match serde_json::from_value::<ItemRecord>(value) {
                Ok(record) => {
                    entries.insert(domain, record);
                }
                Err(e) => {
                    warn!(domain = %domain, "Ignoring unreadable status record: {}", e);
                    rejected += 1;
                }
            }
        }
        if rejected > 0 {
            self.preserve_original().await;
        }

        Ok(entries)
    }

    async fn persist(
        &self,
        entries: &HashMap<String, ItemRecord>,
        _changed: &[String],
    ) -> Result<(), StatusError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StatusError::io(parent, e))?;
        }

        // Sorted keys keep the file diffable between runs.
        let ordered: BTreeMap<&String, &ItemRecord> = entries.iter().collect();
        let body = serde_json::to_vec_pretty(&ordered)?;

        let temp = self.temp_path();
        let mut file = fs::File::create(&temp)
            .await
            .map_err(|e| StatusError::io(&temp, e))?;
        file.write_all(&body)
            .await
            .map_err(|e| StatusError::io(&temp, e))?;
        file.sync_all()
            .await
            .map_err(|e| StatusError::io(&temp, e))?;
        drop(file);

        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| StatusError::io(&self.path, e))?;

        Ok(())
    }
}
