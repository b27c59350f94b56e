//! # Sync Ledger
//!
//! Remembers what previous runs already did so a sync never reports or
//! downloads the same image twice.
//!
//! In memory the ledger is two maps; on disk (`syncdb.json`) it is one flat
//! JSON object:
//!
//! ```json
//! {
//!     "/home/ann/Favorites/a.jpg": { "sourceURL": "http://example.com/a" },
//!     "/home/ann/Favorites/local.png": {},
//!     "id:bbbvljyqgf": { "success": true },
//!     "id:hkyo1ausxu": { "error": 2 }
//! }
//! ```
//!
//! Every save rewrites the whole file through an atomic replace. A missing,
//! unreadable or malformed file loads as an empty ledger.

use crate::error::Result;
use bridge_traits::FileSystemAccess;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const IMAGE_KEY_PREFIX: &str = "id:";

/// What the ledger knows about a local favorites file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    /// Absent for files that did not come from an online source
    #[serde(rename = "sourceURL", default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Reconciliation state of one server image id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Failed download attempts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDb {
    files: BTreeMap<String, FileStatus>,
    images: BTreeMap<String, ImageStatus>,
}

impl SyncDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self, path: &Path) -> Option<&FileStatus> {
        self.files.get(path_key(path).as_str())
    }

    pub fn record_file(&mut self, path: &Path, status: FileStatus) {
        self.files.insert(path_key(path), status);
    }

    pub fn image(&self, image_id: &str) -> Option<&ImageStatus> {
        self.images.get(image_id)
    }

    /// The image is present locally; clears any error count.
    pub fn mark_success(&mut self, image_id: &str) {
        self.images.insert(
            image_id.to_string(),
            ImageStatus {
                success: Some(true),
                error: None,
            },
        );
    }

    /// Count one more failed download and return the new total.
    pub fn record_error(&mut self, image_id: &str) -> u32 {
        let status = self.images.entry(image_id.to_string()).or_default();
        let count = status.error.unwrap_or(0) + 1;
        status.error = Some(count);
        count
    }

    pub fn is_success(&self, image_id: &str) -> bool {
        self.image(image_id)
            .is_some_and(|status| status.success == Some(true))
    }

    pub fn error_count(&self, image_id: &str) -> u32 {
        self.image(image_id)
            .and_then(|status| status.error)
            .unwrap_or(0)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Flatten into the single-object file layout.
    pub fn to_json(&self) -> Result<Value> {
        let mut map = Map::new();
        for (path, status) in &self.files {
            map.insert(path.clone(), serde_json::to_value(status)?);
        }
        for (id, status) in &self.images {
            map.insert(
                format!("{}{}", IMAGE_KEY_PREFIX, id),
                serde_json::to_value(status)?,
            );
        }
        Ok(Value::Object(map))
    }

    /// Inverse of [`SyncDb::to_json`]. Any entry of the wrong shape rejects
    /// the whole document.
    pub fn from_json(value: Value) -> Result<Self> {
        let map: Map<String, Value> = serde_json::from_value(value)?;
        let mut db = SyncDb::new();

        for (key, entry) in map {
            match key.strip_prefix(IMAGE_KEY_PREFIX) {
                Some(id) => {
                    db.images
                        .insert(id.to_string(), serde_json::from_value(entry)?);
                }
                None => {
                    db.files.insert(key, serde_json::from_value(entry)?);
                }
            }
        }

        Ok(db)
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Reads and writes `syncdb.json`.
#[derive(Clone)]
pub struct LedgerStore {
    file_system: Arc<dyn FileSystemAccess>,
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(file_system: Arc<dyn FileSystemAccess>, path: impl Into<PathBuf>) -> Self {
        Self {
            file_system,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> SyncDb {
        match self.file_system.exists(&self.path).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(path = %self.path.display(), "No ledger yet, starting empty");
                return SyncDb::new();
            }
            Err(e) => {
                warn!(error = %e, "Could not check ledger file, starting empty");
                return SyncDb::new();
            }
        }

        let data = match self.file_system.read_file(&self.path).await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Could not read ledger, starting empty");
                return SyncDb::new();
            }
        };

        match serde_json::from_slice::<Value>(&data)
            .map_err(Into::into)
            .and_then(SyncDb::from_json)
        {
            Ok(db) => {
                debug!(
                    files = db.file_count(),
                    images = db.image_count(),
                    "Loaded ledger"
                );
                db
            }
            Err(e) => {
                warn!(error = %e, "Ledger is malformed, starting empty");
                SyncDb::new()
            }
        }
    }

    pub async fn save(&self, db: &SyncDb) -> Result<()> {
        let value = db.to_json()?;

        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        value.serialize(&mut serializer)?;

        if let Some(parent) = self.path.parent() {
            self.file_system.create_dir_all(parent).await?;
        }
        self.file_system
            .write_file(&self.path, Bytes::from(buffer))
            .await?;
        Ok(())
    }
}
