//! Persistence of the smart user as `smart_user.json`.

use crate::error::{IdentityError, Result};
use crate::types::SmartUser;
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Whole-file JSON store for one [`SmartUser`].
///
/// Anything unreadable (missing file, I/O error, malformed JSON, empty id or
/// key) loads as `None`; the caller decides whether to register a new user.
pub struct UserStore {
    fs: Arc<dyn FileSystemAccess>,
    path: PathBuf,
}

impl UserStore {
    pub fn new(fs: Arc<dyn FileSystemAccess>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Option<SmartUser> {
        match self.fs.exists(&self.path).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(path = ?self.path, "No smart user file");
                return None;
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Cannot stat smart user file");
                return None;
            }
        }

        let data = match self.fs.read_file(&self.path).await {
            Ok(data) => data,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Cannot read smart user file");
                return None;
            }
        };

        match serde_json::from_slice::<SmartUser>(&data) {
            Ok(user) if user.is_valid() => Some(user),
            Ok(_) => {
                warn!(path = ?self.path, "Smart user file has empty credentials, ignoring");
                None
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Smart user file is corrupted, ignoring");
                None
            }
        }
    }

    pub async fn save(&self, user: &SmartUser) -> Result<()> {
        let json = serde_json::to_vec_pretty(user).map_err(|e| {
            IdentityError::SerializationFailed {
                context: "smart user".to_string(),
                source: e,
            }
        })?;

        self.fs
            .write_file(&self.path, Bytes::from(json))
            .await
            .map_err(|e| IdentityError::StorageFailed(e.to_string()))?;

        debug!(path = ?self.path, user_id = %user.id, "Saved smart user");
        Ok(())
    }
}
