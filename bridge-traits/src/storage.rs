//! File System Abstraction
//!
//! Whole-file operations used for the user record, the sync ledger and
//! downloaded images.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File system access trait
///
/// `write_file` must replace the target as a whole: readers observe either the
/// previous contents or the new ones, never a truncated file. Desktop does this
/// with a sibling temp file and a rename.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn save(fs: &dyn FileSystemAccess, dir: &Path, data: &[u8]) -> Result<()> {
///     fs.create_dir_all(dir).await?;
///     fs.write_file(&dir.join("syncdb.json"), Bytes::copy_from_slice(data)).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Replace the file contents, creating the file if needed
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// List the entries of a directory (non-recursive, unordered)
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;
}
