//! Filesystem-backed document storage.
//!
//! Uploads land in a single capability-scoped directory under random names,
//! so a caller-supplied filename can never address anything outside it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{DocumentStorage, DocumentStorageError, DocumentUpload, StoredDocument};

/// Upload constraints.
#[derive(Debug, Clone)]
pub struct StorageLimits {
    /// Largest accepted upload in bytes.
    pub max_bytes: u64,
    /// Lowercase extensions accepted, without the dot.
    pub allowed_extensions: BTreeSet<String>,
}

/// Stores uploads in a local directory.
#[derive(Clone)]
pub struct LocalDocumentStorage {
    dir: Arc<Dir>,
    limits: StorageLimits,
}

impl LocalDocumentStorage {
    /// Open (creating if needed) `root` as the document directory.
    ///
    /// # Errors
    ///
    /// [`DocumentStorageError::Backend`] when the directory cannot be
    /// created or opened.
    pub fn open(root: &Path, limits: StorageLimits) -> Result<Self, DocumentStorageError> {
        Dir::create_ambient_dir_all(root, ambient_authority())
            .map_err(|err| DocumentStorageError::backend(format!("{}: {err}", root.display())))?;
        let dir = Dir::open_ambient_dir(root, ambient_authority())
            .map_err(|err| DocumentStorageError::backend(format!("{}: {err}", root.display())))?;
        Ok(Self {
            dir: Arc::new(dir),
            limits,
        })
    }

    fn check(&self, upload: &DocumentUpload) -> Result<String, DocumentStorageError> {
        let size = u64::try_from(upload.content.len()).unwrap_or(u64::MAX);
        if size > self.limits.max_bytes {
            return Err(DocumentStorageError::too_large(self.limits.max_bytes));
        }
        let extension = extension_of(&upload.filename);
        if !self.limits.allowed_extensions.contains(&extension) {
            return Err(DocumentStorageError::extension_not_allowed(extension));
        }
        Ok(extension)
    }
}

/// Lowercased extension of `filename`, empty when it has none.
fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

#[async_trait]
impl DocumentStorage for LocalDocumentStorage {
    async fn upload(&self, upload: &DocumentUpload) -> Result<StoredDocument, DocumentStorageError> {
        let extension = self.check(upload)?;
        let name = PathBuf::from(format!("{}.{extension}", Uuid::new_v4().simple()));
        let size = u64::try_from(upload.content.len()).unwrap_or(u64::MAX);
        let dir = Arc::clone(&self.dir);
        let content = upload.content.clone();
        let target = name.clone();
        tokio::task::spawn_blocking(move || dir.write(&target, content))
            .await
            .map_err(|err| DocumentStorageError::backend(format!("write task: {err}")))?
            .map_err(|err| DocumentStorageError::backend(err.to_string()))?;
        let file_ref = name.to_string_lossy().into_owned();
        info!(%file_ref, size, "document stored");
        Ok(StoredDocument { file_ref, size })
    }

    async fn remove(&self, file_ref: &str) -> Result<(), DocumentStorageError> {
        let dir = Arc::clone(&self.dir);
        let target = PathBuf::from(file_ref);
        let removed = tokio::task::spawn_blocking(move || dir.remove_file(&target))
            .await
            .map_err(|err| DocumentStorageError::backend(format!("remove task: {err}")))?;
        match removed {
            Ok(()) => {
                info!(%file_ref, "document removed");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DocumentStorageError::backend(err.to_string())),
        }
    }
}
