//! Port for storing warrant documents in object storage.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by document storage adapters.
    pub enum DocumentStorageError {
        /// The upload exceeds the configured size limit.
        TooLarge { max_bytes: u64 } =>
            "document exceeds the {max_bytes} byte limit",
        /// The file extension is not on the allow list.
        ExtensionNotAllowed { extension: String } =>
            "document extension '{extension}' is not allowed",
        /// The backend failed to persist the object.
        Backend { message: String } =>
            "document storage failed: {message}",
    }
}

/// A document received from the owner, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    /// Original filename.
    pub filename: String,
    /// Raw file content.
    pub content: Vec<u8>,
}

/// Reference to a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Opaque object key.
    pub file_ref: String,
    /// Stored size in bytes.
    pub size: u64,
}

/// Object storage for warrant documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Validate and store `upload`, returning its reference.
    async fn upload(&self, upload: &DocumentUpload) -> Result<StoredDocument, DocumentStorageError>;

    /// Delete a stored object. Removing an absent object succeeds.
    async fn remove(&self, file_ref: &str) -> Result<(), DocumentStorageError>;
}
