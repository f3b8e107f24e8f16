//! Remote blob storage capability
//!
//! The publisher and remover only talk to [`BlobBackend`]. A backend owns
//! its credentials and any connection state; callers never see either.

pub mod memory;
#[cfg(feature = "webdav")]
pub mod webdav;

use crate::models::FolderHandle;
use async_trait::async_trait;

pub use memory::InMemoryBackend;

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur against remote storage
#[derive(Debug)]
pub enum BlobError {
    /// Folder or file does not exist remotely
    NotFound(String),
    /// Network, authentication, quota or protocol failure
    Remote(String),
    IoError(std::io::Error),
}

impl std::fmt::Display for BlobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlobError::NotFound(what) => write!(f, "Remote object not found: {}", what),
            BlobError::Remote(e) => write!(f, "Remote storage error: {}", e),
            BlobError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for BlobError {}

impl From<std::io::Error> for BlobError {
    fn from(err: std::io::Error) -> Self {
        BlobError::IoError(err)
    }
}

/// A file stored inside a remote folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Backend-assigned identifier
    pub id: String,
    pub name: String,
}

/// Folder and file operations a remote store has to offer
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Exchanges credentials with the backend. Implementations cache the
    /// result, so calling this repeatedly is cheap.
    async fn authenticate(&self) -> BlobResult<()>;

    /// Looks up a folder called `name` directly below `parent`
    async fn find_folder(&self, parent: &str, name: &str) -> BlobResult<Option<FolderHandle>>;

    async fn create_folder(&self, parent: &str, name: &str) -> BlobResult<FolderHandle>;

    /// Stores `content` as an opaque binary object inside `folder`
    async fn upload_file(
        &self,
        folder: &FolderHandle,
        name: &str,
        content: Vec<u8>,
    ) -> BlobResult<RemoteFile>;

    /// Grants anonymous read access to `file`
    async fn make_public(&self, file: &RemoteFile) -> BlobResult<()>;

    /// Returns the anonymous retrieval link of a public file
    async fn public_link(&self, file: &RemoteFile) -> BlobResult<String>;

    async fn folder_exists(&self, folder: &FolderHandle) -> BlobResult<bool>;

    /// Deletes `folder` and everything inside it
    async fn delete_folder(&self, folder: &FolderHandle) -> BlobResult<()>;
}
