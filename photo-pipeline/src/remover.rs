use crate::blob::{BlobBackend, BlobError, BlobResult};
use crate::models::FolderHandle;
use std::sync::Arc;

/// Deletes remote folders together with their contents
///
/// A missing folder is reported as [`BlobError::NotFound`], also on a second
/// removal of the same handle. Callers decide whether that means "already
/// gone" in their context.
#[derive(Clone)]
pub struct BlobRemover {
    backend: Arc<dyn BlobBackend>,
}

impl BlobRemover {
    pub fn new(backend: Arc<dyn BlobBackend>) -> Self {
        Self { backend }
    }

    pub async fn remove(&self, folder: &FolderHandle) -> BlobResult<()> {
        log::info!("Deleting remote folder {}", folder);
        self.backend.authenticate().await?;

        if !self.backend.folder_exists(folder).await? {
            return Err(BlobError::NotFound(format!("Folder '{}' not found", folder)));
        }

        self.backend.delete_folder(folder).await
    }
}
