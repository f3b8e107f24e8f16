//! In-process blob backend
//!
//! Keeps folders and files in a map. Meant for tests: it can be told to
//! fail specific calls and exposes what it holds.

use super::{BlobBackend, BlobError, BlobResult, RemoteFile};
use crate::models::FolderHandle;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct StoredFile {
    file: RemoteFile,
    size: usize,
    public: bool,
}

#[derive(Debug)]
struct Folder {
    parent: String,
    name: String,
    files: Vec<StoredFile>,
}

#[derive(Debug, Default)]
struct State {
    folders: BTreeMap<FolderHandle, Folder>,
    next_id: u64,
    uploads: usize,
    auth_calls: usize,
    folders_created: usize,
    fail_upload_at: Option<usize>,
    fail_deletes: bool,
}

/// Blob backend living entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes the upload with the given zero-based sequence number fail.
    /// The counter spans all folders and all publish calls.
    pub fn fail_upload_at(&self, upload_index: usize) {
        self.lock().fail_upload_at = Some(upload_index);
    }

    /// Makes every subsequent folder deletion fail with a remote error
    pub fn fail_deletes(&self, fail: bool) {
        self.lock().fail_deletes = fail;
    }

    pub fn folder_count(&self) -> usize {
        self.lock().folders.len()
    }

    /// Number of folders ever created, including deleted ones
    pub fn folders_created(&self) -> usize {
        self.lock().folders_created
    }

    pub fn auth_calls(&self) -> usize {
        self.lock().auth_calls
    }

    /// Names of the files in `folder`, in upload order
    pub fn file_names(&self, folder: &FolderHandle) -> Vec<String> {
        self.lock()
            .folders
            .get(folder)
            .map(|f| f.files.iter().map(|s| s.file.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Total bytes stored in `folder`
    pub fn folder_size(&self, folder: &FolderHandle) -> usize {
        self.lock()
            .folders
            .get(folder)
            .map(|f| f.files.iter().map(|s| s.size).sum())
            .unwrap_or(0)
    }

    fn link_for(folder: &FolderHandle, file: &RemoteFile) -> String {
        format!("memory://{}/{}", folder, file.name)
    }
}

#[async_trait]
impl BlobBackend for InMemoryBackend {
    async fn authenticate(&self) -> BlobResult<()> {
        self.lock().auth_calls += 1;
        Ok(())
    }

    async fn find_folder(&self, parent: &str, name: &str) -> BlobResult<Option<FolderHandle>> {
        let state = self.lock();
        Ok(state
            .folders
            .iter()
            .find(|(_, folder)| folder.parent == parent && folder.name == name)
            .map(|(handle, _)| handle.clone()))
    }

    async fn create_folder(&self, parent: &str, name: &str) -> BlobResult<FolderHandle> {
        let mut state = self.lock();
        state.next_id += 1;
        state.folders_created += 1;
        let handle = FolderHandle::new(format!("mem-folder-{}", state.next_id));
        state.folders.insert(
            handle.clone(),
            Folder {
                parent: parent.to_string(),
                name: name.to_string(),
                files: Vec::new(),
            },
        );
        Ok(handle)
    }

    async fn upload_file(
        &self,
        folder: &FolderHandle,
        name: &str,
        content: Vec<u8>,
    ) -> BlobResult<RemoteFile> {
        let mut state = self.lock();
        let sequence = state.uploads;
        state.uploads += 1;
        if state.fail_upload_at == Some(sequence) {
            return Err(BlobError::Remote(format!("injected upload failure for {}", name)));
        }

        state.next_id += 1;
        let file = RemoteFile {
            id: format!("mem-file-{}", state.next_id),
            name: name.to_string(),
        };
        let target = state
            .folders
            .get_mut(folder)
            .ok_or_else(|| BlobError::NotFound(folder.to_string()))?;
        target.files.push(StoredFile {
            file: file.clone(),
            size: content.len(),
            public: false,
        });
        Ok(file)
    }

    async fn make_public(&self, file: &RemoteFile) -> BlobResult<()> {
        let mut state = self.lock();
        let stored = state
            .folders
            .values_mut()
            .flat_map(|folder| folder.files.iter_mut())
            .find(|stored| stored.file == *file)
            .ok_or_else(|| BlobError::NotFound(file.id.clone()))?;
        stored.public = true;
        Ok(())
    }

    async fn public_link(&self, file: &RemoteFile) -> BlobResult<String> {
        let state = self.lock();
        for (handle, folder) in &state.folders {
            if let Some(stored) = folder.files.iter().find(|s| s.file == *file) {
                if !stored.public {
                    return Err(BlobError::Remote(format!("{} is not shared", file.id)));
                }
                return Ok(Self::link_for(handle, file));
            }
        }
        Err(BlobError::NotFound(file.id.clone()))
    }

    async fn folder_exists(&self, folder: &FolderHandle) -> BlobResult<bool> {
        Ok(self.lock().folders.contains_key(folder))
    }

    async fn delete_folder(&self, folder: &FolderHandle) -> BlobResult<()> {
        let mut state = self.lock();
        if state.fail_deletes {
            return Err(BlobError::Remote(format!(
                "injected delete failure for {}",
                folder
            )));
        }
        state
            .folders
            .remove(folder)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(folder.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_link_requires_public_file() {
        let backend = InMemoryBackend::new();
        let folder = backend.create_folder("gallery", "a").await.unwrap();
        let file = backend.upload_file(&folder, "x.jpg", vec![1, 2, 3]).await.unwrap();

        assert!(backend.public_link(&file).await.is_err());
        backend.make_public(&file).await.unwrap();
        let link = backend.public_link(&file).await.unwrap();
        assert!(link.ends_with("/x.jpg"));
        assert_eq!(backend.folder_size(&folder), 3);
    }

    #[tokio::test]
    async fn test_find_folder_scoped_by_parent() {
        let backend = InMemoryBackend::new();
        let folder = backend.create_folder("gallery", "a").await.unwrap();

        assert_eq!(backend.find_folder("gallery", "a").await.unwrap(), Some(folder));
        assert_eq!(backend.find_folder("other", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_missing_folder_is_not_found() {
        let backend = InMemoryBackend::new();
        let result = backend.delete_folder(&FolderHandle::new("nope")).await;
        assert!(matches!(result, Err(BlobError::NotFound(_))));
    }
}
