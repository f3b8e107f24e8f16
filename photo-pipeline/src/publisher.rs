//! Publishing a directory of pictures into a remote folder
//!
//! Uploads run strictly one after the other in staged upload order, so the
//! returned links follow display order. Nothing is rolled back on failure:
//! the error carries whatever was published so far together with the folder
//! handle, and the caller decides whether to retry or remove the folder.

use crate::blob::{BlobBackend, BlobError};
use crate::models::{FolderHandle, PhotoSet};
use crate::staging::list_regular_files;
use std::path::Path;
use std::sync::Arc;

/// Failure while publishing, with the partial result if a folder was obtained
#[derive(Debug)]
pub struct PublishError {
    pub partial: Option<PhotoSet>,
    pub source: BlobError,
}

impl PublishError {
    fn before_folder(source: BlobError) -> Self {
        Self {
            partial: None,
            source,
        }
    }

    /// Folder that may now hold orphaned files
    pub fn folder(&self) -> Option<&FolderHandle> {
        self.partial.as_ref().and_then(|p| p.folder.as_ref())
    }
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.partial {
            Some(partial) => write!(
                f,
                "Publishing failed after {} file(s) in folder {}: {}",
                partial.urls.len(),
                partial
                    .folder
                    .as_ref()
                    .map(|h| h.as_str())
                    .unwrap_or("<none>"),
                self.source
            ),
            None => write!(f, "Publishing failed: {}", self.source),
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Makes a folder name safe for every backend
///
/// ASCII letters, digits, `-` and `_` are kept, everything else becomes `-`.
pub fn sanitize_folder_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}

/// Publishes local directories as public remote folders
#[derive(Clone)]
pub struct BlobPublisher {
    backend: Arc<dyn BlobBackend>,
    parent: String,
}

impl BlobPublisher {
    /// `parent` is the fixed container all folders are created under
    pub fn new(backend: Arc<dyn BlobBackend>, parent: impl Into<String>) -> Self {
        Self {
            backend,
            parent: parent.into(),
        }
    }

    /// Uploads every regular file of `local_dir` into the folder `folder_name`
    ///
    /// An existing folder with the same name is reused, so retrying a publish
    /// never creates a second folder.
    pub async fn publish(
        &self,
        folder_name: &str,
        local_dir: &Path,
    ) -> Result<PhotoSet, PublishError> {
        self.backend
            .authenticate()
            .await
            .map_err(PublishError::before_folder)?;

        let name = sanitize_folder_name(folder_name);
        let folder = self
            .find_or_create_folder(&name)
            .await
            .map_err(PublishError::before_folder)?;

        let mut urls = Vec::new();
        match self.upload_all(&folder, local_dir, &mut urls).await {
            Ok(()) => {
                log::info!("Published {} file(s) to folder {}", urls.len(), folder);
                Ok(PhotoSet::new(urls, folder))
            }
            Err(source) => {
                log::error!(
                    "Publishing to folder {} stopped after {} file(s): {}",
                    folder,
                    urls.len(),
                    source
                );
                Err(PublishError {
                    partial: Some(PhotoSet::new(urls, folder)),
                    source,
                })
            }
        }
    }

    async fn find_or_create_folder(&self, name: &str) -> Result<FolderHandle, BlobError> {
        if let Some(existing) = self.backend.find_folder(&self.parent, name).await? {
            log::debug!("Reusing remote folder {} for '{}'", existing, name);
            return Ok(existing);
        }
        self.backend.create_folder(&self.parent, name).await
    }

    async fn upload_all(
        &self,
        folder: &FolderHandle,
        local_dir: &Path,
        urls: &mut Vec<String>,
    ) -> Result<(), BlobError> {
        for path in list_regular_files(local_dir)? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| BlobError::Remote(format!("No file name: {}", path.display())))?;
            let content = std::fs::read(&path)?;

            let file = self.backend.upload_file(folder, &name, content).await?;
            self.backend.make_public(&file).await?;
            urls.push(self.backend.public_link(&file).await?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::InMemoryBackend;

    fn local_dir_with(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
        dir
    }

    #[test]
    fn test_sanitize_folder_name() {
        assert_eq!(sanitize_folder_name("Sunset over Kyiv"), "Sunset-over-Kyiv");
        assert_eq!(sanitize_folder_name("../etc"), "---etc");
        assert_eq!(sanitize_folder_name("  "), "untitled");
        assert_eq!(sanitize_folder_name("abc_123-x"), "abc_123-x");
    }

    #[tokio::test]
    async fn test_publish_uploads_in_listing_order() {
        let backend = Arc::new(InMemoryBackend::new());
        let publisher = BlobPublisher::new(backend.clone(), "gallery");
        let dir = local_dir_with(&["0002-c.jpg", "0000-a.jpg", "0001-b.jpg"]);
        std::fs::create_dir(dir.path().join("skipped")).unwrap();

        let photos = publisher.publish("Sunset", dir.path()).await.unwrap();

        assert_eq!(photos.urls.len(), 3);
        assert!(photos.urls[0].ends_with("0000-a.jpg"));
        assert!(photos.urls[2].ends_with("0002-c.jpg"));
        assert!(photos.is_consistent());
        let folder = photos.folder.unwrap();
        assert_eq!(
            backend.file_names(&folder),
            vec!["0000-a.jpg", "0001-b.jpg", "0002-c.jpg"]
        );
        assert_eq!(backend.auth_calls(), 1);
    }

    #[tokio::test]
    async fn test_publish_reuses_folder_by_name() {
        let backend = Arc::new(InMemoryBackend::new());
        let publisher = BlobPublisher::new(backend.clone(), "gallery");

        let first = publisher
            .publish("Sunset", local_dir_with(&["a.jpg"]).path())
            .await
            .unwrap();
        let second = publisher
            .publish("Sunset", local_dir_with(&["b.jpg"]).path())
            .await
            .unwrap();

        assert_eq!(first.folder, second.folder);
        assert_eq!(backend.folders_created(), 1);
        assert_eq!(backend.folder_count(), 1);
        assert_eq!(
            backend.file_names(second.folder.as_ref().unwrap()),
            vec!["a.jpg", "b.jpg"]
        );
    }

    #[tokio::test]
    async fn test_same_name_under_other_parent_is_separate() {
        let backend = Arc::new(InMemoryBackend::new());
        let dir = local_dir_with(&["a.jpg"]);

        let a = BlobPublisher::new(backend.clone(), "gallery")
            .publish("Sunset", dir.path())
            .await
            .unwrap();
        let b = BlobPublisher::new(backend.clone(), "archive")
            .publish("Sunset", dir.path())
            .await
            .unwrap();

        assert_ne!(a.folder, b.folder);
        assert_eq!(backend.folders_created(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_folder_handle() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_upload_at(1);
        let publisher = BlobPublisher::new(backend.clone(), "gallery");
        let dir = local_dir_with(&["a.jpg", "b.jpg", "c.jpg"]);

        let err = publisher.publish("Sunset", dir.path()).await.unwrap_err();

        let partial = err.partial.as_ref().unwrap();
        assert_eq!(partial.urls.len(), 1);
        let folder = err.folder().unwrap();
        assert_eq!(backend.file_names(folder), vec!["a.jpg"]);
        assert!(matches!(err.source, BlobError::Remote(_)));
    }

    #[tokio::test]
    async fn test_empty_directory_publishes_empty_folder() {
        let backend = Arc::new(InMemoryBackend::new());
        let publisher = BlobPublisher::new(backend.clone(), "gallery");
        let dir = local_dir_with(&[]);

        let photos = publisher.publish("Empty", dir.path()).await.unwrap();
        assert!(photos.urls.is_empty());
        assert!(photos.folder.is_some());
    }

    #[tokio::test]
    async fn test_missing_directory_fails_with_folder() {
        let backend = Arc::new(InMemoryBackend::new());
        let publisher = BlobPublisher::new(backend.clone(), "gallery");

        let err = publisher
            .publish("Ghost", Path::new("/definitely/not/here"))
            .await
            .unwrap_err();
        assert!(matches!(err.source, BlobError::IoError(_)));
        assert!(err.folder().is_some());
    }
}
