//! Painting asset pipeline
//!
//! Sequences staging, resizing, publishing and recording for every painting
//! request. A run moves through `Staged → Resized → Published → Recorded →
//! Cleaned` and can fail at any of them. Nothing is retried here.
//!
//! Local failures (staging, decoding) abort before any remote call. Remote
//! and metadata failures after a publish leave the remote folder in place;
//! such folders are logged with their handle so they can be reconciled.

use crate::error::AppError;
use crate::models::{PaintingId, PaintingRecord};
use crate::services::form::{self, FormFields};
use crate::services::metadata_store::MetadataStore;
use crate::services::session_store::SessionStore;
use photo_pipeline::{
    resize_directory, stage_files, BlobBackend, BlobError, BlobPublisher, BlobRemover,
    FolderHandle, PhotoSet, ScratchDir, UploadedFile,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Staged,
    Resized,
    Published,
    Recorded,
    Cleaned,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Staged => "staged",
            Stage::Resized => "resized",
            Stage::Published => "published",
            Stage::Recorded => "recorded",
            Stage::Cleaned => "cleaned",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Started,
    Reached(Stage),
    /// The stage that could not be completed
    Failed(Stage),
}

/// Progress of one request through the pipeline
#[derive(Debug)]
struct PipelineRun {
    operation: &'static str,
    subject: String,
    state: PipelineState,
}

impl PipelineRun {
    fn start(operation: &'static str, subject: impl Into<String>) -> Self {
        let run = Self {
            operation,
            subject: subject.into(),
            state: PipelineState::Started,
        };
        log::debug!("{} '{}': started", run.operation, run.subject);
        run
    }

    fn reached(&mut self, stage: Stage) {
        self.state = PipelineState::Reached(stage);
        log::debug!("{} '{}': {}", self.operation, self.subject, stage);
    }

    fn failed(&mut self, stage: Stage, err: impl Into<AppError>) -> AppError {
        let err = err.into();
        self.state = PipelineState::Failed(stage);
        log::error!(
            "{} '{}' failed before {}: {}",
            self.operation,
            self.subject,
            stage,
            err
        );
        err
    }
}

/// Entry point for every painting operation
#[derive(Clone)]
pub struct Gallery {
    store: Arc<dyn MetadataStore>,
    publisher: BlobPublisher,
    remover: BlobRemover,
    sessions: Arc<dyn SessionStore>,
    scratch_root: PathBuf,
    target_long_side: u32,
}

impl Gallery {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        backend: Arc<dyn BlobBackend>,
        sessions: Arc<dyn SessionStore>,
        parent_folder: impl Into<String>,
        scratch_root: impl Into<PathBuf>,
        target_long_side: u32,
    ) -> Self {
        Self {
            store,
            publisher: BlobPublisher::new(backend.clone(), parent_folder),
            remover: BlobRemover::new(backend),
            sessions,
            scratch_root: scratch_root.into(),
            target_long_side,
        }
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    /// Fails with `Unauthorized` unless `session` is authenticated
    pub async fn authorize(&self, session: &str) -> Result<(), AppError> {
        if session.is_empty() || !self.sessions.get(session).await {
            return Err(AppError::Unauthorized(
                "A valid session is required".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn list(&self) -> Vec<PaintingRecord> {
        self.store.list().await
    }

    pub async fn get(&self, id: &str) -> Result<PaintingRecord, AppError> {
        let id = PaintingId::parse(id)?;
        self.find(id).await
    }

    async fn find(&self, id: PaintingId) -> Result<PaintingRecord, AppError> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Painting {}", id)))
    }

    /// Stages and resizes `files` into a fresh scratch directory
    async fn prepare(
        &self,
        run: &mut PipelineRun,
        files: &[UploadedFile],
    ) -> Result<ScratchDir, AppError> {
        let scratch =
            ScratchDir::create(&self.scratch_root).map_err(|e| run.failed(Stage::Staged, e))?;

        stage_files(files, &scratch.staged()).map_err(|e| run.failed(Stage::Staged, e))?;
        run.reached(Stage::Staged);

        resize_directory(&scratch.staged(), &scratch.resized(), self.target_long_side)
            .await
            .map_err(|e| run.failed(Stage::Resized, e))?;
        run.reached(Stage::Resized);

        Ok(scratch)
    }

    async fn publish(
        &self,
        run: &mut PipelineRun,
        folder_name: &str,
        scratch: &ScratchDir,
    ) -> Result<PhotoSet, AppError> {
        match self.publisher.publish(folder_name, &scratch.resized()).await {
            Ok(photos) => {
                run.reached(Stage::Published);
                Ok(photos)
            }
            Err(e) => {
                if let Some(folder) = e.folder() {
                    log::warn!(
                        "Remote folder {} may hold {} orphaned file(s)",
                        folder,
                        e.partial.as_ref().map(|p| p.urls.len()).unwrap_or(0)
                    );
                }
                Err(run.failed(Stage::Published, e))
            }
        }
    }

    /// Whether a painting other than `id` still points at `folder`
    ///
    /// Paintings created under the same folder name share one remote folder.
    async fn folder_shared(&self, id: PaintingId, folder: &FolderHandle) -> Result<bool, AppError> {
        let records = self.store.list().await;
        if !records.iter().any(|r| r.id == Some(id)) {
            return Err(AppError::Persistence(format!(
                "Could not check which paintings use folder {}",
                folder
            )));
        }
        Ok(records
            .iter()
            .any(|r| r.id != Some(id) && r.photos.folder.as_ref() == Some(folder)))
    }

    fn finish(run: &mut PipelineRun, scratch: Option<ScratchDir>) {
        drop(scratch);
        run.reached(Stage::Cleaned);
    }

    /// Creates a painting from form fields and uploaded pictures
    ///
    /// The pictures are published under `folder_name`, or under the title when
    /// none is given. Without pictures nothing is published and the record
    /// gets an empty photo set.
    pub async fn create(
        &self,
        fields: &FormFields,
        files: Vec<UploadedFile>,
        folder_name: Option<&str>,
    ) -> Result<PaintingRecord, AppError> {
        let mut record = form::parse_new_painting(fields)?;
        let folder_name = folder_name
            .map(str::to_string)
            .unwrap_or_else(|| record.title.primary.clone());
        let mut run = PipelineRun::start("create", folder_name.as_str());

        let scratch = if files.is_empty() {
            None
        } else {
            let scratch = self.prepare(&mut run, &files).await?;
            record.photos = self.publish(&mut run, &folder_name, &scratch).await?;
            Some(scratch)
        };

        let id = match self.store.save(record.clone()).await {
            Some(id) => id,
            None => {
                if let Some(folder) = &record.photos.folder {
                    log::warn!("Remote folder {} has no painting record", folder);
                }
                return Err(run.failed(
                    Stage::Recorded,
                    AppError::Persistence("Painting could not be saved".to_string()),
                ));
            }
        };
        record.id = Some(id);
        run.reached(Stage::Recorded);

        Self::finish(&mut run, scratch);
        log::info!("Created painting {} with {} photo(s)", id, record.photos.urls.len());
        Ok(record)
    }

    /// Applies the non-blank fields and, if pictures are given, replaces the
    /// photo set
    ///
    /// New pictures are staged and resized first. Only then is the old remote
    /// folder removed and the new set published under a folder named after
    /// the painting id.
    pub async fn update(
        &self,
        id: &str,
        fields: &FormFields,
        files: Vec<UploadedFile>,
    ) -> Result<PaintingRecord, AppError> {
        let id = PaintingId::parse(id)?;
        let mut update = form::parse_update(fields)?;
        if update.is_empty() && files.is_empty() {
            return Err(AppError::Validation("Nothing to update".to_string()));
        }

        let existing = self.find(id).await?;
        let mut run = PipelineRun::start("update", id.to_hex());

        let scratch = if files.is_empty() {
            None
        } else {
            let scratch = self.prepare(&mut run, &files).await?;

            if let Some(old) = &existing.photos.folder {
                let shared = self
                    .folder_shared(id, old)
                    .await
                    .map_err(|e| run.failed(Stage::Published, e))?;
                if shared {
                    log::info!("Keeping remote folder {}: other paintings still use it", old);
                } else {
                    match self.remover.remove(old).await {
                        Ok(()) => {}
                        Err(BlobError::NotFound(_)) => {
                            log::debug!("Old remote folder {} was already gone", old)
                        }
                        Err(e) => return Err(run.failed(Stage::Published, e)),
                    }
                }
            }

            update.photos = Some(self.publish(&mut run, &id.to_hex(), &scratch).await?);
            Some(scratch)
        };

        if !self.store.update(id, update.clone()).await {
            if let Some(folder) = update.photos.as_ref().and_then(|p| p.folder.as_ref()) {
                log::warn!(
                    "Painting {} still points at its old photos; new folder {} is unreferenced",
                    id,
                    folder
                );
            }
            return Err(run.failed(
                Stage::Recorded,
                AppError::Persistence(format!("Painting {} could not be updated", id)),
            ));
        }
        run.reached(Stage::Recorded);
        Self::finish(&mut run, scratch);

        let mut record = existing;
        update.apply_to(&mut record);
        log::info!("Updated painting {}", id);
        Ok(record)
    }

    /// Removes the remote folder, then the record
    ///
    /// A folder that is already gone does not block the record deletion. Any
    /// other remote failure keeps the record. A folder other paintings still
    /// point at is left in place.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let id = PaintingId::parse(id)?;
        let record = self.find(id).await?;

        if let Some(folder) = &record.photos.folder {
            if self.folder_shared(id, folder).await? {
                log::info!("Keeping remote folder {}: other paintings still use it", folder);
            } else {
                match self.remover.remove(folder).await {
                    Ok(()) => {}
                    Err(BlobError::NotFound(_)) => {
                        log::warn!("Remote folder {} of painting {} was already gone", folder, id)
                    }
                    Err(e) => {
                        log::error!("Keeping painting {}: remote folder removal failed: {}", id, e);
                        return Err(e.into());
                    }
                }
            }
        }

        if !self.store.delete(id).await {
            log::error!("Painting {} lost its remote folder but the record remains", id);
            return Err(AppError::Persistence(format!(
                "Painting {} could not be deleted",
                id
            )));
        }

        log::info!("Deleted painting {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::metadata_store::InMemoryMetadataStore;
    use crate::services::session_store::InMemorySessionStore;
    use image::{ImageFormat, Rgb, RgbImage};
    use photo_pipeline::InMemoryBackend;
    use std::io::Cursor;
    use std::path::Path;

    struct Fixture {
        gallery: Gallery,
        backend: Arc<InMemoryBackend>,
        store: Arc<InMemoryMetadataStore>,
        sessions: Arc<InMemorySessionStore>,
        scratch: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(InMemoryBackend::new());
        let store = Arc::new(InMemoryMetadataStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let scratch = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(
            store.clone(),
            backend.clone(),
            sessions.clone(),
            "gallery",
            scratch.path(),
            64,
        );
        Fixture {
            gallery,
            backend,
            store,
            sessions,
            scratch,
        }
    }

    fn scratch_entries(root: &Path) -> usize {
        std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
    }

    fn png(width: u32, height: u32) -> UploadedFile {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 90]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        UploadedFile::new("photo.png", bytes.into_inner())
    }

    fn fields(pairs: &[(&str, &str)]) -> FormFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn painting_fields() -> FormFields {
        fields(&[
            ("title", "Sunflowers"),
            ("title_secondary", "Соняшники"),
            ("description", "Oil on canvas"),
            ("price", "1250"),
            ("date", "2021-06-01T12:30:00Z"),
            ("materials", r#"[{"id":"oil","primary":"Oil","secondary":"Олія"}]"#),
            ("size", "[60, 80]"),
            ("availability", "available"),
        ])
    }

    #[tokio::test]
    async fn test_create_publishes_every_file_and_cleans_scratch() {
        let f = fixture();
        let record = f
            .gallery
            .create(&painting_fields(), vec![png(120, 80), png(40, 90), png(10, 10)], None)
            .await
            .unwrap();

        let id = record.id.unwrap();
        let stored = f.gallery.get(&id.to_hex()).await.unwrap();
        assert_eq!(stored, record);
        assert_eq!(stored.photos.urls.len(), 3);

        let folder = stored.photos.folder.clone().unwrap();
        let names = f.backend.file_names(&folder);
        assert_eq!(names.len(), 3);
        assert!(names[0].starts_with("0000-") && names[2].starts_with("0002-"));
        assert!(stored.photos.urls[0].ends_with(&names[0]));
        assert_eq!(scratch_entries(f.scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_create_without_images_stores_empty_photo_set() {
        let f = fixture();
        let record = f.gallery.create(&painting_fields(), Vec::new(), None).await.unwrap();

        assert!(record.photos.is_empty());
        assert!(record.photos.folder.is_none());
        assert_eq!(f.backend.auth_calls(), 0);
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_fields_fail_before_any_side_effect() {
        let f = fixture();
        let mut form = painting_fields();
        form.insert("price".to_string(), "free".to_string());

        let result = f.gallery.create(&form, vec![png(20, 20)], None).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(scratch_entries(f.scratch.path()), 0);
        assert_eq!(f.backend.auth_calls(), 0);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_upload_fails_before_remote_calls() {
        let f = fixture();
        let broken = UploadedFile::new("broken.jpg", b"definitely not an image".to_vec());

        let result = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20), broken], None)
            .await;
        assert!(matches!(result, Err(AppError::ImageDecode(_))));
        assert_eq!(f.backend.auth_calls(), 0);
        assert_eq!(f.backend.folders_created(), 0);
        assert_eq!(scratch_entries(f.scratch.path()), 0);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces_and_keeps_partial_folder() {
        let f = fixture();
        f.backend.fail_upload_at(1);

        let result = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20), png(30, 20)], None)
            .await;
        assert!(matches!(result, Err(AppError::RemoteStorage(_))));
        assert_eq!(f.backend.folder_count(), 1);
        assert!(f.store.is_empty());
        assert_eq!(scratch_entries(f.scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_save_failure_after_publish_leaves_orphan_folder() {
        let f = fixture();
        f.store.fail_saves(true);

        let result = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], Some("orphan"))
            .await;
        assert!(matches!(result, Err(AppError::Persistence(_))));
        assert_eq!(f.backend.folder_count(), 1);
        assert_eq!(scratch_entries(f.scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_same_folder_name_reuses_remote_folder() {
        let f = fixture();
        let first = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], Some("series"))
            .await
            .unwrap();
        let second = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], Some("series"))
            .await
            .unwrap();

        assert_eq!(f.backend.folders_created(), 1);
        assert_eq!(first.photos.folder, second.photos.folder);
        assert_eq!(f.store.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_folder_then_record() {
        let f = fixture();
        let record = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], None)
            .await
            .unwrap();
        let id = record.id.unwrap().to_hex();

        f.gallery.delete(&id).await.unwrap();
        assert_eq!(f.backend.folder_count(), 0);
        assert!(matches!(f.gallery.get(&id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_folder_removal_keeps_record() {
        let f = fixture();
        let record = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], None)
            .await
            .unwrap();
        let id = record.id.unwrap().to_hex();
        f.backend.fail_deletes(true);

        let result = f.gallery.delete(&id).await;
        assert!(matches!(result, Err(AppError::RemoteStorage(_))));
        assert_eq!(f.gallery.get(&id).await.unwrap(), record);
        assert_eq!(f.backend.folder_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_painting_skips_remote() {
        let f = fixture();
        let missing = PaintingId::generate().to_hex();

        let result = f.gallery.delete(&missing).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(f.backend.auth_calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_with_folder_already_gone() {
        let f = fixture();
        let record = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], None)
            .await
            .unwrap();
        let folder = record.photos.folder.clone().unwrap();
        f.gallery.remover.remove(&folder).await.unwrap();

        let id = record.id.unwrap().to_hex();
        f.gallery.delete(&id).await.unwrap();
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_keeps_folder_shared_by_same_title() {
        let f = fixture();
        let first = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], None)
            .await
            .unwrap();
        let second = f
            .gallery
            .create(&painting_fields(), vec![png(30, 20)], None)
            .await
            .unwrap();
        let folder = second.photos.folder.clone().unwrap();
        assert_eq!(first.photos.folder.as_ref(), Some(&folder));

        f.gallery.delete(&first.id.unwrap().to_hex()).await.unwrap();
        assert_eq!(f.store.len(), 1);
        assert_eq!(f.backend.folder_count(), 1);
        assert_eq!(f.backend.file_names(&folder).len(), 2);
        assert_eq!(f.gallery.get(&second.id.unwrap().to_hex()).await.unwrap(), second);

        // Last user of the folder takes it along
        f.gallery.delete(&second.id.unwrap().to_hex()).await.unwrap();
        assert_eq!(f.backend.folder_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_blank_titles_keep_each_others_photos() {
        let f = fixture();
        let mut form = painting_fields();
        form.insert("title".to_string(), "   ".to_string());
        let first = f.gallery.create(&form, vec![png(20, 20)], None).await.unwrap();
        let second = f.gallery.create(&form, vec![png(20, 20)], None).await.unwrap();

        f.gallery.delete(&second.id.unwrap().to_hex()).await.unwrap();
        let folder = first.photos.folder.unwrap();
        assert_eq!(f.backend.file_names(&folder).len(), 2);
    }

    #[tokio::test]
    async fn test_photo_update_keeps_folder_shared_by_same_title() {
        let f = fixture();
        let first = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], None)
            .await
            .unwrap();
        let second = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], None)
            .await
            .unwrap();
        let shared = second.photos.folder.clone().unwrap();

        let updated = f
            .gallery
            .update(&first.id.unwrap().to_hex(), &FormFields::new(), vec![png(40, 40)])
            .await
            .unwrap();

        assert_ne!(updated.photos.folder.as_ref(), Some(&shared));
        assert_eq!(f.backend.folder_count(), 2);
        assert_eq!(f.backend.file_names(&shared).len(), 2);
        assert_eq!(f.gallery.get(&second.id.unwrap().to_hex()).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_update_with_photos_replaces_links() {
        let f = fixture();
        let record = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20), png(30, 30)], None)
            .await
            .unwrap();
        let id = record.id.unwrap().to_hex();
        let old_urls = record.photos.urls.clone();

        let updated = f
            .gallery
            .update(&id, &FormFields::new(), vec![png(50, 20), png(20, 50), png(5, 5)])
            .await
            .unwrap();

        let stored = f.gallery.get(&id).await.unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.photos.urls.len(), 3);
        assert!(stored.photos.urls.iter().all(|url| !old_urls.contains(url)));
        assert_eq!(f.backend.folder_count(), 1);

        let folder = stored.photos.folder.unwrap();
        assert_eq!(f.backend.file_names(&folder).len(), 3);
    }

    #[tokio::test]
    async fn test_photo_update_record_failure_leaves_new_folder() {
        let f = fixture();
        let record = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], None)
            .await
            .unwrap();
        let id = record.id.unwrap();
        f.store.fail_updates(true);

        let result = f
            .gallery
            .update(&id.to_hex(), &FormFields::new(), vec![png(30, 30)])
            .await;
        assert!(matches!(result, Err(AppError::Persistence(_))));
        assert_eq!(scratch_entries(f.scratch.path()), 0);

        // Old folder is gone, the new one is published but unreferenced
        assert_eq!(f.backend.folders_created(), 2);
        assert_eq!(f.backend.folder_count(), 1);
        let old = record.photos.folder.clone().unwrap();
        assert!(f.backend.file_names(&old).is_empty());
        assert_eq!(f.store.get(id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_record_delete_failure_after_folder_removal() {
        let f = fixture();
        let record = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], None)
            .await
            .unwrap();
        let id = record.id.unwrap();
        f.store.fail_deletes(true);

        let result = f.gallery.delete(&id.to_hex()).await;
        assert!(matches!(result, Err(AppError::Persistence(_))));
        assert_eq!(f.backend.folder_count(), 0);
        assert_eq!(f.store.get(id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_repeated_photo_update_does_not_accumulate_files() {
        let f = fixture();
        let record = f.gallery.create(&painting_fields(), Vec::new(), None).await.unwrap();
        let id = record.id.unwrap().to_hex();

        f.gallery.update(&id, &FormFields::new(), vec![png(20, 20)]).await.unwrap();
        let second = f
            .gallery
            .update(&id, &FormFields::new(), vec![png(20, 20), png(20, 20)])
            .await
            .unwrap();

        let folder = second.photos.folder.unwrap();
        assert_eq!(f.backend.file_names(&folder).len(), 2);
        assert_eq!(second.photos.urls.len(), 2);
        assert_eq!(f.backend.folder_count(), 1);
    }

    #[tokio::test]
    async fn test_price_update_touches_only_price() {
        let f = fixture();
        let record = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], None)
            .await
            .unwrap();
        let id = record.id.unwrap().to_hex();

        let updated = f
            .gallery
            .update(&id, &fields(&[("price", "99.5")]), Vec::new())
            .await
            .unwrap();

        assert_eq!(updated.price, 99.5);
        assert_eq!(PaintingRecord { price: record.price, ..updated }, record);
        assert_eq!(f.backend.folders_created(), 1);
    }

    #[tokio::test]
    async fn test_update_bad_image_keeps_old_photos() {
        let f = fixture();
        let record = f
            .gallery
            .create(&painting_fields(), vec![png(20, 20)], None)
            .await
            .unwrap();
        let id = record.id.unwrap().to_hex();

        let broken = UploadedFile::new("x.png", vec![0, 1, 2, 3]);
        let result = f.gallery.update(&id, &FormFields::new(), vec![broken]).await;
        assert!(matches!(result, Err(AppError::ImageDecode(_))));
        assert_eq!(f.gallery.get(&id).await.unwrap(), record);
        assert_eq!(f.backend.folder_count(), 1);
    }

    #[tokio::test]
    async fn test_update_rejects_empty_and_unknown() {
        let f = fixture();
        let missing = PaintingId::generate().to_hex();

        let empty = f.gallery.update(&missing, &FormFields::new(), Vec::new()).await;
        assert!(matches!(empty, Err(AppError::Validation(_))));

        let unknown = f
            .gallery
            .update(&missing, &fields(&[("title", "x")]), vec![png(10, 10)])
            .await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));
        assert_eq!(scratch_entries(f.scratch.path()), 0);

        let malformed = f.gallery.get("not-an-id").await;
        assert!(matches!(malformed, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_authorize() {
        let f = fixture();
        assert!(matches!(
            f.gallery.authorize("token").await,
            Err(AppError::Unauthorized(_))
        ));

        f.sessions.put("token", true).await.unwrap();
        assert!(f.gallery.authorize("token").await.is_ok());
        assert!(f.gallery.authorize("").await.is_err());
    }

    #[test]
    fn test_run_records_failed_stage() {
        let mut run = PipelineRun::start("create", "x");
        run.reached(Stage::Staged);
        assert_eq!(run.state, PipelineState::Reached(Stage::Staged));

        let err = run.failed(Stage::Resized, AppError::ImageDecode("bad".into()));
        assert_eq!(run.state, PipelineState::Failed(Stage::Resized));
        assert!(matches!(err, AppError::ImageDecode(_)));
    }
}
