//! # Photo Pipeline
//!
//! Turns a batch of uploaded pictures into a published photo set.
//!
//! This crate provides the storage-facing half of the gallery:
//! - Staging uploaded bytes into per-request scratch directories
//! - Resizing staged pictures to a fixed long side (JPEG output)
//! - Publishing a directory of pictures into a named remote folder
//! - Removing a remote folder and everything inside it
//!
//! ## Backends
//!
//! Remote storage is reached through the [`BlobBackend`] trait. Two
//! implementations ship with the crate: [`WebDavBackend`] talks to a
//! Nextcloud server (behind the `webdav` feature), [`InMemoryBackend`]
//! keeps everything in process and is meant for tests.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use photo_pipeline::{BlobPublisher, InMemoryBackend, ScratchDir};
//! use std::sync::Arc;
//!
//! let scratch = ScratchDir::create("./tmp")?;
//! photo_pipeline::stage_files(&uploads, &scratch.staged())?;
//! photo_pipeline::resize_directory(&scratch.staged(), &scratch.resized(), 1500).await?;
//!
//! let publisher = BlobPublisher::new(Arc::new(InMemoryBackend::new()), "gallery");
//! let photos = publisher.publish("sunset", &scratch.resized()).await?;
//! ```

pub mod blob;
pub mod models;
pub mod publisher;
pub mod remover;
pub mod staging;
pub mod transcode;

pub use blob::{BlobBackend, BlobError, BlobResult, InMemoryBackend, RemoteFile};
pub use models::{FolderHandle, PhotoSet, UploadedFile};
pub use publisher::{sanitize_folder_name, BlobPublisher, PublishError};
pub use remover::BlobRemover;
pub use staging::{list_regular_files, stage_files, ScratchDir};
pub use transcode::{
    resize_directory, resize_image, target_dimensions, TranscodeError, DEFAULT_TARGET_LONG_SIDE,
};

#[cfg(feature = "webdav")]
pub use blob::webdav::{WebDavBackend, WebDavConfig};
