//! # Gallery Catalog
//!
//! Painting records with published photo sets.
//!
//! Metadata lives in SQLite, pictures in remote blob storage reached through
//! [`photo_pipeline`]. The [`services::Gallery`] type sequences both for
//! every create, update and delete.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod response;
pub mod services;

pub use config::GalleryConfig;
pub use error::AppError;
pub use response::Response;
