use photo_pipeline::{BlobError, PublishError, TranscodeError};
use std::fmt;

/// Central error types for the gallery catalog
#[derive(Debug)]
pub enum AppError {
    /// Malformed or missing request field; nothing was changed
    Validation(String),
    /// Local disk failure (scratch directories, staged files)
    Io(std::io::Error),
    /// Uploaded file is not a picture we can read
    ImageDecode(String),
    /// Network, authentication or quota failure against blob storage
    RemoteStorage(String),
    /// Missing painting record or missing remote folder
    NotFound(String),
    /// Metadata store write/read failure
    Persistence(String),
    /// Missing or expired session
    Unauthorized(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Io(e) => write!(f, "IO error: {}", e),
            AppError::ImageDecode(msg) => write!(f, "Image decode error: {}", msg),
            AppError::RemoteStorage(msg) => write!(f, "Remote storage error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Persistence(msg) => write!(f, "Persistence error: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io(e) => Some(e),
            _ => None,
        }
    }
}

// Conversions from other error types
impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}

impl From<TranscodeError> for AppError {
    fn from(e: TranscodeError) -> Self {
        match e {
            TranscodeError::Decode(msg) => AppError::ImageDecode(msg),
            TranscodeError::Encode(msg) => AppError::Io(std::io::Error::other(msg)),
            TranscodeError::IoError(e) => AppError::Io(e),
        }
    }
}

impl From<BlobError> for AppError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::NotFound(msg) => AppError::NotFound(msg),
            BlobError::Remote(msg) => AppError::RemoteStorage(msg),
            BlobError::IoError(e) => AppError::Io(e),
        }
    }
}

impl From<PublishError> for AppError {
    fn from(e: PublishError) -> Self {
        match e.source {
            BlobError::IoError(io) => AppError::Io(io),
            _ => AppError::RemoteStorage(e.to_string()),
        }
    }
}

impl AppError {
    /// HTTP status class a transport layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Unauthorized(_) => 401,
            AppError::NotFound(_) => 404,
            AppError::ImageDecode(_) => 415,
            AppError::Io(_) | AppError::RemoteStorage(_) | AppError::Persistence(_) => 500,
        }
    }

    /// Client-facing message without internal details
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Io(_) => "Could not process the uploaded files.".to_string(),
            AppError::ImageDecode(_) => {
                "One of the uploaded files is not a readable image.".to_string()
            }
            AppError::RemoteStorage(_) => {
                "Photo storage is unavailable. Please try again.".to_string()
            }
            AppError::NotFound(msg) => format!("{} was not found.", msg),
            AppError::Persistence(_) => "A database error occurred. Please try again.".to_string(),
            AppError::Unauthorized(msg) => msg.clone(),
        }
    }
}
