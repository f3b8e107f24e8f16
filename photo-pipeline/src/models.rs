use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a remote folder, assigned by the blob backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct FolderHandle(String);

impl FolderHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered retrieval links plus the remote folder that owns them
///
/// A set with links always carries a folder handle. An empty set normally
/// carries none; the publisher may still return a handle with zero links so
/// that callers keep a cleanup target for a half-created folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PhotoSet {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<FolderHandle>,
}

impl PhotoSet {
    pub fn new(urls: Vec<String>, folder: FolderHandle) -> Self {
        Self {
            urls,
            folder: Some(folder),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Checks the link/handle pairing rule
    pub fn is_consistent(&self) -> bool {
        self.urls.is_empty()
            || self
                .folder
                .as_ref()
                .is_some_and(|folder| !folder.as_str().is_empty())
    }
}

/// One file received from a client, before it touches the disk
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    /// Name as sent by the client. Only used for logging.
    pub file_name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_photo_set_is_consistent() {
        let photos = PhotoSet::empty();
        assert!(photos.is_empty());
        assert!(photos.folder.is_none());
        assert!(photos.is_consistent());
    }

    #[test]
    fn test_links_without_folder_are_inconsistent() {
        let photos = PhotoSet {
            urls: vec!["https://example.org/a.jpg".to_string()],
            folder: None,
        };
        assert!(!photos.is_consistent());

        let photos = PhotoSet {
            urls: vec!["https://example.org/a.jpg".to_string()],
            folder: Some(FolderHandle::new("")),
        };
        assert!(!photos.is_consistent());
    }

    #[test]
    fn test_photo_set_json_shape() {
        let photos = PhotoSet::new(vec!["u1".into(), "u2".into()], FolderHandle::new("f-1"));
        let json = serde_json::to_value(&photos).unwrap();
        assert_eq!(json["urls"][1], "u2");
        assert_eq!(json["folder"], "f-1");

        let empty = serde_json::to_value(PhotoSet::empty()).unwrap();
        assert!(empty.get("folder").is_none());
    }
}
