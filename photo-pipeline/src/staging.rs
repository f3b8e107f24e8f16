//! Local staging of uploaded files
//!
//! Every request gets its own scratch directory below a shared root. The
//! directory is owned by a [`ScratchDir`] guard and removed when the guard
//! goes out of scope, whichever way the request ends.

use crate::models::UploadedFile;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const STAGED_DIR: &str = "staged";
const RESIZED_DIR: &str = "resized";

/// Per-request scratch directory, removed on drop
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Creates `<root>/<uuid>` and returns a guard for it
    pub fn create(root: impl AsRef<Path>) -> io::Result<Self> {
        let path = root.as_ref().join(Uuid::new_v4().to_string());
        fs::create_dir_all(&path)?;
        log::debug!("Scratch directory created: {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory receiving the raw uploads
    pub fn staged(&self) -> PathBuf {
        self.path.join(STAGED_DIR)
    }

    /// Directory receiving the resized copies
    pub fn resized(&self) -> PathBuf {
        self.path.join(RESIZED_DIR)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => log::debug!("Scratch directory removed: {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Could not remove scratch directory {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Writes every upload into `dir` under a fresh name
///
/// Names look like `0003-<uuid>.upload`: the leading upload index orders the
/// listing from [`list_regular_files`], the UUID keeps names unique.
/// Nothing of the client's file name survives. Files written before a
/// failure are left in place for the owning [`ScratchDir`] to clean up.
pub fn stage_files(files: &[UploadedFile], dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut staged = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let path = dir.join(format!("{:04}-{}.upload", index, Uuid::new_v4()));
        fs::write(&path, &file.content)?;
        log::debug!(
            "Staged upload '{}' ({} bytes) as {}",
            file.file_name,
            file.content.len(),
            path.display()
        );
        staged.push(path);
    }

    Ok(staged)
}

/// Lists regular files in `dir` in upload order
///
/// Files are ordered by the number their name starts with, then by name, so
/// `10000-…` follows `9999-…`. Names without a leading number come last.
/// Subdirectories, symlinks and other non-regular entries are skipped.
pub fn list_regular_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort_by_cached_key(|path| (upload_index(path), path.clone()));
    Ok(files)
}

fn upload_index(path: &Path) -> u64 {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| {
            let digits = name.bytes().take_while(u8::is_ascii_digit).count();
            name[..digits].parse().ok()
        })
        .unwrap_or(u64::MAX)
}
