//! Filesystem Blob Store
//!
//! Lesson attachments live under a single root directory; storage keys are
//! relative paths below it.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::domain::storage::{BlobObject, BlobStore};
use crate::error::{AcademyError, AcademyResult};

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key below the root. Absolute keys and parent components
    /// never resolve.
    fn resolve(&self, storage_key: &str) -> Option<PathBuf> {
        let key = Path::new(storage_key);
        if storage_key.is_empty()
            || !key
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.root.join(key))
    }
}

impl BlobStore for FsBlobStore {
    async fn open(&self, storage_key: &str) -> AcademyResult<BlobObject> {
        let path = self.resolve(storage_key).ok_or_else(|| {
            tracing::warn!(storage_key = %storage_key, "Rejected blob key outside storage root");
            AcademyError::FileNotFound
        })?;

        let file = tokio::fs::File::open(&path).await.map_err(map_io_error)?;
        let metadata = file.metadata().await.map_err(map_io_error)?;
        if !metadata.is_file() {
            return Err(AcademyError::FileNotFound);
        }

        Ok(BlobObject {
            reader: Box::pin(file),
            size: metadata.len(),
        })
    }
}

fn map_io_error(e: std::io::Error) -> AcademyError {
    match e.kind() {
        ErrorKind::NotFound => AcademyError::FileNotFound,
        _ => AcademyError::BlobStorage(e.to_string()),
    }
}
