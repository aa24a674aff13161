//! Blob storage port

use std::pin::Pin;

use tokio::io::AsyncRead;

use crate::error::AcademyResult;

/// An opened blob: a reader plus its exact length in bytes
pub struct BlobObject {
    pub reader: Pin<Box<dyn AsyncRead + Send>>,
    pub size: u64,
}

impl std::fmt::Debug for BlobObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobObject").field("size", &self.size).finish()
    }
}

#[trait_variant::make(BlobStore: Send)]
pub trait LocalBlobStore {
    /// Open a blob for streaming. Missing keys yield `FileNotFound`.
    async fn open(&self, storage_key: &str) -> AcademyResult<BlobObject>;
}
