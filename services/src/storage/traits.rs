//! File storage trait definition.

use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStorageError {
    #[error("storage not configured: {0}")]
    NotConfigured(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Object storage for preview images.
///
/// `upload` persists the bytes under `key` and returns the public URL
/// the stored object is served from.
pub trait FileStorage: Clone + Send + Sync + 'static {
    fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<String, FileStorageError>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<bool, FileStorageError>> + Send;
}
