//! In-memory mock file storage for testing.

use super::traits::{FileStorage, FileStorageError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// In-memory [`FileStorage`] implementation. Uploaded objects resolve
/// to `mock://{key}` URLs; `set_failing(true)` makes every call error,
/// which tests use to exercise fallback paths.
#[derive(Clone, Default)]
pub struct MockFileStorage {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    failing: Arc<AtomicBool>,
}

impl MockFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .read()
            .expect("lock poisoned")
            .contains_key(key)
    }

    pub fn content_type_of(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(key)
            .map(|o| o.content_type.clone())
    }

    fn check_failing(&self) -> Result<(), FileStorageError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(FileStorageError::Storage(
                "mock storage is configured to fail".to_owned(),
            ))
        } else {
            Ok(())
        }
    }
}

impl FileStorage for MockFileStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, FileStorageError> {
        self.check_failing()?;
        self.objects.write().expect("lock poisoned").insert(
            key.to_owned(),
            StoredObject {
                bytes,
                content_type: content_type.to_owned(),
            },
        );
        Ok(format!("mock://{key}"))
    }

    async fn delete(&self, key: &str) -> Result<bool, FileStorageError> {
        self.check_failing()?;
        Ok(self
            .objects
            .write()
            .expect("lock poisoned")
            .remove(key)
            .is_some())
    }
}
