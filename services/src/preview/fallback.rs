use std::sync::Arc;

use tokio::sync::Mutex;

use crate::storage::FileStorage;

const FALLBACK_IMAGE: &[u8] = include_bytes!("../../assets/fallback-preview.png");
const FALLBACK_KEY: &str = "link-previews/fallback.png";

/// Shared placeholder preview image, uploaded at most once per process
/// and memoized afterwards.
#[derive(Clone, Default)]
pub struct FallbackPreview {
    url: Arc<Mutex<Option<String>>>,
}

impl FallbackPreview {
    pub fn new() -> Self {
        Self::default()
    }

    /// Public URL of the fallback image, uploading it first if this
    /// process has not done so yet. `None` means the upload failed and
    /// the caller should leave the preview unset.
    pub async fn get_or_upload<F: FileStorage>(&self, files: &F) -> Option<String> {
        let mut cached = self.url.lock().await;
        if let Some(url) = cached.as_ref() {
            return Some(url.clone());
        }
        match files
            .upload(FALLBACK_KEY, FALLBACK_IMAGE.to_vec(), "image/png")
            .await
        {
            Ok(url) => {
                *cached = Some(url.clone());
                Some(url)
            }
            Err(e) => {
                tracing::warn!("Fallback preview upload failed: {e}");
                None
            }
        }
    }

    /// Forget the memoized URL so the next call uploads again.
    pub async fn reset(&self) {
        *self.url.lock().await = None;
    }
}
