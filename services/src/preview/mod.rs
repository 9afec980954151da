//! Link preview enrichment.
//!
//! Collection links created or replaced without a user-supplied icon
//! get a page description and a re-hosted preview image, fetched after
//! the HTTP response has already gone out. Handlers push
//! [`EnrichmentJob`]s onto a queue; a worker task owned by `main`
//! drains it. A job failure is logged and ends that job only; nothing
//! here ever reaches a caller.

mod fallback;
mod image;
mod metadata;

pub use fallback::FallbackPreview;
pub use image::{MAX_IMAGE_BYTES, content_type_for, extension_for, resolve_image_url};
pub use metadata::{HttpMetadataClient, LinkMetadata, MetadataClient, MetadataError, MockMetadataClient};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::database::{SqlStorage, SqlStorageError};
use crate::storage::FileStorage;

/// One pending enrichment for a collection link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentJob {
    pub link_id: Uuid,
    pub url: String,
}

/// Cloneable handle handlers use to hand jobs to the worker.
#[derive(Clone)]
pub struct EnrichmentQueue {
    tx: mpsc::UnboundedSender<EnrichmentJob>,
}

impl EnrichmentQueue {
    pub fn enqueue(&self, job: EnrichmentJob) {
        if let Err(e) = self.tx.send(job) {
            tracing::warn!("Enrichment worker is gone, dropping job: {e}");
        }
    }

    /// A queue whose jobs go nowhere, for tests and tooling that do
    /// not run a worker.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }
}

/// Spawn the enrichment worker; returns the queue handle and the task
/// handle (held by `main` so worker death is observable).
pub fn spawn_worker<S, M, F>(
    storage: S,
    metadata: M,
    files: F,
    fallback: FallbackPreview,
) -> (EnrichmentQueue, JoinHandle<()>)
where
    S: SqlStorage,
    M: MetadataClient,
    F: FileStorage,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<EnrichmentJob>();
    let http = reqwest::Client::new();

    let handle = tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let link_id = job.link_id;
            if let Err(e) =
                run_enrichment(&storage, &metadata, &files, &fallback, &http, job).await
            {
                tracing::warn!(%link_id, "Failed to persist link preview: {e}");
            }
        }
        tracing::info!("Enrichment queue closed, worker exiting");
    });

    (EnrichmentQueue { tx }, handle)
}

/// Run one enrichment job to completion.
///
/// Only a persistence failure surfaces as an error (so the worker can
/// log it); every fetch/upload failure degrades to the shared fallback
/// image, and a fallback failure leaves the link without a preview.
pub async fn run_enrichment<S, M, F>(
    storage: &S,
    metadata: &M,
    files: &F,
    fallback: &FallbackPreview,
    http: &reqwest::Client,
    job: EnrichmentJob,
) -> Result<(), SqlStorageError>
where
    S: SqlStorage,
    M: MetadataClient,
    F: FileStorage,
{
    match metadata.fetch(&job.url).await {
        Ok(meta) => {
            let mut preview_url = None;
            if let Some(image_url) = meta.image.as_deref() {
                preview_url =
                    image::fetch_and_upload(http, files, image_url, job.link_id, &job.url).await;
            }
            if preview_url.is_none() {
                preview_url = fallback.get_or_upload(files).await;
            }
            storage
                .collection_link_set_preview(job.link_id, preview_url, meta.description)
                .await
        }
        Err(e) => {
            tracing::warn!(link_id = %job.link_id, url = %job.url, "Metadata fetch failed: {e}");
            match fallback.get_or_upload(files).await {
                Some(fallback_url) => {
                    storage
                        .collection_link_set_preview(job.link_id, Some(fallback_url), None)
                        .await
                }
                // Nothing to persist; the link keeps no preview.
                None => Ok(()),
            }
        }
    }
}
