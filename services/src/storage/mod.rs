//! File storage for re-hosted link preview images.
//!
//! The enrichment worker never serves bytes itself; it uploads fetched
//! images to an object store and persists the resulting public URL.
//! `FileStorage` is the seam: Cloudflare R2 (via OpenDAL's S3 service)
//! in production, an in-memory mock in tests.

mod mock;
mod r2;
mod traits;

pub use mock::MockFileStorage;
pub use r2::{R2Config, R2FileStorage};
pub use traits::{FileStorage, FileStorageError};
