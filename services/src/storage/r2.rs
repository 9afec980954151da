//! Cloudflare R2 file storage via OpenDAL's S3 service.

use super::traits::{FileStorage, FileStorageError};
use crate::config::Config;

/// Connection settings for an R2 bucket fronted by a public base URL.
#[derive(Debug, Clone)]
pub struct R2Config {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    /// Public hostname the bucket is served from, e.g. a custom CDN
    /// domain; uploaded keys are appended to this.
    pub public_base_url: String,
}

impl R2Config {
    /// Build from the service config; `None` when R2 credentials are
    /// absent (local/test environments).
    pub fn from_config(config: &Config) -> Option<Self> {
        Some(Self {
            account_id: config.r2_account_id()?.to_owned(),
            access_key_id: config.r2_access_key_id()?.to_owned(),
            secret_access_key: config.r2_secret_access_key()?.to_owned(),
            bucket: config.r2_bucket()?.to_owned(),
            public_base_url: config.r2_public_base_url()?.to_owned(),
        })
    }
}

/// R2-backed [`FileStorage`].
#[derive(Clone)]
pub struct R2FileStorage {
    config: R2Config,
}

impl R2FileStorage {
    pub fn new(config: R2Config) -> Self {
        Self { config }
    }

    fn operator(&self) -> Result<opendal::Operator, FileStorageError> {
        let builder = opendal::services::S3::default()
            .bucket(&self.config.bucket)
            .region("auto")
            .access_key_id(&self.config.access_key_id)
            .secret_access_key(&self.config.secret_access_key)
            .endpoint(&format!(
                "https://{}.r2.cloudflarestorage.com",
                self.config.account_id
            ));

        opendal::Operator::new(builder)
            .map(|op| op.finish())
            .map_err(|e| FileStorageError::Storage(e.to_string()))
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            key
        )
    }
}

impl FileStorage for R2FileStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, FileStorageError> {
        let op = self.operator()?;
        op.write_with(key, bytes)
            .content_type(content_type)
            .await
            .map_err(|e| FileStorageError::Storage(e.to_string()))?;
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> Result<bool, FileStorageError> {
        let op = self.operator()?;
        let existed = op
            .exists(key)
            .await
            .map_err(|e| FileStorageError::Storage(e.to_string()))?;
        if existed {
            op.delete(key)
                .await
                .map_err(|e| FileStorageError::Storage(e.to_string()))?;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> R2Config {
        R2Config {
            account_id: "acct".to_owned(),
            access_key_id: "key".to_owned(),
            secret_access_key: "secret".to_owned(),
            bucket: "previews".to_owned(),
            public_base_url: "https://cdn.example.com/".to_owned(),
        }
    }

    #[test]
    fn public_url_joins_without_double_slash() {
        let storage = R2FileStorage::new(config());
        assert_eq!(
            storage.public_url("link-previews/abc.png"),
            "https://cdn.example.com/link-previews/abc.png"
        );
    }
}
