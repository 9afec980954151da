//! Persistence abstraction for the service.
//!
//! `SqlStorage` is the single seam between HTTP handlers / domain
//! logic and the database. Production uses [`crate::postgres::PgStorage`]
//! over a `PgPool`; tests substitute in-memory implementations.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::votes::VoteDirection;

/// Initialize a PostgreSQL connection pool and run pending migrations.
pub async fn create_pool(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new().connect(config.database_url()).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database connection pool established");

    Ok(pool)
}

#[derive(Debug, Error)]
pub enum SqlStorageError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    /// The actor is not the owner of the resource being mutated.
    #[error("not the resource owner")]
    Unauthorized,
}

/// Closed category enumeration for collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Category {
    #[serde(rename = "UI_LIBRARY")]
    UiLibrary,
    #[serde(rename = "RESOURCES")]
    Resources,
    #[serde(rename = "SITES")]
    Sites,
    #[serde(rename = "TOOLS")]
    Tools,
    #[serde(rename = "OTHER")]
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UiLibrary => "UI_LIBRARY",
            Self::Resources => "RESOURCES",
            Self::Sites => "SITES",
            Self::Tools => "TOOLS",
            Self::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "UI_LIBRARY" => Some(Self::UiLibrary),
            "RESOURCES" => Some(Self::Resources),
            "SITES" => Some(Self::Sites),
            "TOOLS" => Some(Self::Tools),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::Other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionLinkRow {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub position: i32,
    pub preview_image_url: Option<String>,
    pub preview_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRow {
    pub collection_id: Uuid,
    pub user_id: Uuid,
    pub direction: VoteDirection,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLinkRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub position: i32,
    pub is_active: bool,
}

/// A collection together with its position-ordered links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionWithLinks {
    pub collection: CollectionRow,
    pub links: Vec<CollectionLinkRow>,
}

/// New link payload; position is assigned by the storage call
/// (array index for replace/create).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCreate {
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CollectionCreate {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub links: Vec<LinkCreate>,
}

/// Partial metadata update; `None` means "leave unchanged".
/// `description` uses a nested option so callers can clear it.
#[derive(Debug, Clone, Default)]
pub struct CollectionUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionsListParams {
    pub category: Option<Category>,
    pub user_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct ProfileLinkCreate {
    pub user_id: Uuid,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub position: i32,
    pub is_active: bool,
}

/// Item of a bulk profile-link replace; position comes from the array
/// index on the storage side.
#[derive(Debug, Clone)]
pub struct ProfileLinkReplace {
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub is_active: bool,
}

pub trait SqlStorage: Clone + Send + Sync + 'static {
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    //
    // Collections
    //

    /// Insert a collection with its links (position = array index).
    fn collections_insert(
        &self,
        input: CollectionCreate,
    ) -> impl Future<Output = Result<CollectionWithLinks, SqlStorageError>> + Send;

    fn collections_get(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<CollectionWithLinks>, SqlStorageError>> + Send;

    /// List collections matching the filters, newest first, plus the
    /// unpaginated total.
    fn collections_list(
        &self,
        params: CollectionsListParams,
    ) -> impl Future<Output = Result<(Vec<CollectionWithLinks>, i64), SqlStorageError>> + Send;

    /// Update title/description/category. `Ok(None)` if the id is
    /// unknown, `Err(Unauthorized)` if `user_id` is not the owner.
    fn collections_update_metadata(
        &self,
        id: Uuid,
        user_id: Uuid,
        changes: CollectionUpdate,
    ) -> impl Future<Output = Result<Option<CollectionRow>, SqlStorageError>> + Send;

    /// Delete a collection. `Ok(false)` if the id is unknown,
    /// `Err(Unauthorized)` if `user_id` is not the owner.
    fn collections_delete(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = Result<bool, SqlStorageError>> + Send;

    /// Destructive replace of a collection's link set: delete every
    /// existing link row, recreate from `links` with position = index.
    fn collection_links_replace_all(
        &self,
        collection_id: Uuid,
        links: Vec<LinkCreate>,
    ) -> impl Future<Output = Result<Vec<CollectionLinkRow>, SqlStorageError>> + Send;

    /// Persist enrichment output onto a collection link.
    fn collection_link_set_preview(
        &self,
        link_id: Uuid,
        preview_image_url: Option<String>,
        preview_description: Option<String>,
    ) -> impl Future<Output = Result<(), SqlStorageError>> + Send;

    //
    // Vote ledger
    //

    fn vote_get(
        &self,
        collection_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<VoteRow>, SqlStorageError>> + Send;

    /// Insert a new ledger row. The `(collection_id, user_id)`
    /// uniqueness constraint rejects the loser of a concurrent race.
    fn vote_insert(
        &self,
        collection_id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> impl Future<Output = Result<(), SqlStorageError>> + Send;

    fn vote_set_direction(
        &self,
        collection_id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> impl Future<Output = Result<(), SqlStorageError>> + Send;

    fn vote_delete(
        &self,
        collection_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = Result<bool, SqlStorageError>> + Send;

    fn votes_for_collection(
        &self,
        collection_id: Uuid,
    ) -> impl Future<Output = Result<Vec<VoteRow>, SqlStorageError>> + Send;

    //
    // Profile links
    //

    /// All links for a user, ordered by position.
    fn profile_links_list(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Vec<ProfileLinkRow>, SqlStorageError>> + Send;

    fn profile_links_count(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<i64, SqlStorageError>> + Send;

    fn profile_link_insert(
        &self,
        input: ProfileLinkCreate,
    ) -> impl Future<Output = Result<ProfileLinkRow, SqlStorageError>> + Send;

    /// Destructive replace of a user's whole link list
    /// (position = array index).
    fn profile_links_replace_all(
        &self,
        user_id: Uuid,
        links: Vec<ProfileLinkReplace>,
    ) -> impl Future<Output = Result<Vec<ProfileLinkRow>, SqlStorageError>> + Send;

    /// Apply `(link_id, position)` assignments. Ids that are not links
    /// of `user_id` are no-ops.
    fn profile_links_set_positions(
        &self,
        user_id: Uuid,
        assignments: Vec<(Uuid, i32)>,
    ) -> impl Future<Output = Result<(), SqlStorageError>> + Send;

    /// Flip the active flag without touching position. `Ok(None)` if
    /// the link does not exist or belongs to another user.
    fn profile_link_set_active(
        &self,
        user_id: Uuid,
        link_id: Uuid,
        is_active: bool,
    ) -> impl Future<Output = Result<Option<ProfileLinkRow>, SqlStorageError>> + Send;

    /// Delete a link row. Sibling positions are left as-is; gaps heal
    /// on the next full replace/reorder.
    fn profile_link_delete(
        &self,
        user_id: Uuid,
        link_id: Uuid,
    ) -> impl Future<Output = Result<bool, SqlStorageError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_wire_names() {
        for category in [
            Category::UiLibrary,
            Category::Resources,
            Category::Sites,
            Category::Tools,
            Category::Other,
        ] {
            assert_eq!(Category::parse(category.as_str()), Some(category));
        }
        assert_eq!(Category::parse("GADGETS"), None);
    }

    #[test]
    fn category_defaults_to_other() {
        assert_eq!(Category::default(), Category::Other);
    }
}
