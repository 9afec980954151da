//! Shared test utilities for integration tests.
//!
//! `MemStorage` is a full in-memory `SqlStorage` implementation with
//! the same observable semantics as the PostgreSQL one, so API flows
//! can run end to end without a database.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::Router;
use chrono::Utc;
use uuid::Uuid;

use linkgarden_services::{
    auth::generate_session_token,
    config::Config,
    database::{
        CollectionCreate, CollectionLinkRow, CollectionRow, CollectionUpdate, CollectionWithLinks,
        CollectionsListParams, LinkCreate, ProfileLinkCreate, ProfileLinkReplace, ProfileLinkRow,
        SqlStorage, SqlStorageError, VoteRow,
    },
    preview::EnrichmentQueue,
    routes,
    votes::VoteDirection,
};

/// Fixed user ids for multi-actor scenarios.
#[allow(dead_code)]
pub const USER_A: Uuid = Uuid::from_u128(0x00000000_0000_0000_0000_0000000000a1);
#[allow(dead_code)]
pub const USER_B: Uuid = Uuid::from_u128(0x00000000_0000_0000_0000_0000000000b2);
#[allow(dead_code)]
pub const USER_C: Uuid = Uuid::from_u128(0x00000000_0000_0000_0000_0000000000c3);

/// JWT secret matching `Config::new_for_test`.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-key-for-local-development";

#[allow(dead_code)]
pub fn token_for(user_id: Uuid) -> String {
    generate_session_token(user_id, TEST_JWT_SECRET, 3600).expect("test token generation")
}

#[allow(dead_code)]
pub async fn create_test_app(storage: MemStorage) -> Router {
    routes(
        storage,
        EnrichmentQueue::disconnected(),
        Config::new_for_test(),
    )
    .await
}

/// Build the app with a live enrichment queue, for tests that run the
/// preview worker.
#[allow(dead_code)]
pub async fn create_test_app_with_enrichment(
    storage: MemStorage,
    enrichment: EnrichmentQueue,
) -> Router {
    routes(storage, enrichment, Config::new_for_test()).await
}

#[derive(Default)]
struct Inner {
    collections: HashMap<Uuid, CollectionRow>,
    collection_links: HashMap<Uuid, CollectionLinkRow>,
    votes: HashMap<(Uuid, Uuid), VoteRow>,
    profile_links: HashMap<Uuid, ProfileLinkRow>,
}

/// In-memory stand-in for the PostgreSQL storage.
#[derive(Clone, Default)]
pub struct MemStorage {
    inner: Arc<RwLock<Inner>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn links_of(inner: &Inner, collection_id: Uuid) -> Vec<CollectionLinkRow> {
        let mut links: Vec<_> = inner
            .collection_links
            .values()
            .filter(|l| l.collection_id == collection_id)
            .cloned()
            .collect();
        links.sort_by_key(|l| (l.position, l.id));
        links
    }

    /// Raw link rows for assertions against preview state.
    #[allow(dead_code)]
    pub fn collection_links(&self, collection_id: Uuid) -> Vec<CollectionLinkRow> {
        Self::links_of(&self.inner.read().unwrap(), collection_id)
    }

    /// One link row by id, for assertions against preview state.
    #[allow(dead_code)]
    pub fn collection_link(&self, link_id: Uuid) -> Option<CollectionLinkRow> {
        self.inner.read().unwrap().collection_links.get(&link_id).cloned()
    }

    /// Raw profile link rows, position order.
    #[allow(dead_code)]
    pub fn profile_links(&self, user_id: Uuid) -> Vec<ProfileLinkRow> {
        let inner = self.inner.read().unwrap();
        let mut links: Vec<_> = inner
            .profile_links
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        links.sort_by_key(|l| (l.position, l.id));
        links
    }
}

impl SqlStorage for MemStorage {
    async fn is_connected(&self) -> bool {
        true
    }

    async fn collections_insert(
        &self,
        input: CollectionCreate,
    ) -> Result<CollectionWithLinks, SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        let now = Utc::now();
        let collection = CollectionRow {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            title: input.title,
            description: input.description,
            category: input.category,
            created_at: now,
            updated_at: now,
        };
        let mut links = Vec::with_capacity(input.links.len());
        for (index, link) in input.links.into_iter().enumerate() {
            let row = CollectionLinkRow {
                id: Uuid::new_v4(),
                collection_id: collection.id,
                title: link.title,
                url: link.url,
                icon: link.icon,
                position: index as i32,
                preview_image_url: None,
                preview_description: None,
            };
            inner.collection_links.insert(row.id, row.clone());
            links.push(row);
        }
        inner.collections.insert(collection.id, collection.clone());
        Ok(CollectionWithLinks { collection, links })
    }

    async fn collections_get(
        &self,
        id: Uuid,
    ) -> Result<Option<CollectionWithLinks>, SqlStorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .collections
            .get(&id)
            .map(|collection| CollectionWithLinks {
                collection: collection.clone(),
                links: Self::links_of(&inner, id),
            }))
    }

    async fn collections_list(
        &self,
        params: CollectionsListParams,
    ) -> Result<(Vec<CollectionWithLinks>, i64), SqlStorageError> {
        let inner = self.inner.read().unwrap();
        let mut matching: Vec<_> = inner
            .collections
            .values()
            .filter(|c| params.category.is_none_or(|cat| c.category == cat))
            .filter(|c| params.user_id.is_none_or(|u| c.user_id == u))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len() as i64;

        let page = matching
            .into_iter()
            .skip(params.offset.max(0) as usize)
            .take(params.limit.max(0) as usize)
            .map(|collection| {
                let links = Self::links_of(&inner, collection.id);
                CollectionWithLinks { collection, links }
            })
            .collect();
        Ok((page, total))
    }

    async fn collections_update_metadata(
        &self,
        id: Uuid,
        user_id: Uuid,
        changes: CollectionUpdate,
    ) -> Result<Option<CollectionRow>, SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        let Some(collection) = inner.collections.get_mut(&id) else {
            return Ok(None);
        };
        if collection.user_id != user_id {
            return Err(SqlStorageError::Unauthorized);
        }
        if let Some(title) = changes.title {
            collection.title = title;
        }
        if let Some(description) = changes.description {
            collection.description = description;
        }
        if let Some(category) = changes.category {
            collection.category = category;
        }
        collection.updated_at = Utc::now();
        Ok(Some(collection.clone()))
    }

    async fn collections_delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        let Some(collection) = inner.collections.get(&id) else {
            return Ok(false);
        };
        if collection.user_id != user_id {
            return Err(SqlStorageError::Unauthorized);
        }
        inner.collections.remove(&id);
        inner.collection_links.retain(|_, l| l.collection_id != id);
        inner.votes.retain(|(cid, _), _| *cid != id);
        Ok(true)
    }

    async fn collection_links_replace_all(
        &self,
        collection_id: Uuid,
        links: Vec<LinkCreate>,
    ) -> Result<Vec<CollectionLinkRow>, SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        inner
            .collection_links
            .retain(|_, l| l.collection_id != collection_id);
        let mut rows = Vec::with_capacity(links.len());
        for (index, link) in links.into_iter().enumerate() {
            let row = CollectionLinkRow {
                id: Uuid::new_v4(),
                collection_id,
                title: link.title,
                url: link.url,
                icon: link.icon,
                position: index as i32,
                preview_image_url: None,
                preview_description: None,
            };
            inner.collection_links.insert(row.id, row.clone());
            rows.push(row);
        }
        Ok(rows)
    }

    async fn collection_link_set_preview(
        &self,
        link_id: Uuid,
        preview_image_url: Option<String>,
        preview_description: Option<String>,
    ) -> Result<(), SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        if let Some(link) = inner.collection_links.get_mut(&link_id) {
            link.preview_image_url = preview_image_url;
            link.preview_description = preview_description;
        }
        Ok(())
    }

    async fn vote_get(
        &self,
        collection_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<VoteRow>, SqlStorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.votes.get(&(collection_id, user_id)).cloned())
    }

    async fn vote_insert(
        &self,
        collection_id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> Result<(), SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        if inner.votes.contains_key(&(collection_id, user_id)) {
            // Same failure the unique constraint produces
            return Err(SqlStorageError::Db(sqlx::Error::Protocol(
                "duplicate vote row".to_string(),
            )));
        }
        inner.votes.insert(
            (collection_id, user_id),
            VoteRow {
                collection_id,
                user_id,
                direction,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn vote_set_direction(
        &self,
        collection_id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> Result<(), SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        if let Some(vote) = inner.votes.get_mut(&(collection_id, user_id)) {
            vote.direction = direction;
            vote.created_at = Utc::now();
        }
        Ok(())
    }

    async fn vote_delete(
        &self,
        collection_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.votes.remove(&(collection_id, user_id)).is_some())
    }

    async fn votes_for_collection(
        &self,
        collection_id: Uuid,
    ) -> Result<Vec<VoteRow>, SqlStorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .votes
            .values()
            .filter(|v| v.collection_id == collection_id)
            .cloned()
            .collect())
    }

    async fn profile_links_list(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ProfileLinkRow>, SqlStorageError> {
        Ok(self.profile_links(user_id))
    }

    async fn profile_links_count(&self, user_id: Uuid) -> Result<i64, SqlStorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .profile_links
            .values()
            .filter(|l| l.user_id == user_id)
            .count() as i64)
    }

    async fn profile_link_insert(
        &self,
        input: ProfileLinkCreate,
    ) -> Result<ProfileLinkRow, SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        let row = ProfileLinkRow {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            title: input.title,
            url: input.url,
            icon: input.icon,
            position: input.position,
            is_active: input.is_active,
        };
        inner.profile_links.insert(row.id, row.clone());
        Ok(row)
    }

    async fn profile_links_replace_all(
        &self,
        user_id: Uuid,
        links: Vec<ProfileLinkReplace>,
    ) -> Result<Vec<ProfileLinkRow>, SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        inner.profile_links.retain(|_, l| l.user_id != user_id);
        let mut rows = Vec::with_capacity(links.len());
        for (index, link) in links.into_iter().enumerate() {
            let row = ProfileLinkRow {
                id: Uuid::new_v4(),
                user_id,
                title: link.title,
                url: link.url,
                icon: link.icon,
                position: index as i32,
                is_active: link.is_active,
            };
            inner.profile_links.insert(row.id, row.clone());
            rows.push(row);
        }
        Ok(rows)
    }

    async fn profile_links_set_positions(
        &self,
        user_id: Uuid,
        assignments: Vec<(Uuid, i32)>,
    ) -> Result<(), SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        for (link_id, position) in assignments {
            if let Some(link) = inner.profile_links.get_mut(&link_id)
                && link.user_id == user_id
            {
                link.position = position;
            }
        }
        Ok(())
    }

    async fn profile_link_set_active(
        &self,
        user_id: Uuid,
        link_id: Uuid,
        is_active: bool,
    ) -> Result<Option<ProfileLinkRow>, SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        match inner.profile_links.get_mut(&link_id) {
            Some(link) if link.user_id == user_id => {
                link.is_active = is_active;
                Ok(Some(link.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn profile_link_delete(
        &self,
        user_id: Uuid,
        link_id: Uuid,
    ) -> Result<bool, SqlStorageError> {
        let mut inner = self.inner.write().unwrap();
        match inner.profile_links.get(&link_id) {
            Some(link) if link.user_id == user_id => {
                inner.profile_links.remove(&link_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
