//! PostgreSQL-backed [`SqlStorage`].
//!
//! Rows carrying closed enums (category, vote direction) come off the
//! wire as text and are mapped through the enum parsers; an
//! unrecognized value is a `ColumnDecode` error rather than a panic.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::database::{
    Category, CollectionCreate, CollectionLinkRow, CollectionRow, CollectionUpdate,
    CollectionWithLinks, CollectionsListParams, LinkCreate, ProfileLinkCreate, ProfileLinkReplace,
    ProfileLinkRow, SqlStorage, SqlStorageError, VoteRow,
};
use crate::votes::VoteDirection;

#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_error(column: &str, value: String) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unrecognized {column} value: {value}").into(),
    }
}

#[derive(FromRow)]
struct PgCollection {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    category: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PgCollection {
    fn into_row(self) -> Result<CollectionRow, sqlx::Error> {
        let category =
            Category::parse(&self.category).ok_or_else(|| decode_error("category", self.category.clone()))?;
        Ok(CollectionRow {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            category,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct PgCollectionLink {
    id: Uuid,
    collection_id: Uuid,
    title: String,
    url: String,
    icon: Option<String>,
    position: i32,
    preview_image_url: Option<String>,
    preview_description: Option<String>,
}

impl From<PgCollectionLink> for CollectionLinkRow {
    fn from(row: PgCollectionLink) -> Self {
        Self {
            id: row.id,
            collection_id: row.collection_id,
            title: row.title,
            url: row.url,
            icon: row.icon,
            position: row.position,
            preview_image_url: row.preview_image_url,
            preview_description: row.preview_description,
        }
    }
}

#[derive(FromRow)]
struct PgVote {
    collection_id: Uuid,
    user_id: Uuid,
    direction: String,
    created_at: DateTime<Utc>,
}

impl PgVote {
    fn into_row(self) -> Result<VoteRow, sqlx::Error> {
        let direction = VoteDirection::parse(&self.direction)
            .ok_or_else(|| decode_error("direction", self.direction.clone()))?;
        Ok(VoteRow {
            collection_id: self.collection_id,
            user_id: self.user_id,
            direction,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct PgProfileLink {
    id: Uuid,
    user_id: Uuid,
    title: String,
    url: String,
    icon: Option<String>,
    position: i32,
    is_active: bool,
}

impl From<PgProfileLink> for ProfileLinkRow {
    fn from(row: PgProfileLink) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            url: row.url,
            icon: row.icon,
            position: row.position,
            is_active: row.is_active,
        }
    }
}

const COLLECTION_LINK_COLUMNS: &str =
    "id, collection_id, title, url, icon, position, preview_image_url, preview_description";

async fn links_for_collection<'e, E>(
    executor: E,
    collection_id: Uuid,
) -> Result<Vec<CollectionLinkRow>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, PgCollectionLink>(&format!(
        "SELECT {COLLECTION_LINK_COLUMNS} FROM collection_links \
         WHERE collection_id = $1 ORDER BY position, id"
    ))
    .bind(collection_id)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(CollectionLinkRow::from).collect())
}

async fn insert_links(
    tx: &mut sqlx::PgTransaction<'_>,
    collection_id: Uuid,
    links: Vec<LinkCreate>,
) -> Result<Vec<CollectionLinkRow>, sqlx::Error> {
    let mut rows = Vec::with_capacity(links.len());
    for (index, link) in links.into_iter().enumerate() {
        let row = sqlx::query_as::<_, PgCollectionLink>(&format!(
            "INSERT INTO collection_links (id, collection_id, title, url, icon, position) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COLLECTION_LINK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(collection_id)
        .bind(&link.title)
        .bind(&link.url)
        .bind(&link.icon)
        .bind(index as i32)
        .fetch_one(&mut **tx)
        .await?;
        rows.push(CollectionLinkRow::from(row));
    }
    Ok(rows)
}

impl SqlStorage for PgStorage {
    async fn is_connected(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn collections_insert(
        &self,
        input: CollectionCreate,
    ) -> Result<CollectionWithLinks, SqlStorageError> {
        let mut tx = self.pool.begin().await?;

        let collection = sqlx::query_as::<_, PgCollection>(
            "INSERT INTO collections (id, user_id, title, description, category) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, title, description, category, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.category.as_str())
        .fetch_one(&mut *tx)
        .await?
        .into_row()?;

        let links = insert_links(&mut tx, collection.id, input.links).await?;
        tx.commit().await?;

        Ok(CollectionWithLinks { collection, links })
    }

    async fn collections_get(
        &self,
        id: Uuid,
    ) -> Result<Option<CollectionWithLinks>, SqlStorageError> {
        let Some(row) = sqlx::query_as::<_, PgCollection>(
            "SELECT id, user_id, title, description, category, created_at, updated_at \
             FROM collections WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let collection = row.into_row()?;
        let links = links_for_collection(&self.pool, collection.id).await?;
        Ok(Some(CollectionWithLinks { collection, links }))
    }

    async fn collections_list(
        &self,
        params: CollectionsListParams,
    ) -> Result<(Vec<CollectionWithLinks>, i64), SqlStorageError> {
        let category = params.category.map(|c| c.as_str());

        let rows = sqlx::query_as::<_, PgCollection>(
            "SELECT id, user_id, title, description, category, created_at, updated_at \
             FROM collections \
             WHERE ($1::text IS NULL OR category = $1) \
               AND ($2::uuid IS NULL OR user_id = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4",
        )
        .bind(category)
        .bind(params.user_id)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM collections \
             WHERE ($1::text IS NULL OR category = $1) \
               AND ($2::uuid IS NULL OR user_id = $2)",
        )
        .bind(category)
        .bind(params.user_id)
        .fetch_one(&self.pool)
        .await?
        .try_get("count")?;

        let mut collections = Vec::with_capacity(rows.len());
        for row in rows {
            let collection = row.into_row()?;
            let links = links_for_collection(&self.pool, collection.id).await?;
            collections.push(CollectionWithLinks { collection, links });
        }
        Ok((collections, total))
    }

    async fn collections_update_metadata(
        &self,
        id: Uuid,
        user_id: Uuid,
        changes: CollectionUpdate,
    ) -> Result<Option<CollectionRow>, SqlStorageError> {
        let Some(owner) = sqlx::query("SELECT user_id FROM collections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        if owner.try_get::<Uuid, _>("user_id")? != user_id {
            return Err(SqlStorageError::Unauthorized);
        }

        let clear_description = matches!(changes.description, Some(None));
        let new_description = changes.description.flatten();

        let row = sqlx::query_as::<_, PgCollection>(
            "UPDATE collections SET \
               title = COALESCE($2, title), \
               description = CASE WHEN $5 THEN NULL ELSE COALESCE($3, description) END, \
               category = COALESCE($4, category), \
               updated_at = now() \
             WHERE id = $1 \
             RETURNING id, user_id, title, description, category, created_at, updated_at",
        )
        .bind(id)
        .bind(changes.title)
        .bind(new_description)
        .bind(changes.category.map(|c| c.as_str()))
        .bind(clear_description)
        .fetch_one(&self.pool)
        .await?
        .into_row()?;

        Ok(Some(row))
    }

    async fn collections_delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, SqlStorageError> {
        let Some(owner) = sqlx::query("SELECT user_id FROM collections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(false);
        };
        if owner.try_get::<Uuid, _>("user_id")? != user_id {
            return Err(SqlStorageError::Unauthorized);
        }

        // Links and votes go with the collection via ON DELETE CASCADE.
        sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn collection_links_replace_all(
        &self,
        collection_id: Uuid,
        links: Vec<LinkCreate>,
    ) -> Result<Vec<CollectionLinkRow>, SqlStorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM collection_links WHERE collection_id = $1")
            .bind(collection_id)
            .execute(&mut *tx)
            .await?;
        let rows = insert_links(&mut tx, collection_id, links).await?;

        tx.commit().await?;
        Ok(rows)
    }

    async fn collection_link_set_preview(
        &self,
        link_id: Uuid,
        preview_image_url: Option<String>,
        preview_description: Option<String>,
    ) -> Result<(), SqlStorageError> {
        sqlx::query(
            "UPDATE collection_links SET preview_image_url = $2, preview_description = $3 \
             WHERE id = $1",
        )
        .bind(link_id)
        .bind(preview_image_url)
        .bind(preview_description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn vote_get(
        &self,
        collection_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<VoteRow>, SqlStorageError> {
        let row = sqlx::query_as::<_, PgVote>(
            "SELECT collection_id, user_id, direction, created_at FROM collection_votes \
             WHERE collection_id = $1 AND user_id = $2",
        )
        .bind(collection_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(PgVote::into_row).transpose().map_err(Into::into)
    }

    async fn vote_insert(
        &self,
        collection_id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> Result<(), SqlStorageError> {
        sqlx::query(
            "INSERT INTO collection_votes (collection_id, user_id, direction) \
             VALUES ($1, $2, $3)",
        )
        .bind(collection_id)
        .bind(user_id)
        .bind(direction.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn vote_set_direction(
        &self,
        collection_id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> Result<(), SqlStorageError> {
        sqlx::query(
            "UPDATE collection_votes SET direction = $3, created_at = now() \
             WHERE collection_id = $1 AND user_id = $2",
        )
        .bind(collection_id)
        .bind(user_id)
        .bind(direction.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn vote_delete(&self, collection_id: Uuid, user_id: Uuid) -> Result<bool, SqlStorageError> {
        let result = sqlx::query(
            "DELETE FROM collection_votes WHERE collection_id = $1 AND user_id = $2",
        )
        .bind(collection_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn votes_for_collection(
        &self,
        collection_id: Uuid,
    ) -> Result<Vec<VoteRow>, SqlStorageError> {
        let rows = sqlx::query_as::<_, PgVote>(
            "SELECT collection_id, user_id, direction, created_at FROM collection_votes \
             WHERE collection_id = $1",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(PgVote::into_row)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    async fn profile_links_list(&self, user_id: Uuid) -> Result<Vec<ProfileLinkRow>, SqlStorageError> {
        let rows = sqlx::query_as::<_, PgProfileLink>(
            "SELECT id, user_id, title, url, icon, position, is_active FROM profile_links \
             WHERE user_id = $1 ORDER BY position, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ProfileLinkRow::from).collect())
    }

    async fn profile_links_count(&self, user_id: Uuid) -> Result<i64, SqlStorageError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM profile_links WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?
            .try_get("count")?;
        Ok(count)
    }

    async fn profile_link_insert(
        &self,
        input: ProfileLinkCreate,
    ) -> Result<ProfileLinkRow, SqlStorageError> {
        let row = sqlx::query_as::<_, PgProfileLink>(
            "INSERT INTO profile_links (id, user_id, title, url, icon, position, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, user_id, title, url, icon, position, is_active",
        )
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(&input.title)
        .bind(&input.url)
        .bind(&input.icon)
        .bind(input.position)
        .bind(input.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(ProfileLinkRow::from(row))
    }

    async fn profile_links_replace_all(
        &self,
        user_id: Uuid,
        links: Vec<ProfileLinkReplace>,
    ) -> Result<Vec<ProfileLinkRow>, SqlStorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM profile_links WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let mut rows = Vec::with_capacity(links.len());
        for (index, link) in links.into_iter().enumerate() {
            let row = sqlx::query_as::<_, PgProfileLink>(
                "INSERT INTO profile_links (id, user_id, title, url, icon, position, is_active) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 RETURNING id, user_id, title, url, icon, position, is_active",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&link.title)
            .bind(&link.url)
            .bind(&link.icon)
            .bind(index as i32)
            .bind(link.is_active)
            .fetch_one(&mut *tx)
            .await?;
            rows.push(ProfileLinkRow::from(row));
        }

        tx.commit().await?;
        Ok(rows)
    }

    async fn profile_links_set_positions(
        &self,
        user_id: Uuid,
        assignments: Vec<(Uuid, i32)>,
    ) -> Result<(), SqlStorageError> {
        let mut tx = self.pool.begin().await?;
        for (link_id, position) in assignments {
            // A foreign or unknown id matches zero rows and is a no-op.
            sqlx::query(
                "UPDATE profile_links SET position = $3 WHERE id = $1 AND user_id = $2",
            )
            .bind(link_id)
            .bind(user_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn profile_link_set_active(
        &self,
        user_id: Uuid,
        link_id: Uuid,
        is_active: bool,
    ) -> Result<Option<ProfileLinkRow>, SqlStorageError> {
        let row = sqlx::query_as::<_, PgProfileLink>(
            "UPDATE profile_links SET is_active = $3 WHERE id = $1 AND user_id = $2 \
             RETURNING id, user_id, title, url, icon, position, is_active",
        )
        .bind(link_id)
        .bind(user_id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ProfileLinkRow::from))
    }

    async fn profile_link_delete(&self, user_id: Uuid, link_id: Uuid) -> Result<bool, SqlStorageError> {
        let result = sqlx::query("DELETE FROM profile_links WHERE id = $1 AND user_id = $2")
            .bind(link_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
