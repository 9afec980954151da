//! Wire types shared by the API handlers. All JSON fields are
//! camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::database::{Category, CollectionLinkRow, CollectionWithLinks, ProfileLinkRow};
use crate::votes::{VoteAction, VoteDirection, VoteTally};

/// Generic error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
}

impl ApiErrorResponse {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            error: "not_found".to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: "bad_request".to_string(),
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            error: "internal_error".to_string(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            error: "forbidden".to_string(),
            message: message.into(),
        }
    }
}

//
// Collections
//

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionLinkItem {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub position: i32,
    pub preview_image_url: Option<String>,
    pub preview_description: Option<String>,
}

impl From<CollectionLinkRow> for CollectionLinkItem {
    fn from(row: CollectionLinkRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            url: row.url,
            icon: row.icon,
            position: row.position,
            preview_image_url: row.preview_image_url,
            preview_description: row.preview_description,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub links: Vec<CollectionLinkItem>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    /// The viewer's own vote ("UP"/"DOWN"), absent for anonymous
    /// viewers and non-voters.
    pub user_vote: Option<VoteDirection>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CollectionItem {
    pub fn build(
        cwl: CollectionWithLinks,
        tally: VoteTally,
        user_vote: Option<VoteDirection>,
    ) -> Self {
        let CollectionWithLinks { collection, links } = cwl;
        Self {
            id: collection.id,
            user_id: collection.user_id,
            title: collection.title,
            description: collection.description,
            category: collection.category,
            links: links.into_iter().map(CollectionLinkItem::from).collect(),
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            score: tally.score(),
            user_vote,
            created_at: collection.created_at,
            updated_at: collection.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkPayload {
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionCreateRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<Category>,
    #[serde(default)]
    pub links: Vec<LinkPayload>,
}

/// PATCH body. Absent fields are left unchanged; `description: null`
/// clears the description; a `links` array replaces the whole link
/// set.
#[derive(Debug, Default, Deserialize)]
pub struct CollectionUpdateRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub category: Option<Category>,
    pub links: Option<Vec<LinkPayload>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsListQuery {
    pub category: Option<String>,
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionResponse {
    pub collection: CollectionItem,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionsListResponse {
    pub collections: Vec<CollectionItem>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub vote_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub success: bool,
    pub action: VoteAction,
    pub collection: CollectionItem,
}

//
// Profile links
//

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileLinkItem {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub position: i32,
    pub is_active: bool,
}

impl From<ProfileLinkRow> for ProfileLinkItem {
    fn from(row: ProfileLinkRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            url: row.url,
            icon: row.icon,
            position: row.position,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileLinksResponse {
    pub links: Vec<ProfileLinkItem>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileLinkPayload {
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProfileLinksSaveRequest {
    pub links: Vec<ProfileLinkPayload>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileLinkAddRequest {
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub ordered_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Distinguish "field absent" from "field: null" in PATCH bodies.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
