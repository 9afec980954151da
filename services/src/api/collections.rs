//! /collections endpoint handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use linkgarden_utils::sanitize::{
    MAX_COLLECTION_TITLE_LEN, MAX_LINK_TITLE_LEN, SanitizeError, sanitize_description,
    sanitize_title, sanitize_url,
};
use uuid::Uuid;

use crate::AppState;
use crate::auth::{OptionalAuth, RequireAuth};
use crate::database::{
    Category, CollectionCreate, CollectionUpdate, CollectionWithLinks, CollectionsListParams,
    LinkCreate, SqlStorage, SqlStorageError,
};
use crate::preview::EnrichmentJob;
use crate::votes::{self, VoteDirection, VoteError, VoteTally};

use super::types::{
    ApiErrorResponse, CollectionCreateRequest, CollectionItem, CollectionResponse,
    CollectionUpdateRequest,
    CollectionsListQuery, CollectionsListResponse, LinkPayload, VoteRequest, VoteResponse,
};

/// Build the wire view of a collection: links plus the vote tally and
/// the viewer's own vote.
async fn present<S: SqlStorage>(
    storage: &S,
    cwl: CollectionWithLinks,
    viewer: Option<Uuid>,
) -> Result<CollectionItem, SqlStorageError> {
    let rows = storage.votes_for_collection(cwl.collection.id).await?;
    let user_vote = viewer.and_then(|id| votes::viewer_vote(&rows, id));
    Ok(CollectionItem::build(
        cwl,
        VoteTally::from_rows(&rows),
        user_vote,
    ))
}

fn sanitize_links(payloads: Vec<LinkPayload>) -> Result<Vec<LinkCreate>, SanitizeError> {
    payloads
        .into_iter()
        .map(|link| {
            Ok(LinkCreate {
                title: sanitize_title(&link.title, MAX_LINK_TITLE_LEN)?,
                url: sanitize_url(&link.url)?,
                icon: link.icon,
            })
        })
        .collect()
}

/// Queue preview enrichment for freshly written links that have no
/// user-supplied icon.
fn enqueue_enrichment<S: SqlStorage>(
    state: &AppState<S>,
    links: &[crate::database::CollectionLinkRow],
) {
    for link in links.iter().filter(|l| l.icon.is_none()) {
        state.enrichment.enqueue(EnrichmentJob {
            link_id: link.id,
            url: link.url.clone(),
        });
    }
}

pub async fn collections_list<S: SqlStorage>(
    State(state): State<AppState<S>>,
    OptionalAuth(viewer): OptionalAuth,
    Query(query): Query<CollectionsListQuery>,
) -> impl IntoResponse {
    let category = match query.category.as_deref() {
        None => None,
        Some(raw) => match Category::parse(raw) {
            Some(category) => Some(category),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiErrorResponse::bad_request("Invalid category")),
                )
                    .into_response();
            }
        },
    };

    let params = CollectionsListParams {
        category,
        user_id: query.user_id,
        limit: query.limit.unwrap_or(20).clamp(1, 100),
        offset: query.offset.unwrap_or(0).max(0),
    };

    let (rows, total) = match state.sql_storage.collections_list(params).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Failed to list collections: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to list collections")),
            )
                .into_response();
        }
    };

    let mut collections = Vec::with_capacity(rows.len());
    for cwl in rows {
        match present(&state.sql_storage, cwl, viewer).await {
            Ok(item) => collections.push(item),
            Err(e) => {
                tracing::error!("Failed to tally collection votes: {e}");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiErrorResponse::internal_error("Failed to list collections")),
                )
                    .into_response();
            }
        }
    }

    (
        StatusCode::OK,
        Json(CollectionsListResponse { collections, total }),
    )
        .into_response()
}

pub async fn collections_create<S: SqlStorage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Json(body): Json<CollectionCreateRequest>,
) -> impl IntoResponse {
    let title = match sanitize_title(&body.title, MAX_COLLECTION_TITLE_LEN) {
        Ok(title) => title,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiErrorResponse::bad_request(e.to_string())),
            )
                .into_response();
        }
    };
    let description = match body.description.as_deref().map(sanitize_description) {
        None => None,
        Some(Ok(description)) => description,
        Some(Err(e)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiErrorResponse::bad_request(e.to_string())),
            )
                .into_response();
        }
    };
    if body.links.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiErrorResponse::bad_request("At least one link is required")),
        )
            .into_response();
    }
    let links = match sanitize_links(body.links) {
        Ok(links) => links,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiErrorResponse::bad_request(e.to_string())),
            )
                .into_response();
        }
    };

    let input = CollectionCreate {
        user_id: auth.user_id(),
        title,
        description,
        category: body.category.unwrap_or_default(),
        links,
    };

    match state.sql_storage.collections_insert(input).await {
        Ok(cwl) => {
            enqueue_enrichment(&state, &cwl.links);
            match present(&state.sql_storage, cwl, Some(auth.user_id())).await {
                Ok(collection) => (
                    StatusCode::CREATED,
                    Json(CollectionResponse { collection }),
                )
                    .into_response(),
                Err(e) => {
                    tracing::error!("Failed to tally collection votes: {e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ApiErrorResponse::internal_error("Failed to create collection")),
                    )
                        .into_response()
                }
            }
        }
        Err(e) => {
            tracing::error!("Failed to create collection: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to create collection")),
            )
                .into_response()
        }
    }
}

pub async fn collections_get<S: SqlStorage>(
    State(state): State<AppState<S>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.sql_storage.collections_get(id).await {
        Ok(Some(cwl)) => match present(&state.sql_storage, cwl, viewer).await {
            Ok(collection) => Json(CollectionResponse { collection }).into_response(),
            Err(e) => {
                tracing::error!("Failed to tally collection votes: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiErrorResponse::internal_error("Failed to load collection")),
                )
                    .into_response()
            }
        },
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiErrorResponse::not_found("Collection not found")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to load collection: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to load collection")),
            )
                .into_response()
        }
    }
}

pub async fn collections_update<S: SqlStorage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<CollectionUpdateRequest>,
) -> impl IntoResponse {
    let title = match body.title.as_deref() {
        None => None,
        Some(raw) => match sanitize_title(raw, MAX_COLLECTION_TITLE_LEN) {
            Ok(title) => Some(title),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiErrorResponse::bad_request(e.to_string())),
                )
                    .into_response();
            }
        },
    };
    let description = match body.description {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) => match sanitize_description(&raw) {
            Ok(description) => Some(description),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiErrorResponse::bad_request(e.to_string())),
                )
                    .into_response();
            }
        },
    };
    let links = match body.links {
        None => None,
        Some(payloads) => match sanitize_links(payloads) {
            Ok(links) => Some(links),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiErrorResponse::bad_request(e.to_string())),
                )
                    .into_response();
            }
        },
    };

    let changes = CollectionUpdate {
        title,
        description,
        category: body.category,
    };

    // Metadata first; the ownership check gates the link replace too.
    match state
        .sql_storage
        .collections_update_metadata(id, auth.user_id(), changes)
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiErrorResponse::not_found("Collection not found")),
            )
                .into_response();
        }
        Err(SqlStorageError::Unauthorized) => {
            return (
                StatusCode::FORBIDDEN,
                Json(ApiErrorResponse::forbidden("Not the collection owner")),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Failed to update collection: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to update collection")),
            )
                .into_response();
        }
    }

    if let Some(links) = links {
        match state.sql_storage.collection_links_replace_all(id, links).await {
            Ok(rows) => enqueue_enrichment(&state, &rows),
            Err(e) => {
                tracing::error!("Failed to replace collection links: {e}");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiErrorResponse::internal_error("Failed to update collection")),
                )
                    .into_response();
            }
        }
    }

    match state.sql_storage.collections_get(id).await {
        Ok(Some(cwl)) => match present(&state.sql_storage, cwl, Some(auth.user_id())).await {
            Ok(collection) => Json(CollectionResponse { collection }).into_response(),
            Err(e) => {
                tracing::error!("Failed to tally collection votes: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiErrorResponse::internal_error("Failed to update collection")),
                )
                    .into_response()
            }
        },
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiErrorResponse::not_found("Collection not found")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to reload collection: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to update collection")),
            )
                .into_response()
        }
    }
}

pub async fn collections_delete<S: SqlStorage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.sql_storage.collections_delete(id, auth.user_id()).await {
        Ok(true) => Json(serde_json::json!({ "success": true })).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiErrorResponse::not_found("Collection not found")),
        )
            .into_response(),
        Err(SqlStorageError::Unauthorized) => (
            StatusCode::FORBIDDEN,
            Json(ApiErrorResponse::forbidden("Not the collection owner")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to delete collection: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to delete collection")),
            )
                .into_response()
        }
    }
}

pub async fn collections_vote<S: SqlStorage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<VoteRequest>,
) -> impl IntoResponse {
    let Some(direction) = VoteDirection::parse(&body.vote_type) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiErrorResponse::bad_request(
                "Invalid vote type. Must be UP or DOWN",
            )),
        )
            .into_response();
    };

    // Voting on a missing collection is a 404, not an orphan ledger row.
    match state.sql_storage.collections_get(id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiErrorResponse::not_found("Collection not found")),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Failed to load collection: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to record vote")),
            )
                .into_response();
        }
    }

    let action = match votes::cast_vote(&state.sql_storage, id, auth.user_id(), direction).await {
        Ok(action) => action,
        Err(VoteError::ScoreFloor) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiErrorResponse::bad_request(
                    VoteError::ScoreFloor.to_string(),
                )),
            )
                .into_response();
        }
        Err(VoteError::Storage(e)) => {
            tracing::error!("Failed to record vote: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to record vote")),
            )
                .into_response();
        }
    };

    match state.sql_storage.collections_get(id).await {
        Ok(Some(cwl)) => match present(&state.sql_storage, cwl, Some(auth.user_id())).await {
            Ok(collection) => (
                StatusCode::OK,
                Json(VoteResponse {
                    success: true,
                    action,
                    collection,
                }),
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Failed to tally collection votes: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiErrorResponse::internal_error("Failed to record vote")),
                )
                    .into_response()
            }
        },
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiErrorResponse::not_found("Collection not found")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to reload collection: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to record vote")),
            )
                .into_response()
        }
    }
}
