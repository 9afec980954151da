//! /links endpoint handlers (the authenticated user's profile links).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use linkgarden_utils::sanitize::{
    MAX_LINK_TITLE_LEN, SanitizeError, sanitize_title, sanitize_url,
};
use uuid::Uuid;

use crate::AppState;
use crate::auth::RequireAuth;
use crate::database::{ProfileLinkReplace, SqlStorage};
use crate::ordering::{self, ProfileLinkDraft};

use super::types::{
    ApiErrorResponse, ProfileLinkAddRequest, ProfileLinkItem, ProfileLinksResponse,
    ProfileLinksSaveRequest, ReorderRequest, SetActiveRequest,
};

fn bad_request(e: SanitizeError) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiErrorResponse::bad_request(e.to_string())),
    )
        .into_response()
}

pub async fn links_list<S: SqlStorage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
) -> impl IntoResponse {
    match state.sql_storage.profile_links_list(auth.user_id()).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(ProfileLinksResponse {
                links: rows.into_iter().map(ProfileLinkItem::from).collect(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to list profile links: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to list links")),
            )
                .into_response()
        }
    }
}

/// Bulk save: replace the user's whole link list, position = array
/// index. Links missing from the payload are gone afterwards.
pub async fn links_save<S: SqlStorage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Json(body): Json<ProfileLinksSaveRequest>,
) -> impl IntoResponse {
    let mut replacements = Vec::with_capacity(body.links.len());
    for link in body.links {
        let title = match sanitize_title(&link.title, MAX_LINK_TITLE_LEN) {
            Ok(title) => title,
            Err(e) => return bad_request(e),
        };
        let url = match sanitize_url(&link.url) {
            Ok(url) => url,
            Err(e) => return bad_request(e),
        };
        replacements.push(ProfileLinkReplace {
            title,
            url,
            icon: link.icon,
            is_active: link.is_active,
        });
    }

    match state
        .sql_storage
        .profile_links_replace_all(auth.user_id(), replacements)
        .await
    {
        Ok(rows) => (
            StatusCode::OK,
            Json(ProfileLinksResponse {
                links: rows.into_iter().map(ProfileLinkItem::from).collect(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to save profile links: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to save links")),
            )
                .into_response()
        }
    }
}

/// Append one link at the end of the user's list, active by default.
pub async fn links_add<S: SqlStorage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Json(body): Json<ProfileLinkAddRequest>,
) -> impl IntoResponse {
    let title = match sanitize_title(&body.title, MAX_LINK_TITLE_LEN) {
        Ok(title) => title,
        Err(e) => return bad_request(e),
    };
    let url = match sanitize_url(&body.url) {
        Ok(url) => url,
        Err(e) => return bad_request(e),
    };

    let draft = ProfileLinkDraft {
        title,
        url,
        icon: body.icon,
    };

    match ordering::append_profile_link(&state.sql_storage, auth.user_id(), draft).await {
        Ok(row) => (StatusCode::CREATED, Json(ProfileLinkItem::from(row))).into_response(),
        Err(e) => {
            tracing::error!("Failed to add profile link: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to add link")),
            )
                .into_response()
        }
    }
}

/// Apply a caller-supplied complete ordering. Ids that are not the
/// user's links are skipped; omitted links keep their old position.
pub async fn links_reorder<S: SqlStorage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Json(body): Json<ReorderRequest>,
) -> impl IntoResponse {
    if let Err(e) =
        ordering::reorder_profile_links(&state.sql_storage, auth.user_id(), &body.ordered_ids)
            .await
    {
        tracing::error!("Failed to reorder profile links: {e}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiErrorResponse::internal_error("Failed to reorder links")),
        )
            .into_response();
    }

    match state.sql_storage.profile_links_list(auth.user_id()).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(ProfileLinksResponse {
                links: rows.into_iter().map(ProfileLinkItem::from).collect(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to list profile links: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to reorder links")),
            )
                .into_response()
        }
    }
}

pub async fn links_set_active<S: SqlStorage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<SetActiveRequest>,
) -> impl IntoResponse {
    match state
        .sql_storage
        .profile_link_set_active(auth.user_id(), id, body.is_active)
        .await
    {
        Ok(Some(row)) => (StatusCode::OK, Json(ProfileLinkItem::from(row))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiErrorResponse::not_found("Link not found")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to toggle profile link: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to update link")),
            )
                .into_response()
        }
    }
}

/// Delete one link. Siblings keep their positions; the gap heals on
/// the next bulk save or reorder.
pub async fn links_delete<S: SqlStorage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.sql_storage.profile_link_delete(auth.user_id(), id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiErrorResponse::not_found("Link not found")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to delete profile link: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse::internal_error("Failed to delete link")),
            )
                .into_response()
        }
    }
}
