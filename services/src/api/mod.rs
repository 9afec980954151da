//! HTTP API surface.
//!
//! Collections (with their vote ledger) are public to read; every
//! mutation and the whole /links surface require a session token.

pub mod collections;
pub mod links;
pub mod types;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::AppState;
use crate::database::SqlStorage;

pub fn router<S: SqlStorage>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/collections",
            get(collections::collections_list).post(collections::collections_create),
        )
        .route(
            "/collections/{id}",
            get(collections::collections_get)
                .patch(collections::collections_update)
                .delete(collections::collections_delete),
        )
        .route("/collections/{id}/vote", post(collections::collections_vote))
        .route("/links", get(links::links_list).post(links::links_save))
        .route("/links/add", post(links::links_add))
        .route("/links/reorder", patch(links::links_reorder))
        .route("/links/{id}/active", patch(links::links_set_active))
        .route("/links/{id}", delete(links::links_delete))
}
