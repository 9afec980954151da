//! Integration tests for the vote ledger (POST /collections/{id}/vote).

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::{MemStorage, USER_A, USER_B, USER_C, create_test_app, token_for};
use linkgarden_services::database::{Category, CollectionCreate, LinkCreate, SqlStorage};
use linkgarden_services::votes::{self, VoteAction, VoteDirection};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

async fn seed_collection(storage: &MemStorage, owner: Uuid) -> Uuid {
    storage
        .collections_insert(CollectionCreate {
            user_id: owner,
            title: "Rust crates".to_string(),
            description: None,
            category: Category::Tools,
            links: vec![LinkCreate {
                title: "Docs".to_string(),
                url: "https://docs.rs/".to_string(),
                icon: Some("book".to_string()),
            }],
        })
        .await
        .expect("seed collection")
        .collection
        .id
}

async fn cast(app: &Router, collection_id: Uuid, voter: Uuid, vote_type: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/collections/{collection_id}/vote"))
                .header("content-type", "application/json")
                .header("Authorization", format!("Bearer {}", token_for(voter)))
                .body(Body::from(format!(r#"{{"voteType":"{vote_type}"}}"#)))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_same_direction_twice_creates_then_removes() {
    let storage = MemStorage::new();
    let collection_id = seed_collection(&storage, USER_A).await;
    let app = create_test_app(storage).await;

    let (status, json) = cast(&app, collection_id, USER_B, "UP").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["action"], "created");
    assert_eq!(json["collection"]["upvotes"], 1);
    assert_eq!(json["collection"]["score"], 1);
    assert_eq!(json["collection"]["userVote"], "UP");

    let (status, json) = cast(&app, collection_id, USER_B, "UP").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["action"], "removed");
    assert_eq!(json["collection"]["upvotes"], 0);
    assert_eq!(json["collection"]["score"], 0);
    assert_eq!(json["collection"]["userVote"], Value::Null);
}

#[tokio::test]
async fn test_opposite_direction_updates_in_place() {
    let storage = MemStorage::new();
    let collection_id = seed_collection(&storage, USER_A).await;
    let app = create_test_app(storage).await;

    // Seed a positive score so the later downvote is not floor-blocked
    let (_, json) = cast(&app, collection_id, USER_C, "UP").await;
    assert_eq!(json["action"], "created");

    let (_, json) = cast(&app, collection_id, USER_B, "UP").await;
    assert_eq!(json["collection"]["score"], 2);

    let (status, json) = cast(&app, collection_id, USER_B, "DOWN").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["action"], "updated");
    assert_eq!(json["collection"]["upvotes"], 1);
    assert_eq!(json["collection"]["downvotes"], 1);
    assert_eq!(json["collection"]["score"], 0);
    assert_eq!(json["collection"]["userVote"], "DOWN");
}

#[tokio::test]
async fn test_three_voters_tally() {
    let storage = MemStorage::new();
    let collection_id = seed_collection(&storage, USER_A).await;
    let app = create_test_app(storage).await;

    cast(&app, collection_id, USER_A, "UP").await;
    cast(&app, collection_id, USER_B, "UP").await;
    let (_, json) = cast(&app, collection_id, USER_C, "DOWN").await;

    assert_eq!(json["collection"]["upvotes"], 2);
    assert_eq!(json["collection"]["downvotes"], 1);
    assert_eq!(json["collection"]["score"], 1);
}

#[tokio::test]
async fn test_fresh_downvote_blocked_at_zero_score() {
    let storage = MemStorage::new();
    let collection_id = seed_collection(&storage, USER_A).await;
    let app = create_test_app(storage).await;

    let (status, json) = cast(&app, collection_id, USER_B, "DOWN").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");
    assert_eq!(
        json["message"],
        "Downvoting is not available while the score is 0"
    );
}

#[tokio::test]
async fn test_removing_a_downvote_is_allowed_at_zero_score() {
    let storage = MemStorage::new();
    let collection_id = seed_collection(&storage, USER_A).await;
    let app = create_test_app(storage).await;

    cast(&app, collection_id, USER_A, "UP").await;
    let (_, json) = cast(&app, collection_id, USER_B, "DOWN").await;
    assert_eq!(json["action"], "created");
    assert_eq!(json["collection"]["score"], 0);

    // Score is already 0, but this cast removes an existing row
    let (status, json) = cast(&app, collection_id, USER_B, "DOWN").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["action"], "removed");
    assert_eq!(json["collection"]["score"], 1);
}

#[tokio::test]
async fn test_invalid_vote_type_rejected() {
    let storage = MemStorage::new();
    let collection_id = seed_collection(&storage, USER_A).await;
    let app = create_test_app(storage).await;

    let (status, json) = cast(&app, collection_id, USER_B, "SIDEWAYS").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid vote type. Must be UP or DOWN");
}

#[tokio::test]
async fn test_vote_on_unknown_collection_is_404() {
    let app = create_test_app(MemStorage::new()).await;

    let (status, json) = cast(&app, Uuid::new_v4(), USER_B, "UP").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_vote_without_auth_is_401() {
    let storage = MemStorage::new();
    let collection_id = seed_collection(&storage, USER_A).await;
    let app = create_test_app(storage).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/collections/{collection_id}/vote"))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"voteType":"UP"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_concurrent_distinct_voters_each_land_one_row() {
    let storage = MemStorage::new();
    let collection_id = seed_collection(&storage, USER_A).await;

    let (a, b) = tokio::join!(
        votes::cast_vote(&storage, collection_id, USER_B, VoteDirection::Up),
        votes::cast_vote(&storage, collection_id, USER_C, VoteDirection::Up),
    );
    assert_eq!(a.unwrap(), VoteAction::Created);
    assert_eq!(b.unwrap(), VoteAction::Created);

    let rows = storage.votes_for_collection(collection_id).await.unwrap();
    assert_eq!(rows.len(), 2);
}
