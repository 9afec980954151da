use axum::{
    Router,
    extract::{Extension, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{any, get},
};
use linkgarden_utils::version_info::{RuntimeEnv, format_version_for_runtime_env};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::database::SqlStorage;
use crate::preview::EnrichmentQueue;

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod ordering;
pub mod postgres;
pub mod preview;
pub mod storage;
pub mod votes;

/// Shared handler state: the SQL seam plus the enrichment queue that
/// handlers push preview jobs onto.
#[derive(Clone)]
pub struct AppState<S: SqlStorage> {
    pub sql_storage: S,
    pub enrichment: EnrichmentQueue,
}

impl<S: SqlStorage> AppState<S> {
    pub fn new(sql_storage: S, enrichment: EnrichmentQueue) -> Self {
        Self {
            sql_storage,
            enrichment,
        }
    }
}

pub async fn routes<S>(sql_storage: S, enrichment: EnrichmentQueue, config: Config) -> Router
where
    S: SqlStorage,
{
    let state = AppState::new(sql_storage, enrichment);

    Router::new()
        .route("/is-health", get(health_check::<S>))
        .merge(api::router::<S>())
        .fallback(any(catch_all))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    http_request.method = ?request.method(),
                    http_request.uri = ?request.uri(),
                    http_request.version = ?request.version(),
                    http_request.user_agent = ?request.headers().get(axum::http::header::USER_AGENT),
                )
            }),
        )
        .layer(Extension(config))
        .with_state(state)
}

async fn health_check<S>(
    State(state): State<AppState<S>>,
    Extension(config): Extension<Config>,
) -> impl IntoResponse
where
    S: SqlStorage,
{
    let mut response = if state.sql_storage.is_connected().await {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::BAD_GATEWAY, "502").into_response()
    };

    let env_value = config.environment().to_string();
    response.headers_mut().insert(
        HeaderName::from_static("x-service-env"),
        HeaderValue::from_str(&env_value).expect("environment header is valid ASCII"),
    );

    let runtime_env: RuntimeEnv = config.environment().into();
    let version_value = format_version_for_runtime_env(runtime_env);
    response.headers_mut().insert(
        HeaderName::from_static("x-service-version"),
        HeaderValue::from_str(&version_value).expect("version header is valid ASCII"),
    );

    response
}

async fn catch_all() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
