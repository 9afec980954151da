//! Session-JWT authentication for protected routes.
//!
//! Login itself happens in the external auth layer; what reaches this
//! service is an HS256 session token whose `sub` claim carries the
//! user's UUID. The `RequireAuth` extractor validates the token from
//! `Authorization: Bearer <token>` and hands the user id to handlers.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim stamped on every session token.
pub const ISSUER: &str = "linkgarden";

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The authenticated user's UUID.
    pub sub: String,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiration (unix seconds).
    pub exp: i64,
    /// Issuer, always [`ISSUER`].
    pub iss: String,
}

/// Authenticated user context extracted from a valid session JWT.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    user_id: Uuid,
    claims: SessionClaims,
}

impl RequireAuth {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }
}

/// Mint a session token for a user id, valid for `ttl_secs`.
///
/// Production tokens come from the auth layer; this helper exists for
/// local tooling and tests.
pub fn generate_session_token(
    user_id: Uuid,
    jwt_secret: &str,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_secs,
        iss: ISSUER.to_owned(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
}

/// Error type for session authentication failures (401).
#[derive(Debug, Serialize)]
pub struct SessionAuthError {
    pub error: String,
    pub message: String,
}

impl SessionAuthError {
    fn missing_token() -> Self {
        Self {
            error: "missing_token".to_owned(),
            message: "Authorization header with Bearer token is required".to_owned(),
        }
    }

    fn invalid_format() -> Self {
        Self {
            error: "invalid_format".to_owned(),
            message: "Authorization header must be in format: Bearer <token>".to_owned(),
        }
    }

    fn invalid_token(reason: impl Into<String>) -> Self {
        Self {
            error: "invalid_token".to_owned(),
            message: reason.into(),
        }
    }

    fn missing_config() -> Self {
        Self {
            error: "server_error".to_owned(),
            message: "Server configuration error".to_owned(),
        }
    }
}

impl IntoResponse for SessionAuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let header_value = headers.get(AUTHORIZATION)?;
    let header_str = header_value.to_str().ok()?;

    let stripped = header_str.strip_prefix("Bearer ")?;
    if stripped.is_empty() {
        return None;
    }
    Some(stripped)
}

fn validate_session_token(token: &str, jwt_secret: &str) -> Result<SessionClaims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Token has expired".to_owned(),
        jsonwebtoken::errors::ErrorKind::InvalidSignature => "Invalid token signature".to_owned(),
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => "Invalid token issuer".to_owned(),
        _ => format!("Token validation failed: {e}"),
    })?;

    Ok(token_data.claims)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = SessionAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // JWT secret comes in via the Config extension layer
        let config = parts
            .extensions
            .get::<crate::config::Config>()
            .ok_or_else(SessionAuthError::missing_config)?;

        let jwt_secret = config.jwt_secret();

        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            if parts.headers.get(AUTHORIZATION).is_some() {
                SessionAuthError::invalid_format()
            } else {
                SessionAuthError::missing_token()
            }
        })?;

        let claims =
            validate_session_token(token, jwt_secret).map_err(SessionAuthError::invalid_token)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| SessionAuthError::invalid_token("Token subject is not a user id"))?;

        Ok(RequireAuth { user_id, claims })
    }
}

/// Viewer identity on public routes: a valid token personalizes the
/// response, anything else (absent, malformed, expired) reads as an
/// anonymous visitor rather than a 401.
#[derive(Debug, Clone, Copy)]
pub struct OptionalAuth(pub Option<Uuid>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let viewer = parts
            .extensions
            .get::<crate::config::Config>()
            .and_then(|config| {
                let token = extract_bearer_token(&parts.headers)?;
                let claims = validate_session_token(token, config.jwt_secret()).ok()?;
                Uuid::parse_str(&claims.sub).ok()
            });
        Ok(OptionalAuth(viewer))
    }
}
