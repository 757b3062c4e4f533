// auth — bearer-token gate in front of every mutating operation.
//
// Reads are public; create/update/delete must present a currently-valid
// signed token. Any valid token is sufficient — there is no per-record
// ownership model.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::AppContext;
use taskcast_claims::Claims;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Authorization header was present but not `Bearer <token>`.
    #[error("invalid authorization header")]
    BadHeader,
    /// Token failed to decode (malformed, bad signature, or expired).
    #[error("invalid token")]
    InvalidToken,
    /// A mutating operation was attempted without credentials.
    #[error("authentication required")]
    Unauthenticated,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Pull the token out of an `Authorization` header value.
///
/// A missing header is anonymous (`Ok(None)`), not an error. A header that
/// is present but not of the form `Bearer <token>` is rejected.
pub fn extract_bearer(header_value: Option<&str>) -> Result<Option<&str>, AuthError> {
    let Some(value) = header_value else {
        return Ok(None);
    };
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok(Some(token))
        }
        _ => Err(AuthError::BadHeader),
    }
}

/// Verify a bearer token against the shared secret. Every decode failure
/// collapses to `InvalidToken` — the caller gets a 401 either way, and the
/// precise reason is only interesting in the logs.
pub fn authenticate(
    token: &str,
    secret: &[u8],
    algorithm: taskcast_claims::Algorithm,
) -> Result<Claims, AuthError> {
    taskcast_claims::decode(token, secret, algorithm).map_err(|e| {
        debug!(reason = %e, "token rejected");
        AuthError::InvalidToken
    })
}

/// Gate for mutating operations: anonymous callers are turned away.
pub fn require_auth(claims: Option<&Claims>) -> Result<&Claims, AuthError> {
    claims.ok_or(AuthError::Unauthenticated)
}

/// Extractor yielding the request's validated claims, or `None` for
/// anonymous requests. Mutating routes hand the result to the pipeline,
/// which runs it through [`require_auth`]; the read path never constructs
/// this at all.
pub struct OptionalClaims(pub Option<Claims>);

impl OptionalClaims {
    pub fn claims(&self) -> Option<&Claims> {
        self.0.as_ref()
    }
}

impl FromRequestParts<Arc<AppContext>> for OptionalClaims {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = match parts.headers.get(header::AUTHORIZATION) {
            None => None,
            Some(v) => Some(v.to_str().map_err(|_| AuthError::BadHeader)?),
        };
        let Some(token) = extract_bearer(header_value)? else {
            return Ok(Self(None));
        };
        let claims = authenticate(
            token,
            ctx.config.jwt_secret.as_bytes(),
            ctx.config.algorithm,
        )?;
        Ok(Self(Some(claims)))
    }
}
