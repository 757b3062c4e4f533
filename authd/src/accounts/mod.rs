// accounts — registration, login, and token issuance.
//
// Passwords are stored as Argon2id PHC strings; tokens are HS256 bearer
// tokens minted through the shared taskcast_claims codec. This service
// never verifies tokens — that is the task daemon's half of the contract.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Duration;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::AppContext;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("already exists")]
    Conflict,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict => (StatusCode::CONFLICT, "already exists".to_string()),
            Self::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid credentials".to_string())
            }
            Self::Internal(e) => {
                error!(err = %e, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ─── Password hashing ─────────────────────────────────────────────────────────

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AccountError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub email: String,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub provider: Option<String>,
}

fn required(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.is_empty())
}

fn issue_token(ctx: &AppContext, username: &str, email: &str, provider: &str) -> Result<String, AccountError> {
    taskcast_claims::issue(
        username,
        email,
        provider,
        ctx.config.jwt_secret.as_bytes(),
        ctx.config.algorithm,
        Duration::hours(ctx.config.token_ttl_hours),
    )
    .map_err(|e| AccountError::Internal(anyhow::anyhow!("token signing failed: {e}")))
}

pub async fn register(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<Value>, AccountError> {
    let (Some(username), Some(password)) = (required(body.username), required(body.password))
    else {
        return Err(AccountError::Validation(
            "username and password are required".to_string(),
        ));
    };
    let provider = body.provider.unwrap_or_else(|| "local".to_string());

    if ctx.storage.find_user(&username).await?.is_some() {
        return Err(AccountError::Conflict);
    }

    let password_hash = hash_password(&password)?;
    let user = ctx
        .storage
        .create_user(&username, &password_hash, &body.email)
        .await?;
    info!(username = %user.username, "user registered");

    let token = issue_token(&ctx, &user.username, &user.email, &provider)?;
    Ok(Json(json!({
        "access_token": token,
        "username": user.username,
        "provider": provider,
    })))
}

pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, AccountError> {
    let (Some(username), Some(password)) = (required(body.username), required(body.password))
    else {
        return Err(AccountError::InvalidCredentials);
    };
    let provider = body.provider.unwrap_or_else(|| "local".to_string());

    let user = ctx.storage.find_user(&username).await?;
    let Some(user) = user.filter(|u| verify_password(&password, &u.password_hash)) else {
        info!(username = %username, "login rejected");
        return Err(AccountError::InvalidCredentials);
    };

    let token = issue_token(&ctx, &user.username, &user.email, &provider)?;
    Ok(Json(json!({
        "access_token": token,
        "username": user.username,
        "provider": provider,
    })))
}
