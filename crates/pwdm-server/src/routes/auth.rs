//! Identity bootstrap: `Create` registers an account, `Enter` logs in.
//!
//! Both return a fresh bearer token and run without one.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ApiJson;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Register a new account and log it in.
pub async fn create(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CredentialsRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if body.login.is_empty() {
        return Err(AppError::BadRequest("login must not be empty".to_owned()));
    }

    let subject = state
        .storage
        .create_user(&body.login, &body.password)
        .await?;
    let token = state.tokens.issue(subject)?;

    info!(%subject, "account created");
    Ok(Json(TokenResponse { token }))
}

/// Check a login/password pair and issue a token for it.
pub async fn enter(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CredentialsRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    state
        .storage
        .validate_user(&body.login, &body.password)
        .await?;
    let subject = state.storage.subject_id(&body.login).await?;
    let token = state.tokens.issue(subject)?;

    info!(%subject, "session opened");
    Ok(Json(TokenResponse { token }))
}
