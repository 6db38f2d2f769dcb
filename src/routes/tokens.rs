use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// -- Request/Response types --

/// `hash` is the field name older clients send.
#[derive(Deserialize)]
pub struct StoreTokenRequest {
    #[serde(default, alias = "hash")]
    pub key: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Serialize)]
pub struct StoreTokenResponse {
    pub success: bool,
    pub message: String,
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct RetrieveTokenResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/store-token", post(store_token))
        .route("/temp-token/{*key}", get(retrieve_token).delete(discard_token))
}

// -- Handlers --

/// POST /store-token
async fn store_token(
    State(state): State<AppState>,
    payload: Result<Json<StoreTokenRequest>, JsonRejection>,
) -> AppResult<Json<StoreTokenResponse>> {
    let Json(req) = payload?;
    let (Some(key), Some(token)) = (non_empty(req.key), non_empty(req.token)) else {
        return Err(AppError::BadRequest("Missing key or token".into()));
    };

    let record = state.store.put(&key, &token).await?;

    Ok(Json(StoreTokenResponse {
        success: true,
        message: "Token stored".to_string(),
        key: record.key,
        expires_at: record.expires_at,
    }))
}

/// GET /temp-token/{key}
async fn retrieve_token(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<RetrieveTokenResponse>> {
    let record = state.store.get(&key).await?.ok_or(AppError::NotFound)?;

    Ok(Json(RetrieveTokenResponse {
        success: true,
        token: record.token,
        expires_at: record.expires_at,
    }))
}

/// DELETE /temp-token/{key}
async fn discard_token(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<StatusCode> {
    state.store.discard(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
