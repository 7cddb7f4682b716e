use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::put;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::{authorize, Role};
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers/me/fcm-token", put(set_driver_fcm_token))
        .route("/drivers/me/online", put(set_driver_online))
        .route("/customers/me/fcm-token", put(set_customer_fcm_token))
}

#[derive(Deserialize)]
pub struct FcmTokenRequest {
    pub fcm_token: String,
}

#[derive(Deserialize)]
pub struct OnlineRequest {
    pub is_online: bool,
}

#[derive(Serialize)]
pub struct UpdatedResponse {
    pub updated: bool,
}

async fn set_driver_fcm_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<FcmTokenRequest>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Driver)?;

    if payload.fcm_token.trim().is_empty() {
        return Err(AppError::Validation("fcm_token cannot be empty".to_string()));
    }

    state
        .store
        .set_driver_fcm_token(identity.user_id, payload.fcm_token)
        .await?;

    Ok(Json(UpdatedResponse { updated: true }))
}

async fn set_driver_online(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<OnlineRequest>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Driver)?;

    state
        .store
        .set_driver_online(identity.user_id, payload.is_online)
        .await?;

    Ok(Json(UpdatedResponse { updated: true }))
}

async fn set_customer_fcm_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<FcmTokenRequest>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Customer)?;

    if payload.fcm_token.trim().is_empty() {
        return Err(AppError::Validation("fcm_token cannot be empty".to_string()));
    }

    state
        .store
        .set_customer_fcm_token(identity.user_id, payload.fcm_token)
        .await?;

    Ok(Json(UpdatedResponse { updated: true }))
}
