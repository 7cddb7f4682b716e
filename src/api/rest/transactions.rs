use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{authorize, Role};
use crate::error::AppError;
use crate::ids;
use crate::models::fees::Money;
use crate::models::transaction::{
    DriverTransaction, TopUp, TransactionKind, TransactionStatus,
};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/transactions/cash-in", post(request_cash_in))
        .route("/transactions/cash-in/resolve", post(resolve_cash_in))
}

#[derive(Deserialize)]
pub struct CashInRequest {
    pub payment_method: String,
    #[serde(default)]
    pub receipt_photo_url: Option<String>,
}

#[derive(Deserialize)]
pub struct ResolveCashInRequest {
    pub driver_transaction_id: Uuid,
    pub amount: Money,
    pub accepted: bool,
}

async fn request_cash_in(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CashInRequest>,
) -> Result<Json<DriverTransaction>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Driver)?;

    if payload.payment_method.trim().is_empty() {
        return Err(AppError::Validation(
            "payment_method cannot be empty".to_string(),
        ));
    }

    state
        .store
        .get_driver(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", identity.user_id)))?;

    let transaction = DriverTransaction {
        id: Uuid::new_v4(),
        driver_id: identity.user_id,
        number: ids::transaction_number(),
        kind: TransactionKind::CashIn,
        amount: None,
        status: TransactionStatus::Pending,
        created_at: Utc::now(),
    };
    let top_up = TopUp {
        driver_transaction_id: transaction.id,
        payment_method: payload.payment_method,
        receipt_photo_url: payload.receipt_photo_url,
        approved_admin_id: None,
    };

    let transaction = state.store.create_cash_in(transaction, top_up).await?;
    Ok(Json(transaction))
}

async fn resolve_cash_in(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ResolveCashInRequest>,
) -> Result<Json<DriverTransaction>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Admin)?;

    if payload.amount <= 0 {
        return Err(AppError::Validation("amount must be positive".to_string()));
    }

    let resolved = state
        .store
        .resolve_cash_in(
            payload.driver_transaction_id,
            identity.user_id,
            payload.accepted,
            payload.amount,
        )
        .await?;

    Ok(Json(resolved))
}
