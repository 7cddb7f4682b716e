use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{post, put};
use axum::Json;
use axum::Router;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{authorize, Role};
use crate::error::AppError;
use crate::models::customer::{Customer, NewCustomer};
use crate::models::driver::{Driver, NewDriver};
use crate::models::fees::{CommissionRateType, FeeConfig, Money, TimeWindow};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/drivers", post(create_driver))
        .route("/admin/customers", post(create_customer))
        .route("/admin/fee-config", put(upsert_fee_config))
}

#[derive(Deserialize)]
pub struct TimeWindowRequest {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub fee_delta: Money,
}

#[derive(Deserialize)]
pub struct FeeConfigRequest {
    pub initial_fee: Money,
    pub distance_fee_per_km: Money,
    pub waiting_fee_per_minute: Money,
    pub free_waiting_minute: i64,
    pub commission_rate: f64,
    pub commission_rate_type: CommissionRateType,
    #[serde(default)]
    pub platform_fee: Money,
    #[serde(default)]
    pub insurance_fee: Money,
    #[serde(default)]
    pub time_windows: Vec<TimeWindowRequest>,
}

#[derive(Serialize)]
pub struct FeeConfigResponse {
    pub config: FeeConfig,
    pub time_windows: Vec<TimeWindow>,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<NewDriver>,
) -> Result<Json<Driver>, AppError> {
    authorize(state.verifier.as_ref(), &headers, Role::Admin)?;

    let driver = Driver::provision(payload)?;
    let driver = state.store.create_driver(driver).await?;

    Ok(Json(driver))
}

async fn create_customer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<NewCustomer>,
) -> Result<Json<Customer>, AppError> {
    authorize(state.verifier.as_ref(), &headers, Role::Admin)?;

    let customer = Customer::provision(payload)?;
    let customer = state.store.create_customer(customer).await?;

    Ok(Json(customer))
}

async fn upsert_fee_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<FeeConfigRequest>,
) -> Result<Json<FeeConfigResponse>, AppError> {
    authorize(state.verifier.as_ref(), &headers, Role::Admin)?;

    validate_fee_config(&payload)?;

    let config = FeeConfig {
        id: Uuid::new_v4(),
        initial_fee: payload.initial_fee,
        distance_fee_per_km: payload.distance_fee_per_km,
        waiting_fee_per_minute: payload.waiting_fee_per_minute,
        free_waiting_minute: payload.free_waiting_minute,
        commission_rate: payload.commission_rate,
        commission_rate_type: payload.commission_rate_type,
        platform_fee: payload.platform_fee,
        insurance_fee: payload.insurance_fee,
    };

    let time_windows: Vec<TimeWindow> = payload
        .time_windows
        .into_iter()
        .map(|w| TimeWindow {
            id: Uuid::new_v4(),
            fee_config_id: config.id,
            start_time: w.start_time,
            end_time: w.end_time,
            fee_delta: w.fee_delta,
        })
        .collect();

    state
        .store
        .upsert_fee_config(config.clone(), time_windows.clone())
        .await?;

    Ok(Json(FeeConfigResponse {
        config,
        time_windows,
    }))
}

fn validate_fee_config(payload: &FeeConfigRequest) -> Result<(), AppError> {
    let fees = [
        ("initial_fee", payload.initial_fee),
        ("distance_fee_per_km", payload.distance_fee_per_km),
        ("waiting_fee_per_minute", payload.waiting_fee_per_minute),
        ("platform_fee", payload.platform_fee),
        ("insurance_fee", payload.insurance_fee),
    ];
    for (name, value) in fees {
        if value < 0 {
            return Err(AppError::Validation(format!("{name} cannot be negative")));
        }
    }

    if payload.free_waiting_minute < 0 {
        return Err(AppError::Validation(
            "free_waiting_minute cannot be negative".to_string(),
        ));
    }

    if !payload.commission_rate.is_finite() || payload.commission_rate < 0.0 {
        return Err(AppError::Validation(
            "commission_rate must be a non-negative number".to_string(),
        ));
    }

    if payload.commission_rate_type == CommissionRateType::Percentage
        && payload.commission_rate > 100.0
    {
        return Err(AppError::Validation(
            "percentage commission_rate cannot exceed 100".to_string(),
        ));
    }

    for window in &payload.time_windows {
        if window.fee_delta < 0 {
            return Err(AppError::Validation(
                "time window fee_delta cannot be negative".to_string(),
            ));
        }
        if window.start_time == window.end_time {
            return Err(AppError::Validation(
                "time window cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::{validate_fee_config, FeeConfigRequest, TimeWindowRequest};
    use crate::models::fees::CommissionRateType;

    fn request() -> FeeConfigRequest {
        FeeConfigRequest {
            initial_fee: 3_000,
            distance_fee_per_km: 1_000,
            waiting_fee_per_minute: 200,
            free_waiting_minute: 10,
            commission_rate: 10.0,
            commission_rate_type: CommissionRateType::Percentage,
            platform_fee: 0,
            insurance_fee: 0,
            time_windows: vec![],
        }
    }

    #[test]
    fn accepts_a_sane_config() {
        assert!(validate_fee_config(&request()).is_ok());
    }

    #[test]
    fn rejects_negative_fees() {
        let bad = FeeConfigRequest {
            initial_fee: -1,
            ..request()
        };
        assert!(validate_fee_config(&bad).is_err());
    }

    #[test]
    fn rejects_percentage_above_100() {
        let bad = FeeConfigRequest {
            commission_rate: 100.5,
            ..request()
        };
        assert!(validate_fee_config(&bad).is_err());

        let fixed_is_fine = FeeConfigRequest {
            commission_rate: 100.5,
            commission_rate_type: CommissionRateType::Fixed,
            ..request()
        };
        assert!(validate_fee_config(&fixed_is_fine).is_ok());
    }

    #[test]
    fn rejects_empty_time_window() {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let bad = FeeConfigRequest {
            time_windows: vec![TimeWindowRequest {
                start_time: noon,
                end_time: noon,
                fee_delta: 500,
            }],
            ..request()
        };
        assert!(validate_fee_config(&bad).is_err());
    }
}
