use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{authenticate, authorize, Role};
use crate::engine::settlement::{settle_active_trip, TripEndInput, TripReceipt};
use crate::error::AppError;
use crate::geo::{self, GeoPoint};
use crate::geocode::reverse_best_effort;
use crate::ids;
use crate::models::booking::BookingStatus;
use crate::models::driver::DriverStatus;
use crate::models::fees::FeeSnapshot;
use crate::models::trip::{Trip, TripStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trips/start", post(start_trip))
        .route("/trips/start-booked", post(start_booked_trip))
        .route("/trips/end", post(end_trip))
        .route("/trips/end-booked", post(end_booked_trip))
        .route("/trips/:id", get(get_trip))
}

#[derive(Deserialize)]
pub struct StartTripRequest {
    pub start: GeoPoint,
}

#[derive(Deserialize)]
pub struct StartBookedTripRequest {
    #[serde(default)]
    pub start: Option<GeoPoint>,
}

async fn start_trip(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<StartTripRequest>,
) -> Result<Json<Trip>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Driver)?;

    geo::validate_point(&payload.start)?;

    state
        .store
        .get_driver(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", identity.user_id)))?;

    let start_address = reverse_best_effort(state.geocoder.as_ref(), &payload.start).await;
    let trip = insert_trip(&state, identity.user_id, payload.start, start_address).await?;

    Ok(Json(trip))
}

async fn start_booked_trip(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<StartBookedTripRequest>,
) -> Result<Json<Trip>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Driver)?;

    let booking = state
        .store
        .booking_for_driver_in(identity.user_id, &[BookingStatus::OnTrip])
        .await?
        .ok_or_else(|| AppError::NotFound("no active booking".to_string()))?;

    if booking.trip_id.is_some() {
        return Err(AppError::Conflict(
            "trip already started for this booking".to_string(),
        ));
    }

    let (start, start_address) = match payload.start {
        Some(point) => {
            geo::validate_point(&point)?;
            let address = reverse_best_effort(state.geocoder.as_ref(), &point).await;
            (point, address)
        }
        None => (booking.start.clone(), booking.start_address.clone()),
    };

    let trip = insert_trip(&state, identity.user_id, start, start_address).await?;

    if !state.store.attach_booking_trip(booking.id, trip.id).await? {
        return Err(AppError::Internal(format!(
            "failed to attach trip {} to booking {}",
            trip.id, booking.id
        )));
    }

    Ok(Json(trip))
}

async fn end_trip(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<TripEndInput>,
) -> Result<Json<TripReceipt>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Driver)?;

    let trip = state
        .store
        .active_trip_for_driver(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("no active trip".to_string()))?;

    let receipt = settle_active_trip(&state, &trip, payload, None).await?;
    Ok(Json(receipt))
}

async fn end_booked_trip(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<TripEndInput>,
) -> Result<Json<TripReceipt>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Driver)?;

    let booking = state
        .store
        .booking_for_driver_in(identity.user_id, &[BookingStatus::OnTrip])
        .await?
        .ok_or_else(|| AppError::NotFound("no active booking".to_string()))?;

    let trip_id = booking
        .trip_id
        .ok_or_else(|| AppError::NotFound("trip not started for this booking".to_string()))?;

    let trip = state
        .store
        .get_trip(trip_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("trip {trip_id} not found")))?;

    let receipt = settle_active_trip(&state, &trip, payload, Some(&booking)).await?;
    Ok(Json(receipt))
}

async fn get_trip(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, AppError> {
    let identity = authenticate(state.verifier.as_ref(), &headers)?;

    let trip = state
        .store
        .get_trip(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("trip {id} not found")))?;

    let allowed = match identity.role {
        Role::Admin => true,
        Role::Driver => trip.driver_id == identity.user_id,
        Role::Customer => false,
    };
    if !allowed {
        return Err(AppError::Forbidden("not your trip".to_string()));
    }

    Ok(Json(trip))
}

/// Snapshots the fee config, inserts the trip, flips the driver to on_trip.
async fn insert_trip(
    state: &Arc<AppState>,
    driver_id: Uuid,
    start: GeoPoint,
    start_address: Option<String>,
) -> Result<Trip, AppError> {
    let (config, _windows) = state
        .store
        .get_fee_config()
        .await?
        .ok_or_else(|| AppError::ConfigMissing("fee configuration not set".to_string()))?;

    let now = Utc::now();
    let trip = Trip {
        id: Uuid::new_v4(),
        code: ids::reference_code(),
        driver_id,
        status: TripStatus::Driving,
        start,
        start_address,
        end: None,
        end_address: None,
        pricing: FeeSnapshot::from(&config),
        fare: None,
        distance_km: None,
        duration_secs: None,
        waiting_secs: None,
        started_at: Some(now),
        ended_at: None,
        created_at: now,
    };

    let trip = state.store.create_trip(trip).await?;

    state
        .store
        .set_driver_status(driver_id, DriverStatus::OnTrip)
        .await?;
    state.presence.set_status(driver_id, DriverStatus::OnTrip);

    Ok(trip)
}
