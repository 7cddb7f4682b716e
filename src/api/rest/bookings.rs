use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{authenticate, authorize, Role};
use crate::engine::dispatch::{self, DispatchOutcome};
use crate::error::AppError;
use crate::geo::{self, GeoPoint};
use crate::ids;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::driver::DriverStatus;
use crate::notify::{push_best_effort, PushMessage};
use crate::realtime::{booking_room, Event};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/search-driver", post(search_driver))
        .route("/bookings/accept", post(accept_booking))
        .route("/bookings/pickup", post(pickup_customer))
        .route("/bookings/reject", post(reject_booking))
        .route("/bookings/cancel", post(cancel_booking))
        .route("/bookings/:id", get(get_booking))
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub start: GeoPoint,
    pub end: GeoPoint,
    #[serde(default)]
    pub start_address: Option<String>,
    #[serde(default)]
    pub end_address: Option<String>,
}

#[derive(Serialize)]
pub struct SearchDriverResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Customer)?;

    geo::validate_point(&payload.start)?;
    geo::validate_point(&payload.end)?;

    state
        .store
        .get_customer(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {} not found", identity.user_id)))?;

    let booking = Booking {
        id: Uuid::new_v4(),
        code: ids::reference_code(),
        customer_id: identity.user_id,
        driver_id: None,
        start: payload.start,
        end: payload.end,
        start_address: payload.start_address,
        end_address: payload.end_address,
        status: BookingStatus::Pending,
        trip_id: None,
        created_at: Utc::now(),
    };

    let booking = state.store.create_booking(booking).await?;
    Ok(Json(booking))
}

async fn search_driver(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SearchDriverResponse>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Customer)?;

    let booking = state
        .store
        .booking_for_customer_in(identity.user_id, &[BookingStatus::Pending])
        .await?
        .ok_or_else(|| AppError::NotFound("no pending booking".to_string()))?;

    match dispatch::search_driver(&state, &booking).await? {
        DispatchOutcome::Assigned {
            driver_id,
            distance_km,
        } => Ok(Json(SearchDriverResponse {
            success: true,
            driver_id: Some(driver_id),
            distance_km: Some(distance_km),
        })),
        DispatchOutcome::NoDriver => Ok(Json(SearchDriverResponse {
            success: false,
            driver_id: None,
            distance_km: None,
        })),
    }
}

async fn accept_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Booking>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Driver)?;

    let booking = state
        .store
        .booking_for_driver_in(identity.user_id, &[BookingStatus::Connected])
        .await?
        .ok_or_else(|| AppError::NotFound("no booking waiting for acceptance".to_string()))?;

    let moved = state
        .store
        .update_booking_status(booking.id, BookingStatus::Connected, BookingStatus::Accepted)
        .await?;
    if !moved {
        return Err(AppError::InvalidStateTransition(
            "booking is no longer connected".to_string(),
        ));
    }

    emit_status(&state, booking.id, BookingStatus::Accepted, booking.driver_id);
    push_customer(
        &state,
        booking.customer_id,
        "Driver accepted",
        "Your driver accepted the booking and is on the way",
    )
    .await;

    reload(&state, booking.id).await.map(Json)
}

async fn pickup_customer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Booking>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Driver)?;

    let booking = state
        .store
        .booking_for_driver_in(identity.user_id, &[BookingStatus::Accepted])
        .await?
        .ok_or_else(|| AppError::NotFound("no accepted booking".to_string()))?;

    let moved = state
        .store
        .update_booking_status(booking.id, BookingStatus::Accepted, BookingStatus::OnTrip)
        .await?;
    if !moved {
        return Err(AppError::InvalidStateTransition(
            "booking is no longer accepted".to_string(),
        ));
    }

    emit_status(&state, booking.id, BookingStatus::OnTrip, booking.driver_id);
    push_customer(
        &state,
        booking.customer_id,
        "Picked up",
        "Your driver marked you as picked up",
    )
    .await;

    reload(&state, booking.id).await.map(Json)
}

async fn reject_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Booking>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Driver)?;

    let booking = state
        .store
        .booking_for_driver_in(identity.user_id, &[BookingStatus::Connected])
        .await?
        .ok_or_else(|| AppError::NotFound("no booking to reject".to_string()))?;

    let released = state.store.release_booking_driver(booking.id).await?;
    if !released {
        return Err(AppError::InvalidStateTransition(
            "booking is no longer connected".to_string(),
        ));
    }

    state
        .store
        .set_driver_status(identity.user_id, DriverStatus::Active)
        .await?;
    state.presence.set_status(identity.user_id, DriverStatus::Active);

    emit_status(&state, booking.id, BookingStatus::Pending, None);
    push_customer(
        &state,
        booking.customer_id,
        "Driver declined",
        "The driver declined your booking; you can search again",
    )
    .await;

    reload(&state, booking.id).await.map(Json)
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Booking>, AppError> {
    let identity = authorize(state.verifier.as_ref(), &headers, Role::Customer)?;

    let booking = state
        .store
        .booking_for_customer_in(identity.user_id, &BookingStatus::CANCELABLE)
        .await?
        .ok_or_else(|| AppError::NotFound("no cancelable booking".to_string()))?;

    let moved = state
        .store
        .update_booking_status(booking.id, booking.status, BookingStatus::Canceled)
        .await?;
    if !moved {
        return Err(AppError::InvalidStateTransition(
            "booking changed while canceling; try again".to_string(),
        ));
    }

    if let Some(driver_id) = booking.driver_id {
        state
            .store
            .set_driver_status(driver_id, DriverStatus::Active)
            .await?;
        state.presence.set_status(driver_id, DriverStatus::Active);
        push_driver(
            &state,
            driver_id,
            "Booking canceled",
            "The customer canceled the booking",
        )
        .await;
    }

    emit_status(&state, booking.id, BookingStatus::Canceled, booking.driver_id);

    reload(&state, booking.id).await.map(Json)
}

async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let identity = authenticate(state.verifier.as_ref(), &headers)?;

    let booking = state
        .store
        .get_booking(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;

    let allowed = match identity.role {
        Role::Admin => true,
        Role::Customer => booking.customer_id == identity.user_id,
        Role::Driver => booking.driver_id == Some(identity.user_id),
    };
    if !allowed {
        return Err(AppError::Forbidden("not your booking".to_string()));
    }

    Ok(Json(booking))
}

fn emit_status(
    state: &Arc<AppState>,
    booking_id: Uuid,
    status: BookingStatus,
    driver_id: Option<Uuid>,
) {
    state.hub.emit_room(
        booking_room(booking_id),
        Event::BookingStatus {
            booking_id,
            status,
            driver_id,
        },
    );
}

async fn push_customer(state: &Arc<AppState>, customer_id: Uuid, title: &str, body: &str) {
    if let Ok(Some(customer)) = state.store.get_customer(customer_id).await {
        push_best_effort(
            state.notifier.as_ref(),
            customer.fcm_token.as_deref(),
            PushMessage {
                title: title.to_string(),
                body: body.to_string(),
                channel: "booking",
            },
        )
        .await;
    }
}

async fn push_driver(state: &Arc<AppState>, driver_id: Uuid, title: &str, body: &str) {
    if let Ok(Some(driver)) = state.store.get_driver(driver_id).await {
        push_best_effort(
            state.notifier.as_ref(),
            driver.fcm_token.as_deref(),
            PushMessage {
                title: title.to_string(),
                body: body.to_string(),
                channel: "booking",
            },
        )
        .await;
    }
}

async fn reload(state: &Arc<AppState>, booking_id: Uuid) -> Result<Booking, AppError> {
    state
        .store
        .get_booking(booking_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("booking {booking_id} vanished")))
}
