use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::{haversine_km, GeoPoint};
use crate::models::booking::{Booking, BookingStatus};
use crate::models::driver::DriverStatus;
use crate::notify::{push_best_effort, PushMessage};
use crate::presence::DriverPresence;
use crate::realtime::{booking_room, driver_room, Event};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Assigned { driver_id: Uuid, distance_km: f64 },
    NoDriver,
}

/// Picks the closest live driver strictly within `radius_km` of `origin`.
///
/// Only entries that are online and `active` count. Callers pass the
/// presence snapshot, which is ordered by driver id, so distance ties
/// resolve to the lowest id.
pub fn nearest_candidate(
    drivers: &[DriverPresence],
    origin: &GeoPoint,
    radius_km: f64,
) -> Option<(Uuid, f64)> {
    drivers
        .iter()
        .filter(|d| d.is_online && d.status == DriverStatus::Active)
        .map(|d| (d.driver_id, haversine_km(origin, &d.location)))
        .filter(|(_, distance)| *distance < radius_km)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Finds and claims a driver for a pending booking.
///
/// The presence registry only nominates; the durable store decides. The
/// chosen driver is re-verified against their stored row and claimed with
/// an active→busy CAS before the booking is touched, so two concurrent
/// searches can never connect the same driver.
pub async fn search_driver(
    state: &Arc<AppState>,
    booking: &Booking,
) -> Result<DispatchOutcome, AppError> {
    let snapshot = state.presence.snapshot();
    let radius_km = state.config.dispatch_radius_km;

    let Some((driver_id, distance_km)) = nearest_candidate(&snapshot, &booking.start, radius_km)
    else {
        info!(booking_id = %booking.id, radius_km, "no driver within dispatch radius");
        state
            .metrics
            .dispatches_total
            .with_label_values(&["no_driver"])
            .inc();
        return Ok(DispatchOutcome::NoDriver);
    };

    let stored = state.store.get_driver(driver_id).await?;
    let eligible = stored.as_ref().is_some_and(|d| {
        d.is_online && d.status == DriverStatus::Active && !d.disabled
    });

    if !eligible {
        warn!(booking_id = %booking.id, driver_id = %driver_id, "presence entry stale; driver not dispatchable");
        state
            .metrics
            .dispatches_total
            .with_label_values(&["stale"])
            .inc();
        return Ok(DispatchOutcome::NoDriver);
    }

    if !state.store.claim_driver(driver_id).await? {
        warn!(booking_id = %booking.id, driver_id = %driver_id, "driver claimed by a concurrent search");
        state
            .metrics
            .dispatches_total
            .with_label_values(&["stale"])
            .inc();
        return Ok(DispatchOutcome::NoDriver);
    }

    if !state.store.assign_booking_driver(booking.id, driver_id).await? {
        state.store.set_driver_status(driver_id, DriverStatus::Active).await?;
        state
            .metrics
            .dispatches_total
            .with_label_values(&["conflict"])
            .inc();
        return Err(AppError::InvalidStateTransition(
            "booking is no longer pending".to_string(),
        ));
    }

    state.presence.set_status(driver_id, DriverStatus::Busy);

    let connected = state
        .store
        .get_booking(booking.id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("booking {} vanished", booking.id)))?;

    state.hub.emit_room(
        driver_room(driver_id),
        Event::BookingRequest {
            booking: connected.clone(),
            distance_km,
        },
    );
    state.hub.emit_room(
        booking_room(booking.id),
        Event::BookingStatus {
            booking_id: booking.id,
            status: BookingStatus::Connected,
            driver_id: Some(driver_id),
        },
    );

    if let Some(driver) = stored {
        push_best_effort(
            state.notifier.as_ref(),
            driver.fcm_token.as_deref(),
            PushMessage {
                title: "New booking request".to_string(),
                body: format!("A customer {distance_km:.1} km away is waiting for you"),
                channel: "booking",
            },
        )
        .await;
    }

    state
        .metrics
        .dispatches_total
        .with_label_values(&["assigned"])
        .inc();

    info!(
        booking_id = %booking.id,
        driver_id = %driver_id,
        distance_km,
        "driver connected to booking"
    );

    Ok(DispatchOutcome::Assigned {
        driver_id,
        distance_km,
    })
}
