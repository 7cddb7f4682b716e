use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::fees::{quote, FareInputs};
use crate::error::AppError;
use crate::geo::{self, GeoPoint};
use crate::geocode::reverse_best_effort;
use crate::ids;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::driver::DriverStatus;
use crate::models::fees::{FareBreakdown, FeeSnapshot, Money};
use crate::models::transaction::{
    CommissionRecord, DriverNotification, DriverTransaction, TransactionKind, TransactionStatus,
};
use crate::models::trip::{Trip, TripSettlement, TripStatus};
use crate::notify::{push_best_effort, PushMessage};
use crate::realtime::{booking_room, Event};
use crate::state::AppState;

const MAX_DISTANCE_KM: f64 = 1_000.0;
const MAX_DURATION_SECS: i64 = 86_400;
const MAX_WAITING_SECS: i64 = 3_600;
const MAX_EXTRA_FEE: Money = 100_000;

#[derive(Debug, Clone, Deserialize)]
pub struct TripEndInput {
    pub end: Option<GeoPoint>,
    pub distance_km: f64,
    pub duration_secs: i64,
    #[serde(default)]
    pub waiting_secs: i64,
    #[serde(default)]
    pub extra_fee: Money,
}

impl TripEndInput {
    /// Rejects out-of-range readings before anything is written.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(end) = &self.end {
            geo::validate_point(end)?;
        }

        if !(0.0..=MAX_DISTANCE_KM).contains(&self.distance_km) {
            return Err(AppError::Validation(format!(
                "distance_km must be between 0 and {MAX_DISTANCE_KM}"
            )));
        }

        if !(0..=MAX_DURATION_SECS).contains(&self.duration_secs) {
            return Err(AppError::Validation(format!(
                "duration_secs must be between 0 and {MAX_DURATION_SECS}"
            )));
        }

        if !(0..=MAX_WAITING_SECS).contains(&self.waiting_secs) {
            return Err(AppError::Validation(format!(
                "waiting_secs must be between 0 and {MAX_WAITING_SECS}"
            )));
        }

        if !(0..=MAX_EXTRA_FEE).contains(&self.extra_fee) {
            return Err(AppError::Validation(format!(
                "extra_fee must be between 0 and {MAX_EXTRA_FEE}"
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TripReceipt {
    pub trip_id: Uuid,
    pub code: String,
    pub status: TripStatus,
    pub distance_km: f64,
    pub duration_secs: i64,
    pub waiting_secs: i64,
    pub fare: FareBreakdown,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl TripReceipt {
    fn from_settled(trip: &Trip) -> Result<Self, AppError> {
        let fare = trip
            .fare
            .clone()
            .ok_or_else(|| AppError::Internal(format!("settled trip {} has no fare", trip.id)))?;

        Ok(Self {
            trip_id: trip.id,
            code: trip.code.clone(),
            status: trip.status,
            distance_km: trip.distance_km.unwrap_or_default(),
            duration_secs: trip.duration_secs.unwrap_or_default(),
            waiting_secs: trip.waiting_secs.unwrap_or_default(),
            fare,
            started_at: trip.started_at,
            ended_at: trip.ended_at,
        })
    }
}

/// Ends a trip: prices it, commits the settlement unit, then fans out the
/// cheap side effects. `booking` is present for booked trips and absent for
/// ad-hoc ones.
pub async fn settle_active_trip(
    state: &Arc<AppState>,
    trip: &Trip,
    input: TripEndInput,
    booking: Option<&Booking>,
) -> Result<TripReceipt, AppError> {
    let start = Instant::now();

    match settle_inner(state, trip, input, booking).await {
        Ok(receipt) => {
            let elapsed = start.elapsed().as_secs_f64();
            state
                .metrics
                .settlement_latency_seconds
                .with_label_values(&["success"])
                .observe(elapsed);
            state
                .metrics
                .settlements_total
                .with_label_values(&["success"])
                .inc();
            Ok(receipt)
        }
        Err(err) => {
            let elapsed = start.elapsed().as_secs_f64();
            state
                .metrics
                .settlement_latency_seconds
                .with_label_values(&["error"])
                .observe(elapsed);
            state
                .metrics
                .settlements_total
                .with_label_values(&["error"])
                .inc();
            Err(err)
        }
    }
}

async fn settle_inner(
    state: &Arc<AppState>,
    trip: &Trip,
    input: TripEndInput,
    booking: Option<&Booking>,
) -> Result<TripReceipt, AppError> {
    input.validate()?;

    let (config, windows) = state
        .store
        .get_fee_config()
        .await?
        .ok_or_else(|| AppError::ConfigMissing("fee configuration not set".to_string()))?;

    // legacy rows may predate started_at
    let trip_start = trip.started_at.unwrap_or(trip.created_at);

    let inputs = FareInputs {
        distance_km: input.distance_km,
        waiting_secs: input.waiting_secs,
        extra_fee: input.extra_fee,
    };
    let fare = quote(&config, &windows, trip_start, &inputs);

    let end_address = match &input.end {
        Some(point) => reverse_best_effort(state.geocoder.as_ref(), point).await,
        None => None,
    };

    let ended_at = Utc::now();
    let settlement = TripSettlement {
        end: input.end.clone(),
        end_address,
        distance_km: input.distance_km,
        duration_secs: input.duration_secs,
        waiting_secs: input.waiting_secs,
        pricing: FeeSnapshot::from(&config),
        fare: fare.clone(),
        ended_at,
    };

    let transaction = DriverTransaction {
        id: Uuid::new_v4(),
        driver_id: trip.driver_id,
        number: ids::transaction_number(),
        kind: TransactionKind::Commission,
        amount: Some(fare.commission_fee),
        status: TransactionStatus::Completed,
        created_at: ended_at,
    };
    let commission = CommissionRecord {
        id: Uuid::new_v4(),
        driver_transaction_id: transaction.id,
        trip_id: trip.id,
        commission_rate: config.commission_rate,
        commission_rate_type: config.commission_rate_type,
    };

    let settled = state
        .store
        .settle_trip(trip.id, settlement, transaction, commission)
        .await?;

    state
        .store
        .set_driver_status(trip.driver_id, DriverStatus::Active)
        .await?;
    state.presence.set_status(trip.driver_id, DriverStatus::Active);

    state
        .metrics
        .commission_collected_total
        .inc_by(fare.commission_fee.max(0) as u64);

    info!(
        trip_id = %trip.id,
        driver_id = %trip.driver_id,
        driver_received = fare.driver_received,
        commission = fare.commission_fee,
        "trip settled"
    );

    notify_driver(state, &settled, &fare).await;

    if let Some(booking) = booking {
        finish_booking(state, booking, &fare).await?;
    }

    TripReceipt::from_settled(&settled)
}

async fn notify_driver(state: &Arc<AppState>, trip: &Trip, fare: &FareBreakdown) {
    let driver = match state.store.get_driver(trip.driver_id).await {
        Ok(driver) => driver,
        Err(err) => {
            warn!(driver_id = %trip.driver_id, error = %err, "skipping settlement push");
            None
        }
    };

    if let Some(driver) = driver {
        push_best_effort(
            state.notifier.as_ref(),
            driver.fcm_token.as_deref(),
            PushMessage {
                title: "Trip completed".to_string(),
                body: format!("You earned {}", fare.driver_received),
                channel: "trip",
            },
        )
        .await;
    }

    let record = DriverNotification {
        id: Uuid::new_v4(),
        driver_id: trip.driver_id,
        title: "Trip completed".to_string(),
        body: format!("You earned {}", fare.driver_received),
        kind: "trip_settled".to_string(),
        detail_id: Some(trip.id),
        created_at: Utc::now(),
    };
    if let Err(err) = state.store.record_notification(record).await {
        warn!(trip_id = %trip.id, error = %err, "failed to record settlement notification");
    }
}

async fn finish_booking(
    state: &Arc<AppState>,
    booking: &Booking,
    fare: &FareBreakdown,
) -> Result<(), AppError> {
    let moved = state
        .store
        .update_booking_status(booking.id, BookingStatus::OnTrip, BookingStatus::Completed)
        .await?;

    if !moved {
        // money already committed, so this is reported rather than unwound
        error!(booking_id = %booking.id, "booking left on_trip after settlement");
    }

    state.hub.emit_room(
        booking_room(booking.id),
        Event::BookingStatus {
            booking_id: booking.id,
            status: BookingStatus::Completed,
            driver_id: booking.driver_id,
        },
    );

    let customer = state.store.get_customer(booking.customer_id).await?;
    if let Some(customer) = customer {
        push_best_effort(
            state.notifier.as_ref(),
            customer.fcm_token.as_deref(),
            PushMessage {
                title: "Trip completed".to_string(),
                body: format!("Total fare {}", fare.customer_total),
                channel: "trip",
            },
        )
        .await;
    }

    Ok(())
}
