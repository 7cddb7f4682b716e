use chrono::{DateTime, NaiveTime, Utc};

use crate::models::fees::{
    CommissionRateType, FareBreakdown, FeeConfig, Money, TimeWindow,
};

/// Kilometers billed at the plain per-km rate before the long-distance
/// surcharge kicks in.
pub const DISTANCE_TIER_KM: f64 = 25.0;

/// Flat per-km surcharge added on top of the configured rate beyond the
/// tier boundary.
pub const LONG_DISTANCE_SURCHARGE: Money = 100;

pub struct FareInputs {
    pub distance_km: f64,
    pub waiting_secs: i64,
    pub extra_fee: Money,
}

pub fn distance_fee(distance_km: f64, per_km: Money) -> Money {
    if distance_km <= DISTANCE_TIER_KM {
        (distance_km * per_km as f64).floor() as Money
    } else {
        let extra_km = distance_km - DISTANCE_TIER_KM;
        let base = DISTANCE_TIER_KM * per_km as f64;
        let long_haul = extra_km * (per_km + LONG_DISTANCE_SURCHARGE) as f64;
        (base + long_haul).floor() as Money
    }
}

pub fn waiting_fee(waiting_secs: i64, free_waiting_minute: i64, per_minute: Money) -> Money {
    let billable_minutes = (waiting_secs / 60 - free_waiting_minute).max(0);
    billable_minutes * per_minute
}

/// Fee delta of the first window containing the given time-of-day, or 0.
/// Windows are inclusive at the start and exclusive at the end; a window
/// whose start is after its end wraps midnight.
pub fn applicable_time_fee(time_of_day: NaiveTime, windows: &[TimeWindow]) -> Money {
    windows
        .iter()
        .find(|w| window_contains(w, time_of_day))
        .map(|w| w.fee_delta)
        .unwrap_or(0)
}

fn window_contains(window: &TimeWindow, t: NaiveTime) -> bool {
    if window.start_time <= window.end_time {
        t >= window.start_time && t < window.end_time
    } else {
        t >= window.start_time || t < window.end_time
    }
}

/// Fixed rates apply verbatim; percentage rates take their share of the
/// driver total, truncated. Nothing clamps the result to the total, so a
/// fixed rate above a short trip's earnings is charged in full.
pub fn commission_fee(driver_total: Money, rate: f64, rate_type: CommissionRateType) -> Money {
    match rate_type {
        CommissionRateType::Fixed => rate.floor() as Money,
        CommissionRateType::Percentage => {
            (driver_total as f64 * rate / 100.0).floor() as Money
        }
    }
}

/// Assembles the full fare for a trip that started at `trip_start`.
pub fn quote(
    cfg: &FeeConfig,
    windows: &[TimeWindow],
    trip_start: DateTime<Utc>,
    inputs: &FareInputs,
) -> FareBreakdown {
    let time_fee = applicable_time_fee(trip_start.time(), windows);
    let distance_fee = distance_fee(inputs.distance_km, cfg.distance_fee_per_km);
    let waiting_fee = waiting_fee(
        inputs.waiting_secs,
        cfg.free_waiting_minute,
        cfg.waiting_fee_per_minute,
    );

    let driver_total =
        cfg.initial_fee + time_fee + distance_fee + waiting_fee + inputs.extra_fee;
    let customer_total = driver_total + cfg.insurance_fee + cfg.platform_fee;

    let commission_fee = commission_fee(driver_total, cfg.commission_rate, cfg.commission_rate_type);

    FareBreakdown {
        initial_fee: cfg.initial_fee,
        time_fee,
        distance_fee,
        waiting_fee,
        extra_fee: inputs.extra_fee,
        insurance_fee: cfg.insurance_fee,
        platform_fee: cfg.platform_fee,
        customer_total,
        driver_total,
        commission_fee,
        driver_received: driver_total - commission_fee,
    }
}
