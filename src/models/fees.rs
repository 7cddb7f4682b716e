use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whole currency units. Every fee the engine produces is floored to this.
pub type Money = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionRateType {
    Fixed,
    Percentage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    pub id: Uuid,
    pub initial_fee: Money,
    pub distance_fee_per_km: Money,
    pub waiting_fee_per_minute: Money,
    pub free_waiting_minute: i64,
    pub commission_rate: f64,
    pub commission_rate_type: CommissionRateType,
    pub platform_fee: Money,
    pub insurance_fee: Money,
}

/// Additive adjustment to the initial fee, matched against the trip's
/// start time-of-day. Windows with `start_time > end_time` wrap midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindow {
    pub id: Uuid,
    pub fee_config_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub fee_delta: Money,
}

/// Copy of the fee configuration a trip was priced against. Stored on the
/// trip row so later config edits never reprice it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSnapshot {
    pub initial_fee: Money,
    pub distance_fee_per_km: Money,
    pub waiting_fee_per_minute: Money,
    pub free_waiting_minute: i64,
    pub commission_rate: f64,
    pub commission_rate_type: CommissionRateType,
    pub platform_fee: Money,
    pub insurance_fee: Money,
}

impl From<&FeeConfig> for FeeSnapshot {
    fn from(cfg: &FeeConfig) -> Self {
        Self {
            initial_fee: cfg.initial_fee,
            distance_fee_per_km: cfg.distance_fee_per_km,
            waiting_fee_per_minute: cfg.waiting_fee_per_minute,
            free_waiting_minute: cfg.free_waiting_minute,
            commission_rate: cfg.commission_rate,
            commission_rate_type: cfg.commission_rate_type,
            platform_fee: cfg.platform_fee,
            insurance_fee: cfg.insurance_fee,
        }
    }
}

/// Full fare decomposition written to the trip at settlement.
///
/// `commission_fee + driver_received` always equals `driver_total`; the
/// received amount is derived by subtraction, never floored on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub initial_fee: Money,
    pub time_fee: Money,
    pub distance_fee: Money,
    pub waiting_fee: Money,
    pub extra_fee: Money,
    pub insurance_fee: Money,
    pub platform_fee: Money,
    pub customer_total: Money,
    pub driver_total: Money,
    pub commission_fee: Money,
    pub driver_received: Money,
}
