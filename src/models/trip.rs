use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::fees::{FareBreakdown, FeeSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Pending,
    Driving,
    Waiting,
    Finished,
}

impl TripStatus {
    /// Statuses a trip can still be settled from.
    pub const ACTIVE: [TripStatus; 3] =
        [TripStatus::Pending, TripStatus::Driving, TripStatus::Waiting];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub code: String,
    pub driver_id: Uuid,
    pub status: TripStatus,
    pub start: GeoPoint,
    pub start_address: Option<String>,
    pub end: Option<GeoPoint>,
    pub end_address: Option<String>,
    pub pricing: FeeSnapshot,
    pub fare: Option<FareBreakdown>,
    pub distance_km: Option<f64>,
    pub duration_secs: Option<i64>,
    pub waiting_secs: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Everything settlement writes onto the trip row in one atomic unit.
/// `started_at` is deliberately absent: settlement never touches it.
#[derive(Debug, Clone)]
pub struct TripSettlement {
    pub end: Option<GeoPoint>,
    pub end_address: Option<String>,
    pub distance_km: f64,
    pub duration_secs: i64,
    pub waiting_secs: i64,
    pub pricing: FeeSnapshot,
    pub fare: FareBreakdown,
    pub ended_at: DateTime<Utc>,
}
