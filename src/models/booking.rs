use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Connected,
    Accepted,
    OnTrip,
    Completed,
    Canceled,
}

impl BookingStatus {
    /// Statuses that block the customer from opening another booking.
    pub const ACTIVE: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Connected,
        BookingStatus::Accepted,
        BookingStatus::OnTrip,
    ];

    /// Statuses the customer may cancel from.
    pub const CANCELABLE: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Connected,
        BookingStatus::Accepted,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Canceled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    /// Short reference code shown to riders and drivers.
    pub code: String,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub start_address: Option<String>,
    pub end_address: Option<String>,
    pub status: BookingStatus,
    pub trip_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
