use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::driver::DriverStatus;
use crate::presence::DriverPresence;

/// Room a driver's socket joins to receive dispatch offers.
pub fn driver_room(driver_id: Uuid) -> String {
    format!("driver:{driver_id}")
}

/// Room both parties of a booking join for status and position updates.
pub fn booking_room(booking_id: Uuid) -> String {
    format!("booking:{booking_id}")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    All,
    Room(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    DriverLocations {
        drivers: Vec<DriverPresence>,
    },
    BookingRequest {
        booking: Booking,
        distance_km: f64,
    },
    BookingStatus {
        booking_id: Uuid,
        status: BookingStatus,
        driver_id: Option<Uuid>,
    },
    TripPosition {
        booking_id: Uuid,
        driver_id: Uuid,
        location: GeoPoint,
        status: DriverStatus,
    },
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub scope: Scope,
    pub event: Event,
}

/// Single broadcast channel for all realtime traffic. Sockets subscribe
/// once and filter envelopes by the rooms they joined; HTTP handlers
/// publish through the same channel. Send failures mean no subscribers
/// and are ignored.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<Envelope>,
}

impl EventHub {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _unused_rx) = broadcast::channel(buffer_size);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    pub fn emit_all(&self, event: Event) {
        let _ = self.tx.send(Envelope {
            scope: Scope::All,
            event,
        });
    }

    pub fn emit_room(&self, room: String, event: Event) {
        let _ = self.tx.send(Envelope {
            scope: Scope::Room(room),
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{booking_room, Event, EventHub, Scope};
    use crate::models::booking::BookingStatus;

    #[test]
    fn subscribers_see_room_scoped_events() {
        let hub = EventHub::new(16);
        let mut rx = hub.subscribe();
        let booking_id = Uuid::new_v4();

        hub.emit_room(
            booking_room(booking_id),
            Event::BookingStatus {
                booking_id,
                status: BookingStatus::Connected,
                driver_id: None,
            },
        );

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.scope, Scope::Room(booking_room(booking_id)));
    }

    #[test]
    fn events_serialize_with_tagged_names() {
        let booking_id = Uuid::new_v4();
        let event = Event::BookingStatus {
            booking_id,
            status: BookingStatus::OnTrip,
            driver_id: None,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "booking_status");
        assert_eq!(json["data"]["status"], "on_trip");
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let hub = EventHub::new(16);
        hub.emit_all(Event::DriverLocations { drivers: vec![] });
    }
}
