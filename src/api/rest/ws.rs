use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::driver::DriverStatus;
use crate::presence::LocationUpdate;
use crate::realtime::{booking_room, driver_room, Event, Scope};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
enum ClientMessage {
    Location {
        driver_id: Uuid,
        latitude: f64,
        longitude: f64,
        status: DriverStatus,
        is_online: bool,
    },
    JoinDriver {
        driver_id: Uuid,
    },
    JoinBooking {
        booking_id: Uuid,
    },
    TripPosition {
        booking_id: Uuid,
        driver_id: Uuid,
    },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// One loop owns both halves of the socket: client messages mutate presence
/// and room membership, hub envelopes are filtered by the joined rooms and
/// forwarded.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = Uuid::new_v4();
    let mut events = state.hub.subscribe();
    let mut joined: HashSet<String> = HashSet::new();

    state.metrics.ws_connections.inc();
    info!(%connection_id, "websocket client connected");

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&state, &text, connection_id, &mut joined);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(%connection_id, error = %err, "websocket read failed");
                        break;
                    }
                }
            }
            outgoing = events.recv() => {
                match outgoing {
                    Ok(envelope) => {
                        let deliver = match &envelope.scope {
                            Scope::All => true,
                            Scope::Room(room) => joined.contains(room),
                        };
                        if !deliver {
                            continue;
                        }

                        let json = match serde_json::to_string(&envelope.event) {
                            Ok(json) => json,
                            Err(err) => {
                                warn!(error = %err, "failed to serialize event for ws");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%connection_id, skipped, "websocket subscriber lagging");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    state.metrics.ws_connections.dec();

    if let Some(driver_id) = state.presence.remove_connection(connection_id) {
        info!(%connection_id, %driver_id, "driver presence dropped");
        broadcast_locations(&state);
    }

    info!(%connection_id, "websocket client disconnected");
}

fn handle_client_message(
    state: &Arc<AppState>,
    text: &str,
    connection_id: Uuid,
    joined: &mut HashSet<String>,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(%connection_id, error = %err, "unparseable websocket message");
            return;
        }
    };

    match message {
        ClientMessage::Location {
            driver_id,
            latitude,
            longitude,
            status,
            is_online,
        } => {
            let update = LocationUpdate {
                driver_id,
                location: GeoPoint {
                    lat: latitude,
                    lng: longitude,
                },
                status,
                is_online,
            };

            match state.presence.report(update, connection_id) {
                Ok(_) => broadcast_locations(state),
                Err(err) => {
                    warn!(%driver_id, error = %err, "dropped invalid location report");
                }
            }
        }
        ClientMessage::JoinDriver { driver_id } => {
            joined.insert(driver_room(driver_id));
        }
        ClientMessage::JoinBooking { booking_id } => {
            joined.insert(booking_room(booking_id));
        }
        ClientMessage::TripPosition {
            booking_id,
            driver_id,
        } => match state.presence.get(driver_id) {
            Some(entry) => {
                state.hub.emit_room(
                    booking_room(booking_id),
                    Event::TripPosition {
                        booking_id,
                        driver_id,
                        location: entry.location,
                        status: entry.status,
                    },
                );
            }
            None => {
                debug!(%driver_id, "trip_position requested for driver with no presence");
            }
        },
    }
}

fn broadcast_locations(state: &Arc<AppState>) {
    state.hub.emit_all(Event::DriverLocations {
        drivers: state.presence.snapshot(),
    });
    state
        .metrics
        .drivers_online
        .set(state.presence.online_count() as i64);
}
