use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::{self, GeoPoint};
use crate::models::driver::DriverStatus;

/// Live state of one driver as last reported over the socket. Keyed by
/// driver id; each report overwrites the previous one wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct DriverPresence {
    pub driver_id: Uuid,
    #[serde(skip)]
    pub connection_id: Uuid,
    pub location: GeoPoint,
    pub status: DriverStatus,
    pub is_online: bool,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LocationUpdate {
    pub driver_id: Uuid,
    pub location: GeoPoint,
    pub status: DriverStatus,
    pub is_online: bool,
}

/// Ephemeral registry of connected drivers. Entries appear on the first
/// location report, follow the reporting socket, and vanish when it
/// disconnects. Never persisted.
pub struct PresenceRegistry {
    entries: DashMap<Uuid, DriverPresence>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Validates and applies a location report. Last write wins per driver.
    pub fn report(
        &self,
        update: LocationUpdate,
        connection_id: Uuid,
    ) -> Result<DriverPresence, AppError> {
        geo::validate_point(&update.location)?;

        let entry = DriverPresence {
            driver_id: update.driver_id,
            connection_id,
            location: update.location,
            status: update.status,
            is_online: update.is_online,
            last_update: Utc::now(),
        };

        self.entries.insert(update.driver_id, entry.clone());
        Ok(entry)
    }

    /// Drops the entry owned by a disconnected socket. Reports from a newer
    /// connection are left alone.
    pub fn remove_connection(&self, connection_id: Uuid) -> Option<Uuid> {
        let driver_id = self
            .entries
            .iter()
            .find(|entry| entry.connection_id == connection_id)
            .map(|entry| entry.driver_id)?;

        self.entries
            .remove_if(&driver_id, |_, entry| entry.connection_id == connection_id)
            .map(|(id, _)| id)
    }

    pub fn set_status(&self, driver_id: Uuid, status: DriverStatus) {
        if let Some(mut entry) = self.entries.get_mut(&driver_id) {
            entry.status = status;
            entry.last_update = Utc::now();
        }
    }

    pub fn get(&self, driver_id: Uuid) -> Option<DriverPresence> {
        self.entries.get(&driver_id).map(|entry| entry.clone())
    }

    /// Snapshot ordered by driver id so selection tie-breaks are stable.
    pub fn snapshot(&self) -> Vec<DriverPresence> {
        let mut entries: Vec<DriverPresence> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by_key(|entry| entry.driver_id);
        entries
    }

    pub fn online_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.is_online)
            .count()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
