use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::customer::Customer;
use crate::models::driver::{Driver, DriverStatus};
use crate::models::fees::{FeeConfig, Money, TimeWindow};
use crate::models::transaction::{
    CommissionRecord, DriverNotification, DriverTransaction, TopUp, TransactionKind,
    TransactionStatus,
};
use crate::models::trip::{Trip, TripSettlement, TripStatus};
use crate::store::Store;

#[derive(Default)]
struct Tables {
    drivers: HashMap<Uuid, Driver>,
    customers: HashMap<Uuid, Customer>,
    bookings: HashMap<Uuid, Booking>,
    trips: HashMap<Uuid, Trip>,
    fee_config: Option<FeeConfig>,
    time_windows: Vec<TimeWindow>,
    transactions: HashMap<Uuid, DriverTransaction>,
    top_ups: HashMap<Uuid, TopUp>,
    commissions: Vec<CommissionRecord>,
    notifications: Vec<DriverNotification>,
}

/// In-memory store. One mutex over all tables gives every trait method the
/// transactional semantics a relational backend would; the guard is never
/// held across an await point.
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("store mutex poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_driver(&self, driver: Driver) -> Result<Driver, AppError> {
        let mut tables = self.lock()?;

        if tables.drivers.values().any(|d| d.code == driver.code) {
            return Err(AppError::DuplicateKey(format!(
                "driver code {} is already in use",
                driver.code
            )));
        }

        if tables.drivers.values().any(|d| d.phone == driver.phone) {
            return Err(AppError::DuplicateKey(
                "driver with this phone number already exists".to_string(),
            ));
        }

        tables.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    async fn get_driver(&self, id: Uuid) -> Result<Option<Driver>, AppError> {
        Ok(self.lock()?.drivers.get(&id).cloned())
    }

    async fn claim_driver(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock()?;

        match tables.drivers.get_mut(&id) {
            Some(driver) if driver.status == DriverStatus::Active => {
                driver.status = DriverStatus::Busy;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_driver_status(&self, id: Uuid, status: DriverStatus) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let driver = tables
            .drivers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

        driver.status = status;
        Ok(())
    }

    async fn set_driver_online(&self, id: Uuid, online: bool) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let driver = tables
            .drivers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

        driver.is_online = online;
        Ok(())
    }

    async fn set_driver_fcm_token(&self, id: Uuid, token: String) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let driver = tables
            .drivers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

        driver.fcm_token = Some(token);
        Ok(())
    }

    async fn create_customer(&self, customer: Customer) -> Result<Customer, AppError> {
        let mut tables = self.lock()?;

        if tables.customers.values().any(|c| c.phone == customer.phone) {
            return Err(AppError::DuplicateKey(
                "customer with this phone number already exists".to_string(),
            ));
        }

        tables.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        Ok(self.lock()?.customers.get(&id).cloned())
    }

    async fn set_customer_fcm_token(&self, id: Uuid, token: String) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let customer = tables
            .customers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("customer {id} not found")))?;

        customer.fcm_token = Some(token);
        Ok(())
    }

    async fn upsert_fee_config(
        &self,
        config: FeeConfig,
        windows: Vec<TimeWindow>,
    ) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        tables.fee_config = Some(config);
        tables.time_windows = windows;
        Ok(())
    }

    async fn get_fee_config(&self) -> Result<Option<(FeeConfig, Vec<TimeWindow>)>, AppError> {
        let tables = self.lock()?;
        Ok(tables
            .fee_config
            .clone()
            .map(|config| (config, tables.time_windows.clone())))
    }

    async fn create_booking(&self, booking: Booking) -> Result<Booking, AppError> {
        let mut tables = self.lock()?;

        let has_active = tables.bookings.values().any(|b| {
            b.customer_id == booking.customer_id && BookingStatus::ACTIVE.contains(&b.status)
        });

        if has_active {
            return Err(AppError::Conflict(
                "customer already has an active booking".to_string(),
            ));
        }

        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        Ok(self.lock()?.bookings.get(&id).cloned())
    }

    async fn booking_for_customer_in(
        &self,
        customer_id: Uuid,
        statuses: &[BookingStatus],
    ) -> Result<Option<Booking>, AppError> {
        Ok(self
            .lock()?
            .bookings
            .values()
            .find(|b| b.customer_id == customer_id && statuses.contains(&b.status))
            .cloned())
    }

    async fn booking_for_driver_in(
        &self,
        driver_id: Uuid,
        statuses: &[BookingStatus],
    ) -> Result<Option<Booking>, AppError> {
        Ok(self
            .lock()?
            .bookings
            .values()
            .find(|b| b.driver_id == Some(driver_id) && statuses.contains(&b.status))
            .cloned())
    }

    async fn assign_booking_driver(&self, id: Uuid, driver_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock()?;

        match tables.bookings.get_mut(&id) {
            Some(booking) if booking.status == BookingStatus::Pending => {
                booking.status = BookingStatus::Connected;
                booking.driver_id = Some(driver_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_booking_driver(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock()?;

        match tables.bookings.get_mut(&id) {
            Some(booking) if booking.status == BookingStatus::Connected => {
                booking.status = BookingStatus::Pending;
                booking.driver_id = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_booking_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, AppError> {
        let mut tables = self.lock()?;

        match tables.bookings.get_mut(&id) {
            Some(booking) if booking.status == from => {
                booking.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn attach_booking_trip(&self, id: Uuid, trip_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock()?;

        match tables.bookings.get_mut(&id) {
            Some(booking)
                if booking.status == BookingStatus::OnTrip && booking.trip_id.is_none() =>
            {
                booking.trip_id = Some(trip_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_trip(&self, trip: Trip) -> Result<Trip, AppError> {
        let mut tables = self.lock()?;

        let has_active = tables
            .trips
            .values()
            .any(|t| t.driver_id == trip.driver_id && TripStatus::ACTIVE.contains(&t.status));

        if has_active {
            return Err(AppError::Conflict(
                "driver already has an active trip".to_string(),
            ));
        }

        tables.trips.insert(trip.id, trip.clone());
        Ok(trip)
    }

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, AppError> {
        Ok(self.lock()?.trips.get(&id).cloned())
    }

    async fn active_trip_for_driver(&self, driver_id: Uuid) -> Result<Option<Trip>, AppError> {
        Ok(self
            .lock()?
            .trips
            .values()
            .find(|t| t.driver_id == driver_id && TripStatus::ACTIVE.contains(&t.status))
            .cloned())
    }

    async fn settle_trip(
        &self,
        trip_id: Uuid,
        settlement: TripSettlement,
        transaction: DriverTransaction,
        commission: CommissionRecord,
    ) -> Result<Trip, AppError> {
        let mut tables = self.lock()?;

        let driver_id = {
            let trip = tables
                .trips
                .get(&trip_id)
                .ok_or_else(|| AppError::NotFound(format!("trip {trip_id} not found")))?;

            if !TripStatus::ACTIVE.contains(&trip.status) {
                return Err(AppError::AlreadySettled);
            }

            trip.driver_id
        };

        if !tables.drivers.contains_key(&driver_id) {
            return Err(AppError::Internal(format!(
                "driver {driver_id} missing for settlement of trip {trip_id}"
            )));
        }

        // All checks passed; apply every write of the unit.
        let trip = tables
            .trips
            .get_mut(&trip_id)
            .ok_or_else(|| AppError::NotFound(format!("trip {trip_id} not found")))?;

        trip.status = TripStatus::Finished;
        trip.end = settlement.end;
        trip.end_address = settlement.end_address;
        trip.distance_km = Some(settlement.distance_km);
        trip.duration_secs = Some(settlement.duration_secs);
        trip.waiting_secs = Some(settlement.waiting_secs);
        trip.pricing = settlement.pricing;
        trip.fare = Some(settlement.fare.clone());
        trip.ended_at = Some(settlement.ended_at);
        let settled = trip.clone();

        tables.transactions.insert(transaction.id, transaction);
        tables.commissions.push(commission);

        if let Some(driver) = tables.drivers.get_mut(&driver_id) {
            driver.balance -= settlement.fare.commission_fee;
        }

        Ok(settled)
    }

    async fn create_cash_in(
        &self,
        transaction: DriverTransaction,
        top_up: TopUp,
    ) -> Result<DriverTransaction, AppError> {
        let mut tables = self.lock()?;
        tables.top_ups.insert(top_up.driver_transaction_id, top_up);
        tables
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<DriverTransaction>, AppError> {
        Ok(self.lock()?.transactions.get(&id).cloned())
    }

    async fn resolve_cash_in(
        &self,
        id: Uuid,
        admin_id: Uuid,
        approve: bool,
        amount: Money,
    ) -> Result<DriverTransaction, AppError> {
        let mut tables = self.lock()?;

        let (driver_id, kind, status) = {
            let transaction = tables
                .transactions
                .get(&id)
                .ok_or_else(|| AppError::NotFound(format!("transaction {id} not found")))?;
            (transaction.driver_id, transaction.kind, transaction.status)
        };

        if kind != TransactionKind::CashIn {
            return Err(AppError::Validation(
                "transaction is not a cash-in request".to_string(),
            ));
        }

        if status != TransactionStatus::Pending {
            return Err(AppError::Conflict(
                "transaction was already resolved".to_string(),
            ));
        }

        let transaction = tables
            .transactions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("transaction {id} not found")))?;

        transaction.amount = Some(amount);
        transaction.status = if approve {
            TransactionStatus::Completed
        } else {
            TransactionStatus::Failed
        };
        let resolved = transaction.clone();

        if let Some(top_up) = tables.top_ups.get_mut(&id) {
            top_up.approved_admin_id = Some(admin_id);
        }

        if approve {
            if let Some(driver) = tables.drivers.get_mut(&driver_id) {
                driver.balance += amount;
            }
        }

        Ok(resolved)
    }

    async fn record_notification(
        &self,
        notification: DriverNotification,
    ) -> Result<(), AppError> {
        self.lock()?.notifications.push(notification);
        Ok(())
    }
}
