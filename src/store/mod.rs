pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::customer::Customer;
use crate::models::driver::{Driver, DriverStatus};
use crate::models::fees::{FeeConfig, Money, TimeWindow};
use crate::models::transaction::{
    CommissionRecord, DriverNotification, DriverTransaction, TopUp,
};
use crate::models::trip::{Trip, TripSettlement};

/// Durable state behind the service. Methods are shaped after the
/// operations the domain performs, not generic CRUD: conditional
/// transitions return whether they applied (zero rows affected = `false`),
/// and multi-write units like settlement are one call so an implementation
/// can make them one transaction.
#[async_trait]
pub trait Store: Send + Sync {
    // drivers
    async fn create_driver(&self, driver: Driver) -> Result<Driver, AppError>;
    async fn get_driver(&self, id: Uuid) -> Result<Option<Driver>, AppError>;
    /// Compare-and-swap active -> busy, claiming the driver for dispatch.
    async fn claim_driver(&self, id: Uuid) -> Result<bool, AppError>;
    async fn set_driver_status(&self, id: Uuid, status: DriverStatus) -> Result<(), AppError>;
    async fn set_driver_online(&self, id: Uuid, online: bool) -> Result<(), AppError>;
    async fn set_driver_fcm_token(&self, id: Uuid, token: String) -> Result<(), AppError>;

    // customers
    async fn create_customer(&self, customer: Customer) -> Result<Customer, AppError>;
    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError>;
    async fn set_customer_fcm_token(&self, id: Uuid, token: String) -> Result<(), AppError>;

    // fee configuration
    async fn upsert_fee_config(
        &self,
        config: FeeConfig,
        windows: Vec<TimeWindow>,
    ) -> Result<(), AppError>;
    async fn get_fee_config(&self) -> Result<Option<(FeeConfig, Vec<TimeWindow>)>, AppError>;

    // bookings
    /// Inserts the booking. Fails with `Conflict` when the customer
    /// already has one in a non-terminal status.
    async fn create_booking(&self, booking: Booking) -> Result<Booking, AppError>;
    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, AppError>;
    async fn booking_for_customer_in(
        &self,
        customer_id: Uuid,
        statuses: &[BookingStatus],
    ) -> Result<Option<Booking>, AppError>;
    async fn booking_for_driver_in(
        &self,
        driver_id: Uuid,
        statuses: &[BookingStatus],
    ) -> Result<Option<Booking>, AppError>;
    /// Compare-and-swap pending -> connected, attaching the driver.
    async fn assign_booking_driver(&self, id: Uuid, driver_id: Uuid) -> Result<bool, AppError>;
    /// Compare-and-swap connected -> pending, clearing the driver.
    async fn release_booking_driver(&self, id: Uuid) -> Result<bool, AppError>;
    /// Compare-and-swap between two statuses.
    async fn update_booking_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, AppError>;
    /// Records the trip serving an on-trip booking, once.
    async fn attach_booking_trip(&self, id: Uuid, trip_id: Uuid) -> Result<bool, AppError>;

    // trips
    /// Inserts the trip. Fails with `Conflict` when the driver already has
    /// an unfinished trip.
    async fn create_trip(&self, trip: Trip) -> Result<Trip, AppError>;
    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, AppError>;
    async fn active_trip_for_driver(&self, driver_id: Uuid) -> Result<Option<Trip>, AppError>;
    /// Atomic settlement unit: compare-and-swap the trip out of an active
    /// status into finished with the full fare written, insert the
    /// commission ledger entries, and debit the driver balance. A trip
    /// that is already finished fails with `AlreadySettled` and writes
    /// nothing.
    async fn settle_trip(
        &self,
        trip_id: Uuid,
        settlement: TripSettlement,
        transaction: DriverTransaction,
        commission: CommissionRecord,
    ) -> Result<Trip, AppError>;

    // driver transactions
    async fn create_cash_in(
        &self,
        transaction: DriverTransaction,
        top_up: TopUp,
    ) -> Result<DriverTransaction, AppError>;
    async fn get_transaction(&self, id: Uuid) -> Result<Option<DriverTransaction>, AppError>;
    /// Compare-and-swap pending -> completed/failed with the admin's
    /// amount; approval credits the driver balance in the same unit.
    /// Fails with `Conflict` when the transaction was already resolved.
    async fn resolve_cash_in(
        &self,
        id: Uuid,
        admin_id: Uuid,
        approve: bool,
        amount: Money,
    ) -> Result<DriverTransaction, AppError>;

    // notifications
    async fn record_notification(&self, notification: DriverNotification) -> Result<(), AppError>;
}
