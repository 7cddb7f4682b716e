pub mod booking;
pub mod customer;
pub mod driver;
pub mod fees;
pub mod transaction;
pub mod trip;
