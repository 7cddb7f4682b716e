use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::fees::Money;

pub const STARTING_BALANCE: Money = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Active,
    Busy,
    OnTrip,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    /// Business driver code in the form 7BXXX (7B001-7B999).
    pub code: String,
    pub name: String,
    pub phone: String,
    pub vehicle_number: String,
    pub vehicle_model: Option<String>,
    pub driving_license_number: Option<String>,
    pub address: Option<String>,
    pub status: DriverStatus,
    pub is_online: bool,
    pub disabled: bool,
    pub verified: bool,
    pub balance: Money,
    pub fcm_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDriver {
    pub code: String,
    pub name: String,
    pub phone: String,
    pub vehicle_number: String,
    pub driving_license_number: Option<String>,
    pub vehicle_model: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
}

impl Driver {
    /// Validates the provisioning request and builds the account row.
    /// A driver is verified only when all four optional profile fields
    /// were supplied.
    pub fn provision(req: NewDriver) -> Result<Self, AppError> {
        validate_driver_code(&req.code)?;
        validate_phone(&req.phone)?;

        if req.name.trim().is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }

        if req.vehicle_number.trim().is_empty() {
            return Err(AppError::Validation(
                "vehicle number cannot be empty".to_string(),
            ));
        }

        let verified = req.driving_license_number.is_some()
            && req.vehicle_model.is_some()
            && req.address_street.is_some()
            && req.address_city.is_some();

        let address = match (req.address_street, req.address_city) {
            (Some(street), Some(city)) => Some(format!("{street}, {city}")),
            (Some(street), None) => Some(street),
            (None, Some(city)) => Some(city),
            (None, None) => None,
        };

        Ok(Self {
            id: Uuid::new_v4(),
            code: req.code,
            name: req.name,
            phone: req.phone,
            vehicle_number: req.vehicle_number,
            vehicle_model: req.vehicle_model,
            driving_license_number: req.driving_license_number,
            address,
            status: DriverStatus::Active,
            is_online: false,
            disabled: false,
            verified,
            balance: STARTING_BALANCE,
            fcm_token: None,
            created_at: Utc::now(),
        })
    }
}

pub fn validate_driver_code(code: &str) -> Result<(), AppError> {
    let digits = code.strip_prefix("7B").unwrap_or("");

    if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::Validation(
            "driver code must be in format 7BXXX (e.g. 7B001)".to_string(),
        ));
    }

    if digits == "000" {
        return Err(AppError::Validation(
            "driver code must be between 7B001 and 7B999".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), AppError> {
    let digits_only = phone.bytes().all(|b| b.is_ascii_digit());

    if !digits_only || !(9..=11).contains(&phone.len()) {
        return Err(AppError::Validation(
            "phone number must be 9-11 digits".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_driver_code, validate_phone, Driver, NewDriver, STARTING_BALANCE};
    use crate::models::driver::DriverStatus;

    fn request() -> NewDriver {
        NewDriver {
            code: "7B001".to_string(),
            name: "Aung Kyaw".to_string(),
            phone: "959123456".to_string(),
            vehicle_number: "9K-1234".to_string(),
            driving_license_number: Some("DL-555".to_string()),
            vehicle_model: Some("Toyota Probox".to_string()),
            address_street: Some("Bogyoke Road".to_string()),
            address_city: Some("Yangon".to_string()),
        }
    }

    #[test]
    fn provision_with_full_profile_is_verified() {
        let driver = Driver::provision(request()).unwrap();

        assert!(driver.verified);
        assert_eq!(driver.status, DriverStatus::Active);
        assert_eq!(driver.balance, STARTING_BALANCE);
        assert!(!driver.is_online);
        assert_eq!(driver.address.as_deref(), Some("Bogyoke Road, Yangon"));
    }

    #[test]
    fn provision_with_missing_optional_field_is_unverified() {
        let mut req = request();
        req.vehicle_model = None;

        let driver = Driver::provision(req).unwrap();
        assert!(!driver.verified);
    }

    #[test]
    fn driver_code_format_is_enforced() {
        assert!(validate_driver_code("7B001").is_ok());
        assert!(validate_driver_code("7B999").is_ok());
        assert!(validate_driver_code("7B000").is_err());
        assert!(validate_driver_code("8B001").is_err());
        assert!(validate_driver_code("7B01").is_err());
        assert!(validate_driver_code("7B0011").is_err());
        assert!(validate_driver_code("7BabC").is_err());
    }

    #[test]
    fn phone_must_be_nine_to_eleven_digits() {
        assert!(validate_phone("959123456").is_ok());
        assert!(validate_phone("95912345678").is_ok());
        assert!(validate_phone("12345678").is_err());
        assert!(validate_phone("123456789012").is_err());
        assert!(validate_phone("95912345x").is_err());
    }
}
