use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::validate_phone;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub fcm_token: Option<String>,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
}

impl Customer {
    pub fn provision(req: NewCustomer) -> Result<Self, AppError> {
        if req.name.trim().is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }

        validate_phone(&req.phone)?;

        Ok(Self {
            id: Uuid::new_v4(),
            name: req.name,
            phone: req.phone,
            fcm_token: None,
            disabled: false,
            created_at: Utc::now(),
        })
    }
}
