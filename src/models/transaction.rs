use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::fees::{CommissionRateType, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    CashIn,
    Commission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// Ledger row for driver balance movement. Cash-in requests are created
/// pending with no amount; the resolving admin supplies it. Commission
/// rows are created completed at settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverTransaction {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub number: String,
    pub kind: TransactionKind,
    pub amount: Option<Money>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Companion record for cash-in transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUp {
    pub driver_transaction_id: Uuid,
    pub payment_method: String,
    pub receipt_photo_url: Option<String>,
    pub approved_admin_id: Option<Uuid>,
}

/// Links a commission ledger row to the trip it settled, with the rate
/// that was applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionRecord {
    pub id: Uuid,
    pub driver_transaction_id: Uuid,
    pub trip_id: Uuid,
    pub commission_rate: f64,
    pub commission_rate_type: CommissionRateType,
}

/// Persisted audit of a push sent to a driver. Written best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverNotification {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub detail_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
