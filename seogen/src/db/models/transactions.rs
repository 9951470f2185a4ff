//! Store models for payment transactions.

use crate::types::{OrderCode, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Transaction status stored as TEXT in the database. Only `Pending` and `Failed` are written
/// here; the other transitions come from the payment provider's webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Paid,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, FromRow)]
pub struct Transaction {
    pub order_code: OrderCode,
    pub user_id: UserId,
    pub plan: String,
    pub amount: i64,
    pub status: TransactionStatus,
    pub checkout_url: Option<String>,
    pub payment_link_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for recording a new pending transaction
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub order_code: OrderCode,
    pub user_id: UserId,
    pub plan: String,
    pub amount: i64,
}
