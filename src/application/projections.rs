//! Read models returned to callers.

use crate::domain::account::{Account, Amount, Balance};
use crate::domain::charge::{Charge, ChargeStatus};
use crate::domain::ids::{ChargeId, TransactionId, UserId};
use crate::domain::transaction::{PaymentMethod, Transaction};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
    Approved,
}

/// Outcome of a committed money movement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub transaction_id: TransactionId,
    pub charge_id: Option<ChargeId>,
    pub amount: Amount,
    pub payment_method: Option<PaymentMethod>,
    pub status: ReceiptStatus,
    pub message: String,
    pub transaction_date: DateTime<Utc>,
}

impl PaymentReceipt {
    pub fn approved(transaction: &Transaction, message: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction.id,
            charge_id: transaction.charge_id,
            amount: transaction.amount,
            payment_method: transaction.payment_method,
            status: ReceiptStatus::Approved,
            message: message.into(),
            transaction_date: transaction.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub balance: Balance,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for UserSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            balance: account.balance,
            created_at: account.created_at,
        }
    }
}

/// A charge with both parties resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeView {
    pub id: ChargeId,
    pub originator: UserSummary,
    pub recipient: UserSummary,
    pub amount: Amount,
    pub description: Option<String>,
    pub status: ChargeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChargeView {
    pub fn new(charge: &Charge, originator: UserSummary, recipient: UserSummary) -> Self {
        Self {
            id: charge.id,
            originator,
            recipient,
            amount: charge.amount,
            description: charge.description.clone(),
            status: charge.status,
            created_at: charge.created_at,
            updated_at: charge.updated_at,
        }
    }
}
