use crate::domain::account::Amount;
use crate::domain::ids::{ChargeId, TransactionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Payment,
    Refund,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[serde(alias = "balance")]
    Balance,
    #[serde(alias = "credit_card", alias = "card")]
    CreditCard,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Balance => f.write_str("BALANCE"),
            PaymentMethod::CreditCard => f.write_str("CREDIT_CARD"),
        }
    }
}

/// One immutable ledger entry.
///
/// `amount` is always positive; its direction is given by `type`. Entries are
/// only ever appended.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub charge_id: Option<ChargeId>,
    pub amount: Amount,
    pub r#type: TransactionType,
    pub payment_method: Option<PaymentMethod>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: UserId,
        charge_id: Option<ChargeId>,
        amount: Amount,
        r#type: TransactionType,
        payment_method: Option<PaymentMethod>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            charge_id,
            amount,
            r#type,
            payment_method,
            description: description.into(),
            created_at,
        }
    }
}
