use crate::domain::ids::UserId;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Number of fractional digits money is kept at.
pub const CURRENCY_SCALE: u32 = 2;

/// Represents an account balance.
///
/// Wraps `rust_decimal::Decimal` so balances can only move through the
/// checked ledger operations on [`Account`], which never let them go negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// Represents a positive monetary amount for charges, payments and deposits.
///
/// Ensures that amounts are always positive and expressed in whole cents.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value <= Decimal::ZERO {
            return Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }
        if value.normalize().scale() > CURRENCY_SCALE {
            return Err(PaymentError::ValidationError(format!(
                "Amount {} has more than {} decimal places",
                value, CURRENCY_SCALE
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= amount.0
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A user's account: the only place money is held.
///
/// `version` is bumped by the store on every committed write and is used to
/// detect writes that slipped past the row locks; it is never used to retry.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: UserId,
    pub name: String,
    pub balance: Balance,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn open(id: UserId, name: impl Into<String>, now: DateTime<Utc>) -> Result<Self, PaymentError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "Account name must not be blank".to_string(),
            ));
        }
        Ok(Self {
            id,
            name,
            balance: Balance::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Adds funds. Always legal apart from arithmetic overflow.
    pub fn credit(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), PaymentError> {
        let next = self.balance.0.checked_add(amount.0).ok_or_else(|| {
            PaymentError::ValidationError(format!("Balance overflow on account {}", self.id))
        })?;
        self.balance = Balance(next);
        self.updated_at = now;
        Ok(())
    }

    /// Removes funds if the balance covers the amount.
    pub fn debit(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), PaymentError> {
        if !self.balance.covers(amount) {
            return Err(PaymentError::InsufficientFunds {
                account: self.id,
                balance: self.balance.0,
                requested: amount.0,
            });
        }
        self.balance = Balance(self.balance.0 - amount.0);
        self.updated_at = now;
        Ok(())
    }
}
