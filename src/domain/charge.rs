//! Charge lifecycle.
//!
//! All legal moves live in [`ChargeStatus::next`]; nothing else in the crate
//! assigns `Charge::status`. Legal edges:
//!
//! ```text
//! PENDING --pay-----> PAID --reverse--> CANCELLED
//! PENDING --cancel--> CANCELLED
//! ```

use crate::domain::account::Amount;
use crate::domain::ids::{ChargeId, UserId};
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeStatus {
    Pending,
    Paid,
    Cancelled,
}

/// Something an actor can attempt on a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeAction {
    Pay,
    Cancel,
    Reverse,
}

/// The role an actor plays on a given charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    /// Created the charge and receives the money.
    Originator,
    /// Owes and pays the charge.
    Recipient,
}

impl ChargeStatus {
    /// Transition table. `None` means the edge does not exist.
    pub fn next(self, action: ChargeAction) -> Option<ChargeStatus> {
        match (self, action) {
            (ChargeStatus::Pending, ChargeAction::Pay) => Some(ChargeStatus::Paid),
            (ChargeStatus::Pending, ChargeAction::Cancel) => Some(ChargeStatus::Cancelled),
            (ChargeStatus::Paid, ChargeAction::Reverse) => Some(ChargeStatus::Cancelled),
            _ => None,
        }
    }
}

impl ChargeAction {
    /// Permission table.
    pub fn permits(self, party: Party) -> bool {
        match self {
            ChargeAction::Pay => party == Party::Recipient,
            ChargeAction::Cancel => true,
            ChargeAction::Reverse => party == Party::Originator,
        }
    }
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChargeStatus::Pending => "PENDING",
            ChargeStatus::Paid => "PAID",
            ChargeStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ChargeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChargeAction::Pay => "pay",
            ChargeAction::Cancel => "cancel",
            ChargeAction::Reverse => "reverse",
        };
        f.write_str(s)
    }
}

/// A request for payment from `recipient` to `originator`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Charge {
    pub id: ChargeId,
    pub originator: UserId,
    pub recipient: UserId,
    pub amount: Amount,
    pub description: Option<String>,
    pub status: ChargeStatus,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Charge {
    /// Builds a new PENDING charge. Self-charges are rejected before anything
    /// else is looked at.
    pub fn new(
        originator: UserId,
        recipient: UserId,
        amount: rust_decimal::Decimal,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, PaymentError> {
        if originator == recipient {
            return Err(PaymentError::InvalidOperation(
                "Cannot create a charge against yourself".to_string(),
            ));
        }
        let amount = Amount::new(amount)?;
        let description = description.filter(|d| !d.trim().is_empty());
        if let Some(d) = &description
            && d.chars().count() > MAX_DESCRIPTION_LEN
        {
            return Err(PaymentError::ValidationError(format!(
                "Description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }

        Ok(Self {
            id: ChargeId::new(),
            originator,
            recipient,
            amount,
            description,
            status: ChargeStatus::Pending,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn party(&self, actor: UserId) -> Option<Party> {
        if actor == self.originator {
            Some(Party::Originator)
        } else if actor == self.recipient {
            Some(Party::Recipient)
        } else {
            None
        }
    }

    /// Checks whether `actor` may perform `action` right now, without changing
    /// anything. Returns the status the charge would move to.
    pub fn check(&self, action: ChargeAction, actor: UserId) -> Result<ChargeStatus, PaymentError> {
        let unauthorized = || PaymentError::Unauthorized {
            actor,
            charge: self.id,
            action,
        };
        let party = self.party(actor).ok_or_else(unauthorized)?;
        let next = self.status.next(action).ok_or(PaymentError::InvalidState {
            charge: self.id,
            status: self.status,
            action,
        })?;
        if !action.permits(party) {
            return Err(unauthorized());
        }
        Ok(next)
    }

    /// Applies `action` on behalf of `actor`, or leaves the charge untouched
    /// and returns why it is illegal.
    pub fn transition(
        &mut self,
        action: ChargeAction,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<ChargeStatus, PaymentError> {
        let next = self.check(action, actor)?;
        self.status = next;
        self.updated_at = now;
        Ok(next)
    }
}
