//! Account ledger: balance mutations inside a unit of work.
//!
//! Every function here requires the account to be locked by the unit of work
//! already, which is what makes a read-then-write on a balance safe.

use crate::application::unit_of_work::UnitOfWork;
use crate::domain::account::{Amount, Balance};
use crate::domain::ids::UserId;
use crate::error::Result;
use chrono::{DateTime, Utc};

/// Takes an exclusive hold on the account for the rest of the unit of work and
/// returns its current balance.
pub async fn locked_read(uow: &mut UnitOfWork, id: UserId) -> Result<Balance> {
    uow.lock_accounts(&[id]).await?;
    Ok(uow.account(id)?.balance)
}

/// Locks both sides of a transfer, lower id first.
pub async fn lock_pair(uow: &mut UnitOfWork, a: UserId, b: UserId) -> Result<()> {
    uow.lock_accounts(&[a, b]).await
}

pub fn credit(uow: &mut UnitOfWork, id: UserId, amount: Amount, now: DateTime<Utc>) -> Result<()> {
    uow.account_mut(id)?.credit(amount, now)
}

pub fn debit(uow: &mut UnitOfWork, id: UserId, amount: Amount, now: DateTime<Utc>) -> Result<()> {
    uow.account_mut(id)?.debit(amount, now)
}

/// Moves `amount` from one locked account to another. Fails without touching
/// either balance when `from` is short.
pub fn transfer(
    uow: &mut UnitOfWork,
    from: UserId,
    to: UserId,
    amount: Amount,
    now: DateTime<Utc>,
) -> Result<()> {
    debit(uow, from, amount, now)?;
    credit(uow, to, amount, now)
}
