use crate::application::unit_of_work::UnitOfWork;
use crate::domain::charge::{Charge, ChargeAction, ChargeStatus};
use crate::domain::ids::{ChargeId, UserId};
use crate::domain::ports::{AccountStore, ChargeStore};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Validates and stages a new PENDING charge.
///
/// The self-charge check runs before any lookup; both accounts must exist.
pub async fn create(
    uow: &mut UnitOfWork,
    originator: UserId,
    recipient: UserId,
    amount: Decimal,
    description: Option<String>,
    now: DateTime<Utc>,
) -> Result<Charge> {
    let charge = Charge::new(originator, recipient, amount, description, now)?;
    for id in [originator, recipient] {
        if uow.store().account(id).await?.is_none() {
            return Err(PaymentError::not_found("Account", id));
        }
    }
    uow.insert_charge(charge.clone());
    Ok(charge)
}

/// Locks the charge and checks that `actor` may apply `action` to it.
pub async fn lock_for(
    uow: &mut UnitOfWork,
    id: ChargeId,
    action: ChargeAction,
    actor: UserId,
) -> Result<Charge> {
    let charge = uow.lock_charge(id).await?;
    charge.check(action, actor)?;
    Ok(charge.clone())
}

/// Applies `action` to a charge already locked by the unit of work.
pub fn transition(
    uow: &mut UnitOfWork,
    id: ChargeId,
    action: ChargeAction,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<ChargeStatus> {
    uow.charge_mut(id)?.transition(action, actor, now)
}

/// Which side of a charge a listing is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Sent,
    Received,
}

/// Charges a user sent or received, oldest first. Takes no locks.
pub async fn list<S>(
    store: &S,
    user: UserId,
    side: Side,
    status: Option<ChargeStatus>,
) -> Result<Vec<Charge>>
where
    S: ChargeStore + ?Sized,
{
    let charges = match side {
        Side::Sent => store.charges_by_originator(user).await?,
        Side::Received => store.charges_by_recipient(user).await?,
    };
    Ok(charges
        .into_iter()
        .filter(|c| status.is_none_or(|s| c.status == s))
        .collect())
}

pub async fn find<S>(store: &S, id: ChargeId) -> Result<Charge>
where
    S: ChargeStore + ?Sized,
{
    store
        .charge(id)
        .await?
        .ok_or_else(|| PaymentError::not_found("Charge", id))
}
