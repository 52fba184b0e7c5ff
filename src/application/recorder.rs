use crate::application::unit_of_work::UnitOfWork;
use crate::domain::account::Amount;
use crate::domain::ids::{ChargeId, UserId};
use crate::domain::ports::TransactionStore;
use crate::domain::transaction::{PaymentMethod, Transaction, TransactionType};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};

pub const DEPOSIT_DESCRIPTION: &str = "Balance deposit";
pub const BALANCE_PAYMENT_DESCRIPTION: &str = "Charge payment with balance";
pub const CARD_PAYMENT_DESCRIPTION: &str = "Charge payment with credit card";
pub const BALANCE_REFUND_DESCRIPTION: &str = "Refund of cancelled charge";
pub const CARD_REFUND_DESCRIPTION: &str = "Refund of cancelled charge via credit card";

/// Stages an entry in the unit of work and returns a copy of it. Nothing is
/// visible until the unit of work commits.
pub fn record(
    uow: &mut UnitOfWork,
    user: UserId,
    charge: Option<ChargeId>,
    amount: Amount,
    kind: TransactionType,
    method: Option<PaymentMethod>,
    now: DateTime<Utc>,
) -> Transaction {
    let description = match (kind, method) {
        (TransactionType::Deposit, _) => DEPOSIT_DESCRIPTION,
        (TransactionType::Payment, Some(PaymentMethod::CreditCard)) => CARD_PAYMENT_DESCRIPTION,
        (TransactionType::Payment, _) => BALANCE_PAYMENT_DESCRIPTION,
        (TransactionType::Refund, Some(PaymentMethod::CreditCard)) => CARD_REFUND_DESCRIPTION,
        (TransactionType::Refund, _) => BALANCE_REFUND_DESCRIPTION,
    };
    let transaction = Transaction::new(user, charge, amount, kind, method, description, now);
    uow.append(transaction.clone());
    transaction
}

/// Entries for a charge, oldest first.
pub async fn find_by_charge<S>(store: &S, charge: ChargeId) -> Result<Vec<Transaction>>
where
    S: TransactionStore + ?Sized,
{
    store.transactions_by_charge(charge).await
}

/// The payment a reversal has to undo.
pub async fn original_payment<S>(store: &S, charge: ChargeId) -> Result<Transaction>
where
    S: TransactionStore + ?Sized,
{
    find_by_charge(store, charge)
        .await?
        .into_iter()
        .find(|tx| tx.r#type == TransactionType::Payment)
        .ok_or_else(|| {
            PaymentError::BusinessError(format!("No payment recorded for charge {}", charge))
        })
}

/// Every entry recorded against a user, oldest first.
pub async fn statement<S>(store: &S, user: UserId) -> Result<Vec<Transaction>>
where
    S: TransactionStore + ?Sized,
{
    store.transactions_by_user(user).await
}
