use super::account::Account;
use super::charge::Charge;
use super::ids::{ChargeId, UserId};
use super::transaction::Transaction;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Exclusive hold on one row, released when dropped.
///
/// Adapters wrap whatever guard they use; the hold is opaque to callers.
pub struct RowLock {
    _hold: Box<dyn Send + Sync>,
}

impl RowLock {
    pub fn new(hold: impl Send + Sync + 'static) -> Self {
        Self {
            _hold: Box::new(hold),
        }
    }
}

impl fmt::Debug for RowLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RowLock")
    }
}

/// A lockable row.
///
/// The derived ordering puts every charge before every account, and accounts
/// in ascending id order. Units of work acquire locks in this order only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    Charge(ChargeId),
    Account(UserId),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Charge(id) => write!(f, "charge {}", id),
            LockKey::Account(id) => write!(f, "account {}", id),
        }
    }
}

/// A staged row write. `expected_version` is `None` for inserts.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub row: T,
    pub expected_version: Option<u64>,
}

/// Everything a unit of work wants to persist. Applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub accounts: Vec<Versioned<Account>>,
    pub charges: Vec<Versioned<Charge>>,
    pub transactions: Vec<Transaction>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.charges.is_empty() && self.transactions.is_empty()
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn account(&self, id: UserId) -> Result<Option<Account>>;
    async fn accounts(&self) -> Result<Vec<Account>>;
}

#[async_trait]
pub trait ChargeStore: Send + Sync {
    async fn charge(&self, id: ChargeId) -> Result<Option<Charge>>;
    async fn charges_by_originator(&self, user: UserId) -> Result<Vec<Charge>>;
    async fn charges_by_recipient(&self, user: UserId) -> Result<Vec<Charge>>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Entries for a charge in the order they were recorded.
    async fn transactions_by_charge(&self, charge: ChargeId) -> Result<Vec<Transaction>>;
    /// Entries recorded against a user in the order they were recorded.
    async fn transactions_by_user(&self, user: UserId) -> Result<Vec<Transaction>>;
}

/// The transactional store the ledger runs on.
///
/// Reads see the latest committed state. `lock` grants a per-row exclusive
/// hold; `commit` applies a change set atomically, rejecting it whole when a
/// row's stored version differs from the one the writer read.
#[async_trait]
pub trait LedgerStore: AccountStore + ChargeStore + TransactionStore {
    async fn lock(&self, key: LockKey) -> Result<RowLock>;
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;

/// External yes/no gate for card payments, refunds and deposits.
///
/// Implementations must fail closed: any error or timeout is `false`.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self) -> bool;
}

pub type AuthorizerRef = Arc<dyn Authorizer>;
