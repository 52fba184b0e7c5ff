use crate::domain::account::Account;
use crate::domain::charge::Charge;
use crate::domain::ids::{ChargeId, UserId};
use crate::domain::ports::{
    AccountStore, ChangeSet, ChargeStore, LedgerStore, LedgerStoreRef, LockKey, RowLock, Versioned,
};
use crate::domain::transaction::Transaction;
use crate::error::{PaymentError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

struct Staged<T> {
    row: T,
    expected_version: Option<u64>,
    dirty: bool,
}

impl<T> Staged<T> {
    fn loaded(row: T, version: u64) -> Self {
        Self {
            row,
            expected_version: Some(version),
            dirty: false,
        }
    }

    fn inserted(row: T) -> Self {
        Self {
            row,
            expected_version: None,
            dirty: true,
        }
    }
}

/// One atomic ledger operation.
///
/// Holds row locks and staged writes. Rows can only be modified after their
/// lock is held; locks must be taken in [`LockKey`] order. `commit` hands every
/// staged write to the store as one change set. Dropping the unit of work
/// without committing (an early `?`, a cancelled future, an aborted task)
/// releases the locks and discards the writes.
pub struct UnitOfWork {
    store: LedgerStoreRef,
    lock_timeout: Duration,
    held: BTreeMap<LockKey, RowLock>,
    accounts: BTreeMap<UserId, Staged<Account>>,
    charges: BTreeMap<ChargeId, Staged<Charge>>,
    transactions: Vec<Transaction>,
}

impl UnitOfWork {
    pub fn begin(store: LedgerStoreRef, lock_timeout: Duration) -> Self {
        Self {
            store,
            lock_timeout,
            held: BTreeMap::new(),
            accounts: BTreeMap::new(),
            charges: BTreeMap::new(),
            transactions: Vec::new(),
        }
    }

    pub fn store(&self) -> &LedgerStoreRef {
        &self.store
    }

    async fn lock(&mut self, key: LockKey) -> Result<()> {
        if self.held.contains_key(&key) {
            return Ok(());
        }
        if let Some(last) = self.held.keys().next_back()
            && *last > key
        {
            return Err(PaymentError::internal(format!(
                "lock on {} requested after {}",
                key, last
            )));
        }
        let guard = tokio::time::timeout(self.lock_timeout, self.store.lock(key))
            .await
            .map_err(|_| PaymentError::LockTimeout(key))??;
        debug!(%key, "lock acquired");
        self.held.insert(key, guard);
        Ok(())
    }

    /// Locks a charge and loads its latest committed state.
    pub async fn lock_charge(&mut self, id: ChargeId) -> Result<&Charge> {
        self.lock(LockKey::Charge(id)).await?;
        if !self.charges.contains_key(&id) {
            let charge = self
                .store
                .charge(id)
                .await?
                .ok_or_else(|| PaymentError::not_found("Charge", id))?;
            let version = charge.version;
            self.charges.insert(id, Staged::loaded(charge, version));
        }
        self.charge(id)
    }

    /// Locks accounts in ascending id order and loads them.
    pub async fn lock_accounts(&mut self, ids: &[UserId]) -> Result<()> {
        let ordered: BTreeSet<UserId> = ids.iter().copied().collect();
        for id in ordered {
            self.lock(LockKey::Account(id)).await?;
            if self.accounts.contains_key(&id) {
                continue;
            }
            let account = self
                .store
                .account(id)
                .await?
                .ok_or_else(|| PaymentError::not_found("Account", id))?;
            let version = account.version;
            self.accounts.insert(id, Staged::loaded(account, version));
        }
        Ok(())
    }

    pub fn account(&self, id: UserId) -> Result<&Account> {
        self.accounts
            .get(&id)
            .map(|s| &s.row)
            .ok_or_else(|| not_held(LockKey::Account(id)))
    }

    pub fn account_mut(&mut self, id: UserId) -> Result<&mut Account> {
        let staged = self
            .accounts
            .get_mut(&id)
            .ok_or_else(|| not_held(LockKey::Account(id)))?;
        staged.dirty = true;
        Ok(&mut staged.row)
    }

    pub fn charge(&self, id: ChargeId) -> Result<&Charge> {
        self.charges
            .get(&id)
            .map(|s| &s.row)
            .ok_or_else(|| not_held(LockKey::Charge(id)))
    }

    pub fn charge_mut(&mut self, id: ChargeId) -> Result<&mut Charge> {
        let staged = self
            .charges
            .get_mut(&id)
            .ok_or_else(|| not_held(LockKey::Charge(id)))?;
        staged.dirty = true;
        Ok(&mut staged.row)
    }

    /// Stages a brand-new account. The commit fails if the id is taken.
    pub fn insert_account(&mut self, account: Account) {
        self.accounts.insert(account.id, Staged::inserted(account));
    }

    pub fn insert_charge(&mut self, charge: Charge) {
        self.charges.insert(charge.id, Staged::inserted(charge));
    }

    pub fn append(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    /// Applies every staged write atomically, then releases the locks.
    pub async fn commit(mut self) -> Result<()> {
        let changes = ChangeSet {
            accounts: drain_dirty(&mut self.accounts, |a, v| a.version = v),
            charges: drain_dirty(&mut self.charges, |c, v| c.version = v),
            transactions: std::mem::take(&mut self.transactions),
        };
        if changes.is_empty() {
            return Ok(());
        }
        debug!(
            accounts = changes.accounts.len(),
            charges = changes.charges.len(),
            transactions = changes.transactions.len(),
            "committing unit of work"
        );
        self.store.commit(changes).await
    }
}

fn not_held(key: LockKey) -> PaymentError {
    PaymentError::internal(format!("{} was not locked by this unit of work", key))
}

fn drain_dirty<K, T>(
    rows: &mut BTreeMap<K, Staged<T>>,
    set_version: impl Fn(&mut T, u64),
) -> Vec<Versioned<T>> {
    std::mem::take(rows)
        .into_values()
        .filter(|s| s.dirty)
        .map(|mut s| {
            if let Some(v) = s.expected_version {
                set_version(&mut s.row, v + 1);
            }
            Versioned {
                row: s.row,
                expected_version: s.expected_version,
            }
        })
        .collect()
}
