use crate::domain::account::Account;
use crate::domain::charge::Charge;
use crate::domain::ids::{ChargeId, UserId};
use crate::domain::ports::{
    AccountStore, ChangeSet, ChargeStore, LedgerStore, LockKey, RowLock, TransactionStore,
};
use crate::domain::transaction::Transaction;
use crate::error::Result;
use crate::infrastructure::check_version;
use crate::infrastructure::lock_table::LockTable;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<UserId, Account>,
    charges: HashMap<ChargeId, Charge>,
    transactions: Vec<Transaction>,
}

/// A thread-safe in-memory ledger store.
///
/// All three tables sit behind one `RwLock`, so a commit is a single write
/// critical section with no `.await` inside: it either lands whole or, if the
/// version checks fail, not at all. Cloning shares the underlying state.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
    locks: Arc<LockTable>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryLedgerStore {
    async fn account(&self, id: UserId) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.values().cloned().collect())
    }
}

#[async_trait]
impl ChargeStore for InMemoryLedgerStore {
    async fn charge(&self, id: ChargeId) -> Result<Option<Charge>> {
        let state = self.state.read().await;
        Ok(state.charges.get(&id).cloned())
    }

    async fn charges_by_originator(&self, user: UserId) -> Result<Vec<Charge>> {
        let state = self.state.read().await;
        let mut charges: Vec<Charge> = state
            .charges
            .values()
            .filter(|c| c.originator == user)
            .cloned()
            .collect();
        charges.sort_by_key(|c| (c.created_at, c.id));
        Ok(charges)
    }

    async fn charges_by_recipient(&self, user: UserId) -> Result<Vec<Charge>> {
        let state = self.state.read().await;
        let mut charges: Vec<Charge> = state
            .charges
            .values()
            .filter(|c| c.recipient == user)
            .cloned()
            .collect();
        charges.sort_by_key(|c| (c.created_at, c.id));
        Ok(charges)
    }
}

#[async_trait]
impl TransactionStore for InMemoryLedgerStore {
    async fn transactions_by_charge(&self, charge: ChargeId) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.charge_id == Some(charge))
            .cloned()
            .collect())
    }

    async fn transactions_by_user(&self, user: UserId) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.user_id == user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn lock(&self, key: LockKey) -> Result<RowLock> {
        Ok(self.locks.acquire(key).await)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut state = self.state.write().await;

        for write in &changes.accounts {
            let stored = state.accounts.get(&write.row.id).map(|a| a.version);
            check_version("Account", write.row.id, stored, write.expected_version)?;
        }
        for write in &changes.charges {
            let stored = state.charges.get(&write.row.id).map(|c| c.version);
            check_version("Charge", write.row.id, stored, write.expected_version)?;
        }

        for write in changes.accounts {
            state.accounts.insert(write.row.id, write.row);
        }
        for write in changes.charges {
            state.charges.insert(write.row.id, write.row);
        }
        state.transactions.extend(changes.transactions);
        Ok(())
    }
}
