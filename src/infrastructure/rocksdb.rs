use crate::domain::account::Account;
use crate::domain::charge::Charge;
use crate::domain::ids::{ChargeId, TransactionId, UserId};
use crate::domain::ports::{
    AccountStore, ChangeSet, ChargeStore, LedgerStore, LockKey, RowLock, TransactionStore,
};
use crate::domain::transaction::Transaction;
use crate::error::{PaymentError, Result};
use crate::infrastructure::check_version;
use crate::infrastructure::lock_table::LockTable;
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for account rows.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for charge rows.
pub const CF_CHARGES: &str = "charges";
/// Column Family for transaction rows, keyed by time-ordered transaction id.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Index: `charge_id || transaction_id -> ()`.
pub const CF_CHARGE_TRANSACTIONS: &str = "charge_transactions";
/// Index: `user_id || transaction_id -> ()`.
pub const CF_USER_TRANSACTIONS: &str = "user_transactions";

const COLUMN_FAMILIES: [&str; 5] = [
    CF_ACCOUNTS,
    CF_CHARGES,
    CF_TRANSACTIONS,
    CF_CHARGE_TRANSACTIONS,
    CF_USER_TRANSACTIONS,
];

/// A persistent ledger store backed by RocksDB.
///
/// Each entity lives in its own Column Family; two index families map charges
/// and users to their transactions. A commit is a single `WriteBatch`, and the
/// version checks plus the batch write run under `commit_lock` so no other
/// commit can interleave between them.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    locks: Arc<LockTable>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            locks: Arc::new(LockTable::new()),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::internal(format!("Column family {} not found", name)))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    /// Loads transactions through an index family whose keys are
    /// `prefix || transaction_id`. Keys sort by transaction id, so results come
    /// back in recording order.
    fn indexed_transactions(&self, index: &str, prefix: &[u8; 16]) -> Result<Vec<Transaction>> {
        let cf = self.cf(index)?;
        let mut transactions = Vec::new();
        for item in self.db.prefix_iterator_cf(cf, prefix) {
            let (key, _) = item?;
            // No prefix extractor is configured, so stop at the first foreign key.
            if !key.starts_with(prefix) {
                break;
            }
            let tx_key = &key[prefix.len()..];
            let tx: Transaction = self.get_json(CF_TRANSACTIONS, tx_key)?.ok_or_else(|| {
                PaymentError::internal(format!(
                    "Index {} points at a missing transaction",
                    index
                ))
            })?;
            transactions.push(tx);
        }
        Ok(transactions)
    }

    fn put_json<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        key: &[u8],
        value: &T,
    ) -> Result<()> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(cf, key, serde_json::to_vec(value)?);
        Ok(())
    }

    fn stored_version<T: DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
        version: impl Fn(&T) -> u64,
    ) -> Result<Option<u64>> {
        Ok(self.get_json::<T>(cf_name, key)?.map(|row| version(&row)))
    }
}

fn index_key(prefix: &[u8; 16], tx: &TransactionId) -> Vec<u8> {
    let mut key = prefix.to_vec();
    key.extend_from_slice(tx.as_bytes());
    key
}

#[async_trait]
impl AccountStore for RocksDBStore {
    async fn account(&self, id: UserId) -> Result<Option<Account>> {
        self.get_json(CF_ACCOUNTS, id.as_bytes())
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        self.scan_json(CF_ACCOUNTS)
    }
}

#[async_trait]
impl ChargeStore for RocksDBStore {
    async fn charge(&self, id: ChargeId) -> Result<Option<Charge>> {
        self.get_json(CF_CHARGES, id.as_bytes())
    }

    async fn charges_by_originator(&self, user: UserId) -> Result<Vec<Charge>> {
        let mut charges: Vec<Charge> = self
            .scan_json::<Charge>(CF_CHARGES)?
            .into_iter()
            .filter(|c| c.originator == user)
            .collect();
        charges.sort_by_key(|c| (c.created_at, c.id));
        Ok(charges)
    }

    async fn charges_by_recipient(&self, user: UserId) -> Result<Vec<Charge>> {
        let mut charges: Vec<Charge> = self
            .scan_json::<Charge>(CF_CHARGES)?
            .into_iter()
            .filter(|c| c.recipient == user)
            .collect();
        charges.sort_by_key(|c| (c.created_at, c.id));
        Ok(charges)
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn transactions_by_charge(&self, charge: ChargeId) -> Result<Vec<Transaction>> {
        self.indexed_transactions(CF_CHARGE_TRANSACTIONS, charge.as_bytes())
    }

    async fn transactions_by_user(&self, user: UserId) -> Result<Vec<Transaction>> {
        self.indexed_transactions(CF_USER_TRANSACTIONS, user.as_bytes())
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn lock(&self, key: LockKey) -> Result<RowLock> {
        Ok(self.locks.acquire(key).await)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let _serialized = self.commit_lock.lock().await;

        for write in &changes.accounts {
            let stored =
                self.stored_version::<Account>(CF_ACCOUNTS, write.row.id.as_bytes(), |a| a.version)?;
            check_version("Account", write.row.id, stored, write.expected_version)?;
        }
        for write in &changes.charges {
            let stored =
                self.stored_version::<Charge>(CF_CHARGES, write.row.id.as_bytes(), |c| c.version)?;
            check_version("Charge", write.row.id, stored, write.expected_version)?;
        }

        let mut batch = WriteBatch::default();
        for write in &changes.accounts {
            self.put_json(&mut batch, CF_ACCOUNTS, write.row.id.as_bytes(), &write.row)?;
        }
        for write in &changes.charges {
            self.put_json(&mut batch, CF_CHARGES, write.row.id.as_bytes(), &write.row)?;
        }
        for tx in &changes.transactions {
            self.put_json(&mut batch, CF_TRANSACTIONS, tx.id.as_bytes(), tx)?;
            batch.put_cf(
                self.cf(CF_USER_TRANSACTIONS)?,
                index_key(tx.user_id.as_bytes(), &tx.id),
                b"",
            );
            if let Some(charge) = tx.charge_id {
                batch.put_cf(
                    self.cf(CF_CHARGE_TRANSACTIONS)?,
                    index_key(charge.as_bytes(), &tx.id),
                    b"",
                );
            }
        }

        self.db.write(batch)?;
        tracing::debug!(
            accounts = changes.accounts.len(),
            charges = changes.charges.len(),
            transactions = changes.transactions.len(),
            "RocksDB batch committed"
        );
        Ok(())
    }
}
