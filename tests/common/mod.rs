#![allow(dead_code)]

use async_trait::async_trait;
use paygate_ledger::application::engine::PaymentEngine;
use paygate_ledger::domain::ids::UserId;
use paygate_ledger::domain::ports::Authorizer;
use paygate_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Authorizer whose answer and latency tests can change at runtime.
#[derive(Debug)]
pub struct ScriptedAuthorizer {
    approve: AtomicBool,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedAuthorizer {
    pub fn new(approve: bool) -> Arc<Self> {
        Self::slow(approve, Duration::ZERO)
    }

    pub fn slow(approve: bool, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            approve: AtomicBool::new(approve),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_approve(&self, approve: bool) {
        self.approve.store(approve, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authorizer for ScriptedAuthorizer {
    async fn authorize(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.approve.load(Ordering::SeqCst)
    }
}

pub fn engine_with(authorizer: Arc<ScriptedAuthorizer>) -> PaymentEngine {
    PaymentEngine::new(Arc::new(InMemoryLedgerStore::new()), authorizer)
}

/// Registers `name` and deposits `amount` when it is positive.
pub async fn funded(engine: &PaymentEngine, name: &str, amount: Decimal) -> UserId {
    let user = engine.register_account(name).await.unwrap().id;
    if amount > Decimal::ZERO {
        engine.deposit(user, amount).await.unwrap();
    }
    user
}

pub async fn total_balance(engine: &PaymentEngine) -> Decimal {
    engine
        .accounts()
        .await
        .unwrap()
        .iter()
        .map(|a| a.balance.value())
        .sum()
}

/// Writes a script that registers two users, funds the payer and has them
/// settle `charges` balance charges.
pub fn generate_script(path: &Path, charges: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(file);

    wtr.write_record([
        "type",
        "actor",
        "counterparty",
        "charge",
        "amount",
        "method",
        "card",
        "description",
    ])?;
    wtr.write_record(["register", "alice"])?;
    wtr.write_record(["register", "bob"])?;
    wtr.write_record(["deposit", "bob", "", "", charges.to_string().as_str()])?;

    for i in 1..=charges {
        let label = format!("c{}", i);
        wtr.write_record(["charge", "alice", "bob", label.as_str(), "1.00"])?;
        wtr.write_record(["pay", "bob", "", label.as_str(), "", "balance"])?;
    }

    wtr.flush()?;
    Ok(())
}
