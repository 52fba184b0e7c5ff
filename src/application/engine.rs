use crate::application::charges::{self, Side};
use crate::application::ledger;
use crate::application::projections::{ChargeView, PaymentReceipt, UserSummary};
use crate::application::recorder;
use crate::application::unit_of_work::{DEFAULT_LOCK_TIMEOUT, UnitOfWork};
use crate::domain::account::{Account, Amount, Balance};
use crate::domain::card::CreditCard;
use crate::domain::charge::{Charge, ChargeAction, ChargeStatus};
use crate::domain::ids::{ChargeId, UserId};
use crate::domain::ports::{AccountStore, AuthorizerRef, LedgerStoreRef};
use crate::domain::transaction::{PaymentMethod, Transaction, TransactionType};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The payment orchestrator.
///
/// Every mutating operation runs as one [`UnitOfWork`]: it locks the charge
/// (if any) and then the accounts it touches in ascending id order, applies
/// ledger moves and the charge transition, records the transaction and
/// commits. Any error before the commit drops the unit of work, so a failed
/// operation leaves no trace. The engine is cheap to share behind an `Arc`
/// and safe to call from many tasks at once.
pub struct PaymentEngine {
    store: LedgerStoreRef,
    authorizer: AuthorizerRef,
    lock_timeout: Duration,
}

impl PaymentEngine {
    /// Creates a new `PaymentEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `store` - The transactional store for accounts, charges and transactions.
    /// * `authorizer` - External gate for deposits and credit-card movements.
    pub fn new(store: LedgerStoreRef, authorizer: AuthorizerRef) -> Self {
        Self {
            store,
            authorizer,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Bounds how long an operation waits for each row lock.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    fn begin(&self) -> UnitOfWork {
        UnitOfWork::begin(self.store.clone(), self.lock_timeout)
    }

    async fn require_authorization(&self, denial: &str) -> Result<()> {
        if self.authorizer.authorize().await {
            Ok(())
        } else {
            warn!(reason = denial, "External authorization denied");
            Err(PaymentError::PaymentNotAuthorized(denial.to_string()))
        }
    }

    /// Opens an account with a zero balance under the given id.
    pub async fn open_account(&self, id: UserId, name: &str) -> Result<UserSummary> {
        let account = Account::open(id, name, Utc::now())?;
        let summary = UserSummary::from(&account);
        let mut uow = self.begin();
        uow.insert_account(account);
        uow.commit().await?;
        info!(user = %id, name, "Account opened");
        Ok(summary)
    }

    /// Opens an account under a freshly generated id.
    pub async fn register_account(&self, name: &str) -> Result<UserSummary> {
        self.open_account(UserId::new(), name).await
    }

    pub async fn deposit(&self, user: UserId, amount: Decimal) -> Result<PaymentReceipt> {
        let amount = Amount::new(amount)?;
        if self.store.account(user).await?.is_none() {
            return Err(PaymentError::not_found("Account", user));
        }
        self.require_authorization("Deposit not authorized by external authorizer")
            .await?;

        let now = Utc::now();
        let mut uow = self.begin();
        ledger::locked_read(&mut uow, user).await?;
        ledger::credit(&mut uow, user, amount, now)?;
        let tx = recorder::record(
            &mut uow,
            user,
            None,
            amount,
            TransactionType::Deposit,
            None,
            now,
        );
        uow.commit().await?;

        info!(%user, %amount, transaction = %tx.id, "Deposit completed");
        Ok(PaymentReceipt::approved(&tx, "Deposit completed"))
    }

    pub async fn create_charge(
        &self,
        originator: UserId,
        recipient: UserId,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<ChargeView> {
        let mut uow = self.begin();
        let charge = charges::create(
            &mut uow,
            originator,
            recipient,
            amount,
            description,
            Utc::now(),
        )
        .await?;
        uow.commit().await?;

        info!(charge = %charge.id, %originator, %recipient, amount = %charge.amount, "Charge created");
        self.view(&charge).await
    }

    /// Pays a PENDING charge on behalf of its recipient.
    ///
    /// BALANCE moves the amount from payer to originator. CREDIT_CARD needs
    /// card data and the authorizer's approval, and credits the originator
    /// without touching the payer's balance.
    pub async fn pay_charge(
        &self,
        payer: UserId,
        charge_id: ChargeId,
        method: PaymentMethod,
        card: Option<&CreditCard>,
    ) -> Result<PaymentReceipt> {
        let now = Utc::now();
        let mut uow = self.begin();
        let charge = charges::lock_for(&mut uow, charge_id, ChargeAction::Pay, payer).await?;

        match method {
            PaymentMethod::Balance => {
                ledger::lock_pair(&mut uow, payer, charge.originator).await?;
                ledger::transfer(&mut uow, payer, charge.originator, charge.amount, now)?;
            }
            PaymentMethod::CreditCard => {
                let card = card.filter(|c| c.is_present()).ok_or_else(|| {
                    PaymentError::ValidationError("Credit card data is required".to_string())
                })?;
                debug!(charge = %charge_id, card = %card.masked(), "Authorizing card payment");
                self.require_authorization("Payment not authorized").await?;
                ledger::locked_read(&mut uow, charge.originator).await?;
                ledger::credit(&mut uow, charge.originator, charge.amount, now)?;
            }
        }

        charges::transition(&mut uow, charge_id, ChargeAction::Pay, payer, now)?;
        let tx = recorder::record(
            &mut uow,
            payer,
            Some(charge_id),
            charge.amount,
            TransactionType::Payment,
            Some(method),
            now,
        );
        uow.commit().await?;

        info!(charge = %charge_id, %payer, %method, amount = %charge.amount, "Charge paid");
        Ok(PaymentReceipt::approved(&tx, "Payment completed"))
    }

    /// Cancels a PENDING charge. Either party may cancel; no money moves.
    pub async fn cancel_charge(&self, charge_id: ChargeId, actor: UserId) -> Result<ChargeView> {
        let mut uow = self.begin();
        charges::lock_for(&mut uow, charge_id, ChargeAction::Cancel, actor).await?;
        charges::transition(&mut uow, charge_id, ChargeAction::Cancel, actor, Utc::now())?;
        let charge = uow.charge(charge_id)?.clone();
        uow.commit().await?;

        info!(charge = %charge_id, %actor, "Charge cancelled");
        self.view(&charge).await
    }

    /// Refunds a PAID charge and cancels it, on behalf of its originator.
    ///
    /// The refund mirrors the original payment's method. Either the refund,
    /// the ledger moves and the transition all commit, or nothing does and the
    /// charge stays PAID.
    pub async fn reverse_charge(&self, charge_id: ChargeId, actor: UserId) -> Result<PaymentReceipt> {
        let now = Utc::now();
        let mut uow = self.begin();
        let charge = charges::lock_for(&mut uow, charge_id, ChargeAction::Reverse, actor).await?;
        let payment = recorder::original_payment(self.store.as_ref(), charge_id).await?;
        let method = payment.payment_method.unwrap_or(PaymentMethod::Balance);
        let payer = charge.recipient;
        let shortfall = || {
            PaymentError::BusinessError(format!(
                "Originator {} has insufficient balance to refund charge {}",
                charge.originator, charge_id
            ))
        };

        match method {
            PaymentMethod::Balance => {
                ledger::lock_pair(&mut uow, charge.originator, payer).await?;
                if !uow.account(charge.originator)?.balance.covers(charge.amount) {
                    return Err(shortfall());
                }
                ledger::transfer(&mut uow, charge.originator, payer, charge.amount, now)?;
            }
            PaymentMethod::CreditCard => {
                let balance = ledger::locked_read(&mut uow, charge.originator).await?;
                if !balance.covers(charge.amount) {
                    return Err(shortfall());
                }
                self.require_authorization("Refund not authorized by external authorizer")
                    .await?;
                ledger::debit(&mut uow, charge.originator, charge.amount, now)?;
            }
        }

        charges::transition(&mut uow, charge_id, ChargeAction::Reverse, actor, now)?;
        let tx = recorder::record(
            &mut uow,
            payer,
            Some(charge_id),
            charge.amount,
            TransactionType::Refund,
            Some(method),
            now,
        );
        uow.commit().await?;

        info!(charge = %charge_id, %payer, %method, amount = %charge.amount, "Charge reversed");
        Ok(PaymentReceipt::approved(&tx, "Refund completed"))
    }

    async fn account(&self, user: UserId) -> Result<Account> {
        self.store
            .account(user)
            .await?
            .ok_or_else(|| PaymentError::not_found("Account", user))
    }

    async fn view(&self, charge: &Charge) -> Result<ChargeView> {
        let originator = self.account(charge.originator).await?;
        let recipient = self.account(charge.recipient).await?;
        Ok(ChargeView::new(
            charge,
            UserSummary::from(&originator),
            UserSummary::from(&recipient),
        ))
    }

    async fn views(&self, charges: Vec<Charge>) -> Result<Vec<ChargeView>> {
        let mut views = Vec::with_capacity(charges.len());
        for charge in &charges {
            views.push(self.view(charge).await?);
        }
        Ok(views)
    }

    /// Latest committed balance. Takes no locks.
    pub async fn balance(&self, user: UserId) -> Result<Balance> {
        Ok(self.account(user).await?.balance)
    }

    pub async fn user_summary(&self, user: UserId) -> Result<UserSummary> {
        Ok(UserSummary::from(&self.account(user).await?))
    }

    /// Every account, sorted by name.
    pub async fn accounts(&self) -> Result<Vec<UserSummary>> {
        let mut summaries: Vec<UserSummary> = self
            .store
            .accounts()
            .await?
            .iter()
            .map(UserSummary::from)
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }

    pub async fn sent_charges(
        &self,
        user: UserId,
        status: Option<ChargeStatus>,
    ) -> Result<Vec<ChargeView>> {
        let charges = charges::list(self.store.as_ref(), user, Side::Sent, status).await?;
        self.views(charges).await
    }

    pub async fn received_charges(
        &self,
        user: UserId,
        status: Option<ChargeStatus>,
    ) -> Result<Vec<ChargeView>> {
        let charges = charges::list(self.store.as_ref(), user, Side::Received, status).await?;
        self.views(charges).await
    }

    pub async fn find_charge(&self, charge_id: ChargeId) -> Result<ChargeView> {
        let charge = charges::find(self.store.as_ref(), charge_id).await?;
        self.view(&charge).await
    }

    /// The user's transaction history, oldest first.
    pub async fn statement(&self, user: UserId) -> Result<Vec<Transaction>> {
        self.account(user).await?;
        recorder::statement(self.store.as_ref(), user).await
    }
}
