//! Application layer containing the ledger's business operations.
//!
//! [`engine::PaymentEngine`] is the entry point. It composes the account
//! ledger, the charge state machine and the transaction recorder inside a
//! [`unit_of_work::UnitOfWork`], which owns the row locks and staged writes of
//! one operation.

pub mod charges;
pub mod engine;
pub mod ledger;
pub mod projections;
pub mod recorder;
pub mod unit_of_work;
