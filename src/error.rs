use crate::domain::charge::{ChargeAction, ChargeStatus};
use crate::domain::ids::{ChargeId, UserId};
use crate::domain::ports::LockKey;
use miette::Diagnostic;
use rust_decimal::Decimal;
use thiserror::Error;

/// Every failure the ledger core can surface.
///
/// Business variants are raised before a unit of work commits, so none of them
/// ever leaves partially applied state behind. `status_code` gives the
/// HTTP-equivalent class callers should map them to.
#[derive(Error, Diagnostic, Debug)]
pub enum PaymentError {
    #[error("{entity} {id} not found")]
    #[diagnostic(code(paygate::not_found))]
    NotFound { entity: &'static str, id: String },

    #[error("Validation error: {0}")]
    #[diagnostic(code(paygate::validation))]
    ValidationError(String),

    #[error("Charge {charge} cannot {action} while {status}")]
    #[diagnostic(code(paygate::invalid_state))]
    InvalidState {
        charge: ChargeId,
        status: ChargeStatus,
        action: ChargeAction,
    },

    #[error("Invalid operation: {0}")]
    #[diagnostic(code(paygate::invalid_operation))]
    InvalidOperation(String),

    #[error("User {actor} is not allowed to {action} charge {charge}")]
    #[diagnostic(code(paygate::unauthorized))]
    Unauthorized {
        actor: UserId,
        charge: ChargeId,
        action: ChargeAction,
    },

    #[error("Insufficient funds for account {account}: balance {balance}, requested {requested}")]
    #[diagnostic(code(paygate::insufficient_funds))]
    InsufficientFunds {
        account: UserId,
        balance: Decimal,
        requested: Decimal,
    },

    #[error("Payment not authorized: {0}")]
    #[diagnostic(
        code(paygate::payment_not_authorized),
        help("the external authorizer denied or could not be reached")
    )]
    PaymentNotAuthorized(String),

    #[error("{0}")]
    #[diagnostic(code(paygate::business))]
    BusinessError(String),

    #[error("{entity} {id} already exists")]
    #[diagnostic(code(paygate::already_exists))]
    AlreadyExists { entity: &'static str, id: String },

    #[error("Timed out waiting for lock on {0}")]
    #[diagnostic(code(paygate::lock_timeout))]
    LockTimeout(LockKey),

    #[error("Concurrent modification of {entity} {id}: expected version {expected}, found {found}")]
    #[diagnostic(code(paygate::version_conflict))]
    VersionConflict {
        entity: &'static str,
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(paygate::config))]
    Config(String),

    #[error("CSV error: {0}")]
    #[diagnostic(code(paygate::csv))]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(paygate::io))]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(paygate::internal))]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, PaymentError>;

impl PaymentError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        PaymentError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PaymentError::InternalError(Box::new(std::io::Error::other(message.into())))
    }

    /// HTTP-equivalent status class for the error.
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::NotFound { .. } => 404,
            PaymentError::ValidationError(_)
            | PaymentError::InvalidState { .. }
            | PaymentError::InvalidOperation(_)
            | PaymentError::InsufficientFunds { .. }
            | PaymentError::BusinessError(_) => 400,
            PaymentError::PaymentNotAuthorized(_) => 402,
            PaymentError::Unauthorized { .. } => 403,
            PaymentError::AlreadyExists { .. } | PaymentError::VersionConflict { .. } => 409,
            PaymentError::LockTimeout(_) => 503,
            PaymentError::Config(_)
            | PaymentError::CsvError(_)
            | PaymentError::IoError(_)
            | PaymentError::InternalError(_) => 500,
        }
    }

    /// True for failures caused by the request itself rather than the system.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(e: rocksdb::Error) -> Self {
        PaymentError::InternalError(Box::new(e))
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(e: serde_json::Error) -> Self {
        PaymentError::InternalError(Box::new(e))
    }
}
