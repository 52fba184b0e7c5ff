//! Adapters for the domain ports: stores and authorizers.

pub mod authorizer;
pub mod in_memory;
pub mod lock_table;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::error::{PaymentError, Result};

/// Compares the version a writer read with the one currently stored.
/// `expected == None` marks an insert, which must not find an existing row.
pub(crate) fn check_version(
    entity: &'static str,
    id: impl ToString,
    stored: Option<u64>,
    expected: Option<u64>,
) -> Result<()> {
    match (stored, expected) {
        (Some(_), None) => Err(PaymentError::AlreadyExists {
            entity,
            id: id.to_string(),
        }),
        (None, Some(_)) => Err(PaymentError::not_found(entity, id)),
        (Some(found), Some(expected)) if found != expected => Err(PaymentError::VersionConflict {
            entity,
            id: id.to_string(),
            expected,
            found,
        }),
        _ => Ok(()),
    }
}
