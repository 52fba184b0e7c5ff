use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $generate:path) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self($generate())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// Opaque identifier of a user and of the account they own.
    UserId,
    Uuid::new_v4
);

entity_id!(
    /// Opaque identifier of a charge.
    ChargeId,
    Uuid::new_v4
);

entity_id!(
    /// Time-ordered identifier of a ledger transaction. Byte order follows
    /// creation order, which the RocksDB indices rely on.
    TransactionId,
    Uuid::now_v7
);

impl UserId {
    /// Stable id derived from a handle, so the same name maps to the same
    /// account across process restarts.
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}
