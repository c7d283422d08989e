//! Identifier newtypes for every record kind in the system.
//!
//! Each identifier wraps a UUID so that, for example, a `PaymentId` can never
//! be passed where an `InstallmentId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a sale.
    SaleId
);
define_id!(
    /// Unique identifier for a client.
    ClientId
);
define_id!(
    /// Unique identifier for an inventory unit (land piece or house).
    UnitId
);
define_id!(
    /// Unique identifier for a payment record.
    PaymentId
);
define_id!(
    /// Unique identifier for an installment record.
    InstallmentId
);
define_id!(
    /// Unique identifier for a rendezvous record.
    RendezvousId
);
define_id!(
    /// Unique identifier for a user (acting identity).
    UserId
);
