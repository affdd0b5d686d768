//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `NodeId` where an `EntryId` is
//! expected. Ids are assigned by the store from per-table sequences, so their
//! numeric order is creation order.

use serde::{Deserialize, Serialize};

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wraps a raw sequence value.
            #[must_use]
            pub const fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw sequence value.
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

typed_id!(OrganizationId, "Unique identifier for an organization.");
typed_id!(CurrencyId, "Unique identifier for a currency.");
typed_id!(
    NodeId,
    "Unique identifier for a chart of accounts node (category or account)."
);
typed_id!(FiscalPeriodId, "Unique identifier for a fiscal period.");
typed_id!(EntryId, "Unique identifier for a journal entry.");
typed_id!(PostingId, "Unique identifier for a posting.");
typed_id!(InflationIndexId, "Unique identifier for an inflation index row.");
