//! In-memory relational store.
//!
//! Every table is an ordered map keyed by a typed id drawn from a per-table
//! sequence, so iteration order is creation order. [`Database::transaction`]
//! runs a unit of work against a private copy of the tables while holding the
//! write lock and publishes the copy only when the closure returns `Ok`.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use contab_core::chart::{ChartNode, Currency, Organization};
use contab_core::fiscal::FiscalPeriod;
use contab_core::inflation::InflationIndex;
use contab_core::ledger::{JournalEntry, Posting};
use contab_shared::AppError;
use contab_shared::types::{
    CurrencyId, EntryId, FiscalPeriodId, InflationIndexId, NodeId, OrganizationId, PostingId,
};
use parking_lot::RwLock;
use thiserror::Error;

/// A row that can live in a [`Table`].
pub trait Record: Clone {
    /// Typed primary key.
    type Id: Copy + Ord + Display;

    /// Table name used in error messages.
    const TABLE: &'static str;

    /// Primary key of the row.
    fn id(&self) -> Self::Id;

    /// Sets the primary key from a sequence value.
    fn assign_id(&mut self, raw: i64);

    /// Optimistic concurrency version.
    fn version(&self) -> u32;

    /// Overwrites the version.
    fn set_version(&mut self, version: u32);
}

macro_rules! record {
    ($ty:ty, $id:ident, $table:literal) => {
        impl Record for $ty {
            type Id = $id;

            const TABLE: &'static str = $table;

            fn id(&self) -> $id {
                self.id
            }

            fn assign_id(&mut self, raw: i64) {
                self.id = $id::from_raw(raw);
            }

            fn version(&self) -> u32 {
                self.version
            }

            fn set_version(&mut self, version: u32) {
                self.version = version;
            }
        }
    };
}

record!(Organization, OrganizationId, "organizations");
record!(Currency, CurrencyId, "currencies");
record!(ChartNode, NodeId, "chart_nodes");
record!(FiscalPeriod, FiscalPeriodId, "fiscal_periods");
record!(JournalEntry, EntryId, "journal_entries");
record!(Posting, PostingId, "postings");
record!(InflationIndex, InflationIndexId, "inflation_indexes");

/// Errors raised by table operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Row does not exist.
    #[error("{table} row {id} not found")]
    Missing {
        /// Table name.
        table: &'static str,
        /// Row id.
        id: String,
    },

    /// Row changed since the caller read it.
    #[error("{table} row {id} was modified concurrently (read version {expected}, stored {found})")]
    VersionMismatch {
        /// Table name.
        table: &'static str,
        /// Row id.
        id: String,
        /// Version the caller held.
        expected: u32,
        /// Version currently stored.
        found: u32,
    },
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::Missing { .. } => Self::NotFound(message),
            StoreError::VersionMismatch { .. } => Self::VersionConflict(message),
        }
    }
}

/// A versioned table.
#[derive(Clone)]
pub struct Table<T: Record> {
    rows: BTreeMap<T::Id, T>,
    sequence: i64,
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            sequence: 0,
        }
    }
}

impl<T: Record> fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &T::TABLE)
            .field("rows", &self.rows.len())
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl<T: Record> Table<T> {
    /// Row by id.
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.rows.get(&id)
    }

    /// Row by id, failing with `Missing`.
    pub fn fetch(&self, id: T::Id) -> Result<&T, StoreError> {
        self.rows.get(&id).ok_or_else(|| StoreError::Missing {
            table: T::TABLE,
            id: id.to_string(),
        })
    }

    /// All rows in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + Clone {
        self.rows.values()
    }

    /// First row matching `pred`, in creation order.
    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<&T> {
        self.rows.values().find(|row| pred(row))
    }

    /// Rows matching `pred`, in creation order.
    pub fn filter<'a, P>(&'a self, mut pred: P) -> impl Iterator<Item = &'a T> + 'a
    where
        P: FnMut(&T) -> bool + 'a,
    {
        self.rows.values().filter(move |row| pred(row))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inserts a new row with the next sequence id and version 1.
    pub fn insert(&mut self, mut row: T) -> T {
        self.sequence += 1;
        row.assign_id(self.sequence);
        row.set_version(1);
        self.rows.insert(row.id(), row.clone());
        row
    }

    /// Stores `row` over the existing one with the same id.
    ///
    /// `row.version()` must equal the stored version; the stored copy gets the
    /// next version.
    ///
    /// # Errors
    ///
    /// `Missing` for an unknown id, `VersionMismatch` for a stale row.
    pub fn update(&mut self, mut row: T) -> Result<T, StoreError> {
        let id = row.id();
        let stored = self.fetch(id)?;
        if stored.version() != row.version() {
            return Err(StoreError::VersionMismatch {
                table: T::TABLE,
                id: id.to_string(),
                expected: row.version(),
                found: stored.version(),
            });
        }
        row.set_version(row.version() + 1);
        self.rows.insert(id, row.clone());
        Ok(row)
    }

    /// Loads a row, lets `f` change it and stores it with the next version.
    ///
    /// # Errors
    ///
    /// `Missing` for an unknown id.
    pub fn modify(&mut self, id: T::Id, f: impl FnOnce(&mut T)) -> Result<T, StoreError> {
        let mut row = self.fetch(id)?.clone();
        f(&mut row);
        self.update(row)
    }

    /// Removes a row, returning it.
    pub fn remove(&mut self, id: T::Id) -> Option<T> {
        self.rows.remove(&id)
    }

    /// Removes every row matching `pred`, returning how many went away.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|_, row| !pred(row));
        before - self.rows.len()
    }
}

/// Every table of the store.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    /// Organizations.
    pub organizations: Table<Organization>,
    /// Currencies.
    pub currencies: Table<Currency>,
    /// Chart of accounts nodes.
    pub nodes: Table<ChartNode>,
    /// Fiscal periods.
    pub periods: Table<FiscalPeriod>,
    /// Journal entry headers.
    pub entries: Table<JournalEntry>,
    /// Postings.
    pub postings: Table<Posting>,
    /// Inflation indexes.
    pub indexes: Table<InflationIndex>,
}

/// Shared handle to the store. Clones point to the same tables.
#[derive(Debug, Clone, Default)]
pub struct Database {
    tables: Arc<RwLock<Tables>>,
}

impl Database {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a read-only query under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        f(&self.tables.read())
    }

    /// Runs a unit of work atomically.
    ///
    /// Writers are serialized. The closure sees a private copy of the tables;
    /// the copy replaces the published tables only on `Ok`, so an `Err` leaves
    /// the store exactly as it was.
    ///
    /// # Errors
    ///
    /// Whatever the closure returns.
    pub fn transaction<R, E>(&self, f: impl FnOnce(&mut Tables) -> Result<R, E>) -> Result<R, E> {
        let mut guard = self.tables.write();
        let mut working = guard.clone();
        let result = f(&mut working)?;
        *guard = working;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn organization(name: &str) -> Organization {
        Organization {
            id: OrganizationId(0),
            tax_id: "30-1".into(),
            name: name.into(),
            version: 0,
        }
    }

    #[test]
    fn test_insert_assigns_sequence_and_version() {
        let mut table = Table::<Organization>::default();
        let a = table.insert(organization("a"));
        let b = table.insert(organization("b"));
        assert_eq!((a.id, a.version), (OrganizationId(1), 1));
        assert_eq!(b.id, OrganizationId(2));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_update_checks_version() {
        let mut table = Table::<Organization>::default();
        let org = table.insert(organization("a"));

        let renamed = table
            .update(Organization {
                name: "b".into(),
                ..org.clone()
            })
            .unwrap();
        assert_eq!(renamed.version, 2);

        let stale = table.update(Organization {
            name: "c".into(),
            ..org
        });
        assert!(matches!(
            stale,
            Err(StoreError::VersionMismatch {
                expected: 1,
                found: 2,
                ..
            })
        ));
        assert_eq!(table.get(OrganizationId(1)).unwrap().name, "b");
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut table = Table::<Organization>::default();
        let a = table.insert(organization("a"));
        table.remove(a.id);
        let b = table.insert(organization("b"));
        assert_eq!(b.id, OrganizationId(2));
        assert!(table.fetch(a.id).is_err());
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let db = Database::new();
        let result: Result<(), AppError> = db.transaction(|tx| {
            tx.organizations.insert(organization("a"));
            Err(AppError::Internal("boom".into()))
        });
        assert!(result.is_err());
        assert!(db.read(|t| t.organizations.is_empty()));

        db.transaction(|tx| {
            tx.organizations.insert(organization("a"));
            Ok::<_, AppError>(())
        })
        .unwrap();
        assert_eq!(db.read(|t| t.organizations.len()), 1);
    }

    #[test]
    fn test_store_error_kinds() {
        let missing = StoreError::Missing {
            table: "postings",
            id: "7".into(),
        };
        assert!(matches!(AppError::from(missing), AppError::NotFound(_)));
        let stale = StoreError::VersionMismatch {
            table: "postings",
            id: "7".into(),
            expected: 1,
            found: 2,
        };
        assert!(AppError::from(stale).is_retryable());
    }
}
