//! Inflation index repository.

use contab_core::inflation::{AdjustmentService, IndexInput, InflationError, InflationIndex};
use contab_shared::types::{CurrencyId, InflationIndexId, OrganizationId};
use contab_shared::{AppError, AppResult};
use rust_decimal::Decimal;
use tracing::info;

use super::currency::currency;
use crate::store::{Database, Tables};

/// Repository for the per-currency monthly index table.
#[derive(Debug, Clone)]
pub struct InflationRepository {
    db: Database,
}

impl InflationRepository {
    /// Creates a new inflation repository.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Records the index of a month. Any day of the month may be given.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a value that is not positive or has more than four
    /// decimals, `Conflict` when the month already has an index, `NotFound`
    /// for a currency of another organization.
    pub fn create(&self, org: OrganizationId, input: IndexInput) -> AppResult<InflationIndex> {
        let input = AdjustmentService::normalize_index(input)?;

        let index = self.db.transaction(|tx| {
            currency(tx, org, input.currency_id)
                .map_err(|_| InflationError::CurrencyNotFound(input.currency_id))?;
            let taken = tx
                .indexes
                .find(|i| i.currency_id == input.currency_id && i.month == input.month)
                .is_some();
            if taken {
                return Err(InflationError::DuplicateIndex {
                    currency_id: input.currency_id,
                    month: input.month,
                }
                .into());
            }
            Ok::<_, AppError>(tx.indexes.insert(InflationIndex {
                id: InflationIndexId(0),
                currency_id: input.currency_id,
                month: input.month,
                value: input.value,
                version: 0,
            }))
        })?;

        info!(
            org_id = %org,
            currency_id = %index.currency_id,
            month = %index.month,
            value = %index.value,
            "Inflation index created"
        );
        Ok(index)
    }

    /// Changes the value of an index.
    ///
    /// # Errors
    ///
    /// As for [`Self::create`], plus `VersionConflict` when `version` is stale.
    pub fn update(
        &self,
        org: OrganizationId,
        id: InflationIndexId,
        value: Decimal,
        version: u32,
    ) -> AppResult<InflationIndex> {
        AdjustmentService::validate_value(value)?;

        let index = self.db.transaction(|tx| {
            let current = index(tx, org, id)?.clone();
            let updated = tx.indexes.update(InflationIndex {
                value,
                version,
                ..current
            })?;
            Ok::<_, AppError>(updated)
        })?;

        info!(org_id = %org, index_id = %id, value = %value, "Inflation index updated");
        Ok(index)
    }

    /// Deletes an index.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown index.
    pub fn delete(&self, org: OrganizationId, id: InflationIndexId) -> AppResult<()> {
        self.db.transaction(|tx| {
            index(tx, org, id)?;
            tx.indexes.remove(id);
            Ok::<_, AppError>(())
        })?;

        info!(org_id = %org, index_id = %id, "Inflation index deleted");
        Ok(())
    }

    /// Loads an index.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown index or one of another organization.
    pub fn get(&self, org: OrganizationId, id: InflationIndexId) -> AppResult<InflationIndex> {
        self.db
            .read(|t| index(t, org, id).cloned())
            .map_err(AppError::from)
    }

    /// Indexes of one currency by month.
    ///
    /// # Errors
    ///
    /// `NotFound` for a currency of another organization.
    pub fn list(&self, org: OrganizationId, currency_id: CurrencyId) -> AppResult<Vec<InflationIndex>> {
        self.db.read(|t| {
            currency(t, org, currency_id).map_err(|_| InflationError::CurrencyNotFound(currency_id))?;
            let mut indexes: Vec<InflationIndex> = t
                .indexes
                .filter(|i| i.currency_id == currency_id)
                .cloned()
                .collect();
            indexes.sort_by_key(|i| i.month);
            Ok(indexes)
        })
    }
}

fn index(
    tables: &Tables,
    org: OrganizationId,
    id: InflationIndexId,
) -> Result<&InflationIndex, InflationError> {
    tables
        .indexes
        .get(id)
        .filter(|i| currency(tables, org, i.currency_id).is_ok())
        .ok_or(InflationError::IndexNotFound(id))
}
