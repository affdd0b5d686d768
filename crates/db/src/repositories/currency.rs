//! Currency repository.
//!
//! Every organization has exactly one default currency: the first one created
//! becomes the default, and promoting another currency demotes the old one.

use contab_core::chart::{ChartError, ChartService, Currency, CurrencyInput, NodeKind};
use contab_shared::types::{CurrencyId, OrganizationId};
use contab_shared::{AppError, AppResult};
use tracing::info;

use super::organization::organization;
use crate::store::{Database, Tables};

/// Currency repository.
#[derive(Debug, Clone)]
pub struct CurrencyRepository {
    db: Database,
}

impl CurrencyRepository {
    /// Creates a new currency repository.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Adds a currency to an organization.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed code, symbol or name, `Conflict` for a
    /// code the organization already uses, `NotFound` for an unknown
    /// organization.
    pub fn create(&self, org: OrganizationId, input: CurrencyInput) -> AppResult<Currency> {
        let input = ChartService::validate_currency(&input)?;

        let currency = self.db.transaction(|tx| {
            organization(tx, org)?;
            ensure_code_free(tx, org, &input.code, None)?;

            let first = tx.currencies.find(|c| c.organization_id == org).is_none();
            let is_default = first || input.is_default;
            if is_default {
                demote_default(tx, org)?;
            }

            Ok::<_, AppError>(tx.currencies.insert(Currency {
                id: CurrencyId(0),
                organization_id: org,
                name: input.name,
                symbol: input.symbol,
                code: input.code,
                is_default,
                adjustable: input.adjustable,
                version: 0,
            }))
        })?;

        info!(org_id = %org, currency_id = %currency.id, code = %currency.code, "Currency created");
        Ok(currency)
    }

    /// Updates a currency.
    ///
    /// Clearing `adjustable` also clears the adjustable and balancing
    /// adjustables flags of every account in this currency.
    ///
    /// # Errors
    ///
    /// As for [`Self::create`], plus `InvalidInput` when unsetting the default
    /// and `VersionConflict` when `version` is stale.
    pub fn update(
        &self,
        org: OrganizationId,
        id: CurrencyId,
        input: CurrencyInput,
        version: u32,
    ) -> AppResult<Currency> {
        let input = ChartService::validate_currency(&input)?;

        let currency = self.db.transaction(|tx| {
            let current = currency(tx, org, id)?.clone();
            ensure_code_free(tx, org, &input.code, Some(id))?;

            if current.is_default && !input.is_default {
                return Err(ChartError::InvalidCurrency(
                    "the default currency can only be replaced by making another one default"
                        .into(),
                )
                .into());
            }
            if input.is_default && !current.is_default {
                demote_default(tx, org)?;
            }
            if current.adjustable && !input.adjustable {
                let cleared = clear_adjustable_accounts(tx, id)?;
                info!(currency_id = %id, accounts = cleared, "Adjustable flags cleared");
            }

            let updated = tx.currencies.update(Currency {
                name: input.name,
                symbol: input.symbol,
                code: input.code,
                is_default: input.is_default,
                adjustable: input.adjustable,
                version,
                ..current
            })?;
            Ok::<_, AppError>(updated)
        })?;

        info!(org_id = %org, currency_id = %id, version = currency.version, "Currency updated");
        Ok(currency)
    }

    /// Loads a currency of the organization.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id or one owned by another organization.
    pub fn get(&self, org: OrganizationId, id: CurrencyId) -> AppResult<Currency> {
        self.db
            .read(|t| currency(t, org, id).cloned())
            .map_err(AppError::from)
    }

    /// Currencies of the organization, default first, then by id.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown organization.
    pub fn list(&self, org: OrganizationId) -> AppResult<Vec<Currency>> {
        self.db.read(|t| {
            organization(t, org)?;
            let mut currencies: Vec<Currency> = t
                .currencies
                .filter(|c| c.organization_id == org)
                .cloned()
                .collect();
            ChartService::sort_currencies(&mut currencies);
            Ok(currencies)
        })
    }
}

/// Loads a currency of `org`.
pub(crate) fn currency(
    tables: &Tables,
    org: OrganizationId,
    id: CurrencyId,
) -> Result<&Currency, ChartError> {
    tables
        .currencies
        .get(id)
        .filter(|c| c.organization_id == org)
        .ok_or(ChartError::CurrencyNotFound(id))
}

/// Default currency of `org`, if it has any currency at all.
pub(crate) fn default_currency_id(tables: &Tables, org: OrganizationId) -> Option<CurrencyId> {
    tables
        .currencies
        .find(|c| c.organization_id == org && c.is_default)
        .map(|c| c.id)
}

fn ensure_code_free(
    tables: &Tables,
    org: OrganizationId,
    code: &str,
    except: Option<CurrencyId>,
) -> Result<(), ChartError> {
    let taken = tables
        .currencies
        .find(|c| c.organization_id == org && c.code == code && Some(c.id) != except)
        .is_some();
    if taken {
        return Err(ChartError::DuplicateCurrency(code.to_string()));
    }
    Ok(())
}

fn demote_default(tx: &mut Tables, org: OrganizationId) -> AppResult<()> {
    if let Some(id) = default_currency_id(tx, org) {
        tx.currencies.modify(id, |c| c.is_default = false)?;
    }
    Ok(())
}

fn clear_adjustable_accounts(tx: &mut Tables, currency_id: CurrencyId) -> AppResult<usize> {
    let ids: Vec<_> = tx
        .nodes
        .filter(|n| {
            n.account().is_some_and(|a| {
                a.currency_id == currency_id && (a.adjustable || a.balances_adjustables)
            })
        })
        .map(|n| n.id)
        .collect();
    for id in &ids {
        tx.nodes.modify(*id, |n| {
            if let NodeKind::Account(flags) = &mut n.kind {
                flags.adjustable = false;
                flags.balances_adjustables = false;
            }
        })?;
    }
    Ok(ids.len())
}
