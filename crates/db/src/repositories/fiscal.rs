//! Fiscal period repository.
//!
//! Drives the period lifecycle: creating the next period with its opening
//! entry, closing with the consolidation and closing entries, reopening,
//! confirming dates and regenerating the inflation adjustment entry.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use contab_core::chart::{BalancingRole, ChartNode, ChartService};
use contab_core::fiscal::{
    CLOSING_DETAIL, CONSOLIDATION_DETAIL, ClosingBalance, ClosingPlan, ClosingService,
    FiscalError, FiscalPeriod, OPENING_DETAIL, PeriodInput, validate_next,
};
use contab_core::inflation::{
    ADJUSTMENT_DETAIL, AdjustmentService, IndexTable, InflationCalculator, InflationError,
};
use contab_core::ledger::{EntryWithPostings, JournalEntry, PostingService, ResolvedPosting};
use contab_core::reports::ReportService;
use contab_shared::types::{FiscalPeriodId, NodeId, OrganizationId};
use contab_shared::{AppError, AppResult};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::chart::{balancing_map, org_nodes, posting_account};
use super::journal::{
    insert_generated, positioned, postings_of, remove_entry, remove_period_entries,
    write_postings,
};
use super::organization::organization;
use super::report::period_rows;
use crate::store::{Database, Tables};

/// Fiscal period repository.
#[derive(Debug, Clone)]
pub struct FiscalRepository {
    db: Database,
}

impl FiscalRepository {
    /// Creates a new fiscal repository.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates the organization's next period.
    ///
    /// The first period starts empty. Later ones must start after the latest
    /// period ends and get an opening entry (number 1, dated at the start)
    /// that inverts the previous period's closing entry. When the previous
    /// period is still open its closing is simulated, or performed first if
    /// `close_previous` is set.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty range, an overlap with the previous
    ///   period, or a missing results balancing account
    /// - `NotFound` for an unknown organization
    pub fn create_next(
        &self,
        org: OrganizationId,
        input: PeriodInput,
        close_previous: bool,
    ) -> AppResult<FiscalPeriod> {
        let created = self.db.transaction(|tx| {
            organization(tx, org)?;
            let previous = latest(tx, org).cloned();
            validate_next(previous.as_ref(), &input)?;

            let closing = match previous {
                None => Vec::new(),
                Some(previous) => {
                    let previous = if !previous.finalized && close_previous {
                        close_in(tx, org, previous.id)?
                    } else {
                        previous
                    };
                    if previous.finalized {
                        stored_closing(tx, org, &previous)?
                    } else {
                        closing_plan(tx, &previous)?.closing
                    }
                }
            };

            let mut period = tx.periods.insert(FiscalPeriod::new(org, input));
            let opening = ClosingService::opening_postings(&closing);
            if !opening.is_empty() {
                let entry = insert_generated(tx, period.id, period.start, OPENING_DETAIL, opening);
                period = tx
                    .periods
                    .modify(period.id, |p| p.opening_entry_id = Some(entry.entry.id))?;
            }
            Ok::<_, AppError>(period)
        })?;

        info!(
            org_id = %org,
            period_id = %created.id,
            start = %created.start,
            end = %created.end,
            opening_entry = ?created.opening_entry_id,
            "Fiscal period created"
        );
        Ok(created)
    }

    /// Closes a period.
    ///
    /// Result accounts are first moved into the results balancing account of
    /// their currency (skipped when they are all zero), then every nonzero
    /// account is zeroed by the closing entry. Both entries are dated at the
    /// period end. The closing entry is always recorded, without postings when
    /// every account is already at zero.
    ///
    /// # Errors
    ///
    /// - `Conflict` when the period is already closed
    /// - `InvalidInput` when no results balancing account exists, or none for
    ///   a currency with result balances
    /// - `NotFound` for an unknown period
    pub fn close(&self, org: OrganizationId, period_id: FiscalPeriodId) -> AppResult<FiscalPeriod> {
        self.db.transaction(|tx| close_in(tx, org, period_id))
    }

    /// Reopens a closed period, deleting its consolidation and closing
    /// entries. Every other entry is kept.
    ///
    /// # Errors
    ///
    /// `Conflict` when the period is open, `NotFound` for an unknown period.
    pub fn reopen(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
    ) -> AppResult<FiscalPeriod> {
        let reopened = self.db.transaction(|tx| {
            let current = period(tx, org, period_id)?.clone();
            if !current.finalized {
                return Err(FiscalError::NotClosed(period_id).into());
            }
            for entry_id in [current.consolidation_entry_id, current.closing_entry_id]
                .into_iter()
                .flatten()
            {
                remove_entry(tx, entry_id);
            }
            let reopened = tx.periods.modify(period_id, |p| {
                p.finalized = false;
                p.consolidation_entry_id = None;
                p.closing_entry_id = None;
            })?;
            Ok::<_, AppError>(reopened)
        })?;

        info!(org_id = %org, period_id = %period_id, "Fiscal period reopened");
        Ok(reopened)
    }

    /// Deletes a period with all of its entries.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown period.
    pub fn delete(&self, org: OrganizationId, period_id: FiscalPeriodId) -> AppResult<usize> {
        let removed = self.db.transaction(|tx| {
            period(tx, org, period_id)?;
            let removed = remove_period_entries(tx, period_id);
            tx.periods.remove(period_id);
            Ok::<_, AppError>(removed)
        })?;

        info!(org_id = %org, period_id = %period_id, entries = removed, "Fiscal period deleted");
        Ok(removed)
    }

    /// Locks every entry dated on or before `date` and renumbers the period's
    /// entries 1..n by date and creation order.
    ///
    /// # Errors
    ///
    /// - `Frozen` for a finalized period
    /// - `InvalidInput` for a date outside the period or not after the
    ///   current confirmation
    /// - `NotFound` for an unknown period
    pub fn confirm_through(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
        date: NaiveDate,
    ) -> AppResult<FiscalPeriod> {
        let (confirmed, renumbered) = self.db.transaction(|tx| {
            period(tx, org, period_id)?.validate_confirmation(date)?;

            let entries: Vec<JournalEntry> = tx
                .entries
                .filter(|e| e.period_id == period_id)
                .cloned()
                .collect();
            let numbers = PostingService::renumber(&entries);
            for (entry_id, number) in &numbers {
                tx.entries.modify(*entry_id, |e| e.number = *number)?;
            }
            let confirmed = tx
                .periods
                .modify(period_id, |p| p.confirmed_through = Some(date))?;
            Ok::<_, AppError>((confirmed, numbers.len()))
        })?;

        info!(
            org_id = %org,
            period_id = %period_id,
            confirmed_through = %date,
            renumbered,
            "Fiscal period confirmed"
        );
        Ok(confirmed)
    }

    /// Creates, regenerates or removes the inflation adjustment entry.
    ///
    /// Monthly balances of adjustable accounts (ignoring the current
    /// adjustment entry) are restated with the index table; each nonzero
    /// difference becomes a posting, offset per currency into the adjustables
    /// balancing account. The entry is dated at the period end. Returns `None`
    /// when nothing needs adjusting, in which case a previous adjustment entry
    /// is deleted.
    ///
    /// # Errors
    ///
    /// - `Frozen` for a finalized period or a confirmed period end
    /// - `InvalidInput` when no adjustables balancing account exists, or none
    ///   for a currency with differences
    /// - `MissingIndex` for a month without index
    /// - `NotFound` for an unknown period
    pub fn adjust_for_inflation(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
    ) -> AppResult<Option<EntryWithPostings>> {
        let adjusted = self.db.transaction(|tx| {
            let current = period(tx, org, period_id)?.clone();
            current.ensure_postable(current.end)?;

            let holders = balancing_map(tx, org, BalancingRole::Adjustables);
            if holders.is_empty() {
                return Err(InflationError::NoAdjustablesBalancingAccount.into());
            }

            let adjustable: BTreeSet<NodeId> = org_nodes(tx, org)
                .filter(|n| n.account().is_some_and(|a| a.adjustable))
                .map(|n| n.id)
                .collect();
            let rows = period_rows(tx, &current, Some(&adjustable), current.adjustment_entry_id);
            let monthly = ReportService::balance_by_month(&rows);
            let table = IndexTable::new(tx.indexes.iter());
            let mut calculator = InflationCalculator::new(&table, current.end);
            calculator.add_all(&monthly)?;
            let postings = AdjustmentService::postings(&calculator.adjustments(), &holders)?;

            match (current.adjustment_entry_id, postings.is_empty()) {
                (None, true) => Ok::<_, AppError>(None),
                (Some(entry_id), true) => {
                    remove_entry(tx, entry_id);
                    tx.periods
                        .modify(period_id, |p| p.adjustment_entry_id = None)?;
                    Ok(None)
                }
                (Some(entry_id), false) => {
                    tx.postings.remove_where(|p| p.entry_id == entry_id);
                    let postings = write_postings(tx, entry_id, positioned(postings))?;
                    let entry = tx.entries.modify(entry_id, |e| e.date = current.end)?;
                    Ok(Some(EntryWithPostings { entry, postings }))
                }
                (None, false) => {
                    let created =
                        insert_generated(tx, period_id, current.end, ADJUSTMENT_DETAIL, postings);
                    tx.periods
                        .modify(period_id, |p| p.adjustment_entry_id = Some(created.entry.id))?;
                    Ok(Some(created))
                }
            }
        })?;

        match &adjusted {
            Some(entry) => info!(
                org_id = %org,
                period_id = %period_id,
                entry_id = %entry.entry.id,
                postings = entry.postings.len(),
                "Inflation adjustment recorded"
            ),
            None => warn!(
                org_id = %org,
                period_id = %period_id,
                "Inflation adjustment produced no differences"
            ),
        }
        Ok(adjusted)
    }

    /// Loads a period.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown period or one of another organization.
    pub fn get(&self, org: OrganizationId, period_id: FiscalPeriodId) -> AppResult<FiscalPeriod> {
        self.db
            .read(|t| period(t, org, period_id).cloned())
            .map_err(AppError::from)
    }

    /// Periods of the organization by start date.
    #[must_use]
    pub fn list(&self, org: OrganizationId) -> Vec<FiscalPeriod> {
        self.db.read(|t| {
            let mut periods: Vec<FiscalPeriod> = t
                .periods
                .filter(|p| p.organization_id == org)
                .cloned()
                .collect();
            periods.sort_by_key(|p| p.start);
            periods
        })
    }

    /// The organization's most recent period.
    #[must_use]
    pub fn latest(&self, org: OrganizationId) -> Option<FiscalPeriod> {
        self.db.read(|t| latest(t, org).cloned())
    }

    /// Consolidation and closing postings a close would generate now.
    ///
    /// # Errors
    ///
    /// As for [`Self::close`], without the closed check.
    pub fn preview_close(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
    ) -> AppResult<ClosingPlan> {
        self.db.read(|t| {
            let current = period(t, org, period_id)?;
            Ok(closing_plan(t, current)?)
        })
    }
}

/// Loads a period of `org`.
pub(crate) fn period(
    tables: &Tables,
    org: OrganizationId,
    id: FiscalPeriodId,
) -> Result<&FiscalPeriod, FiscalError> {
    tables
        .periods
        .get(id)
        .filter(|p| p.organization_id == org)
        .ok_or(FiscalError::PeriodNotFound(id))
}

fn latest(tables: &Tables, org: OrganizationId) -> Option<&FiscalPeriod> {
    tables
        .periods
        .filter(move |p| p.organization_id == org)
        .max_by_key(|p| p.start)
}

fn close_in(tx: &mut Tables, org: OrganizationId, period_id: FiscalPeriodId) -> AppResult<FiscalPeriod> {
    let current = period(tx, org, period_id)?.clone();
    if current.finalized {
        return Err(FiscalError::AlreadyClosed(period_id).into());
    }
    let plan = closing_plan(tx, &current)?;

    let consolidation = if plan.consolidation.is_empty() {
        warn!(period_id = %period_id, "Result accounts already at zero, no consolidation entry");
        None
    } else {
        Some(insert_generated(tx, period_id, current.end, CONSOLIDATION_DETAIL, plan.consolidation).entry.id)
    };
    let closing = insert_generated(tx, period_id, current.end, CLOSING_DETAIL, plan.closing).entry.id;

    let closed = tx.periods.modify(period_id, |p| {
        p.finalized = true;
        p.consolidation_entry_id = consolidation;
        p.closing_entry_id = Some(closing);
    })?;

    info!(
        org_id = %org,
        period_id = %period_id,
        consolidation_entry = ?consolidation,
        closing_entry = %closing,
        "Fiscal period closed"
    );
    Ok(closed)
}

/// Consolidation and closing postings for a period as it stands.
fn closing_plan(tables: &Tables, current: &FiscalPeriod) -> Result<ClosingPlan, FiscalError> {
    let org = current.organization_id;
    let nodes: Vec<&ChartNode> = org_nodes(tables, org).collect();

    let mut sums: HashMap<NodeId, Decimal> = HashMap::new();
    for row in period_rows(tables, current, None, None) {
        *sums.entry(row.account_id).or_insert(Decimal::ZERO) += row.amount;
    }

    let balances: Vec<ClosingBalance> = nodes
        .iter()
        .filter_map(|n| {
            let flags = n.account()?;
            Some(ClosingBalance {
                account_id: n.id,
                currency_id: flags.currency_id,
                order_key: n.order_key.clone(),
                in_result_category: ChartService::in_result_category(nodes.iter().copied(), n),
                balance: sums.get(&n.id).copied().unwrap_or(Decimal::ZERO),
            })
        })
        .collect();

    ClosingService::plan(&balances, &balancing_map(tables, org, BalancingRole::Results))
}

/// Postings of a closed period's closing entry.
fn stored_closing(
    tables: &Tables,
    org: OrganizationId,
    closed: &FiscalPeriod,
) -> AppResult<Vec<ResolvedPosting>> {
    let Some(entry_id) = closed.closing_entry_id else {
        return Ok(Vec::new());
    };
    let postings = postings_of(tables, entry_id);
    Ok(PostingService::resolve_stored(&postings, |id| {
        posting_account(tables, org, id)
    })?)
}
