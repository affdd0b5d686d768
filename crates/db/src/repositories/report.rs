//! Balance and ledger queries.
//!
//! Rows are gathered by joining the period's postings with their entry and
//! account; aggregation and ordering are left to [`ReportService`].

use std::collections::{BTreeSet, HashMap};

use contab_core::chart::ChartNode;
use contab_core::fiscal::FiscalPeriod;
use contab_core::ledger::JournalEntry;
use contab_core::reports::{
    AccountBalance, BalanceQuery, CategoryFilter, CurrencyTotal, EntryRange, LedgerLine,
    LedgerPage, LedgerRow, MonthlyBalance, ReportAccount, ReportError, ReportService,
};
use contab_shared::AppResult;
use contab_shared::types::{
    EntryId, FiscalPeriodId, NodeId, OrganizationId, PageRequest, PageResponse, Slice,
};
use tracing::debug;

use super::chart::{node, org_nodes};
use super::fiscal::period;
use super::journal::DEFAULT_MAX_PAGE_SIZE;
use crate::store::{Database, Tables};

/// Repository for balance and ledger reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: Database,
    max_page_size: u32,
}

impl ReportRepository {
    /// Creates a new report repository.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self {
            db,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Caps the page size of paged queries.
    #[must_use]
    pub const fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Account balances as a counted page.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown period or filter category, `InvalidInput`
    /// for an inverted range or a filter naming an account.
    pub fn balance_page(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
        query: &BalanceQuery,
        page: PageRequest,
    ) -> AppResult<PageResponse<AccountBalance>> {
        let page = page.clamped(self.max_page_size);
        let balances = self.db.read(|t| account_balances(t, org, period_id, query))?;
        let total = u64::try_from(balances.len()).unwrap_or(u64::MAX);
        Ok(PageResponse::new(page.apply(balances), page, total))
    }

    /// Account balances as an uncounted slice.
    ///
    /// # Errors
    ///
    /// As for [`Self::balance_page`].
    pub fn balance_slice(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
        query: &BalanceQuery,
        page: PageRequest,
    ) -> AppResult<Slice<AccountBalance>> {
        let page = page.clamped(self.max_page_size);
        let balances = self.db.read(|t| account_balances(t, org, period_id, query))?;
        let probe = balances
            .into_iter()
            .skip(page.offset())
            .take(page.limit() + 1)
            .collect();
        Ok(Slice::from_probe(probe, page))
    }

    /// Feeds every balance to `sink`, returning how many were sent.
    ///
    /// # Errors
    ///
    /// As for [`Self::balance_page`].
    pub fn balance_stream<F>(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
        query: &BalanceQuery,
        mut sink: F,
    ) -> AppResult<usize>
    where
        F: FnMut(AccountBalance),
    {
        let balances = self.db.read(|t| account_balances(t, org, period_id, query))?;
        let count = balances.len();
        balances.into_iter().for_each(&mut sink);
        Ok(count)
    }

    /// Balances summed per currency.
    ///
    /// Empty without a category filter (or with one naming no categories),
    /// since the whole chart nets to zero in every currency.
    ///
    /// # Errors
    ///
    /// As for [`Self::balance_page`].
    pub fn totals_by_currency(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
        query: &BalanceQuery,
    ) -> AppResult<Vec<CurrencyTotal>> {
        let balances = self.db.read(|t| account_balances(t, org, period_id, query))?;
        Ok(ReportService::totals_by_currency(
            &balances,
            query.category_filter().is_some(),
        ))
    }

    /// A page of the ledger of one or more accounts with running balances.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown period or account, `InvalidInput` for an
    /// inverted range.
    pub fn ledger(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
        accounts: &[NodeId],
        range: &EntryRange,
        page: PageRequest,
    ) -> AppResult<LedgerPage> {
        ReportService::validate_range(range)?;
        let page = page.clamped(self.max_page_size);
        self.db.read(|t| {
            let period = period(t, org, period_id)?;
            let ids = ledger_accounts(t, org, accounts)?;
            let rows = period_rows(t, period, Some(&ids), None);
            debug!(period_id = %period_id, rows = rows.len(), "Ledger rows loaded");
            Ok(ReportService::ledger_page(
                &rows,
                range,
                page,
                (period.start, period.end),
            ))
        })
    }

    /// Feeds the whole ledger of `accounts` to `sink`, one account after the
    /// other, returning how many lines were sent.
    ///
    /// # Errors
    ///
    /// As for [`Self::ledger`].
    pub fn ledger_stream<F>(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
        accounts: &[NodeId],
        range: &EntryRange,
        mut sink: F,
    ) -> AppResult<usize>
    where
        F: FnMut(LedgerLine),
    {
        ReportService::validate_range(range)?;
        self.db.read(|t| {
            let period = period(t, org, period_id)?;
            let ids = ledger_accounts(t, org, accounts)?;
            let rows = period_rows(t, period, Some(&ids), None);
            let mut count = 0;
            ReportService::ledger_stream(&rows, range, period.start, |line| {
                count += 1;
                sink(line);
            });
            Ok(count)
        })
    }

    /// Per (account, month) balances of `accounts` over the period.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown period or account.
    pub fn balance_by_month(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
        accounts: &[NodeId],
    ) -> AppResult<Vec<MonthlyBalance>> {
        self.db.read(|t| {
            let period = period(t, org, period_id)?;
            let ids = ledger_accounts(t, org, accounts)?;
            Ok(ReportService::balance_by_month(&period_rows(
                t,
                period,
                Some(&ids),
                None,
            )))
        })
    }
}

/// Postings of a period joined with their entry and account, in ledger order.
///
/// `accounts` restricts the rows to those accounts; `exclude` skips one entry.
pub(crate) fn period_rows(
    tables: &Tables,
    period: &FiscalPeriod,
    accounts: Option<&BTreeSet<NodeId>>,
    exclude: Option<EntryId>,
) -> Vec<LedgerRow> {
    let entries: HashMap<EntryId, &JournalEntry> = tables
        .entries
        .filter(|e| e.period_id == period.id && Some(e.id) != exclude)
        .map(|e| (e.id, e))
        .collect();

    let mut rows: Vec<LedgerRow> = tables
        .postings
        .iter()
        .filter(|p| accounts.is_none_or(|ids| ids.contains(&p.account_id)))
        .filter_map(|p| {
            let entry = entries.get(&p.entry_id)?;
            let account = tables.nodes.get(p.account_id)?;
            Some(LedgerRow {
                posting_id: p.id,
                entry_id: entry.id,
                entry_number: entry.number,
                date: entry.date,
                description: entry.description.clone(),
                detail: p.detail.clone(),
                account_id: p.account_id,
                order_key: account.order_key.clone(),
                currency_id: account.currency_id()?,
                amount: p.amount,
            })
        })
        .collect();
    ReportService::sort_ledger(&mut rows);
    rows
}

fn account_balances(
    tables: &Tables,
    org: OrganizationId,
    period_id: FiscalPeriodId,
    query: &BalanceQuery,
) -> AppResult<Vec<AccountBalance>> {
    ReportService::validate_range(&query.range)?;
    let period = period(tables, org, period_id)?;
    let nodes: Vec<ChartNode> = org_nodes(tables, org).cloned().collect();
    let categories = match query.category_filter() {
        Some(filter) => Some((filter.mode, filter_categories(tables, org, filter)?)),
        None => None,
    };

    let accounts: Vec<ReportAccount> = ReportService::select_accounts(
        &nodes,
        categories.as_ref().map(|(mode, c)| (*mode, c.as_slice())),
    )
    .into_iter()
    .filter_map(ReportService::report_account)
    .collect();
    let ids: BTreeSet<NodeId> = accounts.iter().map(|a| a.id).collect();
    let rows: Vec<LedgerRow> = period_rows(tables, period, Some(&ids), None)
        .into_iter()
        .filter(|r| query.range.contains(r.date, r.entry_number))
        .collect();

    debug!(
        period_id = %period_id,
        accounts = accounts.len(),
        rows = rows.len(),
        "Balances computed"
    );
    Ok(ReportService::balances(&accounts, &rows, query.include_zero))
}

fn filter_categories<'a>(
    tables: &'a Tables,
    org: OrganizationId,
    filter: &CategoryFilter,
) -> Result<Vec<&'a ChartNode>, ReportError> {
    filter
        .categories
        .iter()
        .map(|id| {
            let category = node(tables, org, *id).map_err(|_| ReportError::CategoryNotFound(*id))?;
            if !category.is_category() {
                return Err(ReportError::NotACategory(*id));
            }
            Ok(category)
        })
        .collect()
}

fn ledger_accounts(
    tables: &Tables,
    org: OrganizationId,
    accounts: &[NodeId],
) -> Result<BTreeSet<NodeId>, ReportError> {
    accounts
        .iter()
        .map(|id| {
            node(tables, org, *id)
                .ok()
                .filter(|n| n.is_account())
                .map(|n| n.id)
                .ok_or(ReportError::AccountNotFound(*id))
        })
        .collect()
}
