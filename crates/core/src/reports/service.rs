//! Balance and ledger aggregation over posting rows.
//!
//! The repository gathers the rows of one period (postings joined with their
//! entry and account); everything here is pure and ordered deterministically.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use contab_shared::types::{CurrencyId, NodeId, PageRequest, PageResponse};
use rust_decimal::Decimal;

use super::error::ReportError;
use super::types::{
    AccountBalance, CurrencyTotal, EntryRange, FilterMode, LedgerLine, LedgerPage, LedgerRow,
    MonthlyBalance, ReportAccount,
};
use crate::chart::{ChartNode, ChartService};

/// Service for balance and ledger reports.
pub struct ReportService;

impl ReportService {
    /// Rejects ranges whose lower bound is after the upper bound.
    ///
    /// # Errors
    ///
    /// `InvalidRange`.
    pub fn validate_range(range: &EntryRange) -> Result<(), ReportError> {
        let inverted = match *range {
            EntryRange::All => false,
            EntryRange::Dates { from, to } => from.zip(to).is_some_and(|(f, t)| f > t),
            EntryRange::Numbers { from, to } => from.zip(to).is_some_and(|(f, t)| f > t),
        };
        if inverted {
            return Err(ReportError::InvalidRange);
        }
        Ok(())
    }

    /// Accounts a query covers, ordered by order key.
    ///
    /// Without a filter every account is covered. `Include` keeps accounts
    /// below any category, `Exclude` those below none.
    pub fn select_accounts<'a>(
        nodes: &'a [ChartNode],
        filter: Option<(FilterMode, &[&ChartNode])>,
    ) -> Vec<&'a ChartNode> {
        match filter {
            Some((FilterMode::Include, categories)) => {
                ChartService::descendant_accounts(nodes, categories)
            }
            Some((FilterMode::Exclude, categories)) => {
                let excluded: Vec<NodeId> = ChartService::descendant_accounts(nodes, categories)
                    .into_iter()
                    .map(|n| n.id)
                    .collect();
                let mut accounts: Vec<&ChartNode> = nodes
                    .iter()
                    .filter(|n| n.is_account() && !excluded.contains(&n.id))
                    .collect();
                accounts.sort_by(|a, b| a.order_key.cmp(&b.order_key));
                accounts
            }
            None => {
                let mut accounts: Vec<&ChartNode> =
                    nodes.iter().filter(|n| n.is_account()).collect();
                accounts.sort_by(|a, b| a.order_key.cmp(&b.order_key));
                accounts
            }
        }
    }

    /// Report view of an account node. `None` for categories.
    #[must_use]
    pub fn report_account(node: &ChartNode) -> Option<ReportAccount> {
        Some(ReportAccount {
            id: node.id,
            code: node.code.clone(),
            order_key: node.order_key.clone(),
            description: node.description.clone(),
            currency_id: node.currency_id()?,
        })
    }

    /// Per-account balances of `rows`, in the order of `accounts`.
    ///
    /// Rows of accounts outside `accounts` are ignored. Accounts with a zero
    /// balance (or no rows) are dropped unless `include_zero` is set.
    #[must_use]
    pub fn balances(
        accounts: &[ReportAccount],
        rows: &[LedgerRow],
        include_zero: bool,
    ) -> Vec<AccountBalance> {
        let mut sums: HashMap<NodeId, Decimal> = HashMap::new();
        for row in rows {
            *sums.entry(row.account_id).or_insert(Decimal::ZERO) += row.amount;
        }
        accounts
            .iter()
            .filter_map(|a| {
                let balance = sums.get(&a.id).copied().unwrap_or(Decimal::ZERO);
                (include_zero || !balance.is_zero()).then(|| AccountBalance {
                    account_id: a.id,
                    code: a.code.clone(),
                    description: a.description.clone(),
                    currency_id: a.currency_id,
                    balance,
                })
            })
            .collect()
    }

    /// Balances collapsed by currency.
    ///
    /// Without a category filter every currency nets to zero, so nothing is
    /// returned.
    #[must_use]
    pub fn totals_by_currency(balances: &[AccountBalance], filtered: bool) -> Vec<CurrencyTotal> {
        if !filtered {
            return Vec::new();
        }
        let mut totals: BTreeMap<CurrencyId, Decimal> = BTreeMap::new();
        for b in balances {
            *totals.entry(b.currency_id).or_insert(Decimal::ZERO) += b.balance;
        }
        totals
            .into_iter()
            .map(|(currency_id, total)| CurrencyTotal { currency_id, total })
            .collect()
    }

    /// Sorts rows by account order, date, entry number and posting id.
    pub fn sort_ledger(rows: &mut [LedgerRow]) {
        rows.sort_by(|a, b| {
            a.order_key
                .cmp(&b.order_key)
                .then(a.date.cmp(&b.date))
                .then(a.entry_number.cmp(&b.entry_number))
                .then(a.posting_id.cmp(&b.posting_id))
        });
    }

    /// Sum of the account's postings strictly before `row`.
    ///
    /// "Before" means an earlier date, or the same date and a lower posting id.
    #[must_use]
    pub fn sum_before(period_rows: &[LedgerRow], row: &LedgerRow) -> Decimal {
        period_rows
            .iter()
            .filter(|r| {
                r.account_id == row.account_id
                    && (r.date < row.date || (r.date == row.date && r.posting_id < row.posting_id))
            })
            .map(|r| r.amount)
            .sum()
    }

    /// Balance carried into a ledger page.
    ///
    /// `period_rows` are all rows of the requested accounts in the period,
    /// whatever the range. Returns `None` for number ranges, zero on the first
    /// page when no lower date bound applies (a bound on or before the period
    /// start does not count), and the sum before the page's first row
    /// otherwise. An empty page carries everything dated strictly before the
    /// upper bound.
    #[must_use]
    pub fn prior_balance(
        period_rows: &[LedgerRow],
        range: &EntryRange,
        first: Option<&LedgerRow>,
        is_first_page: bool,
        period: (NaiveDate, NaiveDate),
    ) -> Option<Decimal> {
        if range.is_numbers() {
            return None;
        }
        let (start, end) = period;
        let unbounded = range.date_from().is_none_or(|from| from <= start);
        if is_first_page && unbounded {
            return Some(Decimal::ZERO);
        }
        Some(match first {
            Some(row) => Self::sum_before(period_rows, row),
            None => {
                let upper = range.date_to().unwrap_or(end);
                period_rows
                    .iter()
                    .filter(|r| r.date < upper)
                    .map(|r| r.amount)
                    .sum()
            }
        })
    }

    /// A counted ledger page over rows sorted with [`Self::sort_ledger`].
    #[must_use]
    pub fn ledger_page(
        period_rows: &[LedgerRow],
        range: &EntryRange,
        request: PageRequest,
        period: (NaiveDate, NaiveDate),
    ) -> LedgerPage {
        let in_range: Vec<&LedgerRow> = period_rows
            .iter()
            .filter(|r| range.contains(r.date, r.entry_number))
            .collect();
        let total = u64::try_from(in_range.len()).unwrap_or(u64::MAX);
        let rows: Vec<LedgerRow> = request.apply(in_range).into_iter().cloned().collect();

        let prior_balance =
            Self::prior_balance(period_rows, range, rows.first(), request.is_first(), period);
        let unbounded = range.date_from().is_none_or(|from| from <= period.0);

        let lines = Self::with_running_balance(rows, |row, first_on_page| {
            if first_on_page {
                prior_balance.unwrap_or(Decimal::ZERO)
            } else if range.is_numbers() || unbounded {
                Decimal::ZERO
            } else {
                Self::sum_before(period_rows, row)
            }
        });

        LedgerPage {
            page: PageResponse::new(lines, request, total),
            prior_balance,
        }
    }

    /// Streams every ledger line in range to `sink`, one account after the
    /// other. Each account starts from its balance before the lower date bound.
    pub fn ledger_stream<F>(
        period_rows: &[LedgerRow],
        range: &EntryRange,
        period_start: NaiveDate,
        mut sink: F,
    ) where
        F: FnMut(LedgerLine),
    {
        let rows: Vec<LedgerRow> = period_rows
            .iter()
            .filter(|r| range.contains(r.date, r.entry_number))
            .cloned()
            .collect();
        let from = range.date_from().filter(|from| *from > period_start);
        let lines = Self::with_running_balance(rows, |row, _| match from {
            Some(from) => period_rows
                .iter()
                .filter(|r| r.account_id == row.account_id && r.date < from)
                .map(|r| r.amount)
                .sum(),
            None => Decimal::ZERO,
        });
        for line in lines {
            sink(line);
        }
    }

    /// Attaches running balances, restarting at every account change.
    ///
    /// `opening(row, first_on_page)` gives the balance before an account's
    /// first row.
    pub fn with_running_balance<F>(rows: Vec<LedgerRow>, opening: F) -> Vec<LedgerLine>
    where
        F: Fn(&LedgerRow, bool) -> Decimal,
    {
        let mut lines = Vec::with_capacity(rows.len());
        let mut current: Option<(NodeId, Decimal)> = None;
        for (i, row) in rows.into_iter().enumerate() {
            let base = match current {
                Some((account, balance)) if account == row.account_id => balance,
                _ => opening(&row, i == 0),
            };
            let running_balance = base + row.amount;
            current = Some((row.account_id, running_balance));
            lines.push(LedgerLine {
                row,
                running_balance,
            });
        }
        lines
    }

    /// Per (account, calendar month) balances, ordered by account order key
    /// and month.
    #[must_use]
    pub fn balance_by_month(rows: &[LedgerRow]) -> Vec<MonthlyBalance> {
        let mut grouped: BTreeMap<(&str, NodeId, NaiveDate), (CurrencyId, Decimal)> =
            BTreeMap::new();
        for row in rows {
            let month = first_of_month(row.date);
            let slot = grouped
                .entry((row.order_key.as_str(), row.account_id, month))
                .or_insert((row.currency_id, Decimal::ZERO));
            slot.1 += row.amount;
        }
        grouped
            .into_iter()
            .map(|((_, account_id, month), (currency_id, balance))| MonthlyBalance {
                account_id,
                currency_id,
                month,
                balance,
            })
            .collect()
    }
}

/// First day of the month `date` falls in.
#[must_use]
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
