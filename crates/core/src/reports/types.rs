//! Balance and ledger query types.

use chrono::NaiveDate;
use contab_shared::types::{CurrencyId, EntryId, NodeId, PageResponse, PostingId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which entries of a period a query covers.
///
/// Date and number bounds are mutually exclusive; both ends are inclusive and
/// optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum EntryRange {
    /// Every entry of the period.
    #[default]
    All,
    /// Entries dated within the bounds.
    Dates {
        /// Lower bound.
        from: Option<NaiveDate>,
        /// Upper bound.
        to: Option<NaiveDate>,
    },
    /// Entries numbered within the bounds.
    Numbers {
        /// Lower bound.
        from: Option<u32>,
        /// Upper bound.
        to: Option<u32>,
    },
}

impl EntryRange {
    /// Returns true if an entry with this date and number is covered.
    #[must_use]
    pub fn contains(&self, date: NaiveDate, number: u32) -> bool {
        match *self {
            Self::All => true,
            Self::Dates { from, to } => {
                from.is_none_or(|f| date >= f) && to.is_none_or(|t| date <= t)
            }
            Self::Numbers { from, to } => {
                from.is_none_or(|f| number >= f) && to.is_none_or(|t| number <= t)
            }
        }
    }

    /// Lower date bound, if any.
    #[must_use]
    pub fn date_from(&self) -> Option<NaiveDate> {
        match self {
            Self::Dates { from, .. } => *from,
            _ => None,
        }
    }

    /// Upper date bound, if any.
    #[must_use]
    pub fn date_to(&self) -> Option<NaiveDate> {
        match self {
            Self::Dates { to, .. } => *to,
            _ => None,
        }
    }

    /// Returns true for a number range.
    #[must_use]
    pub fn is_numbers(&self) -> bool {
        matches!(self, Self::Numbers { .. })
    }
}

/// How a category filter applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Accounts below any of the categories.
    #[default]
    Include,
    /// Accounts below none of the categories.
    Exclude,
}

/// Restricts a query to part of the chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter {
    /// Include or exclude.
    pub mode: FilterMode,
    /// Categories the filter refers to.
    pub categories: Vec<NodeId>,
}

/// Parameters of a balance query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceQuery {
    /// Entries covered.
    #[serde(default)]
    pub range: EntryRange,
    /// Optional category filter.
    #[serde(default)]
    pub filter: Option<CategoryFilter>,
    /// List accounts whose balance is zero.
    #[serde(default)]
    pub include_zero: bool,
}

impl BalanceQuery {
    /// The category filter, if it names at least one category.
    ///
    /// A filter with an empty category list restricts nothing.
    #[must_use]
    pub fn category_filter(&self) -> Option<&CategoryFilter> {
        self.filter.as_ref().filter(|f| !f.categories.is_empty())
    }
}

/// Signed balance of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Account.
    pub account_id: NodeId,
    /// Account code.
    pub code: String,
    /// Account description.
    pub description: String,
    /// Account currency.
    pub currency_id: CurrencyId,
    /// Sum of the covered postings.
    pub balance: Decimal,
}

/// Sum of balances in one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTotal {
    /// Currency.
    pub currency_id: CurrencyId,
    /// Signed total.
    pub total: Decimal,
}

/// Account facts a report needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportAccount {
    /// Account.
    pub id: NodeId,
    /// Code.
    pub code: String,
    /// Sortable code.
    pub order_key: String,
    /// Description.
    pub description: String,
    /// Currency.
    pub currency_id: CurrencyId,
}

/// One posting joined with its entry and account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    /// Posting.
    pub posting_id: PostingId,
    /// Entry.
    pub entry_id: EntryId,
    /// Entry number.
    pub entry_number: u32,
    /// Entry date.
    pub date: NaiveDate,
    /// Entry description.
    pub description: String,
    /// Posting detail.
    pub detail: String,
    /// Account.
    pub account_id: NodeId,
    /// Account sortable code.
    pub order_key: String,
    /// Account currency.
    pub currency_id: CurrencyId,
    /// Signed amount.
    pub amount: Decimal,
}

/// A ledger row with the account's balance after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    /// The posting.
    #[serde(flatten)]
    pub row: LedgerRow,
    /// Balance of the account including this posting.
    pub running_balance: Decimal,
}

/// A page of ledger lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerPage {
    /// The lines.
    pub page: PageResponse<LedgerLine>,
    /// Balance before the first line. `None` for number ranges.
    pub prior_balance: Option<Decimal>,
}

/// Balance of one account over one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyBalance {
    /// Account.
    pub account_id: NodeId,
    /// Account currency.
    pub currency_id: CurrencyId,
    /// First day of the month.
    pub month: NaiveDate,
    /// Sum of the month's postings.
    pub balance: Decimal,
}
