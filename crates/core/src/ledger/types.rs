//! Journal entry domain types.
//!
//! A [`JournalEntry`] belongs to one fiscal period and owns an ordered list of
//! [`Posting`]s. Amounts are signed: zero or positive is a debit, negative a
//! credit. Every posting's currency is the currency of its account.

use chrono::NaiveDate;
use contab_shared::types::{CurrencyId, EntryId, FiscalPeriodId, NodeId, PostingId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum length of an entry description.
pub const DESCRIPTION_MAX_LEN: usize = 70;

/// Maximum length of a posting detail.
pub const DETAIL_MAX_LEN: usize = 50;

/// Maximum number of lines in a user entry.
pub const MAX_POSTINGS: usize = 1_000;

/// A persisted journal entry header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier.
    pub id: EntryId,
    /// Owning fiscal period.
    pub period_id: FiscalPeriodId,
    /// Number, unique within the period.
    pub number: u32,
    /// Accounting date.
    pub date: NaiveDate,
    /// Free text description.
    pub description: String,
    /// Optimistic concurrency version.
    pub version: u32,
}

/// A persisted posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Unique identifier.
    pub id: PostingId,
    /// Owning entry.
    pub entry_id: EntryId,
    /// 1-based display position inside the entry.
    pub position: u32,
    /// Account posted to.
    pub account_id: NodeId,
    /// Signed amount, debit when zero or positive.
    pub amount: Decimal,
    /// Line detail.
    pub detail: String,
    /// Optimistic concurrency version.
    pub version: u32,
}

impl Posting {
    /// Returns true for a debit posting.
    #[must_use]
    pub fn is_debit(&self) -> bool {
        contab_shared::types::money::is_debit(self.amount)
    }
}

/// An entry loaded together with its postings, ordered by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryWithPostings {
    /// Entry header.
    pub entry: JournalEntry,
    /// Postings in position order.
    pub postings: Vec<Posting>,
}

/// Input for one posting line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingInput {
    /// Existing posting id when updating, `None` for new lines.
    pub id: Option<PostingId>,
    /// Account to post to.
    pub account_id: Option<NodeId>,
    /// Signed amount.
    pub amount: Decimal,
    /// Line detail.
    pub detail: String,
}

impl PostingInput {
    /// New posting line.
    #[must_use]
    pub fn new(account_id: NodeId, amount: Decimal, detail: impl Into<String>) -> Self {
        Self {
            id: None,
            account_id: Some(account_id),
            amount,
            detail: detail.into(),
        }
    }
}

/// Input for creating or updating an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInput {
    /// Accounting date.
    pub date: NaiveDate,
    /// Description.
    pub description: String,
    /// Posting lines.
    pub postings: Vec<PostingInput>,
    /// Version the caller read (updates only).
    #[serde(default)]
    pub version: u32,
}

/// Account facts needed to resolve a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingAccount {
    /// Account id.
    pub id: NodeId,
    /// Account currency.
    pub currency_id: CurrencyId,
    /// Whether the node is a postable account (not a category).
    pub is_account: bool,
}

/// A posting whose account has been resolved to a currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPosting {
    /// Existing posting id, if any.
    pub id: Option<PostingId>,
    /// Account posted to.
    pub account_id: NodeId,
    /// Currency of the account.
    pub currency_id: CurrencyId,
    /// Signed amount.
    pub amount: Decimal,
    /// Line detail.
    pub detail: String,
}

impl ResolvedPosting {
    /// Returns true for a debit posting.
    #[must_use]
    pub fn is_debit(&self) -> bool {
        contab_shared::types::money::is_debit(self.amount)
    }
}

/// Outcome of matching stored postings against incoming lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingMerge {
    /// Lines that keep an existing posting (updated in place).
    pub kept: Vec<PostingInput>,
    /// Lines that become new postings.
    pub added: Vec<PostingInput>,
    /// Existing postings no longer present.
    pub removed: Vec<PostingId>,
}

impl PostingMerge {
    /// All surviving lines, kept ones first.
    #[must_use]
    pub fn lines(&self) -> Vec<PostingInput> {
        self.kept.iter().chain(&self.added).cloned().collect()
    }
}
