//! Double-entry journal entries and postings.
//!
//! This module implements the posting engine rules:
//! - Entry and posting shape validation
//! - Account resolution against the chart
//! - Per-currency zero-sum check
//! - Posting merge, ordering and entry numbering

pub mod error;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod validation_props;

pub use error::LedgerError;
pub use service::PostingService;
pub use types::{
    DESCRIPTION_MAX_LEN, DETAIL_MAX_LEN, EntryInput, EntryWithPostings, JournalEntry, Posting,
    MAX_POSTINGS, PostingAccount, PostingInput, PostingMerge, ResolvedPosting,
};
