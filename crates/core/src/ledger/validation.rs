//! Validation rules for journal entries.
//!
//! Shape checks run before any account lookup, the per-currency balance check
//! runs after resolution.

use std::collections::{BTreeMap, BTreeSet};

use contab_shared::types::{CurrencyId, PostingId};
use contab_shared::types::money::has_amount_scale;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{
    DESCRIPTION_MAX_LEN, DETAIL_MAX_LEN, EntryInput, MAX_POSTINGS, PostingInput, ResolvedPosting,
};

/// Validates the entry header.
///
/// # Errors
///
/// Returns `DescriptionTooLong` when the description exceeds the limit.
pub fn validate_header(input: &EntryInput) -> Result<(), LedgerError> {
    if input.description.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(LedgerError::DescriptionTooLong {
            max: DESCRIPTION_MAX_LEN,
        });
    }
    Ok(())
}

/// Validates a single posting line. `position` is 1-based.
///
/// # Errors
///
/// Returns the first rule the line breaks.
pub fn validate_posting(posting: &PostingInput, position: usize) -> Result<(), LedgerError> {
    if posting.account_id.is_none() {
        return Err(LedgerError::MissingAccount { position });
    }
    if posting.amount.is_zero() {
        return Err(LedgerError::ZeroAmount { position });
    }
    if !has_amount_scale(posting.amount) {
        return Err(LedgerError::InvalidScale {
            position,
            amount: posting.amount,
        });
    }
    let detail = posting.detail.trim();
    if detail.is_empty() {
        return Err(LedgerError::EmptyDetail { position });
    }
    if detail.chars().count() > DETAIL_MAX_LEN {
        return Err(LedgerError::DetailTooLong {
            position,
            max: DETAIL_MAX_LEN,
        });
    }
    Ok(())
}

/// Validates header and every posting line.
///
/// A stored posting id may appear on one line only.
///
/// Generated entries (closing, opening) skip the non-empty check, they may
/// legitimately carry no postings.
///
/// # Errors
///
/// Returns the first shape error found.
pub fn validate_shape(input: &EntryInput, require_postings: bool) -> Result<(), LedgerError> {
    validate_header(input)?;
    if require_postings && input.postings.is_empty() {
        return Err(LedgerError::EmptyEntry);
    }
    if input.postings.len() > MAX_POSTINGS {
        return Err(LedgerError::TooManyPostings { max: MAX_POSTINGS });
    }
    let mut seen: BTreeSet<PostingId> = BTreeSet::new();
    for (i, posting) in input.postings.iter().enumerate() {
        validate_posting(posting, i + 1)?;
        match posting.id {
            Some(id) if !seen.insert(id) => {
                return Err(LedgerError::RepeatedPosting {
                    position: i + 1,
                    posting_id: id,
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// Signed sum of the postings, per currency.
#[must_use]
pub fn currency_totals(postings: &[ResolvedPosting]) -> BTreeMap<CurrencyId, Decimal> {
    let mut totals = BTreeMap::new();
    for p in postings {
        *totals.entry(p.currency_id).or_insert(Decimal::ZERO) += p.amount;
    }
    totals
}

/// Checks that every currency sums to exactly zero.
///
/// # Errors
///
/// Returns `Unbalanced` for the first (lowest id) currency with a nonzero sum.
pub fn validate_balanced(postings: &[ResolvedPosting]) -> Result<(), LedgerError> {
    match currency_totals(postings)
        .into_iter()
        .find(|(_, total)| !total.is_zero())
    {
        Some((currency_id, difference)) => Err(LedgerError::Unbalanced {
            currency_id,
            difference,
        }),
        None => Ok(()),
    }
}
