//! Posting service: validation, account resolution and ordering of postings.
//!
//! This module contains pure business logic with no storage dependencies. The
//! repositories hand it lookups as closures and persist what it returns.

use std::collections::{BTreeSet, HashMap};

use contab_shared::types::{CurrencyId, EntryId, NodeId, PostingId};

use super::error::LedgerError;
use super::types::{
    EntryInput, JournalEntry, Posting, PostingAccount, PostingInput, PostingMerge,
    ResolvedPosting,
};
use super::validation::{validate_balanced, validate_shape};

/// Posting service for journal entry validation and resolution.
pub struct PostingService;

impl PostingService {
    /// Validate and resolve an entry before persisting.
    ///
    /// Steps, in this order:
    /// 1. Header and line shape (description, accounts present, amounts, details)
    /// 2. Account resolution (exists in the organization, is a leaf)
    /// 3. Per-currency zero sum
    ///
    /// Nothing is resolved when the shape is wrong, and the balance is only
    /// checked once every account is known.
    ///
    /// # Errors
    ///
    /// Returns the first `LedgerError` encountered.
    pub fn validate_and_resolve<A>(
        input: &EntryInput,
        require_postings: bool,
        account_lookup: A,
    ) -> Result<Vec<ResolvedPosting>, LedgerError>
    where
        A: Fn(NodeId) -> Option<PostingAccount>,
    {
        validate_shape(input, require_postings)?;
        let resolved = Self::resolve(&input.postings, account_lookup)?;
        validate_balanced(&resolved)?;
        Ok(resolved)
    }

    /// Resolve each posting's account and currency.
    ///
    /// # Errors
    ///
    /// `MissingAccount`, `AccountNotFound` or `NotAnAccount`.
    pub fn resolve<A>(
        postings: &[PostingInput],
        account_lookup: A,
    ) -> Result<Vec<ResolvedPosting>, LedgerError>
    where
        A: Fn(NodeId) -> Option<PostingAccount>,
    {
        postings
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let account_id = p
                    .account_id
                    .ok_or(LedgerError::MissingAccount { position: i + 1 })?;
                let account =
                    account_lookup(account_id).ok_or(LedgerError::AccountNotFound(account_id))?;
                if !account.is_account {
                    return Err(LedgerError::NotAnAccount(account_id));
                }
                Ok(ResolvedPosting {
                    id: p.id,
                    account_id,
                    currency_id: account.currency_id,
                    amount: p.amount,
                    detail: p.detail.trim().to_string(),
                })
            })
            .collect()
    }

    /// Match incoming lines against the stored postings of an entry.
    ///
    /// A line whose id names a stored posting updates it in place. Lines
    /// without an id, or with an id the entry does not own, become new
    /// postings. Stored postings nobody claimed are removed.
    #[must_use]
    pub fn merge(existing: &[Posting], incoming: &[PostingInput]) -> PostingMerge {
        let stored: BTreeSet<PostingId> = existing.iter().map(|p| p.id).collect();
        let mut claimed = BTreeSet::new();
        let mut merge = PostingMerge::default();

        for line in incoming {
            match line.id {
                Some(id) if stored.contains(&id) && claimed.insert(id) => {
                    merge.kept.push(line.clone());
                }
                _ => merge.added.push(PostingInput {
                    id: None,
                    ..line.clone()
                }),
            }
        }

        merge.removed = existing
            .iter()
            .map(|p| p.id)
            .filter(|id| !claimed.contains(id))
            .collect();
        merge
    }

    /// Stored order of an entry's postings, paired with their 1-based positions.
    ///
    /// Postings are grouped by currency (the default currency first, then by
    /// currency id), debits before credits inside a currency. The sort is
    /// stable, ties keep input order.
    #[must_use]
    pub fn arrange(
        mut postings: Vec<ResolvedPosting>,
        default_currency: Option<CurrencyId>,
    ) -> Vec<(u32, ResolvedPosting)> {
        postings.sort_by_key(|p| {
            (
                Some(p.currency_id) != default_currency,
                p.currency_id,
                !p.is_debit(),
            )
        });
        (1u32..).zip(postings).collect()
    }

    /// Number for a new entry given the highest number in the period.
    #[must_use]
    pub fn next_number(max_number: Option<u32>) -> u32 {
        max_number.map_or(1, |n| n + 1)
    }

    /// Postings that exactly cancel `postings`, with a uniform detail.
    #[must_use]
    pub fn inverse(postings: &[ResolvedPosting], detail: &str) -> Vec<ResolvedPosting> {
        postings
            .iter()
            .map(|p| ResolvedPosting {
                id: None,
                account_id: p.account_id,
                currency_id: p.currency_id,
                amount: -p.amount,
                detail: detail.to_string(),
            })
            .collect()
    }

    /// Resolve stored postings back into currency-tagged postings.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if a stored account no longer resolves.
    pub fn resolve_stored<A>(
        postings: &[Posting],
        account_lookup: A,
    ) -> Result<Vec<ResolvedPosting>, LedgerError>
    where
        A: Fn(NodeId) -> Option<PostingAccount>,
    {
        postings
            .iter()
            .map(|p| {
                let account = account_lookup(p.account_id)
                    .ok_or(LedgerError::AccountNotFound(p.account_id))?;
                Ok(ResolvedPosting {
                    id: Some(p.id),
                    account_id: p.account_id,
                    currency_id: account.currency_id,
                    amount: p.amount,
                    detail: p.detail.clone(),
                })
            })
            .collect()
    }

    /// New numbers 1..n for the entries of a period, ordered by date and then
    /// creation order. Only entries whose number changes are returned.
    #[must_use]
    pub fn renumber(entries: &[JournalEntry]) -> Vec<(EntryId, u32)> {
        let mut ordered: Vec<&JournalEntry> = entries.iter().collect();
        ordered.sort_by_key(|e| (e.date, e.id));
        let current: HashMap<EntryId, u32> = entries.iter().map(|e| (e.id, e.number)).collect();
        ordered
            .into_iter()
            .zip(1u32..)
            .filter(|(e, number)| current.get(&e.id) != Some(number))
            .map(|(e, number)| (e.id, number))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use contab_shared::types::FiscalPeriodId;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const ARS: CurrencyId = CurrencyId(1);
    const USD: CurrencyId = CurrencyId(2);

    fn accounts(id: NodeId) -> Option<PostingAccount> {
        match id.0 {
            1..=9 => Some(PostingAccount {
                id,
                currency_id: ARS,
                is_account: true,
            }),
            10..=19 => Some(PostingAccount {
                id,
                currency_id: USD,
                is_account: true,
            }),
            100 => Some(PostingAccount {
                id,
                currency_id: ARS,
                is_account: false,
            }),
            _ => None,
        }
    }

    fn input(postings: Vec<PostingInput>) -> EntryInput {
        EntryInput {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            description: "Sale".into(),
            postings,
            version: 0,
        }
    }

    fn line(account: i64, amount: Decimal) -> PostingInput {
        PostingInput::new(NodeId(account), amount, "line")
    }

    fn resolved(account: i64, currency: CurrencyId, amount: Decimal) -> ResolvedPosting {
        ResolvedPosting {
            id: None,
            account_id: NodeId(account),
            currency_id: currency,
            amount,
            detail: format!("{account}"),
        }
    }

    fn stored(id: i64, amount: Decimal) -> Posting {
        Posting {
            id: PostingId(id),
            entry_id: EntryId(1),
            position: 1,
            account_id: NodeId(1),
            amount,
            detail: "stored".into(),
            version: 1,
        }
    }

    fn entry(id: i64, number: u32, day: u32) -> JournalEntry {
        JournalEntry {
            id: EntryId(id),
            period_id: FiscalPeriodId(1),
            number,
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            description: String::new(),
            version: 1,
        }
    }

    #[test]
    fn test_validate_and_resolve_balanced() {
        let result = PostingService::validate_and_resolve(
            &input(vec![line(1, dec!(1000)), line(2, dec!(-1000))]),
            true,
            accounts,
        )
        .unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|p| p.currency_id == ARS));
    }

    #[test]
    fn test_unknown_account() {
        let err = PostingService::validate_and_resolve(
            &input(vec![line(1, dec!(10)), line(77, dec!(-10))]),
            true,
            accounts,
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::AccountNotFound(NodeId(77)));
    }

    #[test]
    fn test_category_rejected() {
        let err = PostingService::validate_and_resolve(
            &input(vec![line(100, dec!(10)), line(1, dec!(-10))]),
            true,
            accounts,
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::NotAnAccount(NodeId(100)));
    }

    #[test]
    fn test_shape_checked_before_accounts() {
        // Unknown account on line 1, zero amount on line 2: shape wins.
        let err = PostingService::validate_and_resolve(
            &input(vec![line(77, dec!(10)), line(1, dec!(0))]),
            true,
            accounts,
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::ZeroAmount { position: 2 });
    }

    #[test]
    fn test_balance_checked_per_currency() {
        let err = PostingService::validate_and_resolve(
            &input(vec![line(1, dec!(10)), line(10, dec!(-10))]),
            true,
            accounts,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Unbalanced { currency_id, .. } if currency_id == ARS));
    }

    #[test]
    fn test_merge_diffs_by_id() {
        let existing = vec![stored(1, dec!(10)), stored(2, dec!(-10)), stored(3, dec!(5))];
        let mut keep = line(1, dec!(20));
        keep.id = Some(PostingId(1));
        let mut foreign = line(2, dec!(-20));
        foreign.id = Some(PostingId(99));

        let merge = PostingService::merge(&existing, &[keep.clone(), foreign]);
        assert_eq!(merge.kept, vec![keep]);
        assert_eq!(merge.added.len(), 1);
        assert_eq!(merge.added[0].id, None);
        assert_eq!(merge.removed, vec![PostingId(2), PostingId(3)]);
    }

    #[test]
    fn test_merge_duplicate_id_claims_once() {
        let existing = vec![stored(1, dec!(10))];
        let mut a = line(1, dec!(10));
        a.id = Some(PostingId(1));
        let merge = PostingService::merge(&existing, &[a.clone(), a]);
        assert_eq!(merge.kept.len(), 1);
        assert_eq!(merge.added.len(), 1);
        assert!(merge.removed.is_empty());
    }

    #[test]
    fn test_arrange_groups_currency_then_debits() {
        let postings = vec![
            resolved(10, USD, dec!(-5)),
            resolved(1, ARS, dec!(-100)),
            resolved(11, USD, dec!(5)),
            resolved(2, ARS, dec!(60)),
            resolved(3, ARS, dec!(40)),
        ];
        let arranged = PostingService::arrange(postings, Some(ARS));
        let order: Vec<(u32, i64)> = arranged.iter().map(|(pos, p)| (*pos, p.account_id.0)).collect();
        assert_eq!(order, vec![(1, 2), (2, 3), (3, 1), (4, 11), (5, 10)]);
    }

    #[test]
    fn test_arrange_default_currency_first() {
        let postings = vec![resolved(1, ARS, dec!(1)), resolved(10, USD, dec!(1))];
        let arranged = PostingService::arrange(postings, Some(USD));
        assert_eq!(arranged[0].1.currency_id, USD);
    }

    #[test]
    fn test_next_number() {
        assert_eq!(PostingService::next_number(None), 1);
        assert_eq!(PostingService::next_number(Some(41)), 42);
    }

    #[test]
    fn test_inverse_cancels() {
        let postings = vec![resolved(1, ARS, dec!(100)), resolved(2, ARS, dec!(-100))];
        let inverse = PostingService::inverse(&postings, "Opening entry");
        assert_eq!(inverse[0].amount, dec!(-100));
        assert_eq!(inverse[1].amount, dec!(100));
        assert!(inverse.iter().all(|p| p.detail == "Opening entry" && p.id.is_none()));
    }

    #[test]
    fn test_renumber_by_date_then_creation() {
        let entries = vec![entry(1, 1, 20), entry(2, 2, 5), entry(3, 3, 5), entry(4, 4, 25)];
        let changes = PostingService::renumber(&entries);
        assert_eq!(
            changes,
            vec![(EntryId(2), 1), (EntryId(3), 2), (EntryId(1), 3)]
        );
    }

    #[test]
    fn test_resolve_stored() {
        let resolved = PostingService::resolve_stored(&[stored(1, dec!(3))], accounts).unwrap();
        assert_eq!(resolved[0].id, Some(PostingId(1)));
        assert_eq!(resolved[0].currency_id, ARS);
    }
}
