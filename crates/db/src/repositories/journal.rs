//! Journal entry repository.
//!
//! Entries are validated in three passes before anything is written: the
//! period guards, the shape of the lines, and the per-currency balance of the
//! resolved postings. Positions are assigned by [`PostingService::arrange`].

use std::collections::BTreeSet;

use chrono::NaiveDate;
use contab_core::fiscal::FiscalPeriod;
use contab_core::ledger::{
    EntryInput, EntryWithPostings, JournalEntry, LedgerError, Posting, PostingInput,
    PostingService, ResolvedPosting,
};
use contab_core::reports::{EntryRange, ReportService};
use contab_shared::types::{
    EntryId, FiscalPeriodId, OrganizationId, PageRequest, PageResponse, PostingId,
};
use contab_shared::{AppError, AppResult};
use tracing::{debug, info};

use super::chart::posting_account;
use super::currency::default_currency_id;
use super::fiscal::period;
use crate::store::{Database, StoreError, Tables};

/// Default upper bound for a requested page size.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 500;

/// Journal entry repository.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: Database,
    max_page_size: u32,
}

impl JournalRepository {
    /// Creates a new journal repository.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self {
            db,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Caps the page size of list queries.
    #[must_use]
    pub const fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Records a new entry in an open period.
    ///
    /// # Errors
    ///
    /// - `Frozen` when the period is finalized or the date is confirmed
    /// - `InvalidInput` for a date outside the period, a malformed line or an
    ///   unbalanced currency
    /// - `NotFound` for an unknown period or account
    pub fn create(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
        input: EntryInput,
    ) -> AppResult<EntryWithPostings> {
        let created = self.db.transaction(|tx| {
            let period = period(tx, org, period_id)?;
            period.ensure_postable(input.date)?;

            let resolved = PostingService::validate_and_resolve(&input, true, |id| {
                posting_account(tx, org, id)
            })?;
            let postings = PostingService::arrange(resolved, default_currency_id(tx, org));
            let number = PostingService::next_number(max_number(tx, period_id));
            Ok::<_, AppError>(insert_entry(
                tx,
                period_id,
                number,
                input.date,
                input.description.trim(),
                postings,
            ))
        })?;

        info!(
            org_id = %org,
            period_id = %period_id,
            entry_id = %created.entry.id,
            number = created.entry.number,
            postings = created.postings.len(),
            "Journal entry created"
        );
        Ok(created)
    }

    /// Replaces an entry's header and lines.
    ///
    /// Lines carrying the id of one of the entry's postings update it in
    /// place; other lines become new postings and postings no line claims are
    /// deleted. Both the stored and the new date must be postable.
    ///
    /// # Errors
    ///
    /// As for [`Self::create`], plus `NotFound` for an unknown entry and
    /// `VersionConflict` when `input.version` is stale.
    pub fn update(
        &self,
        org: OrganizationId,
        entry_id: EntryId,
        input: EntryInput,
    ) -> AppResult<EntryWithPostings> {
        let updated = self.db.transaction(|tx| {
            let (entry, period) = entry(tx, org, entry_id)?;
            let entry = entry.clone();
            period.ensure_postable(entry.date)?;
            period.ensure_postable(input.date)?;

            let existing = postings_of(tx, entry_id);
            let merge = PostingService::merge(&existing, &input.postings);
            let claimed: BTreeSet<PostingId> = merge.kept.iter().filter_map(|p| p.id).collect();
            let lines: Vec<PostingInput> = input
                .postings
                .iter()
                .map(|line| PostingInput {
                    id: line.id.filter(|id| claimed.contains(id)),
                    ..line.clone()
                })
                .collect();
            let merged = EntryInput {
                postings: lines,
                ..input.clone()
            };

            let resolved = PostingService::validate_and_resolve(&merged, true, |id| {
                posting_account(tx, org, id)
            })?;
            let postings = PostingService::arrange(resolved, default_currency_id(tx, org));

            let header = tx.entries.update(JournalEntry {
                date: input.date,
                description: input.description.trim().to_string(),
                version: input.version,
                ..entry
            })?;
            for id in &merge.removed {
                tx.postings.remove(*id);
            }
            let postings = write_postings(tx, entry_id, postings)?;
            debug!(
                entry_id = %entry_id,
                kept = merge.kept.len(),
                added = merge.added.len(),
                removed = merge.removed.len(),
                "Postings merged"
            );
            Ok::<_, AppError>(EntryWithPostings {
                entry: header,
                postings,
            })
        })?;

        info!(
            org_id = %org,
            entry_id = %entry_id,
            version = updated.entry.version,
            "Journal entry updated"
        );
        Ok(updated)
    }

    /// Deletes one entry with its postings.
    ///
    /// # Errors
    ///
    /// `Frozen` for a finalized period or a confirmed date, `Conflict` for a
    /// generated entry, `NotFound` for an unknown entry.
    pub fn delete(&self, org: OrganizationId, entry_id: EntryId) -> AppResult<()> {
        self.db.transaction(|tx| {
            let (entry, period) = entry(tx, org, entry_id)?;
            ensure_deletable(entry, period)?;
            remove_entry(tx, entry_id);
            Ok::<_, AppError>(())
        })?;

        info!(org_id = %org, entry_id = %entry_id, "Journal entry deleted");
        Ok(())
    }

    /// Deletes several entries of one period, all or none.
    ///
    /// # Errors
    ///
    /// As for [`Self::delete`]; `NotFound` when an id belongs to another
    /// period.
    pub fn bulk_delete(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
        ids: &[EntryId],
    ) -> AppResult<usize> {
        let removed = self.db.transaction(|tx| {
            period(tx, org, period_id)?.ensure_open()?;
            for id in ids {
                let (entry, period) = entry(tx, org, *id)?;
                if entry.period_id != period_id {
                    return Err(LedgerError::EntryNotFound(*id).into());
                }
                ensure_deletable(entry, period)?;
            }
            let unique: BTreeSet<EntryId> = ids.iter().copied().collect();
            for id in &unique {
                remove_entry(tx, *id);
            }
            Ok::<_, AppError>(unique.len())
        })?;

        info!(org_id = %org, period_id = %period_id, entries = removed, "Journal entries deleted");
        Ok(removed)
    }

    /// Deletes every entry of an open period, generated ones included.
    ///
    /// # Errors
    ///
    /// `Frozen` for a finalized period, `NotFound` for an unknown period.
    pub fn delete_all_of_period(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
    ) -> AppResult<usize> {
        let removed = self.db.transaction(|tx| {
            period(tx, org, period_id)?.ensure_open()?;
            let removed = remove_period_entries(tx, period_id);
            tx.periods.modify(period_id, |p| {
                p.opening_entry_id = None;
                p.consolidation_entry_id = None;
                p.closing_entry_id = None;
                p.adjustment_entry_id = None;
            })?;
            Ok::<_, AppError>(removed)
        })?;

        info!(org_id = %org, period_id = %period_id, entries = removed, "Period entries deleted");
        Ok(removed)
    }

    /// Number the next entry of the period would get.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown period.
    pub fn next_number_preview(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
    ) -> AppResult<u32> {
        self.db.read(|t| {
            period(t, org, period_id)?;
            Ok(PostingService::next_number(max_number(t, period_id)))
        })
    }

    /// Loads an entry with its postings.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown entry or one of another organization.
    pub fn get(&self, org: OrganizationId, entry_id: EntryId) -> AppResult<EntryWithPostings> {
        self.db.read(|t| {
            let (entry, _) = entry(t, org, entry_id)?;
            Ok(EntryWithPostings {
                entry: entry.clone(),
                postings: postings_of(t, entry_id),
            })
        })
    }

    /// Entries of a period in `range`, ordered by date and number.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown period, `InvalidInput` for an inverted range.
    pub fn list(
        &self,
        org: OrganizationId,
        period_id: FiscalPeriodId,
        range: &EntryRange,
        page: PageRequest,
    ) -> AppResult<PageResponse<EntryWithPostings>> {
        ReportService::validate_range(range)?;
        let page = page.clamped(self.max_page_size);
        self.db.read(|t| {
            period(t, org, period_id)?;
            let mut entries: Vec<&JournalEntry> = t
                .entries
                .filter(|e| e.period_id == period_id && range.contains(e.date, e.number))
                .collect();
            entries.sort_by_key(|e| (e.date, e.number));
            let total = u64::try_from(entries.len()).unwrap_or(u64::MAX);
            let data = page
                .apply(entries)
                .into_iter()
                .map(|e| EntryWithPostings {
                    entry: e.clone(),
                    postings: postings_of(t, e.id),
                })
                .collect();
            Ok(PageResponse::new(data, page, total))
        })
    }
}

/// Loads an entry of `org` together with its period.
pub(crate) fn entry(
    tables: &Tables,
    org: OrganizationId,
    id: EntryId,
) -> AppResult<(&JournalEntry, &FiscalPeriod)> {
    let entry = tables.entries.get(id).ok_or(LedgerError::EntryNotFound(id))?;
    let period = period(tables, org, entry.period_id)
        .map_err(|_| LedgerError::EntryNotFound(id))?;
    Ok((entry, period))
}

/// Postings of an entry by position.
pub(crate) fn postings_of(tables: &Tables, entry_id: EntryId) -> Vec<Posting> {
    let mut postings: Vec<Posting> = tables
        .postings
        .filter(|p| p.entry_id == entry_id)
        .cloned()
        .collect();
    postings.sort_by_key(|p| p.position);
    postings
}

/// Highest entry number used in a period.
pub(crate) fn max_number(tables: &Tables, period_id: FiscalPeriodId) -> Option<u32> {
    tables
        .entries
        .filter(|e| e.period_id == period_id)
        .map(|e| e.number)
        .max()
}

/// Inserts an entry header and its positioned postings.
pub(crate) fn insert_entry(
    tx: &mut Tables,
    period_id: FiscalPeriodId,
    number: u32,
    date: NaiveDate,
    description: &str,
    postings: Vec<(u32, ResolvedPosting)>,
) -> EntryWithPostings {
    let entry = tx.entries.insert(JournalEntry {
        id: EntryId(0),
        period_id,
        number,
        date,
        description: description.to_string(),
        version: 0,
    });
    let postings = postings
        .into_iter()
        .map(|(position, p)| {
            tx.postings.insert(Posting {
                id: PostingId(0),
                entry_id: entry.id,
                position,
                account_id: p.account_id,
                amount: p.amount,
                detail: p.detail,
                version: 0,
            })
        })
        .collect();
    EntryWithPostings { entry, postings }
}

/// Inserts a generated entry with the next number, keeping builder order.
///
/// `text` is both the description and every posting's detail.
pub(crate) fn insert_generated(
    tx: &mut Tables,
    period_id: FiscalPeriodId,
    date: NaiveDate,
    text: &str,
    postings: Vec<ResolvedPosting>,
) -> EntryWithPostings {
    let number = PostingService::next_number(max_number(tx, period_id));
    insert_entry(tx, period_id, number, date, text, positioned(postings))
}

/// Pairs postings with positions 1..n in their current order.
pub(crate) fn positioned(postings: Vec<ResolvedPosting>) -> Vec<(u32, ResolvedPosting)> {
    (1u32..).zip(postings).collect()
}

/// Writes positioned postings: updates those with an id, inserts the rest.
pub(crate) fn write_postings(
    tx: &mut Tables,
    entry_id: EntryId,
    postings: Vec<(u32, ResolvedPosting)>,
) -> Result<Vec<Posting>, StoreError> {
    postings
        .into_iter()
        .map(|(position, p)| match p.id {
            Some(id) => tx.postings.modify(id, |stored| {
                stored.position = position;
                stored.account_id = p.account_id;
                stored.amount = p.amount;
                stored.detail = p.detail;
            }),
            None => Ok(tx.postings.insert(Posting {
                id: PostingId(0),
                entry_id,
                position,
                account_id: p.account_id,
                amount: p.amount,
                detail: p.detail,
                version: 0,
            })),
        })
        .collect()
}

/// Deletes an entry's postings, then the entry.
pub(crate) fn remove_entry(tx: &mut Tables, entry_id: EntryId) {
    tx.postings.remove_where(|p| p.entry_id == entry_id);
    tx.entries.remove(entry_id);
}

/// Deletes every entry of a period, returning how many went away.
pub(crate) fn remove_period_entries(tx: &mut Tables, period_id: FiscalPeriodId) -> usize {
    let ids: Vec<EntryId> = tx
        .entries
        .filter(|e| e.period_id == period_id)
        .map(|e| e.id)
        .collect();
    for id in &ids {
        remove_entry(tx, *id);
    }
    ids.len()
}

fn ensure_deletable(entry: &JournalEntry, period: &FiscalPeriod) -> AppResult<()> {
    period.ensure_postable(entry.date)?;
    if period.is_special(entry.id) {
        return Err(LedgerError::SpecialEntry(entry.id).into());
    }
    Ok(())
}
