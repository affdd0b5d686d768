//! Fiscal period types and posting guards.

use chrono::NaiveDate;
use contab_shared::types::{EntryId, FiscalPeriodId, OrganizationId};
use serde::{Deserialize, Serialize};

use super::error::FiscalError;

/// A bounded fiscal interval, the unit of closing and reopening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    /// Unique identifier.
    pub id: FiscalPeriodId,
    /// Organization this period belongs to.
    pub organization_id: OrganizationId,
    /// First day of the period.
    pub start: NaiveDate,
    /// Last day of the period.
    pub end: NaiveDate,
    /// Entries dated on or before this day are locked.
    pub confirmed_through: Option<NaiveDate>,
    /// Set once the period has been closed.
    pub finalized: bool,
    /// Entry carrying the previous period's balances.
    pub opening_entry_id: Option<EntryId>,
    /// Entry zeroing every account at close.
    pub closing_entry_id: Option<EntryId>,
    /// Entry moving result accounts into the results balancing account.
    pub consolidation_entry_id: Option<EntryId>,
    /// Inflation adjustment entry.
    pub adjustment_entry_id: Option<EntryId>,
    /// Optimistic concurrency version.
    pub version: u32,
}

/// Input for creating a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodInput {
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

impl FiscalPeriod {
    /// A new open period with no generated entries.
    #[must_use]
    pub fn new(organization_id: OrganizationId, input: PeriodInput) -> Self {
        Self {
            id: FiscalPeriodId(0),
            organization_id,
            start: input.start,
            end: input.end,
            confirmed_through: None,
            finalized: false,
            opening_entry_id: None,
            closing_entry_id: None,
            consolidation_entry_id: None,
            adjustment_entry_id: None,
            version: 0,
        }
    }

    /// Returns true if the given date falls within this period.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Returns true for the opening, closing, consolidation or adjustment entry.
    #[must_use]
    pub fn is_special(&self, entry_id: EntryId) -> bool {
        self.special_entries().contains(&entry_id)
    }

    /// Ids of the generated entries currently recorded.
    #[must_use]
    pub fn special_entries(&self) -> Vec<EntryId> {
        [
            self.opening_entry_id,
            self.consolidation_entry_id,
            self.closing_entry_id,
            self.adjustment_entry_id,
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Forgets `entry_id` if it is one of the generated entries.
    pub fn detach_special(&mut self, entry_id: EntryId) {
        for slot in [
            &mut self.opening_entry_id,
            &mut self.consolidation_entry_id,
            &mut self.closing_entry_id,
            &mut self.adjustment_entry_id,
        ] {
            if *slot == Some(entry_id) {
                *slot = None;
            }
        }
    }

    /// Guards any mutation of the period's entries.
    ///
    /// # Errors
    ///
    /// `Finalized` once the period is closed.
    pub fn ensure_open(&self) -> Result<(), FiscalError> {
        if self.finalized {
            return Err(FiscalError::Finalized(self.id));
        }
        Ok(())
    }

    /// Guards creating or moving an entry to `date`.
    ///
    /// # Errors
    ///
    /// `Finalized`, `DateOutsidePeriod`, or `DateConfirmed` when `date` is on
    /// or before the confirmed-through day.
    pub fn ensure_postable(&self, date: NaiveDate) -> Result<(), FiscalError> {
        self.ensure_open()?;
        if !self.contains_date(date) {
            return Err(FiscalError::DateOutsidePeriod {
                date,
                start: self.start,
                end: self.end,
            });
        }
        if let Some(confirmed_through) = self.confirmed_through
            && date <= confirmed_through
        {
            return Err(FiscalError::DateConfirmed {
                date,
                confirmed_through,
            });
        }
        Ok(())
    }

    /// Validates a new confirmed-through day.
    ///
    /// # Errors
    ///
    /// `Finalized`, `DateOutsidePeriod`, or `ConfirmationNotAfter` when the day
    /// does not move the current confirmation forward.
    pub fn validate_confirmation(&self, date: NaiveDate) -> Result<(), FiscalError> {
        self.ensure_open()?;
        if !self.contains_date(date) {
            return Err(FiscalError::DateOutsidePeriod {
                date,
                start: self.start,
                end: self.end,
            });
        }
        if let Some(current) = self.confirmed_through
            && date <= current
        {
            return Err(FiscalError::ConfirmationNotAfter {
                date,
                confirmed_through: current,
            });
        }
        Ok(())
    }
}

/// Validates a period's date range.
///
/// # Errors
///
/// `InvalidRange` unless `start < end`.
pub fn validate_range(input: &PeriodInput) -> Result<(), FiscalError> {
    if input.start >= input.end {
        return Err(FiscalError::InvalidRange {
            start: input.start,
            end: input.end,
        });
    }
    Ok(())
}

/// Validates a new period against the organization's latest one.
///
/// # Errors
///
/// `InvalidRange`, or `StartNotAfterPrevious` when the new period does not
/// begin after the previous one ends.
pub fn validate_next(previous: Option<&FiscalPeriod>, input: &PeriodInput) -> Result<(), FiscalError> {
    validate_range(input)?;
    if let Some(previous) = previous
        && input.start <= previous.end
    {
        return Err(FiscalError::StartNotAfterPrevious {
            start: input.start,
            previous_end: previous.end,
        });
    }
    Ok(())
}
