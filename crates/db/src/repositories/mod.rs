//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface over the in-memory store. Each one
//! holds a cheap [`Database`](crate::Database) handle; every mutating method
//! is one atomic unit of work and returns an [`AppResult`](contab_shared::AppResult).

pub mod chart;
pub mod currency;
pub mod fiscal;
pub mod inflation;
pub mod journal;
pub mod organization;
pub mod report;

pub use chart::ChartRepository;
pub use currency::CurrencyRepository;
pub use fiscal::FiscalRepository;
pub use inflation::InflationRepository;
pub use journal::{DEFAULT_MAX_PAGE_SIZE, JournalRepository};
pub use organization::{CreateOrganizationInput, OrganizationRepository};
pub use report::ReportRepository;
