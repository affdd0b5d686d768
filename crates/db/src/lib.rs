//! Persistence layer for Contab.
//!
//! This crate provides:
//! - An in-memory relational store with versioned tables and atomic units of work
//! - Repositories that run the `contab-core` rules inside one transaction
//!
//! Every mutating repository call is a single [`Database::transaction`]: a
//! failure anywhere leaves the store untouched.

pub mod repositories;
pub mod store;

pub use repositories::{
    ChartRepository, CreateOrganizationInput, CurrencyRepository, FiscalRepository,
    InflationRepository, JournalRepository, OrganizationRepository, ReportRepository,
};
pub use store::{Database, Record, StoreError, Table, Tables};
