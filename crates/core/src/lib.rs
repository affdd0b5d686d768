//! Core business logic for Contab.
//!
//! This crate contains pure business logic with ZERO storage dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `chart` - Chart of accounts: categories, accounts, hierarchical codes
//! - `ledger` - Journal entries and postings
//! - `fiscal` - Fiscal period guards and closing/opening builders
//! - `reports` - Balance and ledger aggregation
//! - `inflation` - Inflation adjustment

pub mod chart;
pub mod fiscal;
pub mod inflation;
pub mod ledger;
pub mod reports;
