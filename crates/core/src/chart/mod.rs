//! Chart of accounts.
//!
//! This module implements the account tree:
//! - Hierarchical code and order key arithmetic
//! - Category and account node types
//! - Creation, update, relocation and uniqueness rules
//! - Descendant lookups and text search

pub mod code;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod code_props;

pub use error::ChartError;
pub use service::{AccountContext, ChartService};
pub use types::{
    AccountFlags, BalancingRole, ChartNode, CreateNodeInput, Currency, CurrencyInput, NodeKind,
    NodeWithPath, Organization, PathItem, UpdateNodeInput,
};
