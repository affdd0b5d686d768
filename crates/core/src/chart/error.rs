//! Chart of accounts error types.

use contab_shared::AppError;
use contab_shared::types::{CurrencyId, NodeId};
use thiserror::Error;

/// Errors raised by the account tree rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    // ========== Shape Errors ==========
    /// Accounts need a parent category.
    #[error("A parent category is required")]
    MissingParent,

    /// Parent id does not exist in the organization.
    #[error("Parent category not found: {0}")]
    ParentNotFound(NodeId),

    /// Parent id points to an account.
    #[error("Node {0} is an account and cannot have children")]
    ParentNotCategory(NodeId),

    /// Sibling number out of range for its level.
    #[error("Number {number} is not valid at level {level}")]
    InvalidNumber {
        /// Requested number.
        number: u16,
        /// Level the node would land on.
        level: usize,
    },

    /// Description is blank.
    #[error("Description cannot be empty")]
    EmptyDescription,

    /// Account-only changes sent for a category.
    #[error("Node {0} is not an account")]
    NotAnAccount(NodeId),

    /// A node cannot move below itself.
    #[error("Node {0} cannot be moved below itself or one of its descendants")]
    CyclicMove(NodeId),

    // ========== Uniqueness Errors ==========
    /// Same code, or same description under the same parent.
    #[error("A node with code {code} or description '{description}' already exists")]
    Duplicate {
        /// Offending code.
        code: String,
        /// Offending description.
        description: String,
    },

    /// Alias already used in the organization.
    #[error("Alias '{0}' is already in use")]
    DuplicateAlias(String),

    // ========== Usage Errors ==========
    /// Node not found in the organization.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Category still has children.
    #[error("Category {0} has children and cannot be deleted")]
    HasChildren(NodeId),

    /// Account has postings in some period.
    #[error("Account {0} has postings and cannot be deleted")]
    AccountInUse(NodeId),

    /// Currency of an account with postings cannot change.
    #[error("Account {0} has postings, its currency cannot change")]
    CurrencyChangeWithPostings(NodeId),

    // ========== Flag Errors ==========
    /// Currency not found in the organization.
    #[error("Currency not found: {0}")]
    CurrencyNotFound(CurrencyId),

    /// Adjustable account or balancing account on a non adjustable currency.
    #[error("Currency {0} is not adjustable")]
    CurrencyNotAdjustable(String),

    /// Result accounts cannot balance results.
    #[error("Account {0} belongs to a result category and cannot balance results")]
    BalancingInResultCategory(NodeId),

    /// An adjustable account cannot balance the adjustables.
    #[error("Account {0} is adjustable and cannot balance adjustable accounts")]
    BalancingAdjustableIsAdjustable(NodeId),

    // ========== Currency / Organization Errors ==========
    /// Malformed currency data.
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Currency code already configured.
    #[error("Currency {0} already exists")]
    DuplicateCurrency(String),

    /// Organization with the same tax id and name exists.
    #[error("Organization '{name}' ({tax_id}) already exists")]
    DuplicateOrganization {
        /// Tax id.
        tax_id: String,
        /// Name.
        name: String,
    },
}

impl ChartError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingParent => "MISSING_PARENT",
            Self::ParentNotFound(_) => "PARENT_NOT_FOUND",
            Self::ParentNotCategory(_) => "PARENT_NOT_CATEGORY",
            Self::InvalidNumber { .. } => "INVALID_NUMBER",
            Self::EmptyDescription => "EMPTY_DESCRIPTION",
            Self::NotAnAccount(_) => "NOT_AN_ACCOUNT",
            Self::CyclicMove(_) => "CYCLIC_MOVE",
            Self::Duplicate { .. } => "DUPLICATE_NODE",
            Self::DuplicateAlias(_) => "DUPLICATE_ALIAS",
            Self::NodeNotFound(_) => "NODE_NOT_FOUND",
            Self::HasChildren(_) => "CATEGORY_HAS_CHILDREN",
            Self::AccountInUse(_) => "ACCOUNT_IN_USE",
            Self::CurrencyChangeWithPostings(_) => "CURRENCY_CHANGE_WITH_POSTINGS",
            Self::CurrencyNotFound(_) => "CURRENCY_NOT_FOUND",
            Self::CurrencyNotAdjustable(_) => "CURRENCY_NOT_ADJUSTABLE",
            Self::BalancingInResultCategory(_) => "BALANCING_IN_RESULT_CATEGORY",
            Self::BalancingAdjustableIsAdjustable(_) => "BALANCING_ADJUSTABLE_IS_ADJUSTABLE",
            Self::InvalidCurrency(_) => "INVALID_CURRENCY",
            Self::DuplicateCurrency(_) => "DUPLICATE_CURRENCY",
            Self::DuplicateOrganization { .. } => "DUPLICATE_ORGANIZATION",
        }
    }
}

impl From<ChartError> for AppError {
    fn from(err: ChartError) -> Self {
        let message = err.to_string();
        match err {
            ChartError::ParentNotFound(_)
            | ChartError::NodeNotFound(_)
            | ChartError::CurrencyNotFound(_) => Self::NotFound(message),
            ChartError::Duplicate { .. }
            | ChartError::DuplicateAlias(_)
            | ChartError::HasChildren(_)
            | ChartError::AccountInUse(_)
            | ChartError::DuplicateCurrency(_)
            | ChartError::DuplicateOrganization { .. } => Self::Conflict(message),
            ChartError::MissingParent
            | ChartError::ParentNotCategory(_)
            | ChartError::InvalidNumber { .. }
            | ChartError::EmptyDescription
            | ChartError::NotAnAccount(_)
            | ChartError::CyclicMove(_)
            | ChartError::CurrencyChangeWithPostings(_)
            | ChartError::CurrencyNotAdjustable(_)
            | ChartError::BalancingInResultCategory(_)
            | ChartError::BalancingAdjustableIsAdjustable(_)
            | ChartError::InvalidCurrency(_) => Self::InvalidInput(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert!(matches!(
            AppError::from(ChartError::MissingParent),
            AppError::InvalidInput(_)
        ));
        assert!(matches!(
            AppError::from(ChartError::ParentNotFound(NodeId(3))),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(ChartError::HasChildren(NodeId(3))),
            AppError::Conflict(_)
        ));
    }

    #[test]
    fn test_display() {
        let err = ChartError::Duplicate {
            code: "1.2".into(),
            description: "Caja".into(),
        };
        assert_eq!(
            err.to_string(),
            "A node with code 1.2 or description 'Caja' already exists"
        );
        assert_eq!(err.error_code(), "DUPLICATE_NODE");
    }
}
