//! Chart of accounts domain types.
//!
//! Categories and accounts live in one flat arena keyed by [`NodeId`]; the tree
//! shape is carried by `parent_id` plus the derived `code`/`order_key` pair.

use contab_shared::types::{CurrencyId, NodeId, OrganizationId};
use serde::{Deserialize, Serialize};

use super::code;

/// Tenant that owns accounts, currencies and fiscal periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier.
    pub id: OrganizationId,
    /// Tax identification number.
    pub tax_id: String,
    /// Display name.
    pub name: String,
    /// Optimistic concurrency version.
    pub version: u32,
}

/// A currency configured for an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Unique identifier.
    pub id: CurrencyId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Display name ("Peso argentino").
    pub name: String,
    /// Short symbol ("$").
    pub symbol: String,
    /// Three letter code ("ARS").
    pub code: String,
    /// Whether this is the organization's default currency.
    pub is_default: bool,
    /// Whether balances in this currency are restated for inflation.
    pub adjustable: bool,
    /// Optimistic concurrency version.
    pub version: u32,
}

/// Input for creating or updating a currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInput {
    /// Display name.
    pub name: String,
    /// Short symbol.
    pub symbol: String,
    /// Three letter code.
    pub code: String,
    /// Make this the default currency.
    pub is_default: bool,
    /// Restate balances for inflation.
    pub adjustable: bool,
}

/// Flags specific to postable accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFlags {
    /// Currency every posting on this account is expressed in.
    pub currency_id: CurrencyId,
    /// Account tracked per individual (customer, supplier).
    pub individual: bool,
    /// Participates in inflation restatement.
    pub adjustable: bool,
    /// Absorbs the profit and loss consolidation for its currency.
    pub balances_results: bool,
    /// Absorbs the inflation adjustment offsets for its currency.
    pub balances_adjustables: bool,
}

impl AccountFlags {
    /// Plain account in `currency_id` with every flag off.
    #[must_use]
    pub const fn plain(currency_id: CurrencyId) -> Self {
        Self {
            currency_id,
            individual: false,
            adjustable: false,
            balances_results: false,
            balances_adjustables: false,
        }
    }
}

/// Payload distinguishing categories from accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Internal node grouping other nodes.
    Category {
        /// Marks the category and its descendants as profit and loss.
        is_result: bool,
    },
    /// Postable leaf.
    Account(AccountFlags),
}

/// A category or account of the chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartNode {
    /// Unique identifier.
    pub id: NodeId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Parent category, `None` only for root categories.
    pub parent_id: Option<NodeId>,
    /// Ordinal among its siblings.
    pub number: u16,
    /// Dot separated path ("1.2.7").
    pub code: String,
    /// Sortable form of `code` ("01/02/0007").
    pub order_key: String,
    /// Description, unique among siblings.
    pub description: String,
    /// Optional short name, unique within the organization.
    pub alias: Option<String>,
    /// Correlation key from an imported chart.
    pub legacy_code: Option<String>,
    /// Whether the node may still be used.
    pub active: bool,
    /// Category or account payload.
    pub kind: NodeKind,
    /// Optimistic concurrency version.
    pub version: u32,
}

impl ChartNode {
    /// Sets the code and re-derives the order key.
    pub fn set_code(&mut self, code: String) {
        self.order_key = code::order_key(&code);
        self.code = code;
    }

    /// Returns true for categories.
    #[must_use]
    pub fn is_category(&self) -> bool {
        matches!(self.kind, NodeKind::Category { .. })
    }

    /// Returns true for postable accounts.
    #[must_use]
    pub fn is_account(&self) -> bool {
        matches!(self.kind, NodeKind::Account(_))
    }

    /// Returns true for categories flagged as profit and loss.
    #[must_use]
    pub fn is_result_category(&self) -> bool {
        matches!(self.kind, NodeKind::Category { is_result: true })
    }

    /// Account flags, `None` for categories.
    #[must_use]
    pub fn account(&self) -> Option<&AccountFlags> {
        match &self.kind {
            NodeKind::Account(flags) => Some(flags),
            NodeKind::Category { .. } => None,
        }
    }

    /// Currency of an account.
    #[must_use]
    pub fn currency_id(&self) -> Option<CurrencyId> {
        self.account().map(|a| a.currency_id)
    }

    /// Returns true for nodes without a parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Returns true if this node sits strictly below `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &ChartNode) -> bool {
        self.organization_id == ancestor.organization_id
            && code::is_descendant(&self.code, &ancestor.code)
    }

    /// Returns true if the node belongs to `org`.
    #[must_use]
    pub fn belongs_to(&self, org: OrganizationId) -> bool {
        self.organization_id == org
    }
}

/// Input for creating a category or account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNodeInput {
    /// Parent category; required for accounts.
    pub parent_id: Option<NodeId>,
    /// Ordinal among the parent's children.
    pub number: u16,
    /// Description.
    pub description: String,
    /// Optional alias.
    pub alias: Option<String>,
    /// Optional legacy correlation code.
    pub legacy_code: Option<String>,
    /// Category or account payload.
    pub kind: NodeKind,
}

/// Changes to an existing node. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNodeInput {
    /// Version the caller read.
    pub version: u32,
    /// New description.
    pub description: Option<String>,
    /// New alias. A blank string clears it.
    pub alias: Option<String>,
    /// Activate or deactivate.
    pub active: Option<bool>,
    /// Category only: profit and loss flag.
    pub is_result: Option<bool>,
    /// Account only: new currency (rejected once the account has postings).
    pub currency_id: Option<CurrencyId>,
    /// Account only.
    pub individual: Option<bool>,
    /// Account only.
    pub adjustable: Option<bool>,
    /// Account only.
    pub balances_results: Option<bool>,
    /// Account only.
    pub balances_adjustables: Option<bool>,
}

impl UpdateNodeInput {
    /// Returns true if any account-only field is set.
    #[must_use]
    pub fn touches_account_fields(&self) -> bool {
        self.currency_id.is_some()
            || self.individual.is_some()
            || self.adjustable.is_some()
            || self.balances_results.is_some()
            || self.balances_adjustables.is_some()
    }
}

/// One step of a node's ancestor path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathItem {
    /// Node id.
    pub id: NodeId,
    /// Node code.
    pub code: String,
    /// Node description.
    pub description: String,
}

/// A node together with its path from the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeWithPath {
    /// The node.
    pub node: ChartNode,
    /// Ancestors from the root down to the parent.
    pub path: Vec<PathItem>,
}

/// Which balancing role an account plays for its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalancingRole {
    /// Absorbs the profit and loss consolidation.
    Results,
    /// Absorbs the inflation adjustment offsets.
    Adjustables,
}

impl BalancingRole {
    /// Returns true if `flags` hold this role.
    #[must_use]
    pub const fn held_by(self, flags: &AccountFlags) -> bool {
        match self {
            Self::Results => flags.balances_results,
            Self::Adjustables => flags.balances_adjustables,
        }
    }
}
