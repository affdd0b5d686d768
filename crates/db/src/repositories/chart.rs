//! Chart of accounts repository.
//!
//! Loads the organization's nodes, runs the [`ChartService`] rules over them
//! and persists the result inside one transaction. Moving a node rewrites the
//! codes of its whole subtree.

use std::collections::BTreeMap;

use contab_core::chart::{
    AccountContext, BalancingRole, ChartError, ChartNode, ChartService, CreateNodeInput,
    NodeKind, NodeWithPath, UpdateNodeInput, code,
};
use contab_core::ledger::PostingAccount;
use contab_shared::types::{CurrencyId, NodeId, OrganizationId, PageRequest, Slice};
use contab_shared::{AppError, AppResult};
use tracing::{debug, info};

use super::currency::currency;
use super::organization::organization;
use crate::store::{Database, StoreError, Tables};

/// Chart of accounts repository.
#[derive(Debug, Clone)]
pub struct ChartRepository {
    db: Database,
}

impl ChartRepository {
    /// Creates a new chart repository.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates a category or account.
    ///
    /// Setting a balancing flag moves that role away from the account that
    /// held it for the same currency.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown organization, parent or currency
    /// - `InvalidInput` for a missing or non-category parent, a bad number or
    ///   flags the currency or location does not allow
    /// - `Conflict` for a duplicate description, code or alias
    pub fn create(&self, org: OrganizationId, input: CreateNodeInput) -> AppResult<NodeWithPath> {
        let created = self.db.transaction(|tx| {
            organization(tx, org)?;
            let parent = match input.parent_id {
                Some(parent_id) => Some(
                    node(tx, org, parent_id)
                        .map_err(|_| ChartError::ParentNotFound(parent_id))?
                        .clone(),
                ),
                None => None,
            };

            let candidate = ChartService::build_node(org, input, parent.as_ref())?;
            ChartService::ensure_unique(org_nodes(tx, org), &candidate, true)?;

            if let Some(flags) = candidate.account() {
                let currency = currency(tx, org, flags.currency_id)?.clone();
                let ctx = AccountContext {
                    currency: &currency,
                    in_result_category: ChartService::in_result_category(
                        org_nodes(tx, org),
                        &candidate,
                    ),
                    has_postings: false,
                };
                ChartService::validate_account_flags(candidate.id, flags, &ctx)?;
            }

            let created = tx.nodes.insert(candidate);
            release_balancing_roles(tx, &created)?;
            Ok::<_, AppError>(with_path(tx, created))
        })?;

        info!(
            org_id = %org,
            node_id = %created.node.id,
            code = %created.node.code,
            "Chart node created"
        );
        Ok(created)
    }

    /// Applies a patch to a node.
    ///
    /// # Errors
    ///
    /// As for [`Self::create`], plus `InvalidInput` for account fields on a
    /// category, a category turned into a result category while it holds a
    /// results balancing account, or a currency change on an account with
    /// postings, and
    /// `VersionConflict` when `patch.version` is stale.
    pub fn update(
        &self,
        org: OrganizationId,
        id: NodeId,
        patch: UpdateNodeInput,
    ) -> AppResult<NodeWithPath> {
        let updated = self.db.transaction(|tx| {
            let mut target = node(tx, org, id)?.clone();
            let previous_description = target.description.clone();

            let account_currency = match target.account() {
                Some(flags) => {
                    let currency_id = patch.currency_id.unwrap_or(flags.currency_id);
                    Some(currency(tx, org, currency_id)?.clone())
                }
                None => None,
            };
            let ctx = account_currency.as_ref().map(|currency| AccountContext {
                currency,
                in_result_category: ChartService::in_result_category(org_nodes(tx, org), &target),
                has_postings: has_postings(tx, id),
            });
            let was_result = target.is_result_category();
            ChartService::apply_patch(&mut target, &patch, ctx.as_ref())?;

            if target.is_result_category() && !was_result {
                let holder = org_nodes(tx, org).find(|n| {
                    n.is_descendant_of(&target) && n.account().is_some_and(|a| a.balances_results)
                });
                if let Some(holder) = holder {
                    return Err(ChartError::BalancingInResultCategory(holder.id).into());
                }
            }

            if target.description != previous_description || patch.alias.is_some() {
                ChartService::ensure_unique(org_nodes(tx, org), &target, false)?;
            }

            target.version = patch.version;
            let updated = tx.nodes.update(target)?;
            release_balancing_roles(tx, &updated)?;
            Ok::<_, AppError>(with_path(tx, updated))
        })?;

        info!(org_id = %org, node_id = %id, version = updated.node.version, "Chart node updated");
        Ok(updated)
    }

    /// Moves a node below `new_parent` as its child number `number`.
    ///
    /// The codes and order keys of every descendant follow.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown node or parent
    /// - `InvalidInput` for a move below itself or a descendant, an account
    ///   moved to the root, or a results balancing account moved into a result
    ///   category
    /// - `Conflict` when the new code or description collides
    /// - `VersionConflict` when `version` is stale
    pub fn relocate(
        &self,
        org: OrganizationId,
        id: NodeId,
        new_parent: Option<NodeId>,
        number: u16,
        version: u32,
    ) -> AppResult<NodeWithPath> {
        let moved = self.db.transaction(|tx| {
            let current = node(tx, org, id)?.clone();
            let parent = match new_parent {
                Some(parent_id) => Some(
                    node(tx, org, parent_id)
                        .map_err(|_| ChartError::ParentNotFound(parent_id))?
                        .clone(),
                ),
                None => None,
            };
            let new_code = ChartService::relocated_code(&current, parent.as_ref(), number)?;
            let old_code = current.code.clone();

            let mut target = current.clone();
            target.parent_id = new_parent;
            target.number = number;
            target.set_code(new_code.clone());
            ChartService::ensure_unique(
                org_nodes(tx, org).filter(|n| !n.is_descendant_of(&current)),
                &target,
                true,
            )?;

            // the subtree as it will look after the move
            let mut subtree: Vec<ChartNode> = org_nodes(tx, org)
                .filter(|n| n.is_descendant_of(&current))
                .cloned()
                .collect();
            for descendant in &mut subtree {
                descendant.set_code(code::rebase(&descendant.code, &old_code, &new_code));
            }
            let after: Vec<ChartNode> = org_nodes(tx, org)
                .filter(|n| n.id != id && !n.is_descendant_of(&current))
                .cloned()
                .chain(std::iter::once(target.clone()))
                .chain(subtree.iter().cloned())
                .collect();
            for moved in std::iter::once(&target).chain(&subtree) {
                let holds_results = moved.account().is_some_and(|a| a.balances_results);
                if holds_results && ChartService::in_result_category(&after, moved) {
                    return Err(ChartError::BalancingInResultCategory(moved.id).into());
                }
            }

            for descendant in subtree {
                let code = descendant.code.clone();
                tx.nodes.modify(descendant.id, |n| n.set_code(code))?;
            }
            target.version = version;
            let moved = tx.nodes.update(target)?;
            Ok::<_, AppError>(with_path(tx, moved))
        })?;

        info!(
            org_id = %org,
            node_id = %id,
            code = %moved.node.code,
            "Chart node relocated"
        );
        Ok(moved)
    }

    /// Deletes a node.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown node, `Conflict` for a category with children
    /// or an account that was ever posted to.
    pub fn delete(&self, org: OrganizationId, id: NodeId) -> AppResult<()> {
        self.db.transaction(|tx| {
            let target = node(tx, org, id)?;
            if target.is_category() {
                if tx.nodes.find(|n| n.parent_id == Some(id)).is_some() {
                    return Err(ChartError::HasChildren(id).into());
                }
            } else if has_postings(tx, id) {
                return Err(ChartError::AccountInUse(id).into());
            }
            tx.nodes.remove(id);
            Ok::<_, AppError>(())
        })?;

        info!(org_id = %org, node_id = %id, "Chart node deleted");
        Ok(())
    }

    /// Loads a node with its ancestor path.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown node or one of another organization.
    pub fn get(&self, org: OrganizationId, id: NodeId) -> AppResult<NodeWithPath> {
        self.db.read(|t| {
            let found = node(t, org, id)?.clone();
            Ok(with_path(t, found))
        })
    }

    /// Direct children of a category, by order key.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown category.
    pub fn children(&self, org: OrganizationId, parent: NodeId) -> AppResult<Vec<ChartNode>> {
        self.db.read(|t| {
            node(t, org, parent)?;
            Ok(sorted(org_nodes(t, org).filter(|n| n.parent_id == Some(parent))))
        })
    }

    /// Root categories, by order key.
    #[must_use]
    pub fn roots(&self, org: OrganizationId) -> Vec<ChartNode> {
        self.db.read(|t| sorted(org_nodes(t, org).filter(|n| n.is_root())))
    }

    /// Every node of the organization, by order key.
    #[must_use]
    pub fn list(&self, org: OrganizationId) -> Vec<ChartNode> {
        self.db.read(|t| sorted(org_nodes(t, org)))
    }

    /// Accounts below any of `categories`, by order key.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown node.
    pub fn descendants_of(
        &self,
        org: OrganizationId,
        categories: &[NodeId],
    ) -> AppResult<Vec<ChartNode>> {
        self.db.read(|t| {
            let roots = categories
                .iter()
                .map(|id| node(t, org, *id))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ChartService::descendant_accounts(org_nodes(t, org), &roots)
                .into_iter()
                .cloned()
                .collect())
        })
    }

    /// Text search with uncounted paging.
    ///
    /// Matches description or alias by case-insensitive substring and code by
    /// prefix; accounts below a matching category are included too.
    #[must_use]
    pub fn search(
        &self,
        org: OrganizationId,
        query: &str,
        include_categories: bool,
        page: PageRequest,
    ) -> Slice<NodeWithPath> {
        self.db.read(|t| {
            let nodes: Vec<ChartNode> = org_nodes(t, org).cloned().collect();
            let found = ChartService::search(&nodes, query, include_categories);
            debug!(org_id = %org, query, matches = found.len(), "Chart search");
            let probe: Vec<NodeWithPath> = found
                .into_iter()
                .skip(page.offset())
                .take(page.limit() + 1)
                .map(|n| with_path(t, n.clone()))
                .collect();
            Slice::from_probe(probe, page)
        })
    }

    /// Categories flagged as profit and loss, by order key.
    #[must_use]
    pub fn result_categories(&self, org: OrganizationId) -> Vec<ChartNode> {
        self.db
            .read(|t| sorted(org_nodes(t, org).filter(|n| n.is_result_category())))
    }

    /// Accounts holding `role`, by order key.
    #[must_use]
    pub fn balancing_accounts(&self, org: OrganizationId, role: BalancingRole) -> Vec<ChartNode> {
        self.db.read(|t| {
            sorted(
                org_nodes(t, org).filter(|n| n.account().is_some_and(|a| role.held_by(a))),
            )
        })
    }
}

/// Nodes of `org`, in creation order.
pub(crate) fn org_nodes(
    tables: &Tables,
    org: OrganizationId,
) -> impl Iterator<Item = &ChartNode> + Clone {
    tables.nodes.iter().filter(move |n| n.belongs_to(org))
}

/// Loads a node of `org`.
pub(crate) fn node(tables: &Tables, org: OrganizationId, id: NodeId) -> Result<&ChartNode, ChartError> {
    tables
        .nodes
        .get(id)
        .filter(|n| n.belongs_to(org))
        .ok_or(ChartError::NodeNotFound(id))
}

/// Posting facts of a node of `org`, `None` when it does not exist there.
pub(crate) fn posting_account(
    tables: &Tables,
    org: OrganizationId,
    id: NodeId,
) -> Option<PostingAccount> {
    let found = node(tables, org, id).ok()?;
    debug!(node_id = %id, is_account = found.is_account(), "Posting account lookup");
    Some(PostingAccount {
        id,
        currency_id: found
            .currency_id()
            .unwrap_or(CurrencyId(0)),
        is_account: found.is_account(),
    })
}

/// Account holding `role` in each currency.
pub(crate) fn balancing_map(
    tables: &Tables,
    org: OrganizationId,
    role: BalancingRole,
) -> BTreeMap<CurrencyId, NodeId> {
    org_nodes(tables, org)
        .filter_map(|n| {
            let flags = n.account()?;
            role.held_by(flags).then_some((flags.currency_id, n.id))
        })
        .collect()
}

/// Returns true if any posting references the account.
pub(crate) fn has_postings(tables: &Tables, id: NodeId) -> bool {
    tables.postings.find(|p| p.account_id == id).is_some()
}

fn with_path(tables: &Tables, node: ChartNode) -> NodeWithPath {
    let path = ChartService::path(|id| tables.nodes.get(id), &node);
    NodeWithPath { node, path }
}

fn sorted<'a>(nodes: impl Iterator<Item = &'a ChartNode>) -> Vec<ChartNode> {
    let mut nodes: Vec<ChartNode> = nodes.cloned().collect();
    nodes.sort_by(|a, b| a.order_key.cmp(&b.order_key));
    nodes
}

/// Clears `role` on whichever other account held it for the same currency.
fn release_balancing_roles(tx: &mut Tables, holder: &ChartNode) -> Result<(), StoreError> {
    let Some(flags) = holder.account().copied() else {
        return Ok(());
    };
    for role in [BalancingRole::Results, BalancingRole::Adjustables] {
        if !role.held_by(&flags) {
            continue;
        }
        let previous = ChartService::balancing_holder(
            org_nodes(tx, holder.organization_id),
            flags.currency_id,
            role,
            holder.id,
        )
        .map(|n| n.id);
        if let Some(previous) = previous {
            tx.nodes.modify(previous, |n| {
                if let NodeKind::Account(flags) = &mut n.kind {
                    match role {
                        BalancingRole::Results => flags.balances_results = false,
                        BalancingRole::Adjustables => flags.balances_adjustables = false,
                    }
                }
            })?;
            info!(
                previous = %previous,
                holder = %holder.id,
                currency_id = %flags.currency_id,
                ?role,
                "Balancing role moved"
            );
        }
    }
    Ok(())
}
