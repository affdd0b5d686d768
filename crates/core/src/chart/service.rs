//! Account tree rules.
//!
//! Pure functions over slices of [`ChartNode`]; the persistence layer loads the
//! organization's nodes and applies the results inside one unit of work.

use contab_shared::types::{CurrencyId, NodeId, OrganizationId};

use super::code;
use super::error::ChartError;
use super::types::{
    AccountFlags, BalancingRole, ChartNode, CreateNodeInput, Currency, CurrencyInput, NodeKind,
    PathItem, UpdateNodeInput,
};

/// Facts about the surroundings of an account needed to validate its flags.
#[derive(Debug, Clone, Copy)]
pub struct AccountContext<'a> {
    /// The account's (possibly new) currency.
    pub currency: &'a Currency,
    /// Whether the account descends from a result category.
    pub in_result_category: bool,
    /// Whether the account has postings in any period.
    pub has_postings: bool,
}

/// Stateless service implementing the account tree rules.
pub struct ChartService;

impl ChartService {
    /// Builds a new node below `parent` (or at the root).
    ///
    /// The returned node has no id yet; the store assigns it on insert.
    ///
    /// # Errors
    ///
    /// - `MissingParent` for an account without parent
    /// - `ParentNotCategory` if `parent` is an account
    /// - `InvalidNumber` / `EmptyDescription` for malformed input
    pub fn build_node(
        org: OrganizationId,
        input: CreateNodeInput,
        parent: Option<&ChartNode>,
    ) -> Result<ChartNode, ChartError> {
        let description = input.description.trim().to_string();
        if description.is_empty() {
            return Err(ChartError::EmptyDescription);
        }

        if let Some(parent) = parent {
            if !parent.is_category() {
                return Err(ChartError::ParentNotCategory(parent.id));
            }
        } else if matches!(input.kind, NodeKind::Account(_)) {
            return Err(ChartError::MissingParent);
        }

        let parent_code = parent.map(|p| p.code.as_str());
        let code = code::child_code(parent_code, input.number);
        code::validate_number(code::level(&code), input.number)?;

        Ok(ChartNode {
            id: NodeId(0),
            organization_id: org,
            parent_id: parent.map(|p| p.id),
            number: input.number,
            order_key: code::order_key(&code),
            code,
            description,
            alias: normalize_alias(input.alias),
            legacy_code: input.legacy_code.filter(|c| !c.trim().is_empty()),
            active: true,
            kind: input.kind,
            version: 0,
        })
    }

    /// Finds a node colliding with `candidate`.
    ///
    /// A collision is the same parent with the same `description`, or (when
    /// `check_code` is set) the same code. The candidate itself is ignored.
    pub fn find_duplicate<'a>(
        nodes: impl IntoIterator<Item = &'a ChartNode>,
        candidate: &ChartNode,
        description: &str,
        check_code: bool,
    ) -> Option<&'a ChartNode> {
        nodes.into_iter().find(|n| {
            n.organization_id == candidate.organization_id
                && n.id != candidate.id
                && ((n.parent_id == candidate.parent_id && n.description == description)
                    || (check_code && n.code == candidate.code))
        })
    }

    /// Rejects `candidate` if it collides with an existing node or alias.
    pub fn ensure_unique<'a>(
        nodes: impl IntoIterator<Item = &'a ChartNode> + Clone,
        candidate: &ChartNode,
        check_code: bool,
    ) -> Result<(), ChartError> {
        if let Some(existing) =
            Self::find_duplicate(nodes.clone(), candidate, &candidate.description, check_code)
        {
            return Err(ChartError::Duplicate {
                code: existing.code.clone(),
                description: candidate.description.clone(),
            });
        }

        if let Some(alias) = &candidate.alias {
            let taken = nodes.into_iter().any(|n| {
                n.organization_id == candidate.organization_id
                    && n.id != candidate.id
                    && n.alias.as_deref() == Some(alias.as_str())
            });
            if taken {
                return Err(ChartError::DuplicateAlias(alias.clone()));
            }
        }
        Ok(())
    }

    /// Validates account flags against the account's surroundings.
    pub fn validate_account_flags(
        node_id: NodeId,
        flags: &AccountFlags,
        ctx: &AccountContext<'_>,
    ) -> Result<(), ChartError> {
        if flags.adjustable && !ctx.currency.adjustable {
            return Err(ChartError::CurrencyNotAdjustable(ctx.currency.code.clone()));
        }
        if flags.balances_results && ctx.in_result_category {
            return Err(ChartError::BalancingInResultCategory(node_id));
        }
        if flags.balances_adjustables {
            if !ctx.currency.adjustable {
                return Err(ChartError::CurrencyNotAdjustable(ctx.currency.code.clone()));
            }
            if flags.adjustable {
                return Err(ChartError::BalancingAdjustableIsAdjustable(node_id));
            }
        }
        Ok(())
    }

    /// Applies `patch` to `node`.
    ///
    /// A blank alias clears the node's alias.
    ///
    /// Only description, alias and active are common to both kinds; categories
    /// also take `is_result`, accounts take their flags. `ctx` is required when
    /// the patch touches account fields. Duplicate checks on the new
    /// description are left to the caller, which sees the other nodes.
    pub fn apply_patch(
        node: &mut ChartNode,
        patch: &UpdateNodeInput,
        ctx: Option<&AccountContext<'_>>,
    ) -> Result<(), ChartError> {
        if let Some(description) = patch.description.as_deref().map(str::trim)
            && !description.is_empty()
        {
            node.description = description.to_string();
        }
        if patch.alias.is_some() {
            node.alias = normalize_alias(patch.alias.clone());
        }
        if let Some(active) = patch.active {
            node.active = active;
        }

        let node_id = node.id;
        match &mut node.kind {
            NodeKind::Category { is_result } => {
                if patch.touches_account_fields() {
                    return Err(ChartError::NotAnAccount(node_id));
                }
                if let Some(flag) = patch.is_result {
                    *is_result = flag;
                }
            }
            NodeKind::Account(flags) => {
                let Some(ctx) = ctx else {
                    return Ok(());
                };
                if let Some(currency_id) = patch.currency_id
                    && currency_id != flags.currency_id
                {
                    if ctx.has_postings {
                        return Err(ChartError::CurrencyChangeWithPostings(node_id));
                    }
                    flags.currency_id = currency_id;
                }
                if let Some(individual) = patch.individual {
                    flags.individual = individual;
                }
                if let Some(adjustable) = patch.adjustable {
                    flags.adjustable = adjustable;
                }
                if let Some(balances) = patch.balances_results {
                    flags.balances_results = balances;
                }
                if let Some(balances) = patch.balances_adjustables {
                    flags.balances_adjustables = balances;
                }
                Self::validate_account_flags(node_id, flags, ctx)?;
            }
        }
        Ok(())
    }

    /// Returns true if `node` descends from any result category in `nodes`.
    pub fn in_result_category<'a>(
        nodes: impl IntoIterator<Item = &'a ChartNode>,
        node: &ChartNode,
    ) -> bool {
        nodes
            .into_iter()
            .any(|n| n.is_result_category() && node.is_descendant_of(n))
    }

    /// Other account currently holding `role` for `currency_id`.
    pub fn balancing_holder<'a>(
        nodes: impl IntoIterator<Item = &'a ChartNode>,
        currency_id: CurrencyId,
        role: BalancingRole,
        except: NodeId,
    ) -> Option<&'a ChartNode> {
        nodes.into_iter().find(|n| {
            n.id != except
                && n.account()
                    .is_some_and(|a| a.currency_id == currency_id && role.held_by(a))
        })
    }

    /// Accounts below any of `categories`, ordered by order key.
    ///
    /// Nested categories in the input are collapsed first so no account is
    /// returned twice.
    pub fn descendant_accounts<'a>(
        nodes: impl IntoIterator<Item = &'a ChartNode>,
        categories: &[&ChartNode],
    ) -> Vec<&'a ChartNode> {
        let codes: Vec<&str> = categories.iter().map(|c| c.code.as_str()).collect();
        let roots = code::collapse_nested(&codes);

        let mut accounts: Vec<&ChartNode> = nodes
            .into_iter()
            .filter(|n| n.is_account() && roots.iter().any(|r| code::is_descendant(&n.code, r)))
            .collect();
        accounts.sort_by(|a, b| a.order_key.cmp(&b.order_key));
        accounts
    }

    /// Returns true if `node` matches a lower-cased search query.
    ///
    /// Description and alias match by substring, code by prefix.
    #[must_use]
    pub fn matches_text(node: &ChartNode, query_lower: &str) -> bool {
        node.description.to_lowercase().contains(query_lower)
            || node
                .alias
                .as_ref()
                .is_some_and(|a| a.to_lowercase().contains(query_lower))
            || node.code.starts_with(query_lower)
    }

    /// Searches the chart.
    ///
    /// Returns nodes matching the text plus the accounts below any matching
    /// category, ordered by order key. Categories are dropped unless
    /// `include_categories` is set.
    pub fn search<'a>(
        nodes: &'a [ChartNode],
        query: &str,
        include_categories: bool,
    ) -> Vec<&'a ChartNode> {
        let query = query.trim().to_lowercase();
        let matched_categories: Vec<&ChartNode> = nodes
            .iter()
            .filter(|n| n.is_category() && Self::matches_text(n, &query))
            .collect();

        let mut found: Vec<&ChartNode> = nodes
            .iter()
            .filter(|n| include_categories || n.is_account())
            .filter(|n| {
                Self::matches_text(n, &query)
                    || matched_categories.iter().any(|c| n.is_descendant_of(c))
            })
            .collect();
        found.sort_by(|a, b| a.order_key.cmp(&b.order_key));
        found
    }

    /// Ancestor path of `node`, root first.
    pub fn path<'a, F>(lookup: F, node: &ChartNode) -> Vec<PathItem>
    where
        F: Fn(NodeId) -> Option<&'a ChartNode>,
    {
        let mut path = Vec::new();
        let mut current = node.parent_id;
        while let Some(id) = current {
            let Some(parent) = lookup(id) else { break };
            // codes shrink on every step, which also bounds the walk
            if path.len() >= code::level(&node.code) {
                break;
            }
            path.push(PathItem {
                id: parent.id,
                code: parent.code.clone(),
                description: parent.description.clone(),
            });
            current = parent.parent_id;
        }
        path.reverse();
        path
    }

    /// Computes the new code of `node` when moved below `new_parent` as `number`.
    ///
    /// # Errors
    ///
    /// - `CyclicMove` if `new_parent` is the node or one of its descendants
    /// - `MissingParent` for an account moved to the root
    /// - `ParentNotCategory` / `InvalidNumber` as for creation
    pub fn relocated_code(
        node: &ChartNode,
        new_parent: Option<&ChartNode>,
        number: u16,
    ) -> Result<String, ChartError> {
        match new_parent {
            Some(parent) => {
                if parent.id == node.id || parent.is_descendant_of(node) {
                    return Err(ChartError::CyclicMove(node.id));
                }
                if !parent.is_category() {
                    return Err(ChartError::ParentNotCategory(parent.id));
                }
            }
            None if node.is_account() => return Err(ChartError::MissingParent),
            None => {}
        }
        let code = code::child_code(new_parent.map(|p| p.code.as_str()), number);
        code::validate_number(code::level(&code), number)?;
        Ok(code)
    }

    /// Validates currency input, normalising the code to upper case.
    pub fn validate_currency(input: &CurrencyInput) -> Result<CurrencyInput, ChartError> {
        let code = input.code.trim().to_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ChartError::InvalidCurrency(format!(
                "code '{}' must have three letters",
                input.code
            )));
        }
        let symbol = input.symbol.trim();
        if symbol.is_empty() || symbol.chars().count() > 3 {
            return Err(ChartError::InvalidCurrency(format!(
                "symbol '{}' must have one to three characters",
                input.symbol
            )));
        }
        if input.name.trim().is_empty() {
            return Err(ChartError::InvalidCurrency("name cannot be empty".into()));
        }
        Ok(CurrencyInput {
            name: input.name.trim().to_string(),
            symbol: symbol.to_string(),
            code,
            is_default: input.is_default,
            adjustable: input.adjustable,
        })
    }

    /// Orders currencies with the default first, then by id.
    pub fn sort_currencies(currencies: &mut [Currency]) {
        currencies.sort_by_key(|c| (!c.is_default, c.id));
    }
}

fn normalize_alias(alias: Option<String>) -> Option<String> {
    alias
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORG: OrganizationId = OrganizationId(1);
    const ARS: CurrencyId = CurrencyId(1);

    fn category(id: i64, parent: Option<&ChartNode>, number: u16, description: &str) -> ChartNode {
        let input = CreateNodeInput {
            parent_id: parent.map(|p| p.id),
            number,
            description: description.into(),
            alias: None,
            legacy_code: None,
            kind: NodeKind::Category { is_result: false },
        };
        let mut node = ChartService::build_node(ORG, input, parent).unwrap();
        node.id = NodeId(id);
        node
    }

    fn account(id: i64, parent: &ChartNode, number: u16, description: &str) -> ChartNode {
        let input = CreateNodeInput {
            parent_id: Some(parent.id),
            number,
            description: description.into(),
            alias: None,
            legacy_code: None,
            kind: NodeKind::Account(AccountFlags::plain(ARS)),
        };
        let mut node = ChartService::build_node(ORG, input, Some(parent)).unwrap();
        node.id = NodeId(id);
        node
    }

    fn currency(adjustable: bool) -> Currency {
        Currency {
            id: ARS,
            organization_id: ORG,
            name: "Peso".into(),
            symbol: "$".into(),
            code: "ARS".into(),
            is_default: true,
            adjustable,
            version: 1,
        }
    }

    #[test]
    fn test_build_node_derives_code() {
        let root = category(1, None, 1, "Activo");
        let sub = category(2, Some(&root), 2, "Caja y bancos");
        let acc = account(3, &sub, 7, "Caja");
        assert_eq!(root.code, "1");
        assert_eq!(acc.code, "1.2.7");
        assert_eq!(acc.order_key, "01/02/0007");
        assert_eq!(acc.parent_id, Some(NodeId(2)));
        assert!(acc.active);
    }

    #[test]
    fn test_account_requires_parent() {
        let input = CreateNodeInput {
            parent_id: None,
            number: 1,
            description: "Caja".into(),
            alias: None,
            legacy_code: None,
            kind: NodeKind::Account(AccountFlags::plain(ARS)),
        };
        assert_eq!(
            ChartService::build_node(ORG, input, None),
            Err(ChartError::MissingParent)
        );
    }

    #[test]
    fn test_parent_must_be_category() {
        let root = category(1, None, 1, "Activo");
        let acc = account(2, &root, 1, "Caja");
        let input = CreateNodeInput {
            parent_id: Some(acc.id),
            number: 1,
            description: "Sub".into(),
            alias: None,
            legacy_code: None,
            kind: NodeKind::Category { is_result: false },
        };
        assert_eq!(
            ChartService::build_node(ORG, input, Some(&acc)),
            Err(ChartError::ParentNotCategory(NodeId(2)))
        );
    }

    #[test]
    fn test_duplicate_description_under_same_parent() {
        let root = category(1, None, 1, "Activo");
        let caja = account(2, &root, 1, "Caja");
        let nodes = vec![root.clone(), caja];
        let candidate = account(0, &root, 2, "Caja");
        let err = ChartService::ensure_unique(&nodes, &candidate, true).unwrap_err();
        assert!(matches!(err, ChartError::Duplicate { .. }));
    }

    #[test]
    fn test_duplicate_code() {
        let root = category(1, None, 1, "Activo");
        let caja = account(2, &root, 1, "Caja");
        let nodes = vec![root.clone(), caja];
        let candidate = account(0, &root, 1, "Banco");
        assert!(ChartService::ensure_unique(&nodes, &candidate, true).is_err());
        // Code check disabled on description-only updates
        assert!(ChartService::ensure_unique(&nodes, &candidate, false).is_ok());
    }

    #[test]
    fn test_same_description_other_parent_is_fine() {
        let activo = category(1, None, 1, "Activo");
        let pasivo = category(2, None, 2, "Pasivo");
        let a = account(3, &activo, 1, "Varios");
        let nodes = vec![activo, pasivo.clone(), a];
        let candidate = account(0, &pasivo, 1, "Varios");
        assert!(ChartService::ensure_unique(&nodes, &candidate, true).is_ok());
    }

    #[test]
    fn test_duplicate_alias() {
        let root = category(1, None, 1, "Activo");
        let mut caja = account(2, &root, 1, "Caja");
        caja.alias = Some("CJ".into());
        let nodes = vec![root.clone(), caja];
        let mut candidate = account(0, &root, 2, "Banco");
        candidate.alias = Some("CJ".into());
        assert_eq!(
            ChartService::ensure_unique(&nodes, &candidate, true),
            Err(ChartError::DuplicateAlias("CJ".into()))
        );
    }

    #[test]
    fn test_descendant_accounts_dedupes_nested() {
        let activo = category(1, None, 1, "Activo");
        let caja = category(2, Some(&activo), 1, "Caja");
        let a1 = account(3, &caja, 1, "Caja pesos");
        let a2 = account(4, &activo, 2, "Banco");
        let pasivo = category(5, None, 2, "Pasivo");
        let a3 = account(6, &pasivo, 1, "Proveedores");
        let nodes = vec![activo.clone(), caja.clone(), a1, a2, pasivo, a3];

        let both = ChartService::descendant_accounts(&nodes, &[&caja, &activo]);
        let only_ancestor = ChartService::descendant_accounts(&nodes, &[&activo]);
        assert_eq!(both, only_ancestor);
        let ids: Vec<_> = both.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![NodeId(3), NodeId(4)]);
    }

    #[test]
    fn test_search_includes_children_of_matching_category() {
        let activo = category(1, None, 1, "Activo");
        let disp = category(2, Some(&activo), 1, "Disponibilidades");
        let caja = account(3, &disp, 1, "Caja");
        let mut banco = account(4, &activo, 2, "Banco");
        banco.alias = Some("BNA".into());
        let nodes = vec![activo, disp, caja, banco];

        let found = ChartService::search(&nodes, "dispon", false);
        assert_eq!(found.iter().map(|n| n.id).collect::<Vec<_>>(), vec![NodeId(3)]);

        let found = ChartService::search(&nodes, "bna", false);
        assert_eq!(found.iter().map(|n| n.id).collect::<Vec<_>>(), vec![NodeId(4)]);

        let found = ChartService::search(&nodes, "1.1", true);
        assert_eq!(
            found.iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![NodeId(2), NodeId(3)]
        );
    }

    #[test]
    fn test_path_is_root_first() {
        let activo = category(1, None, 1, "Activo");
        let disp = category(2, Some(&activo), 1, "Disponibilidades");
        let caja = account(3, &disp, 1, "Caja");
        let nodes = [activo, disp, caja.clone()];
        let path = ChartService::path(|id| nodes.iter().find(|n| n.id == id), &caja);
        assert_eq!(
            path.iter().map(|p| p.code.as_str()).collect::<Vec<_>>(),
            vec!["1", "1.1"]
        );
    }

    #[test]
    fn test_patch_rejects_adjustable_on_plain_currency() {
        let root = category(1, None, 1, "Activo");
        let mut caja = account(2, &root, 1, "Caja");
        let ars = currency(false);
        let ctx = AccountContext {
            currency: &ars,
            in_result_category: false,
            has_postings: false,
        };
        let patch = UpdateNodeInput {
            adjustable: Some(true),
            ..Default::default()
        };
        assert_eq!(
            ChartService::apply_patch(&mut caja, &patch, Some(&ctx)),
            Err(ChartError::CurrencyNotAdjustable("ARS".into()))
        );
    }

    #[test]
    fn test_patch_currency_blocked_by_postings() {
        let root = category(1, None, 1, "Activo");
        let mut caja = account(2, &root, 1, "Caja");
        let ars = currency(false);
        let ctx = AccountContext {
            currency: &ars,
            in_result_category: false,
            has_postings: true,
        };
        let patch = UpdateNodeInput {
            currency_id: Some(CurrencyId(9)),
            ..Default::default()
        };
        assert_eq!(
            ChartService::apply_patch(&mut caja, &patch, Some(&ctx)),
            Err(ChartError::CurrencyChangeWithPostings(NodeId(2)))
        );
    }

    #[test]
    fn test_patch_account_fields_on_category() {
        let mut root = category(1, None, 1, "Activo");
        let patch = UpdateNodeInput {
            individual: Some(true),
            ..Default::default()
        };
        assert_eq!(
            ChartService::apply_patch(&mut root, &patch, None),
            Err(ChartError::NotAnAccount(NodeId(1)))
        );
    }

    #[test]
    fn test_balancing_results_inside_result_category() {
        let mut ventas = category(1, None, 4, "Resultados");
        ventas.kind = NodeKind::Category { is_result: true };
        let acc = account(2, &ventas, 1, "Ventas");
        let nodes = vec![ventas, acc.clone()];
        assert!(ChartService::in_result_category(&nodes, &acc));

        let ars = currency(false);
        let mut flags = AccountFlags::plain(ARS);
        flags.balances_results = true;
        let ctx = AccountContext {
            currency: &ars,
            in_result_category: true,
            has_postings: false,
        };
        assert_eq!(
            ChartService::validate_account_flags(acc.id, &flags, &ctx),
            Err(ChartError::BalancingInResultCategory(NodeId(2)))
        );
    }

    #[test]
    fn test_relocated_code_rejects_cycle() {
        let activo = category(1, None, 1, "Activo");
        let disp = category(2, Some(&activo), 1, "Disponibilidades");
        assert_eq!(
            ChartService::relocated_code(&activo, Some(&disp), 3),
            Err(ChartError::CyclicMove(NodeId(1)))
        );
        let pasivo = category(3, None, 2, "Pasivo");
        assert_eq!(
            ChartService::relocated_code(&disp, Some(&pasivo), 4).unwrap(),
            "2.4"
        );
    }

    #[test]
    fn test_validate_currency() {
        let input = CurrencyInput {
            name: " Dolar ".into(),
            symbol: "US$".into(),
            code: "usd".into(),
            is_default: false,
            adjustable: false,
        };
        let valid = ChartService::validate_currency(&input).unwrap();
        assert_eq!(valid.code, "USD");
        assert_eq!(valid.name, "Dolar");

        let bad = CurrencyInput {
            code: "US".into(),
            ..input
        };
        assert!(ChartService::validate_currency(&bad).is_err());
    }

    #[test]
    fn test_sort_currencies_default_first() {
        let mut list = vec![
            Currency {
                id: CurrencyId(1),
                is_default: false,
                ..currency(false)
            },
            Currency {
                id: CurrencyId(3),
                is_default: false,
                ..currency(false)
            },
            Currency {
                id: CurrencyId(2),
                is_default: true,
                ..currency(false)
            },
        ];
        ChartService::sort_currencies(&mut list);
        let ids: Vec<_> = list.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![CurrencyId(2), CurrencyId(1), CurrencyId(3)]);
    }
}
