//! Property-based tests for the account tree codes.
//!
//! - Property 1: Order keys sort like the tree
//! - Property 2: Descendant filter ignores nested categories

use contab_shared::types::{CurrencyId, NodeId, OrganizationId};
use proptest::prelude::*;

use super::code::{child_code, is_descendant, order_key};
use super::service::ChartService;
use super::types::{AccountFlags, ChartNode, CreateNodeInput, NodeKind};

/// Strategy for a code of one to four levels whose numbers fit their padding.
fn code_strategy() -> impl Strategy<Value = Vec<u16>> {
    (
        1u16..=99,
        proptest::option::of(1u16..=99),
        proptest::collection::vec(1u16..=9_999, 0..=2),
    )
        .prop_map(|(first, second, deeper)| {
            let mut segments = vec![first];
            if let Some(second) = second {
                segments.push(second);
                segments.extend(deeper);
            }
            segments
        })
}

fn join(segments: &[u16]) -> String {
    segments.iter().fold(String::new(), |acc, n| {
        if acc.is_empty() {
            n.to_string()
        } else {
            child_code(Some(&acc), *n)
        }
    })
}

fn node(id: i64, parent: Option<&ChartNode>, number: u16, kind: NodeKind) -> ChartNode {
    let input = CreateNodeInput {
        parent_id: parent.map(|p| p.id),
        number,
        description: format!("node {id}"),
        alias: None,
        legacy_code: None,
        kind,
    };
    let mut node = ChartService::build_node(OrganizationId(1), input, parent).unwrap();
    node.id = NodeId(id);
    node
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: Order keys sort like the tree
    // =========================================================================

    /// *For any* two codes, comparing their order keys gives the same result
    /// as comparing their segment lists numerically.
    #[test]
    fn prop_order_key_matches_numeric_order(
        a in code_strategy(),
        b in code_strategy(),
    ) {
        let (code_a, code_b) = (join(&a), join(&b));
        prop_assert_eq!(order_key(&code_a).cmp(&order_key(&code_b)), a.cmp(&b));
    }

    /// *For any* parent and child number, the child is a descendant of the
    /// parent and sorts after it.
    #[test]
    fn prop_child_sorts_after_parent(
        parent in code_strategy(),
        number in 1u16..=99,
    ) {
        let parent_code = join(&parent);
        let child = child_code(Some(&parent_code), number);
        prop_assert!(is_descendant(&child, &parent_code));
        prop_assert!(order_key(&child) > order_key(&parent_code));
    }

    // =========================================================================
    // Property 2: Descendant filter ignores nested categories
    // =========================================================================

    /// *For any* tree of one root, a few sub-categories and accounts spread
    /// over them, asking for a sub-category together with the root yields the
    /// same accounts as asking for the root alone.
    #[test]
    fn prop_nested_category_adds_nothing(
        subs in 1usize..5,
        placements in proptest::collection::vec(0usize..5, 1..20),
        pick in 0usize..5,
    ) {
        let root = node(1, None, 1, NodeKind::Category { is_result: false });
        let mut nodes = vec![root.clone()];
        let mut categories = vec![root.clone()];
        for i in 0..subs {
            let number = u16::try_from(i + 1).unwrap();
            let sub = node(10 + i64::from(number), Some(&root), number, NodeKind::Category { is_result: false });
            categories.push(sub.clone());
            nodes.push(sub);
        }
        for (i, slot) in placements.iter().enumerate() {
            let parent = categories[slot % categories.len()].clone();
            let number = u16::try_from(50 + i).unwrap();
            nodes.push(node(
                1000 + i64::try_from(i).unwrap(),
                Some(&parent),
                number,
                NodeKind::Account(AccountFlags::plain(CurrencyId(1))),
            ));
        }

        let sub = &categories[pick % categories.len()];
        let with_nested = ChartService::descendant_accounts(&nodes, &[sub, &root]);
        let root_only = ChartService::descendant_accounts(&nodes, &[&root]);
        prop_assert_eq!(with_nested.len(), root_only.len());
        prop_assert_eq!(with_nested, root_only);

        let expected = nodes.iter().filter(|n| n.is_account()).count();
        prop_assert_eq!(ChartService::descendant_accounts(&nodes, &[&root]).len(), expected);
    }
}
