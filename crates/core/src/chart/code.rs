//! Hierarchical code arithmetic.
//!
//! A node's `code` is its dot separated path of sibling numbers (`"1.2.7"`).
//! The `order key` pads every segment so that plain string ordering matches
//! tree order: the first two levels use two digits, deeper levels four
//! (`"1.2.7"` becomes `"01/02/0007"`).

use super::error::ChartError;

/// Levels that use the short (two digit) padding.
const SHORT_LEVELS: usize = 2;
/// Width of a short segment.
const SHORT_WIDTH: usize = 2;
/// Width of a deep segment.
const LONG_WIDTH: usize = 4;

/// Builds the code of a child numbered `number` under `parent_code`.
#[must_use]
pub fn child_code(parent_code: Option<&str>, number: u16) -> String {
    match parent_code {
        Some(parent) => format!("{parent}.{number}"),
        None => number.to_string(),
    }
}

/// Depth of a code (root nodes are level 1).
#[must_use]
pub fn level(code: &str) -> usize {
    code.split('.').count()
}

/// Derives the sortable order key of a code.
#[must_use]
pub fn order_key(code: &str) -> String {
    code.split('.')
        .enumerate()
        .map(|(i, segment)| {
            let width = if i < SHORT_LEVELS { SHORT_WIDTH } else { LONG_WIDTH };
            format!("{segment:0>width$}")
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Checks that `number` fits the padding of the level it lands on.
pub fn validate_number(level: usize, number: u16) -> Result<(), ChartError> {
    let max = if level <= SHORT_LEVELS { 99 } else { 9_999 };
    if number == 0 || number > max {
        return Err(ChartError::InvalidNumber { number, level });
    }
    Ok(())
}

/// Returns true if `code` sits strictly below `ancestor`.
#[must_use]
pub fn is_descendant(code: &str, ancestor: &str) -> bool {
    code.len() > ancestor.len() + 1
        && code.starts_with(ancestor)
        && code.as_bytes()[ancestor.len()] == b'.'
}

/// Drops every code that is equal to, or a descendant of, another code in the set.
///
/// Used before descendant lookups so that passing a category together with one
/// of its ancestors does not count the shared accounts twice.
#[must_use]
pub fn collapse_nested<'a>(codes: &[&'a str]) -> Vec<&'a str> {
    let mut kept: Vec<&'a str> = Vec::with_capacity(codes.len());
    for (i, code) in codes.iter().enumerate() {
        let covered = codes.iter().enumerate().any(|(j, other)| {
            is_descendant(code, other) || (i > j && *code == *other)
        });
        if !covered {
            kept.push(code);
        }
    }
    kept
}

/// Replaces the `old_prefix` of a descendant code with `new_prefix`.
#[must_use]
pub fn rebase(code: &str, old_prefix: &str, new_prefix: &str) -> String {
    match code.strip_prefix(old_prefix) {
        Some(rest) => format!("{new_prefix}{rest}"),
        None => code.to_string(),
    }
}
