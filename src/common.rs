//! Common types shared by both backends.
//!
//! This module provides the backend-independent condition tree and the attribute
//! selection used by select operations, plus the helpers both query compilers share.

/// Condition trees used to filter items in select operations.
pub mod condition;

/// Attribute selection (projection) for select operations.
pub mod selection;

/// Joins two rendered clauses, dropping whichever side is empty.
pub(crate) fn get_expression(left: String, operator: &str, right: String) -> String {
    if left.is_empty() {
        right
    } else if right.is_empty() {
        left
    } else {
        format!("{left}{operator}{right}")
    }
}

/// Quotes a literal for an expression language without parameter binding.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
