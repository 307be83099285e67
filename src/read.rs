//! Read operations for retrieving items from a table.
//!
//! This module provides:
//! - The arguments of a select (projection, condition, consistency, page size)
//! - The streaming reader decoding backend pages into item, attribute and value positions

/// Streaming reader over select results.
pub mod reader;

/// Arguments for select operations.
pub mod select;
