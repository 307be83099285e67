//! Local backend storing a table in a SQLite database file.
//!
//! This module provides:
//! - The SQL compiler turning conditions into parameterised queries
//! - The table engine running every operation on its own short-lived connection

/// SQL compiler and schema.
pub mod expression;

/// Table backed by a database file.
pub mod table;
