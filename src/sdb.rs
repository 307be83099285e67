//! Remote backend for a SimpleDB-style attribute service.
//!
//! This module provides:
//! - The transport contract and the actions and responses exchanged through it
//! - The select-expression compiler turning conditions into query text
//! - The table engine driving requests, pagination and retries

/// Select-expression compiler.
pub mod expression;

/// Transport contract of the attribute service.
pub mod service;

/// Table backed by a service domain.
pub mod table;
