#![deny(missing_docs)]
#![deny(warnings)]

//! # Attribute Table
//!
//! A portable table of named items, each carrying multi-valued string attributes,
//! stored either in a remote SimpleDB-style attribute service or in a local SQLite file.
//!
//! ## Overview
//!
//! This library provides one API over both backends that:
//! - Filters items with a structured condition tree compiled to each backend's query language
//! - Streams select results through a pull reader that hides pagination
//! - Stages puts and deletes through per-item writers guarded by expectations
//! - Retries transient faults with quadratic backoff
//!
//! ## Quick Example
//!
//! ```no_run
//! use attribute_table::common::condition::Condition;
//! use attribute_table::config::TableOptions;
//! use attribute_table::read::reader::ReaderPosition;
//! use attribute_table::read::select::Select;
//! use attribute_table::sqlite::table::SqliteTable;
//! use attribute_table::table::Table;
//! use attribute_table::write::common::ExpectedWriter;
//!
//! # fn example() -> attribute_table::Result<()> {
//! let options = TableOptions {
//!     ensure: true,
//!     ..Default::default()
//! };
//! let table = SqliteTable::open("users.db", options)?;
//!
//! // Only succeeds while no one else claimed the item
//! table.put("jane", &mut |writer| {
//!     writer.expect_absent("owner");
//!     writer.add("owner", "jane").add("tags", "new").add("tags", "feature");
//! })?;
//!
//! let select = Select::with_condition(Some(Condition::attribute_value("tags", "new")));
//! let mut reader = table.select(&select)?;
//! while reader.read()? != ReaderPosition::End {
//!     println!("{:?} {:?}", reader.item_name(), reader.attribute_value());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@common`] - Conditions and attribute selections
//! - [`mod@read`] - Select arguments and the streaming reader
//! - [`mod@write`] - Put, delete and batch put writers
//! - [`mod@table`] - The table trait, its helpers and decorators
//! - [`mod@sdb`] - The remote attribute service backend
//! - [`mod@sqlite`] - The local SQLite backend

/// Conditions and attribute selection shared by both backends.
pub mod common;

/// Table configuration and backend selection.
pub mod config;

/// Error type and result alias.
pub mod error;

/// Select operations and the streaming reader.
pub mod read;

/// Retry policy for transient faults.
pub mod reliability;

/// Remote attribute service backend.
pub mod sdb;

/// Local SQLite backend.
pub mod sqlite;

/// The table abstraction.
pub mod table;

/// Mutation writers for puts and deletes.
pub mod write;

pub use error::{Error, Result};
