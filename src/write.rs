//! Mutation writers handed to table write callbacks.
//!
//! A put or delete opens one writer scoped to a single item, passes it to the
//! caller's callback and commits whatever the callback staged as one unit:
//! - Putting attribute values, adding to or replacing the stored ones
//! - Deleting the item, an attribute or a single value
//! - Guarding either with expectations on the current attribute values
//! - Staging attribute writes for many items in one batch

/// Batch put writer for staging writes to several items at once.
pub mod batch_put_item;

/// Expectations shared by the put and delete writers.
pub mod common;

/// Delete writer for removing items, attributes and values.
pub mod delete_item;

/// Put writer for adding and replacing attribute values.
pub mod put_item;
