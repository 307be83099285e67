//! The table abstraction implemented by every backend.
//!
//! A [`Table`] exposes four primitive operations (put, delete, batch put and
//! select) plus counting and lifecycle. Everything else, such as the
//! [`extension::TableExt`] helpers or the [`delayed::DelayedTable`] decorator,
//! is built on these primitives.

use crate::common::condition::Condition;
use crate::error::{Error, Result};
use crate::read::reader::{Reader, ReaderPosition};
use crate::read::select::Select;
use crate::write::batch_put_item::BatchPutWriter;
use crate::write::delete_item::DeleteWriter;
use crate::write::put_item::PutWriter;

/// Decorator delaying every call, emulating an eventually consistent backend.
pub mod delayed;

/// Convenience helpers built on the primitive operations.
pub mod extension;

/// A named collection of items with multi-valued attributes.
///
/// Mutations are scoped to one item: the writer handed to `configure` stages
/// changes and expectations, and the table commits them as one unit. A delete
/// or batch put that stages nothing is a no-op; an empty put records the item
/// only on backends that keep empty items. Implementations are safe to share
/// between threads; every call uses its own backend connection or request.
pub trait Table {
    /// The table (domain or database) name.
    fn name(&self) -> &str;

    /// Writes attribute values to `item_name`.
    fn put(&self, item_name: &str, configure: &mut dyn FnMut(&mut PutWriter)) -> Result<()>;

    /// Deletes `item_name`, some of its attributes or some of their values.
    fn delete(&self, item_name: &str, configure: &mut dyn FnMut(&mut DeleteWriter))
    -> Result<()>;

    /// Writes attribute values to several items in one request.
    fn batch_put(&self, configure: &mut dyn FnMut(&mut BatchPutWriter)) -> Result<()>;

    /// Starts a select, returning a reader over its results.
    fn select(&self, select: &Select) -> Result<Reader>;

    /// Counts the items matching `condition`.
    ///
    /// Runs a select with the count projection and sums every count it returns,
    /// so a backend splitting the count over pages still reports the total. No
    /// rows count as zero.
    fn select_count(&self, condition: Option<&Condition>) -> Result<u64> {
        let mut reader = self.select(&Select::count(condition.cloned()))?;
        let mut count = 0;
        loop {
            match reader.read()? {
                ReaderPosition::End => return Ok(count),
                ReaderPosition::EmptyItem | ReaderPosition::BeforeStart => {}
                ReaderPosition::Item | ReaderPosition::Attribute | ReaderPosition::Value => {
                    let value = reader.attribute_value().unwrap_or_default();
                    count += value.parse::<u64>().map_err(|_| {
                        Error::PermanentServiceFault {
                            code: "InvalidCount".to_string(),
                            message: format!("count value `{value}` is not a number"),
                        }
                    })?;
                }
            }
        }
    }

    /// Deletes the table with every item in it.
    fn delete_table(&self) -> Result<()>;
}

impl<T: Table + ?Sized> Table for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn put(&self, item_name: &str, configure: &mut dyn FnMut(&mut PutWriter)) -> Result<()> {
        (**self).put(item_name, configure)
    }

    fn delete(
        &self,
        item_name: &str,
        configure: &mut dyn FnMut(&mut DeleteWriter),
    ) -> Result<()> {
        (**self).delete(item_name, configure)
    }

    fn batch_put(&self, configure: &mut dyn FnMut(&mut BatchPutWriter)) -> Result<()> {
        (**self).batch_put(configure)
    }

    fn select(&self, select: &Select) -> Result<Reader> {
        (**self).select(select)
    }

    fn select_count(&self, condition: Option<&Condition>) -> Result<u64> {
        (**self).select_count(condition)
    }

    fn delete_table(&self) -> Result<()> {
        (**self).delete_table()
    }
}
