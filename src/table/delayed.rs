use crate::common::condition::Condition;
use crate::error::Result;
use crate::read::reader::Reader;
use crate::read::select::Select;
use crate::table::Table;
use crate::write::batch_put_item::BatchPutWriter;
use crate::write::delete_item::DeleteWriter;
use crate::write::put_item::PutWriter;

use std::{thread, time};

/// Table sleeping a fixed delay before every call to the wrapped table.
///
/// Used to give an eventually consistent backend time to settle between a write
/// and the read observing it. A zero delay makes it a plain pass-through.
///
/// ```rust,no_run
/// use attribute_table::sqlite::table::SqliteTable;
/// use attribute_table::table::delayed::DelayedTable;
/// use std::time::Duration;
///
/// # fn example(table: SqliteTable) {
/// let table = DelayedTable::new(table, Duration::from_millis(200));
/// # }
/// ```
#[derive(Debug)]
pub struct DelayedTable<T> {
    table: T,
    delay: time::Duration,
}

impl<T> DelayedTable<T> {
    /// Wraps `table`, sleeping `delay` before each call.
    pub fn new(table: T, delay: time::Duration) -> Self {
        Self { table, delay }
    }

    /// The wrapped table.
    pub fn inner(&self) -> &T {
        &self.table
    }

    /// Unwraps the decorated table.
    pub fn into_inner(self) -> T {
        self.table
    }

    fn delay(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

impl<T: Table> Table for DelayedTable<T> {
    fn name(&self) -> &str {
        self.table.name()
    }

    fn put(&self, item_name: &str, configure: &mut dyn FnMut(&mut PutWriter)) -> Result<()> {
        self.delay();
        self.table.put(item_name, configure)
    }

    fn delete(
        &self,
        item_name: &str,
        configure: &mut dyn FnMut(&mut DeleteWriter),
    ) -> Result<()> {
        self.delay();
        self.table.delete(item_name, configure)
    }

    fn batch_put(&self, configure: &mut dyn FnMut(&mut BatchPutWriter)) -> Result<()> {
        self.delay();
        self.table.batch_put(configure)
    }

    fn select(&self, select: &Select) -> Result<Reader> {
        self.delay();
        self.table.select(select)
    }

    fn select_count(&self, condition: Option<&Condition>) -> Result<u64> {
        self.delay();
        self.table.select_count(condition)
    }

    fn delete_table(&self) -> Result<()> {
        self.delay();
        self.table.delete_table()
    }
}
