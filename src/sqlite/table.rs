use crate::common::condition::Condition;
use crate::common::selection::Selection;
use crate::config::TableOptions;
use crate::error::{Error, Result};
use crate::read::reader::{Page, Pager, RawItem, Reader};
use crate::read::select::Select;
use crate::reliability::Reliability;
use crate::sqlite::expression::{self, SqlQuery};
use crate::table::Table;
use crate::write::batch_put_item::BatchPutWriter;
use crate::write::common::{Expectation, ExpectedWriter};
use crate::write::delete_item::DeleteWriter;
use crate::write::put_item::{PutChange, PutWriter};

use indexmap::IndexSet;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use std::{fs, io, path, sync, time};

/// How long a connection waits for a lock held by another connection.
const BUSY_TIMEOUT: time::Duration = time::Duration::from_secs(5);

/// Serialises connection setup, so concurrent first opens never race on the schema.
static SETUP: sync::Mutex<()> = sync::Mutex::new(());

/// Table stored in a local SQLite database file.
///
/// Every operation opens its own connection. Writes run in one immediate
/// transaction: resolve the item, check the expectations, apply the changes and
/// commit, rolling everything back on any failure. A put always records the item,
/// so putting nothing creates an empty item.
///
/// ```rust,no_run
/// use attribute_table::config::TableOptions;
/// use attribute_table::sqlite::table::SqliteTable;
/// use attribute_table::table::Table;
///
/// # fn example() -> attribute_table::Result<()> {
/// let options = TableOptions {
///     ensure: true,
///     ..Default::default()
/// };
/// let table = SqliteTable::open("items.db", options)?;
/// table.put("e0", &mut |writer| {
///     writer.add("tag", "red");
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct SqliteTable {
    path: path::PathBuf,
    name: String,
    options: TableOptions,
    reliability: Reliability,
}

impl SqliteTable {
    /// Opens the database at `path` with the default retry policy.
    ///
    /// A missing file is created when `options.ensure` is set and is
    /// [`Error::NotFound`] otherwise.
    pub fn open(path: impl AsRef<path::Path>, options: TableOptions) -> Result<Self> {
        Self::open_with_reliability(path, options, Reliability::default())
    }

    /// Opens the database at `path`, retrying busy databases as `reliability` allows.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "attribute_table.sqlite.open", skip_all, err)
    )]
    pub fn open_with_reliability(
        path: impl AsRef<path::Path>,
        options: TableOptions,
        reliability: Reliability,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !options.ensure && !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        reliability.execute(|| connect(&path).map(|_| ()))?;
        Ok(Self {
            path,
            name,
            options,
            reliability,
        })
    }

    /// The database file path.
    pub fn path(&self) -> &path::Path {
        &self.path
    }

    /// The table defaults.
    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    /// Runs `apply` in an immediate transaction, committing when it succeeds.
    fn write<T>(&self, apply: impl Fn(&Transaction<'_>) -> Result<T>) -> Result<T> {
        self.reliability.execute(|| {
            let mut connection = connect(&self.path)?;
            let transaction =
                connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = apply(&transaction)?;
            transaction.commit()?;
            Ok(value)
        })
    }
}

impl Table for SqliteTable {
    fn name(&self) -> &str {
        &self.name
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "attribute_table.sqlite.put",
            skip_all,
            fields(table = %self.name, item_name = %item_name),
            err
        )
    )]
    fn put(&self, item_name: &str, configure: &mut dyn FnMut(&mut PutWriter)) -> Result<()> {
        let mut writer = PutWriter::default();
        configure(&mut writer);
        writer.validate(item_name)?;
        self.write(|transaction| {
            let item_id = ensure_item(transaction, item_name)?;
            check_expectations(transaction, Some(item_id), writer.expectations())?;
            put_changes(transaction, item_id, writer.changes())
        })
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "attribute_table.sqlite.delete",
            skip_all,
            fields(table = %self.name, item_name = %item_name),
            err
        )
    )]
    fn delete(
        &self,
        item_name: &str,
        configure: &mut dyn FnMut(&mut DeleteWriter),
    ) -> Result<()> {
        let mut writer = DeleteWriter::default();
        configure(&mut writer);
        writer.validate(item_name)?;
        if writer.is_empty() {
            return Ok(());
        }
        self.write(|transaction| {
            let item_id = find_item(transaction, item_name)?;
            check_expectations(transaction, item_id, writer.expectations())?;
            let Some(item_id) = item_id else {
                return Ok(());
            };
            if writer.deletes_item() {
                transaction.execute("delete from attribute where item_id = ?1", params![item_id])?;
                transaction.execute("delete from item where id = ?1", params![item_id])?;
                return Ok(());
            }
            for change in writer.changes() {
                match &change.value {
                    Some(value) => transaction.execute(
                        "delete from attribute where item_id = ?1 and name = ?2 and value = ?3",
                        params![item_id, change.name, value],
                    )?,
                    None => transaction.execute(
                        "delete from attribute where item_id = ?1 and name = ?2",
                        params![item_id, change.name],
                    )?,
                };
            }
            Ok(())
        })
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "attribute_table.sqlite.batch_put",
            skip_all,
            fields(table = %self.name),
            err
        )
    )]
    fn batch_put(&self, configure: &mut dyn FnMut(&mut BatchPutWriter)) -> Result<()> {
        let mut writer = BatchPutWriter::default();
        configure(&mut writer);
        writer.validate()?;
        if writer.is_empty() {
            return Ok(());
        }
        self.write(|transaction| {
            writer.items().try_for_each(|(item_name, changes)| {
                let item_id = ensure_item(transaction, item_name)?;
                put_changes(transaction, item_id, changes)
            })
        })
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "attribute_table.sqlite.select",
            skip_all,
            fields(table = %self.name),
            err
        )
    )]
    fn select(&self, select: &Select) -> Result<Reader> {
        let limit = match select.selection {
            Selection::Count => None,
            _ => select
                .limit
                .or(self.options.select_limit)
                .filter(|limit| *limit > 0),
        };
        let condition = select.effective_condition().cloned();
        let first = expression::select_query(&select.selection, condition.as_ref(), limit, None)?;
        let pager = SqlitePager {
            path: self.path.clone(),
            reliability: self.reliability,
            selection: select.selection.clone(),
            condition,
            limit,
            first: Some(first),
        };
        Ok(Reader::new(Box::new(pager)))
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "attribute_table.sqlite.delete_table",
            skip_all,
            fields(table = %self.name),
            err
        )
    )]
    fn delete_table(&self) -> Result<()> {
        let _setup = SETUP.lock().unwrap_or_else(sync::PoisonError::into_inner);
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error.into()),
            _ => Ok(()),
        }
    }
}

/// Fetches select pages, resuming after the last item name of the previous page.
struct SqlitePager {
    path: path::PathBuf,
    reliability: Reliability,
    selection: Selection,
    condition: Option<Condition>,
    limit: Option<u32>,
    first: Option<SqlQuery>,
}

impl Pager for SqlitePager {
    fn fetch(&mut self, continuation: Option<&str>) -> Result<Page> {
        let query = match (self.first.take(), continuation) {
            (Some(query), None) => query,
            _ => expression::select_query(
                &self.selection,
                self.condition.as_ref(),
                self.limit,
                continuation,
            )?,
        };
        let items = self.reliability.execute(|| read_items(&self.path, &query))?;
        let continuation = match self.limit {
            Some(limit) if limit > 0 && items.len() >= limit as usize => {
                items.last().map(|item| item.name.clone())
            }
            _ => None,
        };
        Ok(Page {
            items,
            continuation,
        })
    }
}

fn connect(path: &path::Path) -> Result<Connection> {
    let _setup = SETUP.lock().unwrap_or_else(sync::PoisonError::into_inner);
    let connection = Connection::open(path)?;
    connection.busy_timeout(BUSY_TIMEOUT)?;
    // `like` matches case-sensitively on both backends
    connection.pragma_update(None, "case_sensitive_like", true)?;
    connection.execute_batch(expression::SCHEMA)?;
    Ok(connection)
}

fn read_items(path: &path::Path, query: &SqlQuery) -> Result<Vec<RawItem>> {
    let connection = connect(path)?;
    let mut statement = connection.prepare(&query.sql)?;
    let mut rows = statement.query(rusqlite::params_from_iter(query.parameters.iter()))?;
    let mut items: Vec<RawItem> = Vec::new();
    while let Some(row) = rows.next()? {
        let item_name: String = row.get(0)?;
        let name: Option<String> = row.get(1)?;
        let value: Option<String> = row.get(2)?;
        if items.last().is_none_or(|item| item.name != item_name) {
            items.push(RawItem {
                name: item_name,
                attributes: Vec::new(),
            });
        }
        if let (Some(item), Some(name), Some(value)) = (items.last_mut(), name, value) {
            item.attributes.push((name, value));
        }
    }
    Ok(items)
}

fn find_item(transaction: &Transaction<'_>, item_name: &str) -> Result<Option<i64>> {
    let item_id = transaction
        .query_row(
            "select id from item where name = ?1",
            params![item_name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(item_id)
}

fn ensure_item(transaction: &Transaction<'_>, item_name: &str) -> Result<i64> {
    transaction.execute(
        "insert or ignore into item(name) values (?1)",
        params![item_name],
    )?;
    let item_id = transaction.query_row(
        "select id from item where name = ?1",
        params![item_name],
        |row| row.get(0),
    )?;
    Ok(item_id)
}

fn check_expectations(
    transaction: &Transaction<'_>,
    item_id: Option<i64>,
    expectations: &[Expectation],
) -> Result<()> {
    for expectation in expectations {
        let holds = match (item_id, expectation) {
            (None, Expectation::Equals { .. }) => false,
            (None, Expectation::Absent { .. }) => true,
            (Some(item_id), Expectation::Equals { name, value }) => transaction
                .query_row(
                    "select 1 from attribute where item_id = ?1 and name = ?2 and value = ?3",
                    params![item_id, name, value],
                    |_| Ok(()),
                )
                .optional()?
                .is_some(),
            (Some(item_id), Expectation::Absent { name }) => transaction
                .query_row(
                    "select 1 from attribute where item_id = ?1 and name = ?2",
                    params![item_id, name],
                    |_| Ok(()),
                )
                .optional()?
                .is_none(),
        };
        if !holds {
            return Err(Error::ExpectationViolated);
        }
    }
    Ok(())
}

/// Drops the values of every replaced attribute once, then inserts all values.
fn put_changes(transaction: &Transaction<'_>, item_id: i64, changes: &[PutChange]) -> Result<()> {
    let replaced: IndexSet<&str> = changes
        .iter()
        .filter(|change| change.replace)
        .map(|change| change.name.as_str())
        .collect();
    for name in replaced {
        transaction.execute(
            "delete from attribute where item_id = ?1 and name = ?2",
            params![item_id, name],
        )?;
    }
    for change in changes {
        transaction.execute(
            "insert or ignore into attribute(item_id, name, value) values (?1, ?2, ?3)",
            params![item_id, change.name, change.value],
        )?;
    }
    Ok(())
}
