use crate::error::Result;
use crate::write::common::{self, Expectation, ExpectedWriter};

/// One staged attribute write.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PutChange {
    /// The attribute name.
    pub name: String,
    /// The value to store.
    pub value: String,
    /// Whether the stored values of `name` are dropped first.
    pub replace: bool,
}

/// Writer handed to [`Table::put`](crate::table::Table::put).
///
/// Adding an `(attribute, value)` pair the item already holds is a no-op. Replacing
/// drops every stored value of the attribute before the replacement values of this
/// put are written, so several `replace` calls on one name leave all of them.
///
/// ```rust,no_run
/// use attribute_table::table::Table;
/// use attribute_table::write::common::ExpectedWriter;
///
/// # fn example(table: &dyn Table) -> attribute_table::Result<()> {
/// table.put("e0", &mut |writer| {
///     writer.expect_absent("lock");
///     writer.add("tag", "red").replace("status", "active");
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PutWriter {
    changes: Vec<PutChange>,
    expectations: Vec<Expectation>,
}

impl PutWriter {
    /// Adds `value` to the values of `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(name.into(), value.into(), false)
    }

    /// Replaces the stored values of `name` with `value`.
    pub fn replace(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(name.into(), value.into(), true)
    }

    /// The staged attribute writes, in staging order.
    pub fn changes(&self) -> &[PutChange] {
        &self.changes
    }

    /// Whether no attribute write was staged.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub(crate) fn validate(&self, item_name: &str) -> Result<()> {
        common::validate_expectations(item_name, &self.expectations)?;
        self.changes
            .iter()
            .try_for_each(|change| common::validate_name(&change.name))
    }

    fn push(&mut self, name: String, value: String, replace: bool) -> &mut Self {
        self.changes.push(PutChange {
            name,
            value,
            replace,
        });
        self
    }
}

impl ExpectedWriter for PutWriter {
    fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }

    fn expectations_mut(&mut self) -> &mut Vec<Expectation> {
        &mut self.expectations
    }
}
