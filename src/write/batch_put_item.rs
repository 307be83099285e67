use crate::error::Result;
use crate::write::common;
use crate::write::put_item::PutChange;

use indexmap::IndexMap;

/// Writer handed to [`Table::batch_put`](crate::table::Table::batch_put).
///
/// Stages attribute writes for several items. Items keep the order in which they
/// were first staged. A batch carries no expectations and is not atomic across
/// items: each item's writes apply as one unit, the batch as a whole may not.
///
/// ```rust,no_run
/// use attribute_table::table::Table;
///
/// # fn example(table: &dyn Table) -> attribute_table::Result<()> {
/// table.batch_put(&mut |writer| {
///     writer.add("e0", "tag", "red").replace("e1", "status", "active");
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchPutWriter {
    items: IndexMap<String, Vec<PutChange>>,
}

impl BatchPutWriter {
    /// Adds `value` to the values of `name` on `item_name`.
    pub fn add(
        &mut self,
        item_name: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.push(item_name.into(), name.into(), value.into(), false)
    }

    /// Replaces the stored values of `name` on `item_name` with `value`.
    pub fn replace(
        &mut self,
        item_name: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.push(item_name.into(), name.into(), value.into(), true)
    }

    /// The staged items with their attribute writes.
    pub fn items(&self) -> impl Iterator<Item = (&str, &[PutChange])> {
        self.items
            .iter()
            .map(|(item_name, changes)| (item_name.as_str(), changes.as_slice()))
    }

    /// Whether nothing was staged.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.items.iter().try_for_each(|(item_name, changes)| {
            common::validate_name(item_name)?;
            changes
                .iter()
                .try_for_each(|change| common::validate_name(&change.name))
        })
    }

    fn push(&mut self, item_name: String, name: String, value: String, replace: bool) -> &mut Self {
        self.items.entry(item_name).or_default().push(PutChange {
            name,
            value,
            replace,
        });
        self
    }
}
