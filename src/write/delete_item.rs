use crate::error::Result;
use crate::write::common::{self, Expectation, ExpectedWriter};

/// One staged attribute deletion.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DeleteChange {
    /// The attribute name.
    pub name: String,
    /// The single value to delete, or `None` to delete every value of the attribute.
    pub value: Option<String>,
}

/// Writer handed to [`Table::delete`](crate::table::Table::delete).
///
/// Deleting the whole item takes precedence over any attribute deletion staged
/// alongside it.
///
/// ```rust,no_run
/// use attribute_table::table::Table;
/// use attribute_table::write::common::ExpectedWriter;
///
/// # fn example(table: &dyn Table) -> attribute_table::Result<()> {
/// table.delete("e0", &mut |writer| {
///     writer.expect("status", "done");
///     writer.delete_item();
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeleteWriter {
    item: bool,
    changes: Vec<DeleteChange>,
    expectations: Vec<Expectation>,
}

impl DeleteWriter {
    /// Deletes the item with all its attributes.
    pub fn delete_item(&mut self) -> &mut Self {
        self.item = true;
        self
    }

    /// Deletes every value of `name`.
    pub fn delete_attribute(&mut self, name: impl Into<String>) -> &mut Self {
        self.changes.push(DeleteChange {
            name: name.into(),
            value: None,
        });
        self
    }

    /// Deletes `value` from the values of `name`.
    pub fn delete_attribute_value(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.changes.push(DeleteChange {
            name: name.into(),
            value: Some(value.into()),
        });
        self
    }

    /// Whether the whole item is deleted.
    pub fn deletes_item(&self) -> bool {
        self.item
    }

    /// The staged attribute deletions, in staging order.
    pub fn changes(&self) -> &[DeleteChange] {
        &self.changes
    }

    /// Whether the writer deletes nothing.
    pub fn is_empty(&self) -> bool {
        !self.item && self.changes.is_empty()
    }

    pub(crate) fn validate(&self, item_name: &str) -> Result<()> {
        common::validate_expectations(item_name, &self.expectations)?;
        self.changes
            .iter()
            .try_for_each(|change| common::validate_name(&change.name))
    }
}

impl ExpectedWriter for DeleteWriter {
    fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }

    fn expectations_mut(&mut self) -> &mut Vec<Expectation> {
        &mut self.expectations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_changes() {
        let mut writer = DeleteWriter::default();
        assert!(writer.is_empty());
        writer.delete_attribute("a").delete_attribute_value("b", "1");
        assert!(!writer.is_empty());
        assert!(!writer.deletes_item());
        assert_eq!(
            writer.changes(),
            [
                DeleteChange {
                    name: "a".to_string(),
                    value: None,
                },
                DeleteChange {
                    name: "b".to_string(),
                    value: Some("1".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_delete_item() {
        let mut writer = DeleteWriter::default();
        writer.expect_absent("a");
        assert!(writer.is_empty());
        writer.delete_item();
        assert!(writer.deletes_item());
        assert!(!writer.is_empty());
    }

    #[test]
    fn test_validate() {
        let mut writer = DeleteWriter::default();
        writer.delete_attribute("a");
        assert!(writer.validate("e0").is_ok());
        assert!(matches!(writer.validate(""), Err(Error::EmptyName)));
        writer.delete_attribute_value("", "b");
        assert!(matches!(writer.validate("e0"), Err(Error::EmptyName)));
    }
}
