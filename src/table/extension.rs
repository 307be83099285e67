use crate::common::condition::Condition;
use crate::common::selection::Selection;
use crate::error::Result;
use crate::read::reader::{Reader, ReaderPosition};
use crate::read::select::Select;
use crate::table::Table;

use indexmap::IndexMap;

/// An item name with its attributes, one value per attribute name.
pub type ItemData = (String, IndexMap<String, String>);

/// Convenience operations available on every [`Table`].
///
/// ```rust,no_run
/// use attribute_table::common::condition::Condition;
/// use attribute_table::table::extension::TableExt;
/// use attribute_table::table::Table;
///
/// # fn example(table: &dyn Table) -> attribute_table::Result<()> {
/// table.set("e0", [("status", "active"), ("owner", "")])?;
/// for (item_name, attributes) in table.get(Some(&Condition::attribute_value("status", "active")))? {
///     println!("{item_name}: {attributes:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub trait TableExt: Table {
    /// Stores `attributes` on `item_name`.
    ///
    /// A non-empty value replaces the stored values of its attribute and an empty
    /// value deletes the attribute. The item is recorded even when nothing is
    /// stored, on backends supporting empty items.
    fn set<I, K, V>(&self, item_name: &str, attributes: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (replaced, deleted): (Vec<(String, String)>, Vec<(String, String)>) = attributes
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .partition(|(_, value)| !value.is_empty());
        self.put(item_name, &mut |writer| {
            for (name, value) in &replaced {
                writer.replace(name.as_str(), value.as_str());
            }
        })?;
        if !deleted.is_empty() {
            self.delete(item_name, &mut |writer| {
                for (name, _) in &deleted {
                    writer.delete_attribute(name.as_str());
                }
            })?;
        }
        Ok(())
    }

    /// Collects every item matching `condition` with all its attributes.
    fn get(&self, condition: Option<&Condition>) -> Result<Vec<ItemData>> {
        self.get_attributes(&[], condition)
    }

    /// Collects every item matching `condition` with the attributes in `names`.
    ///
    /// An empty `names` selects every attribute. Of a multi-valued attribute only
    /// the last value read is kept.
    fn get_attributes(&self, names: &[&str], condition: Option<&Condition>) -> Result<Vec<ItemData>> {
        let select = Select {
            selection: Selection::from_names(names.iter().copied()),
            condition: condition.cloned(),
            ..Default::default()
        };
        let mut reader = self.select(&select)?;
        let mut items: Vec<ItemData> = Vec::new();
        loop {
            let position = reader.read()?;
            match position {
                ReaderPosition::End => return Ok(items),
                ReaderPosition::BeforeStart => continue,
                ReaderPosition::Item | ReaderPosition::EmptyItem => {
                    let item_name = reader.item_name().unwrap_or_default().to_string();
                    items.push((item_name, IndexMap::new()));
                }
                ReaderPosition::Attribute | ReaderPosition::Value => {}
            }
            if let (Some((_, attributes)), Some(name), Some(value)) = (
                items.last_mut(),
                reader.attribute_name(),
                reader.attribute_value(),
            ) {
                attributes.insert(name.to_string(), value.to_string());
            }
        }
    }

    /// Collects `(item name, value)` for every value of attribute `name` on the items
    /// matching `condition`.
    fn select_values(&self, name: &str, condition: Option<&Condition>) -> Result<Vec<(String, String)>> {
        let select = Select {
            selection: Selection::Attributes(vec![name.to_string()]),
            condition: condition.cloned(),
            ..Default::default()
        };
        let mut reader = self.select(&select)?;
        let mut values = Vec::new();
        while reader.read()? != ReaderPosition::End {
            if let (Some(item_name), Some(attribute_name), Some(value)) = (
                reader.item_name(),
                reader.attribute_name(),
                reader.attribute_value(),
            ) {
                if attribute_name == name {
                    values.push((item_name.to_string(), value.to_string()));
                }
            }
        }
        Ok(values)
    }

    /// Collects the names of the items matching `condition`.
    fn select_item_names(&self, condition: Option<&Condition>) -> Result<Vec<String>> {
        let select = Select {
            selection: Selection::ItemName,
            condition: condition.cloned(),
            ..Default::default()
        };
        item_names(self.select(&select)?)
    }

    /// Deletes every item, keeping the table itself.
    fn erase(&self) -> Result<()> {
        for item_name in self.select_item_names(None)? {
            self.delete(&item_name, &mut |writer| {
                writer.delete_item();
            })?;
        }
        Ok(())
    }
}

impl<T: Table + ?Sized> TableExt for T {}

fn item_names(mut reader: Reader) -> Result<Vec<String>> {
    let mut names = Vec::new();
    loop {
        match reader.read()? {
            ReaderPosition::End => return Ok(names),
            ReaderPosition::Item | ReaderPosition::EmptyItem => {
                names.extend(reader.item_name().map(str::to_string));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableOptions;
    use crate::sqlite::table::SqliteTable;

    use rstest::{fixture, rstest};

    struct Fixture {
        _directory: tempfile::TempDir,
        table: SqliteTable,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let directory = tempfile::tempdir().unwrap();
        let options = TableOptions {
            ensure: true,
            ..Default::default()
        };
        let table = SqliteTable::open(directory.path().join("extension.db"), options).unwrap();
        Fixture {
            _directory: directory,
            table,
        }
    }

    fn attributes(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    #[rstest]
    fn test_set_and_get(fixture: Fixture) {
        let table = &fixture.table;
        table.set("e0", [("a", "1"), ("b", "2")]).unwrap();
        table.set("e1", [("a", "3")]).unwrap();
        table.set("e0", [("a", "4"), ("b", "")]).unwrap();

        assert_eq!(
            table.get(None).unwrap(),
            vec![
                ("e0".to_string(), attributes(&[("a", "4")])),
                ("e1".to_string(), attributes(&[("a", "3")])),
            ]
        );
        assert_eq!(
            table
                .get(Some(&Condition::attribute_value("a", "3")))
                .unwrap(),
            vec![("e1".to_string(), attributes(&[("a", "3")]))]
        );
    }

    #[rstest]
    fn test_set_empty_records_item(fixture: Fixture) {
        let table = &fixture.table;
        table.set("e0", Vec::<(String, String)>::new()).unwrap();
        table.set("e1", [("a", "")]).unwrap();

        assert_eq!(
            table.get(None).unwrap(),
            vec![
                ("e0".to_string(), IndexMap::new()),
                ("e1".to_string(), IndexMap::new()),
            ]
        );
    }

    #[rstest]
    fn test_get_attributes(fixture: Fixture) {
        let table = &fixture.table;
        table.set("e0", [("a", "1"), ("b", "2"), ("c", "3")]).unwrap();

        assert_eq!(
            table.get_attributes(&["c", "a"], None).unwrap(),
            vec![("e0".to_string(), attributes(&[("a", "1"), ("c", "3")]))]
        );
    }

    #[rstest]
    fn test_select_values(fixture: Fixture) {
        let table = &fixture.table;
        table
            .put("e0", &mut |writer| {
                writer.add("a", "1").add("a", "2").add("b", "3");
            })
            .unwrap();
        table.set("e1", [("b", "4")]).unwrap();

        let mut values = table.select_values("a", None).unwrap();
        values.sort();
        assert_eq!(
            values,
            vec![
                ("e0".to_string(), "1".to_string()),
                ("e0".to_string(), "2".to_string()),
            ]
        );
    }

    #[rstest]
    fn test_select_item_names_and_erase(fixture: Fixture) {
        let table = &fixture.table;
        table.set("e1", [("a", "1")]).unwrap();
        table.set("e0", [("a", "2")]).unwrap();
        table.set("e2", Vec::<(String, String)>::new()).unwrap();

        assert_eq!(
            table.select_item_names(None).unwrap(),
            vec!["e0".to_string(), "e1".to_string(), "e2".to_string()]
        );
        assert_eq!(
            table
                .select_item_names(Some(&Condition::attribute_value("a", "1")))
                .unwrap(),
            vec!["e1".to_string()]
        );

        table.erase().unwrap();
        assert!(table.select_item_names(None).unwrap().is_empty());
        assert_eq!(table.select_count(None).unwrap(), 0);
    }
}
