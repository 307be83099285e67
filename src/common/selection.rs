use indexmap::IndexSet;

/// Reserved attribute name selecting the number of matching items.
pub const COUNT_ATTRIBUTE: &str = "count(*)";

/// Reserved attribute name selecting item names only.
pub const ITEM_NAME_ATTRIBUTE: &str = "itemName()";

/// Which attributes a select returns.
///
/// ```rust
/// use attribute_table::common::selection::{self, Selection};
///
/// assert_eq!(Selection::from_names([selection::COUNT_ATTRIBUTE]), Selection::Count);
/// assert_eq!(
///     Selection::from_names(["a", "b", "a"]),
///     Selection::Attributes(vec!["a".to_string(), "b".to_string()]),
/// );
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum Selection {
    /// Every attribute of each item.
    #[default]
    All,
    /// Only the named attributes of each item.
    Attributes(Vec<String>),
    /// Item names only; each item surfaces as an empty item.
    ItemName,
    /// A single item named `Domain` whose `Count` attribute holds the number of matches.
    Count,
}

impl Selection {
    /// Builds a selection from attribute names, recognising the reserved names.
    ///
    /// An empty list selects everything; duplicate names are dropped keeping the first.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: IndexSet<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Self::All;
        }
        if names.len() == 1 {
            match names.first().map(String::as_str) {
                Some(COUNT_ATTRIBUTE) => return Self::Count,
                Some(ITEM_NAME_ATTRIBUTE) => return Self::ItemName,
                _ => {}
            }
        }
        Self::Attributes(names.into_iter().collect())
    }

    /// The selected attribute names, or `None` when the projection is not a name list.
    pub fn attribute_names(&self) -> Option<&[String]> {
        match self {
            Self::Attributes(names) => Some(names),
            _ => None,
        }
    }
}
