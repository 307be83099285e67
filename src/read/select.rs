use crate::common;

/// Arguments for a select operation.
///
/// `consistent_read` and `limit` override the table's defaults for this call only.
///
/// ```rust
/// use attribute_table::common::condition::Condition;
/// use attribute_table::read::select::Select;
///
/// let select = Select {
///     condition: Some(Condition::attribute_value("status", "active")),
///     limit: Some(100),
///     ..Default::default()
/// };
/// assert!(select.consistent_read.is_none());
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Select {
    /// Which attributes to return.
    pub selection: common::selection::Selection,
    /// Filter applied to items; `None` matches every item.
    pub condition: Option<common::condition::Condition>,
    /// Whether the read must observe every completed write.
    ///
    /// `None` uses the table default; backends without a consistency choice ignore it.
    pub consistent_read: Option<bool>,
    /// The maximum number of items fetched per page.
    ///
    /// Paging is transparent to the reader; this only bounds the size of each request.
    pub limit: Option<u32>,
}

impl Select {
    /// Selects every item matching `condition`, with all attributes.
    pub fn with_condition(condition: Option<common::condition::Condition>) -> Self {
        Self {
            condition,
            ..Default::default()
        }
    }

    /// Counts the items matching `condition`.
    pub fn count(condition: Option<common::condition::Condition>) -> Self {
        Self {
            selection: common::selection::Selection::Count,
            condition,
            ..Default::default()
        }
    }

    /// The filter to compile, dropping conditions that filter nothing.
    pub(crate) fn effective_condition(&self) -> Option<&common::condition::Condition> {
        self.condition
            .as_ref()
            .filter(|condition| !condition.is_empty())
    }
}
