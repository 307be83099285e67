use crate::error::Result;

use indexmap::IndexMap;
use std::collections;

/// Where a [`Reader`] stands after its last [`Reader::read`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ReaderPosition {
    /// `read` has not been called yet.
    #[default]
    BeforeStart,
    /// The first value of the first attribute of a new item.
    Item,
    /// A new item without attributes.
    EmptyItem,
    /// The first value of another attribute of the current item.
    Attribute,
    /// Another value of the current attribute.
    Value,
    /// The results are exhausted; further reads stay here.
    End,
}

/// One item as a backend returns it: its name and flat `(attribute, value)` pairs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawItem {
    /// The item name.
    pub name: String,
    /// The attribute values of the item, one pair per value.
    pub attributes: Vec<(String, String)>,
}

/// One page of backend results.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Page {
    /// The items of this page, in backend order.
    pub items: Vec<RawItem>,
    /// Token to pass to the next fetch, or `None` when this is the last page.
    pub continuation: Option<String>,
}

/// Source of result pages behind a [`Reader`].
pub trait Pager: Send {
    /// Fetches the page following `continuation`, or the first page when it is `None`.
    fn fetch(&mut self, continuation: Option<&str>) -> Result<Page>;
}

/// Pull-based cursor decoding select results into item, attribute and value positions.
///
/// Pages are fetched lazily whenever the buffered items run out and the backend
/// returned a continuation token, so paging is invisible to the caller. The
/// current item's values are held grouped by attribute name and walked by index.
///
/// ```rust,no_run
/// use attribute_table::read::reader::{Reader, ReaderPosition};
///
/// # fn example(mut reader: Reader) -> attribute_table::Result<()> {
/// loop {
///     match reader.read()? {
///         ReaderPosition::Item | ReaderPosition::EmptyItem => {
///             println!("item {:?}", reader.item_name());
///         }
///         ReaderPosition::End => break,
///         _ => {}
///     }
///     if let (Some(name), Some(value)) = (reader.attribute_name(), reader.attribute_value()) {
///         println!("  {name} = {value}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Reader {
    pager: Box<dyn Pager>,
    fetched: bool,
    continuation: Option<String>,
    pending: collections::VecDeque<RawItem>,
    item: Option<String>,
    groups: Vec<(String, Vec<String>)>,
    group: Option<usize>,
    value: usize,
    position: ReaderPosition,
}

impl Reader {
    /// Creates a reader pulling its pages from `pager`.
    pub fn new(pager: Box<dyn Pager>) -> Self {
        Self {
            pager,
            fetched: false,
            continuation: None,
            pending: collections::VecDeque::new(),
            item: None,
            groups: Vec::new(),
            group: None,
            value: 0,
            position: ReaderPosition::BeforeStart,
        }
    }

    /// Advances to the next position.
    pub fn read(&mut self) -> Result<ReaderPosition> {
        if self.position == ReaderPosition::End {
            return Ok(ReaderPosition::End);
        }
        self.position = if self.next_value() {
            ReaderPosition::Value
        } else if self.next_attribute() {
            ReaderPosition::Attribute
        } else if self.next_item()? {
            match self.group {
                Some(_) => ReaderPosition::Item,
                None => ReaderPosition::EmptyItem,
            }
        } else {
            self.item = None;
            self.groups.clear();
            self.group = None;
            ReaderPosition::End
        };
        Ok(self.position)
    }

    /// The position reached by the last read.
    pub fn position(&self) -> ReaderPosition {
        self.position
    }

    /// The current item name.
    pub fn item_name(&self) -> Option<&str> {
        self.item.as_deref()
    }

    /// The current attribute name; `None` on an empty item.
    pub fn attribute_name(&self) -> Option<&str> {
        self.current_group().map(|(name, _)| name.as_str())
    }

    /// The current attribute value; `None` on an empty item.
    pub fn attribute_value(&self) -> Option<&str> {
        self.current_group()
            .and_then(|(_, values)| values.get(self.value))
            .map(String::as_str)
    }

    fn current_group(&self) -> Option<&(String, Vec<String>)> {
        self.group.and_then(|group| self.groups.get(group))
    }

    fn next_value(&mut self) -> bool {
        match self.current_group() {
            Some((_, values)) if self.value + 1 < values.len() => {
                self.value += 1;
                true
            }
            _ => false,
        }
    }

    fn next_attribute(&mut self) -> bool {
        match self.group {
            Some(group) if group + 1 < self.groups.len() => {
                self.group = Some(group + 1);
                self.value = 0;
                true
            }
            _ => false,
        }
    }

    fn next_item(&mut self) -> Result<bool> {
        let Some(item) = self.next_raw_item()? else {
            return Ok(false);
        };
        let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
        for (name, value) in item.attributes {
            groups.entry(name).or_default().push(value);
        }
        self.groups = groups.into_iter().collect();
        self.group = if self.groups.is_empty() { None } else { Some(0) };
        self.value = 0;
        self.item = Some(item.name);
        Ok(true)
    }

    fn next_raw_item(&mut self) -> Result<Option<RawItem>> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Ok(Some(item));
            }
            if self.fetched && self.continuation.is_none() {
                return Ok(None);
            }
            let page = self.pager.fetch(self.continuation.as_deref())?;
            self.fetched = true;
            self.continuation = page.continuation;
            self.pending.extend(page.items);
        }
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("position", &self.position)
            .field("item", &self.item)
            .field("continuation", &self.continuation)
            .finish_non_exhaustive()
    }
}
