use crate::common;
use crate::common::condition::{AttributeTest, Condition, Dialect};
use crate::common::selection::Selection;
use crate::error::Result;

/// Schema of a table database, safe to run against an existing database.
pub const SCHEMA: &str = "\
create table if not exists item(id integer primary key, name text not null);
create unique index if not exists item_name on item(name);
create table if not exists attribute(item_id integer not null, name text not null, value text not null);
create unique index if not exists attribute_item_name_value on attribute(item_id, name, value);";

/// A compiled query with its positional parameters.
///
/// Placeholders are numbered (`?1`, `?2`, ...) and may appear more than once.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct SqlQuery {
    /// The query text.
    pub sql: String,
    /// The values bound to the placeholders, in placeholder order.
    pub parameters: Vec<String>,
}

/// Renders condition leaves as subqueries over the attribute table.
#[derive(Default)]
struct SqlDialect {
    parameters: Vec<String>,
}

impl Dialect for SqlDialect {
    fn bind(&mut self, value: &str) -> String {
        self.parameters.push(value.to_string());
        format!("?{}", self.parameters.len())
    }

    fn item_name(&mut self, literal: String) -> String {
        format!("item.name = {literal}")
    }

    fn attribute(&mut self, name: &str, test: AttributeTest, every: bool) -> String {
        let name = self.bind(name);
        let having = format!("select attribute.item_id from attribute where attribute.name = {name}");
        match (test, every) {
            (AttributeTest::Exists(true), _) => format!("item.id in ({having})"),
            (AttributeTest::Exists(false), _) => format!("item.id not in ({having})"),
            (AttributeTest::Compare(test), false) => {
                format!("item.id in ({having} and attribute.value {test})")
            }
            (AttributeTest::Compare(test), true) => format!(
                "(item.id in ({having}) and item.id not in ({having} and not (attribute.value {test})))"
            ),
        }
    }
}

/// Compiles a select into a query over the item and attribute tables.
///
/// Rows are `(item name, attribute name, attribute value)` ordered by item name and
/// then attribute name; an item without (selected) attributes yields one row with
/// null attribute columns. With a `limit`, only the first `limit` items whose name
/// sorts after `after` are returned, never splitting an item's rows; a zero `limit`
/// does not page. The count projection yields the single row
/// `('Domain', 'Count', n)` and ignores paging.
///
/// ```rust
/// use attribute_table::common::condition::Condition;
/// use attribute_table::common::selection::Selection;
/// use attribute_table::sqlite::expression::select_query;
///
/// let condition = Condition::item_name("e0");
/// let query = select_query(&Selection::ItemName, Some(&condition), None, None).unwrap();
/// assert_eq!(
///     query.sql,
///     "select item.name, null, null from item where item.name = ?1 order by item.name",
/// );
/// assert_eq!(query.parameters, vec!["e0".to_string()]);
/// ```
pub fn select_query(
    selection: &Selection,
    condition: Option<&Condition>,
    limit: Option<u32>,
    after: Option<&str>,
) -> Result<SqlQuery> {
    let mut dialect = SqlDialect::default();
    let mut filter = match condition {
        Some(condition) => condition.render(&mut dialect)?,
        None => String::new(),
    };

    let (head, order) = match selection {
        Selection::Count => {
            let mut sql = "select 'Domain', 'Count', cast(count(item.id) as text) from item".to_string();
            if !filter.is_empty() {
                sql.push_str(&format!(" where {filter}"));
            }
            return Ok(SqlQuery {
                sql,
                parameters: dialect.parameters,
            });
        }
        Selection::ItemName => (
            "select item.name, null, null from item".to_string(),
            " order by item.name",
        ),
        Selection::All => (join(None), " order by item.name, attribute.name"),
        Selection::Attributes(names) => {
            let names: Vec<_> = names.iter().map(|name| dialect.bind(name)).collect();
            (join(Some(names.as_slice())), " order by item.name, attribute.name")
        }
    };

    if let Some(after) = after {
        let after = dialect.bind(after);
        filter = common::get_expression(filter, " and ", format!("item.name > {after}"));
    }
    if let Some(limit) = limit.filter(|limit| *limit > 0) {
        let page_filter = if filter.is_empty() {
            String::new()
        } else {
            format!(" where {filter}")
        };
        filter = format!(
            "item.id in (select item.id from item{page_filter} order by item.name limit {limit})"
        );
    }

    let mut sql = head;
    if !filter.is_empty() {
        sql.push_str(&format!(" where {filter}"));
    }
    sql.push_str(order);
    Ok(SqlQuery {
        sql,
        parameters: dialect.parameters,
    })
}

fn join(names: Option<&[String]>) -> String {
    let mut sql = "select item.name, attribute.name, attribute.value from item \
        left outer join attribute on attribute.item_id = item.id"
        .to_string();
    match names {
        Some(names) if !names.is_empty() => {
            sql.push_str(&format!(" and attribute.name in ({})", names.join(", ")));
        }
        _ => {}
    }
    sql
}
