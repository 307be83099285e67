use crate::common::selection::{COUNT_ATTRIBUTE, ITEM_NAME_ATTRIBUTE, Selection};
use crate::common::{self, condition};
use crate::error::Result;

/// Renders condition leaves with inline, quoted literals.
struct SelectDialect;

impl condition::Dialect for SelectDialect {
    fn bind(&mut self, value: &str) -> String {
        common::quote_literal(value)
    }

    fn item_name(&mut self, literal: String) -> String {
        format!("{ITEM_NAME_ATTRIBUTE} = {literal}")
    }

    fn attribute(&mut self, name: &str, test: condition::AttributeTest, every: bool) -> String {
        let target = if every {
            format!("every({name})")
        } else {
            name.to_string()
        };
        match test {
            condition::AttributeTest::Compare(test) => format!("{target} {test}"),
            condition::AttributeTest::Exists(true) => format!("{target} is not null"),
            condition::AttributeTest::Exists(false) => format!("{target} is null"),
        }
    }
}

/// Compiles a select against `domain_name` into the service's select expression.
///
/// Literals are quoted inline with embedded quotes doubled. The count projection
/// ignores `limit`, and a zero `limit` emits no `limit` clause. An empty or absent condition emits no `where` clause.
///
/// ```rust
/// use attribute_table::common::condition::Condition;
/// use attribute_table::common::selection::Selection;
/// use attribute_table::sdb::expression::select_expression;
///
/// let condition = Condition::attribute_value("owner", "o'brien");
/// let expression = select_expression("users", &Selection::All, Some(&condition), Some(10)).unwrap();
/// assert_eq!(expression, "select * from users where owner = 'o''brien' limit 10");
/// ```
pub fn select_expression(
    domain_name: &str,
    selection: &Selection,
    condition: Option<&condition::Condition>,
    limit: Option<u32>,
) -> Result<String> {
    let list = match selection {
        Selection::Attributes(names) if !names.is_empty() => names.join(","),
        Selection::All | Selection::Attributes(_) => "*".to_string(),
        Selection::ItemName => ITEM_NAME_ATTRIBUTE.to_string(),
        Selection::Count => COUNT_ATTRIBUTE.to_string(),
    };
    let mut expression = format!("select {list} from {domain_name}");
    if let Some(condition) = condition {
        let clause = condition.render(&mut SelectDialect)?;
        if !clause.is_empty() {
            expression.push_str(" where ");
            expression.push_str(&clause);
        }
    }
    match limit {
        Some(limit) if limit > 0 && *selection != Selection::Count => {
            expression.push_str(&format!(" limit {limit}"));
        }
        _ => {}
    }
    Ok(expression)
}
