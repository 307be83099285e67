use crate::common;
use crate::error::{Error, Result};

use std::ops;

/// Logical operator for combining conditions.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LogicalOperator {
    /// Logical AND - all conditions must be true.
    And,
    /// Logical OR - at least one condition must be true.
    Or,
}

impl ops::Deref for LogicalOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::And => " and ",
            Self::Or => " or ",
        }
    }
}

/// Comparison applied between an attribute value and a literal.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ValueTest {
    /// The value equals the literal.
    #[default]
    Equal,
    /// The value differs from the literal.
    NotEqual,
    /// The value sorts before the literal.
    LessThan,
    /// The value sorts after the literal.
    GreaterThan,
    /// The value sorts before or equals the literal.
    LessOrEqual,
    /// The value sorts after or equals the literal.
    GreaterOrEqual,
    /// The value matches the `%` pattern, case-sensitively.
    Like,
    /// The value does not match the `%` pattern, case-sensitively.
    NotLike,
}

impl ValueTest {
    /// Operator text shared by both query languages.
    pub fn operator(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
            Self::Like => "like",
            Self::NotLike => "not like",
        }
    }
}

/// Predicate over the values of one named attribute.
///
/// Without a quantifier an attribute predicate holds when *some* value of the
/// attribute satisfies it; wrapped in [`Condition::Every`] it must hold for all of them.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum AttributeCondition {
    /// The attribute has a value passing `test` against `value`.
    Value {
        /// The attribute name.
        name: String,
        /// The comparison to apply.
        test: ValueTest,
        /// The literal to compare with.
        value: String,
    },
    /// The attribute does not exist on the item.
    IsNull(String),
    /// The attribute exists on the item.
    IsNotNull(String),
    /// The attribute has a value within `lower..=upper`.
    Between {
        /// The attribute name.
        name: String,
        /// The inclusive lower bound.
        lower: String,
        /// The inclusive upper bound.
        upper: String,
    },
    /// The attribute has a value contained in `values`, which must not be empty.
    In {
        /// The attribute name.
        name: String,
        /// The accepted values.
        values: Vec<String>,
    },
}

impl AttributeCondition {
    /// The attribute this predicate tests.
    pub fn name(&self) -> &str {
        match self {
            Self::Value { name, .. }
            | Self::IsNull(name)
            | Self::IsNotNull(name)
            | Self::Between { name, .. }
            | Self::In { name, .. } => name,
        }
    }

    fn render<D: Dialect>(&self, dialect: &mut D, every: bool) -> Result<String> {
        if self.name().is_empty() {
            return Err(Error::InvalidPredicate(
                "attribute name is empty".to_string(),
            ));
        }
        let test = match self {
            Self::Value { test, value, .. } => {
                let literal = dialect.bind(value);
                AttributeTest::Compare(format!("{} {literal}", test.operator()))
            }
            Self::IsNull(_) => AttributeTest::Exists(false),
            Self::IsNotNull(_) => AttributeTest::Exists(true),
            Self::Between { lower, upper, .. } => {
                let lower = dialect.bind(lower);
                let upper = dialect.bind(upper);
                AttributeTest::Compare(format!("between {lower} and {upper}"))
            }
            Self::In { name, values } => {
                if values.is_empty() {
                    return Err(Error::InvalidPredicate(format!(
                        "value set of attribute `{name}` is empty"
                    )));
                }
                let literals: Vec<_> = values.iter().map(|value| dialect.bind(value)).collect();
                AttributeTest::Compare(format!("in ({})", literals.join(", ")))
            }
        };
        Ok(dialect.attribute(self.name(), test, every))
    }
}

/// Backend-independent predicate over items.
///
/// ```rust
/// use attribute_table::common::condition::{Condition, ValueTest};
///
/// let condition = Condition::and([
///     Condition::attribute_value("status", "active"),
///     Condition::attribute_test("age", ValueTest::GreaterOrEqual, "18"),
/// ]);
/// assert!(!condition.is_empty());
/// assert!(Condition::and([]).is_empty());
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Condition {
    /// The item has exactly this name.
    ItemName(String),
    /// Some value of the attribute satisfies the predicate.
    Attribute(AttributeCondition),
    /// Every value of the attribute satisfies the predicate.
    Every(AttributeCondition),
    /// All (`And`) or any (`Or`) of the sub-conditions hold; an empty group always holds.
    Group(LogicalOperator, Vec<Condition>),
}

impl Condition {
    /// Matches the item with this name.
    pub fn item_name(name: impl Into<String>) -> Self {
        Self::ItemName(name.into())
    }

    /// Matches items with `name` holding `value`.
    pub fn attribute_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::attribute_test(name, ValueTest::Equal, value)
    }

    /// Matches items with a value of `name` passing `test` against `value`.
    pub fn attribute_test(
        name: impl Into<String>,
        test: ValueTest,
        value: impl Into<String>,
    ) -> Self {
        Self::Attribute(AttributeCondition::Value {
            name: name.into(),
            test,
            value: value.into(),
        })
    }

    /// Matches items with a value of `name` within `lower..=upper`.
    pub fn attribute_between(
        name: impl Into<String>,
        lower: impl Into<String>,
        upper: impl Into<String>,
    ) -> Self {
        Self::Attribute(AttributeCondition::Between {
            name: name.into(),
            lower: lower.into(),
            upper: upper.into(),
        })
    }

    /// Matches items with a value of `name` among `values`.
    ///
    /// An empty `values` set is rejected when the condition is compiled.
    pub fn attribute_in<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Attribute(AttributeCondition::In {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Matches items without the attribute.
    pub fn attribute_is_null(name: impl Into<String>) -> Self {
        Self::Attribute(AttributeCondition::IsNull(name.into()))
    }

    /// Matches items with the attribute.
    pub fn attribute_is_not_null(name: impl Into<String>) -> Self {
        Self::Attribute(AttributeCondition::IsNotNull(name.into()))
    }

    /// Requires every value of the attribute to satisfy `condition`.
    pub fn every(condition: AttributeCondition) -> Self {
        Self::Every(condition)
    }

    /// Matches items satisfying all of `group`.
    pub fn and(group: impl IntoIterator<Item = Condition>) -> Self {
        Self::Group(LogicalOperator::And, group.into_iter().collect())
    }

    /// Matches items satisfying any of `group`.
    pub fn or(group: impl IntoIterator<Item = Condition>) -> Self {
        Self::Group(LogicalOperator::Or, group.into_iter().collect())
    }

    /// Whether this condition filters nothing (it only contains empty groups).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Group(_, group) => group.iter().all(Self::is_empty),
            _ => false,
        }
    }

    /// Renders the condition through `dialect`; an empty result means "no filter".
    pub(crate) fn render<D: Dialect>(&self, dialect: &mut D) -> Result<String> {
        match self {
            Self::ItemName(name) => {
                let literal = dialect.bind(name);
                Ok(dialect.item_name(literal))
            }
            Self::Attribute(condition) => condition.render(dialect, false),
            Self::Every(condition) => condition.render(dialect, true),
            Self::Group(operator, group) => {
                let mut expression = String::new();
                for condition in group {
                    let inner = condition.render(dialect)?;
                    expression = common::get_expression(expression, operator, inner);
                }
                if expression.is_empty() {
                    Ok(expression)
                } else {
                    Ok(format!("({expression})"))
                }
            }
        }
    }
}

impl From<AttributeCondition> for Condition {
    fn from(condition: AttributeCondition) -> Self {
        Self::Attribute(condition)
    }
}

/// The value part of a rendered attribute predicate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum AttributeTest {
    /// Operator and bound literals, e.g. `= 'a'` or `in (?1, ?2)`.
    Compare(String),
    /// Existence (`true`) or absence (`false`) of the attribute.
    Exists(bool),
}

/// How one backend renders condition leaves.
///
/// The group walk in [`Condition::render`] is shared; a dialect only decides how a
/// literal is bound and how a single leaf reads.
pub(crate) trait Dialect {
    /// Binds a literal, returning the text that stands for it.
    fn bind(&mut self, value: &str) -> String;

    /// Renders an item-name equality against an already bound literal.
    fn item_name(&mut self, literal: String) -> String;

    /// Renders one attribute predicate, quantified over all values when `every` is set.
    fn attribute(&mut self, name: &str, test: AttributeTest, every: bool) -> String;
}
