use crate::error::{Error, Result};

/// Precondition evaluated atomically with the mutation it guards.
///
/// All expectations of a writer must hold; otherwise none of its changes are
/// applied and the commit fails with [`Error::ExpectationViolated`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Expectation {
    /// The attribute currently holds this value.
    Equals {
        /// The attribute name.
        name: String,
        /// The expected value.
        value: String,
    },
    /// The attribute currently does not exist.
    Absent {
        /// The attribute name.
        name: String,
    },
}

impl Expectation {
    /// The attribute this expectation checks.
    pub fn name(&self) -> &str {
        match self {
            Self::Equals { name, .. } | Self::Absent { name } => name,
        }
    }
}

/// Writer accepting expectations.
pub trait ExpectedWriter {
    /// The expectations staged so far, in staging order.
    fn expectations(&self) -> &[Expectation];

    /// Mutable access to the staged expectations.
    fn expectations_mut(&mut self) -> &mut Vec<Expectation>;

    /// Requires `name` to currently hold `value`.
    fn expect(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self
    where
        Self: Sized,
    {
        self.expectations_mut().push(Expectation::Equals {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Requires `name` to currently not exist.
    fn expect_absent(&mut self, name: impl Into<String>) -> &mut Self
    where
        Self: Sized,
    {
        self.expectations_mut()
            .push(Expectation::Absent { name: name.into() });
        self
    }
}

/// Fails with [`Error::EmptyName`] when `name` is empty.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        Err(Error::EmptyName)
    } else {
        Ok(())
    }
}

/// Validates an item name together with the expectations staged against it.
pub(crate) fn validate_expectations(item_name: &str, expectations: &[Expectation]) -> Result<()> {
    validate_name(item_name)?;
    expectations
        .iter()
        .try_for_each(|expectation| validate_name(expectation.name()))
}
