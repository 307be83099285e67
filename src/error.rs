//! Error type shared by every table backend.

use rusqlite::ErrorCode;
use std::io;

/// Errors raised by table operations.
///
/// Compile-time problems ([`Error::InvalidPredicate`], [`Error::EmptyName`]) are detected
/// before any backend call is made and are never retried. [`Error::ExpectationViolated`]
/// guarantees that the mutation it aborted was not applied.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A condition cannot be compiled, e.g. a value-in test over an empty set.
    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    /// An item name or attribute name is empty.
    #[error("item and attribute names must not be empty")]
    EmptyName,

    /// A precondition attached to a put or delete did not hold.
    #[error("expectations violated")]
    ExpectationViolated,

    /// The table does not exist and was not asked to be created.
    #[error("table not found: {0}")]
    NotFound(String),

    /// A remote fault the service classifies as retryable.
    #[error("transient service fault {code}: {message}")]
    TransientServiceFault {
        /// The service fault code.
        code: String,
        /// The service fault message.
        message: String,
    },

    /// Any other remote fault.
    #[error("service fault {code}: {message}")]
    PermanentServiceFault {
        /// The service fault code.
        code: String,
        /// The service fault message.
        message: String,
    },

    /// The local database failed.
    #[error("storage fault: {0}")]
    StorageIoFault(#[from] rusqlite::Error),

    /// The local database file could not be accessed.
    #[error("io fault: {0}")]
    Io(#[from] io::Error),

    /// A table configuration cannot be opened.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether retrying the failed call may succeed.
    ///
    /// Holds for transient service faults, a busy or locked local database and
    /// local I/O failures other than a missing file.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TransientServiceFault { .. } => true,
            Self::StorageIoFault(error) => matches!(
                error.sqlite_error_code(),
                Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            ),
            Self::Io(error) => error.kind() != io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
