//! Table configuration.
//!
//! Plain structs with `serde` derives, so callers can load them from any format
//! serde supports and open the configured table with [`TableConfig::open`].

use crate::error::{Error, Result};
use crate::reliability::Reliability;
use crate::sdb::service::Service;
use crate::sdb::table::SdbTable;
use crate::sqlite::table::SqliteTable;
use crate::table::Table;
use crate::table::delayed::DelayedTable;

use serde::{Deserialize, Serialize};
use std::{path, sync, time};

/// Defaults applied to every operation of a table.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(default)]
pub struct TableOptions {
    /// The maximum number of items per select page, unless a select sets its own.
    pub select_limit: Option<u32>,
    /// Whether selects read consistently, unless a select sets its own.
    pub consistent_read: bool,
    /// Whether opening a missing table creates it instead of failing.
    pub ensure: bool,
}

/// Which backend to open, and how.
///
/// ```rust
/// use attribute_table::config::TableConfig;
///
/// let config: TableConfig = serde_json::from_str(
///     r#"{"backend": "sqlite", "database_file_name": "items.db", "options": {"ensure": true}}"#,
/// )
/// .unwrap();
/// assert!(matches!(config, TableConfig::Sqlite { .. }));
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum TableConfig {
    /// A domain of the remote attribute service.
    Sdb {
        /// The domain name.
        domain_name: String,
        /// The table defaults.
        #[serde(default)]
        options: TableOptions,
        /// Delay before every call, in milliseconds.
        #[serde(default)]
        consistency_delay_ms: u64,
        /// The retry policy.
        #[serde(default)]
        reliability: Reliability,
    },
    /// A local database file.
    Sqlite {
        /// The database file path.
        database_file_name: path::PathBuf,
        /// The table defaults.
        #[serde(default)]
        options: TableOptions,
        /// Delay before every call, in milliseconds.
        #[serde(default)]
        consistency_delay_ms: u64,
        /// The retry policy.
        #[serde(default)]
        reliability: Reliability,
    },
}

impl TableConfig {
    /// Opens the configured table.
    ///
    /// `service` is the transport of the remote backend and is ignored by the local
    /// one. A configured delay wraps the table in a [`DelayedTable`].
    pub fn open(
        &self,
        service: Option<sync::Arc<dyn Service>>,
    ) -> Result<Box<dyn Table + Send + Sync>> {
        match self {
            Self::Sdb {
                domain_name,
                options,
                consistency_delay_ms,
                reliability,
            } => {
                let service = service.ok_or_else(|| {
                    Error::Configuration(format!(
                        "domain `{domain_name}` needs a service to connect to"
                    ))
                })?;
                let table = SdbTable::open_with_reliability(
                    service,
                    domain_name.as_str(),
                    options.clone(),
                    *reliability,
                )?;
                Ok(delayed(table, *consistency_delay_ms))
            }
            Self::Sqlite {
                database_file_name,
                options,
                consistency_delay_ms,
                reliability,
            } => {
                let table = SqliteTable::open_with_reliability(
                    database_file_name,
                    options.clone(),
                    *reliability,
                )?;
                Ok(delayed(table, *consistency_delay_ms))
            }
        }
    }
}

fn delayed<T: Table + Send + Sync + 'static>(
    table: T,
    delay_ms: u64,
) -> Box<dyn Table + Send + Sync> {
    match delay_ms {
        0 => Box::new(table),
        delay_ms => Box::new(DelayedTable::new(
            table,
            time::Duration::from_millis(delay_ms),
        )),
    }
}
