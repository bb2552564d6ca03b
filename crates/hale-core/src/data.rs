//! Scenario test data tables.
//!
//! Data lives in one YAML file of named tables, each a list of flat
//! string records. The `scenario` column is the unique key a step uses
//! to fetch its row, so data changes never require code changes:
//!
//! ```yaml
//! logins:
//!   - scenario: ValidLogin
//!     username: admin
//!     password: admin123
//! ```

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read data file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse data file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("no table named '{0}' in the data file")]
    TableNotFound(String),
    #[error("no row found for key '{key}' in table '{table}'")]
    RecordNotFound { table: String, key: String },
}

/// One row: column name to cell value.
pub type DataRecord = HashMap<String, String>;

/// All tables from the data file, loaded once at process start and
/// shared read-only with every worker.
#[derive(Debug, Clone, Default)]
pub struct DataTables {
    tables: HashMap<String, Vec<DataRecord>>,
}

impl DataTables {
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tables = serde_yaml::from_str(&content).map_err(|source| DataError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "data tables loaded");
        Ok(Self { tables })
    }

    pub fn from_tables(tables: HashMap<String, Vec<DataRecord>>) -> Self {
        Self { tables }
    }

    /// Fetch the row whose `scenario` column matches `key`
    /// (case-insensitive). Failing fast here beats continuing a test
    /// with missing data.
    pub fn lookup(&self, table: &str, key: &str) -> Result<&DataRecord, DataError> {
        let rows = self
            .tables
            .get(table)
            .ok_or_else(|| DataError::TableNotFound(table.to_string()))?;
        rows.iter()
            .find(|row| {
                row.get("scenario")
                    .is_some_and(|v| v.eq_ignore_ascii_case(key))
            })
            .ok_or_else(|| DataError::RecordNotFound {
                table: table.to_string(),
                key: key.to_string(),
            })
    }
}
