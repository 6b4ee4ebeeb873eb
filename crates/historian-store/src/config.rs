//! Store configuration and table-name validation.
//!
//! Table names come only from trusted configuration, but they are still
//! substituted into statement text, so every one of them is validated as a
//! bare SQL identifier before the store will use it. All data values go
//! through bound parameters instead.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name of the database (schema) the historian tables live in.
    pub database: String,
    /// Names of the historian tables.
    pub tables: TableNames,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: "historian".to_string(),
            tables: TableNames::default(),
        }
    }
}

/// Names of the tables the store owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    /// Time-series points table.
    pub data_table: String,
    /// Topic registry table.
    pub topics_table: String,
    /// Legacy separate metadata table. Ignored once schema detection finds
    /// a metadata column on the topics table.
    pub meta_table: String,
    /// Aggregate-topic registry table.
    pub agg_topics_table: String,
    /// Aggregate-topic metadata table.
    pub agg_meta_table: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            data_table: "data".to_string(),
            topics_table: "topics".to_string(),
            meta_table: "meta".to_string(),
            agg_topics_table: "aggregate_topics".to_string(),
            agg_meta_table: "aggregate_meta".to_string(),
        }
    }
}

impl TableNames {
    /// Validate every configured name as a bare SQL identifier.
    pub fn validate(&self) -> Result<()> {
        for name in [
            &self.data_table,
            &self.topics_table,
            &self.meta_table,
            &self.agg_topics_table,
            &self.agg_meta_table,
        ] {
            validate_identifier(name)?;
        }
        Ok(())
    }
}

/// Accept only bare SQL identifiers: ASCII letters, digits and underscores,
/// not starting with a digit.
pub(crate) fn validate_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(Error::InvalidTableName(name.to_string()))
    }
}
