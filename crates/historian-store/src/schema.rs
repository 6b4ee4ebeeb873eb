//! Schema DDL and schema-version detection.
//!
//! Table names reaching these builders have already been validated as bare
//! identifiers; everything else in the statements is fixed text. The `ts`
//! column type is gated on the backend's sub-second capability.

use crate::config::validate_identifier;
use crate::error::Result;

/// Where topic metadata lives.
///
/// Current installs keep metadata in a column on the topics table; legacy
/// installs used a separate metadata table. Detected once at startup and
/// carried as state, not re-probed per call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetadataStore {
    /// Metadata is a column on the topics table (current layout).
    TopicsTable,
    /// Metadata lives in its own table (legacy layout).
    #[default]
    SeparateTable,
}

fn ts_column(microseconds: bool) -> &'static str {
    if microseconds {
        "ts timestamp(6) NOT NULL"
    } else {
        "ts timestamp NOT NULL"
    }
}

pub(crate) fn create_data_table_sql(table: &str, microseconds: bool) -> String {
    format!(
        "CREATE TABLE {table} ({ts}, \
         topic_id INTEGER NOT NULL, \
         value_string TEXT NOT NULL, \
         UNIQUE(topic_id, ts))",
        ts = ts_column(microseconds)
    )
}

pub(crate) fn create_data_index_sql(table: &str) -> String {
    format!("CREATE INDEX data_idx ON {table} (ts ASC)")
}

pub(crate) fn create_topics_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {table} (topic_id INTEGER NOT NULL AUTO_INCREMENT, \
         topic_name varchar(512) NOT NULL, \
         metadata TEXT, \
         PRIMARY KEY (topic_id), \
         UNIQUE(topic_name))"
    )
}

pub(crate) fn create_agg_topics_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {table} (agg_topic_id INTEGER NOT NULL AUTO_INCREMENT, \
         agg_topic_name varchar(512) NOT NULL, \
         agg_type varchar(20) NOT NULL, \
         agg_time_period varchar(20) NOT NULL, \
         PRIMARY KEY (agg_topic_id), \
         UNIQUE(agg_topic_name, agg_type, agg_time_period))"
    )
}

pub(crate) fn create_agg_meta_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {table} (agg_topic_id INTEGER NOT NULL, \
         metadata TEXT NOT NULL, \
         PRIMARY KEY(agg_topic_id))"
    )
}

pub(crate) fn create_rollup_table_sql(table: &str, microseconds: bool) -> String {
    format!(
        "CREATE TABLE {table} ({ts}, \
         topic_id INTEGER NOT NULL, \
         agg_value DOUBLE NOT NULL, \
         topics_list TEXT, \
         UNIQUE(topic_id, ts), \
         INDEX (ts ASC))",
        ts = ts_column(microseconds)
    )
}

/// Compose and validate the name of a `<function>_<period>` rollup table.
///
/// The period often starts with a digit (`1h`), so the composed name is what
/// gets validated, not the parts.
pub(crate) fn rollup_table_name(function: &str, period: &str) -> Result<String> {
    let name = format!("{function}_{period}");
    validate_identifier(&name)?;
    Ok(name)
}
