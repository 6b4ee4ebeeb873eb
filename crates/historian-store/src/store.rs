//! Main store implementation.

use std::collections::HashMap;

use time::OffsetDateTime;
use tracing::{debug, info};

use historian_types::{AggregateFunction, AggregateTopic};

use crate::capability::{self, VERSION_QUERY};
use crate::config::StoreConfig;
use crate::config::TableNames;
use crate::driver::{Driver, DriverErrorKind, Row, SqlValue};
use crate::error::{Error, Result};
use crate::models::{PointSample, TopicMap, TopicMetadata};
use crate::queries::PointQuery;
use crate::schema::{self, MetadataStore};

/// Relational store for historian time-series data.
///
/// The store is handed a ready [`Driver`] and owns everything above it: the
/// schema, statement construction, and the backend-capability handling. It
/// performs no locking or threading of its own; one store instance belongs
/// to one caller at a time.
#[derive(Debug)]
pub struct HistorianStore<D: Driver> {
    driver: D,
    database: String,
    tables: TableNames,
    metadata_store: MetadataStore,
    microsecond_support: Option<bool>,
}

impl<D: Driver> HistorianStore<D> {
    /// Create a store over an already-open driver.
    ///
    /// Fails if any configured table name is not a bare SQL identifier.
    pub fn new(driver: D, config: StoreConfig) -> Result<Self> {
        config.tables.validate()?;
        Ok(Self {
            driver,
            database: config.database,
            tables: config.tables,
            metadata_store: MetadataStore::default(),
            microsecond_support: None,
        })
    }

    /// Where topic metadata currently lives, per schema detection.
    #[must_use]
    pub fn metadata_store(&self) -> MetadataStore {
        self.metadata_store
    }

    /// The underlying driver, for executing caller-built statements.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Consume the store and hand the driver back.
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Whether the backend stores sub-second timestamps.
    ///
    /// Detected once per store instance from the backend version string and
    /// cached for the rest of the process lifetime.
    pub fn microsecond_support(&mut self) -> Result<bool> {
        if let Some(support) = self.microsecond_support {
            return Ok(support);
        }
        let rows = self.driver.execute_query(VERSION_QUERY, &[])?;
        let version = rows
            .first()
            .and_then(|row| row.first())
            .and_then(SqlValue::as_str)
            .ok_or_else(|| Error::UnexpectedRow("version query returned no rows".to_string()))?;
        let support = capability::microsecond_support(version)?;
        debug!("backend version {}: microsecond support {}", version, support);
        self.microsecond_support = Some(support);
        Ok(support)
    }

    fn meta_table(&self) -> &str {
        match self.metadata_store {
            MetadataStore::TopicsTable => &self.tables.topics_table,
            MetadataStore::SeparateTable => &self.tables.meta_table,
        }
    }

    fn table_exists(&mut self, table: &str) -> Result<bool> {
        let rows = self
            .driver
            .execute_query("SHOW TABLES LIKE ?", &[SqlValue::Text(table.to_string())])?;
        Ok(!rows.is_empty())
    }

    fn run_schema_statement(&mut self, table: &str, sql: &str, commit: bool) -> Result<()> {
        self.driver
            .execute_statement(sql, &[], commit)
            .map_err(|e| match e.kind {
                DriverErrorKind::AccessDenied => Error::SchemaAccessDenied {
                    table: table.to_string(),
                },
                _ => Error::SchemaCreation {
                    table: table.to_string(),
                    message: e.message,
                },
            })?;
        Ok(())
    }
}

// Schema management
impl<D: Driver> HistorianStore<D> {
    /// Create the points and topics tables if they do not exist yet.
    ///
    /// When the points table is already present this instead detects where
    /// topic metadata lives: current installs carry a `metadata` column on
    /// the topics table, legacy installs keep a separate metadata table.
    /// Both layouts are served without migration.
    pub fn setup_historian_tables(&mut self) -> Result<()> {
        let microseconds = self.microsecond_support()?;
        let data_table = self.tables.data_table.clone();
        let topics_table = self.tables.topics_table.clone();

        if self.table_exists(&data_table)? {
            debug!("found table {}; historian schema exists", data_table);
            let rows = self.driver.execute_query(
                "SELECT 1 FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME = 'metadata'",
                &[
                    SqlValue::Text(self.database.clone()),
                    SqlValue::Text(topics_table.clone()),
                ],
            )?;
            if !rows.is_empty() {
                debug!("topics table carries a metadata column");
                self.metadata_store = MetadataStore::TopicsTable;
            }
            return Ok(());
        }

        self.run_schema_statement(
            &data_table,
            &schema::create_data_table_sql(&data_table, microseconds),
            false,
        )?;
        self.run_schema_statement(&data_table, &schema::create_data_index_sql(&data_table), false)?;
        self.run_schema_statement(
            &topics_table,
            &schema::create_topics_table_sql(&topics_table),
            false,
        )?;
        self.metadata_store = MetadataStore::TopicsTable;
        self.driver.commit()?;
        info!("created {} and {} tables", data_table, topics_table);
        Ok(())
    }

    /// Create the aggregate-topic and aggregate-metadata tables if absent.
    pub fn setup_aggregate_tables(&mut self) -> Result<()> {
        let agg_topics_table = self.tables.agg_topics_table.clone();
        let agg_meta_table = self.tables.agg_meta_table.clone();

        if self.table_exists(&agg_topics_table)? {
            debug!("found table {}; aggregate schema exists", agg_topics_table);
            return Ok(());
        }

        self.run_schema_statement(
            &agg_topics_table,
            &schema::create_agg_topics_table_sql(&agg_topics_table),
            false,
        )?;
        self.run_schema_statement(
            &agg_meta_table,
            &schema::create_agg_meta_table_sql(&agg_meta_table),
            false,
        )?;
        self.driver.commit()?;
        info!("created {} and {} tables", agg_topics_table, agg_meta_table);
        Ok(())
    }

    /// Create the `<function>_<period>` rollup table if absent.
    ///
    /// The rollup table has the same uniqueness and index shape as the
    /// points table, with a numeric value column.
    pub fn create_rollup_table(&mut self, function: &str, period: &str) -> Result<()> {
        let table = schema::rollup_table_name(function, period)?;
        let microseconds = self.microsecond_support()?;

        if self.table_exists(&table)? {
            debug!("found table {}; rollup table exists", table);
            return Ok(());
        }

        self.run_schema_statement(
            &table,
            &schema::create_rollup_table_sql(&table, microseconds),
            true,
        )
    }
}

// Topic registry operations
impl<D: Driver> HistorianStore<D> {
    /// Load the full topic registry.
    ///
    /// Designed for registries of modest size; this is a single full scan
    /// with no pagination.
    pub fn topic_map(&mut self) -> Result<TopicMap> {
        let sql = format!(
            "SELECT topic_id, topic_name FROM {}",
            self.tables.topics_table
        );
        debug!("loading topic map from db");
        let rows = self.driver.execute_query(&sql, &[])?;

        let mut map = TopicMap::default();
        for row in rows {
            let (id, name) = decode_id_name(&row)?;
            map.ids.insert(name.to_lowercase(), id);
            map.names.insert(name.to_lowercase(), name);
        }
        Ok(map)
    }

    /// Load metadata for every topic that has any.
    pub fn topic_meta_map(&mut self) -> Result<HashMap<i64, TopicMetadata>> {
        let sql = format!("SELECT topic_id, metadata FROM {}", self.meta_table());
        debug!("loading metadata from db");
        let rows = self.driver.execute_query(&sql, &[])?;

        let mut map = HashMap::new();
        for row in rows {
            let id = row
                .first()
                .and_then(SqlValue::as_i64)
                .ok_or_else(|| unexpected_row(&row))?;
            // topics without metadata have a NULL column in the merged layout
            let Some(text) = row.get(1).and_then(SqlValue::as_str) else {
                continue;
            };
            map.insert(id, serde_json::from_str(text)?);
        }
        Ok(map)
    }

    /// Find topics whose names match a regular expression,
    /// case-insensitively.
    ///
    /// The pattern is caller-supplied free-form input; it reaches the
    /// backend only as a bound parameter.
    pub fn topics_matching_pattern(&mut self, pattern: &str) -> Result<HashMap<String, i64>> {
        let sql = format!(
            "SELECT topic_id, topic_name FROM {} WHERE lower(topic_name) REGEXP lower(?)",
            self.tables.topics_table
        );
        let rows = self
            .driver
            .execute_query(&sql, &[SqlValue::Text(pattern.to_string())])?;

        let mut map = HashMap::new();
        for row in rows {
            let (id, name) = decode_id_name(&row)?;
            map.insert(name, id);
        }
        debug!("{} topics matched pattern {}", map.len(), pattern);
        Ok(map)
    }
}

// Statement builders
//
// Parameterized statement text for the caller-driven write paths; topic
// resolution and execution live above this layer.
impl<D: Driver> HistorianStore<D> {
    /// Single-row point upsert.
    pub fn insert_data_stmt(&self) -> String {
        format!("REPLACE INTO {} VALUES (?, ?, ?)", self.tables.data_table)
    }

    /// Single-row metadata upsert.
    pub fn insert_meta_stmt(&self) -> String {
        format!(
            "REPLACE INTO {} (topic_id, metadata) VALUES (?, ?)",
            self.meta_table()
        )
    }

    /// Register a topic by name.
    pub fn insert_topic_stmt(&self) -> String {
        format!(
            "INSERT INTO {} (topic_name) VALUES (?)",
            self.tables.topics_table
        )
    }

    /// Register a topic with metadata attached.
    pub fn insert_topic_and_meta_stmt(&self) -> String {
        format!(
            "INSERT INTO {} (topic_name, metadata) VALUES (?, ?)",
            self.tables.topics_table
        )
    }

    /// Rename a topic.
    pub fn update_topic_stmt(&self) -> String {
        format!(
            "UPDATE {} SET topic_name = ? WHERE topic_id = ?",
            self.tables.topics_table
        )
    }

    /// Rename a topic and replace its metadata.
    pub fn update_topic_and_meta_stmt(&self) -> String {
        format!(
            "UPDATE {} SET topic_name = ?, metadata = ? WHERE topic_id = ?",
            self.tables.topics_table
        )
    }

    /// Replace a topic's metadata.
    pub fn update_meta_stmt(&self) -> String {
        format!(
            "UPDATE {} SET metadata = ? WHERE topic_id = ?",
            self.meta_table()
        )
    }

    /// Register an aggregate topic.
    pub fn insert_agg_topic_stmt(&self) -> String {
        format!(
            "INSERT INTO {} (agg_topic_name, agg_type, agg_time_period) VALUES (?, ?, ?)",
            self.tables.agg_topics_table
        )
    }

    /// Rename an aggregate topic.
    pub fn update_agg_topic_stmt(&self) -> String {
        format!(
            "UPDATE {} SET agg_topic_name = ? WHERE agg_topic_id = ?",
            self.tables.agg_topics_table
        )
    }

    /// Replace an aggregate topic's metadata record.
    pub fn replace_agg_meta_stmt(&self) -> String {
        format!(
            "REPLACE INTO {} VALUES (?, ?)",
            self.tables.agg_meta_table
        )
    }

    /// Single-row upsert into a rollup table.
    pub fn insert_aggregate_stmt(&self, function: &str, period: &str) -> Result<String> {
        let table = schema::rollup_table_name(function, period)?;
        Ok(format!("REPLACE INTO {table} VALUES (?, ?, ?, ?)"))
    }
}

// Point queries
impl<D: Driver> HistorianStore<D> {
    /// Execute a windowed point query across one or more topics.
    ///
    /// One bounded query is issued per topic id so the count limit applies
    /// per topic, and the result map is keyed by the caller-supplied display
    /// names. Topics with no matching points still appear, mapped to an
    /// empty sequence.
    pub fn query_points(
        &mut self,
        query: &PointQuery,
        display_names: &HashMap<i64, String>,
    ) -> Result<HashMap<String, Vec<PointSample>>> {
        let microseconds = self.microsecond_support()?;

        let (table, value_column, aggregate) = match &query.aggregate {
            Some((function, period)) => {
                (schema::rollup_table_name(function, period)?, "agg_value", true)
            }
            None => (self.tables.data_table.clone(), "value_string", false),
        };
        let (sql, window_params) = query.build_select(&table, value_column, microseconds)?;

        let mut values: HashMap<String, Vec<PointSample>> = HashMap::new();
        for &topic_id in &query.topic_ids {
            let name = display_names
                .get(&topic_id)
                .ok_or(Error::MissingTopicName(topic_id))?;

            let mut params = Vec::with_capacity(window_params.len() + 1);
            params.push(SqlValue::Integer(topic_id));
            params.extend(window_params.iter().cloned());

            debug!("query: {} (topic_id {})", sql, topic_id);
            let rows = self.driver.execute_query(&sql, &params)?;

            let samples = values.entry(name.clone()).or_default();
            for row in rows {
                samples.push(decode_point_row(&row, aggregate)?);
            }
        }
        Ok(values)
    }
}

/// Accumulates point upserts for one batch scope.
///
/// Values are serialized at insert time; nothing reaches the backend until
/// the scope flushes.
#[derive(Debug)]
pub struct PointBatch {
    microseconds: bool,
    rows: Vec<Row>,
}

impl PointBatch {
    /// Add one point. An existing point for the same (topic, timestamp)
    /// will have its value overwritten at flush time.
    pub fn insert(
        &mut self,
        ts: OffsetDateTime,
        topic_id: i64,
        value: &serde_json::Value,
    ) -> Result<()> {
        let ts = capability::format_timestamp(ts, self.microseconds)?;
        let value = serde_json::to_string(value)?;
        self.rows.push(vec![
            SqlValue::Text(ts),
            SqlValue::Integer(topic_id),
            SqlValue::Text(value),
        ]);
        Ok(())
    }

    /// Number of accumulated points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Accumulates metadata upserts for one batch scope.
#[derive(Debug, Default)]
pub struct MetaBatch {
    rows: Vec<Row>,
}

impl MetaBatch {
    /// Add one topic's metadata, replacing any stored value at flush time.
    pub fn insert(&mut self, topic_id: i64, metadata: &TopicMetadata) -> Result<()> {
        let metadata = serde_json::to_string(metadata)?;
        self.rows
            .push(vec![SqlValue::Integer(topic_id), SqlValue::Text(metadata)]);
        Ok(())
    }

    /// Number of accumulated records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// Bulk writes
impl<D: Driver> HistorianStore<D> {
    /// Accumulate points inside `fill` and flush them as one multi-row
    /// upsert when the scope closes.
    ///
    /// If `fill` returns an error nothing is flushed; if the flush itself
    /// fails the error propagates. Either way the caller treats the whole
    /// batch as unpersisted. Retry policy belongs above this layer.
    pub fn bulk_insert_points<F>(&mut self, fill: F) -> Result<()>
    where
        F: FnOnce(&mut PointBatch) -> Result<()>,
    {
        let microseconds = self.microsecond_support()?;
        let mut batch = PointBatch {
            microseconds,
            rows: Vec::new(),
        };
        fill(&mut batch)?;
        if batch.rows.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "INSERT INTO {} (ts, topic_id, value_string) VALUES (?, ?, ?) \
             ON DUPLICATE KEY UPDATE value_string = VALUES(value_string)",
            self.tables.data_table
        );
        debug!("flushing {} point records", batch.rows.len());
        self.driver.execute_batch(&sql, &batch.rows)?;
        Ok(())
    }

    /// Accumulate topic metadata inside `fill` and flush it as one
    /// multi-row upsert when the scope closes.
    pub fn bulk_insert_meta<F>(&mut self, fill: F) -> Result<()>
    where
        F: FnOnce(&mut MetaBatch) -> Result<()>,
    {
        let mut batch = MetaBatch::default();
        fill(&mut batch)?;
        if batch.rows.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "INSERT INTO {} (topic_id, metadata) VALUES (?, ?) \
             ON DUPLICATE KEY UPDATE metadata = VALUES(metadata)",
            self.meta_table()
        );
        debug!("flushing {} metadata records", batch.rows.len());
        self.driver.execute_batch(&sql, &batch.rows)?;
        Ok(())
    }
}

// Aggregation
impl<D: Driver> HistorianStore<D> {
    /// Every aggregation name accepted when creating rollup stores.
    #[must_use]
    pub fn supported_aggregations(&self) -> &'static [&'static str] {
        historian_types::SUPPORTED_AGGREGATIONS
    }

    /// Compute a scalar aggregate and matching-row count over a time window.
    ///
    /// `function` must name one of the five arithmetic functions
    /// (case-insensitive); it is rejected before any query is issued
    /// otherwise. An empty window is a valid zero-valued result, not an
    /// error.
    pub fn collect_aggregate(
        &mut self,
        topic_ids: &[i64],
        function: &str,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> Result<(f64, u64)> {
        let function: AggregateFunction = function.parse()?;
        if topic_ids.is_empty() {
            return Ok((0.0, 0));
        }
        let microseconds = self.microsecond_support()?;

        let mut params: Vec<SqlValue> =
            topic_ids.iter().map(|&id| SqlValue::Integer(id)).collect();
        let topic_filter = if topic_ids.len() > 1 {
            let placeholders = vec!["?"; topic_ids.len()].join(", ");
            format!("topic_id IN ({placeholders})")
        } else {
            "topic_id = ?".to_string()
        };

        let mut conditions = vec![topic_filter];
        if let Some(start) = start {
            conditions.push("ts >= ?".to_string());
            params.push(SqlValue::Text(capability::format_timestamp(
                start,
                microseconds,
            )?));
        }
        if let Some(end) = end {
            conditions.push("ts < ?".to_string());
            params.push(SqlValue::Text(capability::format_timestamp(
                end,
                microseconds,
            )?));
        }

        let sql = format!(
            "SELECT {function}(value_string), count(value_string) FROM {table} WHERE {filter}",
            function = function.as_sql(),
            table = self.tables.data_table,
            filter = conditions.join(" AND "),
        );
        debug!("aggregate query: {}", sql);
        let rows = self.driver.execute_query(&sql, &params)?;

        let Some(row) = rows.first() else {
            return Ok((0.0, 0));
        };
        let count = row.get(1).and_then(SqlValue::as_i64).unwrap_or(0).max(0) as u64;
        let value = match row.first() {
            None | Some(SqlValue::Null) => 0.0,
            Some(value) => value
                .as_f64()
                .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
                .ok_or_else(|| unexpected_row(row))?,
        };
        Ok((value, count))
    }

    /// List every configured aggregate topic with its source topics.
    ///
    /// A fresh install without aggregate tables is a normal state and
    /// yields an empty list.
    pub fn aggregate_topics(&mut self) -> Result<Vec<AggregateTopic>> {
        let sql = format!(
            "SELECT agg_topic_name, agg_type, agg_time_period, metadata \
             FROM {topics} AS t, {meta} AS m WHERE t.agg_topic_id = m.agg_topic_id",
            topics = self.tables.agg_topics_table,
            meta = self.tables.agg_meta_table,
        );
        let rows = match self.driver.execute_query(&sql, &[]) {
            Ok(rows) => rows,
            Err(e) if e.kind == DriverErrorKind::NoSuchTable => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut topics = Vec::with_capacity(rows.len());
        for row in rows {
            let [name, function, period, metadata] = row.as_slice() else {
                return Err(unexpected_row(&row));
            };
            let (Some(name), Some(function), Some(period), Some(metadata)) =
                (name.as_str(), function.as_str(), period.as_str(), metadata.as_str())
            else {
                return Err(unexpected_row(&row));
            };

            let metadata: serde_json::Value = serde_json::from_str(metadata)?;
            let source_topics = metadata
                .get("configured_topics")
                .and_then(serde_json::Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();

            topics.push(AggregateTopic {
                name: name.to_string(),
                function: function.to_string(),
                period: period.to_string(),
                source_topics,
            });
        }
        Ok(topics)
    }

    /// Map (lowercased name, function, period) to aggregate topic id.
    ///
    /// Missing aggregate tables yield an empty map, like
    /// [`aggregate_topics`](Self::aggregate_topics).
    pub fn aggregate_topic_map(&mut self) -> Result<HashMap<(String, String, String), i64>> {
        let sql = format!(
            "SELECT agg_topic_id, agg_topic_name, agg_type, agg_time_period FROM {}",
            self.tables.agg_topics_table
        );
        debug!("loading aggregate topic map from db");
        let rows = match self.driver.execute_query(&sql, &[]) {
            Ok(rows) => rows,
            Err(e) if e.kind == DriverErrorKind::NoSuchTable => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        let mut map = HashMap::new();
        for row in rows {
            let [id, name, function, period] = row.as_slice() else {
                return Err(unexpected_row(&row));
            };
            let (Some(id), Some(name), Some(function), Some(period)) =
                (id.as_i64(), name.as_str(), function.as_str(), period.as_str())
            else {
                return Err(unexpected_row(&row));
            };
            map.insert(
                (name.to_lowercase(), function.to_string(), period.to_string()),
                id,
            );
        }
        Ok(map)
    }
}

fn decode_point_row(row: &Row, aggregate: bool) -> Result<PointSample> {
    let [_, ts, value] = row.as_slice() else {
        return Err(unexpected_row(row));
    };
    let ts = ts.as_str().ok_or_else(|| unexpected_row(row))?;
    let timestamp = capability::parse_timestamp(ts)?;

    let value = if aggregate {
        // rollup values are already numeric; return them as stored
        match value {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Integer(v) => serde_json::Value::from(*v),
            SqlValue::Real(v) => serde_json::Value::from(*v),
            SqlValue::Text(v) => serde_json::Value::from(v.clone()),
        }
    } else {
        let text = value.as_str().ok_or_else(|| unexpected_row(row))?;
        serde_json::from_str(text)?
    };
    Ok(PointSample::new(timestamp, value))
}

fn decode_id_name(row: &Row) -> Result<(i64, String)> {
    let [id, name] = row.as_slice() else {
        return Err(unexpected_row(row));
    };
    match (id.as_i64(), name.as_str()) {
        (Some(id), Some(name)) => Ok((id, name.to_string())),
        _ => Err(unexpected_row(row)),
    }
}

fn unexpected_row(row: &Row) -> Error {
    Error::UnexpectedRow(format!("{row:?}"))
}
