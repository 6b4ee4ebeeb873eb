//! Query builder for windowed point retrieval.
//!
//! [`PointQuery`] follows the builder pattern for ergonomic construction and
//! is executed by
//! [`HistorianStore::query_points`](crate::HistorianStore::query_points).
//!
//! # Example
//!
//! ```
//! use historian_store::PointQuery;
//! use historian_types::QueryOrder;
//! use time::macros::datetime;
//!
//! // One hour of points for two topics, newest first, second page of 50
//! let query = PointQuery::new(vec![1, 2])
//!     .start(datetime!(2024-01-01 00:00:00 UTC))
//!     .end(datetime!(2024-01-01 01:00:00 UTC))
//!     .count(50)
//!     .skip(50)
//!     .order(QueryOrder::LastToFirst);
//! ```

use historian_types::QueryOrder;
use time::OffsetDateTime;

use crate::capability::format_timestamp;
use crate::driver::SqlValue;
use crate::error::Result;

/// Rows returned per topic when no count is requested.
pub const DEFAULT_COUNT: usize = 100;

/// A windowed, ordered, paginated query over one or more topics.
///
/// Window semantics: when `start == end` the filter is an exact-timestamp
/// match; otherwise `start` is inclusive and `end` is exclusive. The count
/// limit and skip offset apply per topic, not across the whole result.
#[derive(Debug, Default, Clone)]
pub struct PointQuery {
    /// Topic ids to query, in the order results should be assembled.
    pub topic_ids: Vec<i64>,
    /// Inclusive window start.
    pub start: Option<OffsetDateTime>,
    /// Exclusive window end.
    pub end: Option<OffsetDateTime>,
    /// Rows to skip per topic. Emitted only when greater than zero.
    pub skip: usize,
    /// Maximum rows per topic. Defaults to [`DEFAULT_COUNT`].
    pub count: Option<usize>,
    /// Read from the `<function>_<period>` rollup table instead of the
    /// points table.
    pub aggregate: Option<(String, String)>,
    /// Result ordering.
    pub order: QueryOrder,
}

impl PointQuery {
    /// Create a query over the given topic ids.
    pub fn new(topic_ids: Vec<i64>) -> Self {
        Self {
            topic_ids,
            ..Default::default()
        }
    }

    /// Include only points at or after this instant.
    pub fn start(mut self, start: OffsetDateTime) -> Self {
        self.start = Some(start);
        self
    }

    /// Include only points strictly before this instant.
    ///
    /// Setting `end` equal to `start` turns the window into an
    /// exact-timestamp match.
    pub fn end(mut self, end: OffsetDateTime) -> Self {
        self.end = Some(end);
        self
    }

    /// Skip the first N rows of each topic's result.
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Cap each topic's result at N rows.
    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Read from the rollup table for this function and period.
    pub fn aggregate(mut self, function: impl Into<String>, period: impl Into<String>) -> Self {
        self.aggregate = Some((function.into(), period.into()));
        self
    }

    /// Set the result ordering.
    pub fn order(mut self, order: QueryOrder) -> Self {
        self.order = order;
        self
    }

    /// Build the per-topic SELECT and its trailing parameters.
    ///
    /// The statement's first placeholder is the topic id, bound separately
    /// for each topic in the fan-out; the returned parameters are everything
    /// after it (window bounds, limit, offset).
    pub(crate) fn build_select(
        &self,
        table: &str,
        value_column: &str,
        microseconds: bool,
    ) -> Result<(String, Vec<SqlValue>)> {
        let mut conditions = vec!["topic_id = ?"];
        let mut params: Vec<SqlValue> = Vec::new();

        // Bounds are normalized to UTC and truncated to the backend's
        // precision before the equality comparison, so two instants that
        // collapse to the same second compare equal without support.
        let start = self
            .start
            .map(|ts| format_timestamp(ts, microseconds))
            .transpose()?;
        let end = self
            .end
            .map(|ts| format_timestamp(ts, microseconds))
            .transpose()?;

        match (start, end) {
            (Some(start), Some(end)) if start == end => {
                conditions.push("ts = ?");
                params.push(SqlValue::Text(start));
            }
            (start, end) => {
                if let Some(start) = start {
                    conditions.push("ts >= ?");
                    params.push(SqlValue::Text(start));
                }
                if let Some(end) = end {
                    conditions.push("ts < ?");
                    params.push(SqlValue::Text(end));
                }
            }
        }

        let order_by = match self.order {
            QueryOrder::FirstToLast => "ORDER BY ts ASC",
            QueryOrder::LastToFirst => "ORDER BY topic_id DESC, ts DESC",
        };

        // An offset without a limit is meaningless, so the limit is always
        // bound and the offset only when rows are actually skipped.
        let mut sql = format!(
            "SELECT topic_id, ts, {value_column} FROM {table} WHERE {conditions} {order_by} LIMIT ?",
            conditions = conditions.join(" AND "),
        );
        params.push(SqlValue::Integer(self.count.unwrap_or(DEFAULT_COUNT) as i64));

        if self.skip > 0 {
            sql.push_str(" OFFSET ?");
            params.push(SqlValue::Integer(self.skip as i64));
        }

        Ok((sql, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_new_defaults() {
        let query = PointQuery::new(vec![1, 2]);
        assert_eq!(query.topic_ids, vec![1, 2]);
        assert!(query.start.is_none());
        assert!(query.end.is_none());
        assert_eq!(query.skip, 0);
        assert!(query.count.is_none());
        assert!(query.aggregate.is_none());
        assert_eq!(query.order, QueryOrder::FirstToLast);
    }

    #[test]
    fn test_build_select_minimal() {
        let (sql, params) = PointQuery::new(vec![1])
            .build_select("data", "value_string", true)
            .unwrap();

        assert_eq!(
            sql,
            "SELECT topic_id, ts, value_string FROM data \
             WHERE topic_id = ? ORDER BY ts ASC LIMIT ?"
        );
        // default limit, no offset
        assert_eq!(params, vec![SqlValue::Integer(100)]);
    }

    #[test]
    fn test_build_select_half_open_window() {
        let (sql, params) = PointQuery::new(vec![1])
            .start(datetime!(2024-01-01 00:00:00 UTC))
            .end(datetime!(2024-01-01 00:10:00 UTC))
            .build_select("data", "value_string", true)
            .unwrap();

        assert!(sql.contains("ts >= ? AND ts < ?"));
        assert_eq!(
            params,
            vec![
                SqlValue::Text("2024-01-01 00:00:00.000000".to_string()),
                SqlValue::Text("2024-01-01 00:10:00.000000".to_string()),
                SqlValue::Integer(100),
            ]
        );
    }

    #[test]
    fn test_build_select_equal_bounds_is_exact_match() {
        let ts = datetime!(2024-01-01 00:05:00 UTC);
        let (sql, params) = PointQuery::new(vec![1])
            .start(ts)
            .end(ts)
            .build_select("data", "value_string", true)
            .unwrap();

        assert!(sql.contains("ts = ?"));
        assert!(!sql.contains("ts >= ?"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_build_select_bounds_collapse_after_truncation() {
        // Distinct only in the fractional part; without sub-second support
        // they truncate to the same second and become an exact match.
        let (sql, _) = PointQuery::new(vec![1])
            .start(datetime!(2024-01-01 00:05:00.100 UTC))
            .end(datetime!(2024-01-01 00:05:00.900 UTC))
            .build_select("data", "value_string", false)
            .unwrap();
        assert!(sql.contains("ts = ?"));

        // With support they stay a half-open window.
        let (sql, _) = PointQuery::new(vec![1])
            .start(datetime!(2024-01-01 00:05:00.100 UTC))
            .end(datetime!(2024-01-01 00:05:00.900 UTC))
            .build_select("data", "value_string", true)
            .unwrap();
        assert!(sql.contains("ts >= ? AND ts < ?"));
    }

    #[test]
    fn test_build_select_start_only_and_end_only() {
        let (sql, _) = PointQuery::new(vec![1])
            .start(datetime!(2024-01-01 00:00:00 UTC))
            .build_select("data", "value_string", true)
            .unwrap();
        assert!(sql.contains("ts >= ?"));
        assert!(!sql.contains("ts < ?"));

        let (sql, _) = PointQuery::new(vec![1])
            .end(datetime!(2024-01-01 00:00:00 UTC))
            .build_select("data", "value_string", true)
            .unwrap();
        assert!(sql.contains("ts < ?"));
        assert!(!sql.contains("ts >= ?"));
    }

    #[test]
    fn test_build_select_bounds_normalized_to_utc() {
        let (_, params) = PointQuery::new(vec![1])
            .start(datetime!(2024-01-01 05:00:00 +05:00))
            .build_select("data", "value_string", false)
            .unwrap();
        assert_eq!(
            params[0],
            SqlValue::Text("2024-01-01 00:00:00".to_string())
        );
    }

    #[test]
    fn test_build_select_orderings() {
        let (sql, _) = PointQuery::new(vec![1])
            .order(QueryOrder::FirstToLast)
            .build_select("data", "value_string", true)
            .unwrap();
        assert!(sql.contains("ORDER BY ts ASC"));

        let (sql, _) = PointQuery::new(vec![1])
            .order(QueryOrder::LastToFirst)
            .build_select("data", "value_string", true)
            .unwrap();
        assert!(sql.contains("ORDER BY topic_id DESC, ts DESC"));
    }

    #[test]
    fn test_build_select_pagination() {
        let (sql, params) = PointQuery::new(vec![1])
            .count(1)
            .skip(1)
            .build_select("data", "value_string", true)
            .unwrap();

        assert!(sql.ends_with("LIMIT ? OFFSET ?"));
        assert_eq!(
            params,
            vec![SqlValue::Integer(1), SqlValue::Integer(1)]
        );
    }

    #[test]
    fn test_build_select_no_offset_when_skip_zero() {
        let (sql, params) = PointQuery::new(vec![1])
            .count(25)
            .build_select("data", "value_string", true)
            .unwrap();

        assert!(!sql.contains("OFFSET"));
        assert_eq!(params, vec![SqlValue::Integer(25)]);
    }

    #[test]
    fn test_build_select_against_rollup_table() {
        let (sql, _) = PointQuery::new(vec![1])
            .aggregate("avg", "1h")
            .build_select("avg_1h", "agg_value", true)
            .unwrap();

        assert!(sql.contains("SELECT topic_id, ts, agg_value FROM avg_1h"));
    }
}
