//! Core types for historian time-series data.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Aggregation functions the backend can compute over raw points.
///
/// This is the arithmetic subset accepted by the aggregate-compute path.
/// Rollup table creation additionally accepts the extended names listed in
/// [`SUPPORTED_AGGREGATIONS`], which only ever appear as table-name prefixes
/// and stored labels, never as computed expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    /// Arithmetic mean of the matching values.
    Avg,
    /// Smallest matching value.
    Min,
    /// Largest matching value.
    Max,
    /// Number of matching values.
    Count,
    /// Sum of the matching values.
    Sum,
}

impl AggregateFunction {
    /// All computable functions, in a stable order.
    pub const ALL: [AggregateFunction; 5] = [
        AggregateFunction::Avg,
        AggregateFunction::Min,
        AggregateFunction::Max,
        AggregateFunction::Count,
        AggregateFunction::Sum,
    ];

    /// The SQL spelling of this function.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for AggregateFunction {
    type Err = ParseError;

    /// Parse a function name case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AVG" => Ok(AggregateFunction::Avg),
            "MIN" => Ok(AggregateFunction::Min),
            "MAX" => Ok(AggregateFunction::Max),
            "COUNT" => Ok(AggregateFunction::Count),
            "SUM" => Ok(AggregateFunction::Sum),
            _ => Err(ParseError::UnknownFunction(s.to_string())),
        }
    }
}

/// Every aggregation name accepted when creating rollup stores.
///
/// The compute path is restricted to the five arithmetic functions in
/// [`AggregateFunction`]; the bitwise and statistical names are valid only
/// for naming rollup tables fed by precomputed values.
pub const SUPPORTED_AGGREGATIONS: &[&str] = &[
    "AVG",
    "MIN",
    "MAX",
    "COUNT",
    "SUM",
    "BIT_AND",
    "BIT_OR",
    "BIT_XOR",
    "STD",
    "STDDEV",
    "STDDEV_POP",
    "STDDEV_SAMP",
    "VAR_POP",
    "VAR_SAMP",
    "VARIANCE",
];

/// Ordering of returned point sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOrder {
    /// Oldest points first, ascending by timestamp.
    #[default]
    FirstToLast,
    /// Newest points first, descending by topic then timestamp.
    LastToFirst,
}

impl FromStr for QueryOrder {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FIRST_TO_LAST" => Ok(QueryOrder::FirstToLast),
            "LAST_TO_FIRST" => Ok(QueryOrder::LastToFirst),
            _ => Err(ParseError::UnknownOrder(s.to_string())),
        }
    }
}

/// A configured aggregate topic and the source topics it is computed from.
///
/// The `function` field holds the stored label, which may be any name in
/// [`SUPPORTED_AGGREGATIONS`], so it stays a string rather than an
/// [`AggregateFunction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTopic {
    /// Display name of the aggregate topic.
    pub name: String,
    /// Aggregation function label (e.g. `AVG`).
    pub function: String,
    /// Aggregation period label (e.g. `1h`).
    pub period: String,
    /// Names of the raw topics this aggregate is computed from.
    pub source_topics: Vec<String>,
}
