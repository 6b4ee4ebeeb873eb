//! The relational driver seam.
//!
//! The store is handed a ready driver and never opens, closes, pools, or
//! retries the underlying connection. Every operation is a blocking round
//! trip on the one handle; statement text uses positional `?` placeholders.
//!
//! Timestamps cross this seam as [`SqlValue::Text`] in the backend's naive
//! datetime form (`YYYY-MM-DD HH:MM:SS[.ffffff]`); the store reinterprets
//! them as UTC.

use core::fmt;

use thiserror::Error;

/// A single SQL parameter or result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Integer column or parameter.
    Integer(i64),
    /// Floating-point column or parameter.
    Real(f64),
    /// Text column or parameter.
    Text(String),
}

impl SqlValue {
    /// The contained integer, coercing from a real value if needed.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            SqlValue::Real(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// The contained number as a double, coercing from an integer if needed.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(v) => Some(*v as f64),
            SqlValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained text, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

/// One result row.
pub type Row = Vec<SqlValue>;

/// Classification of backend failures the store reacts to.
///
/// Anything that is not one of the two recognized conditions is `Other` and
/// propagates unchanged to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// The configured user lacks the privilege for the statement.
    AccessDenied,
    /// The referenced table does not exist.
    NoSuchTable,
    /// Any other backend failure.
    Other,
}

impl fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverErrorKind::AccessDenied => write!(f, "access denied"),
            DriverErrorKind::NoSuchTable => write!(f, "no such table"),
            DriverErrorKind::Other => write!(f, "backend error"),
        }
    }
}

/// A failure reported by the relational driver.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct DriverError {
    /// Classified failure condition.
    pub kind: DriverErrorKind,
    /// The backend's own diagnostic text.
    pub message: String,
}

impl DriverError {
    /// Create an access-denied error.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::AccessDenied,
            message: message.into(),
        }
    }

    /// Create a missing-table error.
    pub fn no_such_table(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::NoSuchTable,
            message: message.into(),
        }
    }

    /// Create an unclassified backend error.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Other,
            message: message.into(),
        }
    }
}

/// Capability consumed by the store: parameterized statement execution over
/// one already-open connection.
///
/// Implementations map their backend's error codes onto
/// [`DriverErrorKind`]; only access-denied and missing-table conditions need
/// to be recognized, everything else is [`DriverErrorKind::Other`].
pub trait Driver {
    /// Execute a SELECT-shaped statement and return all rows.
    fn execute_query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DriverError>;

    /// Execute a non-query statement, optionally committing afterwards.
    /// Returns the affected-row count.
    fn execute_statement(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        commit: bool,
    ) -> Result<u64, DriverError>;

    /// Execute one statement once per parameter row (the backend's
    /// "execute many"). Returns the affected-row count.
    fn execute_batch(&mut self, sql: &str, rows: &[Row]) -> Result<u64, DriverError>;

    /// Commit the current transaction.
    fn commit(&mut self) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_coercions() {
        assert_eq!(SqlValue::Integer(7).as_i64(), Some(7));
        assert_eq!(SqlValue::Real(7.9).as_i64(), Some(7));
        assert_eq!(SqlValue::Integer(7).as_f64(), Some(7.0));
        assert_eq!(SqlValue::Text("x".into()).as_i64(), None);
        assert_eq!(SqlValue::Text("x".into()).as_str(), Some("x"));
        assert_eq!(SqlValue::Null.as_f64(), None);
    }

    #[test]
    fn test_sql_value_from_impls() {
        assert_eq!(SqlValue::from(3i64), SqlValue::Integer(3));
        assert_eq!(SqlValue::from(1.5f64), SqlValue::Real(1.5));
        assert_eq!(SqlValue::from("topic"), SqlValue::Text("topic".into()));
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::access_denied("CREATE command denied to user");
        assert_eq!(err.kind, DriverErrorKind::AccessDenied);
        assert!(err.to_string().contains("access denied"));
        assert!(err.to_string().contains("CREATE command denied"));

        let err = DriverError::no_such_table("table 'x.avg_1h' doesn't exist");
        assert_eq!(err.kind, DriverErrorKind::NoSuchTable);

        let err = DriverError::other("lock wait timeout");
        assert_eq!(err.kind, DriverErrorKind::Other);
    }
}
