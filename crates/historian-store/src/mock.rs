//! Mock driver implementation for testing.
//!
//! This module provides a scripted driver that can be used for unit testing
//! without a running database backend.
//!
//! The [`MockDriver`] implements the [`Driver`] trait, allowing it to be
//! used interchangeably with real drivers in generic code. Query responses
//! are scripted in call order; every executed statement is recorded so tests
//! can assert on the exact SQL text and parameters the store produced.
//!
//! # Features
//!
//! - **Scripted responses**: Queue row sets or errors for successive queries
//! - **Failure injection**: Fail the next statement or batch with a chosen error
//! - **Call recording**: Inspect queries, statements, batches and commits
//!
//! # Example
//!
//! ```
//! use historian_store::{Driver, MockDriver, SqlValue};
//!
//! let mut driver = MockDriver::with_version("8.0.21");
//! let rows = driver.execute_query("SELECT version()", &[]).unwrap();
//! assert_eq!(rows[0][0], SqlValue::Text("8.0.21".to_string()));
//! assert_eq!(driver.queries.len(), 1);
//! ```

use std::collections::VecDeque;

use crate::driver::{Driver, DriverError, Row, SqlValue};

/// A scripted relational driver for testing.
#[derive(Debug, Default)]
pub struct MockDriver {
    responses: VecDeque<Result<Vec<Row>, DriverError>>,
    statement_error: Option<DriverError>,
    batch_error: Option<DriverError>,
    /// Every query executed, in order: statement text and bound parameters.
    pub queries: Vec<(String, Vec<SqlValue>)>,
    /// Every non-query statement executed: text, parameters, commit flag.
    pub statements: Vec<(String, Vec<SqlValue>, bool)>,
    /// Every batch executed: statement text and parameter rows.
    pub batches: Vec<(String, Vec<Row>)>,
    /// Number of explicit commits.
    pub commits: usize,
}

impl MockDriver {
    /// Create a mock driver with no scripted responses.
    ///
    /// Queries with no scripted response return an empty row set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock driver whose first query answers the version probe.
    pub fn with_version(version: &str) -> Self {
        let mut driver = Self::new();
        driver.push_rows(vec![vec![SqlValue::Text(version.to_string())]]);
        driver
    }

    /// Queue a row set for the next unanswered query.
    pub fn push_rows(&mut self, rows: Vec<Row>) {
        self.responses.push_back(Ok(rows));
    }

    /// Queue an error for the next unanswered query.
    pub fn push_error(&mut self, error: DriverError) {
        self.responses.push_back(Err(error));
    }

    /// Fail the next executed statement with the given error.
    pub fn fail_next_statement(&mut self, error: DriverError) {
        self.statement_error = Some(error);
    }

    /// Fail the next executed batch with the given error.
    pub fn fail_next_batch(&mut self, error: DriverError) {
        self.batch_error = Some(error);
    }
}

impl Driver for MockDriver {
    fn execute_query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DriverError> {
        self.queries.push((sql.to_string(), params.to_vec()));
        self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn execute_statement(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        commit: bool,
    ) -> Result<u64, DriverError> {
        self.statements
            .push((sql.to_string(), params.to_vec(), commit));
        if let Some(error) = self.statement_error.take() {
            return Err(error);
        }
        if commit {
            self.commits += 1;
        }
        Ok(1)
    }

    fn execute_batch(&mut self, sql: &str, rows: &[Row]) -> Result<u64, DriverError> {
        self.batches.push((sql.to_string(), rows.to_vec()));
        if let Some(error) = self.batch_error.take() {
            return Err(error);
        }
        Ok(rows.len() as u64)
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscripted_queries_return_empty() {
        let mut driver = MockDriver::new();
        let rows = driver.execute_query("SELECT 1", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_responses_are_consumed_in_order() {
        let mut driver = MockDriver::new();
        driver.push_rows(vec![vec![SqlValue::Integer(1)]]);
        driver.push_error(DriverError::no_such_table("missing"));

        assert_eq!(
            driver.execute_query("SELECT 1", &[]).unwrap(),
            vec![vec![SqlValue::Integer(1)]]
        );
        assert!(driver.execute_query("SELECT 2", &[]).is_err());
        // queue exhausted, back to empty
        assert!(driver.execute_query("SELECT 3", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_statement_failure_injection_is_one_shot() {
        let mut driver = MockDriver::new();
        driver.fail_next_statement(DriverError::access_denied("denied"));

        assert!(driver.execute_statement("CREATE TABLE t (x INT)", &[], false).is_err());
        assert!(driver.execute_statement("CREATE TABLE t (x INT)", &[], false).is_ok());
    }

    #[test]
    fn test_recording() {
        let mut driver = MockDriver::new();
        driver
            .execute_statement("DELETE FROM t", &[SqlValue::Integer(1)], true)
            .unwrap();
        driver
            .execute_batch("INSERT INTO t VALUES(?)", &[vec![SqlValue::Integer(2)]])
            .unwrap();
        driver.commit().unwrap();

        assert_eq!(driver.statements.len(), 1);
        assert!(driver.statements[0].2);
        assert_eq!(driver.batches.len(), 1);
        // one from the committing statement, one explicit
        assert_eq!(driver.commits, 2);
    }
}
