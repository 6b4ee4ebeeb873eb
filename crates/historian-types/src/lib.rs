//! Shared types for the historian time-series storage adapter.
//!
//! This crate provides the domain types used on both sides of the storage
//! seam: the services deciding what to record and the adapter that owns the
//! relational schema.
//!
//! # Features
//!
//! - Aggregation function enum with case-insensitive parsing
//! - Query ordering for windowed point retrieval
//! - Aggregate-topic descriptors
//! - Parse errors for caller-supplied names
//!
//! # Example
//!
//! ```
//! use historian_types::{AggregateFunction, QueryOrder};
//!
//! let function: AggregateFunction = "avg".parse()?;
//! assert_eq!(function.as_sql(), "AVG");
//!
//! let order: QueryOrder = "LAST_TO_FIRST".parse()?;
//! assert_eq!(order, QueryOrder::LastToFirst);
//! # Ok::<(), historian_types::ParseError>(())
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{AggregateFunction, AggregateTopic, QueryOrder, SUPPORTED_AGGREGATIONS};
