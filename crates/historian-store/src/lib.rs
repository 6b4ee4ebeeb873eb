//! Relational storage adapter for historian time-series telemetry.
//!
//! This crate owns the on-disk schema, query construction, and the
//! backend-capability handling for a historian service: topic readings are
//! persisted as (topic, timestamp, value) rows with at-most-one-row-per-pair
//! semantics, and read back through windowed, ordered, paginated queries or
//! scalar aggregate rollups.
//!
//! The database connection itself is out of scope: the store is handed an
//! already-open [`Driver`] and never pools, retries, or reconnects.
//!
//! # Features
//!
//! - One-time schema creation with backend-capability-gated precision
//! - Legacy/current metadata-layout detection without migration
//! - Case-insensitive topic registry with preserved display casing
//! - Windowed point queries with half-open bounds and per-topic limits
//! - Scoped batch upserts for points and metadata
//! - Aggregate rollup tables and scalar aggregate computation
//!
//! # Example
//!
//! ```
//! use historian_store::{HistorianStore, MockDriver, PointQuery, StoreConfig};
//! use std::collections::HashMap;
//!
//! let driver = MockDriver::with_version("8.0.21");
//! let mut store = HistorianStore::new(driver, StoreConfig::default())?;
//! store.setup_historian_tables()?;
//!
//! let names = HashMap::from([(1, "outside/temp".to_string())]);
//! let values = store.query_points(&PointQuery::new(vec![1]).count(10), &names)?;
//! assert!(values["outside/temp"].is_empty());
//! # Ok::<(), historian_store::Error>(())
//! ```

mod capability;
mod config;
mod driver;
mod error;
mod mock;
mod models;
mod queries;
mod schema;
mod store;

pub use config::{StoreConfig, TableNames};
pub use driver::{Driver, DriverError, DriverErrorKind, Row, SqlValue};
pub use error::{Error, Result};
pub use mock::MockDriver;
pub use models::{PointSample, TopicMap, TopicMetadata};
pub use queries::{DEFAULT_COUNT, PointQuery};
pub use schema::MetadataStore;
pub use store::{HistorianStore, MetaBatch, PointBatch};
