#![doc = include_str!("../README.md")]
// Declare modules
pub mod buffer;
pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod executor;
pub mod line_protocol;
pub mod query;
pub mod stats;
pub mod telemetry;
pub mod types;

/// Main entry point for buffering, querying and summarizing.
pub use crate::client::InfluxClient;
/// Configuration options for the client.
pub use crate::config::ClientConfig;
/// Result conversion and its error policy.
pub use crate::convert::{convert_to_dataset, convert_to_textset, ParsePolicy, ResultConverter};
/// Error type for client operations.
pub use crate::error::{ClientError, Result};
/// The transport seam and the raw result shape.
pub use crate::executor::{QueryExecutor, QueryResponse, RawResult, SeriesBlock};
/// Tag predicates and the command builder.
pub use crate::query::{build_query, Filter, FilterMode, FilterSet, QueryBuilder};
/// Statistics engine.
pub use crate::stats::{build_stats, DataStat, DataStats, StatField, StatName};
/// Structured event hook for observability.
pub use crate::telemetry::{ClientEvent, ClientEventListener};
/// Point and result value types.
pub use crate::types::{
    Consistency, DataSet, FieldSet, FieldValue, Precision, TagSet, TextSet, TimeSeriesPoint, Timestamp,
};
/// Bounded point buffer.
pub use crate::buffer::PointBuffer;
