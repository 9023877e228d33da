//! The transport seam: what the client needs from a connection to the store, and the raw
//! result shape it gets back.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{ClientError, Result};
use crate::types::{Consistency, TagSet, TimeSeriesPoint};

/// One named, tagged group of rows sharing a column schema.
///
/// Column 0 is always the timestamp.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeriesBlock {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

/// Series blocks returned for a single statement.
pub type RawResult = Vec<SeriesBlock>;

/// Per-statement entry of a query response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub statement_id: Option<u64>,
    #[serde(default)]
    pub series: Vec<SeriesBlock>,
    #[serde(default)]
    pub error: Option<String>,
}

/// JSON body returned by the store's query endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<StatementResult>,
    #[serde(default)]
    pub error: Option<String>,
}

impl QueryResponse {
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Series of the first statement. Any error reported by the store is surfaced as
    /// [`ClientError::Database`].
    pub fn into_raw_result(self) -> Result<RawResult> {
        if let Some(err) = self.error {
            return Err(ClientError::Database(err));
        }
        match self.results.into_iter().next() {
            Some(StatementResult { error: Some(err), .. }) => Err(ClientError::Database(err)),
            Some(statement) => Ok(statement.series),
            None => Ok(RawResult::new()),
        }
    }
}

/// Connection to a time-series store.
///
/// Calls are synchronous request/response; timeouts and cancellation belong to the
/// implementation. Errors are surfaced once and never retried by the client.
pub trait QueryExecutor {
    fn create_database(&self, name: &str) -> Result<()>;

    fn drop_database(&self, name: &str) -> Result<()>;

    fn list_databases(&self) -> Result<Vec<String>>;

    /// Runs `command` against `database` and returns the series of the first statement.
    fn query(&self, command: &str, database: &str) -> Result<RawResult>;

    fn write(
        &self,
        points: &[TimeSeriesPoint],
        database: &str,
        retention_policy: &str,
        consistency: Consistency,
    ) -> Result<()>;

    /// Round-trip latency and server version.
    fn ping(&self) -> Result<(Duration, String)>;
}
