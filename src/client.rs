use std::time::{Duration, Instant};

use crate::buffer::PointBuffer;
use crate::config::ClientConfig;
use crate::convert::ResultConverter;
use crate::error::{ClientError, Result};
use crate::executor::QueryExecutor;
use crate::query::{FilterSet, QueryBuilder};
use crate::stats::{build_stats, DataStats};
use crate::telemetry::{client_metrics, ClientEvent};
use crate::types::{DataSet, FieldSet, Precision, TagSet, TextSet, TimeSeriesPoint, Timestamp};

/// Command used by [`InfluxClient::list_measurement`].
pub const SHOW_MEASUREMENTS: &str = "SHOW MEASUREMENTS";

/// Main entry point: buffers points for batched writes, runs reads through the query builder
/// and the result converter, and summarizes results.
///
/// The client holds no lock and is meant to be driven by a single thread. Failed writes and
/// queries are surfaced once; retrying is up to the caller.
#[derive(Debug)]
pub struct InfluxClient<E: QueryExecutor> {
    executor: E,
    buffer: PointBuffer,
    converter: ResultConverter,
    config: ClientConfig,
}

impl<E: QueryExecutor> InfluxClient<E> {
    /// Creates a client over `executor` with the given configuration.
    ///
    /// # Errors
    /// Returns [`ClientError::ConfigError`] if the configuration is invalid.
    pub fn with_config(executor: E, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(executor, config))
    }

    /// Creates a client with default configuration targeting `database`.
    pub fn new(executor: E, database: &str) -> Self {
        Self::from_parts(executor, ClientConfig::default().with_database(database))
    }

    fn from_parts(executor: E, config: ClientConfig) -> Self {
        let converter = ResultConverter::new(config.parse_policy).with_event_listener(config.event_listener.clone());
        Self {
            executor,
            buffer: PointBuffer::new(config.buffer_capacity),
            converter,
            config,
        }
    }

    pub fn get_config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn emit(&self, event: ClientEvent) {
        self.config.event_listener.on_event(event);
    }

    // --- database management ---

    pub fn create_db(&self, name: &str) -> Result<()> {
        self.executor.create_database(name)?;
        self.emit(ClientEvent::DatabaseCreated { name: name.to_string() });
        Ok(())
    }

    pub fn drop_db(&self, name: &str) -> Result<()> {
        self.executor.drop_database(name)?;
        self.emit(ClientEvent::DatabaseDropped { name: name.to_string() });
        Ok(())
    }

    pub fn show_db(&self) -> Result<Vec<String>> {
        self.executor.list_databases()
    }

    /// Whether `name` is among the server's databases. Listing errors are returned, not
    /// folded into `false`.
    pub fn exist_db(&self, name: &str) -> Result<bool> {
        Ok(self.show_db()?.iter().any(|db| db == name))
    }

    /// Round-trip latency and server version.
    pub fn ping(&self) -> Result<(Duration, String)> {
        self.executor.ping()
    }

    // --- write path ---

    /// Buffers a point with the configured default precision.
    ///
    /// # Errors
    /// * [`ClientError::InvalidPoint`] for an empty measurement or field map.
    /// * [`ClientError::BufferFull`] when the buffer is at capacity. The point is dropped, the
    ///   buffer is unchanged and a [`ClientEvent::PointDropped`] event is emitted. This is not
    ///   fatal: flush and keep going.
    pub fn add_point(&mut self, measurement: &str, timestamp: Timestamp, fields: FieldSet, tags: TagSet) -> Result<()> {
        let precision = self.config.default_precision;
        self.add_precise_point(measurement, timestamp, fields, tags, precision)
    }

    /// Buffers a point with an explicit timestamp precision.
    pub fn add_precise_point(
        &mut self,
        measurement: &str,
        timestamp: Timestamp,
        fields: FieldSet,
        tags: TagSet,
        precision: Precision,
    ) -> Result<()> {
        let point = TimeSeriesPoint::new(measurement, timestamp, fields, tags, precision)?;
        match self.buffer.push(point) {
            Ok(()) => {
                client_metrics::record_point_buffered();
                Ok(())
            }
            Err(e @ ClientError::BufferFull { .. }) => {
                client_metrics::record_point_dropped();
                self.emit(ClientEvent::PointDropped {
                    measurement: measurement.to_string(),
                    capacity: self.buffer.capacity(),
                });
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Writes every buffered point in one batch and clears the buffer on success.
    ///
    /// On failure the buffer is left intact so the caller can retry, a JSON dump of the batch
    /// is attached to a [`ClientEvent::WriteRejected`] event, and the executor's error is
    /// returned unchanged.
    pub fn write_points(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let batch = self.labelled_batch();
        let count = batch.len();
        match self.executor.write(
            &batch,
            &self.config.database,
            &self.config.retention_policy,
            self.config.consistency,
        ) {
            Ok(()) => {
                self.buffer.clear();
                client_metrics::record_write(count as u64);
                self.emit(ClientEvent::WriteSucceeded { points: count });
                Ok(())
            }
            Err(e) => {
                client_metrics::record_write_failure();
                match serde_json::to_string(&batch) {
                    Ok(payload) => self.emit(ClientEvent::WriteRejected {
                        points: count,
                        error: e.to_string(),
                        payload,
                    }),
                    Err(marshal) => self.emit(ClientEvent::MarshalFailed {
                        error: marshal.to_string(),
                    }),
                }
                Err(e)
            }
        }
    }

    fn labelled_batch(&self) -> Vec<TimeSeriesPoint> {
        let points = self.buffer.drain();
        match self.config.label.as_deref() {
            Some(label) if !label.is_empty() => points
                .iter()
                .map(|p| TimeSeriesPoint {
                    measurement: format!("{}_{}", label, p.measurement),
                    ..p.clone()
                })
                .collect(),
            _ => points.to_vec(),
        }
    }

    pub fn points_count(&self) -> usize {
        self.buffer.count()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Discards buffered points without writing them.
    pub fn clear_points(&mut self) {
        self.buffer.clear();
    }

    /// Points currently waiting to be written.
    pub fn pending_points(&self) -> &[TimeSeriesPoint] {
        self.buffer.drain()
    }

    // --- read path ---

    /// Queries `fields` of `measurement` and converts the result, one [`DataSet`] per
    /// returned series (one per group when `group_by` is set).
    ///
    /// `from` and `to` are pre-formatted timestamp literals; empty means unbounded.
    /// `aggregate` is an optional function wrapped around each field (e.g. `"mean"`).
    #[allow(clippy::too_many_arguments)]
    pub fn read_points<S: AsRef<str>>(
        &self,
        fields: &[S],
        filters: &FilterSet,
        group_by: &str,
        measurement: &str,
        from: &str,
        to: &str,
        aggregate: &str,
    ) -> Result<Vec<DataSet>> {
        let command = QueryBuilder::new()
            .select(fields)
            .from_measurement(measurement)
            .since(from)
            .until(to)
            .filters(filters.clone())
            .group_by(group_by)
            .aggregate(aggregate)
            .build();
        self.emit(ClientEvent::QueryBuilt { command: command.clone() });

        let raw = self.run_query(&command)?;
        self.converter.to_datasets(&raw)
    }

    /// Names of all measurements in the configured database.
    pub fn list_measurement(&self) -> Result<Option<TextSet>> {
        let raw = self.run_query(SHOW_MEASUREMENTS)?;
        Ok(self.converter.to_textset(&raw))
    }

    fn run_query(&self, command: &str) -> Result<crate::executor::RawResult> {
        let started = Instant::now();
        let raw = self.executor.query(command, &self.config.database);
        client_metrics::record_query(started.elapsed());
        raw
    }

    /// Summarizes every field of `datasets`. The data sets are left untouched.
    pub fn build_stats(&self, datasets: &[DataSet]) -> Result<DataStats> {
        build_stats(datasets)
    }
}
