use std::sync::Arc;

/// Structured, in-process event hook for observability.
///
/// This crate is a library and never prints. Callers provide an implementation that forwards
/// these events wherever they want; [`TracingEventListener`] sends them to `tracing`.
pub trait ClientEventListener: std::fmt::Debug + Send + Sync + 'static {
    fn on_event(&self, event: ClientEvent);
}

/// Structured events emitted by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    DatabaseCreated { name: String },
    DatabaseDropped { name: String },

    /// A point was rejected because the buffer was at capacity.
    PointDropped { measurement: String, capacity: usize },

    QueryBuilt { command: String },
    /// A cell was replaced by a zero value during conversion.
    RowCoerced {
        series: String,
        row: usize,
        column: usize,
        details: String,
    },

    WriteSucceeded { points: usize },
    /// The store rejected a batch. `payload` is the JSON dump of the batch.
    WriteRejected {
        points: usize,
        error: String,
        payload: String,
    },
    MarshalFailed { error: String },
}

#[derive(Debug)]
pub struct NoopEventListener;

impl ClientEventListener for NoopEventListener {
    #[inline]
    fn on_event(&self, _event: ClientEvent) {}
}

pub fn noop_event_listener() -> Arc<dyn ClientEventListener> {
    Arc::new(NoopEventListener)
}

/// Forwards every event to the `tracing` crate.
#[derive(Debug, Default)]
pub struct TracingEventListener;

impl ClientEventListener for TracingEventListener {
    fn on_event(&self, event: ClientEvent) {
        match event {
            ClientEvent::DatabaseCreated { name } => tracing::info!(database = %name, "database created"),
            ClientEvent::DatabaseDropped { name } => tracing::info!(database = %name, "database dropped"),
            ClientEvent::PointDropped { measurement, capacity } => {
                tracing::warn!(%measurement, capacity, "point buffer full, point dropped")
            }
            ClientEvent::QueryBuilt { command } => tracing::debug!(query = %command, "query built"),
            ClientEvent::RowCoerced {
                series,
                row,
                column,
                details,
            } => tracing::trace!(%series, row, column, %details, "cell zero-filled"),
            ClientEvent::WriteSucceeded { points } => tracing::debug!(points, "batch written"),
            ClientEvent::WriteRejected { points, error, payload } => {
                tracing::warn!(points, %error, %payload, "batch rejected")
            }
            ClientEvent::MarshalFailed { error } => {
                tracing::warn!(%error, "could not serialize rejected batch")
            }
        }
    }
}

pub fn tracing_event_listener() -> Arc<dyn ClientEventListener> {
    Arc::new(TracingEventListener)
}

/// Counters and histograms via the `metrics` facade.
///
/// Recording is effectively a no-op until the application installs a recorder.
pub mod client_metrics {
    use std::time::Duration;

    // --- metric names ---
    pub const POINTS_BUFFERED: &str = "influx_points_buffered";
    pub const POINTS_DROPPED: &str = "influx_points_dropped";
    pub const POINTS_WRITTEN: &str = "influx_points_written";
    pub const WRITE_FAILURES: &str = "influx_write_failures";
    pub const QUERIES: &str = "influx_queries";
    pub const QUERY_DURATION_SECONDS: &str = "influx_query_duration_seconds";

    #[inline]
    pub fn record_point_buffered() {
        ::metrics::counter!(POINTS_BUFFERED).increment(1);
    }

    #[inline]
    pub fn record_point_dropped() {
        ::metrics::counter!(POINTS_DROPPED).increment(1);
    }

    #[inline]
    pub fn record_write(points: u64) {
        if points > 0 {
            ::metrics::counter!(POINTS_WRITTEN).increment(points);
        }
    }

    #[inline]
    pub fn record_write_failure() {
        ::metrics::counter!(WRITE_FAILURES).increment(1);
    }

    #[inline]
    pub fn record_query(duration: Duration) {
        ::metrics::counter!(QUERIES).increment(1);
        ::metrics::histogram!(QUERY_DURATION_SECONDS).record(duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listeners_accept_every_event() {
        let events = vec![
            ClientEvent::DatabaseCreated { name: "db".to_string() },
            ClientEvent::DatabaseDropped { name: "db".to_string() },
            ClientEvent::PointDropped {
                measurement: "cpu".to_string(),
                capacity: 50,
            },
            ClientEvent::QueryBuilt {
                command: "SELECT \"x\" FROM \"cpu\"".to_string(),
            },
            ClientEvent::RowCoerced {
                series: "cpu".to_string(),
                row: 1,
                column: 2,
                details: "non-numeric value".to_string(),
            },
            ClientEvent::WriteSucceeded { points: 3 },
            ClientEvent::WriteRejected {
                points: 3,
                error: "timeout".to_string(),
                payload: "[]".to_string(),
            },
            ClientEvent::MarshalFailed { error: "bad float".to_string() },
        ];

        let listeners = [noop_event_listener(), tracing_event_listener()];
        for listener in &listeners {
            for event in events.iter().cloned() {
                listener.on_event(event);
            }
        }
    }
}
