//! Conversion of raw query results into [`DataSet`] and [`TextSet`] values.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::error::{ClientError, Result};
use crate::executor::{RawResult, SeriesBlock};
use crate::telemetry::{noop_event_listener, ClientEvent, ClientEventListener};
use crate::types::{DataSet, Precision, TextSet, Timestamp};

/// What to do when a single cell cannot be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsePolicy {
    /// Substitute `0.0` (or the Unix epoch for timestamps) and keep going.
    #[default]
    ZeroFill,
    /// Fail the whole conversion with [`ClientError::MalformedRow`].
    Strict,
}

/// Turns series blocks into typed values.
#[derive(Debug, Clone)]
pub struct ResultConverter {
    policy: ParsePolicy,
    epoch: Precision,
    events: Arc<dyn ClientEventListener>,
}

impl Default for ResultConverter {
    fn default() -> Self {
        Self::new(ParsePolicy::default())
    }
}

impl ResultConverter {
    pub fn new(policy: ParsePolicy) -> Self {
        Self {
            policy,
            epoch: Precision::Nanoseconds,
            events: noop_event_listener(),
        }
    }

    /// Unit used to interpret integer timestamps (results queried with `epoch=...`).
    pub fn with_epoch(mut self, epoch: Precision) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn with_event_listener(mut self, events: Arc<dyn ClientEventListener>) -> Self {
        self.events = events;
        self
    }

    pub fn policy(&self) -> ParsePolicy {
        self.policy
    }

    /// Builds one [`DataSet`] per non-empty series block.
    ///
    /// Column 0 becomes the timestamps, every other column a numeric field. `null` cells are
    /// zero-filled under every policy.
    pub fn to_datasets(&self, result: &RawResult) -> Result<Vec<DataSet>> {
        let mut datasets = Vec::with_capacity(result.len());
        for block in result {
            if block.values.is_empty() {
                continue;
            }
            datasets.push(self.block_to_dataset(block)?);
        }
        Ok(datasets)
    }

    fn block_to_dataset(&self, block: &SeriesBlock) -> Result<DataSet> {
        let field_names = block.columns.get(1..).unwrap_or_default();
        let mut ds = DataSet::with_fields(&block.name, block.tags.clone(), block.values.len(), field_names);

        for (i, row) in block.values.iter().enumerate() {
            ds.timestamps[i] = match row.first().map(|cell| parse_timestamp(cell, self.epoch)) {
                Some(Ok(ts)) => ts,
                Some(Err(details)) => self.coerce(block, i, 0, details, Timestamp::default())?,
                None => self.coerce(block, i, 0, "empty row".to_string(), Timestamp::default())?,
            };

            for (j, field) in field_names.iter().enumerate() {
                let column = j + 1;
                let value = match row.get(column) {
                    None | Some(JsonValue::Null) => 0.0,
                    Some(cell) => match parse_number(cell) {
                        Ok(v) => v,
                        Err(details) => self.coerce(block, i, column, details, 0.0)?,
                    },
                };
                if let Some(values) = ds.series.get_mut(field) {
                    values[i] = value;
                }
            }
        }

        Ok(ds)
    }

    fn coerce<T>(&self, block: &SeriesBlock, row: usize, column: usize, details: String, fallback: T) -> Result<T> {
        match self.policy {
            ParsePolicy::Strict => Err(ClientError::MalformedRow {
                series: block.name.clone(),
                row,
                column,
                details,
            }),
            ParsePolicy::ZeroFill => {
                self.events.on_event(ClientEvent::RowCoerced {
                    series: block.name.clone(),
                    row,
                    column,
                    details,
                });
                Ok(fallback)
            }
        }
    }

    /// Flattens every cell of the first series block into one list, discarding rows.
    ///
    /// Returns `None` when there is no series at all.
    pub fn to_textset(&self, result: &RawResult) -> Option<TextSet> {
        let block = result.first()?;
        let values = block
            .values
            .iter()
            .flatten()
            .map(|cell| match cell {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();

        Some(TextSet {
            name: block.name.clone(),
            tags: block.tags.clone(),
            values,
        })
    }
}

/// Converts with the default zero-fill policy. Never fails.
pub fn convert_to_dataset(result: &RawResult) -> Vec<DataSet> {
    // ZeroFill never produces an error.
    ResultConverter::default().to_datasets(result).unwrap_or_default()
}

pub fn convert_to_textset(result: &RawResult) -> Option<TextSet> {
    ResultConverter::default().to_textset(result)
}

fn parse_timestamp(cell: &JsonValue, epoch: Precision) -> std::result::Result<Timestamp, String> {
    match cell {
        JsonValue::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("invalid timestamp {:?}: {}", s, e)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(v) => epoch.decode(v).ok_or_else(|| format!("timestamp {} out of range", n)),
            None => Err(format!("non-integer timestamp {}", n)),
        },
        other => Err(format!("unsupported timestamp value {}", other)),
    }
}

fn parse_number(cell: &JsonValue) -> std::result::Result<f64, String> {
    match cell {
        JsonValue::Number(n) => n.as_f64().ok_or_else(|| format!("number {} not representable as f64", n)),
        // "NaN" and "inf" parse as f64 but are not data.
        JsonValue::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("non-numeric value {:?}", s)),
        other => Err(format!("non-numeric value {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TagSet;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Mutex;

    fn block(name: &str, columns: &[&str], values: Vec<Vec<JsonValue>>) -> SeriesBlock {
        SeriesBlock {
            name: name.to_string(),
            tags: TagSet::new(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values,
        }
    }

    #[derive(Debug, Default)]
    struct CollectingListener {
        events: Mutex<Vec<ClientEvent>>,
    }

    impl ClientEventListener for CollectingListener {
        fn on_event(&self, event: ClientEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_basic_conversion() {
        let raw = vec![block(
            "cpu",
            &["time", "x"],
            vec![
                vec![json!("2015-05-13T23:55:28Z"), json!(5.0)],
                vec![json!("2015-05-13T23:55:38Z"), json!(7.0)],
            ],
        )];

        let datasets = convert_to_dataset(&raw);
        assert_eq!(datasets.len(), 1);
        let ds = &datasets[0];
        assert_eq!(ds.name, "cpu");
        assert_eq!(
            ds.timestamps,
            vec![
                Utc.with_ymd_and_hms(2015, 5, 13, 23, 55, 28).unwrap(),
                Utc.with_ymd_and_hms(2015, 5, 13, 23, 55, 38).unwrap(),
            ]
        );
        assert_eq!(ds.field("x"), Some(&[5.0, 7.0][..]));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(convert_to_dataset(&RawResult::new()).is_empty());

        let raw = vec![block("cpu", &["time", "x"], vec![])];
        assert!(convert_to_dataset(&raw).is_empty());
    }

    #[test]
    fn test_nulls_and_missing_cells_are_zero() {
        let raw = vec![block(
            "mem",
            &["time", "used", "free"],
            vec![
                vec![json!("2015-05-13T23:55:28Z"), JsonValue::Null, json!(3)],
                vec![json!("2015-05-13T23:55:38Z"), json!(1.5)],
            ],
        )];

        let datasets = ResultConverter::new(ParsePolicy::Strict).to_datasets(&raw).unwrap();
        let ds = &datasets[0];
        assert_eq!(ds.field("used"), Some(&[0.0, 1.5][..]));
        assert_eq!(ds.field("free"), Some(&[3.0, 0.0][..]));
    }

    #[test]
    fn test_zero_fill_policy_substitutes_and_reports() {
        let listener = Arc::new(CollectingListener::default());
        let converter = ResultConverter::default().with_event_listener(listener.clone());

        let raw = vec![block(
            "disk",
            &["time", "busy"],
            vec![
                vec![json!("yesterday"), json!(4.0)],
                vec![json!("2015-05-13T23:55:38Z"), json!("n/a")],
                vec![json!("2015-05-13T23:55:48Z"), json!("12.5")],
            ],
        )];

        let datasets = converter.to_datasets(&raw).unwrap();
        let ds = &datasets[0];
        assert_eq!(ds.timestamps[0], Timestamp::default());
        assert_eq!(ds.field("busy"), Some(&[4.0, 0.0, 12.5][..]));

        let events = listener.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ClientEvent::RowCoerced { row: 0, column: 0, .. }));
        assert!(matches!(events[1], ClientEvent::RowCoerced { row: 1, column: 1, .. }));
    }

    #[test]
    fn test_strict_policy_fails() {
        let raw = vec![block(
            "disk",
            &["time", "busy"],
            vec![vec![json!("2015-05-13T23:55:38Z"), json!(true)]],
        )];

        let result = ResultConverter::new(ParsePolicy::Strict).to_datasets(&raw);
        match result {
            Err(ClientError::MalformedRow { series, row, column, .. }) => {
                assert_eq!(series, "disk");
                assert_eq!(row, 0);
                assert_eq!(column, 1);
            }
            other => panic!("Expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_epoch_timestamps() {
        let raw = vec![block("cpu", &["time", "x"], vec![vec![json!(1_431_561_328), json!(1)]])];
        let datasets = ResultConverter::default()
            .with_epoch(Precision::Seconds)
            .to_datasets(&raw)
            .unwrap();
        let ds = &datasets[0];
        assert_eq!(ds.timestamps[0], Utc.with_ymd_and_hms(2015, 5, 13, 23, 55, 28).unwrap());
    }

    #[test]
    fn test_non_finite_strings_are_not_numbers() {
        let listener = Arc::new(CollectingListener::default());
        let converter = ResultConverter::default().with_event_listener(listener.clone());
        let raw = vec![block(
            "cpu",
            &["time", "x"],
            vec![
                vec![json!("2015-05-13T23:55:28Z"), json!("NaN")],
                vec![json!("2015-05-13T23:55:38Z"), json!("inf")],
                vec![json!("2015-05-13T23:55:48Z"), json!("-infinity")],
                vec![json!("2015-05-13T23:55:58Z"), json!(1.0)],
            ],
        )];

        let datasets = converter.to_datasets(&raw).unwrap();
        assert_eq!(datasets[0].field("x"), Some(&[0.0, 0.0, 0.0, 1.0][..]));
        assert_eq!(listener.events.lock().unwrap().len(), 3);

        let stats = crate::stats::build_stats(&datasets).unwrap();
        assert_eq!(stats[0].max, 1.0);
        assert_eq!(stats[0].mean, 0.25);

        let result = ResultConverter::new(ParsePolicy::Strict).to_datasets(&raw);
        match result {
            Err(ClientError::MalformedRow { row, column, details, .. }) => {
                assert_eq!((row, column), (0, 1));
                assert!(details.contains("non-numeric"), "{}", details);
            }
            other => panic!("Expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_float_epoch_is_reported_as_non_integer() {
        let raw = vec![block("cpu", &["time", "x"], vec![vec![json!(1.4e18), json!(1)]])];
        match ResultConverter::new(ParsePolicy::Strict).to_datasets(&raw) {
            Err(ClientError::MalformedRow { column: 0, details, .. }) => {
                assert!(details.contains("non-integer timestamp"), "{}", details);
            }
            other => panic!("Expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_one_dataset_per_block_with_tags() {
        let mut a = block("cpu", &["time", "x"], vec![vec![json!("2015-05-13T23:55:28Z"), json!(1)]]);
        a.tags.insert("host".to_string(), "a".to_string());
        let mut b = block("cpu", &["time", "x"], vec![vec![json!("2015-05-13T23:55:28Z"), json!(2)]]);
        b.tags.insert("host".to_string(), "b".to_string());

        let datasets = convert_to_dataset(&vec![a, b]);
        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[0].tags["host"], "a");
        assert_eq!(datasets[1].tags["host"], "b");
    }

    #[test]
    fn test_textset_flattens_first_block() {
        let raw = vec![
            block(
                "measurements",
                &["name"],
                vec![vec![json!("cpu")], vec![json!("disk")], vec![json!("mem")]],
            ),
            block("ignored", &["name"], vec![vec![json!("net")]]),
        ];

        let ts = convert_to_textset(&raw).unwrap();
        assert_eq!(ts.name, "measurements");
        assert_eq!(ts.values, vec!["cpu", "disk", "mem"]);
    }

    #[test]
    fn test_textset_empty() {
        assert!(convert_to_textset(&RawResult::new()).is_none());
    }
}
