use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ClientError, Result};

/// Timestamp type (UTC instant).
pub type Timestamp = DateTime<Utc>;

/// TagSet type. Ordered by key so that anything derived from tag iteration is stable.
pub type TagSet = BTreeMap<String, String>;

/// Field map of a point, ordered by field name.
pub type FieldSet = BTreeMap<String, FieldValue>;

/// A single field value of a point: numeric or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Interprets raw text as a finite number when possible, falling back to a string field.
    /// `"NaN"` and `"inf"` stay text.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => FieldValue::Float(v),
            _ => FieldValue::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Float(v as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// Timestamp unit used when a point is encoded for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl Precision {
    /// Short unit name used on the wire ("s", "ms", "u", "ns").
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Seconds => "s",
            Precision::Milliseconds => "ms",
            Precision::Microseconds => "u",
            Precision::Nanoseconds => "ns",
        }
    }

    /// Converts an instant into an integer count of this unit since the Unix epoch.
    ///
    /// Returns `None` when the count does not fit an `i64` (nanoseconds outside 1677..2262).
    pub fn encode(&self, ts: &Timestamp) -> Option<i64> {
        match self {
            Precision::Seconds => Some(ts.timestamp()),
            Precision::Milliseconds => Some(ts.timestamp_millis()),
            Precision::Microseconds => Some(ts.timestamp_micros()),
            Precision::Nanoseconds => ts.timestamp_nanos_opt(),
        }
    }

    /// Inverse of [`Precision::encode`]. Returns `None` when the value is out of range.
    pub fn decode(&self, value: i64) -> Option<Timestamp> {
        match self {
            Precision::Seconds => DateTime::from_timestamp(value, 0),
            Precision::Milliseconds => DateTime::from_timestamp_millis(value),
            Precision::Microseconds => DateTime::from_timestamp_micros(value),
            Precision::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write consistency requested from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    Any,
    #[default]
    One,
    Quorum,
    All,
}

impl Consistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::Any => "any",
            Consistency::One => "one",
            Consistency::Quorum => "quorum",
            Consistency::All => "all",
        }
    }
}

/// A measurement point waiting in the buffer to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub measurement: String,
    pub timestamp: Timestamp,
    pub fields: FieldSet,
    pub tags: TagSet,
    pub precision: Precision,
}

impl TimeSeriesPoint {
    /// Builds a point.
    ///
    /// # Errors
    /// [`ClientError::InvalidPoint`] for an empty measurement name, an empty field map, a
    /// non-finite float field, or a timestamp that cannot be expressed in `precision`.
    pub fn new(
        measurement: impl Into<String>,
        timestamp: Timestamp,
        fields: FieldSet,
        tags: TagSet,
        precision: Precision,
    ) -> Result<Self> {
        let measurement = measurement.into();
        if measurement.is_empty() {
            return Err(ClientError::InvalidPoint("measurement name is empty".to_string()));
        }
        if fields.is_empty() {
            return Err(ClientError::InvalidPoint(format!(
                "point for '{}' has no fields",
                measurement
            )));
        }
        if let Some((name, _)) = fields
            .iter()
            .find(|(_, v)| matches!(v, FieldValue::Float(f) if !f.is_finite()))
        {
            return Err(ClientError::InvalidPoint(format!(
                "field '{}' of '{}' is not a finite number",
                name, measurement
            )));
        }
        if precision.encode(&timestamp).is_none() {
            return Err(ClientError::InvalidPoint(format!(
                "timestamp {} of '{}' overflows {} precision",
                timestamp, measurement, precision
            )));
        }
        Ok(Self {
            measurement,
            timestamp,
            fields,
            tags,
            precision,
        })
    }
}

/// Numeric samples of one result series, column-oriented.
///
/// Every vector in `series` has the same length as `timestamps`; index `i` across all of
/// them refers to the same sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    pub name: String,
    pub tags: TagSet,
    pub timestamps: Vec<Timestamp>,
    pub series: BTreeMap<String, Vec<f64>>,
}

impl DataSet {
    /// Allocates a zero-filled data set with `length` samples for each field.
    pub fn with_fields<S: AsRef<str>>(name: &str, tags: TagSet, length: usize, fields: &[S]) -> Self {
        let series = fields
            .iter()
            .map(|f| (f.as_ref().to_string(), vec![0.0; length]))
            .collect();
        Self {
            name: name.to_string(),
            tags,
            timestamps: vec![Timestamp::default(); length],
            series,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Values recorded for `field`, if the data set has that column.
    pub fn field(&self, field: &str) -> Option<&[f64]> {
        self.series.get(field).map(Vec::as_slice)
    }
}

/// Flat list of string values from a metadata query (e.g. measurement names).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextSet {
    pub name: String,
    pub tags: TagSet,
    pub values: Vec<String>,
}

impl TextSet {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
