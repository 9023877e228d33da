//! Descriptive statistics over converted data sets.

use rayon::prelude::*;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::error::{ClientError, Result};
use crate::types::DataSet;

/// Name of a statistic: derived from the source series' tags when it has any, otherwise the
/// field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatName {
    /// Tag values joined with `_`, in ascending tag-key order.
    Tagged(String),
    Field(String),
}

impl StatName {
    pub fn as_str(&self) -> &str {
        match self {
            StatName::Tagged(s) | StatName::Field(s) => s,
        }
    }

    fn for_field(ds: &DataSet, field: &str) -> Self {
        if ds.tags.is_empty() {
            StatName::Field(field.to_string())
        } else {
            StatName::Tagged(ds.tags.values().map(String::as_str).collect::<Vec<_>>().join("_"))
        }
    }
}

impl fmt::Display for StatName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one field of one data set.
#[derive(Debug, Clone, PartialEq)]
pub struct DataStat {
    pub name: StatName,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub length: usize,
}

impl DataStat {
    /// Computes the summary of `values` without touching the caller's slice.
    pub fn compute(name: StatName, values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(ClientError::EmptySeries {
                field: name.as_str().to_string(),
            });
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let length = sorted.len();
        let median = if length % 2 == 0 {
            mean(&sorted[length / 2 - 1..=length / 2])
        } else {
            sorted[length / 2]
        };

        Ok(Self {
            name,
            min: sorted[0],
            max: sorted[length - 1],
            mean: mean(&sorted),
            median,
            length,
        })
    }
}

fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Attribute used to rank a [`DataStats`] list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatField {
    Name,
    Min,
    Max,
    #[default]
    Mean,
    Median,
}

impl StatField {
    /// Maps `"name"`, `"min"`, `"max"`, `"median"`, `"mean"`; anything else ranks by mean.
    pub fn parse(field: &str) -> Self {
        match field {
            "name" => StatField::Name,
            "min" => StatField::Min,
            "max" => StatField::Max,
            "median" => StatField::Median,
            _ => StatField::Mean,
        }
    }

    fn compare(&self, a: &DataStat, b: &DataStat) -> Ordering {
        match self {
            StatField::Name => a.name.as_str().cmp(b.name.as_str()),
            StatField::Min => a.min.total_cmp(&b.min),
            StatField::Max => a.max.total_cmp(&b.max),
            StatField::Mean => a.mean.total_cmp(&b.mean),
            StatField::Median => a.median.total_cmp(&b.median),
        }
    }
}

/// A flat list of statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataStats(Vec<DataStat>);

impl DataStats {
    pub fn into_inner(self) -> Vec<DataStat> {
        self.0
    }

    /// Stable sort, largest first, by the named attribute.
    pub fn field_sort(&mut self, field: &str) {
        self.sort_by_field(StatField::parse(field));
    }

    pub fn sort_by_field(&mut self, field: StatField) {
        self.0.sort_by(|a, b| field.compare(b, a));
    }
}

impl Deref for DataStats {
    type Target = Vec<DataStat>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DataStats {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<DataStat>> for DataStats {
    fn from(stats: Vec<DataStat>) -> Self {
        DataStats(stats)
    }
}

impl IntoIterator for DataStats {
    type Item = DataStat;
    type IntoIter = std::vec::IntoIter<DataStat>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Summarizes every field of every data set into one flat list.
///
/// Data sets are processed in parallel; the output keeps input order, and fields within a
/// data set come out in ascending field-name order. The inputs are not modified.
pub fn build_stats(datasets: &[DataSet]) -> Result<DataStats> {
    let per_dataset = datasets
        .par_iter()
        .map(|ds| {
            ds.series
                .iter()
                .map(|(field, values)| DataStat::compute(StatName::for_field(ds, field), values))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DataStats(per_dataset.into_iter().flatten().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TagSet;

    fn dataset(name: &str, tags: &[(&str, &str)], fields: &[(&str, Vec<f64>)]) -> DataSet {
        let len = fields.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut ds = DataSet::with_fields(
            name,
            tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<TagSet>(),
            len,
            &fields.iter().map(|(f, _)| *f).collect::<Vec<_>>(),
        );
        for (f, values) in fields {
            ds.series.insert(f.to_string(), values.clone());
        }
        ds
    }

    fn stat(name: &str, min: f64, mean: f64) -> DataStat {
        DataStat {
            name: StatName::Field(name.to_string()),
            min,
            max: min,
            mean,
            median: min,
            length: 1,
        }
    }

    #[test]
    fn test_odd_length() {
        let ds = dataset("m", &[], &[("x", vec![3.0, 1.0, 4.0, 1.0, 5.0])]);
        let stats = build_stats(&[ds]).unwrap();
        assert_eq!(stats.len(), 1);

        let s = &stats[0];
        assert_eq!(s.name, StatName::Field("x".to_string()));
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert_eq!(s.length, 5);
        assert!((s.mean - 2.8).abs() < 1e-12);
        assert_eq!(s.median, 3.0);
    }

    #[test]
    fn test_even_length() {
        let ds = dataset("m", &[], &[("x", vec![2.0, 4.0, 6.0, 8.0])]);
        let stats = build_stats(&[ds]).unwrap();
        let s = &stats[0];
        assert_eq!(s.median, 5.0);
        assert_eq!(s.mean, 5.0);
    }

    #[test]
    fn test_input_is_not_reordered() {
        let ds = dataset("m", &[], &[("x", vec![3.0, 1.0, 2.0])]);
        let before = ds.clone();
        let first = build_stats(std::slice::from_ref(&ds)).unwrap();
        let second = build_stats(std::slice::from_ref(&ds)).unwrap();
        assert_eq!(ds, before);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_series_fails() {
        let ds = dataset("m", &[], &[("x", vec![])]);
        match build_stats(&[ds]) {
            Err(ClientError::EmptySeries { field }) => assert_eq!(field, "x"),
            other => panic!("Expected EmptySeries, got {:?}", other),
        }
    }

    #[test]
    fn test_tagged_names_join_in_key_order() {
        let ds = dataset(
            "cpu",
            &[("region", "eu"), ("host", "web1")],
            &[("user", vec![1.0]), ("sys", vec![2.0])],
        );
        let stats = build_stats(&[ds]).unwrap();
        assert_eq!(stats.len(), 2);
        for s in stats.iter() {
            assert_eq!(s.name, StatName::Tagged("web1_eu".to_string()));
        }
        // Field order: sys before user
        assert_eq!(stats[0].min, 2.0);
        assert_eq!(stats[1].min, 1.0);
    }

    #[test]
    fn test_flattens_across_datasets() {
        let a = dataset("cpu", &[("host", "a")], &[("x", vec![1.0, 2.0])]);
        let b = dataset("cpu", &[("host", "b")], &[("x", vec![10.0])]);
        let stats = build_stats(&[a, b]).unwrap();
        let names: Vec<_> = stats.iter().map(|s| s.name.to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_field_sort_descending() {
        let mut stats = DataStats::from(vec![stat("a", 3.0, 0.0), stat("b", 7.0, 0.0)]);
        stats.field_sort("min");
        assert_eq!(stats[0].name.as_str(), "b");
        assert_eq!(stats[1].name.as_str(), "a");

        stats.field_sort("name");
        assert_eq!(stats[0].name.as_str(), "b");
    }

    #[test]
    fn test_field_sort_unknown_defaults_to_mean() {
        let mut stats = DataStats::from(vec![stat("a", 9.0, 1.0), stat("b", 0.0, 2.0)]);
        stats.field_sort("bogus");
        assert_eq!(stats[0].name.as_str(), "b");
    }

    #[test]
    fn test_field_sort_is_stable() {
        let mut stats = DataStats::from(vec![stat("first", 1.0, 5.0), stat("second", 2.0, 5.0)]);
        stats.field_sort("mean");
        assert_eq!(stats[0].name.as_str(), "first");
        assert_eq!(stats[1].name.as_str(), "second");
    }
}
