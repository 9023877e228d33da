//! Query construction: tag predicates and the select/where/group-by command builder.

use std::fmt;

/// How a filter compares the tag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Exact,
    Regex,
}

/// A single tag predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub tag: String,
    pub value: String,
    pub mode: FilterMode,
}

impl fmt::Display for Filter {
    /// Renders `tag = 'value'` or `tag =~ /value/`.
    ///
    /// The value is emitted as given. Callers own the trust boundary: nothing is escaped.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            FilterMode::Exact => write!(f, "{} = '{}'", self.tag, self.value),
            FilterMode::Regex => write!(f, "{} =~ /{}/", self.tag, self.value),
        }
    }
}

/// Ordered collection of tag predicates, combined with AND.
///
/// Order has no effect on semantics, only on the order of the rendered clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a predicate.
    pub fn add(&mut self, tag: impl Into<String>, value: impl Into<String>, mode: FilterMode) -> &mut Self {
        self.filters.push(Filter {
            tag: tag.into(),
            value: value.into(),
            mode,
        });
        self
    }

    /// Shorthand for an exact-match predicate.
    pub fn exact(&mut self, tag: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.add(tag, value, FilterMode::Exact)
    }

    /// Shorthand for a regular-expression predicate.
    pub fn regex(&mut self, tag: impl Into<String>, pattern: impl Into<String>) -> &mut Self {
        self.add(tag, pattern, FilterMode::Regex)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.filters.iter()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}

/// Builder for read commands.
///
/// Clause order is fixed: `SELECT ... FROM ...`, then `WHERE` with the lower time bound,
/// upper time bound and tag filters (insertion order) joined by `AND`, then `GROUP BY`.
/// `WHERE` is only emitted when at least one predicate exists.
///
/// Field and measurement names are double-quoted, except the `*` wildcard, `/regex/`
/// selectors and names the caller already quoted (such as `"rp"."cpu"`), which are emitted
/// as given.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    fields: Vec<String>,
    measurement: String,
    from: String,
    to: String,
    filters: FilterSet,
    group_by: String,
    aggregate: String,
}

impl QueryBuilder {
    /// Create a new query builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields to select, in caller order.
    pub fn select<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.fields = fields.iter().map(|f| f.as_ref().to_string()).collect();
        self
    }

    pub fn from_measurement(mut self, measurement: &str) -> Self {
        self.measurement = measurement.to_string();
        self
    }

    /// Lower time bound, as a pre-formatted timestamp literal. Empty means unbounded.
    pub fn since(mut self, from: &str) -> Self {
        self.from = from.to_string();
        self
    }

    /// Upper time bound, as a pre-formatted timestamp literal. Empty means unbounded.
    pub fn until(mut self, to: &str) -> Self {
        self.to = to.to_string();
        self
    }

    pub fn filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    pub fn group_by(mut self, group_by: &str) -> Self {
        self.group_by = group_by.to_string();
        self
    }

    /// Aggregation function wrapped around every selected field (e.g. `mean`).
    pub fn aggregate(mut self, function: &str) -> Self {
        self.aggregate = function.to_string();
        self
    }

    /// Renders the command string.
    pub fn build(&self) -> String {
        let columns = self
            .fields
            .iter()
            .map(|field| {
                let field = identifier(field);
                if self.aggregate.is_empty() {
                    field
                } else {
                    format!("{}({})", self.aggregate, field)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut query = format!("SELECT {} FROM {}", columns, identifier(&self.measurement));

        let mut predicates = Vec::with_capacity(2 + self.filters.len());
        if !self.from.is_empty() {
            predicates.push(format!("time > '{}'", self.from));
        }
        if !self.to.is_empty() {
            predicates.push(format!("time < '{}'", self.to));
        }
        predicates.extend(self.filters.iter().map(Filter::to_string));

        if !predicates.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&predicates.join(" AND "));
        }

        // Must stay after WHERE.
        if !self.group_by.is_empty() {
            query.push_str(" GROUP BY ");
            query.push_str(&self.group_by);
        }

        query
    }
}

fn identifier(name: &str) -> String {
    let is_regex = name.len() >= 2 && name.starts_with('/') && name.ends_with('/');
    if name == "*" || is_regex || name.starts_with('"') {
        name.to_string()
    } else {
        format!("\"{}\"", name)
    }
}

/// One-shot form of [`QueryBuilder`].
pub fn build_query<S: AsRef<str>>(
    fields: &[S],
    filters: &FilterSet,
    group_by: &str,
    measurement: &str,
    from: &str,
    to: &str,
    aggregate: &str,
) -> String {
    QueryBuilder::new()
        .select(fields)
        .from_measurement(measurement)
        .since(from)
        .until(to)
        .filters(filters.clone())
        .group_by(group_by)
        .aggregate(aggregate)
        .build()
}
