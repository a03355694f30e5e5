//! # Domain Entities
//!
//! Federated queries, their shard-local form, and federated results.

use serde::{Deserialize, Serialize};

use super::errors::{FederationError, ShardFailure};
use super::property::{PropertyPath, PropertySource};
use super::value_objects::{CacheMode, QueryId, SortDirection, Value};

/// Record field holding an entity's identifier.
pub const ID_PROPERTY: &str = "id";

/// Filter predicate over one property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// `path == value`
    Eq(PropertyPath, Value),
    /// `path != value`
    Ne(PropertyPath, Value),
    /// `path > value`
    Gt(PropertyPath, Value),
    /// `path >= value`
    Ge(PropertyPath, Value),
    /// `path < value`
    Lt(PropertyPath, Value),
    /// `path <= value`
    Le(PropertyPath, Value),
    /// `path` is one of `values`
    In(PropertyPath, Vec<Value>),
}

impl Filter {
    /// Property this predicate constrains.
    pub fn path(&self) -> &PropertyPath {
        match self {
            Self::Eq(p, _)
            | Self::Ne(p, _)
            | Self::Gt(p, _)
            | Self::Ge(p, _)
            | Self::Lt(p, _)
            | Self::Le(p, _)
            | Self::In(p, _) => p,
        }
    }

    /// Evaluate against an object. Comparisons against `Null` never match.
    pub fn matches<T: PropertySource>(&self, source: &T) -> bool {
        use std::cmp::Ordering::*;

        let actual = self.path().resolve(source);
        let cmp = |expected: &Value| {
            if actual.is_null() || expected.is_null() {
                None
            } else {
                Some(actual.cmp_natural(expected))
            }
        };
        match self {
            Self::Eq(_, v) => cmp(v) == Some(Equal),
            Self::Ne(_, v) => matches!(cmp(v), Some(Less | Greater)),
            Self::Gt(_, v) => cmp(v) == Some(Greater),
            Self::Ge(_, v) => matches!(cmp(v), Some(Greater | Equal)),
            Self::Lt(_, v) => cmp(v) == Some(Less),
            Self::Le(_, v) => matches!(cmp(v), Some(Less | Equal)),
            Self::In(_, values) => values.iter().any(|v| cmp(v) == Some(Equal)),
        }
    }
}

/// One in-memory ordering key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InMemoryOrderBy {
    /// Query this ordering was declared on, if any.
    pub query_id: Option<QueryId>,
    /// Property to sort by.
    pub path: PropertyPath,
    /// Direction.
    pub direction: SortDirection,
}

impl InMemoryOrderBy {
    /// Ascending key on `path`.
    pub fn asc(path: &str) -> Result<Self, FederationError> {
        Self::new(path, SortDirection::Ascending)
    }

    /// Descending key on `path`.
    pub fn desc(path: &str) -> Result<Self, FederationError> {
        Self::new(path, SortDirection::Descending)
    }

    /// Key on `path` with an explicit direction.
    pub fn new(path: &str, direction: SortDirection) -> Result<Self, FederationError> {
        Ok(Self {
            query_id: None,
            path: PropertyPath::parse(path)?,
            direction,
        })
    }

    /// Associate this key with a query.
    pub fn for_query(mut self, query_id: QueryId) -> Self {
        self.query_id = Some(query_id);
        self
    }
}

/// Aggregate reduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    /// Number of rows, or of non-null values when a path is given.
    Count,
    /// Sum of numeric values.
    Sum,
    /// Arithmetic mean of numeric values.
    Avg,
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
}

/// Aggregate requested by a query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateSpec {
    /// Reduction.
    pub function: AggregateFunction,
    /// Reduced property; required for everything except `Count`.
    pub path: Option<PropertyPath>,
    /// Optional grouping key.
    pub group_by: Option<PropertyPath>,
    /// Field name of the reduced value in grouped output.
    pub alias: String,
}

impl AggregateSpec {
    /// Aggregate over `path` (or rows, for a path-less `Count`).
    pub fn new(function: AggregateFunction, path: Option<&str>) -> Result<Self, FederationError> {
        let path = path.map(PropertyPath::parse).transpose()?;
        if path.is_none() && function != AggregateFunction::Count {
            return Err(FederationError::InvalidQuery(format!(
                "{:?} requires a property path",
                function
            )));
        }
        Ok(Self {
            function,
            path,
            group_by: None,
            alias: format!("{:?}", function).to_lowercase(),
        })
    }

    /// Group rows by `path` before reducing.
    pub fn group_by(mut self, path: &str) -> Result<Self, FederationError> {
        self.group_by = Some(PropertyPath::parse(path)?);
        Ok(self)
    }

    /// Rename the reduced field in grouped output.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }
}

/// Projection requested by a query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSpec {
    /// Projected properties.
    pub paths: Vec<PropertyPath>,
    /// Remove duplicate projected rows.
    pub distinct: bool,
}

/// A logical query over every shard that may hold matching rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FederatedQuery {
    /// Query identity.
    pub id: QueryId,
    /// Entity (table) name.
    pub entity: String,
    /// Conjunctive filters.
    pub filters: Vec<Filter>,
    /// Global ordering.
    pub order_by: Vec<InMemoryOrderBy>,
    /// Optional projection.
    pub projection: Option<ProjectionSpec>,
    /// Optional aggregate.
    pub aggregate: Option<AggregateSpec>,
    /// Rows to skip after merge.
    pub offset: usize,
    /// Maximum rows after merge.
    pub limit: Option<usize>,
}

impl FederatedQuery {
    /// Start building a query over `entity`.
    pub fn builder(entity: impl Into<String>) -> FederatedQueryBuilder {
        FederatedQueryBuilder::new(entity)
    }

    /// Rows each shard must return for the global window to be exact.
    ///
    /// `None` when rows cannot be capped per shard (aggregates and distinct
    /// need the full per-shard set).
    pub fn per_shard_row_cap(&self) -> Option<usize> {
        let distinct = self.projection.as_ref().is_some_and(|p| p.distinct);
        if self.aggregate.is_some() || distinct {
            return None;
        }
        self.limit.map(|limit| self.offset.saturating_add(limit))
    }
}

/// Builder for [`FederatedQuery`]. Path errors are reported by `build`.
#[derive(Debug)]
pub struct FederatedQueryBuilder {
    query: FederatedQuery,
    error: Option<FederationError>,
}

impl FederatedQueryBuilder {
    fn new(entity: impl Into<String>) -> Self {
        Self {
            query: FederatedQuery {
                id: QueryId::new(),
                entity: entity.into(),
                filters: Vec::new(),
                order_by: Vec::new(),
                projection: None,
                aggregate: None,
                offset: 0,
                limit: None,
            },
            error: None,
        }
    }

    fn path(&mut self, path: &str) -> Option<PropertyPath> {
        match PropertyPath::parse(path) {
            Ok(p) => Some(p),
            Err(e) => {
                self.error.get_or_insert(e);
                None
            }
        }
    }

    /// Add a filter built from a parsed path.
    pub fn filter<F>(mut self, path: &str, make: F) -> Self
    where
        F: FnOnce(PropertyPath) -> Filter,
    {
        if let Some(p) = self.path(path) {
            self.query.filters.push(make(p));
        }
        self
    }

    /// Shorthand for an equality filter.
    pub fn eq(self, path: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.filter(path, |p| Filter::Eq(p, value))
    }

    /// Add an ordering key.
    pub fn order_by(mut self, path: &str, direction: SortDirection) -> Self {
        if let Some(p) = self.path(path) {
            let id = self.query.id;
            self.query.order_by.push(InMemoryOrderBy {
                query_id: Some(id),
                path: p,
                direction,
            });
        }
        self
    }

    /// Project the given properties.
    pub fn project(mut self, paths: &[&str], distinct: bool) -> Self {
        let parsed: Vec<_> = paths.iter().filter_map(|p| self.path(p)).collect();
        self.query.projection = Some(ProjectionSpec {
            paths: parsed,
            distinct,
        });
        self
    }

    /// Reduce the merged rows.
    pub fn aggregate(mut self, spec: AggregateSpec) -> Self {
        self.query.aggregate = Some(spec);
        self
    }

    /// Skip rows after the global merge.
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = offset;
        self
    }

    /// Keep at most `limit` rows after the global merge.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Finish the query.
    pub fn build(self) -> Result<FederatedQuery, FederationError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.query.entity.trim().is_empty() {
            return Err(FederationError::InvalidQuery("entity name is empty".into()));
        }
        if self
            .query
            .projection
            .as_ref()
            .is_some_and(|p| p.paths.is_empty())
        {
            return Err(FederationError::InvalidQuery("projection without paths".into()));
        }
        let scalar_aggregate = self
            .query
            .aggregate
            .as_ref()
            .is_some_and(|a| a.group_by.is_none());
        if scalar_aggregate && self.query.projection.is_some() {
            return Err(FederationError::InvalidQuery(
                "projection over an ungrouped aggregate".into(),
            ));
        }
        Ok(self.query)
    }
}

/// Per-query options set through deferred criteria events.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Loaded entities are read-only.
    pub read_only: bool,
    /// Results may be cached.
    pub cacheable: bool,
    /// Cache interaction for this query.
    pub cache_mode: Option<CacheMode>,
    /// JDBC-style fetch size hint.
    pub fetch_size: Option<u32>,
    /// Per-query timeout in seconds.
    pub timeout_secs: Option<u32>,
    /// Comment attached to the generated statement.
    pub comment: Option<String>,
}

/// Shard-local form of a federated query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShardQuery {
    /// Federated query this was derived from.
    pub query_id: QueryId,
    /// Entity (table) name.
    pub entity: String,
    /// Conjunctive filters.
    pub filters: Vec<Filter>,
    /// Shard-local ordering (same keys as the global one).
    pub order_by: Vec<InMemoryOrderBy>,
    /// Shard-local row cap.
    pub max_results: Option<usize>,
    /// Options replayed from criteria events.
    pub options: QueryOptions,
}

impl ShardQuery {
    /// Derive the shard-local query. `push_down_limit` caps rows per shard
    /// when the global window allows it.
    pub fn from_federated(query: &FederatedQuery, push_down_limit: bool) -> Self {
        Self {
            query_id: query.id,
            entity: query.entity.clone(),
            filters: query.filters.clone(),
            order_by: query.order_by.clone(),
            max_results: if push_down_limit {
                query.per_shard_row_cap()
            } else {
                None
            },
            options: QueryOptions::default(),
        }
    }
}

/// Merged result of a federated query.
#[derive(Clone, Debug, PartialEq)]
pub struct FederatedResult {
    /// Rows after the exit pipeline, built from the shards that succeeded.
    pub rows: Vec<Value>,
    /// Shards that failed.
    pub failures: Vec<ShardFailure>,
}

impl FederatedResult {
    /// True when every targeted shard succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Rows, or a `PartialFailure` if any shard failed.
    pub fn require_complete(self) -> Result<Vec<Value>, FederationError> {
        if self.failures.is_empty() {
            Ok(self.rows)
        } else {
            Err(FederationError::PartialFailure {
                failures: self.failures,
            })
        }
    }
}
