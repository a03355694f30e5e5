//! # Exit Operations
//!
//! Transformations applied to the concatenated per-shard results so that a
//! federated query behaves as if it ran against a single store.
//!
//! Stages are order-sensitive. [`ExitOperationPipeline::for_query`] builds the
//! canonical sequence:
//!
//! ```text
//! Order -> Aggregate -> Project -> Distinct -> RowLimit
//! ```

pub mod aggregate;
pub mod order;
pub mod projection;
pub mod row_limit;

pub use aggregate::AggregateExitOperation;
pub use order::OrderExitOperation;
pub use projection::{DistinctExitOperation, ProjectionExitOperation};
pub use row_limit::RowLimitExitOperation;

use tracing::trace;

use crate::domain::{FederatedQuery, Value};

/// One stage of the exit pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum ExitOperation {
    /// Global re-ordering.
    Order(OrderExitOperation),
    /// Reduction over the merged set.
    Aggregate(AggregateExitOperation),
    /// Property projection.
    Project(ProjectionExitOperation),
    /// Duplicate removal.
    Distinct(DistinctExitOperation),
    /// Offset / limit window.
    RowLimit(RowLimitExitOperation),
}

impl ExitOperation {
    /// Transform `rows`.
    pub fn apply(&self, rows: Vec<Value>) -> Vec<Value> {
        match self {
            Self::Order(op) => op.apply(rows),
            Self::Aggregate(op) => op.apply(rows),
            Self::Project(op) => op.apply(rows),
            Self::Distinct(op) => op.apply(rows),
            Self::RowLimit(op) => op.apply(rows),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Order(_) => "order",
            Self::Aggregate(_) => "aggregate",
            Self::Project(_) => "project",
            Self::Distinct(_) => "distinct",
            Self::RowLimit(_) => "row_limit",
        }
    }
}

/// Ordered composition of exit operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExitOperationPipeline {
    operations: Vec<ExitOperation>,
}

impl ExitOperationPipeline {
    /// Empty pipeline (identity).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn then(mut self, operation: ExitOperation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Canonical pipeline for a federated query.
    ///
    /// Stages run as Order, Aggregate, Project, Distinct, RowLimit. A
    /// projection therefore reads the aggregate's output: with a grouped
    /// aggregate it sees one record per group holding the group key and the
    /// alias field.
    pub fn for_query(query: &FederatedQuery) -> Self {
        let mut pipeline = Self::new();

        if !query.order_by.is_empty() {
            pipeline = pipeline.then(ExitOperation::Order(OrderExitOperation::new(
                query.order_by.clone(),
            )));
        }
        if let Some(spec) = &query.aggregate {
            pipeline = pipeline.then(ExitOperation::Aggregate(AggregateExitOperation::new(
                spec.clone(),
            )));
        }
        if let Some(projection) = &query.projection {
            pipeline = pipeline.then(ExitOperation::Project(ProjectionExitOperation::new(
                projection.paths.clone(),
            )));
            if projection.distinct {
                pipeline = pipeline.then(ExitOperation::Distinct(DistinctExitOperation));
            }
        }
        let window = RowLimitExitOperation::new(query.offset, query.limit);
        if !window.is_noop() {
            pipeline = pipeline.then(ExitOperation::RowLimit(window));
        }

        pipeline
    }

    /// Stages in application order.
    pub fn operations(&self) -> &[ExitOperation] {
        &self.operations
    }

    /// Run every stage in order.
    pub fn apply(&self, rows: Vec<Value>) -> Vec<Value> {
        self.operations.iter().fold(rows, |rows, op| {
            let before = rows.len();
            let out = op.apply(rows);
            trace!(stage = op.name(), before, after = out.len(), "[shard-fed] exit operation applied");
            out
        })
    }
}
