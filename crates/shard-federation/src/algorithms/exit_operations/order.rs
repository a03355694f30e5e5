//! # Order Exit Operation
//!
//! Re-derives a global order over rows merged from several shards. Each shard
//! only ordered its own subset, so the merged list is re-sorted here.

use std::cmp::Ordering;

use crate::domain::{InMemoryOrderBy, PropertySource, Value};

/// Stable multi-key sort over resolved property paths.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderExitOperation {
    orderings: Vec<InMemoryOrderBy>,
}

impl OrderExitOperation {
    /// Sort by `orderings`, first key most significant.
    pub fn new(orderings: Vec<InMemoryOrderBy>) -> Self {
        Self { orderings }
    }

    /// Ordering keys.
    pub fn orderings(&self) -> &[InMemoryOrderBy] {
        &self.orderings
    }

    /// Sort `results`.
    ///
    /// Keys are resolved once per element, not per comparison. Full ties keep
    /// their input order.
    pub fn apply<T: PropertySource>(&self, results: Vec<T>) -> Vec<T> {
        if self.orderings.is_empty() || results.len() < 2 {
            return results;
        }

        let mut keyed: Vec<(Vec<Value>, T)> = results
            .into_iter()
            .map(|row| {
                let keys = self.orderings.iter().map(|o| o.path.resolve(&row)).collect();
                (keys, row)
            })
            .collect();

        // slice::sort_by is stable
        keyed.sort_by(|(a, _), (b, _)| self.compare_keys(a, b));
        keyed.into_iter().map(|(_, row)| row).collect()
    }

    fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        self.orderings
            .iter()
            .zip(a.iter().zip(b))
            .map(|(order, (x, y))| order.direction.apply(x.cmp_natural(y)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}
