//! # Projection and Distinct Exit Operations

use crate::domain::{PropertyPath, PropertySource, Record, Value};

/// Maps each row to the selected properties.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionExitOperation {
    paths: Vec<PropertyPath>,
}

impl ProjectionExitOperation {
    /// Project `paths`.
    pub fn new(paths: Vec<PropertyPath>) -> Self {
        Self { paths }
    }

    /// One path yields the bare value; several yield a record keyed by path.
    pub fn apply<T: PropertySource>(&self, rows: Vec<T>) -> Vec<Value> {
        rows.iter()
            .map(|row| match self.paths.as_slice() {
                [single] => single.resolve(row),
                paths => Value::Record(paths.iter().fold(Record::new(), |rec, p| {
                    rec.with(p.to_string(), p.resolve(row))
                })),
            })
            .collect()
    }
}

/// Removes duplicates by value equality, keeping first occurrences.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DistinctExitOperation;

impl DistinctExitOperation {
    /// Deduplicate `rows`.
    pub fn apply<T: PartialEq>(&self, rows: Vec<T>) -> Vec<T> {
        let mut out: Vec<T> = Vec::with_capacity(rows.len());
        for row in rows {
            if !out.contains(&row) {
                out.push(row);
            }
        }
        out
    }
}
