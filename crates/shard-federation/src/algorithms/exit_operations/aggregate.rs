//! # Aggregate Exit Operation
//!
//! Reduces the merged rows of every shard. Reductions always run over the
//! merged set: per-shard partial results are never combined arithmetically,
//! so non-additive reductions (max, min, avg) stay correct.

use std::cmp::Ordering;

use crate::domain::{AggregateFunction, AggregateSpec, PropertyPath, Record, Value};

/// Count / sum / avg / min / max, optionally grouped.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateExitOperation {
    spec: AggregateSpec,
}

impl AggregateExitOperation {
    /// Create from a query's aggregate spec.
    pub fn new(spec: AggregateSpec) -> Self {
        Self { spec }
    }

    /// Reduce `rows`.
    ///
    /// Ungrouped: a single-element list holding the scalar.
    /// Grouped: one record per group in first-seen order, with the group key
    /// under the group path and the reduced value under the alias.
    pub fn apply(&self, rows: Vec<Value>) -> Vec<Value> {
        let Some(group_by) = &self.spec.group_by else {
            let all: Vec<&Value> = rows.iter().collect();
            return vec![self.reduce(&all)];
        };

        let mut groups: Vec<(Value, Vec<&Value>)> = Vec::new();
        for row in &rows {
            let key = group_by.resolve(row);
            match groups
                .iter_mut()
                .find(|(k, _)| k.cmp_natural(&key) == Ordering::Equal)
            {
                Some((_, members)) => members.push(row),
                None => groups.push((key, vec![row])),
            }
        }

        groups
            .into_iter()
            .map(|(key, members)| {
                Value::Record(
                    Record::new()
                        .with(group_by.to_string(), key)
                        .with(self.spec.alias.clone(), self.reduce(&members)),
                )
            })
            .collect()
    }

    fn reduce(&self, rows: &[&Value]) -> Value {
        let values = collect_non_null(self.spec.path.as_ref(), rows);
        match self.spec.function {
            AggregateFunction::Count => {
                let n = if self.spec.path.is_some() {
                    values.len()
                } else {
                    rows.len()
                };
                Value::Int(n as i64)
            }
            AggregateFunction::Sum => sum(&values),
            AggregateFunction::Avg => {
                let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
                if numbers.is_empty() {
                    Value::Null
                } else {
                    Value::Float(numbers.iter().sum::<f64>() / numbers.len() as f64)
                }
            }
            AggregateFunction::Min => values
                .into_iter()
                .min_by(|a, b| a.cmp_natural(b))
                .unwrap_or(Value::Null),
            AggregateFunction::Max => values
                .into_iter()
                .max_by(|a, b| a.cmp_natural(b))
                .unwrap_or(Value::Null),
        }
    }
}

fn collect_non_null(path: Option<&PropertyPath>, rows: &[&Value]) -> Vec<Value> {
    rows.iter()
        .map(|row| match path {
            Some(p) => p.resolve(*row),
            None => (*row).clone(),
        })
        .filter(|v| !v.is_null())
        .collect()
}

/// Integer sum while every input is an integer and no overflow occurs,
/// float sum otherwise. Non-numeric values are skipped.
fn sum(values: &[Value]) -> Value {
    let numbers: Vec<&Value> = values.iter().filter(|v| v.as_f64().is_some()).collect();
    if numbers.is_empty() {
        return Value::Null;
    }

    let exact = numbers
        .iter()
        .try_fold(0i64, |acc, v| v.as_i64().and_then(|i| acc.checked_add(i)));
    match exact {
        Some(total) => Value::Int(total),
        None => Value::Float(numbers.iter().filter_map(|v| v.as_f64()).sum()),
    }
}
