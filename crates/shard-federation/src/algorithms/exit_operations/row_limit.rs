//! # Row Limit Exit Operation
//!
//! First-result / max-results window. Must run after the global order, since
//! a limit applied per shard before the merge would drop rows that belong in
//! the global window.

/// Skips `offset` rows then keeps at most `limit`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowLimitExitOperation {
    offset: usize,
    limit: Option<usize>,
}

impl RowLimitExitOperation {
    /// Window starting at `offset` with at most `limit` rows.
    pub fn new(offset: usize, limit: Option<usize>) -> Self {
        Self { offset, limit }
    }

    /// True when the window keeps every row.
    pub fn is_noop(&self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }

    /// Apply the window.
    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}
