//! Run-scoped set of accepted composite names

use std::collections::HashSet;

/// Composite names accepted so far in one import run.
///
/// Consulted and updated only when an element closes. Names are compared
/// with exact string equality, so the rule is global across the whole tree
/// rather than scoped to siblings.
#[derive(Debug, Default)]
pub struct DuplicateFilter {
    seen: HashSet<String>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` has already been accepted
    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// Register an accepted name. Returns `false` if it was already present.
    pub fn add(&mut self, name: impl Into<String>) -> bool {
        self.seen.insert(name.into())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
