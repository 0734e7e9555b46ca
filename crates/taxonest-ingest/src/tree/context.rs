//! Nested-set coordinate assignment over a stack of open elements

use tracing::trace;
use uuid::Uuid;

use super::dedup::DuplicateFilter;
use super::node::{PersistedNode, TraversalNode};
use crate::config::TreeConfig;

/// Result of closing the current element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// First occurrence of this composite name; ready to persist
    Accepted(PersistedNode),
    /// Name already accepted earlier in the run; node dropped
    Duplicate { name: String, left: i64 },
    /// Close with no open element
    Ignored,
}

/// Traversal state for one import run.
///
/// Owns the traversal counter, the duplicate filter and an arena of the
/// currently open elements. Only the innermost open element can close, so
/// the arena is used as a stack: the cursor is always its last entry and a
/// node's `parent` index always points at the entry directly below it.
/// Memory is proportional to tree depth plus the set of accepted names.
#[derive(Debug)]
pub struct TraversalContext {
    fallback_label: String,
    separator: String,
    arena: Vec<TraversalNode>,
    counter: i64,
    seen: DuplicateFilter,
    max_depth: usize,
}

impl TraversalContext {
    pub fn new(config: &TreeConfig) -> Self {
        Self {
            fallback_label: config.fallback_label.clone(),
            separator: config.separator.clone(),
            arena: Vec::new(),
            counter: 0,
            seen: DuplicateFilter::new(),
            max_depth: 0,
        }
    }

    /// Open an element and make it the cursor. Returns its `left` value.
    pub fn open(&mut self, label: Option<&str>) -> i64 {
        let label = label.unwrap_or(&self.fallback_label);

        let parent = self.cursor_index();
        let (name, parent_id) = match parent.map(|index| &self.arena[index]) {
            Some(cursor) => (
                format!("{}{}{}", cursor.name, self.separator, label),
                Some(cursor.id),
            ),
            None => (label.to_string(), None),
        };

        self.counter += 1;
        let left = self.counter;

        trace!(node = %name, left, depth = self.arena.len(), "Element opened");

        self.arena.push(TraversalNode {
            id: Uuid::new_v4(),
            name,
            child_count: 0,
            left,
            parent_id,
            parent,
        });
        self.max_depth = self.max_depth.max(self.arena.len());

        left
    }

    /// Close the cursor element, restoring the cursor to its parent.
    pub fn close(&mut self) -> CloseOutcome {
        let Some(node) = self.arena.pop() else {
            return CloseOutcome::Ignored;
        };

        if self.seen.contains(&node.name) {
            return CloseOutcome::Duplicate {
                name: node.name,
                left: node.left,
            };
        }

        if let Some(parent) = node.parent {
            self.arena[parent].child_count += 1;
        }

        self.counter += 1;
        let right = self.counter;

        self.seen.add(node.name.clone());
        CloseOutcome::Accepted(node.into_persisted(right))
    }

    /// The innermost open element, if any
    pub fn cursor(&self) -> Option<&TraversalNode> {
        self.arena.last()
    }

    fn cursor_index(&self) -> Option<usize> {
        self.arena.len().checked_sub(1)
    }

    /// Number of currently open elements
    pub fn depth(&self) -> usize {
        self.arena.len()
    }

    /// Deepest nesting seen so far in the run
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Last counter value handed out
    pub fn counter(&self) -> i64 {
        self.counter
    }

    /// Number of distinct names accepted so far
    pub fn accepted_names(&self) -> usize {
        self.seen.len()
    }
}
