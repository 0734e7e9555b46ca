//! Nested-set tree construction
//!
//! Turns a depth-first sequence of open/close events into nested-set
//! records. Each open consumes one value of a run-wide counter as the
//! node's `left`; each accepted close consumes one more as its `right`, so
//! a node's interval contains the intervals of all its accepted
//! descendants.
//!
//! Nodes whose composite name (the `" > "`-joined path of ancestor labels)
//! was already accepted earlier in the run are discarded. Their `left`
//! value is not reclaimed, which leaves a gap in the numbering.

pub mod context;
pub mod dedup;
pub mod node;

pub use context::{CloseOutcome, TraversalContext};
pub use dedup::DuplicateFilter;
pub use node::{PersistedNode, TraversalNode};
