//! Transient and persisted node records

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use uuid::{fmt::Hyphenated, Uuid};

/// An element that has opened but not yet closed.
///
/// Lives in the [`TraversalContext`](super::TraversalContext) arena. The
/// `parent` field is the arena index of the enclosing open element and is
/// only meaningful while this node is on the stack.
#[derive(Debug, Clone)]
pub struct TraversalNode {
    pub id: Uuid,
    /// Composite name: ancestor labels joined with the separator
    pub name: String,
    /// Number of accepted direct children so far
    pub child_count: i64,
    pub left: i64,
    pub parent_id: Option<Uuid>,
    pub(crate) parent: Option<usize>,
}

impl TraversalNode {
    /// Finalize an accepted node with its closing coordinate
    pub fn into_persisted(self, right: i64) -> PersistedNode {
        PersistedNode {
            id: self.id,
            name: self.name,
            child_count: self.child_count,
            left: self.left,
            right,
            parent_id: self.parent_id,
        }
    }
}

/// A node as written to the `nodes` table. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedNode {
    pub id: Uuid,
    pub name: String,
    pub child_count: i64,
    pub left: i64,
    pub right: i64,
    pub parent_id: Option<Uuid>,
}

impl PersistedNode {
    /// Whether `other` lies strictly inside this node's interval
    pub fn contains(&self, other: &PersistedNode) -> bool {
        self.left < other.left && other.right < self.right
    }
}

// Ids are stored as hyphenated TEXT rather than sqlx's default 16-byte BLOB
impl<'r> FromRow<'r, SqliteRow> for PersistedNode {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: Hyphenated = row.try_get("id")?;
        let parent_id: Option<Hyphenated> = row.try_get("parent_id")?;

        Ok(Self {
            id: id.into_uuid(),
            name: row.try_get("name")?,
            child_count: row.try_get("child_count")?,
            left: row.try_get("left_index")?,
            right: row.try_get("right_index")?,
            parent_id: parent_id.map(Hyphenated::into_uuid),
        })
    }
}
