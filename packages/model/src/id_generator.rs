use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a node inside one [`Tree`](crate::Tree).
///
/// Identities are surrogate keys: they say nothing about the content of the
/// node and are never reused within the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Sequential ID generator for the nodes of a tree
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    count: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> NodeId {
        self.count += 1;
        NodeId(self.count)
    }

    /// Make sure ids issued later never collide with `id`
    pub fn observe(&mut self, id: NodeId) {
        if id.0 > self.count {
            self.count = id.0;
        }
    }

    /// Number of ids issued so far
    pub fn issued(&self) -> u64 {
        self.count
    }
}
