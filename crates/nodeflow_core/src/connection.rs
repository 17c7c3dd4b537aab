// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::handle::{AttributeHandle, NodeHandle};
use serde::{Deserialize, Serialize};

/// A directed link from an output attribute to an input attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Node owning the source attribute
    pub source_node: NodeHandle,
    /// Source attribute
    pub source_attribute: AttributeHandle,
    /// Node owning the target attribute
    pub target_node: NodeHandle,
    /// Target attribute
    pub target_attribute: AttributeHandle,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        source_node: NodeHandle,
        source_attribute: AttributeHandle,
        target_node: NodeHandle,
        target_attribute: AttributeHandle,
    ) -> Self {
        Self {
            source_node,
            source_attribute,
            target_node,
            target_attribute,
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node: NodeHandle) -> bool {
        self.source_node == node || self.target_node == node
    }

    /// Check if this connection involves a specific attribute
    pub fn involves_attribute(&self, attribute: AttributeHandle) -> bool {
        self.source_attribute == attribute || self.target_attribute == attribute
    }

    /// Whether this links exactly `from` to `to`
    pub fn links(&self, from: AttributeHandle, to: AttributeHandle) -> bool {
        self.source_attribute == from && self.target_attribute == to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_involves() {
        let c = Connection::new(
            NodeHandle::new(1),
            AttributeHandle::new(3),
            NodeHandle::new(2),
            AttributeHandle::new(4),
        );

        assert!(c.involves_node(NodeHandle::new(1)));
        assert!(c.involves_node(NodeHandle::new(2)));
        assert!(!c.involves_node(NodeHandle::new(5)));
        assert!(c.involves_attribute(AttributeHandle::new(4)));
        assert!(c.links(AttributeHandle::new(3), AttributeHandle::new(4)));
        assert!(!c.links(AttributeHandle::new(4), AttributeHandle::new(3)));
    }
}
