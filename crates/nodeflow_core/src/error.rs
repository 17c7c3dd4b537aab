// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types shared across the core.

use crate::handle::{
    AttributeDescriptorHandle, AttributeHandle, NodeDescriptorHandle, NodeHandle, TypeHandle,
};

/// Contract violations raised by the core.
///
/// These are programming errors (wrong type parameter, wrong order of
/// operations) and are returned rather than absorbed. Structural graph
/// anomalies are logged instead and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No type descriptor exists for the handle; invalid when the type
    /// never received one
    #[error("Type not registered with handle: {0}")]
    TypeNotRegistered(TypeHandle),

    /// No node descriptor exists for the node type
    #[error("Node type not registered: {0}")]
    NodeTypeNotRegistered(String),

    /// No node descriptor exists for the handle
    #[error("Node descriptor not registered with handle: {0}")]
    NodeDescriptorNotRegistered(NodeDescriptorHandle),

    /// No attribute descriptor exists for the handle
    #[error("Attribute descriptor not registered with handle: {0}")]
    AttributeDescriptorNotRegistered(AttributeDescriptorHandle),

    /// The requested value type does not match the stored one
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Type stored in the cell
        expected: String,
        /// Type the caller asked for
        found: String,
    },

    /// The attribute cell was never allocated
    #[error("Null data in attribute")]
    NullData,

    /// A typed view was built from, or used without, an attribute
    #[error("Null attribute in typed view")]
    NullAttribute,

    /// The handle is the invalid handle
    #[error("Invalid handle")]
    InvalidHandle,

    /// Division by a zero-valued input
    #[error("Division by zero")]
    DivisionByZero,

    /// An integer operation left the range of its type
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    /// The node is not part of the scene
    #[error("Unknown node: {0}")]
    UnknownNode(NodeHandle),

    /// The attribute is not part of the scene
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(AttributeHandle),

    /// The attribute exists but belongs to another node
    #[error("Attribute {attribute} is not owned by node {node}")]
    AttributeNotOwned {
        /// Offending attribute
        attribute: AttributeHandle,
        /// Node it was expected on
        node: NodeHandle,
    },

    /// The target input already has an inbound connection
    #[error("Input already connected: {0}")]
    InputAlreadyConnected(AttributeHandle),

    /// A connection refers to an attribute that no longer exists
    #[error("Dangling connection {source_attribute} -> {target_attribute}")]
    DanglingConnection {
        /// Source end
        source_attribute: AttributeHandle,
        /// Target end
        target_attribute: AttributeHandle,
    },

    /// No document is open
    #[error("No active document set in application context")]
    NoActiveDocument,

    /// The document has no scene
    #[error("No active scene in current document")]
    NoActiveScene,
}

impl CoreError {
    /// Build a mismatch error from two type names
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;
