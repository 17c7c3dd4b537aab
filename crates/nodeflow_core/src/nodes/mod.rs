// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types.

pub mod math;

pub use math::{AddNode, BinaryInputs, BinaryOutputs, DivideNode, MultiplyNode, SubtractNode};

use crate::registry::TypeRegistry;

/// Register every built-in node type
pub fn register_builtin_nodes(registry: &TypeRegistry) {
    registry.register_node_type::<AddNode>();
    registry.register_node_type::<SubtractNode>();
    registry.register_node_type::<MultiplyNode>();
    registry.register_node_type::<DivideNode>();
}
