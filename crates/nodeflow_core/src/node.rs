// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the dataflow graph.

use crate::descriptor::NodeDescriptor;
use crate::error::CoreResult;
use crate::registry::TypeRegistry;
use serde::{Deserialize, Serialize};
use std::any::Any;

pub use crate::handle::NodeHandle;

/// Outcome of a node computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// Outputs are up to date
    #[default]
    Ok,
    /// The computation failed; outputs keep their previous values
    Error,
}

impl Status {
    /// Map a fallible computation to a status, logging the failure
    pub fn from_result<T>(result: CoreResult<T>, node: &str) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(e) => {
                tracing::error!("{} failed to compute: {}", node, e);
                Status::Error
            }
        }
    }

    /// Whether this is [`Status::Ok`]
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

/// A unit of computation living in a scene.
///
/// Ports are typed views, so `compute` reads inputs and writes outputs
/// through `&self`.
pub trait Node: Any + Send + Sync {
    /// Recompute outputs from inputs.
    ///
    /// A failing node logs its own error, usually via [`Status::from_result`].
    fn compute(&self) -> Status;

    /// Name used in logs
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A node type that can be registered.
///
/// `initialize` builds the port table once per registry; the scene uses it
/// to allocate and bind one attribute per declared port.
pub trait NodeType: Node + Sized {
    /// Describe this node type and its ports
    fn initialize(registry: &TypeRegistry) -> NodeDescriptor;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    struct Noop;

    impl Node for Noop {
        fn compute(&self) -> Status {
            Status::Ok
        }
    }

    #[test]
    fn test_status_from_result() {
        assert_eq!(Status::from_result(Ok(1), "test"), Status::Ok);
        assert_eq!(
            Status::from_result::<()>(Err(CoreError::DivisionByZero), "test"),
            Status::Error
        );
        assert!(Status::default().is_ok());
    }

    #[test]
    fn test_default_type_name() {
        assert!(Noop.type_name().ends_with("Noop"));
    }
}
