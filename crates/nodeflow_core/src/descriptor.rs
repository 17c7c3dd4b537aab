// SPDX-License-Identifier: MIT OR Apache-2.0
//! Descriptors for registered types, ports, nodes and events.

use crate::attribute::Attribute;
use crate::error::CoreResult;
use crate::handle::{AttributeDescriptorHandle, EventTypeHandle, NodeDescriptorHandle, TypeHandle};
use crate::types::DataType;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A boxed value whose concrete type is only known through its descriptor
pub type ErasedValue = Box<dyn Any + Send + Sync>;

/// Erasure vtable for one registered value type.
///
/// Registered once per type and looked up by handle for as long as the
/// registry lives.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Handle of the type
    pub handle: TypeHandle,
    /// Registered name
    pub name: String,
    /// Size of the value in bytes
    pub size: usize,
    /// Rust identity of the value type
    pub type_id: TypeId,
    /// Allocate a default value
    pub create: fn() -> ErasedValue,
    /// Clone `src` into `dst`; false when either side has another type
    pub copy: fn(&mut ErasedValue, &ErasedValue) -> bool,
    /// Release a value
    pub destroy: fn(ErasedValue),
    /// Render a value as text
    pub describe: fn(&ErasedValue) -> String,
}

impl TypeDescriptor {
    /// Build the vtable for `T`
    pub fn of<T: DataType>(handle: TypeHandle, name: impl Into<String>) -> Self {
        Self {
            handle,
            name: name.into(),
            size: std::mem::size_of::<T>(),
            type_id: TypeId::of::<T>(),
            create: create_value::<T>,
            copy: copy_value::<T>,
            destroy: destroy_value::<T>,
            describe: describe_value::<T>,
        }
    }

    /// Whether this descriptor was built for `T`
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

fn create_value<T: DataType>() -> ErasedValue {
    Box::new(T::default())
}

fn copy_value<T: DataType>(dst: &mut ErasedValue, src: &ErasedValue) -> bool {
    match ((**dst).downcast_mut::<T>(), (**src).downcast_ref::<T>()) {
        (Some(dst), Some(src)) => {
            dst.clone_from(src);
            true
        }
        _ => false,
    }
}

fn destroy_value<T: DataType>(value: ErasedValue) {
    drop(value);
}

fn describe_value<T: DataType>(value: &ErasedValue) -> String {
    (**value)
        .downcast_ref::<T>()
        .map_or_else(|| "unsupported".to_string(), DataType::describe)
}

/// How a port is used by its node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttributeRole {
    /// Read by the node
    #[default]
    Input,
    /// Written by the node
    Output,
    /// Read and written (pass-through)
    InOut,
}

/// Installs a freshly created attribute into a typed field of a node instance
pub type AttributeSetter =
    Arc<dyn Fn(&mut dyn Any, Arc<Attribute>) -> CoreResult<()> + Send + Sync>;

/// A port declared by a node type
#[derive(Clone, Default)]
pub struct AttributeDescriptor {
    /// Handle assigned on registration, invalid before
    pub handle: AttributeDescriptorHandle,
    /// Value type of the port
    pub type_handle: TypeHandle,
    /// Port name
    pub name: String,
    /// Port role
    pub role: AttributeRole,
    /// Field binder, absent for free-standing attributes
    pub setter: Option<AttributeSetter>,
}

impl AttributeDescriptor {
    /// Create an unregistered descriptor without a setter
    pub fn new(name: impl Into<String>, type_handle: TypeHandle, role: AttributeRole) -> Self {
        Self {
            handle: AttributeDescriptorHandle::INVALID,
            type_handle,
            name: name.into(),
            role,
            setter: None,
        }
    }

    /// Attach a field binder
    pub fn with_setter(mut self, setter: AttributeSetter) -> Self {
        self.setter = Some(setter);
        self
    }
}

impl fmt::Debug for AttributeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("handle", &self.handle)
            .field("type_handle", &self.type_handle)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("has_setter", &self.setter.is_some())
            .finish()
    }
}

/// A node type and the ports it declares
#[derive(Debug, Clone, Default)]
pub struct NodeDescriptor {
    /// Handle assigned on registration
    pub handle: NodeDescriptorHandle,
    /// Node type name
    pub type_name: String,
    /// Declared ports in declaration order
    pub attributes: Vec<AttributeDescriptor>,
}

impl NodeDescriptor {
    /// Create a descriptor with no ports
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            handle: NodeDescriptorHandle::INVALID,
            type_name: type_name.into(),
            attributes: Vec::new(),
        }
    }

    /// Append a port
    pub fn with_attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Find a port by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Ports with the given role
    pub fn attributes_with_role(&self, role: AttributeRole) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.iter().filter(move |a| a.role == role)
    }
}

/// A registered event type, kept for introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Handle of the event type
    pub handle: EventTypeHandle,
    /// Event name
    pub name: String,
    /// Grouping used by tooling
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl DataType for Point {}

    #[test]
    fn test_vtable_create_and_copy() {
        let desc = TypeDescriptor::of::<Point>(TypeHandle::new(1), "point");
        assert!(desc.is::<Point>());
        assert!(!desc.is::<i32>());

        let mut dst = (desc.create)();
        let src: ErasedValue = Box::new(Point { x: 1, y: 2 });
        assert!((desc.copy)(&mut dst, &src));
        assert_eq!((*dst).downcast_ref::<Point>(), Some(&Point { x: 1, y: 2 }));
        assert_eq!((desc.describe)(&dst), "unsupported");
        (desc.destroy)(dst);
    }

    #[test]
    fn test_vtable_rejects_foreign_values() {
        let desc = TypeDescriptor::of::<f32>(TypeHandle::new(1), "float");
        let mut dst = (desc.create)();
        let src: ErasedValue = Box::new(7i32);
        assert!(!(desc.copy)(&mut dst, &src));
        assert_eq!((desc.describe)(&dst), "0");
    }

    #[test]
    fn test_node_descriptor_lookup() {
        let desc = NodeDescriptor::new("Test")
            .with_attribute(AttributeDescriptor::new("a", TypeHandle::new(1), AttributeRole::Input))
            .with_attribute(AttributeDescriptor::new("b", TypeHandle::new(1), AttributeRole::Output));

        assert_eq!(desc.attribute("b").map(|a| a.role), Some(AttributeRole::Output));
        assert!(desc.attribute("c").is_none());
        assert_eq!(desc.attributes_with_role(AttributeRole::Input).count(), 1);
    }
}
