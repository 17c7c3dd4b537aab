// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type registry: the catalog of value types, ports, node types and events.
//!
//! The registry is an explicit context object. Clones share the same
//! catalog, so a registry built at startup can be handed to every scene
//! and document. Handle assignment happens under a single lock and is
//! therefore race-free.

use crate::attribute::Attribute;
use crate::descriptor::{
    AttributeDescriptor, AttributeSetter, EventDescriptor, NodeDescriptor, TypeDescriptor,
};
use crate::error::{CoreError, CoreResult};
use crate::event::Event;
use crate::handle::{
    AttributeDescriptorHandle, AttributeHandle, EventTypeHandle, HandleCounter,
    NodeDescriptorHandle, TypeHandle,
};
use crate::node::NodeType;
use crate::typed_attribute::PortField;
use crate::types::DataType;
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct RegistryState {
    type_handles: HashMap<TypeId, TypeHandle>,
    next_type: HandleCounter,
    types: IndexMap<TypeHandle, Arc<TypeDescriptor>>,

    attributes: IndexMap<AttributeDescriptorHandle, Arc<AttributeDescriptor>>,
    next_attribute: HandleCounter,

    node_handles: HashMap<TypeId, NodeDescriptorHandle>,
    nodes: IndexMap<NodeDescriptorHandle, Arc<NodeDescriptor>>,
    next_node: HandleCounter,

    event_handles: HashMap<TypeId, EventTypeHandle>,
    events: IndexMap<EventTypeHandle, Arc<EventDescriptor>>,
    next_event: HandleCounter,
}

impl RegistryState {
    fn type_handle(&mut self, type_id: TypeId) -> TypeHandle {
        let next = &mut self.next_type;
        *self
            .type_handles
            .entry(type_id)
            .or_insert_with(|| TypeHandle::new(next.next()))
    }

    fn register_attribute(&mut self, mut descriptor: AttributeDescriptor) -> Arc<AttributeDescriptor> {
        descriptor.handle = AttributeDescriptorHandle::new(self.next_attribute.next());
        let descriptor = Arc::new(descriptor);
        self.attributes.insert(descriptor.handle, descriptor.clone());
        descriptor
    }
}

/// Catalog mapping types to handles and erasure operations
#[derive(Clone, Default)]
pub struct TypeRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `T`, assigned on first request
    pub fn type_handle<T: Any>(&self) -> TypeHandle {
        let state = self.state.upgradable_read();
        if let Some(handle) = state.type_handles.get(&TypeId::of::<T>()) {
            return *handle;
        }
        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        state.type_handle(TypeId::of::<T>())
    }

    /// Register `T` under its Rust type name
    pub fn register_type<T: DataType>(&self) -> TypeHandle {
        self.register_type_named::<T>(type_name::<T>())
    }

    /// Register `T` under a custom name
    pub fn register_type_named<T: DataType>(&self, name: impl Into<String>) -> TypeHandle {
        let mut state = self.state.write();
        let handle = state.type_handle(TypeId::of::<T>());
        let descriptor = TypeDescriptor::of::<T>(handle, name);
        tracing::debug!("Registered type '{}' with handle {}", descriptor.name, handle);
        state.types.insert(handle, Arc::new(descriptor));
        handle
    }

    /// Descriptor for `T`
    pub fn type_descriptor<T: Any>(&self) -> CoreResult<Arc<TypeDescriptor>> {
        let state = self.state.read();
        let handle = state
            .type_handles
            .get(&TypeId::of::<T>())
            .copied()
            .unwrap_or(TypeHandle::INVALID);
        state
            .types
            .get(&handle)
            .cloned()
            .ok_or(CoreError::TypeNotRegistered(handle))
    }

    /// Descriptor for a type handle
    pub fn type_descriptor_by_handle(&self, handle: TypeHandle) -> CoreResult<Arc<TypeDescriptor>> {
        self.state
            .read()
            .types
            .get(&handle)
            .cloned()
            .ok_or(CoreError::TypeNotRegistered(handle))
    }

    /// All registered type descriptors in registration order
    pub fn type_descriptors(&self) -> Vec<Arc<TypeDescriptor>> {
        self.state.read().types.values().cloned().collect()
    }

    /// Build an unregistered port descriptor from a field accessor.
    ///
    /// The value type and role come from the field type, so the accessor
    /// is the only thing a node type has to name.
    pub fn attribute_descriptor<N, F, A>(&self, name: impl Into<String>, accessor: A) -> AttributeDescriptor
    where
        N: NodeType,
        F: PortField,
        A: Fn(&mut N) -> &mut F + Send + Sync + 'static,
    {
        let setter: AttributeSetter = Arc::new(move |node: &mut dyn Any, attribute: Arc<Attribute>| {
            let node = node
                .downcast_mut::<N>()
                .ok_or_else(|| CoreError::mismatch(type_name::<N>(), "another node type"))?;
            accessor(node).bind(attribute)
        });

        AttributeDescriptor::new(name, self.type_handle::<F::Value>(), F::ROLE).with_setter(setter)
    }

    /// Register a standalone port descriptor and return it with its handle
    pub fn register_attribute_descriptor(
        &self,
        descriptor: AttributeDescriptor,
    ) -> Arc<AttributeDescriptor> {
        self.state.write().register_attribute(descriptor)
    }

    /// Port descriptor by handle
    pub fn attribute_descriptor_by_handle(
        &self,
        handle: AttributeDescriptorHandle,
    ) -> CoreResult<Arc<AttributeDescriptor>> {
        self.state
            .read()
            .attributes
            .get(&handle)
            .cloned()
            .ok_or(CoreError::AttributeDescriptorNotRegistered(handle))
    }

    /// Allocate an attribute for a registered port descriptor
    pub fn create_attribute(
        &self,
        descriptor: AttributeDescriptorHandle,
        handle: AttributeHandle,
    ) -> CoreResult<Attribute> {
        let descriptor = self.attribute_descriptor_by_handle(descriptor)?;
        let value_type = self.type_descriptor_by_handle(descriptor.type_handle)?;
        Attribute::new(descriptor, value_type, handle)
    }

    /// Register node type `N` and each of its ports.
    ///
    /// `N::initialize` runs once; later calls return the cached handle.
    pub fn register_node_type<N: NodeType>(&self) -> NodeDescriptorHandle {
        if let Some(handle) = self.state.read().node_handles.get(&TypeId::of::<N>()) {
            return *handle;
        }

        // initialize() resolves type handles, so no lock may be held here
        let mut descriptor = N::initialize(self);

        let mut state = self.state.write();
        if let Some(handle) = state.node_handles.get(&TypeId::of::<N>()) {
            return *handle;
        }

        let handle = NodeDescriptorHandle::new(state.next_node.next());
        descriptor.handle = handle;
        let attributes = std::mem::take(&mut descriptor.attributes);
        descriptor.attributes = attributes
            .into_iter()
            .map(|attribute| state.register_attribute(attribute).as_ref().clone())
            .collect();

        tracing::debug!(
            "Registered node type '{}' with handle {} ({} attributes)",
            descriptor.type_name,
            handle,
            descriptor.attributes.len()
        );

        state.node_handles.insert(TypeId::of::<N>(), handle);
        state.nodes.insert(handle, Arc::new(descriptor));
        handle
    }

    /// Handle of node type `N`
    pub fn node_descriptor_handle<N: NodeType>(&self) -> CoreResult<NodeDescriptorHandle> {
        self.state
            .read()
            .node_handles
            .get(&TypeId::of::<N>())
            .copied()
            .ok_or_else(|| CoreError::NodeTypeNotRegistered(type_name::<N>().to_string()))
    }

    /// Descriptor of node type `N`
    pub fn node_descriptor<N: NodeType>(&self) -> CoreResult<Arc<NodeDescriptor>> {
        let handle = self.node_descriptor_handle::<N>()?;
        self.node_descriptor_by_handle(handle)
    }

    /// Node descriptor by handle
    pub fn node_descriptor_by_handle(
        &self,
        handle: NodeDescriptorHandle,
    ) -> CoreResult<Arc<NodeDescriptor>> {
        self.state
            .read()
            .nodes
            .get(&handle)
            .cloned()
            .ok_or(CoreError::NodeDescriptorNotRegistered(handle))
    }

    /// Node descriptors in registration order
    pub fn node_descriptors(&self) -> Vec<Arc<NodeDescriptor>> {
        self.state.read().nodes.values().cloned().collect()
    }

    /// Register event type `E` for introspection
    pub fn register_event_type<E: Event>(
        &self,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> EventTypeHandle {
        let mut state = self.state.write();
        if let Some(handle) = state.event_handles.get(&TypeId::of::<E>()) {
            return *handle;
        }

        let handle = EventTypeHandle::new(state.next_event.next());
        let descriptor = EventDescriptor {
            handle,
            name: name.into(),
            category: category.into(),
        };
        tracing::debug!(
            "Registered event '{}' in category '{}'",
            descriptor.name,
            descriptor.category
        );
        state.event_handles.insert(TypeId::of::<E>(), handle);
        state.events.insert(handle, Arc::new(descriptor));
        handle
    }

    /// Descriptor of event type `E`
    pub fn event_descriptor<E: Event>(&self) -> Option<Arc<EventDescriptor>> {
        let state = self.state.read();
        state
            .event_handles
            .get(&TypeId::of::<E>())
            .and_then(|handle| state.events.get(handle))
            .cloned()
    }

    /// Event descriptor by handle
    pub fn event_descriptor_by_handle(&self, handle: EventTypeHandle) -> Option<Arc<EventDescriptor>> {
        self.state.read().events.get(&handle).cloned()
    }

    /// Events registered under a category
    pub fn event_types_in_category(&self, category: &str) -> Vec<Arc<EventDescriptor>> {
        self.state
            .read()
            .events
            .values()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }

    /// Distinct event categories in registration order
    pub fn event_categories(&self) -> Vec<String> {
        let state = self.state.read();
        let mut categories: Vec<String> = Vec::new();
        for event in state.events.values() {
            if !categories.contains(&event.category) {
                categories.push(event.category.clone());
            }
        }
        categories
    }

    /// Reset every map and counter.
    ///
    /// All previously returned handles become meaningless. Meant for test
    /// isolation when a registry is shared.
    pub fn clear(&self) {
        *self.state.write() = RegistryState::default();
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("TypeRegistry")
            .field("types", &state.types.len())
            .field("attributes", &state.attributes.len())
            .field("nodes", &state.nodes.len())
            .field("events", &state.events.len())
            .finish()
    }
}
