// SPDX-License-Identifier: MIT OR Apache-2.0
//! The scene: nodes, their attributes and the connections between them.
//!
//! A scene owns every attribute of every node it holds. Nodes reach their
//! attributes through typed views bound at [`Scene::add_node`], so a scene
//! can be evaluated without locking any node. Writes to an attribute publish
//! an [`AttributeEvent`] scoped to the scene; with `auto_evaluate` enabled
//! the scene answers each one with a full evaluation pass.

use crate::attribute::{Attribute, AttributeHandle};
use crate::config::{FanInPolicy, SceneConfig};
use crate::connection::Connection;
use crate::descriptor::{AttributeDescriptor, NodeDescriptor};
use crate::error::{CoreError, CoreResult};
use crate::evaluation::{
    topological_order, EvaluationRequest, EvaluationStats, Scheduler, SchedulerState,
};
use crate::event::{AttributeEvent, AttributeMessage, EventBus, SceneId, SubscriptionId};
use crate::handle::{HandleCounter, NodeDescriptorHandle};
use crate::node::{Node, NodeHandle, NodeType, Status};
use crate::registry::TypeRegistry;
use crate::typed_attribute::{InputAttribute, OutputAttribute};
use crate::types::DataType;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::sync::{Arc, Weak};

struct NodeEntry {
    name: String,
    descriptor: NodeDescriptorHandle,
    node: Arc<dyn Node>,
    any: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct SceneGraph {
    nodes: IndexMap<NodeHandle, NodeEntry>,
    attributes: IndexMap<AttributeHandle, Arc<Attribute>>,
    /// Owning node of each attribute
    owners: IndexMap<AttributeHandle, NodeHandle>,
    connections: Vec<Connection>,
    next_node: HandleCounter,
    next_attribute: HandleCounter,
}

impl SceneGraph {
    fn incoming(&self, node: NodeHandle) -> CoreResult<Vec<(Arc<Attribute>, Arc<Attribute>)>> {
        self.connections
            .iter()
            .filter(|c| c.target_node == node)
            .map(|c| {
                match (
                    self.attributes.get(&c.source_attribute),
                    self.attributes.get(&c.target_attribute),
                ) {
                    (Some(source), Some(target)) => Ok((source.clone(), target.clone())),
                    _ => Err(CoreError::DanglingConnection {
                        source_attribute: c.source_attribute,
                        target_attribute: c.target_attribute,
                    }),
                }
            })
            .collect()
    }

    fn has_inbound(&self, attribute: AttributeHandle) -> bool {
        self.connections.iter().any(|c| c.target_attribute == attribute)
    }

    fn has_connection(&self, from: AttributeHandle, to: AttributeHandle) -> bool {
        self.connections.iter().any(|c| c.links(from, to))
    }
}

struct PassStep {
    handle: NodeHandle,
    name: String,
    node: Arc<dyn Node>,
    incoming: Vec<(Arc<Attribute>, Arc<Attribute>)>,
}

struct SceneInner {
    id: SceneId,
    registry: TypeRegistry,
    bus: EventBus,
    config: SceneConfig,
    graph: RwLock<SceneGraph>,
    scheduler: Mutex<Scheduler>,
}

impl SceneInner {
    fn request_evaluation(&self, request: EvaluationRequest) -> CoreResult<()> {
        if !self.scheduler.lock().enqueue(request) {
            return Ok(());
        }

        loop {
            let Some(request) = self.scheduler.lock().begin_pass() else {
                return Ok(());
            };

            tracing::trace!("Scene {:?} evaluating for {:?}", self.id, request);
            let mut failed = 0;
            let result = self.run_pass(&mut failed);
            self.scheduler.lock().end_pass(failed);
            result?;
        }
    }

    fn plan_pass(&self) -> CoreResult<Vec<PassStep>> {
        let graph = self.graph.read();
        let handles: Vec<NodeHandle> = graph.nodes.keys().copied().collect();
        let ordering = topological_order(&handles, &graph.connections);
        if !ordering.excluded.is_empty() {
            tracing::warn!(
                "Cycle detected, skipping nodes {:?}",
                ordering.excluded.iter().map(|h| h.value()).collect::<Vec<_>>()
            );
        }

        ordering
            .order
            .into_iter()
            .filter_map(|handle| graph.nodes.get(&handle).map(|entry| (handle, entry)))
            .map(|(handle, entry)| -> CoreResult<PassStep> {
                Ok(PassStep {
                    handle,
                    name: entry.name.clone(),
                    node: entry.node.clone(),
                    incoming: graph.incoming(handle)?,
                })
            })
            .collect()
    }

    /// Propagate and compute every ordered node; no lock is held meanwhile
    fn run_pass(&self, failed: &mut u64) -> CoreResult<()> {
        for step in self.plan_pass()? {
            for (source, target) in &step.incoming {
                target.copy_data_from(source)?;
            }

            if step.node.compute() != Status::Ok {
                *failed += 1;
                // the node reports its own error through Status::from_result
                tracing::debug!(
                    "Node {} ({}, {}) failed to compute",
                    step.handle,
                    step.name,
                    step.node.type_name()
                );
            }
        }
        Ok(())
    }
}

/// A graph of nodes evaluated together
pub struct Scene {
    inner: Arc<SceneInner>,
    subscription: SubscriptionId,
}

impl Scene {
    /// Create an empty scene with the default configuration
    pub fn new(registry: TypeRegistry, bus: EventBus) -> Self {
        Self::with_config(registry, bus, SceneConfig::default())
    }

    /// Create an empty scene
    pub fn with_config(registry: TypeRegistry, bus: EventBus, config: SceneConfig) -> Self {
        let id = SceneId::new();
        let inner = Arc::new(SceneInner {
            id,
            registry,
            bus: bus.clone(),
            config,
            graph: RwLock::new(SceneGraph::default()),
            scheduler: Mutex::new(Scheduler::default()),
        });

        let weak: Weak<SceneInner> = Arc::downgrade(&inner);
        let subscription = bus.subscribe::<AttributeEvent>(move |event| {
            if event.message != AttributeMessage::Changed || event.scope != Some(id) {
                return;
            }
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !inner.config.auto_evaluate {
                return;
            }
            if let Err(e) =
                inner.request_evaluation(EvaluationRequest::AttributeChanged(event.attribute))
            {
                tracing::error!("Evaluation after change of attribute {} failed: {}", event.attribute, e);
            }
        });

        tracing::debug!("Created scene {:?}", id);
        Self { inner, subscription }
    }

    /// Identity used to scope this scene's events
    pub fn id(&self) -> SceneId {
        self.inner.id
    }

    /// Registry the scene resolves descriptors from
    pub fn registry(&self) -> &TypeRegistry {
        &self.inner.registry
    }

    /// Bus the scene's attributes publish on
    pub fn event_bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Scene configuration
    pub fn config(&self) -> &SceneConfig {
        &self.inner.config
    }

    /// Add a node, allocating and binding one attribute per declared port.
    ///
    /// `N` must have been registered with the scene's registry.
    pub fn add_node<N: NodeType>(&self, mut node: N) -> CoreResult<Arc<N>> {
        let registry = &self.inner.registry;
        let descriptor = registry.node_descriptor::<N>()?;

        let mut graph = self.inner.graph.write();
        let handle = NodeHandle::new(graph.next_node.next());

        let mut attributes = Vec::with_capacity(descriptor.attributes.len());
        for port in &descriptor.attributes {
            let port = registry.attribute_descriptor_by_handle(port.handle)?;
            let attribute_handle = AttributeHandle::new(graph.next_attribute.next());
            let attribute = Arc::new(
                registry
                    .create_attribute(port.handle, attribute_handle)?
                    .with_event_bus(self.inner.bus.clone(), Some(self.inner.id)),
            );
            if let Some(setter) = &port.setter {
                setter(&mut node as &mut dyn Any, attribute.clone())?;
            }
            attributes.push(attribute);
        }

        let node = Arc::new(node);
        let name = format!("Node {}", handle);
        tracing::debug!(
            "Added {} '{}' with {} attributes",
            descriptor.type_name,
            name,
            attributes.len()
        );

        for attribute in attributes {
            let attribute_handle = attribute.handle()?;
            graph.owners.insert(attribute_handle, handle);
            graph.attributes.insert(attribute_handle, attribute);
        }
        graph.nodes.insert(
            handle,
            NodeEntry {
                name,
                descriptor: descriptor.handle,
                node: node.clone(),
                any: node.clone(),
            },
        );
        Ok(node)
    }

    /// Remove a node with its attributes and every connection touching it
    pub fn remove_node(&self, handle: NodeHandle) -> CoreResult<()> {
        let mut graph = self.inner.graph.write();
        let entry = graph
            .nodes
            .shift_remove(&handle)
            .ok_or(CoreError::UnknownNode(handle))?;

        let owned: Vec<AttributeHandle> = graph
            .owners
            .iter()
            .filter(|(_, owner)| **owner == handle)
            .map(|(attribute, _)| *attribute)
            .collect();
        for attribute in &owned {
            graph.owners.shift_remove(attribute);
            graph.attributes.shift_remove(attribute);
        }

        let before = graph.connections.len();
        graph.connections.retain(|c| !c.involves_node(handle));
        tracing::debug!(
            "Removed '{}' with {} attributes and {} connections",
            entry.name,
            owned.len(),
            before - graph.connections.len()
        );
        Ok(())
    }

    /// Connect a node's output view to another node's input view.
    ///
    /// Both views must be bound and owned by the given nodes. Under
    /// [`FanInPolicy::Reject`] an input accepts one inbound connection.
    pub fn connect<A, B, T>(
        &self,
        from_node: &Arc<A>,
        from: &OutputAttribute<T>,
        to_node: &Arc<B>,
        to: &InputAttribute<T>,
    ) -> CoreResult<()>
    where
        A: Node,
        B: Node,
        T: DataType,
    {
        let source_node = self
            .node_handle_of(from_node)
            .ok_or(CoreError::UnknownNode(NodeHandle::INVALID))?;
        let target_node = self
            .node_handle_of(to_node)
            .ok_or(CoreError::UnknownNode(NodeHandle::INVALID))?;
        let source_attribute = from.handle()?;
        let target_attribute = to.handle()?;

        let mut graph = self.inner.graph.write();
        for (attribute, node) in [(source_attribute, source_node), (target_attribute, target_node)] {
            match graph.owners.get(&attribute) {
                Some(owner) if *owner == node => {}
                Some(_) => return Err(CoreError::AttributeNotOwned { attribute, node }),
                None => return Err(CoreError::UnknownAttribute(attribute)),
            }
        }

        if graph.has_connection(source_attribute, target_attribute) {
            return Ok(());
        }
        if self.inner.config.fan_in == FanInPolicy::Reject && graph.has_inbound(target_attribute) {
            return Err(CoreError::InputAlreadyConnected(target_attribute));
        }

        graph.connections.push(Connection::new(
            source_node,
            source_attribute,
            target_node,
            target_attribute,
        ));
        tracing::debug!("Connected {} -> {}", source_attribute, target_attribute);
        Ok(())
    }

    /// Connect two attributes by handle.
    ///
    /// Unknown handles, mismatched value types, exact duplicates and fan-in
    /// rejections are logged and skipped. Returns whether a connection was
    /// inserted.
    pub fn add_connection(&self, from: AttributeHandle, to: AttributeHandle) -> bool {
        let mut graph = self.inner.graph.write();

        let (Some(source_node), Some(target_node)) =
            (graph.owners.get(&from).copied(), graph.owners.get(&to).copied())
        else {
            tracing::error!("Cannot connect {} -> {}: unknown attribute", from, to);
            return false;
        };

        let types = (
            graph.attributes.get(&from).and_then(|a| a.type_handle().ok()),
            graph.attributes.get(&to).and_then(|a| a.type_handle().ok()),
        );
        if types.0.is_none() || types.0 != types.1 {
            tracing::error!("Cannot connect {} -> {}: value types differ", from, to);
            return false;
        }

        if graph.has_connection(from, to) {
            tracing::debug!("Connection {} -> {} already exists", from, to);
            return false;
        }
        if self.inner.config.fan_in == FanInPolicy::Reject && graph.has_inbound(to) {
            tracing::error!("Cannot connect {} -> {}: input already connected", from, to);
            return false;
        }

        graph
            .connections
            .push(Connection::new(source_node, from, target_node, to));
        tracing::debug!("Connected {} -> {}", from, to);
        true
    }

    /// Remove every connection from `from` to `to`; returns whether any existed
    pub fn remove_connection(&self, from: AttributeHandle, to: AttributeHandle) -> bool {
        let mut graph = self.inner.graph.write();
        let before = graph.connections.len();
        graph.connections.retain(|c| !c.links(from, to));
        let removed = graph.connections.len() != before;
        if removed {
            tracing::debug!("Disconnected {} -> {}", from, to);
        }
        removed
    }

    /// Nodes in evaluation order; nodes caught in cycles are left out
    pub fn topological_sort(&self) -> Vec<NodeHandle> {
        let graph = self.inner.graph.read();
        let handles: Vec<NodeHandle> = graph.nodes.keys().copied().collect();
        let ordering = topological_order(&handles, &graph.connections);
        if !ordering.excluded.is_empty() {
            tracing::warn!("{} nodes excluded by cycles", ordering.excluded.len());
        }
        ordering.order
    }

    /// Propagate values along connections and recompute every node.
    ///
    /// A call made while a pass is running does nothing.
    pub fn evaluate(&self) -> CoreResult<()> {
        self.inner.request_evaluation(EvaluationRequest::Explicit)
    }

    /// Copy the value of every inbound connection into `node`'s inputs
    pub fn propagate_connections_to_node(&self, node: NodeHandle) -> CoreResult<()> {
        let incoming = {
            let graph = self.inner.graph.read();
            if !graph.nodes.contains_key(&node) {
                return Err(CoreError::UnknownNode(node));
            }
            graph.incoming(node)?
        };
        for (source, target) in &incoming {
            target.copy_data_from(source)?;
        }
        Ok(())
    }

    /// Scheduler counters
    pub fn evaluation_stats(&self) -> EvaluationStats {
        self.inner.scheduler.lock().stats()
    }

    /// Whether a pass is running
    pub fn scheduler_state(&self) -> SchedulerState {
        self.inner.scheduler.lock().state()
    }

    /// Handle of a node instance previously returned by [`Scene::add_node`]
    pub fn node_handle_of<N: Node>(&self, node: &Arc<N>) -> Option<NodeHandle> {
        self.inner
            .graph
            .read()
            .nodes
            .iter()
            .find(|(_, entry)| std::ptr::addr_eq(Arc::as_ptr(&entry.node), Arc::as_ptr(node)))
            .map(|(handle, _)| *handle)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> Vec<(NodeHandle, Arc<dyn Node>)> {
        self.inner
            .graph
            .read()
            .nodes
            .iter()
            .map(|(handle, entry)| (*handle, entry.node.clone()))
            .collect()
    }

    /// Node handles in insertion order
    pub fn node_handles(&self) -> Vec<NodeHandle> {
        self.inner.graph.read().nodes.keys().copied().collect()
    }

    /// A node by handle
    pub fn node(&self, handle: NodeHandle) -> Option<Arc<dyn Node>> {
        self.inner.graph.read().nodes.get(&handle).map(|e| e.node.clone())
    }

    /// A node by handle, as its concrete type
    pub fn node_as<N: Node>(&self, handle: NodeHandle) -> Option<Arc<N>> {
        let any = self.inner.graph.read().nodes.get(&handle)?.any.clone();
        any.downcast::<N>().ok()
    }

    /// Display name of a node
    pub fn node_name(&self, handle: NodeHandle) -> Option<String> {
        self.inner.graph.read().nodes.get(&handle).map(|e| e.name.clone())
    }

    /// Rename a node
    pub fn set_node_name(&self, handle: NodeHandle, name: impl Into<String>) -> CoreResult<()> {
        let mut graph = self.inner.graph.write();
        let entry = graph.nodes.get_mut(&handle).ok_or(CoreError::UnknownNode(handle))?;
        entry.name = name.into();
        Ok(())
    }

    /// Descriptor of a node's type
    pub fn node_descriptor(&self, handle: NodeHandle) -> CoreResult<Arc<NodeDescriptor>> {
        let descriptor = self
            .inner
            .graph
            .read()
            .nodes
            .get(&handle)
            .map(|e| e.descriptor)
            .ok_or(CoreError::UnknownNode(handle))?;
        self.inner.registry.node_descriptor_by_handle(descriptor)
    }

    /// All attributes in creation order
    pub fn attributes(&self) -> Vec<Arc<Attribute>> {
        self.inner.graph.read().attributes.values().cloned().collect()
    }

    /// An attribute by handle
    pub fn attribute(&self, handle: AttributeHandle) -> Option<Arc<Attribute>> {
        self.inner.graph.read().attributes.get(&handle).cloned()
    }

    /// Node owning an attribute
    pub fn attribute_owner(&self, handle: AttributeHandle) -> Option<NodeHandle> {
        self.inner.graph.read().owners.get(&handle).copied()
    }

    /// Attributes owned by `node`, in declaration order
    pub fn node_attributes(&self, node: NodeHandle) -> Vec<AttributeHandle> {
        self.inner
            .graph
            .read()
            .owners
            .iter()
            .filter(|(_, owner)| **owner == node)
            .map(|(attribute, _)| *attribute)
            .collect()
    }

    /// A node's attribute by port name
    pub fn node_attribute(&self, node: NodeHandle, name: &str) -> Option<Arc<Attribute>> {
        self.node_attributes(node)
            .into_iter()
            .filter_map(|handle| self.attribute(handle))
            .find(|a| a.descriptor().is_ok_and(|d| d.name == name))
    }

    /// Port descriptor of an attribute
    pub fn attribute_descriptor(&self, handle: AttributeHandle) -> CoreResult<Arc<AttributeDescriptor>> {
        self.attribute(handle)
            .ok_or(CoreError::UnknownAttribute(handle))?
            .descriptor()
    }

    /// All connections in insertion order
    pub fn connections(&self) -> Vec<Connection> {
        self.inner.graph.read().connections.clone()
    }

    /// Read an attribute value
    pub fn value<T: DataType>(&self, handle: AttributeHandle) -> CoreResult<T> {
        self.attribute(handle)
            .ok_or(CoreError::UnknownAttribute(handle))?
            .value::<T>()
    }

    /// Write an attribute value
    pub fn set_value<T: DataType>(&self, handle: AttributeHandle, value: T) -> CoreResult<()> {
        self.attribute(handle)
            .ok_or(CoreError::UnknownAttribute(handle))?
            .set_value(value)
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.inner.graph.read().nodes.len()
    }

    /// Number of attributes
    pub fn attribute_count(&self) -> usize {
        self.inner.graph.read().attributes.len()
    }

    /// Number of connections
    pub fn connection_count(&self) -> usize {
        self.inner.graph.read().connections.len()
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.inner.bus.unsubscribe(self.subscription);
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let graph = self.inner.graph.read();
        f.debug_struct("Scene")
            .field("id", &self.inner.id)
            .field("nodes", &graph.nodes.len())
            .field("attributes", &graph.attributes.len())
            .field("connections", &graph.connections.len())
            .finish()
    }
}
