// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node-based dataflow engine.
//!
//! This crate provides the runtime beneath a node editor:
//! - A type registry erasing value types behind handles
//! - Typed attribute views binding node fields to shared storage
//! - Scenes holding nodes and connections, evaluated in topological order
//! - An event bus decoupling value changes from re-evaluation
//! - Undo/redo through reversible commands
//!
//! ## Architecture
//!
//! Registries are explicit context objects: a [`TypeRegistry`] and an
//! [`EventBus`] are created at startup and handed to every [`Scene`].
//! A scene allocates one [`Attribute`] per declared port when a node is
//! added and binds it into the node's typed fields. Writing an attribute
//! publishes an [`AttributeEvent`]; the owning scene answers with an
//! evaluation pass that propagates values along connections and calls
//! each node's [`Node::compute`].

pub mod attribute;
pub mod commands;
pub mod config;
pub mod connection;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod evaluation;
pub mod event;
pub mod handle;
pub mod history;
pub mod node;
pub mod nodes;
pub mod registry;
pub mod scene;
pub mod typed_attribute;
pub mod types;

pub use attribute::Attribute;
pub use commands::{AddConnectionCommand, SetAttributeValueCommand};
pub use config::{ConfigError, EngineConfig, FanInPolicy, HistoryConfig, SceneConfig};
pub use connection::Connection;
pub use descriptor::{
    AttributeDescriptor, AttributeRole, EventDescriptor, NodeDescriptor, TypeDescriptor,
};
pub use document::{ApplicationContext, Document};
pub use error::{CoreError, CoreResult};
pub use evaluation::{EvaluationRequest, EvaluationStats, SchedulerState};
pub use event::{
    register_core_events, AttributeEvent, AttributeMessage, ConnectionAddedEvent,
    ConnectionRemovedEvent, Event, EventBus, SceneId,
};
pub use handle::{
    AttributeDescriptorHandle, AttributeHandle, EventTypeHandle, NodeDescriptorHandle,
    NodeHandle, SubscriptionId, TypeHandle,
};
pub use history::{Command, CommandError, CommandResult, UndoStack};
pub use node::{Node, NodeType, Status};
pub use nodes::register_builtin_nodes;
pub use registry::TypeRegistry;
pub use scene::Scene;
pub use typed_attribute::{InputAttribute, OutputAttribute, PortField, TypedAttribute};
pub use types::{register_core_types, CheckedArithmetic, DataType};
