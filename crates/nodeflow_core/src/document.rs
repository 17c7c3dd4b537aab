// SPDX-License-Identifier: MIT OR Apache-2.0
//! Documents and the application context that owns them.

use crate::config::{EngineConfig, HistoryConfig, SceneConfig};
use crate::error::{CoreError, CoreResult};
use crate::event::EventBus;
use crate::history::{Command, CommandResult, UndoStack};
use crate::registry::TypeRegistry;
use crate::scene::Scene;
use std::sync::Arc;

/// A scene together with its edit history
#[derive(Debug, Default)]
pub struct Document {
    scene: Option<Arc<Scene>>,
    undo_stack: UndoStack,
}

impl Document {
    /// Create an empty document
    pub fn new(history: &HistoryConfig) -> Self {
        Self {
            scene: None,
            undo_stack: UndoStack::with_max_depth(history.max_depth),
        }
    }

    /// Replace the scene with an empty one
    pub fn create_new_scene(
        &mut self,
        registry: TypeRegistry,
        bus: EventBus,
        config: SceneConfig,
    ) -> Arc<Scene> {
        let scene = Arc::new(Scene::with_config(registry, bus, config));
        self.scene = Some(scene.clone());
        scene
    }

    /// Current scene, if one was created
    pub fn scene(&self) -> Option<Arc<Scene>> {
        self.scene.clone()
    }

    /// Edit history
    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo_stack
    }

    /// Edit history, mutable
    pub fn undo_stack_mut(&mut self) -> &mut UndoStack {
        &mut self.undo_stack
    }
}

/// Shared registries plus the open document
#[derive(Debug)]
pub struct ApplicationContext {
    registry: TypeRegistry,
    bus: EventBus,
    config: EngineConfig,
    current_document: Option<Document>,
}

impl ApplicationContext {
    /// Create a context with no open document
    pub fn new(registry: TypeRegistry, bus: EventBus, config: EngineConfig) -> Self {
        Self {
            registry,
            bus,
            config,
            current_document: None,
        }
    }

    /// Shared type registry
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Shared event bus
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a fresh document, closing the current one
    pub fn create_new_document(&mut self) -> &mut Document {
        tracing::debug!("Creating new document");
        self.current_document.insert(Document::new(&self.config.history))
    }

    /// The open document
    pub fn current_document(&self) -> CoreResult<&Document> {
        self.current_document.as_ref().ok_or(CoreError::NoActiveDocument)
    }

    /// The open document, mutable
    pub fn current_document_mut(&mut self) -> CoreResult<&mut Document> {
        self.current_document.as_mut().ok_or(CoreError::NoActiveDocument)
    }

    /// Give the open document an empty scene configured from the engine config
    pub fn create_new_scene(&mut self) -> CoreResult<Arc<Scene>> {
        let registry = self.registry.clone();
        let bus = self.bus.clone();
        let config = self.config.scene.clone();
        Ok(self
            .current_document_mut()?
            .create_new_scene(registry, bus, config))
    }

    /// Scene of the open document
    pub fn active_scene(&self) -> CoreResult<Arc<Scene>> {
        self.current_document()?
            .scene()
            .ok_or(CoreError::NoActiveScene)
    }

    /// Run `command` through the open document's history
    pub fn execute<C: Command + 'static>(&mut self, command: C) -> CommandResult<()> {
        self.current_document_mut()?
            .undo_stack_mut()
            .push(Box::new(command))
    }

    /// Undo in the open document
    pub fn undo(&mut self) -> CommandResult<bool> {
        self.current_document_mut()?.undo_stack_mut().undo()
    }

    /// Redo in the open document
    pub fn redo(&mut self) -> CommandResult<bool> {
        self.current_document_mut()?.undo_stack_mut().redo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::AddConnectionCommand;
    use crate::history::CommandError;
    use crate::nodes::{register_builtin_nodes, AddNode};
    use crate::types::register_core_types;

    fn context() -> ApplicationContext {
        let registry = TypeRegistry::new();
        register_core_types(&registry);
        register_builtin_nodes(&registry);
        ApplicationContext::new(registry, EventBus::new(), EngineConfig::default())
    }

    #[test]
    fn test_no_document() {
        let mut context = context();

        assert!(matches!(context.active_scene(), Err(CoreError::NoActiveDocument)));
        assert!(matches!(context.create_new_scene(), Err(CoreError::NoActiveDocument)));
        assert!(matches!(
            context.undo(),
            Err(CommandError::Core(CoreError::NoActiveDocument))
        ));
    }

    #[test]
    fn test_no_scene() {
        let mut context = context();
        context.create_new_document();

        assert!(matches!(context.active_scene(), Err(CoreError::NoActiveScene)));
    }

    #[test]
    fn test_execute_through_document() {
        let mut context = context();
        context.create_new_document();
        let scene = context.create_new_scene().unwrap();
        assert!(Arc::ptr_eq(&scene, &context.active_scene().unwrap()));

        let a = scene.add_node(AddNode::default()).unwrap();
        let b = scene.add_node(AddNode::default()).unwrap();
        a.inputs.input1.attribute().unwrap().set_value(2.0f32).unwrap();
        a.inputs.input2.attribute().unwrap().set_value(3.0f32).unwrap();
        b.inputs.input2.attribute().unwrap().set_value(4.0f32).unwrap();

        let from = a.outputs.result.handle().unwrap();
        let to = b.inputs.input1.handle().unwrap();
        context
            .execute(AddConnectionCommand::new(scene.clone(), from, to))
            .unwrap();
        scene.evaluate().unwrap();
        assert_eq!(b.outputs.result.get().unwrap(), 9.0);

        assert!(context.undo().unwrap());
        assert_eq!(scene.connection_count(), 0);
        assert!(context.redo().unwrap());
        assert_eq!(scene.connection_count(), 1);
        assert_eq!(context.current_document().unwrap().undo_stack().undo_depth(), 1);
    }

    #[test]
    fn test_history_depth_from_config() {
        let mut config = EngineConfig::default();
        config.history.max_depth = Some(3);
        let mut context = ApplicationContext::new(TypeRegistry::new(), EventBus::new(), config);

        let document = context.create_new_document();
        assert_eq!(document.undo_stack().stats().max_depth, Some(3));
    }

    #[test]
    fn test_new_document_replaces_old() {
        let mut context = context();
        context.create_new_document();
        context.create_new_scene().unwrap();

        context.create_new_document();
        assert!(context.current_document().unwrap().scene().is_none());
    }
}
