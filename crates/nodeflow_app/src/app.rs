// SPDX-License-Identifier: MIT OR Apache-2.0
//! Demo application: builds a small graph and walks through undo/redo.

use nodeflow_core::nodes::{AddNode, MultiplyNode};
use nodeflow_core::{
    register_builtin_nodes, register_core_events, register_core_types, AddConnectionCommand,
    ApplicationContext, CommandError, ConfigError, ConnectionAddedEvent, ConnectionRemovedEvent,
    CoreError, EngineConfig, EvaluationStats, EventBus, Scene, SetAttributeValueCommand,
    TypeRegistry,
};
use thiserror::Error;

/// Application errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Engine contract violation
    #[error("Engine error: {0}")]
    Core(#[from] CoreError),

    /// A command failed
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// The log filter directive is invalid
    #[error("Invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Result type for application operations
pub type Result<T> = std::result::Result<T, AppError>;

/// What the demo observed
#[derive(Debug, Clone, PartialEq)]
pub struct DemoSummary {
    /// Final value of the multiply node
    pub result: f32,
    /// Connections left after undoing the last one
    pub connections_after_undo: usize,
    /// Connections after redoing it
    pub connections_after_redo: usize,
    /// Scheduler counters of the scene
    pub stats: EvaluationStats,
}

/// Build the catalog shared by every scene
pub fn build_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    register_core_types(&registry);
    register_builtin_nodes(&registry);
    register_core_events(&registry);

    tracing::info!(
        "Registered {} types, {} node types, {} event categories",
        registry.type_descriptors().len(),
        registry.node_descriptors().len(),
        registry.event_categories().len()
    );
    registry
}

fn log_scene(scene: &Scene) {
    for (handle, node) in scene.nodes() {
        let name = scene.node_name(handle).unwrap_or_default();
        let values: Vec<String> = scene
            .node_attributes(handle)
            .into_iter()
            .filter_map(|attribute| scene.attribute(attribute))
            .map(|attribute| {
                let port = attribute
                    .descriptor()
                    .map(|d| d.name.clone())
                    .unwrap_or_default();
                let value = attribute.to_display_string().unwrap_or_default();
                format!("{port}={value}")
            })
            .collect();
        tracing::info!("{} [{}]: {}", name, node.type_name(), values.join(", "));
    }
}

/// Compute `(2 + 3) * 4` through two connected nodes, then undo and redo
/// the connection.
pub fn run(config: EngineConfig) -> Result<DemoSummary> {
    let registry = build_registry();
    let bus = EventBus::new();
    bus.subscribe::<ConnectionAddedEvent>(|e| {
        tracing::info!("Connection added: {} -> {}", e.from, e.to);
    });
    bus.subscribe::<ConnectionRemovedEvent>(|e| {
        tracing::info!("Connection removed: {} -> {}", e.from, e.to);
    });

    let mut context = ApplicationContext::new(registry, bus, config);
    context.create_new_document();
    let scene = context.create_new_scene()?;

    let sum = scene.add_node(AddNode::default())?;
    let product = scene.add_node(MultiplyNode::default())?;
    if let Some(handle) = scene.node_handle_of(&sum) {
        scene.set_node_name(handle, "Sum")?;
    }
    if let Some(handle) = scene.node_handle_of(&product) {
        scene.set_node_name(handle, "Product")?;
    }

    for (attribute, value) in [
        (sum.inputs.input1.handle()?, 2.0f32),
        (sum.inputs.input2.handle()?, 3.0),
        (product.inputs.input2.handle()?, 4.0),
    ] {
        context.execute(SetAttributeValueCommand::new(scene.clone(), attribute, value))?;
    }

    context.execute(AddConnectionCommand::new(
        scene.clone(),
        sum.outputs.result.handle()?,
        product.inputs.input1.handle()?,
    ))?;
    // connections carry no value change, so nothing re-evaluates on its own
    scene.evaluate()?;
    log_scene(&scene);

    let result = product.outputs.result.get()?;
    tracing::info!("(2 + 3) * 4 = {}", result);

    context.undo()?;
    let connections_after_undo = scene.connection_count();
    tracing::info!("After undo: {} connections", connections_after_undo);

    context.redo()?;
    scene.evaluate()?;
    let connections_after_redo = scene.connection_count();
    tracing::info!("After redo: {} connections", connections_after_redo);

    let stats = scene.evaluation_stats();
    tracing::info!(
        "{} evaluation passes, {} requests, {} dropped while evaluating",
        stats.passes,
        stats.requests,
        stats.dropped
    );

    Ok(DemoSummary {
        result,
        connections_after_undo,
        connections_after_redo,
        stats,
    })
}
