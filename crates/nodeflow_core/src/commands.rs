// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undoable scene edits.

use crate::attribute::AttributeHandle;
use crate::event::{AttributeEvent, AttributeMessage, ConnectionAddedEvent, ConnectionRemovedEvent};
use crate::history::{Command, CommandResult};
use crate::scene::Scene;
use crate::types::DataType;
use std::sync::Arc;

/// Connect two attributes; undo disconnects them
pub struct AddConnectionCommand {
    scene: Arc<Scene>,
    from: AttributeHandle,
    to: AttributeHandle,
    connected: bool,
    description: String,
}

impl AddConnectionCommand {
    /// Create a new command
    pub fn new(scene: Arc<Scene>, from: AttributeHandle, to: AttributeHandle) -> Self {
        Self {
            scene,
            from,
            to,
            connected: false,
            description: format!("Connect {} -> {}", from, to),
        }
    }

    /// Whether the last execute inserted the connection
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn notify(&self, message: AttributeMessage) {
        let bus = self.scene.event_bus();
        let scope = Some(self.scene.id());
        for attribute in [self.from, self.to] {
            bus.publish(&AttributeEvent {
                message,
                attribute,
                scope,
            });
        }
    }
}

impl Command for AddConnectionCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self) -> CommandResult<()> {
        self.connected = self.scene.add_connection(self.from, self.to);
        if self.connected {
            self.scene.event_bus().publish(&ConnectionAddedEvent {
                from: self.from,
                to: self.to,
            });
            self.notify(AttributeMessage::Connected);
        }
        Ok(())
    }

    fn undo(&mut self) -> CommandResult<()> {
        if !self.connected {
            return Ok(());
        }
        self.scene.remove_connection(self.from, self.to);
        self.connected = false;
        self.scene.event_bus().publish(&ConnectionRemovedEvent {
            from: self.from,
            to: self.to,
        });
        self.notify(AttributeMessage::Disconnected);
        Ok(())
    }
}

/// Write an attribute value; undo restores the previous one
pub struct SetAttributeValueCommand<T> {
    scene: Arc<Scene>,
    attribute: AttributeHandle,
    value: T,
    previous: Option<T>,
    description: String,
}

impl<T: DataType> SetAttributeValueCommand<T> {
    /// Create a new command
    pub fn new(scene: Arc<Scene>, attribute: AttributeHandle, value: T) -> Self {
        Self {
            scene,
            attribute,
            value,
            previous: None,
            description: format!("Set attribute {}", attribute),
        }
    }
}

impl<T: DataType> Command for SetAttributeValueCommand<T> {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self) -> CommandResult<()> {
        let previous = self.scene.value::<T>(self.attribute)?;
        self.scene.set_value(self.attribute, self.value.clone())?;
        self.previous = Some(previous);
        Ok(())
    }

    fn undo(&mut self) -> CommandResult<()> {
        if let Some(previous) = self.previous.take() {
            self.scene.set_value(self.attribute, previous)?;
        }
        Ok(())
    }
}
