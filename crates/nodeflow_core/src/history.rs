// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history built from reversible commands.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Errors raised by commands
#[derive(Debug, Error)]
pub enum CommandError {
    /// The underlying graph operation failed
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type for command execution
pub type CommandResult<T> = std::result::Result<T, CommandError>;

/// A reversible mutation
pub trait Command {
    /// Human-readable description
    fn description(&self) -> &str;

    /// Apply the mutation
    fn execute(&mut self) -> CommandResult<()>;

    /// Revert the mutation
    fn undo(&mut self) -> CommandResult<()>;
}

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Commands in the undo stack
    pub undo_count: usize,
    /// Commands in the redo stack
    pub redo_count: usize,
    /// Depth bound, if any
    pub max_depth: Option<usize>,
}

/// Undo/redo stacks of executed commands
#[derive(Default)]
pub struct UndoStack {
    undo_stack: VecDeque<Box<dyn Command>>,
    redo_stack: VecDeque<Box<dyn Command>>,
    max_depth: Option<usize>,
}

impl UndoStack {
    /// Create an unbounded history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history keeping at most `max_depth` undo entries
    pub fn with_max_depth(max_depth: Option<usize>) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Execute `command` and record it.
    ///
    /// The redo stack is cleared first. A command whose execute fails is not
    /// recorded.
    pub fn push(&mut self, mut command: Box<dyn Command>) -> CommandResult<()> {
        self.redo_stack.clear();
        command.execute()?;
        tracing::debug!("Executed '{}'", command.description());
        self.undo_stack.push_back(command);

        if let Some(max_depth) = self.max_depth {
            while self.undo_stack.len() > max_depth {
                self.undo_stack.pop_front();
            }
        }
        Ok(())
    }

    /// Undo the last command; false when there was nothing to undo
    pub fn undo(&mut self) -> CommandResult<bool> {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return Ok(false);
        };
        if let Err(e) = command.undo() {
            self.undo_stack.push_back(command);
            return Err(e);
        }
        tracing::debug!("Undid '{}'", command.description());
        self.redo_stack.push_back(command);
        Ok(true)
    }

    /// Redo the last undone command; false when there was nothing to redo
    pub fn redo(&mut self) -> CommandResult<bool> {
        let Some(mut command) = self.redo_stack.pop_back() else {
            return Ok(false);
        };
        if let Err(e) = command.execute() {
            self.redo_stack.push_back(command);
            return Err(e);
        }
        tracing::debug!("Redid '{}'", command.description());
        self.undo_stack.push_back(command);
        Ok(true)
    }

    /// Drop both stacks without running any command
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|c| c.description())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|c| c.description())
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            max_depth: self.max_depth,
        }
    }
}

impl std::fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoStack")
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct SetValue {
        target: Rc<Cell<i32>>,
        value: i32,
        previous: i32,
        description: String,
    }

    impl SetValue {
        fn boxed(target: &Rc<Cell<i32>>, value: i32) -> Box<dyn Command> {
            Box::new(Self {
                target: target.clone(),
                value,
                previous: 0,
                description: format!("Set to {}", value),
            })
        }
    }

    impl Command for SetValue {
        fn description(&self) -> &str {
            &self.description
        }

        fn execute(&mut self) -> CommandResult<()> {
            self.previous = self.target.replace(self.value);
            Ok(())
        }

        fn undo(&mut self) -> CommandResult<()> {
            self.target.set(self.previous);
            Ok(())
        }
    }

    struct Failing;

    impl Command for Failing {
        fn description(&self) -> &str {
            "Failing"
        }

        fn execute(&mut self) -> CommandResult<()> {
            Err(CommandError::InvalidOperation("refused".to_string()))
        }

        fn undo(&mut self) -> CommandResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_undo_redo_scenario() {
        let value = Rc::new(Cell::new(0));
        let mut stack = UndoStack::new();

        stack.push(SetValue::boxed(&value, 42)).unwrap();
        assert_eq!(value.get(), 42);
        assert!(stack.can_undo());
        assert!(!stack.can_redo());
        assert_eq!(stack.undo_description(), Some("Set to 42"));

        assert!(stack.undo().unwrap());
        assert_eq!(value.get(), 0);
        assert!(stack.can_redo());
        assert_eq!(stack.redo_description(), Some("Set to 42"));

        assert!(stack.redo().unwrap());
        assert_eq!(value.get(), 42);

        stack.push(SetValue::boxed(&value, 100)).unwrap();
        assert_eq!(value.get(), 100);
        assert!(!stack.can_redo());
        assert_eq!(stack.undo_depth(), 2);
    }

    #[test]
    fn test_push_clears_redo() {
        let value = Rc::new(Cell::new(0));
        let mut stack = UndoStack::new();

        stack.push(SetValue::boxed(&value, 1)).unwrap();
        stack.undo().unwrap();
        assert_eq!(stack.redo_depth(), 1);

        stack.push(SetValue::boxed(&value, 2)).unwrap();
        assert_eq!(stack.redo_depth(), 0);
        assert!(!stack.redo().unwrap());
    }

    #[test]
    fn test_empty_stacks() {
        let mut stack = UndoStack::new();

        assert!(!stack.undo().unwrap());
        assert!(!stack.redo().unwrap());
        assert_eq!(stack.undo_description(), None);
    }

    #[test]
    fn test_failed_execute_not_recorded() {
        let mut stack = UndoStack::new();

        assert!(matches!(
            stack.push(Box::new(Failing)),
            Err(CommandError::InvalidOperation(_))
        ));
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_clear_runs_nothing() {
        let value = Rc::new(Cell::new(0));
        let mut stack = UndoStack::new();
        stack.push(SetValue::boxed(&value, 5)).unwrap();
        stack.push(SetValue::boxed(&value, 6)).unwrap();
        stack.undo().unwrap();

        stack.clear();

        assert_eq!(value.get(), 5);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_max_depth() {
        let value = Rc::new(Cell::new(0));
        let mut stack = UndoStack::with_max_depth(Some(2));

        for v in 1..=4 {
            stack.push(SetValue::boxed(&value, v)).unwrap();
        }

        assert_eq!(stack.undo_depth(), 2);
        assert_eq!(
            stack.stats(),
            HistoryStats {
                undo_count: 2,
                redo_count: 0,
                max_depth: Some(2),
            }
        );

        stack.undo().unwrap();
        stack.undo().unwrap();
        assert_eq!(value.get(), 2);
        assert!(!stack.undo().unwrap());
    }
}
