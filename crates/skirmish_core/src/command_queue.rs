//! Ordered move/attack orders for a single unit.
//!
//! The queue is strictly FIFO with no priorities. The current command is
//! the front of the queue. Everything interesting happens in the
//! controllers that mutate it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::components::UnitHandle;
use crate::error::{GameError, Result};
use crate::math::Vec2Fixed;

/// A single queued order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandItem {
    /// Walk to a point.
    Move {
        /// Destination.
        point: Vec2Fixed,
    },
    /// Walk toward a target and attack it.
    Attack {
        /// Last known position of the target.
        point: Vec2Fixed,
        /// Non-owning reference to the target.
        target: UnitHandle,
    },
}

impl CommandItem {
    /// Destination point of the command.
    #[must_use]
    pub const fn point(&self) -> Vec2Fixed {
        match self {
            Self::Move { point } | Self::Attack { point, .. } => *point,
        }
    }

    /// Overwrite the destination point in place.
    pub fn set_point(&mut self, new_point: Vec2Fixed) {
        match self {
            Self::Move { point } | Self::Attack { point, .. } => *point = new_point,
        }
    }

    /// Target referenced by an attack command.
    #[must_use]
    pub const fn attack_target(&self) -> Option<UnitHandle> {
        match self {
            Self::Move { .. } => None,
            Self::Attack { target, .. } => Some(*target),
        }
    }
}

/// FIFO queue of commands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandQueue {
    items: VecDeque<CommandItem>,
}

impl CommandQueue {
    /// Create an empty command queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Add a command to the back of the queue.
    pub fn enqueue(&mut self, item: CommandItem) {
        self.items.push_back(item);
    }

    /// Remove and return the front command.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] when the queue is empty. Callers
    /// must check [`len`](Self::len) first.
    pub fn dequeue(&mut self) -> Result<CommandItem> {
        self.items
            .pop_front()
            .ok_or_else(|| GameError::InvalidState("dequeue on an empty command queue".into()))
    }

    /// Remove and return the most recently queued command.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] when the queue is empty.
    pub fn pop_last(&mut self) -> Result<CommandItem> {
        self.items
            .pop_back()
            .ok_or_else(|| GameError::InvalidState("pop_last on an empty command queue".into()))
    }

    /// Clear all commands.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// The command currently being executed.
    #[must_use]
    pub fn current(&self) -> Option<&CommandItem> {
        self.items.front()
    }

    /// Mutable access to the command currently being executed.
    pub fn current_mut(&mut self) -> Option<&mut CommandItem> {
        self.items.front_mut()
    }

    /// Replace the whole queue with a single command.
    ///
    /// This is a destructive overwrite, not an insert.
    pub fn set_current(&mut self, item: CommandItem) {
        self.items.clear();
        self.items.push_back(item);
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate front to back.
    pub fn iter(&self) -> impl Iterator<Item = &CommandItem> {
        self.items.iter()
    }
}
