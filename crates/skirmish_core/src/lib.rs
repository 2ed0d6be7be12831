//! # Skirmish Core
//!
//! Deterministic per-unit simulation core for a real-time strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! Every unit runs the same pipeline each tick: pick a target from what it
//! can see, run the attack state machine, follow its command queue, steer
//! its navigation agent, then regenerate health and mana.
//!
//! ## Crate Structure
//!
//! - [`command_queue`] - FIFO move/attack orders
//! - [`navigation`] - Agent/obstacle adapter and avoidance ramp
//! - [`combat`] - Target acquisition and the attack state machine
//! - [`movement`] - Queue-driven movement, parking and bumps
//! - [`proximity`] - Visibility sets and sensor events
//! - [`unit`] - The per-unit aggregate
//! - [`simulation`] - Registry and tick loop
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod command_queue;
pub mod components;
pub mod data;
pub mod error;
pub mod events;
pub mod factions;
pub mod math;
pub mod movement;
pub mod navigation;
pub mod proximity;
pub mod roster;
pub mod simulation;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::{CombatController, CombatPhase};
    pub use crate::command_queue::{CommandItem, CommandQueue};
    pub use crate::components::*;
    pub use crate::data::{CombatData, TuningData, UnitData};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{PendingHit, RosterChange, UnitEvent};
    pub use crate::factions::{FactionId, PlayerId, Relation};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::movement::{MovementController, MovementPhase};
    pub use crate::navigation::{NavMode, NavigationAdapter, PathPlanner, StraightLinePlanner};
    pub use crate::proximity::{ProximityTracker, SensorEdge, SensorEvent, VolumeKind};
    pub use crate::roster::PlayerRoster;
    pub use crate::simulation::{ParkingOrder, Simulation, TickEvents, UnitSpawnParams};
    pub use crate::unit::UnitState;
}

pub use error::{GameError, Result};
