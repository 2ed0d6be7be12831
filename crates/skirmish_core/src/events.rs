//! Fire-and-forget notifications for effect, audio and animation sinks.
//!
//! The core only records these; whoever drives the simulation decides what
//! to play. Nothing waits for an effect to finish.

use serde::{Deserialize, Serialize};

use crate::components::{UnitHandle, UnitStateLabel};
use crate::factions::PlayerId;

/// Roster bookkeeping change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RosterChange {
    /// Unit joined its owner's roster (spawn).
    Added,
    /// Unit left its owner's roster (death).
    Removed,
}

/// Events generated by units during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitEvent {
    /// A unit lost health (damage effect cue).
    DamageTaken {
        /// Damaged unit.
        unit: UnitHandle,
        /// Health points actually removed.
        amount: u32,
        /// Health percentage after the hit.
        health: u32,
    },
    /// Attack cadence fired (swing animation and attack sound cue).
    AttackSwing {
        /// Attacking unit.
        attacker: UnitHandle,
        /// Locked target.
        target: UnitHandle,
    },
    /// A unit died (death effect cue).
    Died {
        /// Dead unit.
        unit: UnitHandle,
        /// Fade out instead of leaving a corpse.
        phase_out: bool,
    },
    /// The unit's state label changed.
    StateChanged {
        /// Unit.
        unit: UnitHandle,
        /// Previous label.
        from: UnitStateLabel,
        /// New label.
        to: UnitStateLabel,
    },
    /// The owning player's roster changed.
    RosterChanged {
        /// Owner.
        player: PlayerId,
        /// Unit added or removed.
        unit: UnitHandle,
        /// Kind of change.
        change: RosterChange,
    },
}

/// A weapon hit waiting to be applied at the end of the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingHit {
    /// Unit that attacked.
    pub attacker: UnitHandle,
    /// Unit that gets hit.
    pub target: UnitHandle,
    /// Damage to apply.
    pub damage: u32,
}
