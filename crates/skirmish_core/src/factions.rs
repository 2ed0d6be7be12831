//! Faction and player identifiers.

use serde::{Deserialize, Serialize};

/// Identifier of a faction (team). Units of different factions are enemies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct FactionId(pub u8);

/// Identifier of the player that owns a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

/// How two factions relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// Same faction.
    Same,
    /// Opposing factions.
    Opposing,
}

impl FactionId {
    /// Relation of `self` toward `other`.
    #[must_use]
    pub fn relation_to(self, other: Self) -> Relation {
        if self == other {
            Relation::Same
        } else {
            Relation::Opposing
        }
    }

    /// Check if two factions are allies.
    #[must_use]
    pub fn is_allied_with(self, other: Self) -> bool {
        self.relation_to(other) == Relation::Same
    }
}

impl std::fmt::Display for FactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "faction#{}", self.0)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player#{}", self.0)
    }
}
