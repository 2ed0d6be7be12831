//! Per-player unit rosters.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::UnitHandle;
use crate::factions::PlayerId;

/// Which units each player owns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerRoster {
    units: BTreeMap<PlayerId, BTreeSet<UnitHandle>>,
}

impl PlayerRoster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record ownership. Returns `false` if already recorded.
    pub fn add(&mut self, player: PlayerId, unit: UnitHandle) -> bool {
        self.units.entry(player).or_default().insert(unit)
    }

    /// Drop ownership. Returns `false` if the unit was not recorded.
    pub fn remove(&mut self, player: PlayerId, unit: UnitHandle) -> bool {
        let Some(set) = self.units.get_mut(&player) else {
            return false;
        };
        let removed = set.remove(&unit);
        if set.is_empty() {
            self.units.remove(&player);
        }
        removed
    }

    /// Units owned by `player`, in handle order.
    pub fn units_of(&self, player: PlayerId) -> impl Iterator<Item = UnitHandle> + '_ {
        self.units.get(&player).into_iter().flatten().copied()
    }

    /// Number of units owned by `player`.
    #[must_use]
    pub fn count(&self, player: PlayerId) -> usize {
        self.units.get(&player).map_or(0, BTreeSet::len)
    }

    /// Players that still own at least one unit.
    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.units.keys().copied()
    }
}
