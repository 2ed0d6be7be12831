//! Visibility bookkeeping fed by sensor-volume boundary events.
//!
//! Each unit keeps two sets: the enemies inside its sight sensor, and the
//! enemies whose fog-of-war sensor currently covers it. Both only change
//! through enter/exit events and are pruned of dead entries on read.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::{UnitHandle, UnitLookup};
use crate::data::TuningData;
use crate::factions::{FactionId, Relation};
use crate::math::{Fixed, Vec2Fixed};

/// Classification of the volume that crossed a sensor boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VolumeKind {
    /// The other unit's body touched this unit's inner contact trigger.
    InnerContact,
    /// The other unit's body crossed this unit's sight sensor.
    UnitBody,
    /// The other unit's vision mask (fog-of-war sensor) crossed this unit.
    VisionMask,
}

/// Direction of a boundary crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorEdge {
    /// Overlap started.
    Enter,
    /// Overlap ended.
    Exit,
}

/// A boundary-crossing notification delivered to one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorEvent {
    /// The other party.
    pub other: UnitHandle,
    /// Which volume crossed.
    pub volume: VolumeKind,
    /// Faction relation of the other party.
    pub relation: Relation,
    /// Enter or exit.
    pub edge: SensorEdge,
}

/// Sets of units this unit sees and is seen by.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProximityTracker {
    enemies_in_sight: BTreeSet<UnitHandle>,
    who_can_see_me: BTreeSet<UnitHandle>,
    contacts: BTreeSet<UnitHandle>,
}

impl ProximityTracker {
    /// Create empty sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one boundary event.
    ///
    /// Returns the other unit when it just entered inner contact, so the
    /// caller can run bump handling.
    pub fn apply(&mut self, event: &SensorEvent) -> Option<UnitHandle> {
        let set = match (event.volume, event.relation) {
            (VolumeKind::UnitBody, Relation::Opposing) => &mut self.enemies_in_sight,
            (VolumeKind::VisionMask, Relation::Opposing) => &mut self.who_can_see_me,
            (VolumeKind::InnerContact, _) => &mut self.contacts,
            (_, Relation::Same) => return None,
        };

        match event.edge {
            SensorEdge::Enter => {
                let inserted = set.insert(event.other);
                (inserted && event.volume == VolumeKind::InnerContact).then_some(event.other)
            }
            SensorEdge::Exit => {
                set.remove(&event.other);
                None
            }
        }
    }

    /// Drop every entry that no longer resolves to a live unit.
    pub fn prune(&mut self, lookup: &impl UnitLookup) {
        let alive = |handle: &UnitHandle| lookup.view(*handle).is_some_and(|v| v.alive);
        self.enemies_in_sight.retain(alive);
        self.who_can_see_me.retain(alive);
        self.contacts.retain(alive);
    }

    /// Enemies currently inside the sight sensor, in handle order.
    pub fn enemies_in_sight(&self) -> impl Iterator<Item = UnitHandle> + '_ {
        self.enemies_in_sight.iter().copied()
    }

    /// Enemies that can currently see this unit, in handle order.
    pub fn who_can_see_me(&self) -> impl Iterator<Item = UnitHandle> + '_ {
        self.who_can_see_me.iter().copied()
    }

    /// Units touching the inner contact trigger.
    pub fn contacts(&self) -> impl Iterator<Item = UnitHandle> + '_ {
        self.contacts.iter().copied()
    }

    /// Whether any enemy can see this unit.
    #[must_use]
    pub fn is_spotted(&self) -> bool {
        !self.who_can_see_me.is_empty()
    }

    /// Forget everything (death).
    pub fn clear(&mut self) {
        self.enemies_in_sight.clear();
        self.who_can_see_me.clear();
        self.contacts.clear();
    }
}

/// Sensor geometry of one unit for a [`SensorSweep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorBody {
    /// Unit.
    pub handle: UnitHandle,
    /// Owning faction.
    pub faction: FactionId,
    /// World position.
    pub position: Vec2Fixed,
    /// Body radius.
    pub collider_radius: Fixed,
    /// Sight and fog-of-war sensor radius.
    pub sight_range: Fixed,
}

type OverlapKey = (UnitHandle, UnitHandle, VolumeKind, Relation);

/// Distance-based trigger system.
///
/// Each sweep computes which volumes overlap and diffs the result against
/// the previous sweep to produce enter/exit events, addressed to the unit
/// whose sensor saw the crossing.
#[derive(Debug, Clone, Default)]
pub struct SensorSweep {
    overlaps: BTreeSet<OverlapKey>,
}

impl SensorSweep {
    /// Create a sweep with no remembered overlaps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Detect boundary crossings since the previous sweep.
    pub fn detect(
        &mut self,
        bodies: &[SensorBody],
        tuning: &TuningData,
    ) -> Vec<(UnitHandle, SensorEvent)> {
        let mut current = BTreeSet::new();

        for owner in bodies {
            for other in bodies {
                if owner.handle == other.handle {
                    continue;
                }
                let dist_sq = owner.position.distance_squared(other.position);
                let within = |radius: Fixed| dist_sq < radius.saturating_mul(radius);
                let relation = owner.faction.relation_to(other.faction);

                if within(owner.sight_range + other.collider_radius) {
                    current.insert((owner.handle, other.handle, VolumeKind::UnitBody, relation));
                }
                if within(other.sight_range + owner.collider_radius) {
                    current.insert((owner.handle, other.handle, VolumeKind::VisionMask, relation));
                }
                if within(owner.collider_radius + other.collider_radius + tuning.contact_padding) {
                    current.insert((
                        owner.handle,
                        other.handle,
                        VolumeKind::InnerContact,
                        relation,
                    ));
                }
            }
        }

        let live: BTreeSet<UnitHandle> = bodies.iter().map(|b| b.handle).collect();
        let mut events = Vec::new();

        for &(owner, other, volume, relation) in self.overlaps.difference(&current) {
            if live.contains(&owner) {
                events.push((
                    owner,
                    SensorEvent {
                        other,
                        volume,
                        relation,
                        edge: SensorEdge::Exit,
                    },
                ));
            }
        }
        for &(owner, other, volume, relation) in current.difference(&self.overlaps) {
            events.push((
                owner,
                SensorEvent {
                    other,
                    volume,
                    relation,
                    edge: SensorEdge::Enter,
                },
            ));
        }

        self.overlaps = current;
        events
    }
}
