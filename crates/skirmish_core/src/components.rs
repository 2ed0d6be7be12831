//! Plain data pieces that make up a unit.
//!
//! Components are data with only small invariant-keeping helpers. The
//! controllers in [`crate::combat`], [`crate::movement`] and
//! [`crate::navigation`] hold the behaviour.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal_serde, fixed_serde, Fixed, Vec2Fixed};

/// Generational handle to a unit in the [`crate::simulation::UnitRegistry`].
///
/// A handle stays valid only while the slot it points at still holds the
/// same generation. Once the unit is removed, every copy of the handle
/// stops resolving, so cross-unit references never dangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitHandle {
    index: u32,
    generation: u32,
}

impl UnitHandle {
    /// Create a handle from its raw parts.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the registry.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for UnitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit#{}v{}", self.index, self.generation)
    }
}

/// Broad classification of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitCategory {
    /// Gatherers and builders.
    Worker,
    /// Close-combat foot soldiers.
    #[default]
    Infantry,
    /// Units with a ranged weapon.
    Ranged,
    /// Mana users.
    Caster,
    /// Slow heavy units.
    Siege,
    /// Stationary structures (towers, walls).
    Structure,
}

/// The state-machine label shown for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitStateLabel {
    /// Following move commands.
    Moving,
    /// Settling into its initial slot after spawning.
    Parking,
    /// Idle, nothing queued.
    #[default]
    Standby,
    /// Idle and accepting orders after parking.
    Ready,
    /// Casting an ability.
    Conjuring,
    /// Engaged with a locked target.
    Attacking,
    /// Holding a guard post.
    Guarding,
    /// Walking a patrol route.
    Patrolling,
}

impl UnitStateLabel {
    /// Labels set from outside the core that controllers must not overwrite
    /// while they are idle.
    #[must_use]
    pub const fn is_external(self) -> bool {
        matches!(
            self,
            Self::Ready | Self::Conjuring | Self::Guarding | Self::Patrolling
        )
    }
}

/// Capability flags of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitFlags {
    /// Steered by a navigation agent. Structures are not kinematic.
    pub kinematic: bool,
    /// Can raise buildings.
    pub builder: bool,
    /// Can lock and attack targets.
    pub can_attack: bool,
    /// Attacks in melee; range is measured to the target's collider edge.
    pub melee: bool,
    /// Fades out on death instead of leaving a corpse.
    pub phase_die: bool,
}

/// Weapon statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    /// Seconds between two attacks.
    #[serde(with = "fixed_decimal_serde")]
    pub attack_rate: Fixed,
    /// Reach of the weapon in world units.
    #[serde(with = "fixed_decimal_serde")]
    pub attack_range: Fixed,
    /// Damage of a single attack.
    pub weapon_damage: u32,
}

impl CombatStats {
    /// Create new combat stats.
    #[must_use]
    pub const fn new(attack_rate: Fixed, attack_range: Fixed, weapon_damage: u32) -> Self {
        Self {
            attack_rate,
            attack_range,
            weapon_damage,
        }
    }

    /// Stats for a unit that never attacks.
    pub const NONE: Self = Self {
        attack_rate: Fixed::ZERO,
        attack_range: Fixed::ZERO,
        weapon_damage: 0,
    };
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            attack_rate: Fixed::ONE,
            attack_range: Fixed::from_num(5),
            weapon_damage: 10,
        }
    }
}

/// Health bookkeeping.
///
/// `current_health` is private: it only changes through [`Vitals::apply_damage`]
/// and [`Vitals::regenerate`], and `health` (a 0-100 percentage) is
/// recomputed after each change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    max_health: u32,
    current_health: u32,
    health: u32,
    /// Simulation time at which the next regen point may be granted.
    #[serde(with = "fixed_serde")]
    regen_due_at: Fixed,
}

impl Vitals {
    /// Create vitals at full health.
    #[must_use]
    pub fn new(max_health: u32) -> Self {
        Self::with_current(max_health, max_health)
    }

    /// Create vitals with an explicit starting health (clamped to max).
    #[must_use]
    pub fn with_current(max_health: u32, current_health: u32) -> Self {
        let mut vitals = Self {
            max_health,
            current_health: current_health.min(max_health),
            health: 0,
            regen_due_at: Fixed::ZERO,
        };
        vitals.recompute();
        vitals
    }

    /// Maximum health points.
    #[must_use]
    pub const fn max_health(&self) -> u32 {
        self.max_health
    }

    /// Raw remaining health points.
    #[must_use]
    pub const fn current_health(&self) -> u32 {
        self.current_health
    }

    /// Health as a percentage (0-100).
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Whether any health remains.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.current_health > 0
    }

    /// Simulation time at which regeneration may next grant a point.
    #[must_use]
    pub const fn regen_due_at(&self) -> Fixed {
        self.regen_due_at
    }

    /// Postpone regeneration until `at`.
    pub fn delay_regen_until(&mut self, at: Fixed) {
        self.regen_due_at = at;
    }

    /// Subtract damage, returning the amount actually removed.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current_health);
        self.current_health -= actual;
        self.recompute();
        actual
    }

    /// Add health points, capped at max. Returns the amount actually added.
    pub fn regenerate(&mut self, amount: u32) -> u32 {
        let headroom = self.max_health.saturating_sub(self.current_health);
        let actual = amount.min(headroom);
        self.current_health += actual;
        self.recompute();
        actual
    }

    fn recompute(&mut self) {
        self.health = if self.max_health == 0 {
            0
        } else {
            let pct = u64::from(self.current_health) * 100 / u64::from(self.max_health);
            u32::try_from(pct).unwrap_or(100)
        };
    }
}

/// Mana reserve with passive income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManaPool {
    /// Mana currently available.
    #[serde(with = "fixed_serde")]
    pub current: Fixed,
    /// Mana gained per second.
    #[serde(with = "fixed_serde")]
    pub income: Fixed,
    /// Upper bound on stored mana.
    #[serde(with = "fixed_serde")]
    pub storage: Fixed,
}

impl ManaPool {
    /// Create a pool.
    #[must_use]
    pub fn new(current: Fixed, income: Fixed, storage: Fixed) -> Self {
        Self {
            current: current.min(storage),
            income,
            storage,
        }
    }

    /// Grant `income × dt`, capped at storage.
    pub fn accrue(&mut self, dt: Fixed) {
        self.current = (self.current + self.income * dt).min(self.storage);
    }

    /// Spend mana if enough is available.
    pub fn spend(&mut self, amount: Fixed) -> bool {
        if amount > self.current {
            return false;
        }
        self.current -= amount;
        true
    }
}

/// Time of the current tick and its fixed delta, both in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickClock {
    /// Simulation time at the start of the tick.
    pub now: Fixed,
    /// Length of one tick.
    pub dt: Fixed,
}

/// Read-only snapshot of another unit, taken at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitView {
    /// Unit.
    pub handle: UnitHandle,
    /// World position.
    pub position: Vec2Fixed,
    /// Body radius.
    pub collider_radius: Fixed,
    /// Health remains and the unit has not died.
    pub alive: bool,
    /// Moved during the previous tick.
    pub moving: bool,
}

/// Resolves handles to snapshots of other units.
///
/// `None` means the handle no longer resolves (the unit was removed).
pub trait UnitLookup {
    /// Snapshot of `handle`, if it still resolves.
    fn view(&self, handle: UnitHandle) -> Option<UnitView>;
}

impl UnitLookup for BTreeMap<UnitHandle, UnitView> {
    fn view(&self, handle: UnitHandle) -> Option<UnitView> {
        self.get(&handle).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_percentage_follows_current() {
        let mut vitals = Vitals::new(200);
        assert_eq!(vitals.health(), 100);
        vitals.apply_damage(50);
        assert_eq!(vitals.current_health(), 150);
        assert_eq!(vitals.health(), 75);
    }

    #[test]
    fn test_damage_saturates_at_zero() {
        let mut vitals = Vitals::new(10);
        assert_eq!(vitals.apply_damage(25), 10);
        assert_eq!(vitals.health(), 0);
        assert!(!vitals.is_alive());
    }

    #[test]
    fn test_regenerate_capped() {
        let mut vitals = Vitals::with_current(100, 99);
        assert_eq!(vitals.regenerate(5), 1);
        assert_eq!(vitals.health(), 100);
    }

    #[test]
    fn test_zero_max_health_is_zero_percent() {
        let vitals = Vitals::new(0);
        assert_eq!(vitals.health(), 0);
    }

    #[test]
    fn test_mana_accrues_to_storage() {
        let mut mana = ManaPool::new(Fixed::ZERO, Fixed::from_num(10), Fixed::from_num(15));
        mana.accrue(Fixed::ONE);
        assert_eq!(mana.current, Fixed::from_num(10));
        mana.accrue(Fixed::ONE);
        assert_eq!(mana.current, Fixed::from_num(15));
        assert!(mana.spend(Fixed::from_num(5)));
        assert!(!mana.spend(Fixed::from_num(50)));
        assert_eq!(mana.current, Fixed::from_num(10));
    }

    #[test]
    fn test_handle_ordering() {
        assert!(UnitHandle::new(1, 9) < UnitHandle::new(2, 0));
        assert_eq!(UnitHandle::new(3, 1).to_string(), "unit#3v1");
    }
}
