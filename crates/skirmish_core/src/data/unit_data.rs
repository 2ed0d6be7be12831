//! Unit data structures for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use crate::components::{CombatStats, UnitCategory, UnitFlags};
use crate::error::{GameError, Result};
use crate::math::{fixed_decimal_serde, Fixed};

/// Weapon block of a unit definition.
///
/// Units without one are non-combatants (workers, most structures).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CombatData {
    /// Seconds between attacks.
    #[serde(with = "fixed_decimal_serde")]
    pub attack_rate: Fixed,

    /// Attack range in world units.
    #[serde(with = "fixed_decimal_serde")]
    pub attack_range: Fixed,

    /// Damage per attack.
    pub weapon_damage: u32,

    /// Melee attackers measure range to the target's collider edge.
    #[serde(default)]
    pub melee: bool,
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "spearman",
///     name: "Spearman",
///     category: Infantry,
///     health: 120,
///     speed: 3.5,
///     stopping_distance: 0.5,
///     collider_radius: 0.5,
///     sight_range: 8.0,
///     combat: Some(CombatData(
///         attack_rate: 1.2,
///         attack_range: 0.75,
///         weapon_damage: 14,
///         melee: true,
///     )),
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitData {
    /// Unique string identifier for this unit type.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Broad classification.
    #[serde(default)]
    pub category: UnitCategory,

    /// Maximum health points.
    pub health: u32,

    /// Starting mana.
    #[serde(default, with = "fixed_decimal_serde")]
    pub mana: Fixed,

    /// Mana gained per second.
    #[serde(default, with = "fixed_decimal_serde")]
    pub mana_income: Fixed,

    /// Mana cap.
    #[serde(default, with = "fixed_decimal_serde")]
    pub mana_storage: Fixed,

    /// Mobile units are steered by a navigation agent.
    #[serde(default = "default_kinematic")]
    pub kinematic: bool,

    /// Can raise buildings.
    #[serde(default)]
    pub builder: bool,

    /// Fades out on death.
    #[serde(default)]
    pub phase_die: bool,

    /// Movement speed in world units per second.
    #[serde(default, with = "fixed_decimal_serde")]
    pub speed: Fixed,

    /// Distance from a destination at which the agent counts as arrived.
    #[serde(with = "fixed_decimal_serde")]
    pub stopping_distance: Fixed,

    /// Radius of the unit's body (also its footprint half-width).
    #[serde(with = "fixed_decimal_serde")]
    pub collider_radius: Fixed,

    /// Radius of the unit's sight sensor.
    #[serde(with = "fixed_decimal_serde")]
    pub sight_range: Fixed,

    /// Weapon (None for non-combat units).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat: Option<CombatData>,
}

const fn default_kinematic() -> bool {
    true
}

impl UnitData {
    /// Parse a definition from a RON string.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParse`] if the text is not a valid definition.
    pub fn from_ron_str(source: &str, path: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::DataParse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Check if this unit can engage in combat.
    #[must_use]
    pub fn is_combatant(&self) -> bool {
        self.combat.is_some()
    }

    /// Capability flags derived from the definition.
    #[must_use]
    pub fn flags(&self) -> UnitFlags {
        UnitFlags {
            kinematic: self.kinematic,
            builder: self.builder,
            can_attack: self.is_combatant(),
            melee: self.combat.is_some_and(|c| c.melee),
            phase_die: self.phase_die,
        }
    }

    /// Weapon stats, or [`CombatStats::NONE`].
    #[must_use]
    pub fn combat_stats(&self) -> CombatStats {
        self.combat.map_or(CombatStats::NONE, |c| {
            CombatStats::new(c.attack_rate, c.attack_range, c.weapon_damage)
        })
    }

    /// Validate internal consistency.
    ///
    /// Returns a list of problems; an empty list means the unit can be spawned.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.health == 0 {
            errors.push(format!("Unit '{}' has zero health", self.id));
        }
        if self.collider_radius <= Fixed::ZERO {
            errors.push(format!("Unit '{}' needs a positive collider radius", self.id));
        }
        if self.stopping_distance < Fixed::ZERO {
            errors.push(format!("Unit '{}' has a negative stopping distance", self.id));
        }
        if self.kinematic && self.speed <= Fixed::ZERO {
            errors.push(format!(
                "Unit '{}' is kinematic but has no navigation speed",
                self.id
            ));
        }
        if self.kinematic && self.stopping_distance <= Fixed::ZERO {
            errors.push(format!(
                "Unit '{}' is kinematic but has no stopping distance",
                self.id
            ));
        }
        if self.mana_storage < Fixed::ZERO || self.mana_income < Fixed::ZERO {
            errors.push(format!("Unit '{}' has negative mana settings", self.id));
        }
        if let Some(combat) = &self.combat {
            if combat.attack_rate <= Fixed::ZERO {
                errors.push(format!("Unit '{}' needs a positive attack rate", self.id));
            }
            if combat.attack_range <= Fixed::ZERO {
                errors.push(format!("Unit '{}' needs a positive attack range", self.id));
            }
        }

        errors
    }

    /// Validate and turn the problem list into a [`GameError::Configuration`].
    ///
    /// # Errors
    ///
    /// Returns the joined problems when [`validate`](Self::validate) reports any.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GameError::Configuration(errors.join("; ")))
        }
    }
}
