//! Test fixtures and helpers.
//!
//! Canned unit definitions and spawn helpers for consistent testing.
//! Definitions are written in RON, the same format the data files use.

use fixed::types::I32F32;
use skirmish_core::data::UnitData;
use skirmish_core::factions::{FactionId, PlayerId};
use skirmish_core::math::Vec2Fixed;
use skirmish_core::simulation::{Simulation, UnitSpawnParams};
use skirmish_core::components::UnitHandle;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Point from integer coordinates.
#[must_use]
pub fn point(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

const SPEARMAN: &str = r#"UnitData(
    id: "spearman",
    name: "Spearman",
    category: Infantry,
    health: 100,
    speed: 4.0,
    stopping_distance: 0.25,
    collider_radius: 0.5,
    sight_range: 8.0,
    combat: Some(CombatData(attack_rate: 1.0, attack_range: 0.5, weapon_damage: 12, melee: true)),
)"#;

const ARCHER: &str = r#"UnitData(
    id: "archer",
    name: "Archer",
    category: Ranged,
    health: 70,
    speed: 3.5,
    stopping_distance: 0.25,
    collider_radius: 0.4,
    sight_range: 10.0,
    combat: Some(CombatData(attack_rate: 1.5, attack_range: 6.0, weapon_damage: 9)),
)"#;

const WATCHTOWER: &str = r#"UnitData(
    id: "watchtower",
    name: "Watchtower",
    category: Structure,
    health: 400,
    kinematic: false,
    stopping_distance: 0.0,
    collider_radius: 1.5,
    sight_range: 12.0,
    combat: Some(CombatData(attack_rate: 2.0, attack_range: 9.0, weapon_damage: 20)),
)"#;

const ACOLYTE: &str = r#"UnitData(
    id: "acolyte",
    name: "Acolyte",
    category: Caster,
    health: 60,
    mana: 20.0,
    mana_income: 2.0,
    mana_storage: 100.0,
    speed: 3.0,
    stopping_distance: 0.25,
    collider_radius: 0.4,
    sight_range: 9.0,
    phase_die: true,
)"#;

fn parse(source: &str) -> UnitData {
    ron::from_str(source).unwrap_or_else(|e| panic!("fixture does not parse: {e}"))
}

/// Melee infantry: 100 hp, range 0.5 to the collider edge.
#[must_use]
pub fn spearman() -> UnitData {
    parse(SPEARMAN)
}

/// Ranged infantry: 70 hp, range 6.
#[must_use]
pub fn archer() -> UnitData {
    parse(ARCHER)
}

/// Stationary defensive structure.
#[must_use]
pub fn watchtower() -> UnitData {
    parse(WATCHTOWER)
}

/// Non-combat caster with mana income.
#[must_use]
pub fn acolyte() -> UnitData {
    parse(ACOLYTE)
}

/// Spawn params for faction `team` (owned by the player of the same id).
#[must_use]
pub fn team_at(team: u8, x: i32, y: i32) -> UnitSpawnParams {
    UnitSpawnParams {
        faction: FactionId(team),
        owner: PlayerId(team),
        position: point(x, y),
        parking: None,
    }
}

/// Spawn a unit, panicking on a bad fixture.
pub fn spawn(sim: &mut Simulation, data: &UnitData, params: UnitSpawnParams) -> UnitHandle {
    sim.spawn_unit(data, params)
        .unwrap_or_else(|e| panic!("fixture {} failed to spawn: {e}", data.id))
}

/// Two lines of spearmen and archers facing each other across the y axis.
#[must_use]
pub fn skirmish(per_side: i32) -> Simulation {
    let mut sim = Simulation::new();
    for i in 0..per_side {
        spawn(&mut sim, &spearman(), team_at(0, -6, i * 2));
        spawn(&mut sim, &archer(), team_at(0, -9, i * 2));
        spawn(&mut sim, &spearman(), team_at(1, 6, i * 2));
        spawn(&mut sim, &archer(), team_at(1, 9, i * 2));
    }
    sim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_valid() {
        for data in [spearman(), archer(), watchtower(), acolyte()] {
            assert!(data.validate().is_empty(), "{}: {:?}", data.id, data.validate());
        }
    }

    #[test]
    fn test_skirmish_layout() {
        let sim = skirmish(3);
        assert_eq!(sim.units().len(), 12);
        assert_eq!(sim.roster().count(PlayerId(0)), 6);
    }
}
