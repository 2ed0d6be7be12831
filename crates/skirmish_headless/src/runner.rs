//! Headless scenario runner.
//!
//! Builds a [`Simulation`] from a [`Scenario`], advances it and condenses
//! what happened into a [`RunSummary`] that serializes to JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skirmish_core::components::{UnitHandle, UnitStateLabel};
use skirmish_core::events::UnitEvent;
use skirmish_core::factions::{FactionId, PlayerId};
use skirmish_core::math::Vec2Fixed;
use skirmish_core::simulation::{ParkingOrder, Simulation, TickEvents, UnitSpawnParams};
use skirmish_core::Result;

use crate::scenario::{Scenario, ScenarioError, ScenarioOrder};

/// How long to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Maximum number of ticks.
    pub ticks: u64,
    /// Stop as soon as at most one player still owns units.
    pub stop_on_elimination: bool,
}

impl RunConfig {
    /// Run exactly `ticks` ticks.
    #[must_use]
    pub const fn fixed(ticks: u64) -> Self {
        Self {
            ticks,
            stop_on_elimination: false,
        }
    }
}

/// Running totals of tick events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventCounts {
    /// Weapon hits applied.
    pub hits: u64,
    /// Damage-taken notifications.
    pub damage_taken: u64,
    /// Attack swings.
    pub attack_swings: u64,
    /// Deaths.
    pub deaths: u64,
    /// State label changes.
    pub state_changes: u64,
    /// Roster additions and removals.
    pub roster_changes: u64,
}

impl EventCounts {
    /// Add one tick's events.
    pub fn record(&mut self, events: &TickEvents) {
        self.hits += events.hits.len() as u64;
        for event in &events.unit_events {
            match event {
                UnitEvent::DamageTaken { .. } => self.damage_taken += 1,
                UnitEvent::AttackSwing { .. } => self.attack_swings += 1,
                UnitEvent::Died { .. } => self.deaths += 1,
                UnitEvent::StateChanged { .. } => self.state_changes += 1,
                UnitEvent::RosterChanged { .. } => self.roster_changes += 1,
            }
        }
    }
}

/// A unit alive at the end of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivorSummary {
    /// Scenario label.
    pub label: String,
    /// Unit type id.
    pub unit_type: String,
    /// Owning player.
    pub player: u8,
    /// Health percentage.
    pub health: u32,
    /// State label.
    pub state: UnitStateLabel,
    /// Final position.
    pub position: Vec2Fixed,
    /// Label of the locked attack target, if any.
    pub attack_target: Option<String>,
}

/// A unit that died during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathRecord {
    /// Scenario label.
    pub label: String,
    /// Tick number after which the unit was removed.
    pub tick: u64,
}

/// Outcome of a headless run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Ticks actually simulated.
    pub ticks: u64,
    /// Final simulation state hash.
    pub state_hash: u64,
    /// Units still alive, in spawn order.
    pub survivors: Vec<SurvivorSummary>,
    /// Deaths in the order they happened.
    pub deaths: Vec<DeathRecord>,
    /// Event totals.
    pub event_counts: EventCounts,
    /// Live unit count per player.
    pub units_per_player: BTreeMap<u8, usize>,
    /// The only player left with units, if exactly one is.
    pub winner: Option<u8>,
}

/// Drives one scenario.
pub struct HeadlessRunner {
    name: String,
    sim: Simulation,
    spawn_order: Vec<UnitHandle>,
    labels: BTreeMap<UnitHandle, String>,
    unit_types: BTreeMap<UnitHandle, String>,
    players: Vec<PlayerId>,
    deaths: Vec<DeathRecord>,
    counts: EventCounts,
}

impl HeadlessRunner {
    /// Validate a scenario, spawn its units and issue its orders.
    pub fn from_scenario(scenario: &Scenario) -> std::result::Result<Self, ScenarioError> {
        scenario.validate()?;

        let mut sim = Simulation::with_tuning(scenario.tuning);
        sim.set_auto_sensors(!scenario.manual_sensors);

        let mut handles = BTreeMap::new();
        let mut runner = Self {
            name: scenario.name.clone(),
            sim,
            spawn_order: Vec::with_capacity(scenario.spawns.len()),
            labels: BTreeMap::new(),
            unit_types: BTreeMap::new(),
            players: Vec::new(),
            deaths: Vec::new(),
            counts: EventCounts::default(),
        };

        for spawn in &scenario.spawns {
            let data = scenario
                .unit_type(&spawn.unit_type)
                .ok_or_else(|| ScenarioError::UnknownUnitType {
                    label: spawn.label.clone(),
                    unit_type: spawn.unit_type.clone(),
                })?;
            let params = UnitSpawnParams {
                faction: FactionId(spawn.faction.unwrap_or(spawn.player)),
                owner: PlayerId(spawn.player),
                position: spawn.position,
                parking: spawn.parking.map(|p| ParkingOrder {
                    slot: p.slot,
                    next_state: p.next_state,
                }),
            };
            let handle = runner.sim.spawn_unit(data, params)?;

            handles.insert(spawn.label.as_str(), handle);
            runner.spawn_order.push(handle);
            runner.labels.insert(handle, spawn.label.clone());
            runner.unit_types.insert(handle, spawn.unit_type.clone());
            if !runner.players.contains(&params.owner) {
                runner.players.push(params.owner);
            }
        }
        runner.players.sort_unstable();

        let resolve = |label: &str| {
            handles
                .get(label)
                .copied()
                .ok_or_else(|| ScenarioError::UnknownLabel(label.to_string()))
        };
        for order in &scenario.orders {
            match order {
                ScenarioOrder::Move { unit, point, queued } => {
                    runner.sim.order_move(resolve(unit)?, *point, *queued)?;
                }
                ScenarioOrder::Attack {
                    unit,
                    target,
                    queued,
                } => {
                    runner
                        .sim
                        .order_attack(resolve(unit)?, resolve(target)?, *queued)?;
                }
            }
        }

        tracing::info!(
            scenario = %runner.name,
            units = runner.spawn_order.len(),
            orders = scenario.orders.len(),
            "Scenario loaded"
        );
        Ok(runner)
    }

    /// The simulation being driven.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Scenario label of a unit.
    #[must_use]
    pub fn label(&self, handle: UnitHandle) -> Option<&str> {
        self.labels.get(&handle).map(String::as_str)
    }

    /// Handle of a labelled unit, while it is alive.
    #[must_use]
    pub fn handle(&self, label: &str) -> Option<UnitHandle> {
        self.labels
            .iter()
            .find(|(handle, l)| l.as_str() == label && self.sim.unit(**handle).is_some())
            .map(|(handle, _)| *handle)
    }

    /// Advance one tick and record its events.
    pub fn step(&mut self) -> Result<TickEvents> {
        let events = self.sim.tick()?;
        self.counts.record(&events);

        let tick = self.sim.get_tick();
        for handle in &events.deaths {
            let label = self
                .labels
                .get(handle)
                .cloned()
                .unwrap_or_else(|| handle.to_string());
            tracing::debug!(tick, unit = %label, "Unit died");
            self.deaths.push(DeathRecord { label, tick });
        }
        Ok(events)
    }

    /// Players that started the run and still own units.
    fn remaining_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .copied()
            .filter(|p| self.sim.roster().count(*p) > 0)
            .collect()
    }

    /// Run up to `config.ticks` ticks and summarize.
    ///
    /// # Errors
    ///
    /// Returns the first error a tick reports.
    pub fn run(&mut self, config: RunConfig) -> Result<RunSummary> {
        for _ in 0..config.ticks {
            self.step()?;
            if config.stop_on_elimination && self.remaining_players().len() <= 1 {
                tracing::info!(tick = self.sim.get_tick(), "Only one side left, stopping");
                break;
            }
        }
        Ok(self.summary())
    }

    /// Summarize the current state.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let survivors = self
            .spawn_order
            .iter()
            .filter_map(|handle| self.sim.unit(*handle).map(|unit| (handle, unit)))
            .map(|(handle, unit)| SurvivorSummary {
                label: self.labels.get(handle).cloned().unwrap_or_default(),
                unit_type: self.unit_types.get(handle).cloned().unwrap_or_default(),
                player: unit.owner().0,
                health: unit.health(),
                state: unit.state(),
                position: unit.position(),
                attack_target: unit
                    .attack_target()
                    .map(|t| self.labels.get(&t).cloned().unwrap_or_else(|| t.to_string())),
            })
            .collect();

        let units_per_player = self
            .players
            .iter()
            .map(|p| (p.0, self.sim.roster().count(*p)))
            .collect();

        let remaining = self.remaining_players();
        let winner = match remaining.as_slice() {
            [only] if self.players.len() > 1 => Some(only.0),
            _ => None,
        };

        RunSummary {
            scenario: self.name.clone(),
            ticks: self.sim.get_tick(),
            state_hash: self.sim.state_hash(),
            survivors,
            deaths: self.deaths.clone(),
            event_counts: self.counts,
            units_per_player,
            winner,
        }
    }
}

/// Load, run and summarize a scenario in one call.
pub fn run_scenario(
    scenario: &Scenario,
    config: RunConfig,
) -> std::result::Result<RunSummary, ScenarioError> {
    let mut runner = HeadlessRunner::from_scenario(scenario)?;
    Ok(runner.run(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::GameError;

    const DUEL: &str = r#"Scenario(
        name: "duel",
        unit_types: [
            UnitData(
                id: "archer",
                name: "Archer",
                health: 70,
                speed: 3.5,
                stopping_distance: 0.25,
                collider_radius: 0.4,
                sight_range: 10.0,
                combat: Some(CombatData(attack_rate: 1.5, attack_range: 6.0, weapon_damage: 9)),
            ),
            UnitData(
                id: "acolyte",
                name: "Acolyte",
                health: 60,
                speed: 3.0,
                stopping_distance: 0.25,
                collider_radius: 0.4,
                sight_range: 9.0,
                phase_die: true,
            ),
        ],
        spawns: [
            SpawnPlacement(
                label: "hunter",
                unit_type: "archer",
                player: 0,
                position: (x: 0.0, y: 0.0),
            ),
            SpawnPlacement(
                label: "prey",
                unit_type: "acolyte",
                player: 1,
                position: (x: 3.0, y: 0.0),
            ),
        ],
        orders: [
            Attack(unit: "hunter", target: "prey"),
        ],
    )"#;

    fn duel() -> Scenario {
        Scenario::from_ron_str(DUEL).unwrap()
    }

    #[test]
    fn test_runner_spawns_and_orders() {
        let runner = HeadlessRunner::from_scenario(&duel()).unwrap();
        let hunter = runner.handle("hunter").unwrap();
        let prey = runner.handle("prey").unwrap();

        assert_eq!(runner.label(hunter), Some("hunter"));
        assert_eq!(runner.simulation().units().len(), 2);
        assert_eq!(
            runner.simulation().unit(hunter).unwrap().queue().len(),
            1
        );
        assert_eq!(
            runner.simulation().unit(prey).unwrap().owner(),
            PlayerId(1)
        );
    }

    #[test]
    fn test_duel_ends_with_a_winner() {
        let summary = run_scenario(
            &duel(),
            RunConfig {
                ticks: 2000,
                stop_on_elimination: true,
            },
        )
        .unwrap();

        assert_eq!(summary.winner, Some(0));
        assert!(summary.ticks < 2000);
        assert_eq!(summary.deaths.len(), 1);
        assert_eq!(summary.deaths[0].label, "prey");
        assert_eq!(summary.survivors.len(), 1);
        assert_eq!(summary.survivors[0].label, "hunter");
        assert_eq!(summary.survivors[0].attack_target, None);
        assert_eq!(summary.event_counts.deaths, 1);
        assert!(summary.event_counts.hits >= 7);
        assert_eq!(summary.units_per_player.get(&1), Some(&0));
    }

    #[test]
    fn test_fixed_run_is_reproducible() {
        let a = run_scenario(&duel(), RunConfig::fixed(150)).unwrap();
        let b = run_scenario(&duel(), RunConfig::fixed(150)).unwrap();
        assert_eq!(a.ticks, 150);
        assert_eq!(a, b);
    }

    #[test]
    fn test_order_for_parking_unit_fails() {
        let mut scenario = duel();
        scenario.spawns[0].parking = Some(crate::scenario::ParkingPlacement {
            slot: Vec2Fixed::from_ints(0, 2),
            next_state: UnitStateLabel::Ready,
        });
        assert!(matches!(
            HeadlessRunner::from_scenario(&scenario),
            Err(ScenarioError::Game(GameError::InvalidState(_)))
        ));
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let summary = run_scenario(&duel(), RunConfig::fixed(5)).unwrap();
        let json = serde_json::to_string(&summary).unwrap();
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scenario, "duel");
        assert_eq!(back.survivors.len(), summary.survivors.len());
        assert_eq!(back.state_hash, summary.state_hash);
    }
}
