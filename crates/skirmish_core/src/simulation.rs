//! Core simulation loop.
//!
//! The simulation runs at a fixed tick rate and processes every unit
//! deterministically, in ascending handle order.
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - Units see each other through a snapshot taken at the start of the tick
//! - Weapon hits and deaths are applied after every unit has run
//! - Same inputs always produce the same [`Simulation::state_hash`]
//!
//! # Example
//!
//! ```
//! use skirmish_core::data::UnitData;
//! use skirmish_core::math::Vec2Fixed;
//! use skirmish_core::simulation::{Simulation, UnitSpawnParams};
//!
//! let data = UnitData::from_ron_str(
//!     r#"UnitData(
//!         id: "scout", name: "Scout", health: 60, speed: 5.0,
//!         stopping_distance: 0.25, collider_radius: 0.4, sight_range: 9.0,
//!     )"#,
//!     "scout.ron",
//! )
//! .unwrap();
//!
//! let mut sim = Simulation::new();
//! let scout = sim.spawn_unit(&data, UnitSpawnParams::default()).unwrap();
//! sim.order_move(scout, Vec2Fixed::from_ints(10, 0), false).unwrap();
//!
//! sim.tick().unwrap();
//! assert_eq!(sim.get_tick(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::components::{TickClock, UnitHandle, UnitLookup, UnitStateLabel, UnitView};
use crate::data::{TuningData, UnitData};
use crate::error::{GameError, Result};
use crate::events::{PendingHit, RosterChange, UnitEvent};
use crate::factions::{FactionId, PlayerId};
use crate::math::{Fixed, Vec2Fixed};
use crate::navigation::{PathPlanner, StraightLinePlanner};
use crate::proximity::{SensorBody, SensorEvent, SensorSweep};
use crate::roster::PlayerRoster;
use crate::unit::UnitState;

/// Ticks per second for the simulation.
pub const TICK_RATE: u32 = 20;

/// Duration of one tick in seconds.
#[must_use]
pub fn tick_delta() -> Fixed {
    Fixed::ONE / Fixed::from_num(TICK_RATE)
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    unit: Option<UnitState>,
}

/// Generational storage for units.
///
/// Removing a unit bumps its slot's generation, so stale handles stop
/// resolving even after the slot is reused.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl UnitRegistry {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the unit built by `build` under a fresh handle.
    ///
    /// Nothing is stored if `build` fails.
    ///
    /// # Errors
    ///
    /// Returns whatever `build` returns, or [`GameError::Configuration`]
    /// if the registry has run out of indices.
    pub fn insert_with<F>(&mut self, build: F) -> Result<UnitHandle>
    where
        F: FnOnce(UnitHandle) -> Result<UnitState>,
    {
        let handle = match self.free.last() {
            Some(&index) => UnitHandle::new(index, self.slots[index as usize].generation),
            None => {
                let index = u32::try_from(self.slots.len())
                    .map_err(|_| GameError::Configuration("unit registry is full".to_string()))?;
                UnitHandle::new(index, 0)
            }
        };

        let unit = build(handle)?;

        if self.free.last() == Some(&handle.index()) {
            self.free.pop();
            self.slots[handle.index() as usize].unit = Some(unit);
        } else {
            self.slots.push(Slot {
                generation: 0,
                unit: Some(unit),
            });
        }
        Ok(handle)
    }

    /// Remove a unit, invalidating every copy of its handle.
    pub fn remove(&mut self, handle: UnitHandle) -> Option<UnitState> {
        let slot = self.slot_mut(handle)?;
        let unit = slot.unit.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        Some(unit)
    }

    /// Get a unit by handle.
    #[must_use]
    pub fn get(&self, handle: UnitHandle) -> Option<&UnitState> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.unit.as_ref())
    }

    /// Get a mutable reference to a unit by handle.
    pub fn get_mut(&mut self, handle: UnitHandle) -> Option<&mut UnitState> {
        self.slot_mut(handle).and_then(|slot| slot.unit.as_mut())
    }

    /// Whether the handle still resolves.
    #[must_use]
    pub fn contains(&self, handle: UnitHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of stored units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.unit.is_some()).count()
    }

    /// Whether no units are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live handles in ascending order.
    #[must_use]
    pub fn handles(&self) -> Vec<UnitHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    /// Iterate over units in ascending handle order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitHandle, &UnitState)> {
        self.slots.iter().filter_map(|slot| {
            let unit = slot.unit.as_ref()?;
            Some((unit.handle(), unit))
        })
    }

    fn slot_mut(&mut self, handle: UnitHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// Initial slot a freshly spawned unit walks to before taking orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParkingOrder {
    /// Slot position.
    pub slot: Vec2Fixed,
    /// Label adopted once parked.
    pub next_state: UnitStateLabel,
}

/// Parameters for spawning a unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitSpawnParams {
    /// Owning faction.
    pub faction: FactionId,
    /// Owning player.
    pub owner: PlayerId,
    /// Spawn position.
    pub position: Vec2Fixed,
    /// Walk to a slot first.
    pub parking: Option<ParkingOrder>,
}

/// Events generated during a simulation tick.
///
/// These events can be used by the game layer to trigger effects,
/// sounds, animations, etc.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Unit notifications, in the order they happened.
    pub unit_events: Vec<UnitEvent>,
    /// Weapon hits applied this tick.
    pub hits: Vec<PendingHit>,
    /// Units that died this tick and were removed.
    pub deaths: Vec<UnitHandle>,
}

/// The unit simulation.
///
/// # Tick Order
///
/// 1. **Sensors** - sweep for volume crossings, apply queued sensor events
/// 2. **Units** - target pick, attack routine, movement, navigation,
///    health regen and mana, per unit in handle order
/// 3. **Hits** - apply weapon hits produced this tick
/// 4. **Deaths** - run death handling and remove dead units
pub struct Simulation {
    tick: u64,
    now: Fixed,
    dt: Fixed,
    tuning: TuningData,
    units: UnitRegistry,
    roster: PlayerRoster,
    planner: Box<dyn PathPlanner>,
    sweep: Option<SensorSweep>,
    queued_sensor_events: Vec<(UnitHandle, SensorEvent)>,
    pending_events: Vec<UnitEvent>,
}

impl Simulation {
    /// Create an empty simulation with default tuning, straight-line
    /// pathing and automatic sensors.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tuning(TuningData::default())
    }

    /// Create an empty simulation with the given tuning.
    #[must_use]
    pub fn with_tuning(tuning: TuningData) -> Self {
        Self {
            tick: 0,
            now: Fixed::ZERO,
            dt: tick_delta(),
            tuning,
            units: UnitRegistry::new(),
            roster: PlayerRoster::new(),
            planner: Box::new(StraightLinePlanner),
            sweep: Some(SensorSweep::new()),
            queued_sensor_events: Vec::new(),
            pending_events: Vec::new(),
        }
    }

    /// Replace the path planner.
    #[must_use]
    pub fn with_planner(mut self, planner: Box<dyn PathPlanner>) -> Self {
        self.planner = planner;
        self
    }

    /// Turn the built-in distance sensors on or off.
    ///
    /// With sensors off, visibility only changes through
    /// [`push_sensor_event`](Self::push_sensor_event).
    pub fn set_auto_sensors(&mut self, enabled: bool) {
        self.sweep = enabled.then(SensorSweep::new);
    }

    /// Get the current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Simulation time in seconds.
    #[must_use]
    pub const fn now(&self) -> Fixed {
        self.now
    }

    /// Tuning in use.
    #[must_use]
    pub const fn tuning(&self) -> &TuningData {
        &self.tuning
    }

    /// Unit storage.
    #[must_use]
    pub const fn units(&self) -> &UnitRegistry {
        &self.units
    }

    /// Get a unit by handle.
    #[must_use]
    pub fn unit(&self, handle: UnitHandle) -> Option<&UnitState> {
        self.units.get(handle)
    }

    /// Get a mutable unit by handle.
    pub fn unit_mut(&mut self, handle: UnitHandle) -> Option<&mut UnitState> {
        self.units.get_mut(handle)
    }

    /// Per-player rosters.
    #[must_use]
    pub const fn roster(&self) -> &PlayerRoster {
        &self.roster
    }

    /// Spawn a unit from its definition.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Configuration`] if the definition is unusable.
    pub fn spawn_unit(&mut self, data: &UnitData, params: UnitSpawnParams) -> Result<UnitHandle> {
        let handle = self.units.insert_with(|handle| {
            UnitState::from_data(handle, data, params.faction, params.owner, params.position)
        })?;

        self.roster.add(params.owner, handle);
        self.pending_events.push(UnitEvent::RosterChanged {
            player: params.owner,
            unit: handle,
            change: RosterChange::Added,
        });

        if let (Some(parking), Some(unit)) = (params.parking, self.units.get_mut(handle)) {
            unit.begin_parking(parking.slot, parking.next_state, &mut self.pending_events);
        }

        tracing::info!(unit = %handle, id = %data.id, faction = %params.faction, "Unit spawned");
        Ok(handle)
    }

    /// Remove a unit without running death handling.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if the handle does not resolve.
    pub fn despawn_unit(&mut self, handle: UnitHandle) -> Result<UnitState> {
        let unit = self
            .units
            .remove(handle)
            .ok_or(GameError::UnitNotFound(handle))?;
        self.roster.remove(unit.owner(), handle);
        self.pending_events.retain(|event| {
            !matches!(event, UnitEvent::RosterChanged { unit: queued, .. } if *queued == handle)
        });
        Ok(unit)
    }

    /// Order a unit to move.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] for a stale handle and
    /// [`GameError::InvalidState`] while the unit is parking.
    pub fn order_move(
        &mut self,
        unit: UnitHandle,
        point: Vec2Fixed,
        add_to_queue: bool,
    ) -> Result<()> {
        self.units
            .get_mut(unit)
            .ok_or(GameError::UnitNotFound(unit))?
            .order_move(point, add_to_queue)
    }

    /// Order a unit to attack another.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidTarget`] if the target is gone or dead,
    /// [`GameError::UnitNotFound`] for a stale attacker and
    /// [`GameError::InvalidState`] if the attacker cannot attack right now.
    pub fn order_attack(
        &mut self,
        unit: UnitHandle,
        target: UnitHandle,
        add_to_queue: bool,
    ) -> Result<()> {
        let view = self
            .units
            .get(target)
            .map(UnitState::view)
            .filter(|view| view.alive)
            .ok_or(GameError::InvalidTarget(target))?;

        let attacker = self.units.get_mut(unit).ok_or(GameError::UnitNotFound(unit))?;
        if !attacker.is_controllable() || !attacker.try_attack(view, add_to_queue) {
            return Err(GameError::InvalidState(format!("{unit} cannot attack {target}")));
        }
        Ok(())
    }

    /// Queue a sensor event for `owner`, applied at the start of the next tick.
    pub fn push_sensor_event(&mut self, owner: UnitHandle, event: SensorEvent) {
        self.queued_sensor_events.push((owner, event));
    }

    /// Advance the simulation by one tick.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if a unit breaks a queue or
    /// navigation-mode invariant.
    pub fn tick(&mut self) -> Result<TickEvents> {
        let clock = TickClock {
            now: self.now,
            dt: self.dt,
        };
        let mut events = TickEvents {
            unit_events: std::mem::take(&mut self.pending_events),
            ..TickEvents::default()
        };
        let lookup = self.snapshot();

        // 1. Sensors
        if let Some(sweep) = self.sweep.as_mut() {
            let bodies: Vec<SensorBody> = self
                .units
                .iter()
                .filter(|(_, unit)| unit.is_alive())
                .map(|(handle, unit)| SensorBody {
                    handle,
                    faction: unit.faction(),
                    position: unit.position(),
                    collider_radius: unit.collider_radius(),
                    sight_range: unit.sight_range(),
                })
                .collect();
            self.queued_sensor_events.extend(sweep.detect(&bodies, &self.tuning));
        }
        for (owner, event) in std::mem::take(&mut self.queued_sensor_events) {
            let Some(unit) = self.units.get_mut(owner) else {
                tracing::warn!(
                    unit = %owner,
                    other = %event.other,
                    "Sensor event for missing unit"
                );
                continue;
            };
            if let Some(other) = unit.apply_sensor_event(&event).and_then(|h| lookup.view(h)) {
                unit.handle_bump(&other)?;
            }
        }

        // 2. Units
        for handle in self.units.handles() {
            let Some(unit) = self.units.get_mut(handle) else {
                continue;
            };
            let hit = unit.tick(
                &lookup,
                clock,
                &self.tuning,
                self.planner.as_ref(),
                &mut events.unit_events,
            )?;
            events.hits.extend(hit);
        }

        // 3. Hits
        for hit in &events.hits {
            if let Some(target) = self.units.get_mut(hit.target) {
                target.receive_damage(hit.damage, clock.now, &self.tuning, &mut events.unit_events);
            }
        }

        // 4. Deaths
        let dead: Vec<UnitHandle> = self
            .units
            .iter()
            .filter(|(_, unit)| !unit.is_alive())
            .map(|(handle, _)| handle)
            .collect();
        for handle in dead {
            if let Some(mut unit) = self.units.remove(handle) {
                unit.handle_die(&mut events.unit_events);
                self.roster.remove(unit.owner(), handle);
                events.deaths.push(handle);
            }
        }

        self.tick += 1;
        self.now += self.dt;

        #[cfg(feature = "debug-validation")]
        self.validate_invariants();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        Ok(events)
    }

    /// Hash of everything that affects future ticks.
    ///
    /// Two simulations fed the same inputs report the same hash after
    /// every tick.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.now.to_bits().hash(&mut hasher);
        self.units.len().hash(&mut hasher);

        for (handle, unit) in self.units.iter() {
            handle.hash(&mut hasher);
            unit.position().x.to_bits().hash(&mut hasher);
            unit.position().y.to_bits().hash(&mut hasher);
            unit.facing().x.to_bits().hash(&mut hasher);
            unit.facing().y.to_bits().hash(&mut hasher);
            unit.vitals().current_health().hash(&mut hasher);
            unit.mana().current.to_bits().hash(&mut hasher);
            unit.state().hash(&mut hasher);
            unit.combat().phase().hash(&mut hasher);
            unit.combat().next_attack_at().to_bits().hash(&mut hasher);
            unit.nav().mode().hash(&mut hasher);
            unit.nav().avoidance_radius().to_bits().hash(&mut hasher);
            unit.queue().len().hash(&mut hasher);
            for command in unit.queue().iter() {
                command.point().x.to_bits().hash(&mut hasher);
                command.point().y.to_bits().hash(&mut hasher);
                command.attack_target().hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    fn snapshot(&self) -> BTreeMap<UnitHandle, UnitView> {
        self.units
            .iter()
            .map(|(handle, unit)| (handle, unit.view()))
            .collect()
    }

    #[cfg(feature = "debug-validation")]
    fn validate_invariants(&self) {
        for (handle, unit) in self.units.iter() {
            debug_assert!(unit.is_alive(), "{handle} survived its death tick");
            debug_assert!(unit.health() <= 100, "{handle} health above 100");
            debug_assert!(
                self.roster.units_of(unit.owner()).any(|h| h == handle),
                "{handle} missing from its owner's roster"
            );
        }
        for player in self.roster.players() {
            for handle in self.roster.units_of(player) {
                debug_assert!(
                    self.units.get(handle).is_some_and(|unit| unit.owner() == player),
                    "{handle} on the roster of {player:?} but not registered to it"
                );
            }
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("now", &self.now)
            .field("units", &self.units.len())
            .field("auto_sensors", &self.sweep.is_some())
            .finish_non_exhaustive()
    }
}
