//! The per-unit aggregate and its tick flow.
//!
//! A [`UnitState`] owns its command queue, proximity sets, navigation
//! adapter and both controllers. Other units are only ever seen through
//! [`UnitLookup`] snapshots, so one unit's tick never borrows another.

use serde::{Deserialize, Serialize};

use crate::combat::{CombatContext, CombatController, CombatPhase};
use crate::command_queue::{CommandItem, CommandQueue};
use crate::components::{
    CombatStats, ManaPool, TickClock, UnitCategory, UnitFlags, UnitHandle, UnitLookup,
    UnitStateLabel, UnitView, Vitals,
};
use crate::data::{TuningData, UnitData};
use crate::error::{GameError, Result};
use crate::events::{PendingHit, RosterChange, UnitEvent};
use crate::factions::{FactionId, PlayerId};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::movement::{MovementController, MovementOutcome, MovementPhase};
use crate::navigation::{NavigationAdapter, PathPlanner};
use crate::proximity::{ProximityTracker, SensorEvent};

/// Complete state of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    handle: UnitHandle,
    type_id: String,
    name: String,
    category: UnitCategory,
    faction: FactionId,
    owner: PlayerId,
    vitals: Vitals,
    mana: ManaPool,
    flags: UnitFlags,
    stats: CombatStats,
    state: UnitStateLabel,
    facing: Vec2Fixed,
    #[serde(with = "fixed_serde")]
    collider_radius: Fixed,
    #[serde(with = "fixed_serde")]
    sight_range: Fixed,
    is_dead: bool,
    queue: CommandQueue,
    proximity: ProximityTracker,
    nav: NavigationAdapter,
    combat: CombatController,
    movement: MovementController,
}

impl UnitState {
    /// Build a unit from its definition.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Configuration`] if the definition is unusable,
    /// for example a kinematic unit without navigation speed.
    pub fn from_data(
        handle: UnitHandle,
        data: &UnitData,
        faction: FactionId,
        owner: PlayerId,
        position: Vec2Fixed,
    ) -> Result<Self> {
        data.ensure_valid()?;
        Ok(Self {
            handle,
            type_id: data.id.clone(),
            name: data.name.clone(),
            category: data.category,
            faction,
            owner,
            vitals: Vitals::new(data.health),
            mana: ManaPool::new(data.mana, data.mana_income, data.mana_storage),
            flags: data.flags(),
            stats: data.combat_stats(),
            state: UnitStateLabel::Standby,
            facing: Vec2Fixed::UP,
            collider_radius: data.collider_radius,
            sight_range: data.sight_range,
            is_dead: false,
            queue: CommandQueue::new(),
            proximity: ProximityTracker::new(),
            nav: NavigationAdapter::new(
                position,
                data.kinematic,
                data.speed,
                data.stopping_distance,
                data.collider_radius,
            ),
            combat: CombatController::new(),
            movement: MovementController::new(),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Handle of this unit.
    #[must_use]
    pub const fn handle(&self) -> UnitHandle {
        self.handle
    }

    /// Definition id the unit was built from.
    #[must_use]
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Broad classification.
    #[must_use]
    pub const fn category(&self) -> UnitCategory {
        self.category
    }

    /// Owning faction.
    #[must_use]
    pub const fn faction(&self) -> FactionId {
        self.faction
    }

    /// Owning player.
    #[must_use]
    pub const fn owner(&self) -> PlayerId {
        self.owner
    }

    /// Health bookkeeping.
    #[must_use]
    pub const fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    /// Health percentage (0-100).
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.vitals.health()
    }

    /// Mana reserve.
    #[must_use]
    pub const fn mana(&self) -> &ManaPool {
        &self.mana
    }

    /// Capability flags.
    #[must_use]
    pub const fn flags(&self) -> UnitFlags {
        self.flags
    }

    /// Weapon stats.
    #[must_use]
    pub const fn stats(&self) -> CombatStats {
        self.stats
    }

    /// State-machine label.
    #[must_use]
    pub const fn state(&self) -> UnitStateLabel {
        self.state
    }

    /// Facing as a unit vector.
    #[must_use]
    pub const fn facing(&self) -> Vec2Fixed {
        self.facing
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.nav.position()
    }

    /// Body radius.
    #[must_use]
    pub const fn collider_radius(&self) -> Fixed {
        self.collider_radius
    }

    /// Sight sensor radius.
    #[must_use]
    pub const fn sight_range(&self) -> Fixed {
        self.sight_range
    }

    /// Whether death has been handled.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.is_dead
    }

    /// Alive and not yet handled as dead.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.is_dead && self.vitals.is_alive()
    }

    /// In the `Attacking` combat phase.
    #[must_use]
    pub const fn is_attacking(&self) -> bool {
        self.combat.is_attacking()
    }

    /// Walking to the initial parking slot.
    #[must_use]
    pub const fn is_parking(&self) -> bool {
        self.movement.is_parking()
    }

    /// Locked attack target.
    #[must_use]
    pub const fn attack_target(&self) -> Option<UnitHandle> {
        self.combat.attack_target()
    }

    /// Command queue.
    #[must_use]
    pub const fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Visibility sets.
    #[must_use]
    pub const fn proximity(&self) -> &ProximityTracker {
        &self.proximity
    }

    /// Navigation adapter.
    #[must_use]
    pub const fn nav(&self) -> &NavigationAdapter {
        &self.nav
    }

    /// Combat controller.
    #[must_use]
    pub const fn combat(&self) -> &CombatController {
        &self.combat
    }

    /// Movement controller.
    #[must_use]
    pub const fn movement(&self) -> &MovementController {
        &self.movement
    }

    /// Snapshot for other units' lookups.
    #[must_use]
    pub fn view(&self) -> UnitView {
        UnitView {
            handle: self.handle,
            position: self.nav.position(),
            collider_radius: self.collider_radius,
            alive: self.is_alive(),
            moving: self.nav.is_moving(),
        }
    }

    /// Teleport without steering.
    pub fn warp(&mut self, position: Vec2Fixed) {
        self.nav.warp(position);
    }

    fn combat_parts(
        &mut self,
    ) -> (&mut CombatController, CombatContext<'_>, &mut ProximityTracker) {
        (
            &mut self.combat,
            CombatContext {
                me: self.handle,
                flags: self.flags,
                stats: self.stats,
                queue: &mut self.queue,
                nav: &mut self.nav,
                facing: &mut self.facing,
            },
            &mut self.proximity,
        )
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Whether the unit takes orders right now.
    #[must_use]
    pub const fn is_controllable(&self) -> bool {
        self.is_alive() && !self.movement.is_parking()
    }

    /// Queue a move. Without `add_to_queue`, the current attack and every
    /// queued command are dropped first.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] while dead or parking.
    pub fn order_move(&mut self, point: Vec2Fixed, add_to_queue: bool) -> Result<()> {
        if !self.is_controllable() {
            return Err(GameError::InvalidState(format!(
                "{} cannot take orders",
                self.handle
            )));
        }
        if !add_to_queue {
            self.combat.clear_attack(self.handle, &mut self.queue, &mut self.nav);
        }
        self.queue.enqueue(CommandItem::Move { point });
        Ok(())
    }

    /// Lock `target` and queue an attack toward it.
    ///
    /// Returns `false` if the unit has no weapon.
    pub fn try_attack(&mut self, target: UnitView, add_to_queue: bool) -> bool {
        if !self.is_alive() {
            return false;
        }
        let (combat, mut ctx, _) = self.combat_parts();
        combat.try_attack(&mut ctx, target.handle, target.position, add_to_queue)
    }

    /// Drop the current target and clear the queue.
    pub fn clear_attack(&mut self) {
        self.combat.clear_attack(self.handle, &mut self.queue, &mut self.nav);
    }

    /// Walk to `slot` before becoming controllable, then adopt `next_state`.
    pub fn begin_parking(
        &mut self,
        slot: Vec2Fixed,
        next_state: UnitStateLabel,
        events: &mut Vec<UnitEvent>,
    ) {
        self.movement.begin_parking(&mut self.queue, slot, next_state);
        self.set_state(UnitStateLabel::Parking, events);
    }

    /// Set the state label, reporting a change.
    pub fn set_state(&mut self, state: UnitStateLabel, events: &mut Vec<UnitEvent>) {
        if self.state == state {
            return;
        }
        events.push(UnitEvent::StateChanged {
            unit: self.handle,
            from: self.state,
            to: state,
        });
        tracing::debug!(unit = %self.handle, from = ?self.state, to = ?state, "State changed");
        self.state = state;
    }

    /// Spend mana if enough is stored.
    pub fn spend_mana(&mut self, amount: Fixed) -> bool {
        self.mana.spend(amount)
    }

    // ========================================================================
    // Sensors
    // ========================================================================

    /// Apply a boundary event; returns the other unit on a fresh inner contact.
    pub fn apply_sensor_event(&mut self, event: &SensorEvent) -> Option<UnitHandle> {
        if self.is_dead {
            return None;
        }
        tracing::trace!(
            unit = %self.handle,
            other = %event.other,
            volume = ?event.volume,
            edge = ?event.edge,
            "Sensor"
        );
        self.proximity.apply(event)
    }

    /// React to a unit touching the inner contact trigger.
    ///
    /// Only a parking unit bumped by a unit at rest shifts its slot, away
    /// from the other unit by its own footprint width.
    ///
    /// # Errors
    ///
    /// Propagates queue errors from the movement controller.
    pub fn handle_bump(&mut self, other: &UnitView) -> Result<bool> {
        let direction = if other.position.x > self.position().x {
            -Fixed::ONE
        } else {
            Fixed::ONE
        };
        let footprint = self.collider_radius * Fixed::from_num(2);
        let shifted = self
            .movement
            .handle_bump(&mut self.queue, footprint, direction, other.moving)?;
        if shifted {
            tracing::debug!(unit = %self.handle, other = %other.handle, "Parking slot shifted");
        }
        Ok(shifted)
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Grant one point of passive regeneration when it is due.
    pub fn update_health(&mut self, now: Fixed, tuning: &TuningData) {
        if !self.is_alive() || self.vitals.health() >= 100 {
            return;
        }
        if now >= self.vitals.regen_due_at() {
            self.vitals.regenerate(1);
            self.vitals.delay_regen_until(now + tuning.health_recharge_rate);
        }
    }

    /// Apply damage. Returns `true` when this hit was lethal.
    ///
    /// Damage to a dead unit is ignored.
    pub fn receive_damage(
        &mut self,
        amount: u32,
        now: Fixed,
        tuning: &TuningData,
        events: &mut Vec<UnitEvent>,
    ) -> bool {
        if !self.is_alive() {
            return false;
        }
        let actual = self.vitals.apply_damage(amount);
        self.vitals.delay_regen_until(now + tuning.hit_recharge_delay);
        events.push(UnitEvent::DamageTaken {
            unit: self.handle,
            amount: actual,
            health: self.vitals.health(),
        });
        !self.vitals.is_alive()
    }

    /// Run death handling once. Later calls do nothing and return `false`.
    pub fn handle_die(&mut self, events: &mut Vec<UnitEvent>) -> bool {
        if self.is_dead {
            return false;
        }
        self.is_dead = true;
        self.combat.clear_attack(self.handle, &mut self.queue, &mut self.nav);
        self.movement.halt();
        self.nav.disable();
        self.proximity.clear();

        events.push(UnitEvent::Died {
            unit: self.handle,
            phase_out: self.flags.phase_die,
        });
        events.push(UnitEvent::RosterChanged {
            player: self.owner,
            unit: self.handle,
            change: RosterChange::Removed,
        });
        tracing::info!(unit = %self.handle, name = %self.name, "Unit died");
        true
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Run one tick: target pick, attack routine, movement, navigation,
    /// health and mana.
    ///
    /// Returns the hit produced by the attack cadence, if any.
    ///
    /// # Errors
    ///
    /// Propagates [`GameError::InvalidState`] from the movement controller.
    pub fn tick(
        &mut self,
        lookup: &impl UnitLookup,
        clock: TickClock,
        tuning: &TuningData,
        planner: &dyn PathPlanner,
        events: &mut Vec<UnitEvent>,
    ) -> Result<Option<PendingHit>> {
        if !self.is_alive() {
            return Ok(None);
        }

        let hit = {
            let parking = self.movement.is_parking();
            let (combat, mut ctx, proximity) = self.combat_parts();
            if !parking && ctx.flags.can_attack {
                combat.auto_pick_target(&mut ctx, proximity, lookup);
            } else {
                proximity.prune(lookup);
            }
            combat.handle_attack_routine(&mut ctx, lookup, clock, tuning, events)
        };

        let outcome = self.movement.handle_movement(
            self.handle,
            &mut self.queue,
            &mut self.nav,
            &mut self.facing,
            clock,
            tuning,
        )?;
        if let MovementOutcome::Parked { next_state } = outcome {
            self.set_state(next_state, events);
        }

        self.nav.advance(clock.dt, planner);
        self.update_health(clock.now, tuning);
        self.mana.accrue(clock.dt);
        self.refresh_state(events);

        Ok(hit)
    }

    fn refresh_state(&mut self, events: &mut Vec<UnitEvent>) {
        let label = if self.movement.is_parking() {
            UnitStateLabel::Parking
        } else if self.combat.phase() != CombatPhase::Idle {
            UnitStateLabel::Attacking
        } else if self.movement.phase() == MovementPhase::Moving {
            UnitStateLabel::Moving
        } else if self.state.is_external() {
            self.state
        } else {
            UnitStateLabel::Standby
        };
        self.set_state(label, events);
    }
}
