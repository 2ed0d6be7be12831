//! Target acquisition and the attack state machine.
//!
//! ```text
//! Idle ──try_attack──▶ Engaging ──out of range──▶ AttackPositioning
//!                         │                              │
//!                         └──────in range & facing───────┴──▶ Attacking
//! any ──target dead or gone──▶ Idle (queue cleared)
//! ```
//!
//! The controller owns only its phase and attack cadence. The unit's queue,
//! navigation and facing are borrowed through [`CombatContext`] for the
//! duration of one call.

use serde::{Deserialize, Serialize};

use crate::command_queue::{CommandItem, CommandQueue};
use crate::components::{CombatStats, TickClock, UnitFlags, UnitHandle, UnitLookup, UnitView};
use crate::data::TuningData;
use crate::events::{PendingHit, UnitEvent};
use crate::math::{facing_error, fixed_serde, rotate_towards, Fixed, Vec2Fixed};
use crate::navigation::NavigationAdapter;
use crate::proximity::ProximityTracker;

/// Phase of the attack state machine, carrying the locked target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombatPhase {
    /// No target.
    #[default]
    Idle,
    /// Target just locked; range not evaluated yet.
    Engaging {
        /// Locked target.
        target: UnitHandle,
    },
    /// Walking (or, for structures, waiting) until the target is in range.
    AttackPositioning {
        /// Locked target.
        target: UnitHandle,
    },
    /// In range and swinging on cadence.
    Attacking {
        /// Locked target.
        target: UnitHandle,
    },
}

impl CombatPhase {
    /// The locked target, if any.
    #[must_use]
    pub const fn target(self) -> Option<UnitHandle> {
        match self {
            Self::Idle => None,
            Self::Engaging { target }
            | Self::AttackPositioning { target }
            | Self::Attacking { target } => Some(target),
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Engaging { .. } => "engaging",
            Self::AttackPositioning { .. } => "positioning",
            Self::Attacking { .. } => "attacking",
        }
    }
}

/// The parts of a unit the combat controller works on.
#[derive(Debug)]
pub struct CombatContext<'a> {
    /// The unit itself.
    pub me: UnitHandle,
    /// Capability flags.
    pub flags: UnitFlags,
    /// Weapon stats.
    pub stats: CombatStats,
    /// Command queue.
    pub queue: &'a mut CommandQueue,
    /// Navigation adapter.
    pub nav: &'a mut NavigationAdapter,
    /// Unit facing (unit vector).
    pub facing: &'a mut Vec2Fixed,
}

/// Attack state machine with cadence bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatController {
    phase: CombatPhase,
    #[serde(with = "fixed_serde")]
    next_attack_at: Fixed,
    attack_ready: bool,
}

impl CombatController {
    /// Create an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> CombatPhase {
        self.phase
    }

    /// Locked target, if any.
    #[must_use]
    pub const fn attack_target(&self) -> Option<UnitHandle> {
        self.phase.target()
    }

    /// Whether the unit is in the `Attacking` phase.
    #[must_use]
    pub const fn is_attacking(&self) -> bool {
        matches!(self.phase, CombatPhase::Attacking { .. })
    }

    /// Whether the cadence fired on the last evaluated tick.
    #[must_use]
    pub const fn attack_ready(&self) -> bool {
        self.attack_ready
    }

    /// Simulation time after which the next attack may fire.
    #[must_use]
    pub const fn next_attack_at(&self) -> Fixed {
        self.next_attack_at
    }

    /// Lock `target` and queue an attack command toward `target_point`.
    ///
    /// Without `add_to_queue` the queue is cleared first, so it ends up
    /// holding exactly the new attack. Returns `false` if the unit has no
    /// weapon.
    pub fn try_attack(
        &mut self,
        ctx: &mut CombatContext<'_>,
        target: UnitHandle,
        target_point: Vec2Fixed,
        add_to_queue: bool,
    ) -> bool {
        if !ctx.flags.can_attack || target == ctx.me {
            return false;
        }
        if !add_to_queue {
            ctx.queue.clear();
        }
        ctx.queue.enqueue(CommandItem::Attack {
            point: target_point,
            target,
        });
        ctx.nav.try_toggle_to_agent();
        self.attack_ready = false;
        self.set_phase(ctx.me, CombatPhase::Engaging { target });
        true
    }

    /// Drop the target, make the unit steerable again and clear its queue.
    pub fn clear_attack(
        &mut self,
        me: UnitHandle,
        queue: &mut CommandQueue,
        nav: &mut NavigationAdapter,
    ) {
        nav.try_toggle_to_agent();
        queue.clear();
        self.attack_ready = false;
        self.set_phase(me, CombatPhase::Idle);
    }

    /// Pick the nearest live enemy in sight.
    ///
    /// Dead or removed entries are pruned first. Ties go to the lowest
    /// handle. If nothing is locked yet, the pick is engaged immediately.
    pub fn auto_pick_target(
        &mut self,
        ctx: &mut CombatContext<'_>,
        proximity: &mut ProximityTracker,
        lookup: &impl UnitLookup,
    ) -> Option<UnitHandle> {
        proximity.prune(lookup);

        let origin = ctx.nav.position();
        let mut best: Option<(Fixed, UnitView)> = None;
        for handle in proximity.enemies_in_sight() {
            let Some(view) = lookup.view(handle) else {
                continue;
            };
            let dist_sq = origin.distance_squared(view.position);
            if best.map_or(true, |(d, _)| dist_sq < d) {
                best = Some((dist_sq, view));
            }
        }

        let (_, view) = best?;
        if self.phase == CombatPhase::Idle {
            self.try_attack(ctx, view.handle, view.position, false);
        }
        Some(view.handle)
    }

    /// Run one tick of the attack state machine.
    ///
    /// Returns a hit to apply at the end of the tick when the cadence fires.
    pub fn handle_attack_routine(
        &mut self,
        ctx: &mut CombatContext<'_>,
        lookup: &impl UnitLookup,
        clock: TickClock,
        tuning: &TuningData,
        events: &mut Vec<UnitEvent>,
    ) -> Option<PendingHit> {
        let target = self.phase.target()?;

        let Some(view) = lookup.view(target).filter(|v| v.alive) else {
            tracing::debug!(unit = %ctx.me, target = %target, "Attack target lost");
            self.clear_attack(ctx.me, ctx.queue, ctx.nav);
            return None;
        };

        let range = if ctx.flags.melee {
            ctx.stats.attack_range + view.collider_radius
        } else {
            ctx.stats.attack_range
        };

        if !ctx.nav.is_in_range_of(view.position, Some(range)) {
            self.attack_ready = false;
            ctx.nav.try_toggle_to_agent();
            match ctx.queue.current_mut() {
                Some(current) => current.set_point(view.position),
                None => ctx.queue.enqueue(CommandItem::Attack {
                    point: view.position,
                    target,
                }),
            }
            self.set_phase(ctx.me, CombatPhase::AttackPositioning { target });
            return None;
        }

        if !self.is_attacking() {
            let ready = ctx.flags.kinematic || {
                face_towards(ctx, view.position, clock, tuning);
                facing_error(*ctx.facing, view.position - ctx.nav.position())
                    < tuning.attack_facing_threshold
            };
            if !ready {
                return None;
            }
            ctx.nav.try_toggle_to_obstacle();
            self.set_phase(ctx.me, CombatPhase::Attacking { target });
        }

        if !ctx.nav.is_moving() {
            face_towards(ctx, view.position, clock, tuning);
        }

        if clock.now > self.next_attack_at {
            self.attack_ready = true;
            self.next_attack_at = clock.now + ctx.stats.attack_rate;
            events.push(UnitEvent::AttackSwing {
                attacker: ctx.me,
                target,
            });
            Some(PendingHit {
                attacker: ctx.me,
                target,
                damage: ctx.stats.weapon_damage,
            })
        } else {
            self.attack_ready = false;
            None
        }
    }

    fn set_phase(&mut self, me: UnitHandle, phase: CombatPhase) {
        if self.phase != phase {
            tracing::debug!(
                unit = %me,
                from = self.phase.name(),
                to = phase.name(),
                "Combat phase"
            );
            self.phase = phase;
        }
    }
}

fn face_towards(
    ctx: &mut CombatContext<'_>,
    point: Vec2Fixed,
    clock: TickClock,
    tuning: &TuningData,
) {
    let desired = point - ctx.nav.position();
    if desired.is_zero() || facing_error(*ctx.facing, desired) < tuning.attack_facing_threshold {
        return;
    }
    *ctx.facing = rotate_towards(*ctx.facing, desired, tuning.facing_rate * clock.dt);
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::factions::Relation;
    use crate::proximity::{SensorEdge, SensorEvent, VolumeKind};

    struct Rig {
        queue: CommandQueue,
        nav: NavigationAdapter,
        facing: Vec2Fixed,
        flags: UnitFlags,
        stats: CombatStats,
    }

    const ME: UnitHandle = UnitHandle::new(0, 0);
    const ENEMY: UnitHandle = UnitHandle::new(1, 0);

    impl Rig {
        fn new(kinematic: bool) -> Self {
            Self {
                queue: CommandQueue::new(),
                nav: NavigationAdapter::new(
                    Vec2Fixed::ZERO,
                    kinematic,
                    Fixed::from_num(4),
                    Fixed::from_num(0.5),
                    Fixed::from_num(0.5),
                ),
                facing: Vec2Fixed::UP,
                flags: UnitFlags {
                    kinematic,
                    can_attack: true,
                    ..UnitFlags::default()
                },
                stats: CombatStats::new(Fixed::ONE, Fixed::from_num(2), 10),
            }
        }

        fn ctx(&mut self) -> CombatContext<'_> {
            CombatContext {
                me: ME,
                flags: self.flags,
                stats: self.stats,
                queue: &mut self.queue,
                nav: &mut self.nav,
                facing: &mut self.facing,
            }
        }
    }

    fn world(x: i32, alive: bool) -> BTreeMap<UnitHandle, UnitView> {
        [(
            ENEMY,
            UnitView {
                handle: ENEMY,
                position: Vec2Fixed::from_ints(x, 0),
                collider_radius: Fixed::from_num(0.5),
                alive,
                moving: false,
            },
        )]
        .into_iter()
        .collect()
    }

    fn clock(now: i32) -> TickClock {
        TickClock {
            now: Fixed::from_num(now),
            dt: Fixed::ONE / Fixed::from_num(20),
        }
    }

    #[test]
    fn test_try_attack_replaces_queue() {
        let mut rig = Rig::new(true);
        for x in 1..=3 {
            rig.queue.enqueue(CommandItem::Move {
                point: Vec2Fixed::from_ints(x, 0),
            });
        }
        let mut combat = CombatController::new();
        assert!(combat.try_attack(&mut rig.ctx(), ENEMY, Vec2Fixed::from_ints(5, 0), false));
        assert_eq!(rig.queue.len(), 1);
        assert_eq!(rig.queue.current().and_then(CommandItem::attack_target), Some(ENEMY));
        assert_eq!(combat.phase(), CombatPhase::Engaging { target: ENEMY });
    }

    #[test]
    fn test_queued_attack_keeps_moves_and_repoints_front() {
        let mut rig = Rig::new(true);
        for x in 1..=2 {
            rig.queue.enqueue(CommandItem::Move {
                point: Vec2Fixed::from_ints(x, 0),
            });
        }
        let mut combat = CombatController::new();
        let mut events = Vec::new();
        assert!(combat.try_attack(&mut rig.ctx(), ENEMY, Vec2Fixed::from_ints(3, 0), true));
        assert_eq!(rig.queue.len(), 3);
        assert_eq!(
            rig.queue.iter().last().and_then(CommandItem::attack_target),
            Some(ENEMY)
        );

        let hit = combat.handle_attack_routine(
            &mut rig.ctx(),
            &world(5, true),
            clock(0),
            &TuningData::default(),
            &mut events,
        );
        assert!(hit.is_none());
        assert_eq!(combat.phase(), CombatPhase::AttackPositioning { target: ENEMY });

        // The front move is repointed in place; nothing is added or dropped.
        let points: Vec<Vec2Fixed> = rig.queue.iter().map(CommandItem::point).collect();
        assert_eq!(
            points,
            vec![
                Vec2Fixed::from_ints(5, 0),
                Vec2Fixed::from_ints(2, 0),
                Vec2Fixed::from_ints(3, 0),
            ]
        );
        assert_eq!(rig.queue.current().and_then(CommandItem::attack_target), None);
    }

    #[test]
    fn test_try_attack_without_weapon_refused() {
        let mut rig = Rig::new(true);
        rig.flags.can_attack = false;
        let mut combat = CombatController::new();
        assert!(!combat.try_attack(&mut rig.ctx(), ENEMY, Vec2Fixed::ZERO, false));
        assert_eq!(combat.phase(), CombatPhase::Idle);
        assert!(rig.queue.is_empty());
    }

    #[test]
    fn test_out_of_range_repositions_to_target() {
        let mut rig = Rig::new(true);
        let mut combat = CombatController::new();
        let mut events = Vec::new();
        combat.try_attack(&mut rig.ctx(), ENEMY, Vec2Fixed::from_ints(3, 0), false);

        let hit = combat.handle_attack_routine(
            &mut rig.ctx(),
            &world(5, true),
            clock(0),
            &TuningData::default(),
            &mut events,
        );
        assert!(hit.is_none());
        assert_eq!(combat.phase(), CombatPhase::AttackPositioning { target: ENEMY });
        assert_eq!(rig.queue.len(), 1);
        assert_eq!(rig.queue.current().map(CommandItem::point), Some(Vec2Fixed::from_ints(5, 0)));
    }

    #[test]
    fn test_in_range_attacks_on_cadence() {
        let mut rig = Rig::new(true);
        let mut combat = CombatController::new();
        let mut events = Vec::new();
        let tuning = TuningData::default();
        let lookup = world(1, true);
        combat.try_attack(&mut rig.ctx(), ENEMY, Vec2Fixed::from_ints(1, 0), false);

        // now == next_attack_at, strict comparison keeps the first tick quiet
        assert!(combat
            .handle_attack_routine(&mut rig.ctx(), &lookup, clock(0), &tuning, &mut events)
            .is_none());
        assert!(combat.is_attacking());
        assert!(!rig.nav.is_agent());

        let hit = combat.handle_attack_routine(
            &mut rig.ctx(),
            &lookup,
            clock(1),
            &tuning,
            &mut events,
        );
        assert_eq!(hit.map(|h| h.damage), Some(10));
        assert!(combat.attack_ready());
        assert_eq!(combat.next_attack_at(), Fixed::from_num(2));

        assert!(combat
            .handle_attack_routine(&mut rig.ctx(), &lookup, clock(2), &tuning, &mut events)
            .is_none());
        assert!(combat
            .handle_attack_routine(&mut rig.ctx(), &lookup, clock(3), &tuning, &mut events)
            .is_some());
        assert_eq!(events.iter().filter(|e| matches!(e, UnitEvent::AttackSwing { .. })).count(), 2);
    }

    #[test]
    fn test_melee_range_reaches_collider_edge() {
        let mut rig = Rig::new(true);
        rig.flags.melee = true;
        rig.stats.attack_range = Fixed::ONE;
        let mut combat = CombatController::new();
        let mut events = Vec::new();
        combat.try_attack(&mut rig.ctx(), ENEMY, Vec2Fixed::ZERO, false);

        // Distance 1.25 is outside range 1 but inside 1 + 0.5 collider
        let mut lookup = world(0, true);
        if let Some(view) = lookup.get_mut(&ENEMY) {
            view.position = Vec2Fixed::new(Fixed::from_num(1.25), Fixed::ZERO);
        }
        combat.handle_attack_routine(
            &mut rig.ctx(),
            &lookup,
            clock(0),
            &TuningData::default(),
            &mut events,
        );
        assert!(combat.is_attacking());
    }

    #[test]
    fn test_stationary_unit_turns_before_attacking() {
        let mut rig = Rig::new(false);
        let mut combat = CombatController::new();
        let mut events = Vec::new();
        let tuning = TuningData::default();
        let lookup = world(1, true);
        combat.try_attack(&mut rig.ctx(), ENEMY, Vec2Fixed::from_ints(1, 0), false);

        combat.handle_attack_routine(&mut rig.ctx(), &lookup, clock(0), &tuning, &mut events);
        assert_eq!(combat.phase(), CombatPhase::Engaging { target: ENEMY });

        for _ in 0..40 {
            combat.handle_attack_routine(&mut rig.ctx(), &lookup, clock(0), &tuning, &mut events);
        }
        assert!(combat.is_attacking());
        assert!(
            facing_error(rig.facing, Vec2Fixed::from_ints(1, 0)) < tuning.attack_facing_threshold
        );
    }

    #[test]
    fn test_dead_target_clears_everything() {
        let mut rig = Rig::new(true);
        let mut combat = CombatController::new();
        let mut events = Vec::new();
        combat.try_attack(&mut rig.ctx(), ENEMY, Vec2Fixed::from_ints(1, 0), false);
        combat.handle_attack_routine(
            &mut rig.ctx(),
            &world(1, true),
            clock(0),
            &TuningData::default(),
            &mut events,
        );
        assert!(!rig.nav.is_agent());

        combat.handle_attack_routine(
            &mut rig.ctx(),
            &world(1, false),
            clock(1),
            &TuningData::default(),
            &mut events,
        );
        assert_eq!(combat.phase(), CombatPhase::Idle);
        assert!(rig.queue.is_empty());
        assert!(rig.nav.is_agent());
    }

    #[test]
    fn test_auto_pick_prefers_nearest_then_lowest_handle() {
        let mut rig = Rig::new(true);
        let mut combat = CombatController::new();
        let mut proximity = ProximityTracker::new();
        let far = UnitHandle::new(1, 0);
        let near_a = UnitHandle::new(2, 0);
        let near_b = UnitHandle::new(3, 0);

        let mut lookup = BTreeMap::new();
        for (handle, x) in [(near_b, 2), (far, 6), (near_a, -2)] {
            proximity.apply(&SensorEvent {
                other: handle,
                volume: VolumeKind::UnitBody,
                relation: Relation::Opposing,
                edge: SensorEdge::Enter,
            });
            lookup.insert(
                handle,
                UnitView {
                    handle,
                    position: Vec2Fixed::from_ints(x, 0),
                    collider_radius: Fixed::ONE,
                    alive: true,
                    moving: false,
                },
            );
        }

        assert_eq!(combat.auto_pick_target(&mut rig.ctx(), &mut proximity, &lookup), Some(near_a));
        assert_eq!(combat.attack_target(), Some(near_a));
    }

    #[test]
    fn test_auto_pick_with_nobody_in_sight() {
        let mut rig = Rig::new(true);
        let mut combat = CombatController::new();
        let mut proximity = ProximityTracker::new();
        let lookup: BTreeMap<UnitHandle, UnitView> = BTreeMap::new();
        assert_eq!(combat.auto_pick_target(&mut rig.ctx(), &mut proximity, &lookup), None);
        assert_eq!(combat.phase(), CombatPhase::Idle);
    }
}
