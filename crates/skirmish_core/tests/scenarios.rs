//! End-to-end unit behaviour driven through the public simulation API.

use skirmish_core::combat::CombatPhase;
use skirmish_core::command_queue::CommandItem;
use skirmish_core::components::UnitStateLabel;
use skirmish_core::events::UnitEvent;
use skirmish_core::math::{Fixed, Vec2Fixed};
use skirmish_core::navigation::{NavMode, NavigationAdapter};
use skirmish_core::prelude::{GameError, TuningData};
use skirmish_core::simulation::{ParkingOrder, Simulation, UnitSpawnParams};
use skirmish_test_utils::determinism::step;
use skirmish_test_utils::fixtures::{
    acolyte, archer, fixed, fixed_f, point, spawn, spearman, team_at, watchtower,
};

// =============================================================================
// Health
// =============================================================================

#[test]
fn damage_then_regeneration_after_recharge_delay() {
    let mut sim = Simulation::new();
    let unit = spawn(&mut sim, &spearman(), team_at(0, 0, 0));
    let tuning = *sim.tuning();
    let now = sim.now();

    let mut events = Vec::new();
    let lethal = sim
        .unit_mut(unit)
        .unwrap()
        .receive_damage(30, now, &tuning, &mut events);
    assert!(!lethal);
    assert_eq!(sim.unit(unit).unwrap().health(), 70);

    // hit_recharge_delay is 5 s, i.e. 100 ticks
    for _ in 0..99 {
        step(&mut sim);
    }
    assert_eq!(sim.unit(unit).unwrap().health(), 70);

    for _ in 0..4 {
        step(&mut sim);
    }
    assert_eq!(sim.unit(unit).unwrap().health(), 71);
}

#[test]
fn simultaneous_lethal_hits_kill_once() {
    let mut sim = Simulation::new();
    let victim = spawn(&mut sim, &acolyte(), team_at(1, 0, 0));
    let a = spawn(&mut sim, &archer(), team_at(0, -3, 0));
    let b = spawn(&mut sim, &archer(), team_at(0, 3, 0));
    sim.order_attack(a, victim, false).unwrap();
    sim.order_attack(b, victim, false).unwrap();

    let mut deaths = Vec::new();
    let mut died_events = 0;
    for _ in 0..400 {
        let events = sim.tick().unwrap();
        deaths.extend(events.deaths);
        died_events += events
            .unit_events
            .iter()
            .filter(|e| matches!(e, UnitEvent::Died { .. }))
            .count();
    }
    assert_eq!(deaths, vec![victim]);
    assert_eq!(died_events, 1);
    assert!(sim.unit(victim).is_none());
    assert_eq!(sim.unit(a).unwrap().attack_target(), None);
    assert_eq!(sim.unit(b).unwrap().attack_target(), None);
}

// =============================================================================
// Attack positioning
// =============================================================================

#[test]
fn out_of_range_attacker_chases_current_target_position() {
    let mut sim = Simulation::new();
    let mut short_bow = archer();
    if let Some(combat) = short_bow.combat.as_mut() {
        combat.attack_range = Fixed::ONE;
    }
    let hunter = spawn(&mut sim, &short_bow, team_at(0, 0, 0));
    let prey = spawn(&mut sim, &acolyte(), team_at(1, 5, 0));
    sim.order_move(prey, point(40, 0), false).unwrap();
    sim.order_attack(hunter, prey, false).unwrap();

    let mut attacked = false;
    for _ in 0..600 {
        let prey_before = sim.unit(prey).unwrap().position();
        step(&mut sim);

        let unit = sim.unit(hunter).unwrap();
        match unit.combat().phase() {
            CombatPhase::AttackPositioning { target } => {
                assert_eq!(target, prey);
                assert_eq!(unit.queue().len(), 1);
                assert_eq!(unit.queue().current().map(CommandItem::point), Some(prey_before));
                assert_eq!(unit.nav().mode(), NavMode::Agent);
            }
            CombatPhase::Attacking { .. } => {
                attacked = true;
                break;
            }
            other => panic!("unexpected phase {other:?}"),
        }
    }
    assert!(attacked, "hunter never closed the distance");
    assert_eq!(sim.unit(hunter).unwrap().nav().mode(), NavMode::Obstacle);
}

#[test]
fn attack_order_replaces_queued_moves() {
    let mut sim = Simulation::new();
    sim.set_auto_sensors(false);
    let unit = spawn(&mut sim, &spearman(), team_at(0, 0, 0));
    let enemy = spawn(&mut sim, &spearman(), team_at(1, 20, 0));
    for x in 1..=3 {
        sim.order_move(unit, point(x, 5), true).unwrap();
    }
    assert_eq!(sim.unit(unit).unwrap().queue().len(), 3);

    sim.order_attack(unit, enemy, false).unwrap();
    let queue = sim.unit(unit).unwrap().queue();
    assert_eq!(queue.len(), 1);
    assert!(matches!(
        queue.current(),
        Some(CommandItem::Attack { target, .. }) if *target == enemy
    ));
}

#[test]
fn queued_attack_order_keeps_moves_and_chases_with_front_command() {
    let mut sim = Simulation::new();
    sim.set_auto_sensors(false);
    let unit = spawn(&mut sim, &spearman(), team_at(0, 0, 0));
    let enemy = spawn(&mut sim, &spearman(), team_at(1, 20, 0));
    sim.order_move(unit, point(0, 5), true).unwrap();
    sim.order_move(unit, point(0, 6), true).unwrap();

    sim.order_attack(unit, enemy, true).unwrap();
    let queue = sim.unit(unit).unwrap().queue();
    assert_eq!(queue.len(), 3);
    assert!(matches!(queue.current(), Some(CommandItem::Move { .. })));
    assert!(matches!(
        queue.iter().last(),
        Some(CommandItem::Attack { target, .. }) if *target == enemy
    ));

    step(&mut sim);
    let state = sim.unit(unit).unwrap();
    assert_eq!(
        state.combat().phase(),
        CombatPhase::AttackPositioning { target: enemy }
    );
    let points: Vec<Vec2Fixed> = state.queue().iter().map(CommandItem::point).collect();
    assert_eq!(points, vec![point(20, 0), point(0, 6), point(20, 0)]);
    assert!(matches!(state.queue().current(), Some(CommandItem::Move { .. })));
}

#[test]
fn attack_order_against_gone_target_is_rejected() {
    let mut sim = Simulation::new();
    let unit = spawn(&mut sim, &spearman(), team_at(0, 0, 0));
    let enemy = spawn(&mut sim, &spearman(), team_at(1, 30, 0));
    sim.despawn_unit(enemy).unwrap();

    assert_eq!(
        sim.order_attack(unit, enemy, false),
        Err(GameError::InvalidTarget(enemy))
    );
    assert!(sim.unit(unit).unwrap().queue().is_empty());
}

#[test]
fn removed_target_clears_attack_and_queue() {
    let mut sim = Simulation::new();
    sim.set_auto_sensors(false);
    let unit = spawn(&mut sim, &spearman(), team_at(0, 0, 0));
    let enemy = spawn(&mut sim, &spearman(), team_at(1, 30, 0));
    sim.order_attack(unit, enemy, false).unwrap();
    step(&mut sim);
    assert!(sim.unit(unit).unwrap().attack_target().is_some());

    sim.despawn_unit(enemy).unwrap();
    step(&mut sim);
    let unit = sim.unit(unit).unwrap();
    assert_eq!(unit.combat().phase(), CombatPhase::Idle);
    assert!(unit.queue().is_empty());
    assert_eq!(unit.nav().mode(), NavMode::Agent);
}

#[test]
fn tower_turns_to_face_then_fires() {
    let mut sim = Simulation::new();
    let tower = spawn(&mut sim, &watchtower(), team_at(0, 0, 0));
    let intruder = spawn(&mut sim, &acolyte(), team_at(1, 5, 0));

    let mut first_hit_tick = None;
    for tick in 0..100 {
        let events = sim.tick().unwrap();
        if events.hits.iter().any(|h| h.attacker == tower && h.target == intruder) {
            first_hit_tick = Some(tick);
            break;
        }
    }

    // The tower faces +Y at spawn and needs a few ticks to turn toward +X.
    let first = first_hit_tick.expect("tower never fired");
    assert!(first > 1);
    let tower = sim.unit(tower).unwrap();
    assert!(tower.facing().x > fixed_f(0.9));
    assert_eq!(tower.nav().mode(), NavMode::Obstacle);
}

// =============================================================================
// Parking and bumps
// =============================================================================

#[test]
fn parked_unit_shifts_slot_when_bumped_by_resting_ally() {
    let mut sim = Simulation::new();
    let resting = spawn(&mut sim, &spearman(), team_at(0, 4, 0));
    let parker = spawn(
        &mut sim,
        &spearman(),
        UnitSpawnParams {
            parking: Some(ParkingOrder {
                slot: point(4, 0),
                next_state: UnitStateLabel::Ready,
            }),
            ..team_at(0, 0, 0)
        },
    );
    assert_eq!(sim.unit(parker).unwrap().state(), UnitStateLabel::Parking);

    for _ in 0..60 {
        step(&mut sim);
        if !sim.unit(parker).unwrap().is_parking() {
            break;
        }
    }

    // Footprint is twice the 0.5 collider radius, away from the ally at x = 4,
    // so the parker settles around x = 3 instead of walking into it.
    let unit = sim.unit(parker).unwrap();
    assert_eq!(unit.state(), UnitStateLabel::Ready);
    assert!(unit.position().x > fixed_f(2.75) && unit.position().x < fixed_f(3.25));
    assert_eq!(sim.unit(resting).unwrap().position(), point(4, 0));
}

// =============================================================================
// Navigation
// =============================================================================

#[test]
fn avoidance_radius_ramps_up_and_back_without_overshoot() {
    let tuning = TuningData::default();
    let dt = Fixed::ONE / Fixed::from_num(20);
    let base = fixed(1);
    let max = base * tuning.avoidance_max_multiplier;
    let mut nav = NavigationAdapter::new(Vec2Fixed::ZERO, true, fixed(4), fixed_f(0.5), base);
    nav.set_destination(point(100, 0)).unwrap();

    let mut last = nav.avoidance_radius();
    for _ in 0..1000 {
        nav.update_avoidance(dt, &tuning);
        let radius = nav.avoidance_radius();
        assert!(radius >= last && radius <= max);
        last = radius;
    }
    assert_eq!(nav.avoidance_radius(), max);

    nav.warp(point(99, 0));
    for _ in 0..200 {
        nav.update_avoidance(dt, &tuning);
        let radius = nav.avoidance_radius();
        assert!(radius <= last && radius >= base);
        last = radius;
    }
    assert_eq!(nav.avoidance_radius(), base);
}

#[test]
fn dead_unit_is_disabled_and_death_is_idempotent() {
    let mut sim = Simulation::new();
    let unit = spawn(&mut sim, &spearman(), team_at(0, 0, 0));
    let mut state = sim.despawn_unit(unit).unwrap();
    let tuning = TuningData::default();

    let mut events = Vec::new();
    assert!(state.receive_damage(500, Fixed::ZERO, &tuning, &mut events));
    assert!(state.handle_die(&mut events));
    let terminal = state.clone();
    let count = events.len();
    assert!(!state.handle_die(&mut events));
    assert_eq!(state, terminal);
    assert_eq!(events.len(), count);
    assert!(state.is_dead());
    assert_eq!(state.nav().mode(), NavMode::Disabled);
    assert!(state.queue().is_empty());
    assert!(state.order_move(point(1, 1), false).is_err());
}
