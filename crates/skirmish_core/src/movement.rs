//! Command-queue driven movement, parking and bump resolution.

use serde::{Deserialize, Serialize};

use crate::command_queue::{CommandItem, CommandQueue};
use crate::components::{TickClock, UnitHandle, UnitStateLabel};
use crate::data::TuningData;
use crate::error::Result;
use crate::math::{facing_error, rotate_towards, Fixed, Vec2Fixed};
use crate::navigation::NavigationAdapter;

/// Phase of the movement controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementPhase {
    /// Nothing to walk to.
    #[default]
    Idle,
    /// Following the queue.
    Moving,
    /// Walking to the initial slot; switches to `next_state` on arrival.
    Parking {
        /// Label to adopt once parked.
        next_state: UnitStateLabel,
    },
}

/// What one movement tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementOutcome {
    /// No agent or nothing queued.
    Idle,
    /// Still on the way to the current command.
    Moving,
    /// Reached the current command and dequeued it.
    Arrived,
    /// Reached the parking slot.
    Parked {
        /// Label the unit should adopt now.
        next_state: UnitStateLabel,
    },
}

/// Drives the navigation destination from the front of the command queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MovementController {
    phase: MovementPhase,
}

impl MovementController {
    /// Create an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MovementPhase {
        self.phase
    }

    /// Whether the unit is walking to its parking slot.
    #[must_use]
    pub const fn is_parking(&self) -> bool {
        matches!(self.phase, MovementPhase::Parking { .. })
    }

    /// Send the unit to its parking slot, replacing whatever was queued.
    pub fn begin_parking(
        &mut self,
        queue: &mut CommandQueue,
        slot: Vec2Fixed,
        next_state: UnitStateLabel,
    ) {
        queue.set_current(CommandItem::Move { point: slot });
        self.phase = MovementPhase::Parking { next_state };
    }

    /// Stop without touching the queue (death).
    pub fn halt(&mut self) {
        self.phase = MovementPhase::Idle;
    }

    /// Run one movement tick.
    ///
    /// Only acts while the agent is live and the queue is non-empty.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::GameError::InvalidState`] from the queue or the
    /// navigation adapter; neither can happen while the checks above hold.
    pub fn handle_movement(
        &mut self,
        me: UnitHandle,
        queue: &mut CommandQueue,
        nav: &mut NavigationAdapter,
        facing: &mut Vec2Fixed,
        clock: TickClock,
        tuning: &TuningData,
    ) -> Result<MovementOutcome> {
        if let (MovementPhase::Parking { next_state }, true) = (self.phase, queue.is_empty()) {
            self.phase = MovementPhase::Idle;
            return Ok(MovementOutcome::Parked { next_state });
        }

        let Some(point) = queue.current().map(CommandItem::point) else {
            self.phase = MovementPhase::Idle;
            return Ok(MovementOutcome::Idle);
        };
        if !nav.is_agent() {
            return Ok(MovementOutcome::Idle);
        }

        nav.set_destination(point)?;

        if !nav.is_in_range_of(point, None) {
            let corner = if nav.next_corner() == nav.position() {
                point
            } else {
                nav.next_corner()
            };
            let desired = corner - nav.position();
            if !desired.is_zero()
                && facing_error(*facing, desired) > tuning.steering_facing_threshold
            {
                *facing = rotate_towards(*facing, desired, tuning.facing_rate * clock.dt);
            }
            nav.update_avoidance(clock.dt, tuning);
            if self.phase == MovementPhase::Idle {
                tracing::debug!(unit = %me, "Movement started");
                self.phase = MovementPhase::Moving;
            }
            return Ok(MovementOutcome::Moving);
        }

        queue.dequeue()?;
        nav.update_avoidance(clock.dt, tuning);

        if let MovementPhase::Parking { next_state } = self.phase {
            tracing::debug!(unit = %me, next_state = ?next_state, "Parked");
            queue.clear();
            self.phase = MovementPhase::Idle;
            return Ok(MovementOutcome::Parked { next_state });
        }
        if queue.is_empty() {
            self.phase = MovementPhase::Idle;
        }
        Ok(MovementOutcome::Arrived)
    }

    /// Shift the parking slot sideways after being bumped by a unit at rest.
    ///
    /// `footprint` is this unit's own width and `direction` is `+1` or `-1`.
    /// Returns whether the slot moved.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GameError::InvalidState`] if the queue empties
    /// between the emptiness check and the pop, which cannot happen here.
    pub fn handle_bump(
        &mut self,
        queue: &mut CommandQueue,
        footprint: Fixed,
        direction: Fixed,
        other_moving: bool,
    ) -> Result<bool> {
        if !self.is_parking() || other_moving || queue.is_empty() {
            return Ok(false);
        }

        let mut last = queue.pop_last()?;
        let shifted = matches!(last, CommandItem::Move { .. });
        if shifted {
            let mut point = last.point();
            point.x += footprint * direction;
            last.set_point(point);
        }
        queue.enqueue(last);
        Ok(shifted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: UnitHandle = UnitHandle::new(0, 0);

    fn nav() -> NavigationAdapter {
        NavigationAdapter::new(
            Vec2Fixed::ZERO,
            true,
            Fixed::from_num(4),
            Fixed::from_num(0.5),
            Fixed::from_num(0.5),
        )
    }

    fn clock() -> TickClock {
        TickClock {
            now: Fixed::ZERO,
            dt: Fixed::ONE / Fixed::from_num(20),
        }
    }

    #[test]
    fn test_moves_toward_front_of_queue() {
        let mut movement = MovementController::new();
        let mut queue = CommandQueue::new();
        let mut nav = nav();
        let mut facing = Vec2Fixed::UP;
        queue.enqueue(CommandItem::Move {
            point: Vec2Fixed::from_ints(10, 0),
        });

        let outcome = movement
            .handle_movement(ME, &mut queue, &mut nav, &mut facing, clock(), &TuningData::default())
            .unwrap();
        assert_eq!(outcome, MovementOutcome::Moving);
        assert_eq!(movement.phase(), MovementPhase::Moving);
        assert_eq!(nav.destination(), Some(Vec2Fixed::from_ints(10, 0)));
        assert!(facing.x > Fixed::ZERO);
    }

    #[test]
    fn test_arrival_dequeues() {
        let mut movement = MovementController::new();
        let mut queue = CommandQueue::new();
        let mut nav = nav();
        let mut facing = Vec2Fixed::UP;
        queue.enqueue(CommandItem::Move {
            point: Vec2Fixed::new(Fixed::from_num(0.25), Fixed::ZERO),
        });
        queue.enqueue(CommandItem::Move {
            point: Vec2Fixed::from_ints(5, 0),
        });

        let outcome = movement
            .handle_movement(ME, &mut queue, &mut nav, &mut facing, clock(), &TuningData::default())
            .unwrap();
        assert_eq!(outcome, MovementOutcome::Arrived);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_obstacle_mode_does_nothing() {
        let mut movement = MovementController::new();
        let mut queue = CommandQueue::new();
        let mut nav = nav();
        let mut facing = Vec2Fixed::UP;
        nav.try_toggle_to_obstacle();
        queue.enqueue(CommandItem::Move {
            point: Vec2Fixed::from_ints(5, 0),
        });

        let outcome = movement
            .handle_movement(ME, &mut queue, &mut nav, &mut facing, clock(), &TuningData::default())
            .unwrap();
        assert_eq!(outcome, MovementOutcome::Idle);
        assert_eq!(queue.len(), 1);
        assert_eq!(nav.destination(), None);
    }

    #[test]
    fn test_parking_arrival_reports_next_state() {
        let mut movement = MovementController::new();
        let mut queue = CommandQueue::new();
        let mut nav = nav();
        let mut facing = Vec2Fixed::UP;
        movement.begin_parking(&mut queue, Vec2Fixed::ZERO, UnitStateLabel::Ready);
        assert!(movement.is_parking());

        let outcome = movement
            .handle_movement(ME, &mut queue, &mut nav, &mut facing, clock(), &TuningData::default())
            .unwrap();
        assert_eq!(
            outcome,
            MovementOutcome::Parked {
                next_state: UnitStateLabel::Ready
            }
        );
        assert!(!movement.is_parking());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_bump_shifts_parking_slot() {
        let mut movement = MovementController::new();
        let mut queue = CommandQueue::new();
        movement.begin_parking(&mut queue, Vec2Fixed::from_ints(3, 3), UnitStateLabel::Standby);

        assert!(movement
            .handle_bump(&mut queue, Fixed::ONE, -Fixed::ONE, false)
            .unwrap());
        assert_eq!(queue.current().map(CommandItem::point), Some(Vec2Fixed::from_ints(2, 3)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_bump_ignored_when_other_moving_or_not_parking() {
        let mut movement = MovementController::new();
        let mut queue = CommandQueue::new();
        queue.enqueue(CommandItem::Move {
            point: Vec2Fixed::from_ints(3, 3),
        });
        assert!(!movement.handle_bump(&mut queue, Fixed::ONE, Fixed::ONE, false).unwrap());

        movement.begin_parking(&mut queue, Vec2Fixed::from_ints(3, 3), UnitStateLabel::Standby);
        assert!(!movement.handle_bump(&mut queue, Fixed::ONE, Fixed::ONE, true).unwrap());
        assert_eq!(queue.current().map(CommandItem::point), Some(Vec2Fixed::from_ints(3, 3)));
    }
}
