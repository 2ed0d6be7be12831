//! Navigation adapter over a steerable agent and a static obstacle.
//!
//! A unit is either an **Agent** (pathfinding, has velocity) or an
//! **Obstacle** (static, blocks other paths, zero velocity). Which one is
//! decided by the movement and combat controllers through the idempotent
//! `try_toggle_*` calls. Path planning itself lives behind [`PathPlanner`].

use serde::{Deserialize, Serialize};

use crate::data::TuningData;
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, lerp_fixed, Fixed, Vec2Fixed};

/// Which representation is currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavMode {
    /// Actively pathfinding and steerable.
    Agent,
    /// Static, blocking others' paths.
    Obstacle,
    /// Both representations switched off (dead units).
    Disabled,
}

/// Opaque navigation service: where should an agent head next?
pub trait PathPlanner {
    /// Next corner on the path from `from` to `to`.
    fn next_corner(&self, from: Vec2Fixed, to: Vec2Fixed) -> Vec2Fixed;
}

/// Planner for open ground: the next corner is the destination itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLinePlanner;

impl PathPlanner for StraightLinePlanner {
    fn next_corner(&self, _from: Vec2Fixed, to: Vec2Fixed) -> Vec2Fixed {
        to
    }
}

/// Per-unit ramp accumulators for the avoidance radius.
///
/// Both grow monotonically toward 1 while their direction is active and
/// the inactive one is reset to zero whenever the direction flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvoidanceRamp {
    /// Progress toward the inflated radius.
    #[serde(with = "fixed_serde")]
    pub toward_max: Fixed,
    /// Progress back toward the base radius.
    #[serde(with = "fixed_serde")]
    pub toward_base: Fixed,
}

/// Wraps a unit's navigation agent and obstacle representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationAdapter {
    mode: NavMode,
    kinematic: bool,
    position: Vec2Fixed,
    velocity: Vec2Fixed,
    destination: Option<Vec2Fixed>,
    next_corner: Vec2Fixed,
    #[serde(with = "fixed_serde")]
    speed: Fixed,
    #[serde(with = "fixed_serde")]
    stopping_distance: Fixed,
    #[serde(with = "fixed_serde")]
    base_radius: Fixed,
    #[serde(with = "fixed_serde")]
    avoidance_radius: Fixed,
    ramp: AvoidanceRamp,
}

impl NavigationAdapter {
    /// Create an adapter. Kinematic units start as agents, others as obstacles.
    #[must_use]
    pub fn new(
        position: Vec2Fixed,
        kinematic: bool,
        speed: Fixed,
        stopping_distance: Fixed,
        base_radius: Fixed,
    ) -> Self {
        Self {
            mode: if kinematic {
                NavMode::Agent
            } else {
                NavMode::Obstacle
            },
            kinematic,
            position,
            velocity: Vec2Fixed::ZERO,
            destination: None,
            next_corner: position,
            speed,
            stopping_distance,
            base_radius,
            avoidance_radius: base_radius,
            ramp: AvoidanceRamp::default(),
        }
    }

    /// Current mode.
    #[must_use]
    pub const fn mode(&self) -> NavMode {
        self.mode
    }

    /// Whether the agent representation is live.
    #[must_use]
    pub fn is_agent(&self) -> bool {
        self.mode == NavMode::Agent
    }

    /// Whether this unit has an agent representation at all.
    #[must_use]
    pub const fn is_kinematic(&self) -> bool {
        self.kinematic
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Velocity in world units per second. Zero unless in agent mode.
    #[must_use]
    pub const fn velocity(&self) -> Vec2Fixed {
        self.velocity
    }

    /// Whether the agent moved during the last integration step.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        !self.velocity.is_zero()
    }

    /// Current destination, if one is set.
    #[must_use]
    pub const fn destination(&self) -> Option<Vec2Fixed> {
        self.destination
    }

    /// Next corner of the current path.
    #[must_use]
    pub const fn next_corner(&self) -> Vec2Fixed {
        self.next_corner
    }

    /// Arrival radius used when no radius is given to [`is_in_range_of`](Self::is_in_range_of).
    #[must_use]
    pub const fn stopping_distance(&self) -> Fixed {
        self.stopping_distance
    }

    /// Radius of the unit body without avoidance inflation.
    #[must_use]
    pub const fn base_radius(&self) -> Fixed {
        self.base_radius
    }

    /// Current collision-avoidance radius.
    #[must_use]
    pub const fn avoidance_radius(&self) -> Fixed {
        self.avoidance_radius
    }

    /// Current ramp accumulators.
    #[must_use]
    pub const fn ramp(&self) -> AvoidanceRamp {
        self.ramp
    }

    /// Place the unit without steering (spawning, external teleports).
    pub fn warp(&mut self, position: Vec2Fixed) {
        self.position = position;
        self.next_corner = position;
    }

    /// Switch to agent mode. No-op if already an agent, if the unit is not
    /// kinematic, or if navigation was disabled.
    ///
    /// Returns whether the mode changed.
    pub fn try_toggle_to_agent(&mut self) -> bool {
        if !self.kinematic || self.mode != NavMode::Obstacle {
            return false;
        }
        self.mode = NavMode::Agent;
        true
    }

    /// Switch to obstacle mode, dropping the current path.
    /// No-op if already an obstacle or disabled.
    ///
    /// Returns whether the mode changed.
    pub fn try_toggle_to_obstacle(&mut self) -> bool {
        if self.mode != NavMode::Agent {
            return false;
        }
        self.mode = NavMode::Obstacle;
        self.stop();
        true
    }

    /// Turn both representations off. Terminal.
    pub fn disable(&mut self) {
        self.mode = NavMode::Disabled;
        self.stop();
    }

    /// Set the agent's destination.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] when not in agent mode.
    pub fn set_destination(&mut self, point: Vec2Fixed) -> Result<()> {
        if self.mode != NavMode::Agent {
            return Err(GameError::InvalidState(format!(
                "set_destination while navigation is in {:?} mode",
                self.mode
            )));
        }
        self.destination = Some(point);
        Ok(())
    }

    /// Whether `point` lies strictly inside `radius`, or inside the
    /// stopping distance when no radius is given.
    ///
    /// Compares squared distances.
    #[must_use]
    pub fn is_in_range_of(&self, point: Vec2Fixed, radius: Option<Fixed>) -> bool {
        let radius = radius.unwrap_or(self.stopping_distance);
        self.position.distance_squared(point) < radius.saturating_mul(radius)
    }

    /// Inflate the avoidance radius while far from the destination and
    /// deflate it near arrival. Never leaves `[base, base × multiplier]`.
    pub fn update_avoidance(&mut self, dt: Fixed, tuning: &TuningData) {
        let Some(destination) = self.destination else {
            return;
        };

        if self.is_in_range_of(destination, Some(tuning.avoidance_threshold)) {
            self.ramp.toward_max = Fixed::ZERO;
            self.ramp.toward_base =
                (self.ramp.toward_base + tuning.avoidance_ramp_down_rate * dt).min(Fixed::ONE);
            self.avoidance_radius =
                lerp_fixed(self.avoidance_radius, self.base_radius, self.ramp.toward_base);
        } else {
            let inflated = self.base_radius * tuning.avoidance_max_multiplier;
            self.ramp.toward_base = Fixed::ZERO;
            self.ramp.toward_max =
                (self.ramp.toward_max + tuning.avoidance_ramp_up_rate * dt).min(Fixed::ONE);
            self.avoidance_radius =
                lerp_fixed(self.avoidance_radius, inflated, self.ramp.toward_max);
        }
    }

    /// Integrate one step of agent movement toward the next path corner.
    pub fn advance(&mut self, dt: Fixed, planner: &dyn PathPlanner) {
        let Some(destination) = self.destination.filter(|_| self.mode == NavMode::Agent) else {
            self.velocity = Vec2Fixed::ZERO;
            return;
        };

        if self.is_in_range_of(destination, None) || dt <= Fixed::ZERO {
            self.velocity = Vec2Fixed::ZERO;
            return;
        }

        self.next_corner = planner.next_corner(self.position, destination);
        let next = self.position.move_towards(self.next_corner, self.speed * dt);
        self.velocity = (next - self.position).scale(Fixed::ONE / dt);
        self.position = next;
    }

    fn stop(&mut self) {
        self.velocity = Vec2Fixed::ZERO;
        self.destination = None;
        self.next_corner = self.position;
    }
}
