//! Scenario loading and configuration.
//!
//! A scenario lists the unit definitions it uses, where each unit spawns
//! and the orders issued before the first tick. Units are referred to by a
//! scenario-local label so orders can name their targets.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use skirmish_core::components::UnitStateLabel;
use skirmish_core::data::{TuningData, UnitData};
use skirmish_core::math::Vec2Fixed;
use skirmish_core::GameError;
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// A spawn names a unit type the scenario does not define.
    #[error("Spawn '{label}' uses unknown unit type '{unit_type}'")]
    UnknownUnitType {
        /// Spawn label.
        label: String,
        /// Missing unit type id.
        unit_type: String,
    },
    /// An order names a label no spawn declares.
    #[error("Order references unknown unit '{0}'")]
    UnknownLabel(String),
    /// Two spawns share a label.
    #[error("Duplicate unit label '{0}'")]
    DuplicateLabel(String),
    /// A unit definition failed validation.
    #[error("Unit type '{unit_type}' is invalid: {problems}")]
    InvalidUnitType {
        /// Unit type id.
        unit_type: String,
        /// Problems reported by the definition.
        problems: String,
    },
    /// The simulation rejected a spawn or order.
    #[error(transparent)]
    Game(#[from] GameError),
}

fn default_ticks() -> u64 {
    600
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Ticks to run when the command line does not override it.
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Simulation tuning overrides.
    #[serde(default)]
    pub tuning: TuningData,
    /// Disable the built-in sensor sweep.
    #[serde(default)]
    pub manual_sensors: bool,
    /// Unit definitions referenced by spawns.
    pub unit_types: Vec<UnitData>,
    /// Units placed before the first tick, spawned in list order.
    pub spawns: Vec<SpawnPlacement>,
    /// Orders issued after all spawns, in list order.
    #[serde(default)]
    pub orders: Vec<ScenarioOrder>,
}

/// One unit placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnPlacement {
    /// Scenario-local label used by orders and in the summary.
    pub label: String,
    /// Unit type id from [`Scenario::unit_types`].
    pub unit_type: String,
    /// Owning player.
    pub player: u8,
    /// Faction (defaults to the player id).
    #[serde(default)]
    pub faction: Option<u8>,
    /// Spawn position.
    pub position: Vec2Fixed,
    /// Walk to a slot before accepting orders.
    #[serde(default)]
    pub parking: Option<ParkingPlacement>,
}

/// Parking slot for a freshly spawned unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParkingPlacement {
    /// Slot position.
    pub slot: Vec2Fixed,
    /// Label adopted once parked.
    #[serde(default = "default_next_state")]
    pub next_state: UnitStateLabel,
}

fn default_next_state() -> UnitStateLabel {
    UnitStateLabel::Ready
}

/// An order issued before the first tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioOrder {
    /// Move to a point.
    Move {
        /// Ordered unit.
        unit: String,
        /// Destination.
        point: Vec2Fixed,
        /// Append instead of replacing the queue.
        #[serde(default)]
        queued: bool,
    },
    /// Attack another unit.
    Attack {
        /// Ordered unit.
        unit: String,
        /// Target unit.
        target: String,
        /// Append instead of replacing the queue.
        #[serde(default)]
        queued: bool,
    },
}

impl ScenarioOrder {
    /// Labels this order refers to.
    fn labels(&self) -> Vec<&str> {
        match self {
            Self::Move { unit, .. } => vec![unit],
            Self::Attack { unit, target, .. } => vec![unit, target],
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Look up a unit definition by id.
    #[must_use]
    pub fn unit_type(&self, id: &str) -> Option<&UnitData> {
        self.unit_types.iter().find(|data| data.id == id)
    }

    /// Check that every reference in the scenario resolves.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        for data in &self.unit_types {
            let problems = data.validate();
            if !problems.is_empty() {
                return Err(ScenarioError::InvalidUnitType {
                    unit_type: data.id.clone(),
                    problems: problems.join("; "),
                });
            }
        }

        let mut labels = BTreeSet::new();
        for spawn in &self.spawns {
            if !labels.insert(spawn.label.as_str()) {
                return Err(ScenarioError::DuplicateLabel(spawn.label.clone()));
            }
            if self.unit_type(&spawn.unit_type).is_none() {
                return Err(ScenarioError::UnknownUnitType {
                    label: spawn.label.clone(),
                    unit_type: spawn.unit_type.clone(),
                });
            }
        }

        for order in &self.orders {
            if let Some(missing) = order.labels().into_iter().find(|l| !labels.contains(l)) {
                return Err(ScenarioError::UnknownLabel(missing.to_string()));
            }
        }
        Ok(())
    }
}
