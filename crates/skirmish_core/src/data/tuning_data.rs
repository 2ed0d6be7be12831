//! Simulation-wide tuning constants.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_decimal_serde, Fixed};

/// Tuning shared by every unit in a simulation.
///
/// Every field has a default, so a RON file only needs to list overrides:
///
/// ```ron
/// TuningData(hit_recharge_delay: 3.0)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningData {
    /// Beyond this distance from its destination a unit inflates its
    /// avoidance radius; within it the radius deflates.
    #[serde(with = "fixed_decimal_serde")]
    pub avoidance_threshold: Fixed,

    /// Ramp accumulator growth per second while inflating.
    #[serde(with = "fixed_decimal_serde")]
    pub avoidance_ramp_up_rate: Fixed,

    /// Ramp accumulator growth per second while deflating.
    #[serde(with = "fixed_decimal_serde")]
    pub avoidance_ramp_down_rate: Fixed,

    /// Inflated radius as a multiple of the base radius.
    #[serde(with = "fixed_decimal_serde")]
    pub avoidance_max_multiplier: Fixed,

    /// Facing interpolation per second.
    #[serde(with = "fixed_decimal_serde")]
    pub facing_rate: Fixed,

    /// Facing error below which steering toward a path corner is skipped.
    #[serde(with = "fixed_decimal_serde")]
    pub steering_facing_threshold: Fixed,

    /// Facing error below which a unit counts as facing its attack target.
    #[serde(with = "fixed_decimal_serde")]
    pub attack_facing_threshold: Fixed,

    /// Seconds between two passive regen points.
    #[serde(with = "fixed_decimal_serde")]
    pub health_recharge_rate: Fixed,

    /// Seconds without damage before regen resumes.
    #[serde(with = "fixed_decimal_serde")]
    pub hit_recharge_delay: Fixed,

    /// Extra gap between two colliders that still counts as inner contact.
    #[serde(with = "fixed_decimal_serde")]
    pub contact_padding: Fixed,
}

impl Default for TuningData {
    fn default() -> Self {
        Self {
            avoidance_threshold: Fixed::from_num(4),
            avoidance_ramp_up_rate: Fixed::from_num(0.05),
            avoidance_ramp_down_rate: Fixed::from_num(0.25),
            avoidance_max_multiplier: Fixed::from_num(2),
            facing_rate: Fixed::from_num(10),
            steering_facing_threshold: Fixed::from_num(0.25),
            attack_facing_threshold: Fixed::from_num(0.1),
            health_recharge_rate: Fixed::ONE,
            hit_recharge_delay: Fixed::from_num(5),
            contact_padding: Fixed::from_num(0.1),
        }
    }
}

impl TuningData {
    /// Parse tuning from a RON string.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParse`] if the text is not valid tuning.
    pub fn from_ron_str(source: &str, path: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::DataParse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}
