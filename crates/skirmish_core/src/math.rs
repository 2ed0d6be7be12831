//! Fixed-point math utilities for deterministic simulation.
//!
//! Unit logic runs on fixed-point numbers so that two machines stepping the
//! same units produce bit-identical positions, facings and timers.
//! Floats only appear at the configuration boundary, see
//! [`fixed_decimal_serde`].

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Fixed-point 2D vector used for positions, velocities and facings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_decimal_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_decimal_serde")]
    pub y: Fixed,
}

/// Serde support for runtime fixed-point state.
///
/// Stored as the raw bit pattern (i64) so saved state restores exactly.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bits.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bits.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        i64::deserialize(deserializer).map(Fixed::from_bits)
    }
}

/// Serde support for fixed-point numbers written as decimals.
///
/// Configuration files are edited by hand, so `2.5` is accepted instead of
/// the raw bit pattern. The value is converted to [`Fixed`] once, on load.
pub mod fixed_decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("{value} is out of fixed-point range")))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Unit vector along +Y, the default facing of a freshly spawned unit.
    pub const UP: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ONE,
    };

    /// Build a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Saturates at `Fixed::MAX` for points more than ~46k units apart.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x.saturating_sub(other.x);
        let dy = self.y.saturating_sub(other.y);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Squared length of the vector.
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.dot(self)
    }

    /// Length of the vector.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.length_squared())
    }

    /// Whether both components are exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == Fixed::ZERO && self.y == Fixed::ZERO
    }

    /// Dot product of two vectors, saturating.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.y.saturating_mul(other.y))
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// The vector rotated a quarter turn counter-clockwise.
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Normalize vector using fixed-point math.
    ///
    /// The zero vector normalizes to zero.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Move `self` toward `target` by at most `max_step`.
    ///
    /// Returns the target itself once it is within one step.
    #[must_use]
    pub fn move_towards(self, target: Self, max_step: Fixed) -> Self {
        let offset = target - self;
        let dist = offset.length();
        if dist <= max_step || dist == Fixed::ZERO {
            return target;
        }
        self + offset.scale(max_step / dist)
    }
}

/// Clamp an interpolation factor into `[0, 1]`.
#[must_use]
pub fn clamp01(t: Fixed) -> Fixed {
    t.clamp(Fixed::ZERO, Fixed::ONE)
}

/// Scalar linear interpolation with a clamped factor.
#[must_use]
pub fn lerp_fixed(from: Fixed, to: Fixed, t: Fixed) -> Fixed {
    from + (to - from) * clamp01(t)
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..48 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Rotate a unit facing toward a desired direction.
///
/// Performs a normalized linear interpolation by `t` (clamped to `[0, 1]`).
/// When the interpolation passes through zero (exactly opposite facings)
/// the facing is turned a quarter turn so the next step can make progress.
#[must_use]
pub fn rotate_towards(facing: Vec2Fixed, desired: Vec2Fixed, t: Fixed) -> Vec2Fixed {
    let desired = desired.normalize();
    if desired.is_zero() {
        return facing;
    }
    let blended = facing.lerp(desired, clamp01(t)).normalize();
    if blended.is_zero() {
        facing.perpendicular()
    } else {
        blended
    }
}

/// Chord distance between two facings after normalizing both.
///
/// Grows monotonically with the angle between them: 0 when aligned,
/// 2 when opposite. Used as the "angle" for facing thresholds.
#[must_use]
pub fn facing_error(facing: Vec2Fixed, desired: Vec2Fixed) -> Fixed {
    let a = facing.normalize();
    let b = desired.normalize();
    fixed_sqrt(a.distance_squared(b))
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epsilon() -> Fixed {
        Fixed::ONE / Fixed::from_num(10000)
    }

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        // 3² + 4² = 25
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_distance_squared_saturates_far_apart() {
        let a = Vec2Fixed::from_ints(-30_000, 0);
        let b = Vec2Fixed::from_ints(30_000, 0);
        assert_eq!(a.distance_squared(b), Fixed::MAX);
        assert_eq!(b.distance_squared(a), Fixed::MAX);
        assert!(fixed_sqrt(Fixed::MAX) > Fixed::from_num(46_000));
    }

    #[test]
    fn test_move_towards_stops_at_target() {
        let start = Vec2Fixed::ZERO;
        let target = Vec2Fixed::from_ints(3, 4);

        let step = start.move_towards(target, Fixed::from_num(2));
        assert!((step.length() - Fixed::from_num(2)).abs() < epsilon());

        let arrived = start.move_towards(target, Fixed::from_num(10));
        assert_eq!(arrived, target);
    }

    #[test]
    fn test_lerp_fixed_clamps_factor() {
        let v = lerp_fixed(Fixed::from_num(1), Fixed::from_num(2), Fixed::from_num(5));
        assert_eq!(v, Fixed::from_num(2));
        let v = lerp_fixed(Fixed::from_num(1), Fixed::from_num(2), Fixed::from_num(-1));
        assert_eq!(v, Fixed::from_num(1));
    }

    #[test]
    fn test_rotate_towards_converges() {
        let mut facing = Vec2Fixed::UP;
        let desired = Vec2Fixed::from_ints(1, 0);
        for _ in 0..60 {
            facing = rotate_towards(facing, desired, Fixed::from_num(0.5));
        }
        assert!(facing_error(facing, desired) < epsilon());
    }

    #[test]
    fn test_rotate_towards_escapes_opposite_facing() {
        let facing = Vec2Fixed::UP;
        let desired = Vec2Fixed::from_ints(0, -1);
        let turned = rotate_towards(facing, desired, Fixed::from_num(0.5));
        assert!(facing_error(turned, desired) < facing_error(facing, desired));
    }

    #[test]
    fn test_facing_error_is_monotonic_in_angle() {
        let forward = Vec2Fixed::UP;
        let quarter = Vec2Fixed::from_ints(1, 0);
        let half = Vec2Fixed::from_ints(0, -1);
        assert_eq!(facing_error(forward, forward), Fixed::ZERO);
        assert!(facing_error(forward, quarter) < facing_error(forward, half));
    }

    #[test]
    fn test_vec2_normalize() {
        let norm = Vec2Fixed::from_ints(3, 4).normalize();
        let len_sq = norm.dot(norm);
        assert!(
            (len_sq - Fixed::ONE).abs() < epsilon(),
            "normalized vector length² should be ~1, got {:?}",
            len_sq
        );
        assert_eq!(Vec2Fixed::ZERO.normalize(), Vec2Fixed::ZERO);
    }
}
