//! Proptest strategies for unit simulation tests.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing.

use proptest::prelude::*;
use skirmish_core::command_queue::CommandItem;
use skirmish_core::components::UnitHandle;
use skirmish_core::math::{Fixed, Vec2Fixed};

/// Generate a fixed-point coordinate in a typical map range (-500 to 500).
pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
    (-500_000i32..500_000i32).prop_map(|milli| Fixed::from_num(milli) / Fixed::from_num(1000))
}

/// Generate a fixed-point 2D vector for positions.
pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
    (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
}

/// Generate a non-zero direction.
pub fn arb_direction() -> impl Strategy<Value = Vec2Fixed> {
    arb_vec2_position().prop_filter("direction must be non-zero", |v| !v.is_zero())
}

/// Generate a positive radius (0.001 to 50).
pub fn arb_radius() -> impl Strategy<Value = Fixed> {
    (1i32..50_000i32).prop_map(|milli| Fixed::from_num(milli) / Fixed::from_num(1000))
}

/// Generate a unit handle.
pub fn arb_handle() -> impl Strategy<Value = UnitHandle> {
    (0u32..64, 0u32..4).prop_map(|(index, generation)| UnitHandle::new(index, generation))
}

/// Generate a move or attack command.
pub fn arb_command() -> impl Strategy<Value = CommandItem> {
    prop_oneof![
        arb_vec2_position().prop_map(|point| CommandItem::Move { point }),
        (arb_vec2_position(), arb_handle())
            .prop_map(|(point, target)| CommandItem::Attack { point, target }),
    ]
}

/// Generate a sequence of commands.
pub fn arb_command_sequence(max_len: usize) -> impl Strategy<Value = Vec<CommandItem>> {
    proptest::collection::vec(arb_command(), 0..max_len)
}

/// Generate max health values (1-1000).
pub fn arb_health() -> impl Strategy<Value = u32> {
    1u32..1000u32
}

/// Generate damage values (1-100).
pub fn arb_damage() -> impl Strategy<Value = u32> {
    1u32..100u32
}

/// Generate a tick count for ramp tests (1-2000).
pub fn arb_ticks() -> impl Strategy<Value = u32> {
    1u32..2000u32
}
