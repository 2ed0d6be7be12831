//! Data structures for unit configuration.
//!
//! Pure data types deserialized from RON. This module contains no file IO;
//! reading files is left to the caller (see `skirmish_headless`).

mod tuning_data;
mod unit_data;

pub use tuning_data::TuningData;
pub use unit_data::{CombatData, UnitData};
