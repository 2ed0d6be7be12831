//! Headless scenario runner for CI verification.
//!
//! Loads a RON [`scenario::Scenario`], drives the skirmish simulation for a
//! number of ticks and reports a [`runner::RunSummary`]:
//!
//! - **stdout**: the JSON summary
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! cargo run -p skirmish_headless -- run --scenario scenarios/tower_assault.ron --ticks 600
//! ```

pub mod runner;
pub mod scenario;

pub use runner::{run_scenario, HeadlessRunner, RunConfig, RunSummary};
pub use scenario::{Scenario, ScenarioError};
