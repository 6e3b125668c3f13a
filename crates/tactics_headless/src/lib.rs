//! Headless stage runner for AI playtesting and CI verification.
//!
//! Loads a stage from RON, plays it with automatic brains and a timeline
//! presenter, and reports how it went. This enables:
//!
//! - **AI playtesting**: see how a stage plays out without a renderer
//! - **CI verification**: check that stages still build and finish
//! - **Determinism checks**: replay a seed and compare state hashes
//!
//! # Example
//!
//! ```bash
//! # Play the built-in skirmish
//! cargo run -p tactics_headless -- run --stage skirmish
//!
//! # Play a stage file with another seed, JSON report on stdout
//! cargo run -p tactics_headless -- run --stage my_stage.ron --seed 7 --json
//!
//! # Verify determinism
//! cargo run -p tactics_headless -- verify --stage skirmish --runs 5
//! ```

pub mod runner;
pub mod scenario;

pub use runner::{run_stage, verify, RunConfig, RunReport, SurvivorReport, VerifyReport};
pub use scenario::ScenarioError;
