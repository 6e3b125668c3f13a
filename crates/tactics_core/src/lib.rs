//! # Tactics Core
//!
//! Turn-resolution core for a grid tactics game.
//!
//! This crate contains **only** rules logic:
//! - No rendering
//! - No file IO
//! - No system randomness (a seeded `ChaCha8Rng` per stage)
//!
//! Presentation is reached through the [`presenter::Presenter`] trait, so a
//! stage runs the same under a renderer or the headless
//! [`presenter::TimelinePresenter`].
//!
//! ## Crate Structure
//!
//! - [`grid`] - Blocks, walk costs, occupancy and markers
//! - [`pathfinding`] - Reachable sets, A* routes, route tracing
//! - [`combat`] - Hit prediction and damage rolls
//! - [`unit`] - Units, stats and signals
//! - [`command`] - Stage commands and their queue
//! - [`task`] - Per-unit task runner
//! - [`brain`] - Automatic and player decision making
//! - [`gimmick`] - Event-triggered stage scripting
//! - [`stage`] - The stage loop tying everything together
//! - [`data`] - Serde definitions of stages, maps and units

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod brain;
pub mod combat;
pub mod command;
pub mod data;
pub mod error;
pub mod factions;
pub mod gimmick;
pub mod grid;
pub mod math;
pub mod motion;
pub mod pathfinding;
pub mod presenter;
pub mod stage;
pub mod task;
pub mod unit;
pub mod walker;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::brain::{Brain, BrainKind, Decision, Prompt, StageView, Verdict};
    pub use crate::combat::{predict, Prediction, UnitClass};
    pub use crate::command::{CommandKind, DisappearReason, StageCommand};
    pub use crate::data::{MapData, StageData, TileData, UnitData};
    pub use crate::error::{GameError, Result};
    pub use crate::factions::Faction;
    pub use crate::gimmick::{Gimmick, GimmickCommand, GimmickEvent, GimmickTable, Trigger};
    pub use crate::grid::{Grid, Occupant, Point, IMPASSABLE, NORMAL_COST};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::motion::Motion;
    pub use crate::pathfinding::{reachable_set, star_route, Direction, Route, Travels};
    pub use crate::presenter::{Journal, PresentedEvent, Presenter, TimelinePresenter};
    pub use crate::stage::{Outcome, Session, Stage, StageConfig, TickEvents};
    pub use crate::unit::{Facing, Signal, Stat, StatOverrides, Stats, Unit, UnitId};
}
