//! Data structures for stage descriptions.
//!
//! Stages, their maps, units and gimmicks are plain serde types meant to be
//! written in RON. Parsing from a string lives here; reading files is left
//! to the caller (see `tactics_headless`).

mod map_data;
mod stage_data;
mod unit_data;

pub use map_data::{MapData, TileData};
pub use stage_data::StageData;
pub use unit_data::UnitData;
