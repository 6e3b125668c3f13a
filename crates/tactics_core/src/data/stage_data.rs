//! Whole-stage descriptions.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::data::{MapData, UnitData};
use crate::error::{GameError, Result};
use crate::gimmick::{Gimmick, GimmickCommand};
use crate::stage::StageConfig;

/// A stage: map, starting units, gimmicks and tuning.
///
/// Starting units are appeared in order when the stage is built, before
/// the `started` gimmicks fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageData {
    /// Stage title.
    pub name: String,
    /// Terrain.
    pub map: MapData,
    /// Units present from the start.
    #[serde(default)]
    pub units: Vec<UnitData>,
    /// Gimmicks merged over the defaults by name.
    #[serde(default)]
    pub gimmicks: BTreeMap<String, Gimmick>,
    /// Tuning.
    #[serde(default)]
    pub config: StageConfig,
}

impl StageData {
    /// Parse a stage from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] when the text is not a valid
    /// stage.
    pub fn from_ron(source_name: &str, text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            source_name: source_name.to_owned(),
            message: e.to_string(),
        })
    }

    /// Problems with the stage, empty when it is playable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.map.validate();
        let in_map = |x: i32, y: i32| {
            x >= 0 && y >= 0 && (x as u32) < self.map.width && (y as u32) < self.map.height
        };

        let mut seats = HashSet::new();
        for unit in &self.units {
            errors.extend(unit.validate());
            if !in_map(unit.pos.x, unit.pos.y) {
                errors.push(format!("Unit '{}' placed outside the map at {}", unit.name, unit.pos));
            } else if !seats.insert(unit.pos) {
                errors.push(format!("Unit '{}' shares block {} with another unit", unit.name, unit.pos));
            }
        }

        for (name, gimmick) in &self.gimmicks {
            match &gimmick.command {
                GimmickCommand::Appear(unit) => errors.extend(unit.validate()),
                GimmickCommand::Move { to, .. } if !in_map(to.x, to.y) => {
                    errors.push(format!("Gimmick '{name}' moves outside the map to {to}"));
                }
                _ => {}
            }
        }
        errors
    }
}
