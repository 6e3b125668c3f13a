//! Unit definitions placed on a stage.

use serde::{Deserialize, Serialize};

use crate::brain::BrainKind;
use crate::combat::UnitClass;
use crate::factions::Faction;
use crate::grid::Point;
use crate::unit::{Facing, StatOverrides, Stats};

const fn default_level() -> u32 {
    1
}

/// A unit as written in stage data.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     name: "Lancer",
///     tags: ["captain"],
///     faction: Ally,
///     class: close,
///     level: 2,
///     stats: (hp: Some(60)),
///     pos: (x: 1, y: 4),
///     brain: input,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitData {
    /// Display name.
    pub name: String,
    /// Tags used by gimmicks and missions.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Side.
    pub faction: Faction,
    /// Combat class.
    pub class: UnitClass,
    /// Level; stats grow with it.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Explicit stat values that win over the class defaults.
    #[serde(default)]
    pub stats: StatOverrides,
    /// Block the unit appears on.
    pub pos: Point,
    /// Decision logic.
    #[serde(default)]
    pub brain: BrainKind,
    /// Tag of a leader to escort, for automatic brains.
    #[serde(default)]
    pub mission: Option<String>,
    /// Initial facing.
    #[serde(default)]
    pub facing: Facing,
}

impl UnitData {
    /// A level-1 automatic unit with class defaults.
    #[must_use]
    pub fn new(name: impl Into<String>, faction: Faction, class: UnitClass, pos: Point) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            faction,
            class,
            level: 1,
            stats: StatOverrides::default(),
            pos,
            brain: BrainKind::Auto,
            mission: None,
            facing: Facing::default(),
        }
    }

    /// Resolved stats: class defaults at the level, then overrides.
    #[must_use]
    pub fn stats(&self) -> Stats {
        let mut stats = Stats::for_class(self.class, self.level);
        stats.apply(&self.stats);
        stats
    }

    /// Problems with the definition, empty when it is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let stats = self.stats();
        if stats.shots == 0 {
            errors.push(format!("Unit '{}' fires no shots", self.name));
        }
        if stats.avoidance == 0 {
            errors.push(format!("Unit '{}' has zero avoidance", self.name));
        }
        if stats.hp == 0 {
            errors.push(format!("Unit '{}' has no hit points", self.name));
        }
        if self.level == 0 {
            errors.push(format!("Unit '{}' has level 0", self.name));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_defaults() {
        let text = r#"(name: "Rifle", faction: Foe, class: mid, pos: (x: 3, y: 0))"#;
        let data: UnitData = ron::from_str(text).expect("valid unit");
        assert_eq!(data.level, 1);
        assert_eq!(data.brain, BrainKind::Auto);
        assert!(data.tags.is_empty());
        assert_eq!(data.stats(), Stats::for_class(UnitClass::Mid, 1));
        assert!(data.validate().is_empty());
    }

    #[test]
    fn test_overrides_and_brain() {
        let text = r#"(
            name: "Lancer",
            tags: ["captain"],
            faction: Ally,
            class: close,
            level: 2,
            stats: (hp: Some(60), shots: Some(0)),
            pos: (x: 1, y: 4),
            brain: input,
            facing: right,
        )"#;
        let data: UnitData = ron::from_str(text).expect("valid unit");
        assert_eq!(data.brain, BrainKind::Input);
        assert_eq!(data.facing, Facing::Right);
        assert_eq!(data.stats().hp, 60);
        assert_eq!(data.validate().len(), 1);
    }
}
