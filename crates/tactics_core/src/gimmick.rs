//! Declarative stage triggers.
//!
//! A gimmick pairs a trigger with a command. The stage reports events
//! ("started", a unit moved into a block, a unit withdrew) and every
//! gimmick whose trigger matches queues its command.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::UnitData;
use crate::factions::Faction;
use crate::grid::Point;

/// Name of the default gimmick that clears the stage.
pub const STAGE_CLEAR: &str = "stage-clear";
/// Name of the default gimmick that loses the stage.
pub const STAGE_MISS: &str = "stage-miss";

/// When a gimmick fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Once, right after the stage starts.
    Started,
    /// A unit committed a move into `block`.
    Into {
        /// Block watched.
        block: Point,
        /// Only units of this faction count.
        #[serde(default)]
        faction: Option<Faction>,
    },
    /// A unit left the stage.
    Withdraw {
        /// Only the unit carrying this tag counts.
        #[serde(default)]
        tag: Option<String>,
        /// Fires only once no unit of this faction remains.
        #[serde(default)]
        faction: Option<Faction>,
    },
}

/// An event reported to [`GimmickTable::ignite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GimmickEvent {
    /// The stage started.
    Started,
    /// A unit of `faction` was seated at `block` by a move.
    Into {
        /// Mover's faction.
        faction: Faction,
        /// New seat.
        block: Point,
    },
    /// A unit carrying `tags` left the stage.
    Withdraw {
        /// Tags of the unit that left.
        tags: Vec<String>,
    },
}

/// Command queued when a gimmick fires, in data form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GimmickCommand {
    /// Clear the stage.
    Goal,
    /// Lose the stage.
    Miss,
    /// Bring in a unit.
    Appear(UnitData),
    /// Withdraw the unit carrying a tag.
    Disappear {
        /// Tag to look up.
        tag: String,
    },
    /// Move the unit carrying a tag.
    Move {
        /// Tag to look up.
        tag: String,
        /// Destination.
        to: Point,
    },
}

/// A trigger and what it queues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gimmick {
    /// `None` never fires by itself; it can still be ignited by name.
    #[serde(default)]
    pub trigger: Option<Trigger>,
    /// Command to queue.
    pub command: GimmickCommand,
    /// Remove after firing once.
    #[serde(default)]
    pub oneshot: bool,
}

impl Gimmick {
    fn matches(&self, event: &GimmickEvent, survivors: &impl Fn(Faction) -> usize) -> bool {
        match (&self.trigger, event) {
            (Some(Trigger::Started), GimmickEvent::Started) => true,
            (Some(Trigger::Into { block, faction }), GimmickEvent::Into { faction: mover, block: seat }) => {
                faction.map_or(true, |f| f == *mover) && block == seat
            }
            (Some(Trigger::Withdraw { tag, faction }), GimmickEvent::Withdraw { tags }) => {
                tag.as_ref().map_or(true, |t| tags.contains(t)) && faction.map_or(true, |f| survivors(f) == 0)
            }
            _ => false,
        }
    }
}

/// Named gimmicks of a stage, evaluated in name order.
#[derive(Debug, Clone, PartialEq)]
pub struct GimmickTable {
    gimmicks: BTreeMap<String, Gimmick>,
}

impl Default for GimmickTable {
    fn default() -> Self {
        let mut gimmicks = BTreeMap::new();
        gimmicks.insert(
            STAGE_CLEAR.to_owned(),
            Gimmick {
                trigger: Some(Trigger::Withdraw {
                    tag: None,
                    faction: Some(Faction::Foe),
                }),
                command: GimmickCommand::Goal,
                oneshot: false,
            },
        );
        gimmicks.insert(
            STAGE_MISS.to_owned(),
            Gimmick {
                trigger: Some(Trigger::Withdraw {
                    tag: None,
                    faction: Some(Faction::Ally),
                }),
                command: GimmickCommand::Miss,
                oneshot: false,
            },
        );
        Self { gimmicks }
    }
}

impl GimmickTable {
    /// Default gimmicks with `overrides` merged over them by name.
    #[must_use]
    pub fn with_overrides(overrides: &BTreeMap<String, Gimmick>) -> Self {
        let mut table = Self::default();
        for (name, gimmick) in overrides {
            table.gimmicks.insert(name.clone(), gimmick.clone());
        }
        table
    }

    /// Look up a gimmick.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Gimmick> {
        self.gimmicks.get(name)
    }

    /// Number of gimmicks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.gimmicks.len()
    }

    /// True when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gimmicks.is_empty()
    }

    /// Commands of every gimmick matching `event`.
    ///
    /// `survivors` counts the units of a faction still on the stage.
    /// One-shot gimmicks that fire are removed.
    pub fn ignite(
        &mut self,
        event: &GimmickEvent,
        survivors: impl Fn(Faction) -> usize,
    ) -> Vec<(String, GimmickCommand)> {
        let fired: Vec<String> = self
            .gimmicks
            .iter()
            .filter(|(_, g)| g.matches(event, &survivors))
            .map(|(name, _)| name.clone())
            .collect();
        fired.into_iter().filter_map(|name| self.take(&name)).collect()
    }

    /// Fire a gimmick by name regardless of its trigger.
    pub fn ignite_named(&mut self, name: &str) -> Option<GimmickCommand> {
        self.take(name).map(|(_, command)| command)
    }

    fn take(&mut self, name: &str) -> Option<(String, GimmickCommand)> {
        let gimmick = self.gimmicks.get(name)?;
        let command = gimmick.command.clone();
        info!(gimmick = name, "gimmick ignited");
        if gimmick.oneshot {
            self.gimmicks.remove(name);
        }
        Some((name.to_owned(), command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none_left(_: Faction) -> usize {
        0
    }

    #[test]
    fn test_default_clear_needs_no_foes_left() {
        let mut table = GimmickTable::default();
        let event = GimmickEvent::Withdraw { tags: vec![] };

        let foes_left = |f: Faction| usize::from(f == Faction::Foe);
        let fired = table.ignite(&event, foes_left);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, STAGE_MISS);

        let fired = table.ignite(&event, |f: Faction| usize::from(f == Faction::Ally));
        assert_eq!(fired, vec![(STAGE_CLEAR.to_owned(), GimmickCommand::Goal)]);
    }

    #[test]
    fn test_into_matches_block_and_faction() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "gate".to_owned(),
            Gimmick {
                trigger: Some(Trigger::Into {
                    block: Point::new(3, 1),
                    faction: Some(Faction::Ally),
                }),
                command: GimmickCommand::Goal,
                oneshot: true,
            },
        );
        let mut table = GimmickTable::with_overrides(&overrides);
        assert_eq!(table.len(), 3);

        let foe_in = GimmickEvent::Into {
            faction: Faction::Foe,
            block: Point::new(3, 1),
        };
        assert!(table.ignite(&foe_in, none_left).is_empty());

        let ally_elsewhere = GimmickEvent::Into {
            faction: Faction::Ally,
            block: Point::new(3, 2),
        };
        assert!(table.ignite(&ally_elsewhere, none_left).is_empty());

        let ally_in = GimmickEvent::Into {
            faction: Faction::Ally,
            block: Point::new(3, 1),
        };
        assert_eq!(table.ignite(&ally_in, none_left).len(), 1);
        // One-shot: gone after firing.
        assert!(table.ignite(&ally_in, none_left).is_empty());
        assert!(table.get("gate").is_none());
    }

    #[test]
    fn test_withdraw_by_tag() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            STAGE_MISS.to_owned(),
            Gimmick {
                trigger: Some(Trigger::Withdraw {
                    tag: Some("captain".into()),
                    faction: None,
                }),
                command: GimmickCommand::Miss,
                oneshot: false,
            },
        );
        let mut table = GimmickTable::with_overrides(&overrides);
        let many_left = |_: Faction| 5;

        let grunt = GimmickEvent::Withdraw {
            tags: vec!["grunt".into()],
        };
        assert!(table.ignite(&grunt, many_left).is_empty());

        let captain = GimmickEvent::Withdraw {
            tags: vec!["captain".into()],
        };
        assert_eq!(table.ignite(&captain, many_left), vec![(STAGE_MISS.to_owned(), GimmickCommand::Miss)]);
    }

    #[test]
    fn test_untriggered_gimmick_only_fires_by_name() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "manual".to_owned(),
            Gimmick {
                trigger: None,
                command: GimmickCommand::Goal,
                oneshot: false,
            },
        );
        let mut table = GimmickTable::with_overrides(&overrides);
        assert!(table.ignite(&GimmickEvent::Started, none_left).is_empty());
        assert_eq!(table.ignite_named("manual"), Some(GimmickCommand::Goal));
        assert_eq!(table.ignite_named("missing"), None);
    }

    #[test]
    fn test_trigger_from_ron() {
        let text = "(trigger: Some(into(block: (x: 2, y: 5), faction: Some(Ally))), command: goal, oneshot: true)";
        let gimmick: Gimmick = ron::from_str(text).expect("valid gimmick");
        assert_eq!(
            gimmick.trigger,
            Some(Trigger::Into {
                block: Point::new(2, 5),
                faction: Some(Faction::Ally)
            })
        );
        assert!(gimmick.oneshot);
    }
}
