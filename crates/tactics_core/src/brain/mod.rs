//! Unit decision logic.
//!
//! A brain looks at the stage through a read-only [`StageView`] and either
//! decides on the spot or asks the stage to wait for player input. Brains
//! never touch the grid; the stage turns their verdict into commands.

mod auto;
mod input;

use std::collections::BTreeMap;
use std::fmt;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub use auto::AutoBrain;
pub use input::InputBrain;

use crate::combat::{predict, Prediction};
use crate::grid::{Grid, Point};
use crate::pathfinding::reachable_set;
use crate::unit::{Unit, UnitId};

/// Which brain a unit gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrainKind {
    /// Weighted heuristic.
    #[default]
    Auto,
    /// Player controlled.
    Input,
}

/// What a unit will do this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Block to move to. The unit's own seat means staying put.
    pub move_to: Point,
    /// Unit to attack after moving.
    pub target: Option<UnitId>,
}

/// Choices offered to a player.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Prompt {
    /// Blocks the unit may move to.
    pub travels: Vec<Point>,
}

/// Outcome of [`Brain::perform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Decided immediately.
    Decided(Decision),
    /// Waiting for a decision to be submitted.
    AwaitInput(Prompt),
    /// Nothing to do this turn.
    Idle,
}

/// Decision logic attached to a unit.
pub trait Brain: fmt::Debug {
    /// Decide what unit `me` does this turn.
    fn perform(&mut self, view: &StageView<'_>, me: UnitId, rng: &mut ChaCha8Rng) -> Verdict;

    /// Kind of brain, for reports.
    fn kind(&self) -> BrainKind;
}

/// Build the brain a unit definition asks for.
#[must_use]
pub fn create_brain(kind: BrainKind, mission: Option<String>) -> Box<dyn Brain> {
    match kind {
        BrainKind::Auto => Box::new(AutoBrain::new(mission)),
        BrainKind::Input => Box::new(InputBrain),
    }
}

/// Read-only view of a stage handed to brains.
#[derive(Debug, Clone, Copy)]
pub struct StageView<'a> {
    grid: &'a Grid,
    units: &'a BTreeMap<UnitId, Unit>,
}

impl<'a> StageView<'a> {
    /// View over a grid and its units.
    #[must_use]
    pub const fn new(grid: &'a Grid, units: &'a BTreeMap<UnitId, Unit>) -> Self {
        Self { grid, units }
    }

    /// The grid.
    #[must_use]
    pub const fn grid(&self) -> &'a Grid {
        self.grid
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&'a Unit> {
        self.units.get(&id)
    }

    /// Units in id order.
    pub fn units(&self) -> impl Iterator<Item = &'a Unit> {
        self.units.values()
    }

    /// Seated units hostile to `me`, in id order.
    pub fn seated_hostiles(&self, me: &'a Unit) -> impl Iterator<Item = &'a Unit> {
        self.units
            .values()
            .filter(move |u| u.seat.is_some() && u.faction.is_hostile_to(me.faction))
    }

    /// First unit (by id) carrying `tag`.
    #[must_use]
    pub fn tagged(&self, tag: &str) -> Option<&'a Unit> {
        self.units.values().find(|u| u.has_tag(tag))
    }

    /// Blocks `me` can move to this turn: its travel range minus blocks
    /// held by other units. Empty if the unit is not seated.
    #[must_use]
    pub fn travels(&self, me: &Unit) -> Vec<Point> {
        let Some(seat) = me.seat else {
            return Vec::new();
        };
        reachable_set(self.grid, seat, me.stats.legs, Some(me.occupant()))
            .points()
            .filter(|&p| self.grid.occupant(p).map_or(true, |o| o.unit == me.id))
            .collect()
    }

    /// Blocks `me` could shoot at from `from`.
    #[must_use]
    pub fn aimables(&self, me: &Unit, from: Point) -> Vec<Point> {
        reachable_set(self.grid, from, me.stats.range, None)
            .points()
            .filter(|&p| p != from)
            .collect()
    }

    /// Hostile units `me` could shoot at from `from`.
    #[must_use]
    pub fn targets_from(&self, me: &Unit, from: Point) -> Vec<UnitId> {
        self.aimables(me, from)
            .into_iter()
            .filter_map(|p| self.grid.occupant(p))
            .filter(|o| o.faction.is_hostile_to(me.faction))
            .map(|o| o.unit)
            .collect()
    }

    /// Predict `thrower` attacking `catcher`.
    #[must_use]
    pub fn predict(&self, thrower: &Unit, catcher: &Unit) -> Prediction {
        predict(thrower.class, &thrower.stats, catcher.class, &catcher.stats)
    }
}

/// The candidate with the greatest weight; later candidates win ties.
pub(crate) fn heaviest<T>(candidates: impl IntoIterator<Item = (T, f64)>) -> Option<T> {
    let mut best: Option<(T, f64)> = None;
    for (value, weight) in candidates {
        let replace = match &best {
            Some((_, current)) => *current <= weight,
            None => true,
        };
        if replace {
            best = Some((value, weight));
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heaviest_prefers_later_on_ties() {
        assert_eq!(heaviest([("a", 1.0), ("b", 3.0), ("c", 3.0), ("d", 2.0)]), Some("c"));
        assert_eq!(heaviest(Vec::<(u8, f64)>::new()), None);
    }

    #[test]
    fn test_create_brain_kinds() {
        assert_eq!(create_brain(BrainKind::Auto, None).kind(), BrainKind::Auto);
        assert_eq!(create_brain(BrainKind::Input, None).kind(), BrainKind::Input);
    }

    #[test]
    fn test_brain_kind_from_ron() {
        let kind: BrainKind = ron::from_str("input").expect("valid kind");
        assert_eq!(kind, BrainKind::Input);
    }
}
