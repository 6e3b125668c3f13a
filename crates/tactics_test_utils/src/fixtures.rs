//! Test fixtures and helpers.
//!
//! Grids drawn as text, unit definitions and a stage driver that ticks a
//! stage until it settles.

use tactics_core::combat::UnitClass;
use tactics_core::data::UnitData;
use tactics_core::factions::Faction;
use tactics_core::grid::{Grid, Point, IMPASSABLE, NORMAL_COST};
use tactics_core::presenter::{Journal, TimelinePresenter};
use tactics_core::stage::{Outcome, Stage, StageConfig, TickEvents};
use tactics_core::unit::StatOverrides;
use tracing::debug;

/// Default tick length used by the driver.
pub const TICK_MS: u64 = 50;

/// Build a grid from rows of text.
///
/// `.` is a normal block, `#` is impassable and a digit `n` costs
/// `n × 100`. Every row must have the same length.
///
/// # Panics
///
/// Panics on ragged rows or unknown characters.
#[must_use]
pub fn grid_from_rows(rows: &[&str]) -> Grid {
    let height = rows.len() as u32;
    let width = rows.first().map_or(0, |r| r.chars().count()) as u32;
    let costs: Vec<u32> = rows
        .iter()
        .flat_map(|row| {
            assert_eq!(row.chars().count() as u32, width, "ragged grid row {row:?}");
            row.chars().map(|c| match c {
                '.' => NORMAL_COST,
                '#' => IMPASSABLE,
                d if d.is_ascii_digit() => d.to_digit(10).unwrap_or(1) * 100,
                other => panic!("unknown grid character {other:?}"),
            })
        })
        .collect();
    Grid::from_costs(width, height, &costs).expect("grid rows describe a valid grid")
}

/// A unit definition at `(x, y)`.
#[must_use]
pub fn unit(name: &str, faction: Faction, class: UnitClass, x: i32, y: i32) -> UnitData {
    UnitData::new(name, faction, class, Point::new(x, y))
}

/// An allied unit.
#[must_use]
pub fn ally(name: &str, class: UnitClass, x: i32, y: i32) -> UnitData {
    unit(name, Faction::Ally, class, x, y)
}

/// A hostile unit.
#[must_use]
pub fn foe(name: &str, class: UnitClass, x: i32, y: i32) -> UnitData {
    unit(name, Faction::Foe, class, x, y)
}

/// Overrides for a single, certain-to-land shot of `attack` damage
/// against an unevasive catcher.
#[must_use]
pub fn single_shot(attack: u32) -> StatOverrides {
    StatOverrides {
        attack: Some(attack),
        shots: Some(1),
        ..StatOverrides::default()
    }
}

/// Overrides for a catcher that never evades.
#[must_use]
pub fn unevasive(hp: u32) -> StatOverrides {
    StatOverrides {
        avoidance: Some(0),
        hp: Some(hp),
        ..StatOverrides::default()
    }
}

/// Configuration without the automatic turn cycle.
#[must_use]
pub fn manual_config(seed: u64) -> StageConfig {
    StageConfig {
        seed,
        auto_turns: false,
        ..StageConfig::default()
    }
}

/// Configuration with the automatic turn cycle.
#[must_use]
pub fn auto_config(seed: u64) -> StageConfig {
    StageConfig {
        seed,
        ..StageConfig::default()
    }
}

/// Drives a stage under a [`TimelinePresenter`] and keeps every tick's
/// events.
#[derive(Debug)]
pub struct StageDriver {
    stage: Stage,
    journal: Journal,
    history: Vec<TickEvents>,
}

impl StageDriver {
    /// A stage over `grid` with `units` spawned in order.
    ///
    /// # Panics
    ///
    /// Panics if a unit cannot be placed.
    #[must_use]
    pub fn new(grid: Grid, config: StageConfig, units: &[UnitData]) -> Self {
        let presenter = TimelinePresenter::new();
        let journal = presenter.journal();
        let mut stage = Stage::new(grid, config, Box::new(presenter));
        for data in units {
            stage.spawn(data).expect("fixture unit fits on the grid");
        }
        Self {
            stage,
            journal,
            history: Vec::new(),
        }
    }

    /// The stage.
    #[must_use]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// The stage, mutably.
    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    /// Presentation requests recorded so far.
    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Events of every tick so far.
    #[must_use]
    pub fn history(&self) -> &[TickEvents] {
        &self.history
    }

    /// Advance one tick of [`TICK_MS`].
    pub fn tick(&mut self) -> &TickEvents {
        let events = self.stage.update(TICK_MS);
        self.history.push(events);
        &self.history[self.history.len() - 1]
    }

    /// Tick until the stage is idle. Returns whether it settled within
    /// `max_ticks`.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> bool {
        for _ in 0..max_ticks {
            self.tick();
            if self.stage.is_idle() {
                return true;
            }
        }
        debug!(max_ticks, "stage still busy");
        false
    }

    /// Tick until the stage ends or `max_ticks` pass.
    pub fn run_until_outcome(&mut self, max_ticks: usize) -> Option<Outcome> {
        for _ in 0..max_ticks {
            self.tick();
            if let Some(outcome) = self.stage.outcome() {
                return Some(outcome);
            }
        }
        None
    }

    /// Kinds of every admitted command, in admission order.
    #[must_use]
    pub fn issued_kinds(&self) -> Vec<&'static str> {
        self.history
            .iter()
            .flat_map(|events| events.issued.iter().map(|c| c.kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_from_rows() {
        let grid = grid_from_rows(&["..#", ".3."]);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert!(grid.block(Point::new(2, 0)).expect("in grid").is_impassable());
        assert_eq!(
            grid.cost_of(Point::new(1, 1), tactics_core::grid::Locomotion::Walk),
            Some(300)
        );
    }

    #[test]
    fn test_driver_runs_start_commands() {
        let mut driver = StageDriver::new(grid_from_rows(&["..."]), manual_config(1), &[]);
        assert!(driver.run_until_idle(10));
        assert_eq!(driver.issued_kinds(), vec!["start", "call"]);
    }
}
