//! Headless stage runner.
//!
//! Plays a stage with automatic brains under a [`TimelinePresenter`] and
//! condenses the run into a [`RunReport`].

use serde::Serialize;
use tactics_core::combat::UnitClass;
use tactics_core::data::StageData;
use tactics_core::factions::Faction;
use tactics_core::grid::Point;
use tactics_core::presenter::TimelinePresenter;
use tactics_core::stage::{Outcome, Session, Stage};
use tracing::{debug, info, warn};

use crate::scenario::{automate, ScenarioError};

/// How a run is driven.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Overrides the stage's own seed.
    pub seed: Option<u64>,
    /// Give up after this many ticks.
    pub max_ticks: u64,
    /// Milliseconds per tick.
    pub tick_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_ticks: 100_000,
            tick_ms: 50,
        }
    }
}

/// A unit still on the stage at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurvivorReport {
    /// Unit name.
    pub name: String,
    /// Side.
    pub faction: Faction,
    /// Class.
    pub class: UnitClass,
    /// Remaining hit points.
    pub hp: u32,
    /// Hit points at appearance.
    pub hp_max: u32,
    /// Final seat.
    pub seat: Option<Point>,
}

/// Summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Stage name.
    pub stage: String,
    /// Seed used.
    pub seed: u64,
    /// Ticks played.
    pub ticks: u64,
    /// Stage clock at the end.
    pub elapsed_ms: u64,
    /// How the stage ended; `None` if it ran out of ticks.
    pub outcome: Option<Outcome>,
    /// Commands admitted.
    pub commands_issued: usize,
    /// Actions rolled.
    pub attacks: usize,
    /// Shots that landed.
    pub hits: usize,
    /// Shots that missed.
    pub misses: usize,
    /// Damage of all landed shots.
    pub damage_dealt: u64,
    /// Units that appeared after the starting line-up.
    pub reinforcements: usize,
    /// Units that left the stage.
    pub withdrawn: usize,
    /// Units left standing.
    pub survivors: Vec<SurvivorReport>,
    /// Session tally after settling the stage.
    pub session: Session,
    /// Final [`Stage::state_hash`].
    pub state_hash: u64,
}

impl RunReport {
    /// Short human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let outcome = match self.outcome {
            Some(Outcome::Cleared) => "cleared",
            Some(Outcome::Missed) => "missed",
            None => "unfinished",
        };
        let mut text = format!(
            "{} (seed {}): {outcome} after {} ticks ({} ms)\n\
             commands {}, attacks {}, hits {}, misses {}, damage {}\n\
             reinforcements {}, withdrawn {}, terminated {}\n",
            self.stage,
            self.seed,
            self.ticks,
            self.elapsed_ms,
            self.commands_issued,
            self.attacks,
            self.hits,
            self.misses,
            self.damage_dealt,
            self.reinforcements,
            self.withdrawn,
            self.session.terminated,
        );
        for s in &self.survivors {
            let seat = s.seat.map_or_else(|| "-".to_owned(), |p| p.to_string());
            text.push_str(&format!(
                "  {:<2} {:<12} {:<5} hp {:>3}/{:<3} at {seat}\n",
                s.faction.short_name(),
                s.name,
                s.class.name(),
                s.hp,
                s.hp_max
            ));
        }
        text
    }
}

/// Play `data` to the end or until `config.max_ticks`.
///
/// Every unit is handed to the automatic brain first.
pub fn run_stage(data: &StageData, config: &RunConfig) -> Result<RunReport, ScenarioError> {
    let mut data = data.clone();
    automate(&mut data);
    if let Some(seed) = config.seed {
        data.config.seed = seed;
    }
    let seed = data.config.seed;
    let starting = data.units.len();

    let mut stage = Stage::from_data(&data, Box::new(TimelinePresenter::new()))?;
    let mut report = RunReport {
        stage: data.name.clone(),
        seed,
        ticks: 0,
        elapsed_ms: 0,
        outcome: None,
        commands_issued: 0,
        attacks: 0,
        hits: 0,
        misses: 0,
        damage_dealt: 0,
        reinforcements: 0,
        withdrawn: 0,
        survivors: Vec::new(),
        session: Session::new(),
        state_hash: 0,
    };

    info!(stage = %data.name, seed, max_ticks = config.max_ticks, "Run started");
    while report.ticks < config.max_ticks {
        let events = stage.update(config.tick_ms);
        report.ticks += 1;
        report.commands_issued += events.issued.len();
        report.reinforcements += events.appeared.len();
        report.withdrawn += events.withdrawn.len();
        for attack in &events.attacks {
            report.attacks += 1;
            for damage in &attack.damages {
                match damage {
                    Some(d) => {
                        report.hits += 1;
                        report.damage_dealt += u64::from(*d);
                    }
                    None => report.misses += 1,
                }
            }
            debug!(thrower = %attack.thrower, catcher = %attack.catcher, damages = ?attack.damages, "attack");
        }
        if events.outcome.is_some() {
            break;
        }
    }
    // Starting units report as appeared on the first tick.
    report.reinforcements = report.reinforcements.saturating_sub(starting);
    report.outcome = stage.outcome();
    report.elapsed_ms = stage.now_ms();
    report.state_hash = stage.state_hash();
    report.survivors = stage
        .units()
        .map(|u| SurvivorReport {
            name: u.name.clone(),
            faction: u.faction,
            class: u.class,
            hp: u.stats.hp,
            hp_max: u.stats.hp_max,
            seat: u.seat,
        })
        .collect();
    stage.settle(&mut report.session);

    match report.outcome {
        Some(outcome) => info!(?outcome, ticks = report.ticks, "Run finished"),
        None => warn!(ticks = report.ticks, "Run stopped before the stage ended"),
    }
    Ok(report)
}

/// Result of replaying the same stage several times.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
    /// Whether all runs matched.
    pub deterministic: bool,
}

/// Run the stage `runs` times with the same configuration and compare the
/// final state hashes.
///
/// Hashes are only comparable within one build of the runner.
pub fn verify(data: &StageData, config: &RunConfig, runs: u32) -> Result<VerifyReport, ScenarioError> {
    let hashes = (0..runs)
        .map(|_| run_stage(data, config).map(|r| r.state_hash))
        .collect::<Result<Vec<_>, _>>()?;
    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    Ok(VerifyReport { hashes, deterministic })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::resolve;

    #[test]
    fn test_skirmish_runs_to_an_outcome() {
        let data = resolve("skirmish").expect("built-in stage");
        let report = run_stage(&data, &RunConfig::default()).expect("stage builds");
        assert!(report.outcome.is_some(), "{}", report.summary());
        assert!(report.hits + report.misses >= report.attacks);
        assert!(report.commands_issued >= 2);
    }

    #[test]
    fn test_seed_override_and_determinism() {
        let data = resolve("skirmish").expect("built-in stage");
        let config = RunConfig {
            seed: Some(9),
            max_ticks: 2_000,
            ..RunConfig::default()
        };
        let verdict = verify(&data, &config, 3).expect("stage builds");
        assert!(verdict.deterministic, "{:?}", verdict.hashes);
        assert_eq!(run_stage(&data, &config).expect("stage builds").seed, 9);
    }
}
