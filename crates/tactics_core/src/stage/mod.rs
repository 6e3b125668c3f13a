//! The stage: grid, units, command scheduling and the per-tick loop.
//!
//! # Tick order
//!
//! Each [`Stage::update`] runs, in this order:
//! 1. **Turn cycle** - queue the next unit's turn when nothing is pending
//! 2. **Scheduler** - drop finished commands, admit at most one new one
//! 3. **Presenter** - advance presentation time and raise due signals
//! 4. **Units** - in id order: activate, advance the step mover, drain tasks
//!
//! The scheduler never runs tasks itself; it only observes whether the
//! commands it admitted are still running.
//!
//! # Determinism
//!
//! Units live in a `BTreeMap` and are always visited in id order. All
//! randomness comes from a `ChaCha8Rng` seeded from [`StageConfig::seed`].
//! Two stages built from the same data and driven by the same sequence of
//! updates and inputs produce the same [`Stage::state_hash`].

mod commands;
mod session;
mod tasks;

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

pub use session::Session;

use crate::brain::StageView;
use crate::command::{CommandKind, CommandQueue, StageCommand};
use crate::data::{StageData, UnitData};
use crate::error::{GameError, Result};
use crate::gimmick::{GimmickEvent, GimmickTable};
use crate::grid::Grid;
use crate::presenter::Presenter;
use crate::task::Callback;
use crate::unit::{Signal, Unit, UnitId};
use crate::walker::Walker;

/// Tuning of a stage. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Seed of the stage RNG.
    pub seed: u64,
    /// Queue turns automatically once the stage starts.
    pub auto_turns: bool,
    /// Minimum time between the start of a command and the start of
    /// another one alongside it.
    pub parallel_interval_ms: u64,
    /// Duration of one step.
    pub step_duration_ms: u64,
    /// Shape of a step.
    pub step_walker: Walker,
    /// Maximum relative swing applied to each landed shot.
    pub damage_swing: f64,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            auto_turns: true,
            parallel_interval_ms: 200,
            step_duration_ms: 200,
            step_walker: Walker::default(),
            damage_swing: 0.05,
        }
    }
}

/// How a stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Goal reached.
    Cleared,
    /// Lost.
    Missed,
}

/// A command admitted by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCommand {
    /// Queue sequence number.
    pub seq: u64,
    /// Kind name.
    pub kind: &'static str,
    /// Units referenced once run.
    pub units: Vec<UnitId>,
}

/// Shots rolled by an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackEvent {
    /// Attacker.
    pub thrower: UnitId,
    /// Target.
    pub catcher: UnitId,
    /// Per-shot damage, `None` for a miss.
    pub damages: Vec<Option<u32>>,
}

/// Events generated during one update.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Commands admitted this tick.
    pub issued: Vec<IssuedCommand>,
    /// Sequence numbers of commands that finished.
    pub completed: Vec<u64>,
    /// Units that appeared.
    pub appeared: Vec<UnitId>,
    /// Units that left the stage.
    pub withdrawn: Vec<UnitId>,
    /// Attacks rolled.
    pub attacks: Vec<AttackEvent>,
    /// Set on the tick the stage ends.
    pub outcome: Option<Outcome>,
}

/// One battle.
#[derive(Debug)]
pub struct Stage {
    config: StageConfig,
    grid: Grid,
    units: BTreeMap<UnitId, Unit>,
    next_unit: u32,
    queue: CommandQueue,
    running: Vec<StageCommand>,
    gimmicks: GimmickTable,
    presenter: Box<dyn Presenter>,
    rng: ChaCha8Rng,
    now_ms: u64,
    turn_cycle: bool,
    turn_cursor: Option<UnitId>,
    outcome: Option<Outcome>,
    terminated: u32,
    events: TickEvents,
}

impl Stage {
    /// A stage over `grid` with the default gimmicks and no units.
    ///
    /// `Start` and the `started` gimmick check are queued right away and
    /// run on the first updates.
    #[must_use]
    pub fn new(grid: Grid, config: StageConfig, presenter: Box<dyn Presenter>) -> Self {
        Self::with_gimmicks(grid, config, GimmickTable::default(), presenter)
    }

    /// Like [`Stage::new`] with an explicit gimmick table.
    #[must_use]
    pub fn with_gimmicks(
        grid: Grid,
        config: StageConfig,
        gimmicks: GimmickTable,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut stage = Self {
            config,
            grid,
            units: BTreeMap::new(),
            next_unit: 1,
            queue: CommandQueue::new(),
            running: Vec::new(),
            gimmicks,
            presenter,
            rng,
            now_ms: 0,
            turn_cycle: false,
            turn_cursor: None,
            outcome: None,
            terminated: 0,
            events: TickEvents::default(),
        };
        stage.queue.push(CommandKind::Start);
        stage.queue.push(CommandKind::Call(Callback::new(|stage: &mut Self| {
            stage.check_gimmicks(&GimmickEvent::Started);
        })));
        stage
    }

    /// Build a stage from data. Starting units are placed immediately.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidData`] if the data fails validation.
    pub fn from_data(data: &StageData, presenter: Box<dyn Presenter>) -> Result<Self> {
        let errors = data.validate();
        if !errors.is_empty() {
            return Err(GameError::InvalidData(errors.join("; ")));
        }
        let grid = data.map.build_grid()?;
        let gimmicks = GimmickTable::with_overrides(&data.gimmicks);
        let mut stage = Self::with_gimmicks(grid, data.config.clone(), gimmicks, presenter);
        for unit in &data.units {
            stage.spawn(unit)?;
        }
        info!(stage = %data.name, units = stage.units.len(), "Stage built");
        Ok(stage)
    }

    /// Stage tuning.
    #[must_use]
    pub const fn config(&self) -> &StageConfig {
        &self.config
    }

    /// The grid.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Units in id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Ids of present units, sorted.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    /// Stage clock.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// How the stage ended, if it has.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Allied units killed so far.
    #[must_use]
    pub const fn terminated(&self) -> u32 {
        self.terminated
    }

    /// Pending commands.
    #[must_use]
    pub const fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Commands admitted and still running.
    #[must_use]
    pub fn running(&self) -> &[StageCommand] {
        &self.running
    }

    /// Whether the turn cycle is on.
    #[must_use]
    pub const fn is_cycling_turns(&self) -> bool {
        self.turn_cycle
    }

    /// Nothing queued, nothing running, no unit busy.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
            && self.running.is_empty()
            && self.units.values().all(|u| !u.is_undertaking() && u.mover.is_none())
    }

    /// Read-only view handed to brains.
    #[must_use]
    pub fn view(&self) -> StageView<'_> {
        StageView::new(&self.grid, &self.units)
    }

    /// Queue a command. Returns its sequence number.
    pub fn push(&mut self, kind: CommandKind) -> u64 {
        self.queue.push(kind)
    }

    /// Raise a signal on a unit. Ignored for absent units.
    pub fn raise_signal(&mut self, unit: UnitId, signal: Signal) {
        if let Some(u) = self.units.get_mut(&unit) {
            trace!(unit = %unit, ?signal, "signal raised");
            u.signals.raise(signal);
        }
    }

    /// Place a unit on the stage at once, bypassing the queue.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::BlockOutOfBounds`] if the position is off the
    /// grid, or [`GameError::InvalidState`] if another unit holds it.
    pub fn spawn(&mut self, data: &UnitData) -> Result<UnitId> {
        self.appear(data)
    }

    /// First unit (by id) carrying a tag.
    #[must_use]
    pub fn tagged(&self, tag: &str) -> Option<UnitId> {
        self.units.values().find(|u| u.has_tag(tag)).map(|u| u.id)
    }

    /// Advance the stage by `delta_ms`. See the module docs for the order.
    pub fn update(&mut self, delta_ms: u64) -> TickEvents {
        self.now_ms = self.now_ms.saturating_add(delta_ms);

        self.cycle_turns();
        self.schedule();

        for (unit, signal) in self.presenter.advance(delta_ms) {
            self.raise_signal(unit, signal);
        }

        for id in self.sorted_ids() {
            self.update_unit(id, delta_ms);
        }

        std::mem::take(&mut self.events)
    }

    /// Fold this stage's tally into a session.
    pub fn settle(&self, session: &mut Session) {
        session.terminated += self.terminated;
        match self.outcome {
            Some(Outcome::Cleared) => session.cleared += 1,
            Some(Outcome::Missed) => session.continues += 1,
            None => {}
        }
    }

    /// Hash of the rules-relevant state, for determinism checks.
    ///
    /// Built on the standard library's `DefaultHasher`, whose output may
    /// change between Rust releases. Compare hashes only between runs of
    /// the same build.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.now_ms.hash(&mut hasher);
        self.outcome.hash(&mut hasher);
        self.terminated.hash(&mut hasher);
        self.queue.len().hash(&mut hasher);
        for command in &self.running {
            command.seq.hash(&mut hasher);
        }
        for unit in self.units.values() {
            unit.id.hash(&mut hasher);
            unit.seat.hash(&mut hasher);
            unit.walk.hash(&mut hasher);
            unit.position.hash(&mut hasher);
            unit.stats.hash(&mut hasher);
            unit.motion.hash(&mut hasher);
            unit.tasks.queued().hash(&mut hasher);
        }
        for block in self.grid.blocks() {
            block.occupant().map(|o| o.unit).hash(&mut hasher);
        }
        hasher.finish()
    }

    fn alloc_unit_id(&mut self) -> UnitId {
        let id = UnitId::new(self.next_unit);
        self.next_unit += 1;
        id
    }

    /// Round robin over seated units, queued only when nothing else is.
    fn cycle_turns(&mut self) {
        if !self.turn_cycle || self.outcome.is_some() || !self.queue.is_empty() {
            return;
        }
        if self.running.iter().any(|c| matches!(c.kind, CommandKind::Turn(_))) {
            return;
        }
        let seated: Vec<UnitId> = self
            .units
            .values()
            .filter(|u| u.seat.is_some())
            .map(|u| u.id)
            .collect();
        let next = match self.turn_cursor {
            Some(last) => seated.iter().find(|&&id| id > last).or_else(|| seated.first()),
            None => seated.first(),
        };
        if let Some(&unit) = next {
            self.turn_cursor = Some(unit);
            self.queue.push(CommandKind::Turn(unit));
        }
    }
}

