//! Command admission and execution.

use tracing::{debug, info, warn};

use super::{AttackEvent, IssuedCommand, Outcome, Stage};
use crate::brain::{create_brain, Decision, Prompt, StageView, Verdict};
use crate::combat::{predict, roll_damages};
use crate::command::{CommandKind, DisappearReason, StageCommand};
use crate::data::UnitData;
use crate::error::{GameError, Result};
use crate::gimmick::{GimmickCommand, GimmickEvent};
use crate::grid::{Marker, MarkerColor, Point};
use crate::motion::Motion;
use crate::pathfinding::{star_route, vacant_seat_along};
use crate::task::{Task, TaskRunner};
use crate::unit::{Facing, Signals, Unit, UnitId};

/// Marker snapshot taken when travels are highlighted.
const DESTINING: &str = "destining";
/// Marker snapshot taken when a destination and its aimables are shown.
const TARGETING: &str = "targeting";

fn reject(unit: UnitId, reason: impl Into<String>) -> GameError {
    GameError::RejectedInput {
        unit,
        reason: reason.into(),
    }
}

impl Stage {
    /// Prune finished commands and admit at most one new command.
    pub(super) fn schedule(&mut self) {
        let (running, finished): (Vec<_>, Vec<_>) = std::mem::take(&mut self.running)
            .into_iter()
            .partition(|command| self.is_running(command));
        for command in &finished {
            debug!(seq = command.seq, kind = command.kind.name(), "command finished");
            self.events.completed.push(command.seq);
        }
        self.running = running;

        if !self.running.is_empty() {
            let Some(next) = self.queue.peek() else {
                return;
            };
            let (now, interval) = (self.now_ms, self.config.parallel_interval_ms);
            if !self
                .running
                .iter()
                .all(|running| next.can_parallelize(running, now, interval))
            {
                return;
            }
        }

        let Some(mut command) = self.queue.pop() else {
            return;
        };
        command.issued_at = Some(self.now_ms);
        debug!(seq = command.seq, kind = command.kind.name(), now = self.now_ms, "command issued");
        self.run_command(&mut command);
        self.events.issued.push(IssuedCommand {
            seq: command.seq,
            kind: command.kind.name(),
            units: command.kind.units(),
        });
        self.running.push(command);
    }

    /// Whether an issued command still holds its units.
    pub(super) fn is_running(&self, command: &StageCommand) -> bool {
        let busy = |id: &UnitId| self.units.get(id).is_some_and(Unit::is_undertaking);
        match &command.kind {
            CommandKind::Start | CommandKind::Call(_) | CommandKind::Goal | CommandKind::Miss => false,
            CommandKind::Appear { created, .. } => created
                .and_then(|id| self.units.get(&id))
                .is_some_and(|unit| !unit.activated),
            CommandKind::Turn(unit) => self.units.get(unit).is_some_and(Unit::is_deciding),
            CommandKind::Move { unit, .. } => busy(unit),
            CommandKind::Action { thrower, catcher } => busy(thrower) || busy(catcher),
            CommandKind::Disappear { unit, .. } => self.units.contains_key(unit),
        }
    }

    fn run_command(&mut self, command: &mut StageCommand) {
        match &mut command.kind {
            CommandKind::Start => {
                self.turn_cycle = self.config.auto_turns;
                info!(auto_turns = self.turn_cycle, "Stage started");
            }
            CommandKind::Call(callback) => callback.take().invoke(self),
            CommandKind::Appear { data, created } => match self.appear(&**data) {
                Ok(id) => *created = Some(id),
                Err(err) => warn!(%err, "Appear ignored"),
            },
            CommandKind::Turn(unit) => self.run_turn(*unit),
            CommandKind::Move { unit, to } => self.run_move(*unit, *to),
            CommandKind::Action { thrower, catcher } => self.run_action(*thrower, *catcher),
            CommandKind::Disappear { unit, reason } => match reason {
                DisappearReason::Die => self.run_death(*unit),
                DisappearReason::Withdraw => self.withdraw(*unit),
            },
            CommandKind::Goal => self.finish(Outcome::Cleared),
            CommandKind::Miss => self.finish(Outcome::Missed),
        }
    }

    /// Create a unit from data and seat it.
    pub(super) fn appear(&mut self, data: &UnitData) -> Result<UnitId> {
        let block = self
            .grid
            .block(data.pos)
            .ok_or(GameError::BlockOutOfBounds(data.pos))?;
        if let Some(holder) = block.occupant() {
            return Err(GameError::InvalidState(format!(
                "block {} is already held by unit {}",
                data.pos, holder.unit
            )));
        }
        let anchor = block.anchor();

        let id = self.alloc_unit_id();
        let unit = Unit {
            id,
            name: data.name.clone(),
            tags: data.tags.clone(),
            faction: data.faction,
            class: data.class,
            level: data.level,
            stats: data.stats(),
            seat: Some(data.pos),
            walk: data.pos,
            position: anchor,
            facing: data.facing,
            motion: Motion::Wait,
            signals: Signals::default(),
            tasks: TaskRunner::new(),
            mover: None,
            brain: Some(create_brain(data.brain, data.mission.clone())),
            activated: false,
            deciding: None,
        };
        self.grid.set_occupant(unit.occupant(), None, Some(data.pos));
        self.grid.set_render_block(id, None, Some(data.pos));
        self.presenter.set_motion(id, Motion::Wait);
        self.units.insert(id, unit);
        self.events.appeared.push(id);
        info!(unit = %id, name = %data.name, faction = %data.faction, at = %data.pos, "Unit appeared");
        Ok(id)
    }

    fn run_turn(&mut self, id: UnitId) {
        let Some(unit) = self.units.get_mut(&id) else {
            warn!(unit = %id, "Turn for absent unit ignored");
            return;
        };
        let Some(mut brain) = unit.brain.take() else {
            warn!(unit = %id, "Turn for unit without brain ignored");
            return;
        };
        let verdict = {
            let view = StageView::new(&self.grid, &self.units);
            brain.perform(&view, id, &mut self.rng)
        };
        if let Some(unit) = self.units.get_mut(&id) {
            unit.brain = Some(brain);
        }

        match verdict {
            Verdict::Decided(decision) => self.push_decision(id, decision),
            Verdict::AwaitInput(prompt) => self.await_input(id, prompt),
            Verdict::Idle => debug!(unit = %id, "unit idles this turn"),
        }
    }

    fn await_input(&mut self, id: UnitId, prompt: Prompt) {
        let Some(unit) = self.units.get_mut(&id) else {
            return;
        };
        let Some(seat) = unit.seat else {
            return;
        };
        self.grid.set_markers(
            prompt.travels.iter().copied(),
            Marker::Color(MarkerColor::DeepSkyBlue),
        );
        self.grid.save_marker_state(DESTINING);
        self.grid.set_markers([seat], Marker::Unit);
        unit.motion = Motion::Ready;
        unit.deciding = Some(prompt);
        self.presenter.set_motion(id, Motion::Ready);
        debug!(unit = %id, "awaiting input");
    }

    fn push_decision(&mut self, unit: UnitId, decision: Decision) {
        self.queue.push(CommandKind::Move {
            unit,
            to: decision.move_to,
        });
        if let Some(catcher) = decision.target {
            self.queue.push(CommandKind::Action {
                thrower: unit,
                catcher,
            });
        }
    }

    /// Seat the unit at the end of its route at once and queue the walk.
    ///
    /// If the end of the route is held by another unit or cannot be walked
    /// on, the unit stops on the last such block before it.
    fn run_move(&mut self, id: UnitId, to: Point) {
        let Some(unit) = self.units.get_mut(&id) else {
            warn!(unit = %id, "Move for absent unit ignored");
            return;
        };
        let Some(seat) = unit.seat else {
            warn!(unit = %id, "Move for unseated unit ignored");
            return;
        };
        let occupant = unit.occupant();
        let planned = star_route(&self.grid, seat, to, Some(occupant));
        let (dest, kept) = vacant_seat_along(&self.grid, planned.destination(seat), &planned, occupant);
        let route = planned.prefix(kept);
        if dest != to {
            debug!(unit = %id, %to, %dest, "move stops short");
        }

        self.grid.set_occupant(occupant, Some(seat), Some(dest));
        unit.seat = Some(dest);
        unit.tasks.push(Task::Motion(Motion::Move));
        for &dir in &route {
            unit.tasks.push(Task::Step(dir));
            unit.tasks.push(Task::Ring("step-se".to_owned()));
        }
        unit.tasks.push(Task::Motion(Motion::Wait));
        let faction = unit.faction;
        debug!(unit = %id, route = %route, "move committed");

        self.check_gimmicks(&GimmickEvent::Into { faction, block: dest });
    }

    /// Roll the attack, queue both units' sequences and, when lethal, a
    /// death behind everything already queued.
    fn run_action(&mut self, thrower: UnitId, catcher: UnitId) {
        let (Some(t), Some(c)) = (self.units.get(&thrower), self.units.get(&catcher)) else {
            warn!(%thrower, %catcher, "Action with absent unit ignored");
            return;
        };
        let (Some(thrower_seat), Some(catcher_seat)) = (t.seat, c.seat) else {
            warn!(%thrower, %catcher, "Action with unseated unit ignored");
            return;
        };
        let prediction = predict(t.class, &t.stats, c.class, &c.stats);
        let thrower_class = t.class;
        let catcher_hp = c.stats.hp;
        let damages = roll_damages(&mut self.rng, &prediction, self.config.damage_swing);

        if let (Some(facing), Some(unit)) = (
            Facing::towards(thrower_seat, catcher_seat),
            self.units.get_mut(&thrower),
        ) {
            unit.facing = facing;
        }
        if let (Some(facing), Some(unit)) = (
            Facing::towards(catcher_seat, thrower_seat),
            self.units.get_mut(&catcher),
        ) {
            unit.facing = facing;
        }

        self.queue_attack(thrower, catcher, thrower_class, damages.len());
        self.queue_imminence(catcher, thrower_class, &damages);

        let total: u32 = damages.iter().flatten().sum();
        if catcher_hp <= total {
            self.queue.push(CommandKind::Disappear {
                unit: catcher,
                reason: DisappearReason::Die,
            });
        }
        debug!(%thrower, %catcher, ?damages, hit_rate = prediction.hit_rate, "action rolled");
        self.events.attacks.push(AttackEvent {
            thrower,
            catcher,
            damages,
        });
    }

    fn finish(&mut self, outcome: Outcome) {
        if self.outcome.is_some() {
            debug!(?outcome, "stage already finished");
            return;
        }
        self.outcome = Some(outcome);
        self.turn_cycle = false;
        self.events.outcome = Some(outcome);
        let jingle = match outcome {
            Outcome::Cleared => "clear-jingle",
            Outcome::Missed => "miss-jingle",
        };
        self.presenter.fire_sound(jingle);
        info!(?outcome, at = self.now_ms, "Stage finished");
    }

    /// Report an event to the gimmick table and queue what fires.
    pub(super) fn check_gimmicks(&mut self, event: &GimmickEvent) {
        let units = &self.units;
        let fired = self
            .gimmicks
            .ignite(event, |faction| units.values().filter(|u| u.faction == faction).count());
        for (name, command) in fired {
            self.push_gimmick_command(&name, command);
        }
    }

    /// Fire a gimmick by name regardless of its trigger. Returns whether
    /// it exists.
    pub fn ignite_gimmick(&mut self, name: &str) -> bool {
        match self.gimmicks.ignite_named(name) {
            Some(command) => {
                self.push_gimmick_command(name, command);
                true
            }
            None => false,
        }
    }

    fn push_gimmick_command(&mut self, name: &str, command: GimmickCommand) {
        let kind = match command {
            GimmickCommand::Goal => CommandKind::Goal,
            GimmickCommand::Miss => CommandKind::Miss,
            GimmickCommand::Appear(data) => CommandKind::Appear {
                data: Box::new(data),
                created: None,
            },
            GimmickCommand::Disappear { tag } => {
                let Some(unit) = self.tagged(&tag) else {
                    warn!(gimmick = name, %tag, "No unit carries the tag; gimmick ignored");
                    return;
                };
                CommandKind::Disappear {
                    unit,
                    reason: DisappearReason::Withdraw,
                }
            }
            GimmickCommand::Move { tag, to } => {
                let Some(unit) = self.tagged(&tag) else {
                    warn!(gimmick = name, %tag, "No unit carries the tag; gimmick ignored");
                    return;
                };
                CommandKind::Move { unit, to }
            }
        };
        self.queue.push(kind);
    }

    /// Player decision for a unit awaiting input.
    ///
    /// The destination must be one of the offered travels; a target must be
    /// a hostile unit within range of the destination. On success markers
    /// are cleared and `Move` (plus `Action`) are queued.
    ///
    /// # Errors
    ///
    /// [`GameError::UnitNotFound`] for an unknown unit, otherwise
    /// [`GameError::RejectedInput`] with the reason.
    pub fn submit_decision(&mut self, id: UnitId, decision: Decision) -> Result<()> {
        let unit = self.units.get(&id).ok_or(GameError::UnitNotFound(id))?;
        let Some(prompt) = &unit.deciding else {
            return Err(reject(id, "unit is not awaiting input"));
        };
        if !prompt.travels.contains(&decision.move_to) {
            return Err(reject(id, format!("{} is out of reach", decision.move_to)));
        }
        if let Some(target) = decision.target {
            let target_seat = self
                .units
                .get(&target)
                .filter(|t| t.faction.is_hostile_to(unit.faction))
                .and_then(|t| t.seat)
                .ok_or_else(|| reject(id, format!("{target} is not a hostile unit on the stage")))?;
            if !self.view().aimables(unit, decision.move_to).contains(&target_seat) {
                return Err(reject(id, format!("{target} is out of range")));
            }
        }

        self.grid.clear_markers();
        self.grid.clear_marker_states();
        if let Some(unit) = self.units.get_mut(&id) {
            unit.deciding = None;
        }
        info!(unit = %id, to = %decision.move_to, target = ?decision.target, "Input accepted");
        self.push_decision(id, decision);
        Ok(())
    }

    /// Highlight a tentative destination and the blocks aimable from it.
    /// Returns the hostile units that could be attacked from there.
    ///
    /// # Errors
    ///
    /// Same as [`Stage::submit_decision`].
    pub fn propose_destination(&mut self, id: UnitId, to: Point) -> Result<Vec<UnitId>> {
        let unit = self.units.get(&id).ok_or(GameError::UnitNotFound(id))?;
        let Some(prompt) = &unit.deciding else {
            return Err(reject(id, "unit is not awaiting input"));
        };
        if !prompt.travels.contains(&to) {
            return Err(reject(id, format!("{to} is out of reach")));
        }
        let view = self.view();
        let aimables = view.aimables(unit, to);
        let targets = view.targets_from(unit, to);

        self.grid.restore_marker_state(DESTINING);
        self.grid.set_markers([to], Marker::Color(MarkerColor::White));
        self.grid.set_markers(aimables, Marker::Target);
        self.grid.save_marker_state(TARGETING);
        Ok(targets)
    }

    /// Highlight a tentative target after [`Stage::propose_destination`].
    ///
    /// # Errors
    ///
    /// Same as [`Stage::submit_decision`].
    pub fn propose_target(&mut self, id: UnitId, target: UnitId) -> Result<()> {
        let unit = self.units.get(&id).ok_or(GameError::UnitNotFound(id))?;
        if !unit.is_deciding() {
            return Err(reject(id, "unit is not awaiting input"));
        }
        let seat = self
            .units
            .get(&target)
            .filter(|t| t.faction.is_hostile_to(unit.faction))
            .and_then(|t| t.seat)
            .ok_or_else(|| reject(id, format!("{target} is not a hostile unit on the stage")))?;
        if !self.grid.restore_marker_state(TARGETING) {
            return Err(reject(id, "no destination proposed yet"));
        }
        self.grid.set_markers([seat], Marker::Color(MarkerColor::Yellow));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::UnitClass;
    use crate::factions::Faction;
    use crate::grid::{Grid, IMPASSABLE, NORMAL_COST};
    use crate::presenter::TimelinePresenter;
    use crate::stage::StageConfig;

    fn quiet_stage(width: u32, height: u32) -> Stage {
        let config = StageConfig {
            auto_turns: false,
            ..StageConfig::default()
        };
        Stage::new(Grid::new(width, height), config, Box::new(TimelinePresenter::new()))
    }

    fn run(stage: &mut Stage, ticks: usize) {
        for _ in 0..ticks {
            stage.update(50);
        }
    }

    #[test]
    fn test_start_and_started_check_run_first() {
        let mut stage = quiet_stage(4, 4);
        assert_eq!(stage.queue().len(), 2);
        let first = stage.update(16);
        assert_eq!(first.issued[0].kind, "start");
        let second = stage.update(16);
        assert_eq!(second.issued[0].kind, "call");
        assert!(!stage.is_cycling_turns());
    }

    #[test]
    fn test_move_seats_immediately_and_walks_later() {
        let mut stage = quiet_stage(6, 1);
        let id = stage
            .spawn(&UnitData::new("a", Faction::Ally, UnitClass::Close, Point::new(0, 0)))
            .expect("free block");
        run(&mut stage, 2);
        stage.push(CommandKind::Move {
            unit: id,
            to: Point::new(3, 0),
        });
        stage.update(50);

        let unit = stage.unit(id).expect("present");
        assert_eq!(unit.seat, Some(Point::new(3, 0)));
        assert_ne!(unit.walk, Point::new(3, 0));
        assert_eq!(stage.grid().occupant(Point::new(3, 0)).map(|o| o.unit), Some(id));
        assert!(stage.grid().occupant(Point::new(0, 0)).is_none());

        run(&mut stage, 40);
        let unit = stage.unit(id).expect("present");
        assert_eq!(unit.walk, Point::new(3, 0));
        assert!(!unit.is_undertaking());
        assert!(stage.grid().block(Point::new(3, 0)).expect("in grid").render_units().contains(&id));
    }

    #[test]
    fn test_move_backs_off_held_destination() {
        let mut stage = quiet_stage(6, 1);
        let mover = stage
            .spawn(&UnitData::new("a", Faction::Ally, UnitClass::Close, Point::new(0, 0)))
            .expect("free block");
        stage
            .spawn(&UnitData::new("b", Faction::Ally, UnitClass::Close, Point::new(3, 0)))
            .expect("free block");
        run(&mut stage, 2);
        stage.push(CommandKind::Move {
            unit: mover,
            to: Point::new(3, 0),
        });
        stage.update(50);
        assert_eq!(stage.unit(mover).and_then(|u| u.seat), Some(Point::new(2, 0)));
    }

    #[test]
    fn test_move_never_seats_on_impassable_block() {
        let grid = Grid::from_costs(3, 1, &[NORMAL_COST, IMPASSABLE, NORMAL_COST]).expect("valid costs");
        let config = StageConfig {
            auto_turns: false,
            ..StageConfig::default()
        };
        let mut stage = Stage::new(grid, config, Box::new(TimelinePresenter::new()));
        let id = stage
            .spawn(&UnitData::new("a", Faction::Ally, UnitClass::Close, Point::new(0, 0)))
            .expect("free block");
        run(&mut stage, 2);
        stage.push(CommandKind::Move {
            unit: id,
            to: Point::new(1, 0),
        });
        run(&mut stage, 40);

        let unit = stage.unit(id).expect("present");
        assert_eq!(unit.seat, Some(Point::new(0, 0)));
        assert_eq!(unit.walk, Point::new(0, 0));
        assert!(stage.grid().occupant(Point::new(1, 0)).is_none());
        assert_eq!(stage.grid().occupant(Point::new(0, 0)).map(|o| o.unit), Some(id));
    }

    #[test]
    fn test_action_on_absent_catcher_is_noop() {
        let mut stage = quiet_stage(4, 1);
        let id = stage
            .spawn(&UnitData::new("a", Faction::Ally, UnitClass::Mid, Point::new(0, 0)))
            .expect("free block");
        run(&mut stage, 2);
        stage.push(CommandKind::Action {
            thrower: id,
            catcher: UnitId::new(99),
        });
        let events = stage.update(50);
        assert_eq!(events.issued[0].kind, "action");
        assert!(events.attacks.is_empty());
        assert!(!stage.unit(id).expect("present").is_undertaking());
    }

    #[test]
    fn test_spawn_rejects_held_and_outside_blocks() {
        let mut stage = quiet_stage(2, 2);
        let data = UnitData::new("a", Faction::Ally, UnitClass::Mid, Point::new(1, 1));
        stage.spawn(&data).expect("free block");
        assert!(matches!(stage.spawn(&data), Err(GameError::InvalidState(_))));
        let outside = UnitData::new("b", Faction::Ally, UnitClass::Mid, Point::new(5, 1));
        assert!(matches!(stage.spawn(&outside), Err(GameError::BlockOutOfBounds(_))));
    }

    #[test]
    fn test_goal_fires_jingle_once() {
        let presenter = TimelinePresenter::new();
        let journal = presenter.journal();
        let mut stage = Stage::new(Grid::new(2, 2), StageConfig::default(), Box::new(presenter));
        stage.push(CommandKind::Goal);
        stage.push(CommandKind::Miss);
        run(&mut stage, 6);
        assert_eq!(stage.outcome(), Some(Outcome::Cleared));
        assert!(journal.has_sound("clear-jingle"));
        assert!(!journal.has_sound("miss-jingle"));
        assert!(!stage.is_cycling_turns());
    }
}
