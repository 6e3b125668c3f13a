//! Per-unit task execution and the task sequences commands queue.

use tracing::{debug, info, trace, warn};

use super::Stage;
use crate::combat::UnitClass;
use crate::factions::Faction;
use crate::gimmick::GimmickEvent;
use crate::motion::Motion;
use crate::task::{Callback, Pending, Task};
use crate::unit::{Facing, Signal, Stat, UnitId};
use crate::walker::{Progression, StepMover};

impl Stage {
    /// Activate the unit, advance its step and run every task that can
    /// complete this tick.
    pub(super) fn update_unit(&mut self, id: UnitId, delta_ms: u64) {
        let Some(unit) = self.units.get_mut(&id) else {
            return;
        };
        unit.activated = true;
        if let Some(mover) = unit.mover.as_mut() {
            mover.advance(delta_ms);
            unit.position = mover.position();
            if mover.is_finished() {
                unit.mover = None;
            }
        }
        self.drain_tasks(id);
    }

    fn drain_tasks(&mut self, id: UnitId) {
        loop {
            let Some(unit) = self.units.get_mut(&id) else {
                return;
            };
            let stepping = unit.mover.is_some();
            if !unit.tasks.settle(&mut unit.signals, stepping) {
                return;
            }
            let Some(task) = unit.tasks.next_task() else {
                return;
            };
            trace!(unit = %id, task = task.kind(), "task started");
            self.run_task(id, task);
        }
    }

    fn run_task(&mut self, id: UnitId, task: Task) {
        let Some(unit) = self.units.get_mut(&id) else {
            return;
        };
        match task {
            Task::Step(dir) => {
                let from = unit.walk;
                let to = from + dir.offset();
                let Some(block) = self.grid.block(to) else {
                    panic!("unit {id} stepped off the grid from {from} to {to}");
                };
                unit.mover = Some(StepMover::new(
                    self.config.step_walker,
                    unit.position,
                    block.anchor(),
                    self.config.step_duration_ms,
                ));
                if let Some(facing) = Facing::towards(from, to) {
                    unit.facing = facing;
                }
                unit.walk = to;
                unit.tasks.hold(Pending::Step);
                self.grid.set_render_block(id, Some(from), Some(to));
            }
            Task::Voila(effect) => self.presenter.fire_effect(id, &effect, unit.walk),
            Task::Ring(sound) => self.presenter.fire_sound(&sound),
            Task::Spec { stat, delta } => unit.stats.adjust(stat, delta),
            Task::Motion(motion) => {
                unit.motion = motion;
                self.presenter.set_motion(id, motion);
            }
            Task::Wait(signal) => unit.tasks.hold(Pending::Wait(signal)),
            Task::Kick(callback) => callback.invoke(self),
            Task::Valpop { value, sequence } => self.presenter.pop_value(id, value, sequence),
        }
    }

    /// Thrower side of an attack: charge, one impact per shot, discharge.
    ///
    /// Each impact raises [`Signal::ImminenceImpacted`] on the catcher.
    pub(super) fn queue_attack(&mut self, thrower: UnitId, catcher: UnitId, class: UnitClass, shots: usize) {
        let Some(unit) = self.units.get_mut(&thrower) else {
            return;
        };
        let tasks = &mut unit.tasks;
        tasks.push(Task::Motion(Motion::AttackCharge(class)));
        tasks.push(Task::Wait(Signal::MotionRounded));
        for _ in 0..shots {
            tasks.push(Task::Motion(Motion::AttackImpact(class)));
            tasks.push(Task::Ring(format!("{}-se", class.attack_effect())));
            tasks.push(Task::Wait(Signal::AttackImpacted));
            tasks.push(Task::Kick(Callback::new(move |stage: &mut Self| {
                stage.raise_signal(catcher, Signal::ImminenceImpacted);
            })));
            tasks.push(Task::Voila(class.attack_effect().to_owned()));
            tasks.push(Task::Wait(Signal::MotionRounded));
        }
        tasks.push(Task::Motion(Motion::AttackDischarge(class)));
        tasks.push(Task::Wait(Signal::MotionRounded));
        tasks.push(Task::Motion(Motion::Wait));
    }

    /// Catcher side of an attack: one reaction per shot.
    pub(super) fn queue_imminence(&mut self, catcher: UnitId, thrower_class: UnitClass, damages: &[Option<u32>]) {
        let Some(unit) = self.units.get_mut(&catcher) else {
            return;
        };
        let shock = match (thrower_class, unit.facing) {
            (UnitClass::Close, Facing::Left) => "slash-back",
            _ => thrower_class.shock(),
        };
        let tasks = &mut unit.tasks;
        tasks.push(Task::Motion(Motion::Imminence));
        for (sequence, damage) in damages.iter().copied().enumerate() {
            tasks.push(Task::Wait(Signal::ImminenceImpacted));
            tasks.push(Task::Voila(thrower_class.impact_effect().to_owned()));
            match damage {
                Some(amount) => {
                    tasks.push(Task::Motion(Motion::Damage));
                    tasks.push(Task::Ring(thrower_class.hit_sound().to_owned()));
                    tasks.push(Task::Spec {
                        stat: Stat::Hp,
                        delta: -i32::try_from(amount).unwrap_or(i32::MAX),
                    });
                    tasks.push(Task::Valpop {
                        value: Some(amount),
                        sequence,
                    });
                    tasks.push(Task::Kick(Callback::new(move |stage: &mut Self| {
                        stage.presenter.vibrate(shock);
                    })));
                }
                None => {
                    tasks.push(Task::Motion(Motion::Evade));
                    tasks.push(Task::Valpop { value: None, sequence });
                }
            }
        }
        tasks.push(Task::Wait(Signal::MotionRounded));
        tasks.push(Task::Motion(Motion::Wait));
    }

    /// Unseat a dying unit and queue its death sequence. The unit leaves
    /// the stage when the sequence ends.
    pub(super) fn run_death(&mut self, id: UnitId) {
        let Some(unit) = self.units.get_mut(&id) else {
            warn!(unit = %id, "Death of absent unit ignored");
            return;
        };
        let Some(seat) = unit.seat.take() else {
            debug!(unit = %id, "unit is already leaving");
            return;
        };
        if unit.faction == Faction::Ally {
            self.terminated += 1;
        }
        self.grid.set_occupant(unit.occupant(), Some(seat), None);
        unit.tasks.push(Task::Voila("death".to_owned()));
        unit.tasks.push(Task::Ring("death-se".to_owned()));
        unit.tasks.push(Task::Motion(Motion::Die));
        unit.tasks.push(Task::Wait(Signal::MotionRounded));
        unit.tasks.push(Task::Kick(Callback::new(move |stage: &mut Self| {
            stage.withdraw(id);
        })));
        info!(unit = %id, name = %unit.name, "Unit defeated");
    }

    /// Remove a unit from the stage and report it to the gimmicks.
    pub(super) fn withdraw(&mut self, id: UnitId) {
        let Some(unit) = self.units.remove(&id) else {
            warn!(unit = %id, "Withdraw of absent unit ignored");
            return;
        };
        if let Some(seat) = unit.seat {
            self.grid.set_occupant(unit.occupant(), Some(seat), None);
        }
        self.grid.set_render_block(id, Some(unit.walk), None);
        if unit.is_deciding() {
            self.grid.clear_markers();
            self.grid.clear_marker_states();
        }
        self.presenter.forget(id);
        self.events.withdrawn.push(id);
        info!(unit = %id, name = %unit.name, "Unit withdrew");
        self.check_gimmicks(&GimmickEvent::Withdraw { tags: unit.tags });
    }
}
