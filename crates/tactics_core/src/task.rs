//! Per-unit task queue.
//!
//! Commands unroll into tasks. A unit runs its tasks strictly one at a
//! time: side-effect tasks finish the moment they run, `Step` holds the
//! queue until the step mover finishes, and `Wait` holds it until the named
//! signal is taken. Execution itself lives on the stage, which owns the
//! grid and presenter the tasks act on; this module owns ordering and the
//! running state.

use std::collections::VecDeque;
use std::fmt;

use crate::motion::Motion;
use crate::pathfinding::Direction;
use crate::stage::Stage;
use crate::unit::{Signal, Signals, Stat};

/// A one-shot closure run against the stage.
///
/// Invoking a callback that was already taken does nothing.
#[derive(Default)]
pub struct Callback(Option<Box<dyn FnOnce(&mut Stage)>>);

impl Callback {
    /// Wrap a closure.
    pub fn new(f: impl FnOnce(&mut Stage) + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// Move the closure out, leaving an empty callback behind.
    pub fn take(&mut self) -> Self {
        Self(self.0.take())
    }

    /// Run the closure, consuming it.
    pub fn invoke(self, stage: &mut Stage) {
        if let Some(f) = self.0 {
            f(stage);
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.is_some() { "Callback(..)" } else { "Callback(taken)" })
    }
}

/// One atomic sub-step of a command.
#[derive(Debug)]
pub enum Task {
    /// Walk one block in a direction. Running until the mover finishes.
    Step(Direction),
    /// Fire a visual effect at the unit.
    Voila(String),
    /// Play a sound.
    Ring(String),
    /// Add `delta` to a stat.
    Spec {
        /// Stat to change.
        stat: Stat,
        /// Signed change.
        delta: i32,
    },
    /// Request a motion from the presenter.
    Motion(Motion),
    /// Hold the queue until the signal is raised, then consume it.
    Wait(Signal),
    /// Run a callback.
    Kick(Callback),
    /// Pop a damage value over the unit. `None` is a miss.
    Valpop {
        /// Damage shown.
        value: Option<u32>,
        /// Shot index, used to stagger popups.
        sequence: usize,
    },
}

impl Task {
    /// Short kind name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Step(_) => "step",
            Self::Voila(_) => "voila",
            Self::Ring(_) => "ring",
            Self::Spec { .. } => "spec",
            Self::Motion(_) => "motion",
            Self::Wait(_) => "wait",
            Self::Kick(_) => "kick",
            Self::Valpop { .. } => "valpop",
        }
    }
}

/// A task that started but has not finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    /// A step whose mover is still attached.
    Step,
    /// A wait on a signal.
    Wait(Signal),
}

/// FIFO of tasks plus the one in flight.
#[derive(Debug, Default)]
pub struct TaskRunner {
    queue: VecDeque<Task>,
    current: Option<Pending>,
}

impl TaskRunner {
    /// Empty runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task.
    pub fn push(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    /// Busy exactly while a task is in flight or queued.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.current.is_some() || !self.queue.is_empty()
    }

    /// Tasks not yet started.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// The task in flight.
    #[must_use]
    pub const fn pending(&self) -> Option<Pending> {
        self.current
    }

    /// Try to finish the task in flight.
    ///
    /// A wait completes by taking its signal; a step completes once the
    /// unit no longer has a mover. Returns whether the runner is free to
    /// start the next task.
    pub fn settle(&mut self, signals: &mut Signals, stepping: bool) -> bool {
        let done = match self.current {
            None => true,
            Some(Pending::Wait(signal)) => signals.take(signal),
            Some(Pending::Step) => !stepping,
        };
        if done {
            self.current = None;
        }
        done
    }

    /// Take the next task to run. `None` while one is in flight.
    pub fn next_task(&mut self) -> Option<Task> {
        if self.current.is_some() {
            return None;
        }
        self.queue.pop_front()
    }

    /// Mark a task as in flight.
    pub fn hold(&mut self, pending: Pending) {
        self.current = Some(pending);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut runner = TaskRunner::new();
        runner.push(Task::Ring("a".into()));
        runner.push(Task::Motion(Motion::Move));
        assert_eq!(runner.next_task().map(|t| t.kind()), Some("ring"));
        assert_eq!(runner.next_task().map(|t| t.kind()), Some("motion"));
        assert!(runner.next_task().is_none());
        assert!(!runner.is_busy());
    }

    #[test]
    fn test_wait_is_edge_triggered() {
        let mut runner = TaskRunner::new();
        let mut signals = Signals::default();
        runner.hold(Pending::Wait(Signal::MotionRounded));
        runner.push(Task::Wait(Signal::MotionRounded));
        assert!(!runner.settle(&mut signals, false));

        // Raised twice before being seen: counts once.
        signals.raise(Signal::MotionRounded);
        signals.raise(Signal::MotionRounded);
        assert!(runner.settle(&mut signals, false));

        let Some(Task::Wait(signal)) = runner.next_task() else {
            panic!("expected the second wait");
        };
        runner.hold(Pending::Wait(signal));
        assert!(!runner.settle(&mut signals, false));
        assert!(runner.is_busy());
    }

    #[test]
    fn test_step_holds_while_stepping() {
        let mut runner = TaskRunner::new();
        let mut signals = Signals::default();
        runner.hold(Pending::Step);
        runner.push(Task::Ring("after".into()));
        assert!(runner.next_task().is_none());
        assert!(!runner.settle(&mut signals, true));
        assert!(runner.settle(&mut signals, false));
        assert!(runner.next_task().is_some());
    }

    #[test]
    fn test_clear_frees_runner() {
        let mut runner = TaskRunner::new();
        runner.hold(Pending::Step);
        runner.push(Task::Ring("x".into()));
        runner.clear();
        assert!(!runner.is_busy());
        assert_eq!(runner.queued(), 0);
    }
}
