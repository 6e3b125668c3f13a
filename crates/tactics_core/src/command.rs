//! Stage commands and the two-band command queue.
//!
//! Commands are game-level intents. The queue only orders them; admitting a
//! command and running it is the stage's job (see [`crate::stage`]).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::data::UnitData;
use crate::grid::Point;
use crate::task::Callback;
use crate::unit::UnitId;

/// Why a unit leaves the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisappearReason {
    /// Killed: plays the death sequence first.
    Die,
    /// Removed by script: leaves at once.
    Withdraw,
}

/// What a command does.
#[derive(Debug)]
pub enum CommandKind {
    /// Enable the turn cycle. Interrupt.
    Start,
    /// Run a callback against the stage. Interrupt.
    Call(Callback),
    /// Create a unit. `created` is filled in when the command runs.
    Appear {
        /// Unit definition.
        data: Box<UnitData>,
        /// The unit created, once run.
        created: Option<UnitId>,
    },
    /// Let a unit's brain decide.
    Turn(UnitId),
    /// Walk a unit to a block.
    Move {
        /// Walker.
        unit: UnitId,
        /// Destination.
        to: Point,
    },
    /// One unit attacks another.
    Action {
        /// Attacker.
        thrower: UnitId,
        /// Target.
        catcher: UnitId,
    },
    /// Remove a unit.
    Disappear {
        /// Unit leaving.
        unit: UnitId,
        /// Reason.
        reason: DisappearReason,
    },
    /// The stage is cleared.
    Goal,
    /// The stage is lost.
    Miss,
}

impl CommandKind {
    /// Short kind name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Call(_) => "call",
            Self::Appear { .. } => "appear",
            Self::Turn(_) => "turn",
            Self::Move { .. } => "move",
            Self::Action { .. } => "action",
            Self::Disappear { .. } => "disappear",
            Self::Goal => "goal",
            Self::Miss => "miss",
        }
    }

    /// Whether the kind goes in the interrupt band.
    #[must_use]
    pub const fn is_interrupt(&self) -> bool {
        matches!(self, Self::Start | Self::Call(_))
    }

    /// Units this command acts on, when it takes part in parallel
    /// scheduling. `None` for kinds that never run alongside anything.
    #[must_use]
    pub fn doing_units(&self) -> Option<Vec<UnitId>> {
        match *self {
            Self::Turn(unit) | Self::Move { unit, .. } | Self::Disappear { unit, .. } => Some(vec![unit]),
            Self::Action { thrower, catcher } => Some(vec![thrower, catcher]),
            _ => None,
        }
    }

    /// Every unit the command references.
    #[must_use]
    pub fn units(&self) -> Vec<UnitId> {
        match self {
            Self::Appear { created, .. } => created.iter().copied().collect(),
            other => other.doing_units().unwrap_or_default(),
        }
    }
}

/// A command with its queue identity and issue time.
#[derive(Debug)]
pub struct StageCommand {
    /// Insertion order, unique per stage.
    pub seq: u64,
    /// Payload.
    pub kind: CommandKind,
    /// Stage clock when the command was run.
    pub issued_at: Option<u64>,
}

impl StageCommand {
    /// Whether this command may start while `running` is still running.
    ///
    /// Refused until `interval_ms` has passed since `running` was issued.
    /// After that, both commands must act on units, and on disjoint sets of
    /// them.
    #[must_use]
    pub fn can_parallelize(&self, running: &Self, now_ms: u64, interval_ms: u64) -> bool {
        if let Some(issued) = running.issued_at {
            if now_ms < issued.saturating_add(interval_ms) {
                return false;
            }
        }
        let (Some(own), Some(theirs)) = (self.kind.doing_units(), running.kind.doing_units()) else {
            return false;
        };
        own.iter().all(|unit| !theirs.contains(unit))
    }
}

/// Pending commands in two bands.
///
/// Interrupts always come out before the waitlist; each band is FIFO.
#[derive(Debug, Default)]
pub struct CommandQueue {
    interrupts: VecDeque<StageCommand>,
    waitlist: VecDeque<StageCommand>,
    next_seq: u64,
}

impl CommandQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command in the band its kind belongs to. Returns its
    /// sequence number.
    pub fn push(&mut self, kind: CommandKind) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        trace!(seq, kind = kind.name(), "command queued");
        let band = if kind.is_interrupt() {
            &mut self.interrupts
        } else {
            &mut self.waitlist
        };
        band.push_back(StageCommand {
            seq,
            kind,
            issued_at: None,
        });
        seq
    }

    /// The command that would come out next.
    #[must_use]
    pub fn peek(&self) -> Option<&StageCommand> {
        self.interrupts.front().or_else(|| self.waitlist.front())
    }

    /// Remove and return the next command.
    pub fn pop(&mut self) -> Option<StageCommand> {
        self.interrupts.pop_front().or_else(|| self.waitlist.pop_front())
    }

    /// True when both bands are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interrupts.is_empty() && self.waitlist.is_empty()
    }

    /// Commands in both bands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interrupts.len() + self.waitlist.len()
    }

    /// Commands in dequeue order.
    pub fn iter(&self) -> impl Iterator<Item = &StageCommand> {
        self.interrupts.iter().chain(self.waitlist.iter())
    }

    /// Drop every pending command.
    pub fn clear(&mut self) {
        self.interrupts.clear();
        self.waitlist.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> UnitId {
        UnitId::new(n)
    }

    fn issued(kind: CommandKind, at: u64) -> StageCommand {
        StageCommand {
            seq: 0,
            kind,
            issued_at: Some(at),
        }
    }

    fn queued(kind: CommandKind) -> StageCommand {
        StageCommand {
            seq: 1,
            kind,
            issued_at: None,
        }
    }

    #[test]
    fn test_interrupts_jump_the_waitlist() {
        let mut queue = CommandQueue::new();
        queue.push(CommandKind::Turn(id(1)));
        queue.push(CommandKind::Goal);
        queue.push(CommandKind::Start);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek().map(|c| c.kind.name()), Some("start"));
        let order: Vec<_> = std::iter::from_fn(|| queue.pop()).map(|c| c.seq).collect();
        assert_eq!(order, vec![2, 0, 1]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_parallel_needs_interval() {
        let running = issued(CommandKind::Move { unit: id(1), to: Point::new(0, 0) }, 1000);
        let next = queued(CommandKind::Move { unit: id(2), to: Point::new(1, 1) });
        assert!(!next.can_parallelize(&running, 1199, 200));
        assert!(next.can_parallelize(&running, 1200, 200));
    }

    #[test]
    fn test_parallel_needs_disjoint_units() {
        let running = issued(CommandKind::Action { thrower: id(1), catcher: id(2) }, 0);
        let overlap = queued(CommandKind::Move { unit: id(2), to: Point::new(0, 0) });
        let apart = queued(CommandKind::Disappear {
            unit: id(3),
            reason: DisappearReason::Die,
        });
        assert!(!overlap.can_parallelize(&running, 5000, 200));
        assert!(apart.can_parallelize(&running, 5000, 200));
    }

    #[test]
    fn test_control_kinds_never_parallelize() {
        let running = issued(CommandKind::Move { unit: id(1), to: Point::new(0, 0) }, 0);
        assert!(!queued(CommandKind::Goal).can_parallelize(&running, 5000, 200));
        let appear_running = issued(CommandKind::Goal, 0);
        let mv = queued(CommandKind::Move { unit: id(2), to: Point::new(0, 0) });
        assert!(!mv.can_parallelize(&appear_running, 5000, 200));
    }

    #[test]
    fn test_units_of_kinds() {
        assert_eq!(CommandKind::Action { thrower: id(4), catcher: id(2) }.units(), vec![id(4), id(2)]);
        assert!(CommandKind::Start.units().is_empty());
        assert_eq!(CommandKind::Turn(id(9)).units(), vec![id(9)]);
    }
}
