//! Counters that outlive a single stage.

use serde::{Deserialize, Serialize};

/// Tally carried across stages of one play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    /// Allied units killed.
    pub terminated: u32,
    /// Stages lost and retried.
    pub continues: u32,
    /// Stages cleared.
    pub cleared: u32,
}

impl Session {
    /// Empty tally.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;
    use crate::grid::Grid;
    use crate::presenter::TimelinePresenter;
    use crate::stage::{Stage, StageConfig};

    #[test]
    fn test_settle_counts_outcomes() {
        let mut session = Session::new();
        for kind in [CommandKind::Goal, CommandKind::Miss] {
            let mut stage = Stage::new(Grid::new(2, 2), StageConfig::default(), Box::new(TimelinePresenter::new()));
            stage.push(kind);
            for _ in 0..4 {
                stage.update(50);
            }
            stage.settle(&mut session);
        }
        assert_eq!(session.cleared, 1);
        assert_eq!(session.continues, 1);
        assert_eq!(session.terminated, 0);

        session.reset();
        assert_eq!(session, Session::default());
    }

    #[test]
    fn test_unfinished_stage_settles_nothing() {
        let mut session = Session::new();
        let stage = Stage::new(Grid::new(2, 2), StageConfig::default(), Box::new(TimelinePresenter::new()));
        stage.settle(&mut session);
        assert_eq!(session, Session::default());
    }
}
