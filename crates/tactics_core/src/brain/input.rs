//! Player-controlled brain.

use rand_chacha::ChaCha8Rng;

use super::{Brain, BrainKind, Prompt, StageView, Verdict};
use crate::unit::UnitId;

/// Asks the player. The stage highlights the offered travels and waits for
/// [`crate::stage::Stage::submit_decision`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InputBrain;

impl Brain for InputBrain {
    fn perform(&mut self, view: &StageView<'_>, me: UnitId, _rng: &mut ChaCha8Rng) -> Verdict {
        match view.unit(me) {
            Some(unit) if unit.seat.is_some() => Verdict::AwaitInput(Prompt {
                travels: view.travels(unit),
            }),
            _ => Verdict::Idle,
        }
    }

    fn kind(&self) -> BrainKind {
        BrainKind::Input
    }
}
