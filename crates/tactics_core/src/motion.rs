//! Unit motions and the signal cues each one promises.
//!
//! A motion is a visual state requested from the presenter. Tasks never wait
//! on the motion itself; they wait on the signals listed here, which any
//! presenter must raise at (or after) the given offsets.

use serde::{Deserialize, Serialize};

use crate::combat::UnitClass;
use crate::unit::Signal;

/// A signal raised `at_ms` after a motion starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cue {
    /// Offset from motion start.
    pub at_ms: u64,
    /// Signal to raise on the unit.
    pub signal: Signal,
}

const fn cue(at_ms: u64, signal: Signal) -> Cue {
    Cue { at_ms, signal }
}

const ROUNDED: Signal = Signal::MotionRounded;
const IMPACTED: Signal = Signal::AttackImpacted;

const CLOSE_CHARGE: &[Cue] = &[cue(350, ROUNDED)];
const CLOSE_IMPACT: &[Cue] = &[cue(100, IMPACTED), cue(350, ROUNDED)];
const CLOSE_DISCHARGE: &[Cue] = &[cue(150, ROUNDED)];
const MID_CHARGE: &[Cue] = &[cue(200, ROUNDED)];
const MID_IMPACT: &[Cue] = &[cue(100, IMPACTED), cue(200, ROUNDED)];
const MID_DISCHARGE: &[Cue] = &[cue(100, ROUNDED)];
const LONG_CHARGE: &[Cue] = &[cue(200, ROUNDED)];
const LONG_IMPACT: &[Cue] = &[cue(0, IMPACTED), cue(400, ROUNDED)];
const LONG_DISCHARGE: &[Cue] = &[cue(0, ROUNDED)];
const EVADE: &[Cue] = &[cue(600, ROUNDED)];
const DAMAGE: &[Cue] = &[cue(801, ROUNDED)];
const DIE: &[Cue] = &[cue(1000, ROUNDED)];

/// Visual state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Motion {
    /// Idle breathing.
    #[default]
    Wait,
    /// Awaiting player orders.
    Ready,
    /// Walking.
    Move,
    /// Wind-up before the first shot.
    AttackCharge(UnitClass),
    /// One shot or blow.
    AttackImpact(UnitClass),
    /// Recovery after the last shot.
    AttackDischarge(UnitClass),
    /// Bracing for incoming shots.
    Imminence,
    /// Dodging a missed shot.
    Evade,
    /// Flinching from a landed shot.
    Damage,
    /// Fading out.
    Die,
}

impl Motion {
    /// Name of the motion, e.g. `attack-mid-impact`.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Wait => "wait".into(),
            Self::Ready => "ready".into(),
            Self::Move => "move".into(),
            Self::AttackCharge(class) => format!("attack-{class}-charge"),
            Self::AttackImpact(class) => format!("attack-{class}-impact"),
            Self::AttackDischarge(class) => format!("attack-{class}-discharge"),
            Self::Imminence => "imminence".into(),
            Self::Evade => "evade".into(),
            Self::Damage => "damage".into(),
            Self::Die => "die".into(),
        }
    }

    /// Signals this motion raises, in time order.
    #[must_use]
    pub const fn cues(&self) -> &'static [Cue] {
        match self {
            Self::Wait | Self::Ready | Self::Move | Self::Imminence => &[],
            Self::AttackCharge(UnitClass::Close) => CLOSE_CHARGE,
            Self::AttackImpact(UnitClass::Close) => CLOSE_IMPACT,
            Self::AttackDischarge(UnitClass::Close) => CLOSE_DISCHARGE,
            Self::AttackCharge(UnitClass::Mid) => MID_CHARGE,
            Self::AttackImpact(UnitClass::Mid) => MID_IMPACT,
            Self::AttackDischarge(UnitClass::Mid) => MID_DISCHARGE,
            Self::AttackCharge(UnitClass::Long) => LONG_CHARGE,
            Self::AttackImpact(UnitClass::Long) => LONG_IMPACT,
            Self::AttackDischarge(UnitClass::Long) => LONG_DISCHARGE,
            Self::Evade => EVADE,
            Self::Damage => DAMAGE,
            Self::Die => DIE,
        }
    }
}

impl std::fmt::Display for Motion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}
