//! The effect sink between the core and whatever draws it.
//!
//! The stage never renders or plays anything itself. It forwards opaque
//! requests to a [`Presenter`] and learns when motions reach their cues
//! through [`Presenter::advance`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::grid::Point;
use crate::motion::Motion;
use crate::unit::{Signal, UnitId};
use crate::walker::Progression;

/// Receiver of visual and audio requests.
pub trait Presenter: fmt::Debug {
    /// Show an effect over a unit standing at `at`.
    fn fire_effect(&mut self, unit: UnitId, effect: &str, at: Point);

    /// Play a sound.
    fn fire_sound(&mut self, sound: &str);

    /// Switch a unit's motion. Any cues still pending for the unit's
    /// previous motion are abandoned.
    fn set_motion(&mut self, unit: UnitId, motion: Motion);

    /// Pop a damage number (or a miss when `None`) over a unit.
    fn pop_value(&mut self, unit: UnitId, value: Option<u32>, sequence: usize);

    /// Shake the screen.
    fn vibrate(&mut self, shock: &str);

    /// Advance presentation time and report the signals now due.
    fn advance(&mut self, elapsed_ms: u64) -> Vec<(UnitId, Signal)>;

    /// The unit left the stage.
    fn forget(&mut self, _unit: UnitId) {}
}

/// A request recorded by [`TimelinePresenter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PresentedEvent {
    /// [`Presenter::fire_effect`].
    Effect {
        /// Unit the effect is attached to.
        unit: UnitId,
        /// Effect name.
        effect: String,
        /// Block it was fired at.
        at: Point,
    },
    /// [`Presenter::fire_sound`].
    Sound {
        /// Sound name.
        sound: String,
    },
    /// [`Presenter::set_motion`].
    Motion {
        /// Unit.
        unit: UnitId,
        /// Motion name.
        motion: String,
    },
    /// [`Presenter::pop_value`].
    Value {
        /// Unit.
        unit: UnitId,
        /// Damage, `None` for a miss.
        value: Option<u32>,
        /// Shot index.
        sequence: usize,
    },
    /// [`Presenter::vibrate`].
    Vibrate {
        /// Shock name.
        shock: String,
    },
}

/// Shared view of the events a [`TimelinePresenter`] has recorded.
///
/// Cloning is cheap; every clone sees the same list.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<PresentedEvent>>>);

impl Journal {
    fn record(&self, event: PresentedEvent) {
        self.0.borrow_mut().push(event);
    }

    /// Copy of every event so far.
    #[must_use]
    pub fn events(&self) -> Vec<PresentedEvent> {
        self.0.borrow().clone()
    }

    /// Number of events so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// True when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Whether a sound was played.
    #[must_use]
    pub fn has_sound(&self, sound: &str) -> bool {
        self.0
            .borrow()
            .iter()
            .any(|e| matches!(e, PresentedEvent::Sound { sound: s } if s == sound))
    }

    /// Forget recorded events.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Cue schedule of one unit's current motion.
#[derive(Debug, Clone)]
struct Timeline {
    motion: Motion,
    elapsed_ms: u64,
    next_cue: usize,
}

impl Timeline {
    const fn new(motion: Motion) -> Self {
        Self {
            motion,
            elapsed_ms: 0,
            next_cue: 0,
        }
    }

    fn due(&mut self) -> Vec<Signal> {
        let cues = self.motion.cues();
        let mut signals = Vec::new();
        while let Some(cue) = cues.get(self.next_cue) {
            if cue.at_ms > self.elapsed_ms {
                break;
            }
            signals.push(cue.signal);
            self.next_cue += 1;
        }
        signals
    }
}

impl Progression for Timeline {
    fn advance(&mut self, elapsed_ms: u64) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(elapsed_ms);
    }

    fn is_finished(&self) -> bool {
        self.next_cue >= self.motion.cues().len()
    }
}

/// Headless presenter: records every request and raises motion signals on
/// the fixed timeline of [`Motion::cues`].
#[derive(Debug, Default)]
pub struct TimelinePresenter {
    timelines: BTreeMap<UnitId, Timeline>,
    journal: Journal,
}

impl TimelinePresenter {
    /// New presenter with an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the recorded events.
    #[must_use]
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Whether any unit still has cues pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.timelines.values().all(Progression::is_finished)
    }
}

impl Presenter for TimelinePresenter {
    fn fire_effect(&mut self, unit: UnitId, effect: &str, at: Point) {
        self.journal.record(PresentedEvent::Effect {
            unit,
            effect: effect.to_owned(),
            at,
        });
    }

    fn fire_sound(&mut self, sound: &str) {
        self.journal.record(PresentedEvent::Sound {
            sound: sound.to_owned(),
        });
    }

    fn set_motion(&mut self, unit: UnitId, motion: Motion) {
        self.timelines.insert(unit, Timeline::new(motion));
        self.journal.record(PresentedEvent::Motion {
            unit,
            motion: motion.name(),
        });
    }

    fn pop_value(&mut self, unit: UnitId, value: Option<u32>, sequence: usize) {
        self.journal.record(PresentedEvent::Value { unit, value, sequence });
    }

    fn vibrate(&mut self, shock: &str) {
        self.journal.record(PresentedEvent::Vibrate {
            shock: shock.to_owned(),
        });
    }

    fn advance(&mut self, elapsed_ms: u64) -> Vec<(UnitId, Signal)> {
        let mut raised = Vec::new();
        for (&unit, timeline) in &mut self.timelines {
            timeline.advance(elapsed_ms);
            raised.extend(timeline.due().into_iter().map(|signal| (unit, signal)));
        }
        raised
    }

    fn forget(&mut self, unit: UnitId) {
        self.timelines.remove(&unit);
    }
}
