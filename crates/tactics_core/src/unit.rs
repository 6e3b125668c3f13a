//! Units: identity, stat bag, signals and per-unit runtime state.
//!
//! A unit has two positions. The *seat* is the block it holds for rules
//! purposes (zone of control, targeting) and changes the moment a move is
//! committed. The *walk* block is where it is drawn and trails the seat
//! while step tasks play out.

use serde::{Deserialize, Serialize};

use crate::brain::{Brain, Prompt};
use crate::combat::UnitClass;
use crate::factions::Faction;
use crate::grid::{Occupant, Point};
use crate::math::Vec2Fixed;
use crate::motion::Motion;
use crate::task::TaskRunner;
use crate::walker::StepMover;

/// Unique identifier for units on a stage.
///
/// Allocated in appearance order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Create a unit ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Names of mutable stats, used by stat-mutation tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    /// Hit points.
    Hp,
    /// Attack power.
    Attack,
    /// Number of independent checks per shot.
    Accuracy,
    /// Evasion; a check succeeds with probability `1 / avoidance`.
    Avoidance,
    /// Movement allowance.
    Legs,
    /// Attack range in blocks.
    Range,
    /// Shots per attack.
    Shots,
}

/// Stat growth per level above 1, compounded.
const LEVEL_GROWTH: f64 = 0.03;

/// A unit's stat bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stats {
    /// Movement allowance in walk-cost units.
    pub legs: u32,
    /// Attack range in blocks.
    pub range: u32,
    /// Shots per attack.
    pub shots: u32,
    /// Number of independent hit checks per shot.
    pub accuracy: u32,
    /// Evasion.
    pub avoidance: u32,
    /// Attack power.
    pub attack: u32,
    /// Current hit points.
    pub hp: u32,
    /// Hit points at appearance.
    pub hp_max: u32,
}

impl Stats {
    /// Default stats for a class at a level.
    ///
    /// Accuracy, avoidance, attack and hp grow 3% per level above 1,
    /// compounded and floored. Level 0 is treated as level 1.
    #[must_use]
    pub fn for_class(class: UnitClass, level: u32) -> Self {
        let (legs, range, shots, accuracy, avoidance, attack, hp) = match class {
            UnitClass::Close => (300, 1, 2, 20, 25, 35, 80),
            UnitClass::Mid => (200, 4, 4, 40, 10, 35, 120),
            UnitClass::Long => (100, 6, 1, 10, 5, 45, 140),
        };
        let growth = (1.0 + LEVEL_GROWTH).powi(level.max(1) as i32 - 1);
        let grow = |base: u32| (f64::from(base) * growth).floor() as u32;
        let hp = grow(hp);
        Self {
            legs,
            range,
            shots,
            accuracy: grow(accuracy),
            avoidance: grow(avoidance),
            attack: grow(attack),
            hp,
            hp_max: hp,
        }
    }

    /// Overwrite stats named in `overrides`. `hp_max` follows `hp`.
    pub fn apply(&mut self, overrides: &StatOverrides) {
        let StatOverrides {
            legs,
            range,
            shots,
            accuracy,
            avoidance,
            attack,
            hp,
        } = *overrides;
        self.legs = legs.unwrap_or(self.legs);
        self.range = range.unwrap_or(self.range);
        self.shots = shots.unwrap_or(self.shots);
        self.accuracy = accuracy.unwrap_or(self.accuracy);
        self.avoidance = avoidance.unwrap_or(self.avoidance);
        self.attack = attack.unwrap_or(self.attack);
        if let Some(hp) = hp {
            self.hp = hp;
            self.hp_max = hp;
        }
    }

    /// Current value of a stat.
    #[must_use]
    pub const fn get(&self, stat: Stat) -> u32 {
        match stat {
            Stat::Hp => self.hp,
            Stat::Attack => self.attack,
            Stat::Accuracy => self.accuracy,
            Stat::Avoidance => self.avoidance,
            Stat::Legs => self.legs,
            Stat::Range => self.range,
            Stat::Shots => self.shots,
        }
    }

    /// Add `delta` to a stat, saturating at zero.
    pub fn adjust(&mut self, stat: Stat, delta: i32) {
        let slot = match stat {
            Stat::Hp => &mut self.hp,
            Stat::Attack => &mut self.attack,
            Stat::Accuracy => &mut self.accuracy,
            Stat::Avoidance => &mut self.avoidance,
            Stat::Legs => &mut self.legs,
            Stat::Range => &mut self.range,
            Stat::Shots => &mut self.shots,
        };
        *slot = slot.saturating_add_signed(delta);
    }
}

/// Optional per-unit stat overrides from stage data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatOverrides {
    /// Movement allowance.
    pub legs: Option<u32>,
    /// Attack range.
    pub range: Option<u32>,
    /// Shots per attack.
    pub shots: Option<u32>,
    /// Accuracy.
    pub accuracy: Option<u32>,
    /// Avoidance.
    pub avoidance: Option<u32>,
    /// Attack power.
    pub attack: Option<u32>,
    /// Hit points (also sets the maximum).
    pub hp: Option<u32>,
}

/// Named flags raised by the presenter when a motion reaches a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    /// The current motion finished a round.
    MotionRounded,
    /// The attacker's blow connected.
    AttackImpacted,
    /// The blow reached this unit.
    ImminenceImpacted,
}

impl Signal {
    const fn slot(self) -> usize {
        match self {
            Self::MotionRounded => 0,
            Self::AttackImpacted => 1,
            Self::ImminenceImpacted => 2,
        }
    }
}

/// Edge-triggered signal flags of one unit.
///
/// Raising an already raised signal has no further effect; a wait consumes
/// the flag with [`Signals::take`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals([bool; 3]);

impl Signals {
    /// Raise a signal.
    pub fn raise(&mut self, signal: Signal) {
        self.0[signal.slot()] = true;
    }

    /// Read and clear a signal in one step.
    pub fn take(&mut self, signal: Signal) -> bool {
        std::mem::take(&mut self.0[signal.slot()])
    }

    /// Whether a signal is raised, without consuming it.
    #[must_use]
    pub const fn is_raised(&self, signal: Signal) -> bool {
        self.0[signal.slot()]
    }
}

/// Horizontal facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Looking towards column 0.
    #[default]
    Left,
    /// Looking away from column 0.
    Right,
}

impl Facing {
    /// Facing towards `to` when looking from `from`, if they differ in x.
    #[must_use]
    pub fn towards(from: Point, to: Point) -> Option<Self> {
        match to.x.cmp(&from.x) {
            std::cmp::Ordering::Greater => Some(Self::Right),
            std::cmp::Ordering::Less => Some(Self::Left),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// A unit on a stage.
#[derive(Debug)]
pub struct Unit {
    /// Identifier.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// Free-form tags used by gimmicks and missions.
    pub tags: Vec<String>,
    /// Side.
    pub faction: Faction,
    /// Combat class.
    pub class: UnitClass,
    /// Level the stats were derived for.
    pub level: u32,
    /// Stat bag.
    pub stats: Stats,
    /// Logical block, `None` once the unit starts dying.
    pub seat: Option<Point>,
    /// Block the unit is drawn on.
    pub walk: Point,
    /// Render-space position (bottom-centre of the sprite).
    pub position: Vec2Fixed,
    /// Facing.
    pub facing: Facing,
    /// Current motion.
    pub motion: Motion,
    /// Signal flags.
    pub signals: Signals,
    /// Per-unit task queue.
    pub tasks: TaskRunner,
    /// Active step animation.
    pub mover: Option<StepMover>,
    /// Decision logic. Taken out while it runs.
    pub brain: Option<Box<dyn Brain>>,
    /// Whether the unit has been through one update pass.
    pub activated: bool,
    /// Pending player prompt while waiting for input.
    pub deciding: Option<Prompt>,
}

impl Unit {
    /// This unit as seen by the grid.
    #[must_use]
    pub const fn occupant(&self) -> Occupant {
        Occupant::new(self.id, self.faction)
    }

    /// Whether the unit carries a tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether the unit's task queue still has work.
    #[must_use]
    pub fn is_undertaking(&self) -> bool {
        self.tasks.is_busy()
    }

    /// Whether the unit is waiting on its decision logic.
    #[must_use]
    pub const fn is_deciding(&self) -> bool {
        self.deciding.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_one_defaults() {
        let close = Stats::for_class(UnitClass::Close, 1);
        assert_eq!((close.legs, close.range, close.shots), (300, 1, 2));
        assert_eq!((close.accuracy, close.avoidance, close.attack, close.hp), (20, 25, 35, 80));
        assert_eq!(close.hp_max, 80);

        let long = Stats::for_class(UnitClass::Long, 1);
        assert_eq!((long.legs, long.range, long.shots), (100, 6, 1));
    }

    #[test]
    fn test_level_growth_is_compounded_and_floored() {
        let mid = Stats::for_class(UnitClass::Mid, 3);
        // 120 * 1.03^2 = 127.308
        assert_eq!(mid.hp, 127);
        // 35 * 1.0609 = 37.13
        assert_eq!(mid.attack, 37);
        assert_eq!(mid.legs, 200);
    }

    #[test]
    fn test_overrides_win() {
        let mut stats = Stats::for_class(UnitClass::Close, 1);
        stats.apply(&StatOverrides {
            hp: Some(10),
            attack: Some(99),
            ..StatOverrides::default()
        });
        assert_eq!(stats.hp, 10);
        assert_eq!(stats.hp_max, 10);
        assert_eq!(stats.attack, 99);
        assert_eq!(stats.shots, 2);
    }

    #[test]
    fn test_adjust_saturates() {
        let mut stats = Stats::for_class(UnitClass::Close, 1);
        stats.adjust(Stat::Hp, -30);
        assert_eq!(stats.get(Stat::Hp), 50);
        stats.adjust(Stat::Hp, -500);
        assert_eq!(stats.get(Stat::Hp), 0);
        stats.adjust(Stat::Attack, 5);
        assert_eq!(stats.get(Stat::Attack), 40);
    }

    #[test]
    fn test_signals_are_edge_triggered() {
        let mut signals = Signals::default();
        signals.raise(Signal::MotionRounded);
        signals.raise(Signal::MotionRounded);
        assert!(signals.is_raised(Signal::MotionRounded));
        assert!(signals.take(Signal::MotionRounded));
        assert!(!signals.take(Signal::MotionRounded));
        assert!(!signals.is_raised(Signal::AttackImpacted));
    }

    #[test]
    fn test_facing_towards() {
        let a = Point::new(2, 2);
        assert_eq!(Facing::towards(a, Point::new(5, 0)), Some(Facing::Right));
        assert_eq!(Facing::towards(a, Point::new(0, 9)), Some(Facing::Left));
        assert_eq!(Facing::towards(a, Point::new(2, 9)), None);
    }
}
