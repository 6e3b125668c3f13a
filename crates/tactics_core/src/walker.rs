//! Step animation: walkers and the per-step mover.
//!
//! A [`Walker`] maps progress in `[0, 1]` to an offset along a displacement.
//! A [`StepMover`] drives one walker over a fixed duration and is attached
//! to a unit for the length of a single `Step` task.

use serde::{Deserialize, Serialize};

use crate::math::{progress_ratio, Easing, Fixed, Vec2Fixed};

/// Anything advanced by elapsed time until it finishes.
pub trait Progression {
    /// Advance by `elapsed_ms`.
    fn advance(&mut self, elapsed_ms: u64);

    /// Whether the progression has reached its end.
    fn is_finished(&self) -> bool;
}

/// Shape of a movement between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Walker {
    /// Straight line with an easing curve.
    Line {
        /// Progress curve.
        easing: Easing,
    },
    /// Stays at the origin, then snaps at the end.
    Still,
}

impl Default for Walker {
    fn default() -> Self {
        Self::Line {
            easing: Easing::Linear,
        }
    }
}

impl Walker {
    /// Offset along `displacement` at `progress`.
    #[must_use]
    pub fn walk(&self, displacement: Vec2Fixed, progress: Fixed) -> Vec2Fixed {
        match self {
            Self::Line { easing } => Vec2Fixed::ZERO.lerp(displacement, easing.apply(progress)),
            Self::Still => Vec2Fixed::ZERO,
        }
    }
}

/// Animates a unit across one block.
///
/// The first [`Progression::advance`] after construction only primes the
/// mover; time starts counting on the next one. A step that was attached
/// during a tick is therefore never read as finished in that same tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMover {
    walker: Walker,
    origin: Vec2Fixed,
    dest: Vec2Fixed,
    elapsed_ms: u64,
    duration_ms: u64,
    primed: bool,
}

impl StepMover {
    /// Create a mover from `origin` to `dest` lasting `duration_ms`.
    #[must_use]
    pub const fn new(walker: Walker, origin: Vec2Fixed, dest: Vec2Fixed, duration_ms: u64) -> Self {
        Self {
            walker,
            origin,
            dest,
            elapsed_ms: 0,
            duration_ms,
            primed: false,
        }
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        if self.is_finished() {
            return self.dest;
        }
        let progress = progress_ratio(self.elapsed_ms, self.duration_ms);
        self.origin + self.walker.walk(self.dest - self.origin, progress)
    }

    /// Final position.
    #[must_use]
    pub const fn destination(&self) -> Vec2Fixed {
        self.dest
    }
}

impl Progression for StepMover {
    fn advance(&mut self, elapsed_ms: u64) {
        if !self.primed {
            self.primed = true;
            return;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(elapsed_ms);
    }

    fn is_finished(&self) -> bool {
        self.primed && self.elapsed_ms >= self.duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mover(walker: Walker) -> StepMover {
        StepMover::new(walker, Vec2Fixed::ZERO, Vec2Fixed::from_ints(96, 0), 200)
    }

    #[test]
    fn test_first_advance_only_primes() {
        let mut m = mover(Walker::default());
        m.advance(1000);
        assert!(!m.is_finished());
        assert_eq!(m.position(), Vec2Fixed::ZERO);
        m.advance(200);
        assert!(m.is_finished());
        assert_eq!(m.position(), Vec2Fixed::from_ints(96, 0));
    }

    #[test]
    fn test_zero_duration_finishes_after_priming() {
        let mut m = StepMover::new(Walker::default(), Vec2Fixed::ZERO, Vec2Fixed::from_ints(0, 96), 0);
        assert!(!m.is_finished());
        m.advance(0);
        assert!(m.is_finished());
    }

    #[test]
    fn test_line_halfway() {
        let mut m = mover(Walker::default());
        m.advance(0);
        m.advance(100);
        assert_eq!(m.position(), Vec2Fixed::from_ints(48, 0));
    }

    #[test]
    fn test_ease_in_lags_linear() {
        let mut m = mover(Walker::Line {
            easing: Easing::EaseIn,
        });
        m.advance(0);
        m.advance(100);
        assert_eq!(m.position(), Vec2Fixed::from_ints(24, 0));
    }

    #[test]
    fn test_still_snaps_on_finish() {
        let mut m = mover(Walker::Still);
        m.advance(0);
        m.advance(199);
        assert_eq!(m.position(), Vec2Fixed::ZERO);
        m.advance(1);
        assert_eq!(m.position(), m.destination());
    }
}
