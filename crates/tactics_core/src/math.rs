//! Fixed-point math for render-space positions.
//!
//! Logical state lives on the integer grid. Positions used to animate units
//! between blocks are fixed-point so that walking a route produces the same
//! in-between positions on every platform.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for render-space math.
///
/// 32 integer bits and 32 fractional bits.
pub type Fixed = I32F32;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vec2Fixed {
    /// X coordinate.
    pub x: Fixed,
    /// Y coordinate.
    pub y: Fixed,
}

impl Vec2Fixed {
    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer components.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Manhattan length of the difference between two vectors.
    #[must_use]
    pub fn manhattan_distance(self, other: Self) -> Fixed {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Progress curve applied to a linear `[0, 1]` progress value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Easing {
    /// Progress is used as-is.
    #[default]
    Linear,
    /// Quadratic ease-in: slow start, fast finish.
    EaseIn,
}

impl Easing {
    /// Apply the curve. Input is clamped to `[0, 1]`.
    #[must_use]
    pub fn apply(self, progress: Fixed) -> Fixed {
        let t = progress.clamp(Fixed::ZERO, Fixed::ONE);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
        }
    }
}

/// Ratio `elapsed / duration` clamped to `[0, 1]`.
///
/// A zero duration is treated as already complete.
#[must_use]
pub fn progress_ratio(elapsed_ms: u64, duration_ms: u64) -> Fixed {
    if duration_ms == 0 || elapsed_ms >= duration_ms {
        return Fixed::ONE;
    }
    Fixed::from_num(elapsed_ms) / Fixed::from_num(duration_ms)
}
