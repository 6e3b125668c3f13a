//! Hit prediction and damage rolls.
//!
//! Prediction is a pure function of two stat bags and two classes. Rolling
//! turns a prediction into per-shot outcomes using the stage's seeded RNG.
//!
//! Probabilities are `f64`: they are only ever compared against a uniform
//! draw from a seeded generator, so the outcome is still reproducible.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::unit::Stats;

/// Combat role of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitClass {
    /// Melee: fast, two strikes, range 1.
    Close,
    /// Rifle: four shots at medium range.
    Mid,
    /// Artillery: one heavy shell at long range.
    Long,
}

impl UnitClass {
    /// Lowercase name used in motion names and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Mid => "mid",
            Self::Long => "long",
        }
    }

    /// Effect fired at the attacker on each shot.
    #[must_use]
    pub const fn attack_effect(self) -> &'static str {
        match self {
            Self::Close => "swordlag",
            Self::Mid => "gunfire",
            Self::Long => "cannonfire",
        }
    }

    /// Effect fired at the target on each shot from this class.
    #[must_use]
    pub const fn impact_effect(self) -> &'static str {
        match self {
            Self::Close => "slash",
            Self::Mid => "shoteye",
            Self::Long => "explosion",
        }
    }

    /// Sound of a landed hit from this class.
    #[must_use]
    pub const fn hit_sound(self) -> &'static str {
        match self {
            Self::Close => "punch-middle2",
            Self::Mid => "ricochets1",
            Self::Long => "bomb1",
        }
    }

    /// Screen shake requested when a hit from this class lands.
    #[must_use]
    pub const fn shock(self) -> &'static str {
        match self {
            Self::Close => "slash",
            Self::Mid => "gunshock",
            Self::Long => "cannonshock",
        }
    }
}

impl std::fmt::Display for UnitClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Damage multiplier for an attacker class against a defender class.
///
/// Only two ordered pairs are tuned; everything else is 1.0.
#[must_use]
pub const fn matchup_multiplier(attacker: UnitClass, defender: UnitClass) -> f64 {
    match (attacker, defender) {
        (UnitClass::Close, UnitClass::Long) => 2.70,
        (UnitClass::Long, UnitClass::Mid) => 1.65,
        _ => 1.0,
    }
}

/// Expected outcome of one attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Probability that a single shot hits.
    pub hit_rate: f64,
    /// Probability that a single shot misses.
    pub evade_rate: f64,
    /// Damage of one landed shot before the random swing.
    pub damage: u32,
    /// Shots fired.
    pub shots: u32,
}

impl Prediction {
    /// Mean total damage over all shots.
    #[must_use]
    pub fn expected_damage(&self) -> f64 {
        self.hit_rate * f64::from(self.damage) * f64::from(self.shots)
    }
}

/// Predict an attack.
///
/// A shot is evaded only if all `accuracy` independent checks miss, each
/// succeeding with probability `1 / avoidance`. Zero avoidance never
/// evades. Damage per shot is `ceil(attack × matchup / shots)`.
#[must_use]
pub fn predict(
    thrower_class: UnitClass,
    thrower: &Stats,
    catcher_class: UnitClass,
    catcher: &Stats,
) -> Prediction {
    let evade_rate = if catcher.avoidance == 0 {
        0.0
    } else {
        let miss_once = 1.0 - 1.0 / f64::from(catcher.avoidance);
        miss_once.powf(f64::from(thrower.accuracy))
    };

    let shots = thrower.shots.max(1);
    let raw = f64::from(thrower.attack) * matchup_multiplier(thrower_class, catcher_class);
    let damage = (raw / f64::from(shots)).ceil() as u32;

    Prediction {
        hit_rate: 1.0 - evade_rate,
        evade_rate,
        damage,
        shots,
    }
}

/// Apply a symmetric random swing of at most `swing` (fraction) to a value
/// and round up.
pub fn swing_damage<R: Rng + ?Sized>(rng: &mut R, damage: u32, swing: f64) -> u32 {
    let factor = if swing > 0.0 {
        1.0 + rng.gen_range(-swing..=swing)
    } else {
        1.0
    };
    (f64::from(damage) * factor).ceil().max(0.0) as u32
}

/// Roll every shot of an attack. `None` is a miss.
pub fn roll_damages<R: Rng + ?Sized>(rng: &mut R, prediction: &Prediction, swing: f64) -> Vec<Option<u32>> {
    (0..prediction.shots)
        .map(|_| {
            let roll: f64 = rng.gen();
            (roll < prediction.hit_rate).then(|| swing_damage(rng, prediction.damage, swing))
        })
        .collect()
}
