//! Faction definitions.
//!
//! Two sides share a battlefield. Zone of control, targeting and the default
//! stage-clear / stage-miss gimmicks are all keyed on faction.

use serde::{Deserialize, Serialize};

/// Side a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    /// Player-side units.
    Ally,
    /// Opposing units.
    Foe,
}

impl Faction {
    /// Short lowercase name used in logs and reports.
    #[must_use]
    pub const fn short_name(&self) -> &'static str {
        match self {
            Self::Ally => "ally",
            Self::Foe => "foe",
        }
    }

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Ally => Self::Foe,
            Self::Foe => Self::Ally,
        }
    }

    /// Whether two factions are opposed.
    #[must_use]
    pub fn is_hostile_to(self, other: Self) -> bool {
        self != other
    }
}

impl std::fmt::Display for Faction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent_is_symmetric() {
        assert_eq!(Faction::Ally.opponent(), Faction::Foe);
        assert_eq!(Faction::Foe.opponent().opponent(), Faction::Foe);
        assert!(Faction::Ally.is_hostile_to(Faction::Foe));
        assert!(!Faction::Foe.is_hostile_to(Faction::Foe));
    }
}
