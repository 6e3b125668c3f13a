//! Weighted-heuristic brain for computer-controlled units.
//!
//! Deciding happens in two stages. First an *intent* is chosen: attack one
//! of the enemies, or escort a leader when the unit has a mission. Then the
//! intent is turned into a concrete move (and maybe an attack) by scoring
//! every block the unit can reach.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::{heaviest, Brain, BrainKind, Decision, StageView, Verdict};
use crate::grid::{Point, NORMAL_COST};
use crate::pathfinding::{move_cost, search_vacant_seat, star_route, trace_path, Route};
use crate::unit::{Unit, UnitId};

/// Scale of the attack animus: expected share of the target's max hp.
const ANIMUS_SCALE: f64 = 3700.0;

/// Fixed weight of a follow intent.
const FOLLOW_WEIGHT: f64 = 3000.0;

/// Random hate added to an animus, as a fraction of it.
const HATE_SWING: f64 = 0.1;

/// Enemies closer than this to an escorted leader pull the escort.
const ESCORT_RADIUS: u32 = 8;

#[derive(Debug)]
enum Intent<'a> {
    Attack { target: &'a Unit, route: Route },
    Follow { leader: &'a Unit },
}

/// Brain driven by attack animus and an optional escort mission.
#[derive(Debug, Clone, Default)]
pub struct AutoBrain {
    mission: Option<String>,
}

impl AutoBrain {
    /// Brain escorting the unit tagged `mission`, if any.
    #[must_use]
    pub const fn new(mission: Option<String>) -> Self {
        Self { mission }
    }

    /// Tag of the escorted leader.
    #[must_use]
    pub fn mission(&self) -> Option<&str> {
        self.mission.as_deref()
    }

    /// Desire of `me` to attack `target`.
    ///
    /// Expected damage as a share of the target's max hp, scaled. With a
    /// route, divided by the turns wasted walking into range; a target that
    /// can never be brought into range scores 0. Seeded noise of up to 10%
    /// either way stands in for hate.
    fn think_animus(
        view: &StageView<'_>,
        me: &Unit,
        target: &Unit,
        route: Option<&Route>,
        rng: &mut ChaCha8Rng,
    ) -> f64 {
        let p = view.predict(me, target);
        let mut weight = p.hit_rate * f64::from(p.damage) * f64::from(p.shots)
            / f64::from(target.stats.hp_max.max(1))
            * ANIMUS_SCALE;

        if let Some(route) = route {
            let Some(turns) = Self::capture_turns(view, me, target, route) else {
                return 0.0;
            };
            let wasted = turns.saturating_sub(1);
            weight /= f64::from(wasted + 1);
        }

        let hate = (weight * rng.gen_range(-HATE_SWING..HATE_SWING)).floor();
        weight + hate
    }

    /// Turns of walking along `route` until `target` is within range.
    /// `None` when the route stops making progress first.
    fn capture_turns(view: &StageView<'_>, me: &Unit, target: &Unit, route: &Route) -> Option<u32> {
        let (Some(mut focus), Some(goal)) = (me.seat, target.seat) else {
            return None;
        };
        let mut route = route.clone();
        let mut turns = 0;
        while me.stats.range < goal.manhattan(focus) {
            let (reached, taken) = trace_path(
                view.grid(),
                focus,
                &route,
                Some(me.occupant()),
                Some(me.stats.legs),
            );
            if taken == 0 {
                return None;
            }
            turns += 1;
            focus = reached;
            route = route.skip(taken);
        }
        Some(turns)
    }

    fn fix_attack_doing(
        view: &StageView<'_>,
        me: &Unit,
        target: &Unit,
        route: &Route,
        travels: &[Point],
        rng: &mut ChaCha8Rng,
    ) -> Option<Decision> {
        let (seat, target_seat) = (me.seat?, target.seat?);

        // Attack from as far away as the range allows.
        let in_range = travels.iter().filter_map(|&p| {
            let distance = target_seat.manhattan(p);
            (distance <= me.stats.range).then_some((
                Decision {
                    move_to: p,
                    target: Some(target.id),
                },
                f64::from(distance),
            ))
        });
        let in_range: Vec<_> = in_range.collect();
        if !in_range.is_empty() {
            return heaviest(in_range);
        }

        // Out of reach this turn: close in and take any shot on the way.
        let occupant = me.occupant();
        let (reached, taken) = trace_path(view.grid(), seat, route, Some(occupant), Some(me.stats.legs));
        let moveto = search_vacant_seat(view.grid(), reached, &route.prefix(taken), occupant);

        let mut doings = vec![(
            Decision {
                move_to: moveto,
                target: None,
            },
            0.0,
        )];
        doings.extend(Self::attacking_at(view, me, moveto, rng));
        heaviest(doings)
    }

    fn fix_follow_doing(
        view: &StageView<'_>,
        me: &Unit,
        leader: &Unit,
        travels: &[Point],
        rng: &mut ChaCha8Rng,
    ) -> Option<Decision> {
        let leader_seat = leader.seat?;
        let occupant = me.occupant();
        let near_enough = me.stats.legs + NORMAL_COST;

        let moves: Vec<(Point, i64)> = travels
            .iter()
            .map(|&p| {
                let distance = move_cost(view.grid(), p, leader_seat, Some(occupant))
                    .unwrap_or_else(|| p.manhattan(leader_seat) * NORMAL_COST);
                let weight = if distance <= near_enough {
                    0
                } else {
                    -i64::from(distance)
                };
                (p, weight)
            })
            .collect();
        let highest = moves.iter().map(|&(_, w)| w).max()?;

        let threats: Vec<Point> = view
            .seated_hostiles(me)
            .filter_map(|u| u.seat)
            .filter(|s| leader_seat.manhattan(*s) < ESCORT_RADIUS)
            .collect();

        let mut doings = Vec::new();
        for &(p, _) in moves.iter().filter(|&&(_, w)| w == highest) {
            let deduction: f64 = threats.iter().map(|s| -f64::from(s.manhattan(p))).sum();
            doings.push((
                Decision {
                    move_to: p,
                    target: None,
                },
                deduction,
            ));
            doings.extend(Self::attacking_at(view, me, p, rng));
        }
        doings.shuffle(rng);
        heaviest(doings)
    }

    /// Every attack possible from `launchpad`, weighted by animus.
    fn attacking_at(
        view: &StageView<'_>,
        me: &Unit,
        launchpad: Point,
        rng: &mut ChaCha8Rng,
    ) -> Vec<(Decision, f64)> {
        view.targets_from(me, launchpad)
            .into_iter()
            .filter_map(|id| view.unit(id))
            .map(|target| {
                let decision = Decision {
                    move_to: launchpad,
                    target: Some(target.id),
                };
                (decision, Self::think_animus(view, me, target, None, rng))
            })
            .collect()
    }
}

impl Brain for AutoBrain {
    fn perform(&mut self, view: &StageView<'_>, me: UnitId, rng: &mut ChaCha8Rng) -> Verdict {
        let Some(unit) = view.unit(me) else {
            return Verdict::Idle;
        };
        let Some(seat) = unit.seat else {
            return Verdict::Idle;
        };

        let mut intents = Vec::new();
        for enemy in view.seated_hostiles(unit) {
            let Some(enemy_seat) = enemy.seat else {
                continue;
            };
            let route = star_route(view.grid(), seat, enemy_seat, Some(unit.occupant()));
            let animus = Self::think_animus(view, unit, enemy, Some(&route), rng);
            if animus != 0.0 {
                intents.push((Intent::Attack { target: enemy, route }, animus));
            }
        }
        if let Some(leader) = self.mission.as_deref().and_then(|tag| view.tagged(tag)) {
            intents.push((Intent::Follow { leader }, FOLLOW_WEIGHT));
        }

        let Some(intent) = heaviest(intents) else {
            return Verdict::Idle;
        };
        let travels = view.travels(unit);
        let decision = match intent {
            Intent::Attack { target, route } => {
                Self::fix_attack_doing(view, unit, target, &route, &travels, rng)
            }
            Intent::Follow { leader } => Self::fix_follow_doing(view, unit, leader, &travels, rng),
        };

        debug!(unit = %me, ?decision, "auto brain decided");
        decision.map_or(Verdict::Idle, Verdict::Decided)
    }

    fn kind(&self) -> BrainKind {
        BrainKind::Auto
    }
}
