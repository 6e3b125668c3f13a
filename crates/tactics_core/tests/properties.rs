//! Property tests for grid, pathfinding and hit prediction.

use proptest::prelude::*;
use tactics_core::combat::{predict, UnitClass};
use tactics_core::factions::Faction;
use tactics_core::grid::{Grid, Locomotion, Occupant, Point};
use tactics_core::pathfinding::{reachable_set, star_route};
use tactics_core::unit::UnitId;
use tactics_test_utils::determinism::strategies::{arb_class, arb_cost_grid, arb_stats};

fn build((width, height, costs): (u32, u32, Vec<u32>)) -> Grid {
    Grid::from_costs(width, height, &costs).expect("strategy yields matching costs")
}

fn ally() -> Occupant {
    Occupant::new(UnitId::new(1), Faction::Ally)
}

proptest! {
    #[test]
    fn prop_shoot_cost_is_one(layout in arb_cost_grid(8)) {
        let grid = build(layout);
        for block in grid.blocks() {
            prop_assert_eq!(block.cost(Locomotion::Shoot), 1);
        }
    }

    #[test]
    fn prop_reachable_keeps_start_with_full_legs(
        layout in arb_cost_grid(8),
        sx in 0i32..8,
        sy in 0i32..8,
        legs in 0u32..800,
    ) {
        let grid = build(layout);
        let start = Point::new(sx % grid.width() as i32, sy % grid.height() as i32);
        let travels = reachable_set(&grid, start, legs, Some(ally()));
        prop_assert_eq!(travels.remaining(start), Some(legs));
        for (point, left) in travels.iter() {
            prop_assert!(left <= legs);
            prop_assert!(grid.in_bounds(point));
        }
    }

    #[test]
    fn prop_route_to_self_is_empty(layout in arb_cost_grid(8), x in 0i32..8, y in 0i32..8) {
        let grid = build(layout);
        let p = Point::new(x % grid.width() as i32, y % grid.height() as i32);
        prop_assert!(star_route(&grid, p, p, Some(ally())).is_empty());
    }

    #[test]
    fn prop_route_never_crosses_enemy(
        layout in arb_cost_grid(8),
        foes in proptest::collection::vec((0i32..8, 0i32..8), 0..6),
        from in (0i32..8, 0i32..8),
        to in (0i32..8, 0i32..8),
    ) {
        let mut grid = build(layout);
        let (w, h) = (grid.width() as i32, grid.height() as i32);
        let start = Point::new(from.0 % w, from.1 % h);
        let goal = Point::new(to.0 % w, to.1 % h);
        for (i, (x, y)) in foes.into_iter().enumerate() {
            let at = Point::new(x % w, y % h);
            if at != start && grid.occupant(at).is_none() {
                let foe = Occupant::new(UnitId::new(100 + i as u32), Faction::Foe);
                grid.set_occupant(foe, None, Some(at));
            }
        }

        let route = star_route(&grid, start, goal, Some(ally()));
        let mut focus = start;
        for (n, &dir) in route.iter().enumerate() {
            focus = focus + dir.offset();
            prop_assert!(grid.in_bounds(focus));
            let last = n + 1 == route.len();
            if !(last && focus == goal) {
                prop_assert!(
                    grid.occupant(focus).map_or(true, |o| o.faction == Faction::Ally),
                    "route {} steps onto an enemy at {}", route, focus
                );
            }
        }
    }

    #[test]
    fn prop_block_lookup_round_trips(w in 1u32..12, h in 1u32..12, x in -3i32..15, y in -3i32..15) {
        let grid = Grid::new(w, h);
        match grid.block_at(x, y) {
            Some(block) => prop_assert_eq!(block.point(), Point::new(x, y)),
            None => prop_assert!(!grid.in_bounds(Point::new(x, y))),
        }
    }

    #[test]
    fn prop_hit_and_evade_sum_to_one(
        tc in arb_class(),
        cc in arb_class(),
        thrower in arb_stats(),
        catcher in arb_stats(),
    ) {
        prop_assume!(catcher.avoidance > 0);
        let p = predict(tc, &thrower, cc, &catcher);
        prop_assert!((p.hit_rate + p.evade_rate - 1.0).abs() < 1e-9);
        prop_assert!((0.0..=1.0).contains(&p.hit_rate));
    }
}

#[test]
fn test_matchup_applies_to_prediction() {
    let stats = tactics_core::unit::Stats::for_class(UnitClass::Close, 1);
    let long = tactics_core::unit::Stats::for_class(UnitClass::Long, 1);
    let against_long = predict(UnitClass::Close, &stats, UnitClass::Long, &long);
    let against_close = predict(UnitClass::Close, &stats, UnitClass::Close, &long);
    assert!(against_long.damage > against_close.damage);
}
