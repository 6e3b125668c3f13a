//! End-to-end stage scenarios.

use std::collections::BTreeSet;

use tactics_core::combat::UnitClass;
use tactics_core::command::CommandKind;
use tactics_core::grid::{Grid, Occupant, Point};
use tactics_core::pathfinding::{path_cost, reachable_set, star_route, Direction};
use tactics_core::stage::Outcome;
use tactics_core::unit::UnitId;
use tactics_test_utils::fixtures::{
    ally, auto_config, foe, grid_from_rows, manual_config, single_shot, unevasive, StageDriver,
};

fn id(n: u32) -> UnitId {
    UnitId::new(n)
}

#[test]
fn test_lethal_action_removes_defender() {
    let mut attacker = ally("attacker", UnitClass::Close, 0, 0);
    attacker.stats = single_shot(20);
    let mut defender = foe("defender", UnitClass::Close, 1, 0);
    defender.stats = unevasive(10);

    let mut driver = StageDriver::new(grid_from_rows(&["...."]), manual_config(3), &[attacker, defender]);
    assert!(driver.run_until_idle(10));

    driver.stage_mut().push(CommandKind::Action {
        thrower: id(1),
        catcher: id(2),
    });
    assert!(driver.run_until_idle(500));

    assert!(driver.stage().unit(id(2)).is_none());
    assert!(driver.stage().grid().occupant(Point::new(1, 0)).is_none());
    let kinds = driver.issued_kinds();
    let action = kinds.iter().position(|k| *k == "action").expect("action issued");
    let disappear = kinds.iter().position(|k| *k == "disappear").expect("disappear issued");
    assert!(action < disappear);
    assert_eq!(driver.stage().outcome(), Some(Outcome::Cleared));
}

#[test]
fn test_reachable_diamond_minus_enemy_block() {
    let grid = Grid::new(9, 9);
    let start = Point::new(4, 4);
    let mover = Occupant::new(id(1), tactics_core::factions::Faction::Ally);

    let open = reachable_set(&grid, start, 300, Some(mover));
    assert_eq!(open.len(), 13);
    assert_eq!(open.remaining(start), Some(300));
    assert!(open.points().all(|p| p.manhattan(start) <= 3));

    let mut driver = StageDriver::new(
        Grid::new(9, 9),
        manual_config(0),
        &[ally("walker", UnitClass::Close, 4, 4), foe("guard", UnitClass::Long, 4, 1)],
    );
    assert!(driver.run_until_idle(10));
    let stage = driver.stage();
    let me = stage.unit(id(1)).expect("present");
    let travels = stage.view().travels(me);
    assert_eq!(travels.len(), 12);
    assert!(!travels.contains(&Point::new(4, 1)));
}

#[test]
fn test_second_move_of_same_unit_waits() {
    let mut driver = StageDriver::new(grid_from_rows(&["......"]), manual_config(0), &[ally("a", UnitClass::Close, 0, 0)]);
    assert!(driver.run_until_idle(10));

    let first = driver.stage_mut().push(CommandKind::Move {
        unit: id(1),
        to: Point::new(3, 0),
    });
    let second = driver.stage_mut().push(CommandKind::Move {
        unit: id(1),
        to: Point::new(5, 0),
    });

    let mut first_done_at = None;
    let mut second_issued_at = None;
    for tick in 0..200 {
        let events = driver.tick().clone();
        if events.completed.contains(&first) {
            first_done_at = Some(tick);
        }
        if events.issued.iter().any(|c| c.seq == second) {
            second_issued_at = Some(tick);
        }
        let stage = driver.stage();
        if second_issued_at.is_none() && tick > 0 {
            assert_eq!(stage.queue().len(), 1, "second move left the queue early");
        }
        if second_issued_at.is_some() && stage.is_idle() {
            break;
        }
    }

    let (done, issued) = (first_done_at.expect("first move finished"), second_issued_at.expect("second move issued"));
    assert!(done <= issued);
    assert_eq!(driver.stage().unit(id(1)).and_then(|u| u.seat), Some(Point::new(5, 0)));
}

#[test]
fn test_disjoint_moves_overlap_after_interval() {
    let mut driver = StageDriver::new(
        grid_from_rows(&["......", "......"]),
        manual_config(0),
        &[ally("a", UnitClass::Close, 0, 0), ally("b", UnitClass::Close, 0, 1)],
    );
    assert!(driver.run_until_idle(10));
    driver.stage_mut().push(CommandKind::Move {
        unit: id(1),
        to: Point::new(3, 0),
    });
    driver.stage_mut().push(CommandKind::Move {
        unit: id(2),
        to: Point::new(3, 1),
    });

    let mut overlapped = false;
    for _ in 0..100 {
        let events = driver.tick().clone();
        let stage = driver.stage();
        if stage.running().len() == 2 {
            overlapped = true;
            let issued: Vec<u64> = stage.running().iter().filter_map(|c| c.issued_at).collect();
            assert!(issued[1] >= issued[0] + stage.config().parallel_interval_ms);
        }
        assert!(events.issued.len() <= 1);
        if stage.is_idle() {
            break;
        }
    }
    assert!(overlapped);
}

#[test]
fn test_walled_goal_yields_closest_approach() {
    let grid = grid_from_rows(&[".....", "...#.", "..#.#", "...#.", "....."]);
    let start = Point::new(0, 0);
    let goal = Point::new(3, 2);

    let route = star_route(&grid, start, goal, None);
    let end = route.destination(start);
    assert_ne!(end, goal);
    assert_eq!(end.manhattan(goal), 2);
    assert!(path_cost(&grid, start, &route, None).is_some());

    let wall = Direction::ALL
        .into_iter()
        .find(|d| grid.block(end + d.offset()).is_some_and(|b| b.is_impassable()))
        .expect("closest approach borders the wall");
    let mut extended = route.clone();
    extended.push(wall);
    assert_eq!(path_cost(&grid, start, &extended, None), None);
}

#[test]
fn test_running_commands_never_share_units() {
    let units = [
        ally("a", UnitClass::Close, 0, 0),
        ally("b", UnitClass::Mid, 0, 2),
        ally("c", UnitClass::Long, 1, 4),
        foe("x", UnitClass::Close, 7, 0),
        foe("y", UnitClass::Mid, 7, 3),
    ];
    let grid = grid_from_rows(&["........", "...#....", "...#....", "........", "........"]);
    let mut driver = StageDriver::new(grid, auto_config(21), &units);

    for _ in 0..3000 {
        driver.tick();
        let stage = driver.stage();
        let mut seen = BTreeSet::new();
        for command in stage.running() {
            for unit in command.kind.doing_units().unwrap_or_default() {
                assert!(seen.insert(unit), "unit {unit} is driven by two running commands");
            }
        }
        if stage.outcome().is_some() {
            break;
        }
    }
}

#[test]
fn test_duel_reaches_an_outcome() {
    let mut driver = StageDriver::new(
        grid_from_rows(&["......", "......", "......"]),
        auto_config(5),
        &[ally("a", UnitClass::Close, 0, 1), foe("x", UnitClass::Close, 5, 1)],
    );
    let outcome = driver.run_until_outcome(50_000).expect("duel ends");
    let survivors: Vec<_> = driver.stage().units().map(|u| u.faction).collect();
    assert_eq!(survivors.len(), 1);
    match outcome {
        Outcome::Cleared => assert_eq!(driver.stage().terminated(), 0),
        Outcome::Missed => assert_eq!(driver.stage().terminated(), 1),
    }
}
