//! Grid pathfinding: neighbours, travel range and weighted A*.
//!
//! Every search takes an optional mover. With a mover the search walks
//! (terrain cost applies, blocks held by the other faction are closed).
//! Without one it shoots (every block costs 1, occupancy is ignored).
//!
//! All searches are deterministic: neighbours are always visited in the
//! order up, left, right, down, and ties are broken by a fixed rule.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::grid::{Block, Grid, Locomotion, Occupant, Point, IMPASSABLE};

/// Weight applied to the Manhattan distance in the A* heuristic.
///
/// Larger than any single step cost, so the heuristic is not admissible:
/// the search commits early to the direction that closes distance and can
/// return a route that is not the cheapest one.
pub const HEURISTIC_WEIGHT: u32 = 150;

/// One of the four grid directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Towards row 0.
    Up,
    /// Towards column 0.
    Left,
    /// Away from column 0.
    Right,
    /// Away from row 0.
    Down,
}

impl Direction {
    /// All directions in neighbour order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Left, Self::Right, Self::Down];

    /// Unit offset of a step in this direction.
    #[must_use]
    pub const fn offset(self) -> Point {
        match self {
            Self::Up => Point::new(0, -1),
            Self::Left => Point::new(-1, 0),
            Self::Right => Point::new(1, 0),
            Self::Down => Point::new(0, 1),
        }
    }

    /// Symbol used in route text.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Up => 'U',
            Self::Left => 'L',
            Self::Right => 'R',
            Self::Down => 'D',
        }
    }

    /// Parse a route symbol.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'U' => Some(Self::Up),
            'L' => Some(Self::Left),
            'R' => Some(Self::Right),
            'D' => Some(Self::Down),
            _ => None,
        }
    }

    /// The reverse direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Down => Self::Up,
        }
    }
}

/// Ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Route(Vec<Direction>);

impl Route {
    /// Empty route.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Steps in walking order.
    #[must_use]
    pub fn steps(&self) -> &[Direction] {
        &self.0
    }

    /// Iterate over steps.
    pub fn iter(&self) -> std::slice::Iter<'_, Direction> {
        self.0.iter()
    }

    /// Append a step.
    pub fn push(&mut self, dir: Direction) {
        self.0.push(dir);
    }

    /// The first `count` steps.
    #[must_use]
    pub fn prefix(&self, count: usize) -> Self {
        Self(self.0[..count.min(self.0.len())].to_vec())
    }

    /// Everything after the first `count` steps.
    #[must_use]
    pub fn skip(&self, count: usize) -> Self {
        Self(self.0[count.min(self.0.len())..].to_vec())
    }

    /// Point reached by following every step from `start`, ignoring terrain.
    #[must_use]
    pub fn destination(&self, start: Point) -> Point {
        self.0.iter().fold(start, |p, d| p + d.offset())
    }
}

impl FromIterator<Direction> for Route {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Route {
    type Item = &'a Direction;
    type IntoIter = std::slice::Iter<'a, Direction>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|d| write!(f, "{}", d.symbol()))
    }
}

impl FromStr for Route {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .map(|c| {
                Direction::from_symbol(c).ok_or_else(|| GameError::MalformedRoute {
                    route: s.to_string(),
                    symbol: c,
                })
            })
            .collect()
    }
}

fn locomotion(mover: Option<Occupant>) -> Locomotion {
    if mover.is_some() {
        Locomotion::Walk
    } else {
        Locomotion::Shoot
    }
}

fn held_by_enemy(block: &Block, mover: Option<Occupant>) -> bool {
    match (mover, block.occupant()) {
        (Some(me), Some(holder)) => me.is_blocked_by(holder),
        _ => false,
    }
}

fn step_block<'g>(grid: &'g Grid, from: Point, dir: Direction) -> &'g Block {
    let to = from + dir.offset();
    match grid.block(to) {
        Some(block) => block,
        None => panic!("route steps off the grid: {from} -> {to}"),
    }
}

/// In-bounds neighbours of a point, paired with the step that reaches them.
pub fn neighbors(grid: &Grid, point: Point) -> impl Iterator<Item = (Direction, &Block)> + '_ {
    Direction::ALL
        .into_iter()
        .filter_map(move |d| grid.block(point + d.offset()).map(|b| (d, b)))
}

/// In-bounds points at exactly Manhattan distance `dist` from `point`.
///
/// Ordered column by column from the left; within a column the lower point
/// comes first. `dist == 0` yields the point itself.
#[must_use]
pub fn arounds(grid: &Grid, point: Point, dist: u32) -> Vec<Point> {
    let dist = dist as i32;
    let mut result = Vec::new();
    for dx in -dist..=dist {
        let dy = dist - dx.abs();
        let lower = point + Point::new(dx, dy);
        if grid.in_bounds(lower) {
            result.push(lower);
        }
        if dy != 0 {
            let upper = point + Point::new(dx, -dy);
            if grid.in_bounds(upper) {
                result.push(upper);
            }
        }
    }
    result
}

/// Blocks reachable within a movement allowance, with the best remaining
/// allowance recorded for each.
#[derive(Debug, Clone, Default)]
pub struct Travels {
    entries: Vec<(Point, u32)>,
    index: HashMap<Point, usize>,
}

impl Travels {
    /// Number of reachable blocks, the start included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is reachable (start off the grid).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a point is reachable.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        self.index.contains_key(&point)
    }

    /// Remaining allowance on arrival at a point.
    #[must_use]
    pub fn remaining(&self, point: Point) -> Option<u32> {
        self.index.get(&point).map(|&i| self.entries[i].1)
    }

    /// Points in discovery order; the start comes first.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.entries.iter().map(|&(p, _)| p)
    }

    /// `(point, remaining)` pairs in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (Point, u32)> + '_ {
        self.entries.iter().copied()
    }
}

/// Travel range: every block reachable from `start` spending at most `legs`.
///
/// Breadth-first with relaxation: a block is re-queued only when it can be
/// reached with strictly more allowance than any earlier visit. With a
/// mover, blocks held by the other faction are closed (zone of control).
#[must_use]
pub fn reachable_set(grid: &Grid, start: Point, legs: u32, mover: Option<Occupant>) -> Travels {
    let mut travels = Travels::default();
    if !grid.in_bounds(start) {
        return travels;
    }

    let mode = locomotion(mover);
    let mut visits = vec![start];
    let mut best: HashMap<Point, u32> = HashMap::from([(start, legs)]);

    let mut cursor = 0;
    while cursor < visits.len() {
        let focus = visits[cursor];
        cursor += 1;

        let remain = best[&focus];
        if remain == 0 {
            continue;
        }

        for (_, block) in neighbors(grid, focus) {
            let Some(left) = remain.checked_sub(block.cost(mode)) else {
                continue;
            };
            let point = block.point();
            if best.get(&point).is_some_and(|&prior| left <= prior) {
                continue;
            }
            if held_by_enemy(block, mover) {
                continue;
            }
            visits.push(point);
            best.insert(point, left);
        }
    }

    for point in visits {
        if !travels.index.contains_key(&point) {
            travels.index.insert(point, travels.entries.len());
            travels.entries.push((point, best[&point]));
        }
    }
    travels
}

#[derive(Debug, Clone, Copy)]
struct StarNode {
    point: Point,
    prev: Option<(usize, Direction)>,
    cost: u32,
    heur: u32,
}

/// Weighted A* from `start` to `goal`.
///
/// The score of an opened block is its path cost plus
/// `manhattan × HEURISTIC_WEIGHT`. The open block with the lowest score is
/// expanded next; among equal scores the most recently opened wins.
///
/// The goal always opens regardless of its cost or occupant, so a route to
/// a block with a unit standing on it is still produced. If the goal cannot
/// be reached the route leads to the scanned block with the lowest score
/// (closest approach), ties again going to the most recently opened.
///
/// `start == goal` and a start off the grid both yield an empty route.
#[must_use]
pub fn star_route(grid: &Grid, start: Point, goal: Point, mover: Option<Occupant>) -> Route {
    if start == goal || !grid.in_bounds(start) {
        return Route::new();
    }

    let mode = locomotion(mover);
    let mut nodes = vec![StarNode {
        point: start,
        prev: None,
        cost: 0,
        heur: start.manhattan(goal) * HEURISTIC_WEIGHT,
    }];
    let mut scans: HashMap<Point, usize> = HashMap::from([(start, 0)]);
    let mut open: Vec<usize> = vec![0];

    let reached = 'search: loop {
        let Some(slot) = lowest_heur(&open, &nodes) else {
            break 'search closest_scan(&scans, &nodes);
        };
        let focus = open.remove(slot);
        if scans.get(&nodes[focus].point) != Some(&focus) {
            continue;
        }
        let focus_point = nodes[focus].point;
        let focus_cost = nodes[focus].cost;

        for (dir, block) in neighbors(grid, focus_point) {
            let point = block.point();
            let step = block.cost(mode);
            let cost = focus_cost.saturating_add(step);

            if scans.get(&point).is_some_and(|&i| nodes[i].cost <= cost) {
                continue;
            }
            if point != goal && (step >= IMPASSABLE || held_by_enemy(block, mover)) {
                continue;
            }

            let index = nodes.len();
            nodes.push(StarNode {
                point,
                prev: Some((focus, dir)),
                cost,
                heur: cost.saturating_add(point.manhattan(goal) * HEURISTIC_WEIGHT),
            });
            scans.insert(point, index);
            open.push(index);

            if point == goal {
                break 'search index;
            }
        }
    };

    let mut steps = Vec::new();
    let mut cursor = reached;
    while let Some((prev, dir)) = nodes[cursor].prev {
        steps.push(dir);
        cursor = prev;
    }
    steps.reverse();
    Route(steps)
}

/// Slot in `open` holding the lowest score; later slots win ties.
fn lowest_heur(open: &[usize], nodes: &[StarNode]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (slot, &index) in open.iter().enumerate() {
        if best.map_or(true, |b| nodes[index].heur <= nodes[open[b]].heur) {
            best = Some(slot);
        }
    }
    best
}

/// Current node of the scanned block with the lowest score; the most
/// recently opened wins ties.
fn closest_scan(scans: &HashMap<Point, usize>, nodes: &[StarNode]) -> usize {
    scans
        .values()
        .copied()
        .min_by(|&a, &b| nodes[a].heur.cmp(&nodes[b].heur).then(b.cmp(&a)))
        .unwrap_or(0)
}

/// Re-walk a known route and sum its cost.
///
/// Returns `None` (infinite) when a step enters an impassable block or,
/// with a mover, a block held by the other faction. Used to notice routes
/// that went stale after the grid changed.
///
/// # Panics
///
/// Panics if the route steps off the grid; routes are produced internally
/// and one that leaves the grid is corrupt.
#[must_use]
pub fn path_cost(grid: &Grid, start: Point, route: &Route, mover: Option<Occupant>) -> Option<u32> {
    let mode = locomotion(mover);
    let mut focus = start;
    let mut total: u32 = 0;
    for &dir in route {
        let block = step_block(grid, focus, dir);
        let step = block.cost(mode);
        if step >= IMPASSABLE || held_by_enemy(block, mover) {
            return None;
        }
        total = total.saturating_add(step);
        focus = block.point();
    }
    Some(total)
}

/// Cost of walking from `start` to `goal` along [`star_route`].
///
/// `None` when the route stops short of the goal.
#[must_use]
pub fn move_cost(grid: &Grid, start: Point, goal: Point, mover: Option<Occupant>) -> Option<u32> {
    let mode = locomotion(mover);
    let route = star_route(grid, start, goal, mover);
    let mut focus = start;
    let mut total: u32 = 0;
    for &dir in &route {
        let block = step_block(grid, focus, dir);
        total = total.saturating_add(block.cost(mode));
        focus = block.point();
    }
    (focus == goal).then_some(total)
}

/// Follow a route while the allowance lasts.
///
/// Stops before the first step that costs more than what is left. `legs`
/// of `None` means unlimited. Returns the point reached and how many steps
/// were taken.
///
/// # Panics
///
/// Panics if the route steps off the grid.
#[must_use]
pub fn trace_path(
    grid: &Grid,
    start: Point,
    route: &Route,
    mover: Option<Occupant>,
    legs: Option<u32>,
) -> (Point, usize) {
    let mode = locomotion(mover);
    let mut remain = legs;
    let mut focus = start;
    let mut taken = 0;
    for &dir in route {
        let block = step_block(grid, focus, dir);
        if let Some(left) = remain {
            match left.checked_sub(block.cost(mode)) {
                Some(rest) => remain = Some(rest),
                None => break,
            }
        }
        focus = block.point();
        taken += 1;
    }
    (focus, taken)
}

/// Back off along a route until a block can seat `mover`.
///
/// `end` is where `route` leads. Walking the route backwards from there,
/// returns the first block that can be walked on and is empty or already
/// held by `mover`. If no block qualifies the route's origin is returned.
#[must_use]
pub fn search_vacant_seat(grid: &Grid, end: Point, route: &Route, mover: Occupant) -> Point {
    vacant_seat_along(grid, end, route, mover).0
}

/// Like [`search_vacant_seat`], also returning how many steps of `route`
/// lead to the seat.
#[must_use]
pub fn vacant_seat_along(grid: &Grid, end: Point, route: &Route, mover: Occupant) -> (Point, usize) {
    let mut focus = end;
    let mut kept = route.len();
    for &dir in route.steps().iter().rev() {
        let seatable = grid.block(focus).is_some_and(|block| {
            !block.is_impassable() && block.occupant().map_or(true, |holder| holder.unit == mover.unit)
        });
        if seatable {
            break;
        }
        focus = focus + dir.opposite().offset();
        kept -= 1;
    }
    (focus, kept)
}
