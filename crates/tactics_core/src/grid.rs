//! The battlefield grid.
//!
//! A fixed-size rectangle of [`Block`]s stored row-major. Each block carries
//! its walk cost, the unit logically seated on it, the units currently
//! rendered on it and a set of highlight markers.
//!
//! Markers are a side channel for whoever draws the grid. Nothing in
//! [`crate::pathfinding`] reads them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::math::{Fixed, Vec2Fixed};
use crate::unit::UnitId;

/// Walk cost of ordinary ground.
pub const NORMAL_COST: u32 = 100;

/// Walk cost sentinel for blocks that can never be entered on foot.
pub const IMPASSABLE: u32 = 9999;

/// Tile data uses this cost to mean "impassable"; it is normalised to
/// [`IMPASSABLE`] on load.
pub const TILE_DATA_IMPASSABLE: u32 = 1000;

/// Edge length of one block in render units.
pub const TILE_SIZE: i32 = 96;

/// Integer grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Point {
    /// Column.
    pub x: i32,
    /// Row, growing downwards.
    pub y: i32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another point.
    #[must_use]
    pub fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// A unit as seen by the grid: identity plus the side it fights for.
///
/// Blocks store this so zone-of-control checks need nothing but the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occupant {
    /// Seated unit.
    pub unit: UnitId,
    /// Its faction.
    pub faction: Faction,
}

impl Occupant {
    /// Create an occupant record.
    #[must_use]
    pub const fn new(unit: UnitId, faction: Faction) -> Self {
        Self { unit, faction }
    }

    /// Whether `other` blocks this unit's movement (held by the other side).
    #[must_use]
    pub fn is_blocked_by(&self, other: Occupant) -> bool {
        self.faction.is_hostile_to(other.faction)
    }
}

/// How a search crosses terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locomotion {
    /// On foot: terrain cost applies.
    Walk,
    /// Line of fire: every block costs 1.
    Shoot,
}

/// Colour used to highlight a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerColor {
    /// Blocks a unit may travel to.
    DeepSkyBlue,
    /// The chosen destination.
    White,
    /// The chosen attack target.
    Yellow,
}

/// A single highlight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    /// Tint the block. A block holds at most one colour.
    Color(MarkerColor),
    /// Draw the targeting reticle.
    Target,
    /// Draw the seated unit above the marker layer.
    Unit,
}

/// Highlight state of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Markers {
    /// Tint, if any.
    pub color: Option<MarkerColor>,
    /// Targeting reticle.
    pub target: bool,
    /// Unit drawn above markers.
    pub unit: bool,
}

impl Markers {
    fn apply(&mut self, marker: Marker) {
        match marker {
            Marker::Color(color) => self.color = Some(color),
            Marker::Target => self.target = true,
            Marker::Unit => self.unit = true,
        }
    }

    /// True when no marker is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && !self.target && !self.unit
    }
}

/// One grid cell.
#[derive(Debug, Clone)]
pub struct Block {
    point: Point,
    walk_cost: u32,
    occupant: Option<Occupant>,
    render_units: Vec<UnitId>,
    markers: Markers,
}

impl Block {
    fn new(point: Point, walk_cost: u32) -> Self {
        Self {
            point,
            walk_cost,
            occupant: None,
            render_units: Vec::new(),
            markers: Markers::default(),
        }
    }

    /// Coordinate of this block.
    #[must_use]
    pub const fn point(&self) -> Point {
        self.point
    }

    /// Cost of entering this block.
    ///
    /// Shooting ignores terrain and always costs 1.
    #[must_use]
    pub const fn cost(&self, mode: Locomotion) -> u32 {
        match mode {
            Locomotion::Walk => self.walk_cost,
            Locomotion::Shoot => 1,
        }
    }

    /// Whether walking units can never enter.
    #[must_use]
    pub const fn is_impassable(&self) -> bool {
        self.walk_cost >= IMPASSABLE
    }

    /// Unit logically seated here.
    #[must_use]
    pub const fn occupant(&self) -> Option<Occupant> {
        self.occupant
    }

    /// Units currently drawn on this block, in arrival order.
    #[must_use]
    pub fn render_units(&self) -> &[UnitId] {
        &self.render_units
    }

    /// Highlight state.
    #[must_use]
    pub const fn markers(&self) -> Markers {
        self.markers
    }

    /// Top-left corner in render space.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        Vec2Fixed::from_ints(self.point.x * TILE_SIZE, self.point.y * TILE_SIZE)
    }

    /// Centre in render space.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        let half = Fixed::from_num(TILE_SIZE / 2);
        self.position() + Vec2Fixed::new(half, half)
    }

    /// Bottom-centre in render space; units stand here.
    #[must_use]
    pub fn anchor(&self) -> Vec2Fixed {
        self.position() + Vec2Fixed::from_ints(TILE_SIZE / 2, TILE_SIZE)
    }
}

/// Fixed-size 2D arrangement of blocks.
#[derive(Debug, Clone)]
pub struct Grid {
    width: u32,
    height: u32,
    blocks: Vec<Block>,
    marked: Vec<Point>,
    marker_states: HashMap<String, Vec<(Point, Markers)>>,
}

impl Grid {
    /// Create a grid where every block has [`NORMAL_COST`].
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0, "Grid width must be positive");
        assert!(height > 0, "Grid height must be positive");

        let blocks = (0..height as i32)
            .flat_map(|y| (0..width as i32).map(move |x| Block::new(Point::new(x, y), NORMAL_COST)))
            .collect();

        Self {
            width,
            height,
            blocks,
            marked: Vec::new(),
            marker_states: HashMap::new(),
        }
    }

    /// Create a grid from row-major walk costs.
    pub fn from_costs(width: u32, height: u32, costs: &[u32]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GameError::InvalidData(format!(
                "grid must not be empty, got {width}x{height}"
            )));
        }
        if costs.len() != (width as usize) * (height as usize) {
            return Err(GameError::InvalidData(format!(
                "expected {} costs for a {width}x{height} grid, got {}",
                (width as usize) * (height as usize),
                costs.len()
            )));
        }

        let mut grid = Self::new(width, height);
        for (block, &cost) in grid.blocks.iter_mut().zip(costs) {
            block.walk_cost = cost;
        }
        Ok(grid)
    }

    /// Grid width in blocks.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in blocks.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Whether the point lies on the grid.
    #[must_use]
    pub fn in_bounds(&self, point: Point) -> bool {
        point.x >= 0 && point.y >= 0 && (point.x as u32) < self.width && (point.y as u32) < self.height
    }

    fn index(&self, point: Point) -> Option<usize> {
        self.in_bounds(point)
            .then(|| (point.y as usize) * (self.width as usize) + (point.x as usize))
    }

    /// Block at a point, or `None` outside the grid.
    #[must_use]
    pub fn block(&self, point: Point) -> Option<&Block> {
        self.index(point).map(|i| &self.blocks[i])
    }

    fn block_mut(&mut self, point: Point) -> Option<&mut Block> {
        self.index(point).map(|i| &mut self.blocks[i])
    }

    /// Block at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn block_at(&self, x: i32, y: i32) -> Option<&Block> {
        self.block(Point::new(x, y))
    }

    /// All blocks in row-major order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Overwrite the walk cost of a block. Returns `false` outside the grid.
    pub fn set_cost(&mut self, point: Point, cost: u32) -> bool {
        match self.block_mut(point) {
            Some(block) => {
                block.walk_cost = cost;
                true
            }
            None => false,
        }
    }

    /// Cost of entering a block, or `None` outside the grid.
    #[must_use]
    pub fn cost_of(&self, point: Point, mode: Locomotion) -> Option<u32> {
        self.block(point).map(|b| b.cost(mode))
    }

    /// Unit logically seated at a point.
    #[must_use]
    pub fn occupant(&self, point: Point) -> Option<Occupant> {
        self.block(point).and_then(Block::occupant)
    }

    /// Move a unit's logical seat from `from` to `to`.
    ///
    /// The old block is cleared before the new one is claimed. Claiming a
    /// block already held by another unit is an invariant violation: debug
    /// builds assert, release builds log a warning and the last writer wins.
    ///
    /// Returns the unit that was displaced, if any.
    pub fn set_occupant(
        &mut self,
        occupant: Occupant,
        from: Option<Point>,
        to: Option<Point>,
    ) -> Option<UnitId> {
        let unit = occupant.unit;
        if let Some(block) = from.and_then(|p| self.block_mut(p)) {
            if block.occupant.is_some_and(|o| o.unit == unit) {
                block.occupant = None;
            }
        }

        let block = to.and_then(|p| self.block_mut(p))?;
        let displaced = block.occupant.map(|o| o.unit).filter(|&other| other != unit);
        if let Some(other) = displaced {
            warn!(
                block = %block.point,
                holder = %other,
                claimant = %unit,
                "Block double-claimed; last writer wins"
            );
        }
        debug_assert!(
            displaced.is_none(),
            "block {} claimed by unit {unit} while held by another unit",
            block.point
        );
        block.occupant = Some(occupant);
        displaced
    }

    /// Move a unit's render slot from `from` to `to`.
    pub fn set_render_block(&mut self, unit: UnitId, from: Option<Point>, to: Option<Point>) {
        if let Some(block) = from.and_then(|p| self.block_mut(p)) {
            block.render_units.retain(|&u| u != unit);
        }
        if let Some(block) = to.and_then(|p| self.block_mut(p)) {
            block.render_units.push(unit);
        }
    }

    /// Blocks carrying at least one marker, in marking order.
    #[must_use]
    pub fn marked_blocks(&self) -> &[Point] {
        &self.marked
    }

    /// Add a marker to each in-bounds point.
    pub fn set_markers<I>(&mut self, points: I, marker: Marker)
    where
        I: IntoIterator<Item = Point>,
    {
        for point in points {
            let Some(block) = self.block_mut(point) else {
                continue;
            };
            block.markers.apply(marker);
            if !self.marked.contains(&point) {
                self.marked.push(point);
            }
        }
    }

    /// Remove every marker from the grid. Saved states are kept.
    pub fn clear_markers(&mut self) {
        for point in std::mem::take(&mut self.marked) {
            if let Some(block) = self.block_mut(point) {
                block.markers = Markers::default();
            }
        }
    }

    /// Snapshot current markers under a name.
    pub fn save_marker_state(&mut self, name: impl Into<String>) {
        let snapshot = self
            .marked
            .iter()
            .filter_map(|&p| self.block(p).map(|b| (p, b.markers)))
            .collect();
        self.marker_states.insert(name.into(), snapshot);
    }

    /// Replace current markers with a named snapshot.
    ///
    /// Returns `false` (and leaves markers untouched) if no such snapshot
    /// exists.
    pub fn restore_marker_state(&mut self, name: &str) -> bool {
        let Some(snapshot) = self.marker_states.get(name).cloned() else {
            return false;
        };
        self.clear_markers();
        for (point, markers) in snapshot {
            if let Some(block) = self.block_mut(point) {
                block.markers = markers;
                self.marked.push(point);
            }
        }
        true
    }

    /// Forget all named snapshots.
    pub fn clear_marker_states(&mut self) {
        self.marker_states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_lookup_round_trip() {
        let grid = Grid::new(4, 3);
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(grid.block_at(x, y).map(Block::point), Some(Point::new(x, y)));
            }
        }
        assert!(grid.block_at(-1, 0).is_none());
        assert!(grid.block_at(4, 0).is_none());
        assert!(grid.block_at(0, 3).is_none());
    }

    #[test]
    fn test_shoot_cost_ignores_terrain() {
        let mut grid = Grid::new(2, 1);
        grid.set_cost(Point::new(1, 0), IMPASSABLE);
        assert_eq!(grid.cost_of(Point::new(1, 0), Locomotion::Walk), Some(IMPASSABLE));
        assert_eq!(grid.cost_of(Point::new(1, 0), Locomotion::Shoot), Some(1));
        assert!(grid.block(Point::new(1, 0)).is_some_and(Block::is_impassable));
    }

    #[test]
    fn test_from_costs_rejects_wrong_length() {
        assert!(Grid::from_costs(2, 2, &[100, 100, 100]).is_err());
        let grid = Grid::from_costs(2, 1, &[100, 300]).unwrap();
        assert_eq!(grid.cost_of(Point::new(1, 0), Locomotion::Walk), Some(300));
    }

    #[test]
    fn test_set_occupant_clears_old_block_first() {
        let mut grid = Grid::new(3, 3);
        let unit = Occupant::new(UnitId::new(1), Faction::Ally);
        let a = Point::new(0, 0);
        let b = Point::new(2, 1);

        grid.set_occupant(unit, None, Some(a));
        assert_eq!(grid.occupant(a), Some(unit));

        grid.set_occupant(unit, Some(a), Some(b));
        assert_eq!(grid.occupant(a), None);
        assert_eq!(grid.occupant(b), Some(unit));

        grid.set_occupant(unit, Some(b), None);
        assert!(grid.blocks().all(|block| block.occupant().is_none()));
    }

    #[test]
    fn test_clearing_foreign_seat_leaves_it_alone() {
        let mut grid = Grid::new(2, 1);
        let a = Occupant::new(UnitId::new(1), Faction::Ally);
        let b = Occupant::new(UnitId::new(2), Faction::Foe);
        grid.set_occupant(a, None, Some(Point::new(0, 0)));
        grid.set_occupant(b, Some(Point::new(0, 0)), Some(Point::new(1, 0)));
        assert_eq!(grid.occupant(Point::new(0, 0)), Some(a));
    }

    #[test]
    fn test_render_units_follow_walk_block() {
        let mut grid = Grid::new(2, 1);
        let unit = UnitId::new(7);
        grid.set_render_block(unit, None, Some(Point::new(0, 0)));
        grid.set_render_block(unit, Some(Point::new(0, 0)), Some(Point::new(1, 0)));
        assert!(grid.block_at(0, 0).unwrap().render_units().is_empty());
        assert_eq!(grid.block_at(1, 0).unwrap().render_units(), &[unit]);
    }

    #[test]
    fn test_marker_states_save_and_restore() {
        let mut grid = Grid::new(3, 3);
        let travels = [Point::new(0, 0), Point::new(1, 0)];
        grid.set_markers(travels, Marker::Color(MarkerColor::DeepSkyBlue));
        grid.save_marker_state("destining");

        grid.set_markers([Point::new(2, 2)], Marker::Target);
        grid.set_markers([Point::new(0, 0)], Marker::Color(MarkerColor::White));
        assert_eq!(grid.marked_blocks().len(), 3);

        assert!(grid.restore_marker_state("destining"));
        assert_eq!(grid.marked_blocks(), &travels);
        assert_eq!(
            grid.block_at(0, 0).unwrap().markers().color,
            Some(MarkerColor::DeepSkyBlue)
        );
        assert!(grid.block_at(2, 2).unwrap().markers().is_empty());

        grid.clear_markers();
        grid.clear_marker_states();
        assert!(grid.marked_blocks().is_empty());
        assert!(!grid.restore_marker_state("destining"));
    }

    #[test]
    fn test_block_geometry() {
        let grid = Grid::new(3, 3);
        let block = grid.block_at(1, 2).unwrap();
        assert_eq!(block.position(), Vec2Fixed::from_ints(96, 192));
        assert_eq!(block.center(), Vec2Fixed::from_ints(144, 240));
        assert_eq!(block.anchor(), Vec2Fixed::from_ints(144, 288));
    }
}
