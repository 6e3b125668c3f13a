//! Tile map data and terrain cost derivation.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::grid::{Grid, IMPASSABLE, TILE_DATA_IMPASSABLE};

/// One entry of the tile master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileData {
    /// Movement cost. 1000 or more means the tile cannot be entered.
    pub cost: u32,
    /// Optional label, only used in reports.
    #[serde(default)]
    pub name: Option<String>,
}

/// A layered tile map.
///
/// `tiles[0]` is never looked up: tile index 0 marks an empty cell. Every
/// layer holds `width * height` tile indices in row-major order. The last
/// layer is the ornament layer; the ones below it are ground.
///
/// # Example RON
///
/// ```ron
/// MapData(
///     width: 3,
///     height: 1,
///     tiles: [(cost: 0), (cost: 100), (cost: 300), (cost: 1000)],
///     layers: [
///         [1, 1, 2],
///         [0, 3, 0],
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapData {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// Tile master.
    pub tiles: Vec<TileData>,
    /// Tile layers, bottom first.
    pub layers: Vec<Vec<u32>>,
}

impl MapData {
    fn tile_cost(&self, index: u32) -> u32 {
        let cost = self.tiles.get(index as usize).map_or(0, |t| t.cost);
        if cost >= TILE_DATA_IMPASSABLE {
            IMPASSABLE
        } else {
            cost
        }
    }

    /// Walk cost of the cell at row-major `cell`.
    ///
    /// The topmost non-empty ground tile counts, and the ornament raises it
    /// when dearer. A cell with no ground at all cannot be entered. A map
    /// with a single layer has no ornament layer.
    #[must_use]
    pub fn walk_cost(&self, cell: usize) -> u32 {
        let ground_layers = if self.layers.len() > 1 {
            &self.layers[..self.layers.len() - 1]
        } else {
            &self.layers[..]
        };
        let ground = ground_layers
            .iter()
            .rev()
            .filter_map(|layer| layer.get(cell).copied())
            .find(|&tile| tile != 0)
            .map_or(IMPASSABLE, |tile| self.tile_cost(tile));

        let ornament = if self.layers.len() > 1 {
            self.layers
                .last()
                .and_then(|layer| layer.get(cell).copied())
                .map_or(0, |tile| self.tile_cost(tile))
        } else {
            0
        };
        ground.max(ornament)
    }

    /// Problems with the map, empty when it is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let cells = (self.width as usize) * (self.height as usize);
        if cells == 0 {
            errors.push(format!("Map must not be empty, got {}x{}", self.width, self.height));
        }
        if self.layers.is_empty() {
            errors.push("Map has no layers".to_owned());
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.len() != cells {
                errors.push(format!("Layer {i} has {} cells, expected {cells}", layer.len()));
            }
            if let Some(bad) = layer.iter().find(|&&t| t as usize >= self.tiles.len().max(1)) {
                errors.push(format!("Layer {i} uses unknown tile {bad}"));
            }
        }
        errors
    }

    /// Build the grid this map describes.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidData`] when the map fails validation.
    pub fn build_grid(&self) -> Result<Grid> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(GameError::InvalidData(errors.join("; ")));
        }
        let cells = (self.width as usize) * (self.height as usize);
        let costs: Vec<u32> = (0..cells).map(|cell| self.walk_cost(cell)).collect();
        Grid::from_costs(self.width, self.height, &costs)
    }

    /// A single-layer map where every cell uses the same cost.
    #[must_use]
    pub fn uniform(width: u32, height: u32, cost: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![
                TileData { cost: 0, name: None },
                TileData {
                    cost,
                    name: Some("plain".to_owned()),
                },
            ],
            layers: vec![vec![1; (width as usize) * (height as usize)]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Locomotion, Point};

    fn layered() -> MapData {
        MapData {
            width: 4,
            height: 1,
            tiles: vec![
                TileData { cost: 0, name: None },
                TileData { cost: 100, name: None },
                TileData { cost: 300, name: None },
                TileData { cost: 1000, name: None },
                TileData { cost: 50, name: None },
            ],
            layers: vec![
                vec![1, 1, 1, 0],
                vec![0, 2, 0, 0],
                vec![0, 0, 3, 4],
            ],
        }
    }

    #[test]
    fn test_topmost_ground_wins() {
        let map = layered();
        assert_eq!(map.walk_cost(0), 100);
        assert_eq!(map.walk_cost(1), 300);
    }

    #[test]
    fn test_ornament_raises_cost_and_normalises_impassable() {
        let map = layered();
        assert_eq!(map.walk_cost(2), IMPASSABLE);
    }

    #[test]
    fn test_cell_without_ground_is_impassable() {
        assert_eq!(layered().walk_cost(3), IMPASSABLE);
    }

    #[test]
    fn test_build_grid() {
        let grid = layered().build_grid().expect("valid map");
        assert_eq!(grid.cost_of(Point::new(1, 0), Locomotion::Walk), Some(300));
        assert_eq!(grid.cost_of(Point::new(2, 0), Locomotion::Shoot), Some(1));
    }

    #[test]
    fn test_validate_catches_short_layer_and_unknown_tile() {
        let mut map = MapData::uniform(2, 2, 100);
        map.layers.push(vec![0, 9, 0]);
        let errors = map.validate();
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(map.build_grid().is_err());
    }

    #[test]
    fn test_uniform_single_layer() {
        let grid = MapData::uniform(3, 2, 100).build_grid().expect("valid map");
        assert!(grid.blocks().all(|b| b.cost(Locomotion::Walk) == 100));
    }
}
