//! Read-only queries over the classified grid
//!
//! Every query is total: out-of-bounds lookups answer `false` or empty rather
//! than failing.

use petgraph::unionfind::UnionFind;
use std::collections::HashSet;

use super::grid::{CellType, Grid};
use super::types::{Cell, Direction, Vec2};

/// Drivability of the four cells adjacent to a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Neighbors {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl Neighbors {
    pub fn get(&self, direction: Direction) -> bool {
        match direction {
            Direction::North => self.north,
            Direction::South => self.south,
            Direction::East => self.east,
            Direction::West => self.west,
        }
    }

    /// Directions whose neighbour is drivable, in `Direction::ALL` order
    pub fn open_directions(&self) -> Vec<Direction> {
        Direction::ALL
            .iter()
            .copied()
            .filter(|direction| self.get(*direction))
            .collect()
    }

    pub fn any(&self) -> bool {
        self.north || self.south || self.east || self.west
    }
}

/// A border cell from which traffic can enter the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEntry {
    pub cell: Cell,
    pub inward: Direction,
}

/// Query layer over a [`Grid`]
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    grid: Grid,
}

impl RoadNetwork {
    pub fn new(grid: Grid) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tile_size(&self) -> f32 {
        self.grid.tile_size()
    }

    pub fn cell_type(&self, cell: Cell) -> CellType {
        self.grid.get(cell)
    }

    pub fn is_in_bounds(&self, cell: Cell) -> bool {
        self.grid.contains(cell)
    }

    pub fn is_drivable(&self, cell: Cell) -> bool {
        self.is_in_bounds(cell) && self.grid.get(cell).is_drivable()
    }

    pub fn is_roundabout(&self, cell: Cell) -> bool {
        self.is_in_bounds(cell) && self.grid.get(cell) == CellType::Roundabout
    }

    pub fn neighbors(&self, cell: Cell) -> Neighbors {
        Neighbors {
            north: self.is_drivable(cell.step(Direction::North, 1)),
            south: self.is_drivable(cell.step(Direction::South, 1)),
            east: self.is_drivable(cell.step(Direction::East, 1)),
            west: self.is_drivable(cell.step(Direction::West, 1)),
        }
    }

    /// Whether a step in `direction` from a drivable border cell leaves the map
    pub fn is_exit_edge(&self, cell: Cell, direction: Direction) -> bool {
        self.is_drivable(cell) && !self.is_in_bounds(cell.step(direction, 1))
    }

    /// Whether `direction` is worth committing to from `cell`.
    ///
    /// The next cell must be drivable and the one after it either drivable or
    /// off the map, so an agent never commits to a one-cell-deep dead end.
    /// A roundabout as the next cell is always accepted; the orbit finds its
    /// own exit.
    pub fn leads_on(&self, cell: Cell, direction: Direction) -> bool {
        let first = cell.step(direction, 1);
        let second = cell.step(direction, 2);
        self.is_roundabout(first)
            || (self.is_drivable(first)
                && (self.is_drivable(second) || !self.is_in_bounds(second)))
    }

    /// Border cells with a drivable cell one step further in
    pub fn edge_entry_points(&self) -> Vec<EdgeEntry> {
        let mut entries = Vec::new();
        for cell in self.grid.cells() {
            if !self.is_drivable(cell) {
                continue;
            }
            for inward in Direction::ALL {
                let outward = cell.step(inward, -1);
                if !self.is_in_bounds(outward) && self.is_drivable(cell.step(inward, 1)) {
                    entries.push(EdgeEntry { cell, inward });
                }
            }
        }
        entries
    }

    /// Every drivable cell with at least one drivable neighbour
    pub fn drivable_cells_with_neighbors(&self) -> Vec<Cell> {
        self.grid
            .cells()
            .filter(|cell| self.is_drivable(*cell) && self.neighbors(*cell).any())
            .collect()
    }

    /// Cell containing a world position (floor division by tile size)
    pub fn cell_at(&self, position: Vec2) -> Cell {
        let tile = self.tile_size();
        Cell::new(
            (position.x / tile).floor() as i32,
            (position.y / tile).floor() as i32,
        )
    }

    pub fn cell_center(&self, cell: Cell) -> Vec2 {
        let tile = self.tile_size();
        Vec2::new((cell.x as f32 + 0.5) * tile, (cell.y as f32 + 0.5) * tile)
    }

    /// World-space size of the whole grid
    pub fn world_size(&self) -> Vec2 {
        let tile = self.tile_size();
        Vec2::new(self.grid.width() as f32 * tile, self.grid.height() as f32 * tile)
    }

    /// Whether `position` lies more than `margin` outside the grid
    pub fn is_beyond_margin(&self, position: Vec2, margin: f32) -> bool {
        let size = self.world_size();
        position.x < -margin
            || position.y < -margin
            || position.x > size.x + margin
            || position.y > size.y + margin
    }

    /// Connected groups of drivable cells that no edge entry reaches.
    ///
    /// Traffic spawned from the border can never get into these.
    pub fn unreachable_islands(&self) -> Vec<Vec<Cell>> {
        let width = self.grid.width().max(0) as usize;
        let height = self.grid.height().max(0) as usize;
        let index = |cell: Cell| cell.y as usize * width + cell.x as usize;
        let mut islands = UnionFind::<usize>::new(width * height);

        for cell in self.grid.cells() {
            if !self.is_drivable(cell) {
                continue;
            }
            for direction in [Direction::East, Direction::South] {
                let next = cell.step(direction, 1);
                if self.is_drivable(next) {
                    islands.union(index(cell), index(next));
                }
            }
        }

        let entry_roots: HashSet<usize> = self
            .edge_entry_points()
            .iter()
            .map(|entry| islands.find(index(entry.cell)))
            .collect();

        let mut grouped: Vec<(usize, Vec<Cell>)> = Vec::new();
        for cell in self.grid.cells().filter(|cell| self.is_drivable(*cell)) {
            let root = islands.find(index(cell));
            if entry_roots.contains(&root) {
                continue;
            }
            match grouped.iter_mut().find(|(group_root, _)| *group_root == root) {
                Some((_, cells)) => cells.push(cell),
                None => grouped.push((root, vec![cell])),
            }
        }

        grouped.into_iter().map(|(_, cells)| cells).collect()
    }

    pub(crate) fn replace_grid(&mut self, grid: Grid) {
        self.grid = grid;
    }
}
