use crate::components::Category;
use crate::game_logic::errors::{RampartError, RampartResult};
use crate::geometry::Bounds;
use crate::navigation::{OBSTACLE_QUERY_PADDING, SpatialRegistry};
use bevy::prelude::*;
use pathfinding::prelude::astar;
use std::f32::consts::SQRT_2;

pub mod grid_blocking;

pub use grid_blocking::*;

/// A single cell of the obstacle grid. Row 0 borders the goal side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub col: u32,
    pub row: u32,
}

impl GridCell {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// 4-directional neighbours, ordered down, left, right, up
    pub fn neighbors(&self, grid_width: u32, grid_height: u32) -> Vec<GridCell> {
        let mut neighbors = Vec::with_capacity(4);

        // Down, toward the goal row
        if self.row > 0 {
            neighbors.push(GridCell::new(self.col, self.row - 1));
        }

        // Left
        if self.col > 0 {
            neighbors.push(GridCell::new(self.col - 1, self.row));
        }

        // Right
        if self.col + 1 < grid_width {
            neighbors.push(GridCell::new(self.col + 1, self.row));
        }

        // Up
        if self.row + 1 < grid_height {
            neighbors.push(GridCell::new(self.col, self.row + 1));
        }

        neighbors
    }
}

/// Fixed rectangular grid laid over part of the map
pub trait ObstacleGrid {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn cell_size(&self) -> f32;
    /// `None` when the point lies outside the grid
    fn world_to_grid(&self, position: Vec2) -> Option<GridCell>;
    /// Center of the cell in world units
    fn grid_to_world(&self, cell: GridCell) -> Vec2;
    fn is_occupied(&self, cell: GridCell) -> bool;

    /// World-space rectangle covered by the cells
    fn footprint(&self) -> Bounds {
        let half = Vec2::splat(self.cell_size() * 0.5);
        let first = self.grid_to_world(GridCell::new(0, 0));
        let last = self.grid_to_world(GridCell::new(
            self.width().saturating_sub(1),
            self.height().saturating_sub(1),
        ));
        Bounds::new(first.min(last) - half, first.max(last) + half)
    }
}

/// Grid whose cell `(0, 0)` is centered on `origin`; columns grow along +x and rows along +y
#[derive(Debug, Clone)]
pub struct WallGrid {
    origin: Vec2,
    width: u32,
    height: u32,
    cell_size: f32,
    /// Number of walls stamped into each cell
    occupancy: Vec<u8>,
}

impl WallGrid {
    pub fn new(origin: Vec2, width: u32, height: u32, cell_size: f32) -> RampartResult<Self> {
        if width == 0 || height == 0 {
            return Err(RampartError::InvalidGrid {
                reason: format!("grid must have at least one cell, got {width}x{height}"),
            });
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(RampartError::InvalidGrid {
                reason: format!("cell size must be positive, got {cell_size}"),
            });
        }

        Ok(Self {
            origin,
            width,
            height,
            cell_size,
            occupancy: vec![0; (width * height) as usize],
        })
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    fn index(&self, cell: GridCell) -> Option<usize> {
        (cell.col < self.width && cell.row < self.height)
            .then(|| (cell.row * self.width + cell.col) as usize)
    }

    pub fn occupant_count(&self, cell: GridCell) -> u8 {
        self.index(cell)
            .and_then(|index| self.occupancy.get(index).copied())
            .unwrap_or(0)
    }

    pub fn add_occupant(&mut self, cell: GridCell) {
        if let Some(slot) = self.index(cell).and_then(|i| self.occupancy.get_mut(i)) {
            *slot = slot.saturating_add(1);
        }
    }

    pub fn remove_occupant(&mut self, cell: GridCell) {
        if let Some(slot) = self.index(cell).and_then(|i| self.occupancy.get_mut(i)) {
            *slot = slot.saturating_sub(1);
        }
    }

    pub fn occupied_cells(&self) -> usize {
        self.occupancy.iter().filter(|&&count| count > 0).count()
    }
}

impl ObstacleGrid for WallGrid {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn world_to_grid(&self, position: Vec2) -> Option<GridCell> {
        let col = ((position.x - self.origin.x) / self.cell_size).round();
        let row = ((position.y - self.origin.y) / self.cell_size).round();

        if col >= 0.0 && row >= 0.0 && col < self.width as f32 && row < self.height as f32 {
            Some(GridCell::new(col as u32, row as u32))
        } else {
            None
        }
    }

    fn grid_to_world(&self, cell: GridCell) -> Vec2 {
        self.origin + Vec2::new(cell.col as f32, cell.row as f32) * self.cell_size
    }

    fn is_occupied(&self, cell: GridCell) -> bool {
        self.occupant_count(cell) > 0
    }
}

/// Where a point sits relative to the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridZone {
    /// Beyond the top row, on the spawn side
    Above,
    /// Over a cell above the bottom row
    Inside(GridCell),
    /// On or below the bottom row
    PastBottom,
    /// Level with the grid but outside its horizontal span
    Beside,
}

pub fn classify_position<G: ObstacleGrid + ?Sized>(grid: &G, position: Vec2) -> GridZone {
    let footprint = grid.footprint();
    let cell_size = grid.cell_size();

    if position.y < footprint.min.y + cell_size {
        return GridZone::PastBottom;
    }

    if position.y >= footprint.max.y {
        // A cell's width of slack either side still counts as lining up with the top row
        let lined_up = position.x >= footprint.min.x - cell_size
            && position.x <= footprint.max.x + cell_size;
        return if lined_up { GridZone::Above } else { GridZone::Beside };
    }

    if position.x < footprint.min.x || position.x > footprint.max.x {
        return GridZone::Beside;
    }

    let cell = nearest_cell(grid, position);
    if cell.row == 0 {
        GridZone::PastBottom
    } else {
        GridZone::Inside(cell)
    }
}

/// Cell under `position`, clamped into the grid
pub fn nearest_cell<G: ObstacleGrid + ?Sized>(grid: &G, position: Vec2) -> GridCell {
    let origin = grid.grid_to_world(GridCell::new(0, 0));
    let cell_size = grid.cell_size();
    let col = ((position.x - origin.x) / cell_size).round();
    let row = ((position.y - origin.y) / cell_size).round();

    GridCell::new(
        col.clamp(0.0, grid.width().saturating_sub(1) as f32) as u32,
        row.clamp(0.0, grid.height().saturating_sub(1) as f32) as u32,
    )
}

/// An occupied cell only blocks while a live wall actually overlaps it
pub fn is_passable<G, R>(grid: &G, registry: &R, cell: GridCell) -> bool
where
    G: ObstacleGrid + ?Sized,
    R: SpatialRegistry + ?Sized,
{
    if !grid.is_occupied(cell) {
        return true;
    }

    let center = grid.grid_to_world(cell);
    let reach = grid.cell_size() * 0.5 * SQRT_2;
    !registry
        .query(Category::Wall, center, reach + OBSTACLE_QUERY_PADDING)
        .iter()
        .any(|wall| wall.alive && wall.position.distance(center) < wall.radius + reach)
}

/// A* from `entry` to the nearest reachable cell of row 0
///
/// The returned cells exclude `entry` itself. Entries outside the grid are
/// clamped to the nearest in-bounds cell first.
pub fn find_path_to_goal_row<G, R>(grid: &G, registry: &R, entry: GridCell) -> Option<Vec<GridCell>>
where
    G: ObstacleGrid + ?Sized,
    R: SpatialRegistry + ?Sized,
{
    let (width, height) = (grid.width(), grid.height());
    if width == 0 || height == 0 {
        return None;
    }
    let start = GridCell::new(
        entry.col.min(width - 1),
        entry.row.min(height - 1),
    );

    let (path, cost) = astar(
        &start,
        |cell| {
            cell.neighbors(width, height)
                .into_iter()
                .filter(|neighbor| is_passable(grid, registry, *neighbor))
                .map(|neighbor| (neighbor, 1u32))
                .collect::<Vec<_>>()
        },
        |cell| cell.row,
        |cell| cell.row == 0,
    )?;

    debug!(
        "Grid path from ({}, {}) reaches row 0 in {} steps",
        start.col, start.row, cost
    );

    Some(path.into_iter().skip(1).collect())
}

/// Nearest passable top-row cell, scanning outward from the column under `position`;
/// the left neighbour is tried before the right one at each distance
pub fn find_top_row_gap<G, R>(grid: &G, registry: &R, position: Vec2) -> Option<GridCell>
where
    G: ObstacleGrid + ?Sized,
    R: SpatialRegistry + ?Sized,
{
    let width = grid.width() as i64;
    let top = grid.height().checked_sub(1)?;
    let center = nearest_cell(grid, position).col as i64;

    (0..width)
        .flat_map(|distance| {
            if distance == 0 {
                vec![center]
            } else {
                vec![center - distance, center + distance]
            }
        })
        .filter(|col| (0..width).contains(col))
        .map(|col| GridCell::new(col as u32, top))
        .find(|cell| is_passable(grid, registry, *cell))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridWaypoint {
    pub cell: GridCell,
    pub world: Vec2,
}

/// Cells of an active grid route, consumed front to back
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridPath {
    waypoints: Vec<GridWaypoint>,
    current_index: usize,
}

impl GridPath {
    pub fn from_cells<G: ObstacleGrid + ?Sized>(grid: &G, cells: &[GridCell]) -> Self {
        Self {
            waypoints: cells
                .iter()
                .map(|cell| GridWaypoint {
                    cell: *cell,
                    world: grid.grid_to_world(*cell),
                })
                .collect(),
            current_index: 0,
        }
    }

    /// True when there is nothing left to follow
    pub fn is_empty(&self) -> bool {
        self.current_index >= self.waypoints.len()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<GridWaypoint> {
        self.waypoints.get(self.current_index).copied()
    }

    pub fn current_waypoint(&self) -> Option<Vec2> {
        self.current().map(|waypoint| waypoint.world)
    }

    pub fn advance(&mut self) {
        if self.current_index < self.waypoints.len() {
            self.current_index += 1;
        }
    }

    pub fn remaining(&self) -> &[GridWaypoint] {
        self.waypoints.get(self.current_index..).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.current_index = 0;
    }
}

/// False as soon as any cell still ahead has become impassable
pub fn path_still_valid<G, R>(grid: &G, registry: &R, path: &GridPath) -> bool
where
    G: ObstacleGrid + ?Sized,
    R: SpatialRegistry + ?Sized,
{
    path.remaining()
        .iter()
        .all(|waypoint| is_passable(grid, registry, waypoint.cell))
}
