//! Stamping circular walls into grid occupancy

use crate::pathfinding::{GridCell, ObstacleGrid, WallGrid};
use bevy::prelude::*;

/// Cells whose square overlaps the circle
pub fn cells_under_circle(grid: &WallGrid, center: Vec2, radius: f32) -> Vec<GridCell> {
    let cell_size = grid.cell_size();
    let half = cell_size * 0.5;
    let cell_radius = (radius / cell_size).ceil() as i64 + 1;
    let origin = grid.origin();
    let center_col = ((center.x - origin.x) / cell_size).round() as i64;
    let center_row = ((center.y - origin.y) / cell_size).round() as i64;
    let radius_squared = radius * radius;

    let mut cells = Vec::new();
    for row in (center_row - cell_radius)..=(center_row + cell_radius) {
        for col in (center_col - cell_radius)..=(center_col + cell_radius) {
            if col < 0 || row < 0 || col >= grid.width() as i64 || row >= grid.height() as i64 {
                continue;
            }

            let cell = GridCell::new(col as u32, row as u32);
            let cell_center = grid.grid_to_world(cell);
            // Closest point of the cell square to the circle center
            let closest = center.clamp(cell_center - Vec2::splat(half), cell_center + Vec2::splat(half));
            if closest.distance_squared(center) <= radius_squared {
                cells.push(cell);
            }
        }
    }
    cells
}

/// Mark every cell under a wall as occupied by one more wall
pub fn stamp_circle(grid: &mut WallGrid, center: Vec2, radius: f32) {
    for cell in cells_under_circle(grid, center, radius) {
        grid.add_occupant(cell);
    }
}

/// Undo a previous [`stamp_circle`] with the same arguments
pub fn clear_circle(grid: &mut WallGrid, center: Vec2, radius: f32) {
    for cell in cells_under_circle(grid, center, radius) {
        grid.remove_occupant(cell);
    }
}
